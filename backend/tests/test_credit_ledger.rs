//! Tests for the credit ledger
//!
//! CRITICAL: sum of balances == total supply after every call

use waitlist_core_rs::{Account, CreditLedger, ErrorKind, Event, LedgerError, TokenMetadata};

fn acct(id: &str) -> Account {
    Account::new(id)
}

/// Ledger with `minter` configured as issuer
fn ledger_with_minter(minter: &Account) -> CreditLedger {
    let mut ledger = CreditLedger::new(TokenMetadata::default());
    ledger.set_issuer(&acct("0xdep10yer"), minter.clone()).unwrap();
    ledger
}

// ============================================================================
// Issuer configuration
// ============================================================================

#[test]
fn test_set_issuer_once() {
    let mut ledger = CreditLedger::new(TokenMetadata::default());

    ledger.set_issuer(&acct("0xanyone"), acct("0x155")).unwrap();

    assert_eq!(ledger.issuer(), Some(&acct("0x155")));
    assert_eq!(
        ledger.events().last(),
        Some(&Event::IssuerSet {
            issuer: acct("0x155")
        })
    );
}

#[test]
fn test_second_set_issuer_rejected() {
    let mut ledger = CreditLedger::new(TokenMetadata::default());
    ledger.set_issuer(&acct("0xa"), acct("0x155")).unwrap();

    let err = ledger.set_issuer(&acct("0xa"), acct("0x0ther")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(err.to_string(), "Issuer already set");
    assert_eq!(ledger.issuer(), Some(&acct("0x155")));
}

#[test]
fn test_set_null_issuer_rejected() {
    let mut ledger = CreditLedger::new(TokenMetadata::default());

    let err = ledger.set_issuer(&acct("0xa"), Account::null()).unwrap_err();

    assert_eq!(err, LedgerError::InvalidAddress);
    assert!(ledger.issuer().is_none());
}

// ============================================================================
// Minting
// ============================================================================

#[test]
fn test_mint_by_issuer() {
    let minter = acct("0x155");
    let mut ledger = ledger_with_minter(&minter);

    ledger.mint(&minter, &acct("0xa"), 100).unwrap();

    assert_eq!(ledger.balance_of(&acct("0xa")), 100);
    assert_eq!(ledger.total_supply(), 100);
    assert!(ledger.supply_is_conserved());
}

#[test]
fn test_mint_by_non_issuer_rejected() {
    let mut ledger = ledger_with_minter(&acct("0x155"));

    let err = ledger.mint(&acct("0xa"), &acct("0xa"), 100).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(err.to_string(), "Only issuer can mint");
    assert_eq!(ledger.total_supply(), 0);
}

#[test]
fn test_mint_before_issuer_set_rejected() {
    let mut ledger = CreditLedger::new(TokenMetadata::default());

    let err = ledger.mint(&acct("0xa"), &acct("0xa"), 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[test]
fn test_mint_zero_and_null_rejected() {
    let minter = acct("0x155");
    let mut ledger = ledger_with_minter(&minter);

    let zero = ledger.mint(&minter, &acct("0xa"), 0).unwrap_err();
    assert_eq!(zero.to_string(), "Amount must be greater than zero");
    assert_eq!(zero.kind(), ErrorKind::Input);

    let null = ledger.mint(&minter, &Account::null(), 5).unwrap_err();
    assert_eq!(null.to_string(), "Invalid address");
    assert_eq!(ledger.total_supply(), 0);
}

// ============================================================================
// Transfers and allowances
// ============================================================================

#[test]
fn test_transfer_moves_balance() {
    let minter = acct("0x155");
    let mut ledger = ledger_with_minter(&minter);
    ledger.mint(&minter, &acct("0xa"), 100).unwrap();

    ledger.transfer(&acct("0xa"), &acct("0xb"), 40).unwrap();

    assert_eq!(ledger.balance_of(&acct("0xa")), 60);
    assert_eq!(ledger.balance_of(&acct("0xb")), 40);
    assert_eq!(ledger.total_supply(), 100);
    assert!(ledger.supply_is_conserved());
}

#[test]
fn test_transfer_over_balance_changes_nothing() {
    let minter = acct("0x155");
    let mut ledger = ledger_with_minter(&minter);
    ledger.mint(&minter, &acct("0xa"), 10).unwrap();
    let before = ledger.clone();

    let err = ledger.transfer(&acct("0xa"), &acct("0xb"), 11).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(ledger, before);
}

#[test]
fn test_transfer_to_null_rejected() {
    let minter = acct("0x155");
    let mut ledger = ledger_with_minter(&minter);
    ledger.mint(&minter, &acct("0xa"), 10).unwrap();

    let err = ledger.transfer(&acct("0xa"), &Account::null(), 1).unwrap_err();

    assert_eq!(err, LedgerError::InvalidAddress);
    assert_eq!(ledger.balance_of(&acct("0xa")), 10);
}

#[test]
fn test_approve_overwrites() {
    let mut ledger = ledger_with_minter(&acct("0x155"));

    ledger.approve(&acct("0xa"), &acct("0x5pender"), 50).unwrap();
    ledger.approve(&acct("0xa"), &acct("0x5pender"), 20).unwrap();

    assert_eq!(ledger.allowance(&acct("0xa"), &acct("0x5pender")), 20);
    assert_eq!(ledger.events().events_of_type("Approval").len(), 2);
}

#[test]
fn test_transfer_from_spends_allowance() {
    let minter = acct("0x155");
    let mut ledger = ledger_with_minter(&minter);
    ledger.mint(&minter, &acct("0xa"), 100).unwrap();
    ledger.approve(&acct("0xa"), &acct("0x5pender"), 30).unwrap();

    ledger
        .transfer_from(&acct("0x5pender"), &acct("0xa"), &acct("0xb"), 25)
        .unwrap();

    assert_eq!(ledger.balance_of(&acct("0xb")), 25);
    assert_eq!(ledger.allowance(&acct("0xa"), &acct("0x5pender")), 5);

    let err = ledger
        .transfer_from(&acct("0x5pender"), &acct("0xa"), &acct("0xb"), 6)
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientAllowance { .. }));
    assert_eq!(ledger.balance_of(&acct("0xa")), 75);
}

#[test]
fn test_transfer_from_insufficient_balance_keeps_allowance() {
    let minter = acct("0x155");
    let mut ledger = ledger_with_minter(&minter);
    ledger.mint(&minter, &acct("0xa"), 5).unwrap();
    ledger.approve(&acct("0xa"), &acct("0x5pender"), 30).unwrap();

    let err = ledger
        .transfer_from(&acct("0x5pender"), &acct("0xa"), &acct("0xb"), 10)
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    assert_eq!(ledger.allowance(&acct("0xa"), &acct("0x5pender")), 30);
}

#[test]
fn test_every_transfer_is_logged() {
    let minter = acct("0x155");
    let mut ledger = ledger_with_minter(&minter);
    let cursor = ledger.events().cursor();

    ledger.mint(&minter, &acct("0xa"), 10).unwrap();
    ledger.transfer(&acct("0xa"), &acct("0xb"), 3).unwrap();

    let records = ledger.events().since(cursor);
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].event,
        Event::Transfer {
            from: Account::null(),
            to: acct("0xa"),
            amount: 10
        }
    );
    assert_eq!(
        records[1].event,
        Event::Transfer {
            from: acct("0xa"),
            to: acct("0xb"),
            amount: 3
        }
    );
}
