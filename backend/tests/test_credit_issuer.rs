//! Tests for the credit issuer
//!
//! Purchases mint `base + balance_before`, so balances from zero with base 1
//! follow 1, 3, 7, 15, 31.

use waitlist_core_rs::{
    tokens, Account, CreditIssuer, CreditLedger, ErrorKind, Event, IssuerError, Payout,
    TokenMetadata, WAD,
};

const PRICE: u128 = WAD / 100;

fn owner() -> Account {
    Account::new("0x0wner")
}

fn setup() -> (CreditIssuer, CreditLedger) {
    let mut ledger = CreditLedger::new(TokenMetadata::default());
    let issuer = CreditIssuer::new(owner(), ledger.address().clone(), PRICE, tokens(1)).unwrap();
    ledger.set_issuer(&owner(), issuer.address().clone()).unwrap();
    (issuer, ledger)
}

#[test]
fn test_first_purchase_mints_base() {
    let (mut issuer, mut ledger) = setup();
    let buyer = Account::new("0xb0b");

    let minted = issuer.buy(&buyer, PRICE, &mut ledger).unwrap();

    assert_eq!(minted, tokens(1));
    assert_eq!(ledger.balance_of(&buyer), tokens(1));
    assert_eq!(issuer.collected(), PRICE);
    assert_eq!(
        issuer.events().last(),
        Some(&Event::TokenPurchased {
            buyer: buyer.clone(),
            amount: tokens(1)
        })
    );
}

#[test]
fn test_purchases_compound() {
    let (mut issuer, mut ledger) = setup();
    let buyer = Account::new("0xb0b");

    let mut balances = Vec::new();
    for _ in 0..5 {
        issuer.buy(&buyer, PRICE, &mut ledger).unwrap();
        balances.push(ledger.balance_of(&buyer) / WAD);
    }

    assert_eq!(balances, vec![1, 3, 7, 15, 31]);
    assert_eq!(issuer.collected(), 5 * PRICE);
    assert!(ledger.supply_is_conserved());
}

#[test]
fn test_quote_matches_next_purchase() {
    let (mut issuer, mut ledger) = setup();
    let buyer = Account::new("0xb0b");
    issuer.buy(&buyer, PRICE, &mut ledger).unwrap();

    let quoted = issuer.quote(&buyer, &ledger).unwrap();
    let minted = issuer.buy(&buyer, PRICE, &mut ledger).unwrap();

    assert_eq!(quoted, minted);
    assert_eq!(minted, tokens(2));
}

#[test]
fn test_inexact_payment_rejected() {
    let (mut issuer, mut ledger) = setup();
    let buyer = Account::new("0xb0b");

    for payment in [0, PRICE - 1, PRICE + 1] {
        let err = issuer.buy(&buyer, payment, &mut ledger).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExactPayment);
        assert!(err.to_string().starts_with("Must send exactly the token price"));
    }

    assert_eq!(issuer.collected(), 0);
    assert_eq!(ledger.total_supply(), 0);
}

#[test]
fn test_withdraw_by_custodian() {
    let (mut issuer, mut ledger) = setup();
    issuer.buy(&Account::new("0xb0b"), PRICE, &mut ledger).unwrap();
    issuer.buy(&Account::new("0xcar01"), PRICE, &mut ledger).unwrap();

    let payout = issuer.withdraw(&owner()).unwrap();

    assert_eq!(
        payout,
        Payout {
            to: owner(),
            amount: 2 * PRICE
        }
    );
    assert_eq!(issuer.collected(), 0);
}

#[test]
fn test_withdraw_by_stranger_rejected() {
    let (mut issuer, mut ledger) = setup();
    issuer.buy(&Account::new("0xb0b"), PRICE, &mut ledger).unwrap();

    let err = issuer.withdraw(&Account::new("0xb0b")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(issuer.collected(), PRICE);
}

#[test]
fn test_withdraw_with_nothing_collected() {
    let (mut issuer, _) = setup();

    let err = issuer.withdraw(&owner()).unwrap_err();

    assert_eq!(err, IssuerError::NothingToWithdraw);
    assert_eq!(err.to_string(), "No funds to withdraw");
    assert_eq!(err.kind(), ErrorKind::State);
}
