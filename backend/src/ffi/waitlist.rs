//! PyO3 wrapper for Waitlist
//!
//! This module provides the Python interface to a deployed waitlist.

use pyo3::exceptions::{PyPermissionError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::core::account::{Account, Amount};
use crate::core::errors::ErrorKind;
use crate::models::event::EventLog;
use crate::orchestrator::{Waitlist, WaitlistConfig, WaitlistError, WaitlistSnapshot};

fn to_py_err(err: WaitlistError) -> PyErr {
    let message = format!("{}: {}", err.kind(), err);
    match err.kind() {
        ErrorKind::Authorization => PyErr::new::<PyPermissionError, _>(message),
        ErrorKind::Input | ErrorKind::ExactPayment => PyErr::new::<PyValueError, _>(message),
        ErrorKind::State | ErrorKind::InsufficientFunds => PyErr::new::<PyRuntimeError, _>(message),
    }
}

fn records_json(log: &EventLog, cursor: u64) -> PyResult<String> {
    serde_json::to_string(log.since(cursor))
        .map_err(|e| PyErr::new::<PyRuntimeError, _>(format!("Event encode failed: {}", e)))
}

/// Python wrapper for Rust Waitlist
///
/// # Example (from Python)
///
/// ```python
/// from waitlist._core import Waitlist
///
/// wl = Waitlist("0xdeployer")
/// wl.buy("0xalice", wl.unit_price())
/// wl.approve_queue("0xalice", wl.registration_cost())
/// assert wl.join("0xalice") == 1
/// ```
#[pyclass(name = "Waitlist")]
pub struct PyWaitlist {
    inner: Waitlist,
}

#[pymethods]
impl PyWaitlist {
    /// Deploy a waitlist; `config_json` overrides the default constants
    #[new]
    #[pyo3(signature = (deployer, config_json = None))]
    fn new(deployer: &str, config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => WaitlistConfig::from_json_str(json).map_err(to_py_err)?,
            None => WaitlistConfig::default(),
        };
        let inner = Waitlist::deploy(config, Account::new(deployer)).map_err(to_py_err)?;
        Ok(PyWaitlist { inner })
    }

    /// Restore a waitlist from `snapshot_json` taken under `config_json`
    #[staticmethod]
    #[pyo3(signature = (snapshot_json, config_json = None))]
    fn restore(snapshot_json: &str, config_json: Option<&str>) -> PyResult<Self> {
        let snapshot = WaitlistSnapshot::from_json(snapshot_json).map_err(to_py_err)?;
        let config = match config_json {
            Some(json) => WaitlistConfig::from_json_str(json).map_err(to_py_err)?,
            None => snapshot.config.clone(),
        };
        let inner = Waitlist::restore(snapshot, &config).map_err(to_py_err)?;
        Ok(PyWaitlist { inner })
    }

    fn snapshot_json(&self) -> PyResult<String> {
        self.inner.snapshot().to_json().map_err(to_py_err)
    }

    // ========================================================================
    // Addresses and constants
    // ========================================================================

    fn ledger_address(&self) -> String {
        self.inner.ledger().address().to_string()
    }

    fn issuer_address(&self) -> String {
        self.inner.issuer().address().to_string()
    }

    fn queue_address(&self) -> String {
        self.inner.queue().address().to_string()
    }

    fn version(&self) -> &'static str {
        self.inner.queue().version()
    }

    fn registration_cost(&self) -> Amount {
        self.inner.queue().registration_cost()
    }

    fn withdrawal_refund(&self) -> Amount {
        self.inner.queue().withdrawal_refund()
    }

    fn unit_price(&self) -> Amount {
        self.inner.issuer().unit_price()
    }

    // ========================================================================
    // Credit ledger
    // ========================================================================

    fn balance_of(&self, account: &str) -> Amount {
        self.inner.balance_of(&Account::new(account))
    }

    fn allowance(&self, owner: &str, spender: &str) -> Amount {
        self.inner.allowance(&Account::new(owner), &Account::new(spender))
    }

    fn total_supply(&self) -> Amount {
        self.inner.total_supply()
    }

    fn transfer(&mut self, caller: &str, to: &str, amount: Amount) -> PyResult<()> {
        self.inner
            .transfer(&Account::new(caller), &Account::new(to), amount)
            .map_err(to_py_err)
    }

    fn approve(&mut self, owner: &str, spender: &str, amount: Amount) -> PyResult<()> {
        self.inner
            .approve(&Account::new(owner), &Account::new(spender), amount)
            .map_err(to_py_err)
    }

    fn approve_queue(&mut self, owner: &str, amount: Amount) -> PyResult<()> {
        self.inner
            .approve_queue(&Account::new(owner), amount)
            .map_err(to_py_err)
    }

    fn transfer_from(
        &mut self,
        spender: &str,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> PyResult<()> {
        self.inner
            .transfer_from(
                &Account::new(spender),
                &Account::new(from),
                &Account::new(to),
                amount,
            )
            .map_err(to_py_err)
    }

    // ========================================================================
    // Credit issuer
    // ========================================================================

    fn buy(&mut self, caller: &str, payment: Amount) -> PyResult<Amount> {
        self.inner
            .buy(&Account::new(caller), payment)
            .map_err(to_py_err)
    }

    fn quote(&self, buyer: &str) -> PyResult<Amount> {
        self.inner.quote(&Account::new(buyer)).map_err(to_py_err)
    }

    fn collected(&self) -> Amount {
        self.inner.collected()
    }

    /// Returns the amount released to the custodian
    fn withdraw_funds(&mut self, caller: &str) -> PyResult<Amount> {
        self.inner
            .withdraw_funds(&Account::new(caller))
            .map(|payout| payout.amount)
            .map_err(to_py_err)
    }

    // ========================================================================
    // Queue ledger
    // ========================================================================

    fn join(&mut self, caller: &str) -> PyResult<usize> {
        self.inner.join(&Account::new(caller)).map_err(to_py_err)
    }

    fn leave(&mut self, caller: &str) -> PyResult<Amount> {
        self.inner.leave(&Account::new(caller)).map_err(to_py_err)
    }

    fn evict(&mut self, caller: &str) -> PyResult<String> {
        self.inner
            .evict(&Account::new(caller))
            .map(|account| account.to_string())
            .map_err(to_py_err)
    }

    fn upgrade_queue(&mut self, caller: &str) -> PyResult<()> {
        self.inner
            .upgrade_queue(&Account::new(caller))
            .map_err(to_py_err)
    }

    fn is_in_queue(&self, account: &str) -> bool {
        self.inner.is_in_queue(&Account::new(account))
    }

    fn queue_length(&self) -> usize {
        self.inner.queue_length()
    }

    fn queue_at(&self, index: usize) -> PyResult<String> {
        self.inner
            .queue_at(index)
            .map(|account| account.to_string())
            .map_err(to_py_err)
    }

    fn position_of(&self, caller: &str) -> PyResult<usize> {
        self.inner
            .position_of(&Account::new(caller))
            .map_err(to_py_err)
    }

    fn members(&self) -> Vec<String> {
        self.inner.members().iter().map(|a| a.to_string()).collect()
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Ledger events with sequence number >= `cursor`, as JSON
    fn ledger_events_since(&self, cursor: u64) -> PyResult<String> {
        records_json(self.inner.ledger().events(), cursor)
    }

    /// Issuer events with sequence number >= `cursor`, as JSON
    fn issuer_events_since(&self, cursor: u64) -> PyResult<String> {
        records_json(self.inner.issuer().events(), cursor)
    }

    /// Queue events with sequence number >= `cursor`, as JSON
    fn queue_events_since(&self, cursor: u64) -> PyResult<String> {
        records_json(self.inner.queue().events(), cursor)
    }
}
