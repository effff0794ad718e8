//! Cached payroll report with its own fetch status and staleness flag.

use std::sync::Arc;

use shared::protocol::PayrollReport;

use crate::employee_store::StoreStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayrollState {
    pub report: Option<Arc<PayrollReport>>,
    pub status: StoreStatus,
    pub error_message: Option<String>,
    /// Set when an employee mutation succeeded after `report` was fetched.
    /// A stale report stays displayable until it is refreshed.
    pub stale: bool,
}

impl PayrollState {
    pub fn needs_refresh(&self) -> bool {
        self.report.is_none() || self.stale
    }

    pub fn is_loading(&self) -> bool {
        self.status == StoreStatus::Loading
    }
}

#[derive(Debug, Default)]
pub struct PayrollStore {
    state: Arc<PayrollState>,
}

impl PayrollStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<PayrollState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &PayrollState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PayrollState {
        Arc::make_mut(&mut self.state)
    }

    pub fn begin_fetch(&mut self) {
        self.state_mut().status = StoreStatus::Loading;
    }

    pub fn apply_fetch(&mut self, report: PayrollReport) -> Arc<PayrollReport> {
        let report = Arc::new(report);
        let state = self.state_mut();
        state.report = Some(Arc::clone(&report));
        state.status = StoreStatus::Idle;
        state.stale = false;
        report
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let state = self.state_mut();
        state.status = StoreStatus::Error;
        state.error_message = Some(message.into());
    }

    pub fn invalidate(&mut self) -> bool {
        if self.state.stale {
            return false;
        }
        self.state_mut().stale = true;
        true
    }

    pub fn clear_error(&mut self) {
        if self.state.error_message.is_none() && self.state.status != StoreStatus::Error {
            return;
        }
        let state = self.state_mut();
        state.error_message = None;
        if state.status == StoreStatus::Error {
            state.status = StoreStatus::Idle;
        }
    }
}

#[cfg(test)]
#[path = "tests/payroll_store_tests.rs"]
mod tests;
