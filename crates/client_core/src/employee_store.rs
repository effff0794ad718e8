//! Canonical in-memory employee collection.
//!
//! Every method here is a single synchronous reconciliation step. The
//! coordinator loop is the only caller, so no step can interleave with another.

use std::sync::Arc;

use shared::{domain::EmployeeId, protocol::Employee};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreStatus {
    #[default]
    Idle,
    Loading,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeState {
    pub employees: Vec<Employee>,
    pub status: StoreStatus,
    pub error_message: Option<String>,
}

impl EmployeeState {
    pub fn get(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.iter().find(|employee| employee.id == Some(id))
    }

    pub fn is_loading(&self) -> bool {
        self.status == StoreStatus::Loading
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Replaced,
    /// No local record carried the id; the collection was left untouched.
    Missing,
}

/// Copy-on-write owner of [`EmployeeState`]. Snapshots already handed out are
/// never mutated; the next step clones the state if a snapshot is still alive.
#[derive(Debug, Default)]
pub struct EmployeeStore {
    state: Arc<EmployeeState>,
}

impl EmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employees(employees: Vec<Employee>) -> Self {
        Self {
            state: Arc::new(EmployeeState {
                employees,
                ..EmployeeState::default()
            }),
        }
    }

    pub fn snapshot(&self) -> Arc<EmployeeState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &EmployeeState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EmployeeState {
        Arc::make_mut(&mut self.state)
    }

    pub fn begin_fetch(&mut self) {
        self.state_mut().status = StoreStatus::Loading;
    }

    pub fn apply_fetch(&mut self, employees: Vec<Employee>) {
        warn_on_duplicate_ids(&employees);
        let state = self.state_mut();
        state.employees = employees;
        state.status = StoreStatus::Idle;
    }

    /// Records a failure. The collection keeps its last-known value.
    pub fn fail(&mut self, message: impl Into<String>) {
        let state = self.state_mut();
        state.status = StoreStatus::Error;
        state.error_message = Some(message.into());
    }

    /// Appends a freshly created record. A record whose id is already present
    /// (a fetch that settled first may have brought it in) is replaced instead.
    pub fn apply_created(&mut self, employee: Employee) {
        let state = self.state_mut();
        let existing = employee.id.and_then(|id| {
            state
                .employees
                .iter()
                .position(|current| current.id == Some(id))
        });
        match existing {
            Some(index) => {
                debug!(employee_id = ?employee.id, "created employee already present; replacing");
                state.employees[index] = employee;
            }
            None => state.employees.push(employee),
        }
    }

    pub fn apply_updated(&mut self, id: EmployeeId, employee: Employee) -> UpdateOutcome {
        let Some(index) = self
            .state
            .employees
            .iter()
            .position(|current| current.id == Some(id))
        else {
            return UpdateOutcome::Missing;
        };

        self.state_mut().employees[index] = employee;
        UpdateOutcome::Replaced
    }

    pub fn apply_removed(&mut self, id: EmployeeId) -> bool {
        if self.state.get(id).is_none() {
            return false;
        }
        let state = self.state_mut();
        let before = state.employees.len();
        state.employees.retain(|employee| employee.id != Some(id));
        state.employees.len() != before
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

fn warn_on_duplicate_ids(employees: &[Employee]) {
    let mut seen = std::collections::HashSet::new();
    for id in employees.iter().filter_map(|employee| employee.id) {
        if !seen.insert(id) {
            warn!(employee_id = %id, "server returned duplicate employee id");
        }
    }
}

#[cfg(test)]
#[path = "tests/employee_store_tests.rs"]
mod tests;
