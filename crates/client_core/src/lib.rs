use std::sync::Arc;

use shared::{
    domain::EmployeeId,
    protocol::{Employee, PayrollReport},
};

pub mod config;
pub mod coordinator;
pub mod employee_store;
pub mod error;
pub mod payroll_store;
pub mod repository;

pub use config::{load_settings, ClientSettings};
pub use coordinator::{IntentKind, Pending, SyncCoordinator, SyncHandle};
pub use employee_store::{EmployeeState, EmployeeStore, StoreStatus, UpdateOutcome};
pub use error::{RepositoryError, SyncError};
pub use payroll_store::{PayrollState, PayrollStore};
pub use repository::{EmployeeRepository, HttpEmployeeRepository};

/// Broadcast after each reconciliation step, alongside the snapshot update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    EmployeesReplaced {
        count: usize,
    },
    EmployeeAdded(Employee),
    EmployeeUpdated(Employee),
    EmployeeRemoved(EmployeeId),
    /// An update succeeded on the server for a record no longer held locally.
    StaleEdit(EmployeeId),
    PayrollRefreshed(Arc<PayrollReport>),
    PayrollInvalidated,
    Failed {
        intent: IntentKind,
        message: String,
    },
}

pub fn connect(settings: &ClientSettings) -> anyhow::Result<SyncHandle> {
    let base_url = settings.api_base_url()?;
    let repository = HttpEmployeeRepository::new(&base_url, settings.request_timeout())?;
    tracing::info!(api = repository.base_url(), "connecting payroll console core");
    let (handle, _task) = SyncCoordinator::spawn(Arc::new(repository), settings);
    Ok(handle)
}
