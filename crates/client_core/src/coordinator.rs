//! Routes intents to the repository and reconciles both stores when the
//! resulting requests settle.
//!
//! The coordinator is a single task. It owns the [`EmployeeStore`] and the
//! [`PayrollStore`]; nothing else can mutate them. Every repository call runs
//! in its own spawned task and reports back over the settlement channel, so
//! reconciliation happens strictly in settlement order, one step at a time.
//! Callers hold a [`SyncHandle`] and observe immutable snapshots.

use std::{fmt, future::Future, sync::Arc};

use shared::{
    domain::EmployeeId,
    protocol::{Employee, PayrollReport},
};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::ClientSettings,
    employee_store::{EmployeeState, EmployeeStore, UpdateOutcome},
    error::{RepositoryError, SyncError},
    payroll_store::{PayrollState, PayrollStore},
    repository::EmployeeRepository,
    SyncEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    FetchEmployees,
    CreateEmployee,
    UpdateEmployee,
    DeleteEmployee,
    FetchPayroll,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FetchEmployees => "fetch_employees",
            Self::CreateEmployee => "create_employee",
            Self::UpdateEmployee => "update_employee",
            Self::DeleteEmployee => "delete_employee",
            Self::FetchPayroll => "fetch_payroll",
        }
    }

    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::FetchEmployees => "Failed to fetch employees",
            Self::CreateEmployee => "Failed to create employee",
            Self::UpdateEmployee => "Failed to update employee",
            Self::DeleteEmployee => "Failed to delete employee",
            Self::FetchPayroll => "Failed to fetch payroll",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Reply<T> = oneshot::Sender<Result<T, SyncError>>;

enum Intent {
    FetchEmployees {
        reply: Reply<()>,
    },
    AddEmployee {
        draft: Employee,
        reply: Reply<Employee>,
    },
    UpdateEmployee {
        id: EmployeeId,
        patch: Employee,
        reply: Reply<Employee>,
    },
    RemoveEmployee {
        id: EmployeeId,
        reply: Reply<()>,
    },
    FetchPayroll {
        reply: Reply<()>,
    },
    ViewPayroll {
        reply: Reply<()>,
    },
    ClearEmployeeError {
        reply: Reply<()>,
    },
    ClearPayrollError {
        reply: Reply<()>,
    },
}

impl Intent {
    fn name(&self) -> &'static str {
        match self {
            Self::FetchEmployees { .. } => "fetch_employees",
            Self::AddEmployee { .. } => "add_employee",
            Self::UpdateEmployee { .. } => "update_employee",
            Self::RemoveEmployee { .. } => "remove_employee",
            Self::FetchPayroll { .. } => "fetch_payroll",
            Self::ViewPayroll { .. } => "view_payroll",
            Self::ClearEmployeeError { .. } => "clear_employee_error",
            Self::ClearPayrollError { .. } => "clear_payroll_error",
        }
    }
}

enum Settlement {
    EmployeesFetched(Result<Vec<Employee>, RepositoryError>),
    EmployeeCreated {
        result: Result<Employee, RepositoryError>,
        reply: Reply<Employee>,
    },
    EmployeeUpdated {
        id: EmployeeId,
        result: Result<Employee, RepositoryError>,
        reply: Reply<Employee>,
    },
    EmployeeRemoved {
        id: EmployeeId,
        result: Result<(), RepositoryError>,
        reply: Reply<()>,
    },
    PayrollFetched(Result<PayrollReport, RepositoryError>),
}

/// Outstanding intent. Awaiting it is optional: the request reconciles
/// whether or not anyone is still waiting.
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, SyncError>>,
}

impl<T> Pending<T> {
    pub async fn settled(self) -> Result<T, SyncError> {
        self.rx.await.map_err(|_| SyncError::CoordinatorClosed)?
    }
}

pub struct SyncCoordinator {
    repository: Arc<dyn EmployeeRepository>,
    employees: EmployeeStore,
    payroll: PayrollStore,
    intents: mpsc::Receiver<Intent>,
    settle_tx: mpsc::UnboundedSender<Settlement>,
    settlements: mpsc::UnboundedReceiver<Settlement>,
    /// `Some` while an employee fetch is in flight; holds every caller
    /// coalesced into it.
    employee_fetch_waiters: Option<Vec<Reply<()>>>,
    payroll_fetch_waiters: Option<Vec<Reply<()>>>,
    in_flight: usize,
    employee_tx: watch::Sender<Arc<EmployeeState>>,
    payroll_tx: watch::Sender<Arc<PayrollState>>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncCoordinator {
    pub fn new(
        repository: Arc<dyn EmployeeRepository>,
        settings: &ClientSettings,
    ) -> (Self, SyncHandle) {
        let (intent_tx, intents) = mpsc::channel(settings.intent_queue_capacity.max(1));
        let (settle_tx, settlements) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(settings.event_buffer.max(1));

        let employees = EmployeeStore::new();
        let payroll = PayrollStore::new();
        let (employee_tx, employee_rx) = watch::channel(employees.snapshot());
        let (payroll_tx, payroll_rx) = watch::channel(payroll.snapshot());

        let handle = SyncHandle {
            intents: intent_tx,
            employees: employee_rx,
            payroll: payroll_rx,
            events: events.clone(),
            repository: Arc::clone(&repository),
        };

        let coordinator = Self {
            repository,
            employees,
            payroll,
            intents,
            settle_tx,
            settlements,
            employee_fetch_waiters: None,
            payroll_fetch_waiters: None,
            in_flight: 0,
            employee_tx,
            payroll_tx,
            events,
        };

        (coordinator, handle)
    }

    pub fn spawn(
        repository: Arc<dyn EmployeeRepository>,
        settings: &ClientSettings,
    ) -> (SyncHandle, JoinHandle<()>) {
        let (coordinator, handle) = Self::new(repository, settings);
        let task = tokio::spawn(coordinator.run());
        (handle, task)
    }

    /// Runs until every [`SyncHandle`] is dropped and all outstanding
    /// requests have settled.
    pub async fn run(mut self) {
        let mut intents_open = true;
        loop {
            tokio::select! {
                biased;
                Some(settlement) = self.settlements.recv() => self.reconcile(settlement),
                intent = self.intents.recv(), if intents_open => match intent {
                    Some(intent) => self.accept(intent),
                    None => {
                        debug!(in_flight = self.in_flight, "all sync handles dropped");
                        intents_open = false;
                    }
                },
                else => break,
            }

            if !intents_open && self.in_flight == 0 {
                break;
            }
        }
        info!("sync coordinator stopped");
    }

    fn accept(&mut self, intent: Intent) {
        debug!(intent = intent.name(), "accepted intent");
        match intent {
            Intent::FetchEmployees { reply } => self.start_employee_fetch(reply),
            Intent::AddEmployee { draft, reply } => {
                let repository = Arc::clone(&self.repository);
                self.spawn_request(
                    async move { repository.create_employee(&draft.as_draft()).await },
                    move |result| Settlement::EmployeeCreated { result, reply },
                );
            }
            Intent::UpdateEmployee { id, patch, reply } => {
                let repository = Arc::clone(&self.repository);
                let patch = patch.with_id(id);
                self.spawn_request(
                    async move { repository.update_employee(id, &patch).await },
                    move |result| Settlement::EmployeeUpdated { id, result, reply },
                );
            }
            Intent::RemoveEmployee { id, reply } => {
                let repository = Arc::clone(&self.repository);
                self.spawn_request(
                    async move { repository.delete_employee(id).await },
                    move |result| Settlement::EmployeeRemoved { id, result, reply },
                );
            }
            Intent::FetchPayroll { reply } => self.start_payroll_fetch(reply),
            Intent::ViewPayroll { reply } => {
                if self.payroll_fetch_waiters.is_some() || self.payroll.state().needs_refresh() {
                    self.start_payroll_fetch(reply);
                } else {
                    debug!("payroll report is fresh; skipping fetch");
                    let _ = reply.send(Ok(()));
                }
            }
            Intent::ClearEmployeeError { reply } => {
                self.employees.clear_error();
                self.publish_employees();
                let _ = reply.send(Ok(()));
            }
            Intent::ClearPayrollError { reply } => {
                self.payroll.clear_error();
                self.publish_payroll();
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn start_employee_fetch(&mut self, reply: Reply<()>) {
        if let Some(waiters) = self.employee_fetch_waiters.as_mut() {
            debug!("employee fetch already in flight; coalescing");
            waiters.push(reply);
            return;
        }

        self.employee_fetch_waiters = Some(vec![reply]);
        self.employees.begin_fetch();
        self.publish_employees();

        let repository = Arc::clone(&self.repository);
        self.spawn_request(
            async move { repository.list_employees().await },
            Settlement::EmployeesFetched,
        );
    }

    fn start_payroll_fetch(&mut self, reply: Reply<()>) {
        if let Some(waiters) = self.payroll_fetch_waiters.as_mut() {
            debug!("payroll fetch already in flight; coalescing");
            waiters.push(reply);
            return;
        }

        self.payroll_fetch_waiters = Some(vec![reply]);
        self.payroll.begin_fetch();
        self.publish_payroll();

        let repository = Arc::clone(&self.repository);
        self.spawn_request(
            async move { repository.payroll_report().await },
            Settlement::PayrollFetched,
        );
    }

    /// Runs `request` on its own task. A request that panics or is cancelled
    /// still settles, as [`RepositoryError::Aborted`].
    fn spawn_request<T, F, S>(&mut self, request: F, settle: S)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, RepositoryError>> + Send + 'static,
        S: FnOnce(Result<T, RepositoryError>) -> Settlement + Send + 'static,
    {
        self.in_flight += 1;
        let settle_tx = self.settle_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::spawn(request).await {
                Ok(result) => result,
                Err(err) => {
                    error!(error = %err, "repository request task did not complete");
                    Err(RepositoryError::Aborted(err.to_string()))
                }
            };
            let _ = settle_tx.send(settle(result));
        });
    }

    fn reconcile(&mut self, settlement: Settlement) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match settlement {
            Settlement::EmployeesFetched(result) => self.reconcile_employee_fetch(result),
            Settlement::EmployeeCreated { result, reply } => {
                let result = result.and_then(|employee| {
                    if employee.id.is_some() {
                        Ok(employee)
                    } else {
                        Err(RepositoryError::MissingId)
                    }
                });
                let outcome = match result {
                    Ok(employee) => {
                        info!(
                            employee_id = ?employee.id,
                            code = %employee.employee_code,
                            "employee created"
                        );
                        self.employees.apply_created(employee.clone());
                        self.publish_employees();
                        self.emit(SyncEvent::EmployeeAdded(employee.clone()));
                        self.invalidate_payroll();
                        Ok(employee)
                    }
                    Err(err) => Err(self.fail_employee_intent(IntentKind::CreateEmployee, &err)),
                };
                let _ = reply.send(outcome);
            }
            Settlement::EmployeeUpdated { id, result, reply } => {
                let outcome = match result {
                    Ok(mut employee) => {
                        let id = *employee.id.get_or_insert(id);
                        match self.employees.apply_updated(id, employee.clone()) {
                            UpdateOutcome::Replaced => {
                                info!(employee_id = %id, "employee updated");
                                self.publish_employees();
                                self.emit(SyncEvent::EmployeeUpdated(employee.clone()));
                            }
                            UpdateOutcome::Missing => {
                                warn!(employee_id = %id, "updated employee no longer held locally");
                                self.emit(SyncEvent::StaleEdit(id));
                            }
                        }
                        self.invalidate_payroll();
                        Ok(employee)
                    }
                    Err(err) => Err(self.fail_employee_intent(IntentKind::UpdateEmployee, &err)),
                };
                let _ = reply.send(outcome);
            }
            Settlement::EmployeeRemoved { id, result, reply } => {
                let outcome = match result {
                    Ok(()) => {
                        let removed = self.employees.apply_removed(id);
                        info!(employee_id = %id, removed, "employee deleted");
                        if removed {
                            self.publish_employees();
                        }
                        self.emit(SyncEvent::EmployeeRemoved(id));
                        self.invalidate_payroll();
                        Ok(())
                    }
                    Err(err) => Err(self.fail_employee_intent(IntentKind::DeleteEmployee, &err)),
                };
                let _ = reply.send(outcome);
            }
            Settlement::PayrollFetched(result) => self.reconcile_payroll_fetch(result),
        }
    }

    fn reconcile_employee_fetch(&mut self, result: Result<Vec<Employee>, RepositoryError>) {
        let waiters = self.employee_fetch_waiters.take().unwrap_or_default();
        let outcome = match result {
            Ok(employees) => {
                let count = employees.len();
                info!(count, coalesced = waiters.len(), "employees fetched");
                self.employees.apply_fetch(employees);
                self.publish_employees();
                self.emit(SyncEvent::EmployeesReplaced { count });
                Ok(())
            }
            Err(err) => Err(self.fail_employee_intent(IntentKind::FetchEmployees, &err)),
        };
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn reconcile_payroll_fetch(&mut self, result: Result<PayrollReport, RepositoryError>) {
        let waiters = self.payroll_fetch_waiters.take().unwrap_or_default();
        let outcome = match result {
            Ok(report) => {
                if !report.summary.is_balanced() || !report.totals_match_line_items() {
                    warn!(
                        total_employees = report.summary.total_employees,
                        line_items = report.line_items.len(),
                        "payroll report totals disagree with themselves"
                    );
                }
                info!(line_items = report.line_items.len(), "payroll fetched");
                let report = self.payroll.apply_fetch(report);
                self.publish_payroll();
                self.emit(SyncEvent::PayrollRefreshed(report));
                Ok(())
            }
            Err(err) => {
                let intent = IntentKind::FetchPayroll;
                warn!(intent = %intent, error = %err, "repository request failed");
                let failure = SyncError::from_repository(intent, &err);
                self.payroll.fail(err.user_message(intent));
                self.publish_payroll();
                self.emit(SyncEvent::Failed {
                    intent,
                    message: failure.to_string(),
                });
                Err(failure)
            }
        };
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn fail_employee_intent(&mut self, intent: IntentKind, err: &RepositoryError) -> SyncError {
        warn!(intent = %intent, error = %err, "repository request failed");
        let failure = SyncError::from_repository(intent, err);
        self.employees.fail(err.user_message(intent));
        self.publish_employees();
        self.emit(SyncEvent::Failed {
            intent,
            message: failure.to_string(),
        });
        failure
    }

    fn invalidate_payroll(&mut self) {
        if self.payroll.invalidate() {
            debug!("payroll report marked stale");
            self.publish_payroll();
            self.emit(SyncEvent::PayrollInvalidated);
        }
    }

    fn publish_employees(&self) {
        self.employee_tx.send_replace(self.employees.snapshot());
    }

    fn publish_payroll(&self) {
        self.payroll_tx.send_replace(self.payroll.snapshot());
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }
}

#[derive(Clone)]
pub struct SyncHandle {
    intents: mpsc::Sender<Intent>,
    employees: watch::Receiver<Arc<EmployeeState>>,
    payroll: watch::Receiver<Arc<PayrollState>>,
    events: broadcast::Sender<SyncEvent>,
    repository: Arc<dyn EmployeeRepository>,
}

impl SyncHandle {
    async fn submit<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Intent,
    ) -> Result<Pending<T>, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.intents
            .send(build(reply))
            .await
            .map_err(|_| SyncError::CoordinatorClosed)?;
        Ok(Pending { rx })
    }

    pub async fn submit_fetch_employees(&self) -> Result<Pending<()>, SyncError> {
        self.submit(|reply| Intent::FetchEmployees { reply }).await
    }

    pub async fn submit_add_employee(
        &self,
        draft: Employee,
    ) -> Result<Pending<Employee>, SyncError> {
        self.submit(|reply| Intent::AddEmployee { draft, reply }).await
    }

    pub async fn submit_update_employee(
        &self,
        id: EmployeeId,
        patch: Employee,
    ) -> Result<Pending<Employee>, SyncError> {
        self.submit(|reply| Intent::UpdateEmployee { id, patch, reply }).await
    }

    pub async fn submit_remove_employee(&self, id: EmployeeId) -> Result<Pending<()>, SyncError> {
        self.submit(|reply| Intent::RemoveEmployee { id, reply }).await
    }

    pub async fn submit_fetch_payroll(&self) -> Result<Pending<()>, SyncError> {
        self.submit(|reply| Intent::FetchPayroll { reply }).await
    }

    pub async fn fetch_employees(&self) -> Result<(), SyncError> {
        self.submit_fetch_employees().await?.settled().await
    }

    pub async fn add_employee(&self, draft: Employee) -> Result<Employee, SyncError> {
        self.submit_add_employee(draft).await?.settled().await
    }

    pub async fn update_employee(
        &self,
        id: EmployeeId,
        patch: Employee,
    ) -> Result<Employee, SyncError> {
        self.submit_update_employee(id, patch).await?.settled().await
    }

    pub async fn remove_employee(&self, id: EmployeeId) -> Result<(), SyncError> {
        self.submit_remove_employee(id).await?.settled().await
    }

    pub async fn fetch_payroll(&self) -> Result<(), SyncError> {
        self.submit_fetch_payroll().await?.settled().await
    }

    /// Fetches the payroll report only if none is cached or it went stale.
    pub async fn view_payroll(&self) -> Result<(), SyncError> {
        self.submit(|reply| Intent::ViewPayroll { reply })
            .await?
            .settled()
            .await
    }

    pub async fn clear_employee_error(&self) -> Result<(), SyncError> {
        self.submit(|reply| Intent::ClearEmployeeError { reply })
            .await?
            .settled()
            .await
    }

    pub async fn clear_payroll_error(&self) -> Result<(), SyncError> {
        self.submit(|reply| Intent::ClearPayrollError { reply })
            .await?
            .settled()
            .await
    }

    pub fn employees(&self) -> Arc<EmployeeState> {
        self.employees.borrow().clone()
    }

    pub fn payroll(&self) -> Arc<PayrollState> {
        self.payroll.borrow().clone()
    }

    pub fn watch_employees(&self) -> watch::Receiver<Arc<EmployeeState>> {
        self.employees.clone()
    }

    pub fn watch_payroll(&self) -> watch::Receiver<Arc<PayrollState>> {
        self.payroll.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Reads one employee straight from the repository; no store is touched.
    pub async fn load_employee(&self, id: EmployeeId) -> Result<Employee, RepositoryError> {
        self.repository.get_employee(id).await
    }

    /// Reads one employee's payroll breakdown; the cached report is untouched.
    pub async fn employee_payroll(&self, id: EmployeeId) -> Result<PayrollReport, RepositoryError> {
        self.repository.employee_payroll(id).await
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
