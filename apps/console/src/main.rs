use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use client_core::{load_settings, SyncError, SyncHandle};
use rust_decimal::Decimal;
use shared::{
    domain::{EmployeeId, EmployeeStatus, DEPARTMENTS},
    protocol::Employee,
};
use tracing_subscriber::EnvFilter;

mod view;

#[derive(Parser, Debug)]
#[command(about = "Employee and payroll administration console")]
struct Cli {
    /// Overrides `api_base_url` from console.toml and the environment.
    #[arg(long)]
    api_url: Option<String>,
    /// Per-request timeout in seconds; 0 disables it.
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all employees.
    List,
    Show {
        id: i64,
    },
    Add(NewEmployee),
    Update {
        id: i64,
        #[command(flatten)]
        changes: EmployeeChanges,
    },
    Delete {
        id: i64,
    },
    /// Show the payroll report, or one employee's breakdown.
    Payroll {
        #[arg(long)]
        employee: Option<i64>,
    },
}

#[derive(Args, Debug)]
struct NewEmployee {
    #[arg(long)]
    code: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long)]
    salary: Decimal,
    /// YYYY-MM-DD
    #[arg(long)]
    hire_date: NaiveDate,
    #[arg(long)]
    department: String,
    #[arg(long, default_value = "active")]
    status: EmployeeStatus,
}

impl NewEmployee {
    fn into_draft(self) -> Employee {
        Employee {
            id: None,
            employee_code: self.code,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            basic_salary: self.salary,
            hire_date: self.hire_date,
            department: self.department,
            status: self.status,
        }
    }
}

#[derive(Args, Debug)]
struct EmployeeChanges {
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    salary: Option<Decimal>,
    #[arg(long)]
    hire_date: Option<NaiveDate>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    status: Option<EmployeeStatus>,
}

impl EmployeeChanges {
    fn apply_to(self, mut employee: Employee) -> Employee {
        if let Some(code) = self.code {
            employee.employee_code = code;
        }
        if let Some(first_name) = self.first_name {
            employee.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            employee.last_name = last_name;
        }
        if let Some(email) = self.email {
            employee.email = email;
        }
        if let Some(phone) = self.phone {
            employee.phone = phone;
        }
        if let Some(salary) = self.salary {
            employee.basic_salary = salary;
        }
        if let Some(hire_date) = self.hire_date {
            employee.hire_date = hire_date;
        }
        if let Some(department) = self.department {
            employee.department = department;
        }
        if let Some(status) = self.status {
            employee.status = status;
        }
        employee
    }
}

fn warn_unknown_department(department: &str) {
    if !DEPARTMENTS.contains(&department) {
        tracing::warn!(department, known = ?DEPARTMENTS, "department is not a standard one");
    }
}

/// Prints the employee screen, including its error banner, then turns a
/// failed intent into the process error.
fn report_employees(handle: &SyncHandle, outcome: Result<(), SyncError>) -> Result<()> {
    print!("{}", view::employee_screen(&handle.employees()));
    outcome.map_err(Into::into)
}

async fn run(handle: SyncHandle, command: Command) -> Result<()> {
    match command {
        Command::List => {
            let outcome = handle.fetch_employees().await;
            report_employees(&handle, outcome)?;
        }
        Command::Show { id } => {
            let employee = handle
                .load_employee(EmployeeId(id))
                .await
                .with_context(|| format!("failed to load employee {id}"))?;
            print!("{}", view::employee_detail(&employee));
        }
        Command::Add(new_employee) => {
            warn_unknown_department(&new_employee.department);
            handle.fetch_employees().await?;
            let outcome = handle
                .add_employee(new_employee.into_draft())
                .await
                .map(|created| {
                    println!("created employee {}", created.id.map(|id| id.0).unwrap_or_default());
                });
            report_employees(&handle, outcome)?;
        }
        Command::Update { id, changes } => {
            let id = EmployeeId(id);
            let current = handle
                .load_employee(id)
                .await
                .with_context(|| format!("failed to load employee {id}"))?;
            if let Some(department) = changes.department.as_deref() {
                warn_unknown_department(department);
            }
            handle.fetch_employees().await?;
            let outcome = handle
                .update_employee(id, changes.apply_to(current))
                .await
                .map(|updated| print!("{}", view::employee_detail(&updated)));
            report_employees(&handle, outcome)?;
        }
        Command::Delete { id } => {
            handle.fetch_employees().await?;
            let outcome = handle.remove_employee(EmployeeId(id)).await;
            report_employees(&handle, outcome)?;
        }
        Command::Payroll { employee: Some(id) } => {
            let report = handle
                .employee_payroll(EmployeeId(id))
                .await
                .with_context(|| format!("failed to load payroll for employee {id}"))?;
            print!("{}", view::payroll_report(&report));
        }
        Command::Payroll { employee: None } => {
            let outcome = handle.view_payroll().await;
            print!("{}", view::payroll_screen(&handle.payroll()));
            outcome?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        settings.request_timeout_secs = Some(timeout_secs);
    }

    let handle = client_core::connect(&settings).context("failed to start sync core")?;
    run(handle, cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_flags_are_all_optional() {
        let cli = Cli::try_parse_from(["payroll-console", "update", "4", "--salary", "61000.50"])
            .expect("parse");
        let Command::Update { id, changes } = cli.command else {
            panic!("expected update");
        };
        assert_eq!(id, 4);
        assert_eq!(changes.salary, Some(Decimal::new(6100050, 2)));
        assert!(changes.department.is_none());
    }

    #[test]
    fn changes_only_touch_given_fields() {
        let current = Employee {
            id: Some(EmployeeId(4)),
            employee_code: "EMP004".to_string(),
            first_name: "Kevin".to_string(),
            last_name: "Kiptoo".to_string(),
            email: "kevin@example.com".to_string(),
            phone: "+254700000004".to_string(),
            basic_salary: Decimal::from(55000),
            hire_date: NaiveDate::from_ymd_opt(2023, 5, 1).expect("date"),
            department: "Operations".to_string(),
            status: EmployeeStatus::Active,
        };
        let cli = Cli::try_parse_from([
            "payroll-console",
            "update",
            "4",
            "--status",
            "inactive",
            "--department",
            "HR",
        ])
        .expect("parse");
        let Command::Update { changes, .. } = cli.command else {
            panic!("expected update");
        };

        let updated = changes.apply_to(current.clone());

        assert_eq!(updated.status, EmployeeStatus::Inactive);
        assert_eq!(updated.department, "HR");
        assert_eq!(updated.basic_salary, current.basic_salary);
        assert_eq!(updated.email, current.email);
    }

    #[test]
    fn add_requires_core_fields_and_defaults_status() {
        let cli = Cli::try_parse_from([
            "payroll-console",
            "add",
            "--code",
            "EMP010",
            "--first-name",
            "Faith",
            "--last-name",
            "Muthoni",
            "--email",
            "faith@example.com",
            "--salary",
            "48000",
            "--hire-date",
            "2024-02-12",
            "--department",
            "Marketing",
        ])
        .expect("parse");
        let Command::Add(new_employee) = cli.command else {
            panic!("expected add");
        };

        let draft = new_employee.into_draft();
        assert_eq!(draft.id, None);
        assert_eq!(draft.status, EmployeeStatus::Active);
        assert_eq!(draft.phone, "");

        assert!(Cli::try_parse_from(["payroll-console", "add", "--code", "EMP011"]).is_err());
    }

    #[test]
    fn payroll_accepts_employee_filter() {
        let cli = Cli::try_parse_from([
            "payroll-console",
            "--api-url",
            "localhost:9000/api",
            "payroll",
            "--employee",
            "2",
        ])
        .expect("parse");
        assert_eq!(cli.api_url.as_deref(), Some("localhost:9000/api"));
        assert!(matches!(cli.command, Command::Payroll { employee: Some(2) }));
    }
}
