use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Amount, EmployeeId, EmployeeStatus},
    error::EnvelopeError,
};

/// One employee record. `id` is absent until the server has persisted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EmployeeId>,
    /// Human-facing code such as `EMP001`. The API calls this `employee_id`.
    #[serde(rename = "employee_id")]
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub basic_salary: Amount,
    pub hire_date: NaiveDate,
    pub department: String,
    #[serde(default)]
    pub status: EmployeeStatus,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Copy of this record without its server id, suitable for a create request.
    pub fn as_draft(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }

    pub fn with_id(mut self, id: EmployeeId) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deductions {
    pub shif: Amount,
    pub housing_levy: Amount,
    pub paye: Amount,
    pub total: Amount,
}

impl Deductions {
    /// Whether `total` equals the sum of the named components as reported.
    pub fn is_consistent(&self) -> bool {
        self.shif + self.housing_levy + self.paye == self.total
    }
}

/// One employee's server-computed payroll breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollLineItem {
    pub employee_id: EmployeeId,
    pub employee_code: String,
    pub full_name: String,
    pub department: String,
    pub gross_salary: Amount,
    pub deductions: Deductions,
    pub net_salary: Amount,
}

impl PayrollLineItem {
    pub fn is_consistent(&self) -> bool {
        self.deductions.is_consistent()
            && self.gross_salary - self.deductions.total == self.net_salary
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollSummary {
    pub total_employees: u32,
    pub total_gross_salary: Amount,
    pub total_deductions: Amount,
    pub total_net_salary: Amount,
}

impl PayrollSummary {
    pub fn is_balanced(&self) -> bool {
        self.total_gross_salary - self.total_deductions == self.total_net_salary
    }
}

/// Immutable payroll snapshot. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollReport {
    pub line_items: Vec<PayrollLineItem>,
    pub summary: PayrollSummary,
}

impl PayrollReport {
    /// Whether every summary total equals the sum of the matching per-employee
    /// field. The client never recomputes the report; this only flags data
    /// that disagrees with itself.
    pub fn totals_match_line_items(&self) -> bool {
        let gross: Amount = self.line_items.iter().map(|item| item.gross_salary).sum();
        let deductions: Amount = self
            .line_items
            .iter()
            .map(|item| item.deductions.total)
            .sum();
        let net: Amount = self.line_items.iter().map(|item| item.net_salary).sum();

        self.summary.total_employees as usize == self.line_items.len()
            && self.summary.total_gross_salary == gross
            && self.summary.total_deductions == deductions
            && self.summary.total_net_salary == net
    }

    pub fn line_item(&self, employee_id: EmployeeId) -> Option<&PayrollLineItem> {
        self.line_items
            .iter()
            .find(|item| item.employee_id == employee_id)
    }
}

/// Response body that is either `{ "data": T, ... }` or a bare `T`.
///
/// Unwrapped exactly once, at the repository boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ResponseEnvelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(data) => data,
        }
    }
}

fn default_success() -> bool {
    true
}

/// `GET /payroll` body: `{ success, data: [...], summary: {...} }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollEnvelope {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Vec<PayrollLineItem>,
    pub summary: PayrollSummary,
}

impl PayrollEnvelope {
    pub fn into_report(self) -> Result<PayrollReport, EnvelopeError> {
        if !self.success {
            return Err(EnvelopeError::Unsuccessful {
                message: self.message,
            });
        }
        Ok(PayrollReport {
            line_items: self.data,
            summary: self.summary,
        })
    }
}

impl From<PayrollReport> for PayrollEnvelope {
    fn from(report: PayrollReport) -> Self {
        Self {
            success: true,
            message: None,
            data: report.line_items,
            summary: report.summary,
        }
    }
}
