use std::fmt::Write as _;

use client_core::{EmployeeState, PayrollState, StoreStatus};
use rust_decimal::{Decimal, RoundingStrategy};
use shared::{
    domain::DeductionKind,
    protocol::{Employee, PayrollLineItem, PayrollReport},
};

/// `KES 50,000`: whole shillings with thousands separators.
pub fn format_kes(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("KES -{grouped}")
    } else {
        format!("KES {grouped}")
    }
}

pub fn error_banner(message: Option<&str>) -> Option<String> {
    message.map(|message| format!("error: {message}"))
}

fn render_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref()))
        .collect();
    let mut row = padded.join("  ").trim_end().to_string();
    row.push('\n');
    row
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let mut out = render_row(headers, &widths);
    out.push_str(&render_row(&rule, &widths));
    for row in rows {
        out.push_str(&render_row(row, &widths));
    }
    out
}

pub fn employee_table(employees: &[Employee]) -> String {
    if employees.is_empty() {
        return "No employees found.\n".to_string();
    }
    let rows: Vec<Vec<String>> = employees
        .iter()
        .map(|employee| {
            vec![
                employee.id.map(|id| id.to_string()).unwrap_or_default(),
                employee.employee_code.clone(),
                employee.full_name(),
                employee.department.clone(),
                format_kes(employee.basic_salary),
                employee.status.to_string(),
            ]
        })
        .collect();
    render_table(&["ID", "CODE", "NAME", "DEPARTMENT", "SALARY", "STATUS"], &rows)
}

pub fn employee_detail(employee: &Employee) -> String {
    let mut out = String::new();
    let id = employee.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
    let _ = writeln!(out, "{} ({})", employee.full_name(), employee.employee_code);
    let _ = writeln!(out, "  id:          {id}");
    let _ = writeln!(out, "  email:       {}", employee.email);
    if !employee.phone.is_empty() {
        let _ = writeln!(out, "  phone:       {}", employee.phone);
    }
    let _ = writeln!(out, "  department:  {}", employee.department);
    let _ = writeln!(out, "  salary:      {}", format_kes(employee.basic_salary));
    let _ = writeln!(out, "  hired:       {}", employee.hire_date.format("%Y-%m-%d"));
    let _ = writeln!(out, "  status:      {}", employee.status);
    out
}

fn deduction(item: &PayrollLineItem, kind: DeductionKind) -> Decimal {
    match kind {
        DeductionKind::Shif => item.deductions.shif,
        DeductionKind::HousingLevy => item.deductions.housing_levy,
        DeductionKind::Paye => item.deductions.paye,
    }
}

pub fn payroll_report(report: &PayrollReport) -> String {
    let mut headers = vec!["CODE", "NAME", "DEPARTMENT", "GROSS"];
    headers.extend(DeductionKind::ALL.iter().map(|kind| kind.label()));
    headers.extend(["DEDUCTIONS", "NET"]);

    let rows: Vec<Vec<String>> = report
        .line_items
        .iter()
        .map(|item| {
            let mut row = vec![
                item.employee_code.clone(),
                item.full_name.clone(),
                item.department.clone(),
                format_kes(item.gross_salary),
            ];
            row.extend(DeductionKind::ALL.iter().map(|kind| format_kes(deduction(item, *kind))));
            row.push(format_kes(item.deductions.total));
            row.push(format_kes(item.net_salary));
            row
        })
        .collect();

    let mut out = if rows.is_empty() {
        "No payroll line items.\n".to_string()
    } else {
        render_table(&headers, &rows)
    };

    let summary = &report.summary;
    let _ = writeln!(out);
    let _ = writeln!(out, "Employees:        {}", summary.total_employees);
    let _ = writeln!(out, "Total gross:      {}", format_kes(summary.total_gross_salary));
    let _ = writeln!(out, "Total deductions: {}", format_kes(summary.total_deductions));
    let _ = writeln!(out, "Total net:        {}", format_kes(summary.total_net_salary));
    out
}

pub fn employee_screen(state: &EmployeeState) -> String {
    let mut out = String::new();
    if let Some(banner) = error_banner(state.error_message.as_deref()) {
        let _ = writeln!(out, "{banner}");
    }
    out.push_str(&employee_table(&state.employees));
    out
}

pub fn payroll_screen(state: &PayrollState) -> String {
    let mut out = String::new();
    if let Some(banner) = error_banner(state.error_message.as_deref()) {
        let _ = writeln!(out, "{banner}");
    }
    match state.report.as_deref() {
        Some(report) => {
            if state.stale {
                let _ = writeln!(out, "(employee records changed since this report was generated)");
            }
            out.push_str(&payroll_report(report));
        }
        None if state.status == StoreStatus::Loading => out.push_str("Loading payroll...\n"),
        None => out.push_str("No payroll report available.\n"),
    }
    out
}
