use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(EmployeeId);

/// Monetary amount in the base currency unit (KES), fixed-point.
pub type Amount = rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
}

impl EmployeeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmployeeStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown employee status '{other}'")),
        }
    }
}

/// Departments offered by the console when entering an employee. The field
/// itself is free text; these are suggestions only.
pub const DEPARTMENTS: [&str; 6] = ["IT", "HR", "Finance", "Marketing", "Operations", "Sales"];

/// Statutory deduction categories as named by the payroll API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionKind {
    Shif,
    HousingLevy,
    Paye,
}

impl DeductionKind {
    pub const ALL: [DeductionKind; 3] = [Self::Shif, Self::HousingLevy, Self::Paye];

    pub fn label(self) -> &'static str {
        match self {
            Self::Shif => "SHIF",
            Self::HousingLevy => "Housing Levy",
            Self::Paye => "PAYE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_lowercase() {
        let json = serde_json::to_string(&EmployeeStatus::Inactive).expect("serialize");
        assert_eq!(json, "\"inactive\"");
        let parsed: EmployeeStatus = serde_json::from_str("\"active\"").expect("parse");
        assert_eq!(parsed, EmployeeStatus::Active);
    }

    #[test]
    fn status_parses_user_input() {
        assert_eq!(" Inactive ".parse::<EmployeeStatus>(), Ok(EmployeeStatus::Inactive));
        assert!("retired".parse::<EmployeeStatus>().is_err());
    }

    #[test]
    fn employee_id_is_a_bare_number_on_the_wire() {
        assert_eq!(serde_json::to_string(&EmployeeId(42)).expect("serialize"), "42");
        assert_eq!(EmployeeId(42).to_string(), "42");
    }
}
