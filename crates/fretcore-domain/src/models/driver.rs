use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: i64,
    /// Unique, stored upper-cased.
    pub code: String,
    pub last_name: String,
    pub first_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contract_type: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub has_permit: bool,
    pub has_adr: bool,
    pub has_fimo: bool,
    pub preferred_tractor: Option<String>,
    pub is_active: bool,
}

impl Driver {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailabilityReason {
    Leave,
    Sick,
    Training,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverUnavailability {
    pub id: i64,
    pub driver_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason_code: UnavailabilityReason,
    pub note: Option<String>,
}

impl DriverUnavailability {
    pub fn is_valid(&self) -> bool {
        self.start_date <= self.end_date
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_first_and_last() {
        let d = Driver {
            id: 1,
            code: "D1".into(),
            last_name: "Dupont".into(),
            first_name: "Jean".into(),
            phone: None,
            email: None,
            contract_type: None,
            hire_date: None,
            has_permit: true,
            has_adr: false,
            has_fimo: false,
            preferred_tractor: None,
            is_active: true,
        };
        assert_eq!(d.full_name(), "Jean Dupont");
    }

    #[test]
    fn unavailability_covers_inclusive_range() {
        let u = DriverUnavailability {
            id: 1,
            driver_id: 1,
            start_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 4, 5).unwrap(),
            reason_code: UnavailabilityReason::Leave,
            note: None,
        };
        assert!(u.is_valid());
        assert!(u.covers(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()));
        assert!(u.covers(NaiveDate::from_ymd_opt(2025, 4, 5).unwrap()));
        assert!(!u.covers(NaiveDate::from_ymd_opt(2025, 4, 6).unwrap()));
    }
}
