use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::route::RouteSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    Delivery,
    Pickup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Planned,
    InProgress,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: i64,
    pub date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub route_id: Option<i64>,
    /// Populated from the same join as `route_id`; both are always
    /// consistent with each other.
    pub route: Option<RouteSummary>,
    pub driver_id: Option<i64>,
    pub sst_id: Option<i64>,
    pub kind: MissionKind,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub country: Option<String>,
    pub pallet_count: i64,
    pub weight_kg: Option<f64>,
    pub tractor: Option<String>,
    pub trailer: Option<String>,
    pub status: MissionStatus,
    pub note: Option<String>,
    pub cost_sst: Option<f64>,
    pub revenue: Option<f64>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mission {
    /// Structural invariants that hold regardless of storage backend.
    pub fn validate_shape(&self) -> Result<(), String> {
        validate_mission_shape(self.pallet_count, &self.start_time, &self.end_time)
    }
}

/// `pallet_count >= 0`; if both times are set, `start_time <= end_time`.
/// Shared by [`Mission::validate_shape`] and the write-path handlers, which
/// check the effective (patch-applied) values before they ever reach the
/// store.
pub fn validate_mission_shape(
    pallet_count: i64,
    start_time: &Option<String>,
    end_time: &Option<String>,
) -> Result<(), String> {
    if pallet_count < 0 {
        return Err("pallet_count must be >= 0".into());
    }
    if let (Some(s), Some(e)) = (start_time, end_time) {
        if s.as_str() > e.as_str() {
            return Err("start_time must be <= end_time".into());
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct MissionFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub driver_id: Option<i64>,
    pub route_id: Option<i64>,
    pub status: Option<MissionStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Mission {
        Mission {
            id: 1,
            date: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
            start_time: Some("08:00".into()),
            end_time: Some("10:00".into()),
            route_id: None,
            route: None,
            driver_id: None,
            sst_id: None,
            kind: MissionKind::Delivery,
            origin: None,
            destination: None,
            country: None,
            pallet_count: 12,
            weight_kg: None,
            tractor: None,
            trailer: None,
            status: MissionStatus::Planned,
            note: None,
            cost_sst: None,
            revenue: None,
            created_by: "PLANNER1".into(),
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn negative_pallet_count_is_invalid() {
        let mut m = base();
        m.pallet_count = -1;
        assert!(m.validate_shape().is_err());
    }

    #[test]
    fn end_before_start_is_invalid() {
        let mut m = base();
        m.start_time = Some("10:00".into());
        m.end_time = Some("08:00".into());
        assert!(m.validate_shape().is_err());
    }

    #[test]
    fn valid_mission_passes() {
        assert!(base().validate_shape().is_ok());
    }
}
