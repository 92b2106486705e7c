use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: i64,
    /// Unique, stored upper-cased.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub origin: String,
    pub destination: String,
    pub country: Option<String>,
    pub default_start_time: Option<String>,
    pub default_end_time: Option<String>,
    /// Bitset of operating days, Monday=0 .. Sunday=6.
    pub operating_days: Vec<u8>,
    pub avg_pallet_count: Option<i64>,
    pub is_active: bool,
    pub color: Option<String>,
}

/// Lightweight embedded summary carried alongside `Mission.route_id` so
/// both legacy flat-id and embedded-object clients are served from the
/// same join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSummary {
    pub id: i64,
    pub code: String,
    pub name: String,
}

impl From<&Route> for RouteSummary {
    fn from(r: &Route) -> Self {
        Self {
            id: r.id,
            code: r.code.clone(),
            name: r.name.clone(),
        }
    }
}
