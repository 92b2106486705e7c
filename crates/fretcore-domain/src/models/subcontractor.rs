use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subcontractor {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcontractorEmail {
    pub id: i64,
    pub sst_id: i64,
    pub address: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffUnit {
    PerTrip,
    PerPallet,
    PerKm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcontractorTariff {
    pub id: i64,
    pub sst_id: i64,
    pub unit: TariffUnit,
    pub destination: String,
    pub country: Option<String>,
    pub price: f64,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalletRevenue {
    pub id: i64,
    pub destination: String,
    pub country: Option<String>,
    pub unit_revenue: f64,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}
