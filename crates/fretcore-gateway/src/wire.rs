//! Wire-boundary DTOs (§9): the REST adapter accepts both the canonical
//! field spelling and the legacy/French alternates used by older clients,
//! exactly once here, and always emits the canonical form (the domain
//! models in `fretcore_domain::models` have no aliases of their own).
//!
//! Update DTOs mirror the store's `*Patch` shape field-for-field: a field
//! absent from the JSON body means "leave unchanged"; a field present as
//! `null` means "clear it" (for nullable columns). That distinction is
//! what [`double_option`] exists to preserve — plain `Option<T>` collapses
//! both cases to `None`.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use fretcore_domain::models::driver::UnavailabilityReason;
use fretcore_domain::models::mission::{MissionKind, MissionStatus};
use fretcore_domain::models::subcontractor::TariffUnit;
use fretcore_domain::{Error, Result};

/// Deserializes an `Option<Option<T>>` field so that a present-but-null
/// JSON value distinguishes from an absent key. Pair with
/// `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

pub fn parse_mission_kind(raw: &str) -> Result<MissionKind> {
    match raw.to_uppercase().as_str() {
        "DELIVERY" | "LIVRAISON" => Ok(MissionKind::Delivery),
        "PICKUP" | "ENLEVEMENT" | "ENLÈVEMENT" => Ok(MissionKind::Pickup),
        other => Err(Error::Validation(format!("unknown mission kind '{other}'"))),
    }
}

pub fn parse_mission_status(raw: &str) -> Result<MissionStatus> {
    match raw.to_uppercase().as_str() {
        "PLANNED" | "PLANIFIE" | "PLANIFIÉ" => Ok(MissionStatus::Planned),
        "IN_PROGRESS" | "EN_COURS" => Ok(MissionStatus::InProgress),
        "DONE" | "TERMINE" | "TERMINÉ" => Ok(MissionStatus::Done),
        "CANCELLED" | "ANNULE" | "ANNULÉ" => Ok(MissionStatus::Cancelled),
        other => Err(Error::Validation(format!("unknown mission status '{other}'"))),
    }
}

pub fn parse_tariff_unit(raw: &str) -> Result<TariffUnit> {
    match raw.to_lowercase().as_str() {
        "per_trip" => Ok(TariffUnit::PerTrip),
        "per_pallet" => Ok(TariffUnit::PerPallet),
        "per_km" => Ok(TariffUnit::PerKm),
        other => Err(Error::Validation(format!("unknown tariff unit '{other}'"))),
    }
}

pub fn parse_unavailability_reason(raw: &str) -> Result<UnavailabilityReason> {
    match raw.to_lowercase().as_str() {
        "leave" | "conge" | "congé" => Ok(UnavailabilityReason::Leave),
        "sick" | "maladie" => Ok(UnavailabilityReason::Sick),
        "training" | "formation" => Ok(UnavailabilityReason::Training),
        "other" | "autre" => Ok(UnavailabilityReason::Other),
        other => Err(Error::Validation(format!("unknown unavailability reason '{other}'"))),
    }
}

/// Legacy embedded-object alternate for `route_id` (`voyage: {code}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoyageRef {
    pub id: Option<i64>,
    pub code: Option<String>,
}

/// Accepts both the canonical fields and the original app's French
/// field names (§8 scenario 1 uses `voyage_id`, `chauffeur_id`,
/// `nb_palettes`, `type_mission` directly).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MissionInput {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "heure_debut")]
    pub start_time: Option<String>,
    #[serde(default, alias = "heure_fin")]
    pub end_time: Option<String>,
    #[serde(default, alias = "voyage_id")]
    pub route_id: Option<i64>,
    #[serde(default)]
    pub voyage: Option<VoyageRef>,
    #[serde(default, alias = "chauffeur_id")]
    pub driver_id: Option<i64>,
    #[serde(default, alias = "subcontractant_id")]
    pub sst_id: Option<i64>,
    #[serde(default, alias = "type_mission", alias = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, alias = "pays_destination")]
    pub country: Option<String>,
    #[serde(default, alias = "nb_palettes")]
    pub pallet_count: Option<i64>,
    #[serde(default, alias = "poids")]
    pub weight_kg: Option<f64>,
    #[serde(default, alias = "tracteur")]
    pub tractor: Option<String>,
    #[serde(default, alias = "remorque")]
    pub trailer: Option<String>,
    #[serde(default, alias = "statut")]
    pub status: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, alias = "cout_sst")]
    pub cost_sst: Option<f64>,
    #[serde(default, alias = "ca")]
    pub revenue: Option<f64>,
}

impl MissionInput {
    pub fn route_id_hint(&self) -> Option<i64> {
        self.route_id.or_else(|| self.voyage.as_ref().and_then(|v| v.id))
    }

    pub fn route_code_hint(&self) -> Option<&str> {
        self.voyage.as_ref().and_then(|v| v.code.as_deref())
    }

    pub fn kind(&self) -> Result<Option<MissionKind>> {
        self.kind.as_deref().map(parse_mission_kind).transpose()
    }

    pub fn status(&self) -> Result<Option<MissionStatus>> {
        self.status.as_deref().map(parse_mission_status).transpose()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteInput {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, alias = "pays_destination", deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub country: Option<Option<String>>,
    #[serde(default, alias = "heure_debut", deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub default_start_time: Option<Option<String>>,
    #[serde(default, alias = "heure_fin", deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub default_end_time: Option<Option<String>>,
    #[serde(default)]
    pub operating_days: Option<Vec<u8>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub avg_pallet_count: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverInput {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "nom")]
    pub last_name: Option<String>,
    #[serde(default, alias = "prenom")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub has_permit: Option<bool>,
    #[serde(default)]
    pub has_adr: Option<bool>,
    #[serde(default)]
    pub has_fimo: Option<bool>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub preferred_tractor: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnavailabilityInput {
    pub driver_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_reason")]
    pub reason_code: String,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_reason() -> String {
    "other".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubcontractorInput {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TariffInput {
    #[serde(default)]
    pub sst_id: Option<i64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, alias = "pays_destination", deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub country: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailInput {
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PalletRevenueInput {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default, alias = "pays_destination", deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub country: Option<Option<String>>,
    #[serde(default, alias = "revenu_unitaire")]
    pub unit_revenue: Option<f64>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreateInput {
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// When absent, a temporary password is generated and
    /// `must_change_password` is forced true (§9 resolved ambiguity).
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_system_admin: bool,
    pub role_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdateInput {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(default, alias = "actif")]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_system_admin: Option<bool>,
    #[serde(default)]
    pub role_id: Option<i64>,
}
