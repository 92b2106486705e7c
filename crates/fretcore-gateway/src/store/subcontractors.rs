use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use fretcore_domain::models::subcontractor::{
    Subcontractor, SubcontractorEmail, SubcontractorTariff, TariffUnit,
};
use fretcore_domain::Result;

use super::{map_db_err, Store};

#[derive(Debug, Clone, Default)]
pub struct SubcontractorPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub contact_name: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct TariffPatch {
    pub sst_id: Option<i64>,
    pub unit: Option<TariffUnit>,
    pub destination: Option<String>,
    pub country: Option<Option<String>>,
    pub price: Option<f64>,
    pub valid_from: Option<Option<NaiveDate>>,
    pub valid_to: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
}

const SST_COLS: &str = "id, code, name, contact_name, phone, address, is_active";

fn row_to_sst(row: &Row<'_>) -> rusqlite::Result<Subcontractor> {
    Ok(Subcontractor {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        contact_name: row.get(3)?,
        phone: row.get(4)?,
        address: row.get(5)?,
        is_active: row.get(6)?,
    })
}

fn unit_str(u: TariffUnit) -> &'static str {
    match u {
        TariffUnit::PerTrip => "per_trip",
        TariffUnit::PerPallet => "per_pallet",
        TariffUnit::PerKm => "per_km",
    }
}

fn parse_unit(s: &str) -> TariffUnit {
    match s {
        "per_pallet" => TariffUnit::PerPallet,
        "per_km" => TariffUnit::PerKm,
        _ => TariffUnit::PerTrip,
    }
}

const TARIFF_COLS: &str =
    "id, sst_id, unit, destination, country, price, valid_from, valid_to, is_active";

fn row_to_tariff(row: &Row<'_>) -> rusqlite::Result<SubcontractorTariff> {
    let unit: String = row.get(2)?;
    Ok(SubcontractorTariff {
        id: row.get(0)?,
        sst_id: row.get(1)?,
        unit: parse_unit(&unit),
        destination: row.get(3)?,
        country: row.get(4)?,
        price: row.get(5)?,
        valid_from: row.get(6)?,
        valid_to: row.get(7)?,
        is_active: row.get(8)?,
    })
}

fn row_to_email(row: &Row<'_>) -> rusqlite::Result<SubcontractorEmail> {
    Ok(SubcontractorEmail { id: row.get(0)?, sst_id: row.get(1)?, address: row.get(2)?, label: row.get(3)? })
}

impl Store {
    pub fn list_subcontractors(&self, active_only: bool) -> Result<Vec<Subcontractor>> {
        let conn = self.lock();
        let mut sql = format!("SELECT {SST_COLS} FROM subcontractors WHERE 1=1");
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(" ORDER BY code ASC");
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let rows = stmt.query_map([], row_to_sst).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn get_subcontractor(&self, id: i64) -> Result<Option<Subcontractor>> {
        let conn = self.lock();
        let sql = format!("SELECT {SST_COLS} FROM subcontractors WHERE id = ?1");
        conn.query_row(&sql, params![id], row_to_sst).optional().map_err(map_db_err)
    }

    pub fn get_subcontractor_by_code(&self, code: &str) -> Result<Option<Subcontractor>> {
        let conn = self.lock();
        let sql = format!("SELECT {SST_COLS} FROM subcontractors WHERE code = ?1");
        conn.query_row(&sql, params![code.to_uppercase()], row_to_sst)
            .optional()
            .map_err(map_db_err)
    }

    pub fn create_subcontractor(&self, patch: &SubcontractorPatch) -> Result<Subcontractor> {
        let code = patch
            .code
            .as_deref()
            .ok_or_else(|| fretcore_domain::Error::Validation("code is required".into()))?
            .to_uppercase();
        let name = patch
            .name
            .clone()
            .ok_or_else(|| fretcore_domain::Error::Validation("name is required".into()))?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO subcontractors (code, name, contact_name, phone, address, is_active) \
             VALUES (?1,?2,?3,?4,?5,1)",
            params![
                code,
                name,
                patch.contact_name.clone().flatten(),
                patch.phone.clone().flatten(),
                patch.address.clone().flatten(),
            ],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_subcontractor(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("sst vanished after insert".into()))
    }

    pub fn update_subcontractor(&self, id: i64, patch: &SubcontractorPatch) -> Result<Subcontractor> {
        let existing = self
            .get_subcontractor(id)?
            .ok_or_else(|| fretcore_domain::Error::NotFound(format!("sst {id}")))?;
        let code = patch.code.clone().map(|c| c.to_uppercase()).unwrap_or(existing.code);
        let name = patch.name.clone().unwrap_or(existing.name);
        let contact_name = patch.contact_name.clone().unwrap_or(existing.contact_name);
        let phone = patch.phone.clone().unwrap_or(existing.phone);
        let address = patch.address.clone().unwrap_or(existing.address);
        let conn = self.lock();
        conn.execute(
            "UPDATE subcontractors SET code=?1, name=?2, contact_name=?3, phone=?4, address=?5 \
             WHERE id=?6",
            params![code, name, contact_name, phone, address, id],
        )
        .map_err(map_db_err)?;
        drop(conn);
        self.get_subcontractor(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("sst vanished after update".into()))
    }

    pub fn delete_subcontractor(&self, id: i64) -> Result<Subcontractor> {
        let existing = self
            .get_subcontractor(id)?
            .ok_or_else(|| fretcore_domain::Error::NotFound(format!("sst {id}")))?;
        let conn = self.lock();
        conn.execute("UPDATE subcontractors SET is_active = 0 WHERE id = ?1", params![id])
            .map_err(map_db_err)?;
        Ok(Subcontractor { is_active: false, ..existing })
    }

    pub fn list_tariffs_by_sst(&self, sst_id: i64) -> Result<Vec<SubcontractorTariff>> {
        let conn = self.lock();
        let sql = format!("SELECT {TARIFF_COLS} FROM subcontractor_tariffs WHERE sst_id = ?1 ORDER BY destination ASC");
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let rows = stmt.query_map(params![sst_id], row_to_tariff).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn list_all_tariffs(
        &self,
        sst_code: Option<&str>,
        destination: Option<&str>,
        active_only: bool,
    ) -> Result<Vec<SubcontractorTariff>> {
        let conn = self.lock();
        let mut sql = format!(
            "SELECT t.id, t.sst_id, t.unit, t.destination, t.country, t.price, t.valid_from, \
             t.valid_to, t.is_active FROM subcontractor_tariffs t \
             JOIN subcontractors s ON s.id = t.sst_id WHERE 1=1"
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(code) = sst_code {
            sql.push_str(" AND s.code = ?");
            args.push(Box::new(code.to_uppercase()));
        }
        if let Some(dest) = destination {
            sql.push_str(" AND t.destination = ?");
            args.push(Box::new(dest.to_string()));
        }
        if active_only {
            sql.push_str(" AND t.is_active = 1");
        }
        sql.push_str(" ORDER BY t.destination ASC");
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), row_to_tariff).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn get_tariff(&self, id: i64) -> Result<Option<SubcontractorTariff>> {
        let conn = self.lock();
        let sql = format!("SELECT {TARIFF_COLS} FROM subcontractor_tariffs WHERE id = ?1");
        conn.query_row(&sql, params![id], row_to_tariff).optional().map_err(map_db_err)
    }

    pub fn create_tariff(&self, patch: &TariffPatch) -> Result<SubcontractorTariff> {
        let sst_id = patch
            .sst_id
            .ok_or_else(|| fretcore_domain::Error::Validation("sst_id is required".into()))?;
        let unit = patch
            .unit
            .ok_or_else(|| fretcore_domain::Error::Validation("unit is required".into()))?;
        let destination = patch.destination.clone().ok_or_else(|| {
            fretcore_domain::Error::Validation("destination is required".into())
        })?;
        let price = patch
            .price
            .ok_or_else(|| fretcore_domain::Error::Validation("price is required".into()))?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO subcontractor_tariffs (sst_id, unit, destination, country, price, \
             valid_from, valid_to, is_active) VALUES (?1,?2,?3,?4,?5,?6,?7,1)",
            params![
                sst_id,
                unit_str(unit),
                destination,
                patch.country.clone().flatten(),
                price,
                patch.valid_from.flatten(),
                patch.valid_to.flatten(),
            ],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_tariff(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("tariff vanished after insert".into()))
    }

    pub fn update_tariff(&self, id: i64, patch: &TariffPatch) -> Result<SubcontractorTariff> {
        let existing = self
            .get_tariff(id)?
            .ok_or_else(|| fretcore_domain::Error::NotFound(format!("tariff {id}")))?;
        let unit = patch.unit.unwrap_or(existing.unit);
        let destination = patch.destination.clone().unwrap_or(existing.destination);
        let country = patch.country.clone().unwrap_or(existing.country);
        let price = patch.price.unwrap_or(existing.price);
        let valid_from = patch.valid_from.unwrap_or(existing.valid_from);
        let valid_to = patch.valid_to.unwrap_or(existing.valid_to);
        let is_active = patch.is_active.unwrap_or(existing.is_active);
        let conn = self.lock();
        conn.execute(
            "UPDATE subcontractor_tariffs SET unit=?1, destination=?2, country=?3, price=?4, \
             valid_from=?5, valid_to=?6, is_active=?7 WHERE id=?8",
            params![unit_str(unit), destination, country, price, valid_from, valid_to, is_active, id],
        )
        .map_err(map_db_err)?;
        drop(conn);
        self.get_tariff(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("tariff vanished after update".into()))
    }

    pub fn delete_tariff(&self, id: i64) -> Result<()> {
        let conn = self.lock();
        let affected = conn
            .execute("DELETE FROM subcontractor_tariffs WHERE id = ?1", params![id])
            .map_err(map_db_err)?;
        if affected == 0 {
            return Err(fretcore_domain::Error::NotFound(format!("tariff {id}")));
        }
        Ok(())
    }

    pub fn list_emails(&self, sst_id: i64) -> Result<Vec<SubcontractorEmail>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT id, sst_id, address, label FROM subcontractor_emails WHERE sst_id = ?1")
            .map_err(map_db_err)?;
        let rows = stmt.query_map(params![sst_id], row_to_email).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn create_email(&self, sst_id: i64, address: &str, label: Option<String>) -> Result<SubcontractorEmail> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO subcontractor_emails (sst_id, address, label) VALUES (?1,?2,?3)",
            params![sst_id, address, label],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        Ok(SubcontractorEmail { id, sst_id, address: address.to_string(), label })
    }

    pub fn delete_email(&self, id: i64) -> Result<()> {
        let conn = self.lock();
        let affected = conn
            .execute("DELETE FROM subcontractor_emails WHERE id = ?1", params![id])
            .map_err(map_db_err)?;
        if affected == 0 {
            return Err(fretcore_domain::Error::NotFound(format!("email {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(code: &str) -> SubcontractorPatch {
        SubcontractorPatch { code: Some(code.into()), name: Some("Transco".into()), ..Default::default() }
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let s = store.create_subcontractor(&patch("SST1")).unwrap();
        let fetched = store.get_subcontractor(s.id).unwrap().unwrap();
        assert_eq!(fetched.code, "SST1");
    }

    #[test]
    fn duplicate_code_conflicts() {
        let store = Store::open_in_memory().unwrap();
        store.create_subcontractor(&patch("SST1")).unwrap();
        let err = store.create_subcontractor(&patch("sst1")).unwrap_err();
        assert!(matches!(err, fretcore_domain::Error::Conflict(_)));
    }

    #[test]
    fn tariffs_filter_by_sst_code_and_destination() {
        let store = Store::open_in_memory().unwrap();
        let s = store.create_subcontractor(&patch("SST1")).unwrap();
        store
            .create_tariff(&TariffPatch {
                sst_id: Some(s.id),
                unit: Some(TariffUnit::PerPallet),
                destination: Some("Lyon".into()),
                price: Some(12.5),
                ..Default::default()
            })
            .unwrap();
        let all = store.list_all_tariffs(Some("sst1"), Some("Lyon"), true).unwrap();
        assert_eq!(all.len(), 1);
        let none = store.list_all_tariffs(Some("sst1"), Some("Paris"), true).unwrap();
        assert_eq!(none.len(), 0);
    }
}
