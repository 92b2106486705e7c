use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use fretcore_domain::models::driver::{Driver, DriverUnavailability, UnavailabilityReason};
use fretcore_domain::Result;

use super::{map_db_err, Store};

#[derive(Debug, Clone, Default)]
pub struct DriverPatch {
    pub code: Option<String>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub contract_type: Option<Option<String>>,
    pub hire_date: Option<Option<NaiveDate>>,
    pub has_permit: Option<bool>,
    pub has_adr: Option<bool>,
    pub has_fimo: Option<bool>,
    pub preferred_tractor: Option<Option<String>>,
}

const SELECT_COLS: &str = "id, code, last_name, first_name, phone, email, contract_type, \
    hire_date, has_permit_ce, has_adr, has_fimo, preferred_tractor, is_active";

fn row_to_driver(row: &Row<'_>) -> rusqlite::Result<Driver> {
    Ok(Driver {
        id: row.get(0)?,
        code: row.get(1)?,
        last_name: row.get(2)?,
        first_name: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        contract_type: row.get(6)?,
        hire_date: row.get(7)?,
        has_permit: row.get(8)?,
        has_adr: row.get(9)?,
        has_fimo: row.get(10)?,
        preferred_tractor: row.get(11)?,
        is_active: row.get(12)?,
    })
}

fn reason_str(r: UnavailabilityReason) -> &'static str {
    match r {
        UnavailabilityReason::Leave => "leave",
        UnavailabilityReason::Sick => "sick",
        UnavailabilityReason::Training => "training",
        UnavailabilityReason::Other => "other",
    }
}

fn parse_reason(s: &str) -> UnavailabilityReason {
    match s {
        "sick" => UnavailabilityReason::Sick,
        "training" => UnavailabilityReason::Training,
        "other" => UnavailabilityReason::Other,
        _ => UnavailabilityReason::Leave,
    }
}

fn row_to_unavailability(row: &Row<'_>) -> rusqlite::Result<DriverUnavailability> {
    let reason: String = row.get(4)?;
    Ok(DriverUnavailability {
        id: row.get(0)?,
        driver_id: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        reason_code: parse_reason(&reason),
        note: row.get(5)?,
    })
}

/// Disjoint partition of active drivers for a given date, per §4.1.
pub struct Availability {
    pub available: Vec<Driver>,
    pub unavailable: Vec<Driver>,
}

impl Store {
    pub fn list_drivers(&self, active_only: bool) -> Result<Vec<Driver>> {
        let conn = self.lock();
        let mut sql = format!("SELECT {SELECT_COLS} FROM drivers WHERE 1=1");
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(" ORDER BY code ASC");
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let rows = stmt.query_map([], row_to_driver).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn get_driver(&self, id: i64) -> Result<Option<Driver>> {
        let conn = self.lock();
        let sql = format!("SELECT {SELECT_COLS} FROM drivers WHERE id = ?1");
        conn.query_row(&sql, params![id], row_to_driver).optional().map_err(map_db_err)
    }

    pub fn get_driver_by_code(&self, code: &str) -> Result<Option<Driver>> {
        let conn = self.lock();
        let sql = format!("SELECT {SELECT_COLS} FROM drivers WHERE code = ?1");
        conn.query_row(&sql, params![code.to_uppercase()], row_to_driver)
            .optional()
            .map_err(map_db_err)
    }

    pub fn create_driver(&self, patch: &DriverPatch) -> Result<Driver> {
        let code = patch
            .code
            .as_deref()
            .ok_or_else(|| fretcore_domain::Error::Validation("code is required".into()))?
            .to_uppercase();
        let last_name = patch
            .last_name
            .clone()
            .ok_or_else(|| fretcore_domain::Error::Validation("last_name is required".into()))?;
        let first_name = patch
            .first_name
            .clone()
            .ok_or_else(|| fretcore_domain::Error::Validation("first_name is required".into()))?;

        let conn = self.lock();
        conn.execute(
            "INSERT INTO drivers (code, last_name, first_name, phone, email, contract_type, \
             hire_date, has_permit_ce, has_adr, has_fimo, preferred_tractor, is_active) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,1)",
            params![
                code,
                last_name,
                first_name,
                patch.phone.clone().flatten(),
                patch.email.clone().flatten(),
                patch.contract_type.clone().flatten(),
                patch.hire_date.flatten(),
                patch.has_permit.unwrap_or(false),
                patch.has_adr.unwrap_or(false),
                patch.has_fimo.unwrap_or(false),
                patch.preferred_tractor.clone().flatten(),
            ],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_driver(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("driver vanished after insert".into()))
    }

    pub fn update_driver(&self, id: i64, patch: &DriverPatch) -> Result<Driver> {
        let existing = self
            .get_driver(id)?
            .ok_or_else(|| fretcore_domain::Error::NotFound(format!("driver {id}")))?;

        let code = patch.code.clone().map(|c| c.to_uppercase()).unwrap_or(existing.code);
        let last_name = patch.last_name.clone().unwrap_or(existing.last_name);
        let first_name = patch.first_name.clone().unwrap_or(existing.first_name);
        let phone = patch.phone.clone().unwrap_or(existing.phone);
        let email = patch.email.clone().unwrap_or(existing.email);
        let contract_type = patch.contract_type.clone().unwrap_or(existing.contract_type);
        let hire_date = patch.hire_date.unwrap_or(existing.hire_date);
        let has_permit = patch.has_permit.unwrap_or(existing.has_permit);
        let has_adr = patch.has_adr.unwrap_or(existing.has_adr);
        let has_fimo = patch.has_fimo.unwrap_or(existing.has_fimo);
        let preferred_tractor =
            patch.preferred_tractor.clone().unwrap_or(existing.preferred_tractor);

        let conn = self.lock();
        conn.execute(
            "UPDATE drivers SET code=?1, last_name=?2, first_name=?3, phone=?4, email=?5, \
             contract_type=?6, hire_date=?7, has_permit_ce=?8, has_adr=?9, has_fimo=?10, \
             preferred_tractor=?11 WHERE id=?12",
            params![
                code, last_name, first_name, phone, email, contract_type, hire_date, has_permit,
                has_adr, has_fimo, preferred_tractor, id,
            ],
        )
        .map_err(map_db_err)?;
        drop(conn);
        self.get_driver(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("driver vanished after update".into()))
    }

    pub fn delete_driver(&self, id: i64) -> Result<Driver> {
        let existing = self
            .get_driver(id)?
            .ok_or_else(|| fretcore_domain::Error::NotFound(format!("driver {id}")))?;
        let conn = self.lock();
        conn.execute("UPDATE drivers SET is_active = 0 WHERE id = ?1", params![id])
            .map_err(map_db_err)?;
        Ok(Driver { is_active: false, ..existing })
    }

    pub fn unavailabilities_for_driver(
        &self,
        driver_id: i64,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<DriverUnavailability>> {
        let conn = self.lock();
        let mut sql = "SELECT id, driver_id, start_date, end_date, reason_code, note \
             FROM driver_unavailabilities WHERE driver_id = ?1"
            .to_string();
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(driver_id)];
        if let Some(d) = date_from {
            sql.push_str(" AND end_date >= ?");
            args.push(Box::new(d));
        }
        if let Some(d) = date_to {
            sql.push_str(" AND start_date <= ?");
            args.push(Box::new(d));
        }
        sql.push_str(" ORDER BY start_date ASC");
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_unavailability)
            .map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn create_unavailability(
        &self,
        driver_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason_code: UnavailabilityReason,
        note: Option<String>,
    ) -> Result<DriverUnavailability> {
        if start_date > end_date {
            return Err(fretcore_domain::Error::Validation(
                "start_date must be <= end_date".into(),
            ));
        }
        let conn = self.lock();
        conn.execute(
            "INSERT INTO driver_unavailabilities (driver_id, start_date, end_date, reason_code, note) \
             VALUES (?1,?2,?3,?4,?5)",
            params![driver_id, start_date, end_date, reason_str(reason_code), note],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        Ok(DriverUnavailability { id, driver_id, start_date, end_date, reason_code, note })
    }

    pub fn delete_unavailability(&self, id: i64) -> Result<()> {
        let conn = self.lock();
        let affected = conn
            .execute("DELETE FROM driver_unavailabilities WHERE id = ?1", params![id])
            .map_err(map_db_err)?;
        if affected == 0 {
            return Err(fretcore_domain::Error::NotFound(format!("unavailability {id}")));
        }
        Ok(())
    }

    /// Whether `driver_id` has an unavailability window covering `date`.
    pub fn is_driver_unavailable_on(&self, driver_id: i64, date: NaiveDate) -> Result<bool> {
        let conn = self.lock();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM driver_unavailabilities \
             WHERE driver_id = ?1 AND start_date <= ?2 AND end_date >= ?2)",
            params![driver_id, date],
            |row| row.get(0),
        )
        .map_err(map_db_err)
    }

    /// Partitions all active drivers into `{available, unavailable}` for `date`.
    /// Union equals the active set; the two halves never overlap.
    pub fn available_drivers_on(&self, date: NaiveDate) -> Result<Availability> {
        let active = self.list_drivers(true)?;
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT driver_id FROM driver_unavailabilities \
                 WHERE start_date <= ?1 AND end_date >= ?1",
            )
            .map_err(map_db_err)?;
        let unavailable_ids: std::collections::HashSet<i64> = stmt
            .query_map(params![date], |row| row.get::<_, i64>(0))
            .map_err(map_db_err)?
            .collect::<rusqlite::Result<_>>()
            .map_err(map_db_err)?;
        drop(stmt);
        drop(conn);

        let mut available = Vec::new();
        let mut unavailable = Vec::new();
        for d in active {
            if unavailable_ids.contains(&d.id) {
                unavailable.push(d);
            } else {
                available.push(d);
            }
        }
        Ok(Availability { available, unavailable })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(code: &str) -> DriverPatch {
        DriverPatch {
            code: Some(code.into()),
            last_name: Some("Dupont".into()),
            first_name: Some("Jean".into()),
            ..Default::default()
        }
    }

    #[test]
    fn available_partition_is_disjoint_and_complete() {
        let store = Store::open_in_memory().unwrap();
        let d1 = store.create_driver(&patch("D1")).unwrap();
        let d2 = store.create_driver(&patch("D2")).unwrap();
        store
            .create_unavailability(
                d1.id,
                "2025-04-01".parse().unwrap(),
                "2025-04-05".parse().unwrap(),
                UnavailabilityReason::Leave,
                None,
            )
            .unwrap();

        let on_3rd = store.available_drivers_on("2025-04-03".parse().unwrap()).unwrap();
        assert_eq!(on_3rd.unavailable.len(), 1);
        assert_eq!(on_3rd.unavailable[0].id, d1.id);
        assert_eq!(on_3rd.available.len(), 1);
        assert_eq!(on_3rd.available[0].id, d2.id);

        let on_6th = store.available_drivers_on("2025-04-06".parse().unwrap()).unwrap();
        assert_eq!(on_6th.available.len(), 2);
        assert_eq!(on_6th.unavailable.len(), 0);
    }

    #[test]
    fn is_driver_unavailable_on_checks_window_bounds() {
        let store = Store::open_in_memory().unwrap();
        let d1 = store.create_driver(&patch("D1")).unwrap();
        store
            .create_unavailability(
                d1.id,
                "2025-04-01".parse().unwrap(),
                "2025-04-05".parse().unwrap(),
                UnavailabilityReason::Leave,
                None,
            )
            .unwrap();

        assert!(store.is_driver_unavailable_on(d1.id, "2025-04-03".parse().unwrap()).unwrap());
        assert!(store.is_driver_unavailable_on(d1.id, "2025-04-01".parse().unwrap()).unwrap());
        assert!(!store.is_driver_unavailable_on(d1.id, "2025-04-06".parse().unwrap()).unwrap());
    }

    #[test]
    fn unavailability_rejects_inverted_range() {
        let store = Store::open_in_memory().unwrap();
        let d1 = store.create_driver(&patch("D1")).unwrap();
        let err = store
            .create_unavailability(
                d1.id,
                "2025-04-05".parse().unwrap(),
                "2025-04-01".parse().unwrap(),
                UnavailabilityReason::Leave,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, fretcore_domain::Error::Validation(_)));
    }

    #[test]
    fn soft_deleted_driver_excluded_from_availability() {
        let store = Store::open_in_memory().unwrap();
        let d1 = store.create_driver(&patch("D1")).unwrap();
        store.delete_driver(d1.id).unwrap();
        let partition = store.available_drivers_on("2025-04-03".parse().unwrap()).unwrap();
        assert_eq!(partition.available.len(), 0);
        assert_eq!(partition.unavailable.len(), 0);
    }
}
