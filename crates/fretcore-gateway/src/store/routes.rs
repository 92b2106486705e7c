use rusqlite::{params, OptionalExtension, Row};

use fretcore_domain::models::route::Route;
use fretcore_domain::Result;

use super::{map_db_err, Store};

#[derive(Debug, Clone, Default)]
pub struct RoutePatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub country: Option<Option<String>>,
    pub default_start_time: Option<Option<String>>,
    pub default_end_time: Option<Option<String>>,
    pub operating_days: Option<Vec<u8>>,
    pub avg_pallet_count: Option<Option<i64>>,
    pub color: Option<Option<String>>,
}

const SELECT_COLS: &str = "id, code, name, description, origin, destination, country, \
    default_start_time, default_end_time, operating_days_json, avg_pallet_count, is_active, color";

fn row_to_route(row: &Row<'_>) -> rusqlite::Result<Route> {
    let days_json: String = row.get(9)?;
    let operating_days: Vec<u8> = serde_json::from_str(&days_json).unwrap_or_default();
    Ok(Route {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        origin: row.get(4)?,
        destination: row.get(5)?,
        country: row.get(6)?,
        default_start_time: row.get(7)?,
        default_end_time: row.get(8)?,
        operating_days,
        avg_pallet_count: row.get(10)?,
        is_active: row.get(11)?,
        color: row.get(12)?,
    })
}

impl Store {
    pub fn list_routes(&self, active_only: bool, country: Option<&str>) -> Result<Vec<Route>> {
        let conn = self.lock();
        let mut sql = format!("SELECT {SELECT_COLS} FROM routes WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        if let Some(c) = country {
            sql.push_str(" AND country = ?");
            args.push(Box::new(c.to_string()));
        }
        sql.push_str(" ORDER BY code ASC");
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), row_to_route).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn get_route(&self, id: i64) -> Result<Option<Route>> {
        let conn = self.lock();
        let sql = format!("SELECT {SELECT_COLS} FROM routes WHERE id = ?1");
        conn.query_row(&sql, params![id], row_to_route).optional().map_err(map_db_err)
    }

    pub fn get_route_by_code(&self, code: &str) -> Result<Option<Route>> {
        let conn = self.lock();
        let sql = format!("SELECT {SELECT_COLS} FROM routes WHERE code = ?1");
        conn.query_row(&sql, params![code.to_uppercase()], row_to_route)
            .optional()
            .map_err(map_db_err)
    }

    pub fn create_route(&self, patch: &RoutePatch) -> Result<Route> {
        let code = patch
            .code
            .as_deref()
            .ok_or_else(|| fretcore_domain::Error::Validation("code is required".into()))?
            .to_uppercase();
        let name = patch
            .name
            .clone()
            .ok_or_else(|| fretcore_domain::Error::Validation("name is required".into()))?;
        let origin = patch
            .origin
            .clone()
            .ok_or_else(|| fretcore_domain::Error::Validation("origin is required".into()))?;
        let destination = patch.destination.clone().ok_or_else(|| {
            fretcore_domain::Error::Validation("destination is required".into())
        })?;
        let days_json =
            serde_json::to_string(&patch.operating_days.clone().unwrap_or_default()).unwrap();

        let conn = self.lock();
        conn.execute(
            "INSERT INTO routes (code, name, description, origin, destination, country, \
             default_start_time, default_end_time, operating_days_json, avg_pallet_count, \
             is_active, color) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,1,?11)",
            params![
                code,
                name,
                patch.description.clone().flatten(),
                origin,
                destination,
                patch.country.clone().flatten(),
                patch.default_start_time.clone().flatten(),
                patch.default_end_time.clone().flatten(),
                days_json,
                patch.avg_pallet_count.flatten(),
                patch.color.clone().flatten(),
            ],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_route(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("route vanished after insert".into()))
    }

    pub fn update_route(&self, id: i64, patch: &RoutePatch) -> Result<Route> {
        let existing = self
            .get_route(id)?
            .ok_or_else(|| fretcore_domain::Error::NotFound(format!("route {id}")))?;

        let code = patch.code.clone().map(|c| c.to_uppercase()).unwrap_or(existing.code);
        let name = patch.name.clone().unwrap_or(existing.name);
        let description = patch.description.clone().unwrap_or(existing.description);
        let origin = patch.origin.clone().unwrap_or(existing.origin);
        let destination = patch.destination.clone().unwrap_or(existing.destination);
        let country = patch.country.clone().unwrap_or(existing.country);
        let default_start_time =
            patch.default_start_time.clone().unwrap_or(existing.default_start_time);
        let default_end_time = patch.default_end_time.clone().unwrap_or(existing.default_end_time);
        let operating_days = patch.operating_days.clone().unwrap_or(existing.operating_days);
        let avg_pallet_count = patch.avg_pallet_count.unwrap_or(existing.avg_pallet_count);
        let color = patch.color.clone().unwrap_or(existing.color);
        let days_json = serde_json::to_string(&operating_days).unwrap();

        let conn = self.lock();
        conn.execute(
            "UPDATE routes SET code=?1, name=?2, description=?3, origin=?4, destination=?5, \
             country=?6, default_start_time=?7, default_end_time=?8, operating_days_json=?9, \
             avg_pallet_count=?10, color=?11 WHERE id=?12",
            params![
                code,
                name,
                description,
                origin,
                destination,
                country,
                default_start_time,
                default_end_time,
                days_json,
                avg_pallet_count,
                color,
                id,
            ],
        )
        .map_err(map_db_err)?;
        drop(conn);
        self.get_route(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("route vanished after update".into()))
    }

    /// Soft-delete: sets `is_active=false`. Existing missions keep referencing it.
    pub fn delete_route(&self, id: i64) -> Result<Route> {
        let existing = self
            .get_route(id)?
            .ok_or_else(|| fretcore_domain::Error::NotFound(format!("route {id}")))?;
        let conn = self.lock();
        conn.execute("UPDATE routes SET is_active = 0 WHERE id = ?1", params![id])
            .map_err(map_db_err)?;
        Ok(Route { is_active: false, ..existing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(code: &str) -> RoutePatch {
        RoutePatch {
            code: Some(code.into()),
            name: Some("Paris-Lyon".into()),
            origin: Some("Paris".into()),
            destination: Some("Lyon".into()),
            ..Default::default()
        }
    }

    #[test]
    fn create_uppercases_code() {
        let store = Store::open_in_memory().unwrap();
        let r = store.create_route(&patch("px-ly")).unwrap();
        assert_eq!(r.code, "PX-LY");
    }

    #[test]
    fn duplicate_code_conflicts() {
        let store = Store::open_in_memory().unwrap();
        store.create_route(&patch("R1")).unwrap();
        let err = store.create_route(&patch("r1")).unwrap_err();
        assert!(matches!(err, fretcore_domain::Error::Conflict(_)));
    }

    #[test]
    fn soft_delete_keeps_row() {
        let store = Store::open_in_memory().unwrap();
        let r = store.create_route(&patch("R1")).unwrap();
        let deleted = store.delete_route(r.id).unwrap();
        assert!(!deleted.is_active);
        assert!(store.get_route(r.id).unwrap().is_some());
    }

    #[test]
    fn active_only_filter_excludes_soft_deleted() {
        let store = Store::open_in_memory().unwrap();
        let r = store.create_route(&patch("R1")).unwrap();
        store.delete_route(r.id).unwrap();
        let all = store.list_routes(false, None).unwrap();
        let active = store.list_routes(true, None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(active.len(), 0);
    }
}
