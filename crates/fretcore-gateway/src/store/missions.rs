use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};

use fretcore_domain::models::mission::{Mission, MissionFilter, MissionKind, MissionStatus};
use fretcore_domain::models::route::RouteSummary;
use fretcore_domain::Result;

use super::{map_db_err, Store};

/// Fields accepted on create/update; `id`/`created_at`/`updated_at`/audit
/// fields are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct MissionPatch {
    pub date: Option<NaiveDate>,
    pub start_time: Option<Option<String>>,
    pub end_time: Option<Option<String>>,
    pub route_id: Option<Option<i64>>,
    pub driver_id: Option<Option<i64>>,
    pub sst_id: Option<Option<i64>>,
    pub kind: Option<MissionKind>,
    pub origin: Option<Option<String>>,
    pub destination: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub pallet_count: Option<i64>,
    pub weight_kg: Option<Option<f64>>,
    pub tractor: Option<Option<String>>,
    pub trailer: Option<Option<String>>,
    pub status: Option<MissionStatus>,
    pub note: Option<Option<String>>,
    pub cost_sst: Option<Option<f64>>,
    pub revenue: Option<Option<f64>>,
}

fn kind_str(k: MissionKind) -> &'static str {
    match k {
        MissionKind::Delivery => "delivery",
        MissionKind::Pickup => "pickup",
    }
}

fn parse_kind(s: &str) -> MissionKind {
    match s {
        "pickup" => MissionKind::Pickup,
        _ => MissionKind::Delivery,
    }
}

fn status_str(s: MissionStatus) -> &'static str {
    match s {
        MissionStatus::Planned => "planned",
        MissionStatus::InProgress => "in_progress",
        MissionStatus::Done => "done",
        MissionStatus::Cancelled => "cancelled",
    }
}

fn parse_status(s: &str) -> MissionStatus {
    match s {
        "in_progress" => MissionStatus::InProgress,
        "done" => MissionStatus::Done,
        "cancelled" => MissionStatus::Cancelled,
        _ => MissionStatus::Planned,
    }
}

const SELECT_COLS: &str = "m.id, m.date, m.start_time, m.end_time, m.route_id, \
     r.code, r.name, m.driver_id, m.sst_id, m.kind, m.origin, m.destination, m.country, \
     m.pallet_count, m.weight_kg, m.tractor, m.trailer, m.status, m.note, m.cost_sst, \
     m.revenue, m.created_by, m.updated_by, m.created_at, m.updated_at";

fn row_to_mission(row: &Row<'_>) -> rusqlite::Result<Mission> {
    let route_id: Option<i64> = row.get(4)?;
    let route_code: Option<String> = row.get(5)?;
    let route_name: Option<String> = row.get(6)?;
    let route = match (route_id, route_code, route_name) {
        (Some(id), Some(code), Some(name)) => Some(RouteSummary { id, code, name }),
        _ => None,
    };
    let kind: String = row.get(9)?;
    let status: String = row.get(17)?;
    Ok(Mission {
        id: row.get(0)?,
        date: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        route_id,
        route,
        driver_id: row.get(7)?,
        sst_id: row.get(8)?,
        kind: parse_kind(&kind),
        origin: row.get(10)?,
        destination: row.get(11)?,
        country: row.get(12)?,
        pallet_count: row.get(13)?,
        weight_kg: row.get(14)?,
        tractor: row.get(15)?,
        trailer: row.get(16)?,
        status: parse_status(&status),
        note: row.get(18)?,
        cost_sst: row.get(19)?,
        revenue: row.get(20)?,
        created_by: row.get(21)?,
        updated_by: row.get(22)?,
        created_at: row.get(23)?,
        updated_at: row.get(24)?,
    })
}

impl Store {
    pub fn list_missions(&self, filter: &MissionFilter) -> Result<Vec<Mission>> {
        let conn = self.lock();
        let mut sql = format!(
            "SELECT {SELECT_COLS} FROM missions m LEFT JOIN routes r ON r.id = m.route_id WHERE 1=1"
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(d) = filter.date_from {
            sql.push_str(" AND m.date >= ?");
            args.push(Box::new(d));
        }
        if let Some(d) = filter.date_to {
            sql.push_str(" AND m.date <= ?");
            args.push(Box::new(d));
        }
        if let Some(driver_id) = filter.driver_id {
            sql.push_str(" AND m.driver_id = ?");
            args.push(Box::new(driver_id));
        }
        if let Some(route_id) = filter.route_id {
            sql.push_str(" AND m.route_id = ?");
            args.push(Box::new(route_id));
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND m.status = ?");
            args.push(Box::new(status_str(status)));
        }
        sql.push_str(" ORDER BY m.date DESC, m.start_time ASC LIMIT ? OFFSET ?");
        let limit = if filter.limit > 0 { filter.limit } else { 200 };
        args.push(Box::new(limit));
        args.push(Box::new(filter.offset));

        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_mission)
            .map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn missions_by_date(&self, date: NaiveDate) -> Result<Vec<Mission>> {
        let conn = self.lock();
        let sql = format!(
            "SELECT {SELECT_COLS} FROM missions m LEFT JOIN routes r ON r.id = m.route_id \
             WHERE m.date = ?1 ORDER BY (m.start_time IS NULL), m.start_time ASC"
        );
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let rows = stmt.query_map(params![date], row_to_mission).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn get_mission(&self, id: i64) -> Result<Option<Mission>> {
        let conn = self.lock();
        let sql = format!(
            "SELECT {SELECT_COLS} FROM missions m LEFT JOIN routes r ON r.id = m.route_id WHERE m.id = ?1"
        );
        conn.query_row(&sql, params![id], row_to_mission)
            .optional()
            .map_err(map_db_err)
    }

    pub fn create_mission(&self, patch: &MissionPatch, by: &str) -> Result<Mission> {
        let now = Utc::now();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO missions (date, start_time, end_time, route_id, driver_id, sst_id, \
             kind, origin, destination, country, pallet_count, weight_kg, tractor, trailer, \
             status, note, cost_sst, revenue, created_by, updated_by, created_at, updated_at) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?19,?20,?20)",
            params![
                patch.date,
                patch.start_time.clone().flatten(),
                patch.end_time.clone().flatten(),
                patch.route_id.flatten(),
                patch.driver_id.flatten(),
                patch.sst_id.flatten(),
                patch.kind.map(kind_str).unwrap_or("delivery"),
                patch.origin.clone().flatten(),
                patch.destination.clone().flatten(),
                patch.country.clone().flatten(),
                patch.pallet_count.unwrap_or(0),
                patch.weight_kg.flatten(),
                patch.tractor.clone().flatten(),
                patch.trailer.clone().flatten(),
                patch.status.map(status_str).unwrap_or("planned"),
                patch.note.clone().flatten(),
                patch.cost_sst.flatten(),
                patch.revenue.flatten(),
                by,
                now,
            ],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_mission(id)?.ok_or_else(|| {
            fretcore_domain::Error::Internal("mission vanished after insert".into())
        })
    }

    pub fn update_mission(&self, id: i64, patch: &MissionPatch, by: &str) -> Result<Mission> {
        let existing = self
            .get_mission(id)?
            .ok_or_else(|| fretcore_domain::Error::NotFound(format!("mission {id}")))?;

        let date = patch.date.unwrap_or(existing.date);
        let start_time = patch.start_time.clone().unwrap_or(existing.start_time.clone());
        let end_time = patch.end_time.clone().unwrap_or(existing.end_time.clone());
        let route_id = patch.route_id.unwrap_or(existing.route_id);
        let driver_id = patch.driver_id.unwrap_or(existing.driver_id);
        let sst_id = patch.sst_id.unwrap_or(existing.sst_id);
        let kind = patch.kind.unwrap_or(existing.kind);
        let origin = patch.origin.clone().unwrap_or(existing.origin.clone());
        let destination = patch.destination.clone().unwrap_or(existing.destination.clone());
        let country = patch.country.clone().unwrap_or(existing.country.clone());
        let pallet_count = patch.pallet_count.unwrap_or(existing.pallet_count);
        let weight_kg = patch.weight_kg.unwrap_or(existing.weight_kg);
        let tractor = patch.tractor.clone().unwrap_or(existing.tractor.clone());
        let trailer = patch.trailer.clone().unwrap_or(existing.trailer.clone());
        let status = patch.status.unwrap_or(existing.status);
        let note = patch.note.clone().unwrap_or(existing.note.clone());
        let cost_sst = patch.cost_sst.unwrap_or(existing.cost_sst);
        let revenue = patch.revenue.unwrap_or(existing.revenue);
        let now: DateTime<Utc> = Utc::now();

        let conn = self.lock();
        conn.execute(
            "UPDATE missions SET date=?1, start_time=?2, end_time=?3, route_id=?4, driver_id=?5, \
             sst_id=?6, kind=?7, origin=?8, destination=?9, country=?10, pallet_count=?11, \
             weight_kg=?12, tractor=?13, trailer=?14, status=?15, note=?16, cost_sst=?17, \
             revenue=?18, updated_by=?19, updated_at=?20 WHERE id=?21",
            params![
                date, start_time, end_time, route_id, driver_id, sst_id, kind_str(kind), origin,
                destination, country, pallet_count, weight_kg, tractor, trailer,
                status_str(status), note, cost_sst, revenue, by, now, id,
            ],
        )
        .map_err(map_db_err)?;
        drop(conn);
        self.get_mission(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("mission vanished after update".into()))
    }

    pub fn delete_mission(&self, id: i64) -> Result<Mission> {
        let existing = self
            .get_mission(id)?
            .ok_or_else(|| fretcore_domain::Error::NotFound(format!("mission {id}")))?;
        let conn = self.lock();
        conn.execute("DELETE FROM missions WHERE id = ?1", params![id])
            .map_err(map_db_err)?;
        Ok(existing)
    }

    pub fn bulk_create_missions(&self, patches: &[MissionPatch], by: &str) -> Result<Vec<Mission>> {
        let mut created = Vec::with_capacity(patches.len());
        for patch in patches {
            created.push(self.create_mission(patch, by)?);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(date: &str, pallet_count: i64) -> MissionPatch {
        MissionPatch {
            date: Some(date.parse().unwrap()),
            pallet_count: Some(pallet_count),
            kind: Some(MissionKind::Delivery),
            ..Default::default()
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let created = store.create_mission(&patch("2025-03-12", 12), "PLANNER1").unwrap();
        let fetched = store.get_mission(created.id).unwrap().unwrap();
        assert_eq!(fetched.pallet_count, 12);
        assert_eq!(fetched.created_by, "PLANNER1");
    }

    #[test]
    fn update_is_idempotent_for_same_patch() {
        let store = Store::open_in_memory().unwrap();
        let created = store.create_mission(&patch("2025-03-12", 12), "PLANNER1").unwrap();
        let p = MissionPatch {
            pallet_count: Some(20),
            ..Default::default()
        };
        let once = store.update_mission(created.id, &p, "PLANNER1").unwrap();
        let twice = store.update_mission(created.id, &p, "PLANNER1").unwrap();
        assert_eq!(once.pallet_count, twice.pallet_count);
        assert_eq!(twice.pallet_count, 20);
    }

    #[test]
    fn list_filters_by_date_range() {
        let store = Store::open_in_memory().unwrap();
        store.create_mission(&patch("2025-03-10", 1), "A").unwrap();
        store.create_mission(&patch("2025-03-12", 1), "A").unwrap();
        let filter = MissionFilter {
            date_from: Some("2025-03-11".parse().unwrap()),
            limit: 50,
            ..Default::default()
        };
        let results = store.list_missions(&filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].date.to_string(), "2025-03-12");
    }

    #[test]
    fn delete_removes_mission() {
        let store = Store::open_in_memory().unwrap();
        let created = store.create_mission(&patch("2025-03-12", 1), "A").unwrap();
        store.delete_mission(created.id).unwrap();
        assert!(store.get_mission(created.id).unwrap().is_none());
    }
}
