use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use std::collections::BTreeMap;

use fretcore_domain::models::subcontractor::PalletRevenue;
use fretcore_domain::Result;

use super::{map_db_err, Store};

#[derive(Debug, Clone, Default)]
pub struct PalletRevenuePatch {
    pub destination: Option<String>,
    pub country: Option<Option<String>>,
    pub unit_revenue: Option<f64>,
    pub valid_from: Option<Option<NaiveDate>>,
    pub valid_to: Option<Option<NaiveDate>>,
}

const REVENUE_COLS: &str = "id, destination, country, revenue_per_pallet, valid_from, valid_to";

fn row_to_revenue(row: &Row<'_>) -> rusqlite::Result<PalletRevenue> {
    Ok(PalletRevenue {
        id: row.get(0)?,
        destination: row.get(1)?,
        country: row.get(2)?,
        unit_revenue: row.get(3)?,
        valid_from: row.get(4)?,
        valid_to: row.get(5)?,
    })
}

/// Gross margin per country over a date range, per §4.1 `finance_stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CountryFinanceStats {
    pub country: String,
    pub pallet_count: i64,
    pub revenue: f64,
    pub cost_sst: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodBucketStats {
    pub bucket: String,
    pub pallet_count: i64,
    pub revenue: f64,
    pub cost_sst: f64,
    pub margin: f64,
}

impl Store {
    pub fn list_pallet_revenues(&self) -> Result<Vec<PalletRevenue>> {
        let conn = self.lock();
        let sql = format!("SELECT {REVENUE_COLS} FROM pallet_revenues ORDER BY destination ASC");
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let rows = stmt.query_map([], row_to_revenue).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn get_pallet_revenue(&self, id: i64) -> Result<Option<PalletRevenue>> {
        let conn = self.lock();
        let sql = format!("SELECT {REVENUE_COLS} FROM pallet_revenues WHERE id = ?1");
        conn.query_row(&sql, params![id], row_to_revenue).optional().map_err(map_db_err)
    }

    pub fn pallet_revenues_by_destination(&self, destination: &str) -> Result<Vec<PalletRevenue>> {
        let conn = self.lock();
        let sql = format!("SELECT {REVENUE_COLS} FROM pallet_revenues WHERE destination = ?1");
        let mut stmt = conn.prepare(&sql).map_err(map_db_err)?;
        let rows = stmt.query_map(params![destination], row_to_revenue).map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn create_pallet_revenue(&self, patch: &PalletRevenuePatch) -> Result<PalletRevenue> {
        let destination = patch.destination.clone().ok_or_else(|| {
            fretcore_domain::Error::Validation("destination is required".into())
        })?;
        let unit_revenue = patch
            .unit_revenue
            .ok_or_else(|| fretcore_domain::Error::Validation("unit_revenue is required".into()))?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO pallet_revenues (destination, country, revenue_per_pallet, valid_from, valid_to) \
             VALUES (?1,?2,?3,?4,?5)",
            params![
                destination,
                patch.country.clone().flatten(),
                unit_revenue,
                patch.valid_from.flatten(),
                patch.valid_to.flatten(),
            ],
        )
        .map_err(map_db_err)?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_pallet_revenue(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("revenue vanished after insert".into()))
    }

    pub fn update_pallet_revenue(&self, id: i64, patch: &PalletRevenuePatch) -> Result<PalletRevenue> {
        let existing = self
            .get_pallet_revenue(id)?
            .ok_or_else(|| fretcore_domain::Error::NotFound(format!("revenue {id}")))?;
        let destination = patch.destination.clone().unwrap_or(existing.destination);
        let country = patch.country.clone().unwrap_or(existing.country);
        let unit_revenue = patch.unit_revenue.unwrap_or(existing.unit_revenue);
        let valid_from = patch.valid_from.unwrap_or(existing.valid_from);
        let valid_to = patch.valid_to.unwrap_or(existing.valid_to);
        let conn = self.lock();
        conn.execute(
            "UPDATE pallet_revenues SET destination=?1, country=?2, revenue_per_pallet=?3, \
             valid_from=?4, valid_to=?5 WHERE id=?6",
            params![destination, country, unit_revenue, valid_from, valid_to, id],
        )
        .map_err(map_db_err)?;
        drop(conn);
        self.get_pallet_revenue(id)?
            .ok_or_else(|| fretcore_domain::Error::Internal("revenue vanished after update".into()))
    }

    pub fn delete_pallet_revenue(&self, id: i64) -> Result<()> {
        let conn = self.lock();
        let affected = conn
            .execute("DELETE FROM pallet_revenues WHERE id = ?1", params![id])
            .map_err(map_db_err)?;
        if affected == 0 {
            return Err(fretcore_domain::Error::NotFound(format!("revenue {id}")));
        }
        Ok(())
    }

    /// Sum pallets/revenue/sst_cost grouped by country; margin = revenue - sst_cost.
    pub fn finance_stats(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<CountryFinanceStats>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT COALESCE(m.country, 'UNKNOWN'), SUM(m.pallet_count), \
                 COALESCE(SUM(m.revenue), 0), COALESCE(SUM(m.cost_sst), 0) \
                 FROM missions m WHERE m.date >= ?1 AND m.date <= ?2 \
                 GROUP BY COALESCE(m.country, 'UNKNOWN') ORDER BY 1 ASC",
            )
            .map_err(map_db_err)?;
        let rows = stmt
            .query_map(params![date_from, date_to], |row| {
                let pallet_count: i64 = row.get(1)?;
                let revenue: f64 = row.get(2)?;
                let cost_sst: f64 = row.get(3)?;
                Ok(CountryFinanceStats {
                    country: row.get(0)?,
                    pallet_count,
                    revenue,
                    cost_sst,
                    margin: revenue - cost_sst,
                })
            })
            .map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }

    pub fn monthly_stats(&self, year: i32, month: u32) -> Result<Vec<PeriodBucketStats>> {
        let conn = self.lock();
        let prefix = format!("{year:04}-{month:02}-");
        let mut stmt = conn
            .prepare(
                "SELECT m.date, SUM(m.pallet_count), COALESCE(SUM(m.revenue),0), \
                 COALESCE(SUM(m.cost_sst),0) FROM missions m WHERE m.date LIKE ?1 \
                 GROUP BY m.date ORDER BY m.date ASC",
            )
            .map_err(map_db_err)?;
        let like = format!("{prefix}%");
        let mut buckets: BTreeMap<String, PeriodBucketStats> = BTreeMap::new();
        let rows = stmt
            .query_map(params![like], |row| {
                let date: String = row.get(0)?;
                let pallet_count: i64 = row.get(1)?;
                let revenue: f64 = row.get(2)?;
                let cost_sst: f64 = row.get(3)?;
                Ok((date, pallet_count, revenue, cost_sst))
            })
            .map_err(map_db_err)?;
        for r in rows {
            let (date, pallet_count, revenue, cost_sst) = r.map_err(map_db_err)?;
            buckets.insert(
                date.clone(),
                PeriodBucketStats { bucket: date, pallet_count, revenue, cost_sst, margin: revenue - cost_sst },
            );
        }
        Ok(buckets.into_values().collect())
    }

    pub fn yearly_stats(&self, year: i32) -> Result<Vec<PeriodBucketStats>> {
        let conn = self.lock();
        let like = format!("{year:04}-%");
        let mut stmt = conn
            .prepare(
                "SELECT substr(m.date, 1, 7), SUM(m.pallet_count), COALESCE(SUM(m.revenue),0), \
                 COALESCE(SUM(m.cost_sst),0) FROM missions m WHERE m.date LIKE ?1 \
                 GROUP BY substr(m.date, 1, 7) ORDER BY 1 ASC",
            )
            .map_err(map_db_err)?;
        let rows = stmt
            .query_map(params![like], |row| {
                let bucket: String = row.get(0)?;
                let pallet_count: i64 = row.get(1)?;
                let revenue: f64 = row.get(2)?;
                let cost_sst: f64 = row.get(3)?;
                Ok(PeriodBucketStats { bucket, pallet_count, revenue, cost_sst, margin: revenue - cost_sst })
            })
            .map_err(map_db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::missions::MissionPatch;
    use fretcore_domain::models::mission::MissionKind;

    #[test]
    fn finance_stats_groups_by_country_and_computes_margin() {
        let store = Store::open_in_memory().unwrap();
        let p = MissionPatch {
            date: Some("2025-03-12".parse().unwrap()),
            kind: Some(MissionKind::Delivery),
            country: Some(Some("FR".into())),
            pallet_count: Some(10),
            revenue: Some(Some(500.0)),
            cost_sst: Some(Some(200.0)),
            ..Default::default()
        };
        store.create_mission(&p, "A").unwrap();
        let stats = store
            .finance_stats("2025-03-01".parse().unwrap(), "2025-03-31".parse().unwrap())
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].country, "FR");
        assert_eq!(stats[0].margin, 300.0);
    }
}
