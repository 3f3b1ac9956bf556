//! Database module for persisting daily usage and solar production
//!
//! Uses SQLite for local storage of:
//! - Daily usage totals with the per-period import split
//! - Daily production reported by the installer portal
//! - The household activity log

use crate::core::{Activity, DailyUsage, DateRange, Error, PeriodMap, Result, SolarProduction};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Database manager
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database in the user data directory
    pub fn new() -> Result<Self> {
        let db_path = Self::db_path()?;
        Self::open(&db_path)
    }

    /// Open (or create) a database file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        log::debug!("Opened database at {}", path.display());
        Self::with_connection(conn)
    }

    /// Throwaway database, used by the demo and tests
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Get the database file path
    pub fn db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| Error::Database(rusqlite::Error::InvalidPath(PathBuf::new())))?;

        let app_dir = data_dir.join("solarcost-analyzer");
        std::fs::create_dir_all(&app_dir)?;

        Ok(app_dir.join("data.db"))
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- One row per calendar day of metered usage
            CREATE TABLE IF NOT EXISTS daily_usage (
                date TEXT PRIMARY KEY,
                consumption_kwh REAL NOT NULL,
                generation_kwh REAL NOT NULL,
                net_kwh REAL NOT NULL,
                super_off_peak_kwh REAL NOT NULL,
                off_peak_kwh REAL NOT NULL,
                on_peak_kwh REAL NOT NULL,
                cost REAL NOT NULL
            );

            -- Installer-reported production
            CREATE TABLE IF NOT EXISTS solar_production (
                date TEXT PRIMARY KEY,
                production_kwh REAL NOT NULL,
                notes TEXT
            );

            -- Activity log, one row per entry (duplicates allowed)
            CREATE TABLE IF NOT EXISTS activities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                start_time TEXT,
                end_time TEXT,
                activity TEXT NOT NULL,
                location TEXT,
                notes TEXT,
                est_kw REAL,
                duration_hours REAL NOT NULL,
                est_kwh REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_activities_date ON activities(date);
            "#,
        )?;

        Ok(())
    }

    /// Update or insert one day of usage
    pub fn upsert_daily_usage(&self, day: &DailyUsage) -> Result<()> {
        upsert_usage(&self.conn, day)
    }

    /// Daily usage within `range`, oldest first
    pub fn get_daily_usage(&self, range: DateRange) -> Result<Vec<DailyUsage>> {
        let (start, end) = bounds(range);
        let mut stmt = self.conn.prepare(
            "SELECT date, consumption_kwh, generation_kwh, net_kwh,
                    super_off_peak_kwh, off_peak_kwh, on_peak_kwh, cost
             FROM daily_usage
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date ASC",
        )?;

        let days = stmt
            .query_map(params![start, end], |row| {
                Ok(DailyUsage {
                    date: get_date(row, 0)?,
                    consumption_kwh: row.get(1)?,
                    generation_kwh: row.get(2)?,
                    net_kwh: row.get(3)?,
                    import_kwh: PeriodMap {
                        super_off_peak: row.get(4)?,
                        off_peak: row.get(5)?,
                        on_peak: row.get(6)?,
                    },
                    cost: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(days)
    }

    /// Replace all stored usage with `days` in a single transaction
    pub fn replace_daily_usage(&mut self, days: &[DailyUsage]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM daily_usage", [])?;
        for day in days {
            upsert_usage(&tx, day)?;
        }
        tx.commit()?;

        log::info!("Stored {} days of usage", days.len());
        Ok(days.len())
    }

    /// Remove everything stored for `date`; returns the number of rows deleted
    pub fn delete_date(&self, date: NaiveDate) -> Result<usize> {
        let key = date.to_string();
        let usage = self.conn.execute("DELETE FROM daily_usage WHERE date = ?1", params![key])?;
        let production = self
            .conn
            .execute("DELETE FROM solar_production WHERE date = ?1", params![key])?;
        let activities = self.conn.execute("DELETE FROM activities WHERE date = ?1", params![key])?;
        Ok(usage + production + activities)
    }

    /// Update or insert one day of production
    pub fn upsert_production(&self, day: &SolarProduction) -> Result<()> {
        self.conn.execute(
            r#"INSERT INTO solar_production (date, production_kwh, notes)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(date) DO UPDATE SET
                   production_kwh = ?2,
                   notes = ?3"#,
            params![day.date.to_string(), day.production_kwh, day.notes],
        )?;

        Ok(())
    }

    /// Production within `range`, oldest first
    pub fn get_production(&self, range: DateRange) -> Result<Vec<SolarProduction>> {
        let (start, end) = bounds(range);
        let mut stmt = self.conn.prepare(
            "SELECT date, production_kwh, notes
             FROM solar_production
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date ASC",
        )?;

        let days = stmt
            .query_map(params![start, end], |row| {
                Ok(SolarProduction {
                    date: get_date(row, 0)?,
                    production_kwh: row.get(1)?,
                    notes: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(days)
    }

    /// Append one activity log entry
    pub fn add_activity(&self, activity: &Activity) -> Result<()> {
        self.conn.execute(
            "INSERT INTO activities (date, start_time, end_time, activity, location, notes,
                                     est_kw, duration_hours, est_kwh)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                activity.date.to_string(),
                activity.start_time.map(|t| t.format(TIME_FORMAT).to_string()),
                activity.end_time.map(|t| t.format(TIME_FORMAT).to_string()),
                activity.activity,
                activity.location,
                activity.notes,
                activity.est_kw,
                activity.duration_hours,
                activity.est_kwh
            ],
        )?;

        Ok(())
    }

    /// Activities within `range`, in date then insertion order
    pub fn get_activities(&self, range: DateRange) -> Result<Vec<Activity>> {
        let (start, end) = bounds(range);
        let mut stmt = self.conn.prepare(
            "SELECT date, start_time, end_time, activity, location, notes,
                    est_kw, duration_hours, est_kwh
             FROM activities
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date ASC, id ASC",
        )?;

        let activities = stmt
            .query_map(params![start, end], |row| {
                Ok(Activity {
                    date: get_date(row, 0)?,
                    start_time: get_time(row, 1)?,
                    end_time: get_time(row, 2)?,
                    activity: row.get(3)?,
                    location: row.get(4)?,
                    notes: row.get(5)?,
                    est_kw: row.get(6)?,
                    duration_hours: row.get(7)?,
                    est_kwh: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(activities)
    }
}

fn upsert_usage(conn: &Connection, day: &DailyUsage) -> Result<()> {
    conn.execute(
        r#"INSERT INTO daily_usage (date, consumption_kwh, generation_kwh, net_kwh,
                                    super_off_peak_kwh, off_peak_kwh, on_peak_kwh, cost)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT(date) DO UPDATE SET
               consumption_kwh = ?2,
               generation_kwh = ?3,
               net_kwh = ?4,
               super_off_peak_kwh = ?5,
               off_peak_kwh = ?6,
               on_peak_kwh = ?7,
               cost = ?8"#,
        params![
            day.date.to_string(),
            day.consumption_kwh,
            day.generation_kwh,
            day.net_kwh,
            day.import_kwh.super_off_peak,
            day.import_kwh.off_peak,
            day.import_kwh.on_peak,
            day.cost
        ],
    )?;

    Ok(())
}

/// ISO date strings compare in date order, so open bounds become extreme dates
fn bounds(range: DateRange) -> (String, String) {
    let start = range.start.map_or_else(|| "0000-01-01".to_string(), |d| d.to_string());
    let end = range.end.map_or_else(|| "9999-12-31".to_string(), |d| d.to_string());
    (start, end)
}

fn get_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|t| {
        NaiveTime::parse_from_str(&t, TIME_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn day(d: u32, cost: f64) -> DailyUsage {
        DailyUsage {
            date: date(d),
            consumption_kwh: 30.0,
            generation_kwh: 12.0,
            net_kwh: 18.0,
            import_kwh: PeriodMap { super_off_peak: 10.0, off_peak: 5.0, on_peak: 8.0 },
            cost,
        }
    }

    fn activity(d: u32, name: &str) -> Activity {
        Activity {
            date: date(d),
            start_time: NaiveTime::from_hms_opt(22, 0, 0),
            end_time: NaiveTime::from_hms_opt(2, 30, 0),
            activity: name.to_string(),
            location: Some("Garage".to_string()),
            notes: None,
            est_kw: None,
            duration_hours: 4.5,
            est_kwh: 31.5,
        }
    }

    #[test]
    fn test_upsert_and_get_daily_usage() {
        let db = Database::open_in_memory().unwrap();

        db.upsert_daily_usage(&day(13, 5.0)).unwrap();
        db.upsert_daily_usage(&day(14, 6.0)).unwrap();
        db.upsert_daily_usage(&day(13, 7.5)).unwrap();

        let all = db.get_daily_usage(DateRange::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], day(13, 7.5));

        let one = db.get_daily_usage(DateRange::new(Some(date(14)), None)).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].import_kwh.on_peak, 8.0);
    }

    #[test]
    fn test_replace_daily_usage_clears_stale_days() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_daily_usage(&day(12, 1.0)).unwrap();
        db.upsert_daily_usage(&day(13, 1.0)).unwrap();

        let stored = db.replace_daily_usage(&[day(13, 9.0), day(14, 4.0)]).unwrap();
        assert_eq!(stored, 2);

        let costs: Vec<f64> = db
            .get_daily_usage(DateRange::default())
            .unwrap()
            .iter()
            .map(|d| d.cost)
            .collect();
        assert_eq!(costs, vec![9.0, 4.0]);

        db.replace_daily_usage(&[]).unwrap();
        assert!(db.get_daily_usage(DateRange::default()).unwrap().is_empty());
    }

    #[test]
    fn test_production_and_delete_date() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_daily_usage(&day(13, 5.0)).unwrap();
        db.upsert_production(&SolarProduction {
            date: date(13),
            production_kwh: 21.5,
            notes: Some("clear".into()),
        })
        .unwrap();

        let production = db.get_production(DateRange::default()).unwrap();
        assert_eq!(production.len(), 1);
        assert_eq!(production[0].notes.as_deref(), Some("clear"));

        db.add_activity(&activity(13, "Dishwasher")).unwrap();
        db.add_activity(&activity(14, "Vacuum")).unwrap();

        assert_eq!(db.delete_date(date(13)).unwrap(), 3);
        assert!(db.get_daily_usage(DateRange::default()).unwrap().is_empty());
        assert!(db.get_production(DateRange::default()).unwrap().is_empty());
        assert_eq!(db.get_activities(DateRange::default()).unwrap().len(), 1);
        assert_eq!(db.delete_date(date(13)).unwrap(), 0);
    }

    #[test]
    fn test_activities_keep_duplicates() {
        let db = Database::open_in_memory().unwrap();
        let entry = activity(13, "EV Charging");

        db.add_activity(&entry).unwrap();
        db.add_activity(&entry).unwrap();
        db.add_activity(&Activity { start_time: None, end_time: None, ..activity(15, "Iron") }).unwrap();

        let all = db.get_activities(DateRange::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], entry);
        assert_eq!(all[1], entry);
        assert_eq!(all[2].start_time, None);

        let ranged = db.get_activities(DateRange::new(Some(date(14)), Some(date(15)))).unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].activity, "Iron");
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");

        Database::open(&path).unwrap().upsert_daily_usage(&day(20, 3.0)).unwrap();
        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.get_daily_usage(DateRange::default()).unwrap().len(), 1);
    }
}
