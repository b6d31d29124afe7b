//! SQLite-backed local cache of meetings and availability.
//!
//! The cache is filled by importing snapshots exported from the meeting store
//! and then serves reads like any other [`SchedulingStore`]. Async reads run
//! on tokio's blocking pool so a slow disk never stalls the runtime.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection};

use super::SchedulingStore;
use crate::availability::{hhmm, AvailabilityPreference};
use crate::engine::SchedulingSnapshot;
use crate::error::DataSourceError;
use crate::meeting::Meeting;
use crate::range::DateRange;
use crate::storage::data_dir;

/// SQLite cache of scheduling data.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open the cache at `~/.config/meetplan/meetplan.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open_default() -> Result<Self, DataSourceError> {
        let dir = data_dir().map_err(|e| DataSourceError::Unreachable {
            store: "sqlite".to_string(),
            message: e.to_string(),
        })?;
        Self::open(&dir.join("meetplan.db"))
    }

    /// Open (or create) the cache at `path`.
    pub fn open(path: &Path) -> Result<Self, DataSourceError> {
        let conn = Connection::open(path).map_err(|e| DataSourceError::Unreachable {
            store: "sqlite".to_string(),
            message: format!("{}: {e}", path.display()),
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory cache.
    pub fn open_memory() -> Result<Self, DataSourceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DataSourceError> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DataSourceError> {
        lock(&self.conn)
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, DataSourceError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DataSourceError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = lock(&conn)?;
            f(&guard)
        })
        .await
        .map_err(|e| DataSourceError::Query(format!("sqlite task failed: {e}")))?
    }

    fn migrate(&self) -> Result<(), DataSourceError> {
        self.conn()?.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS meetings (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL DEFAULT '',
                start_time  TEXT NOT NULL,
                end_time    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meeting_participants (
                meeting_id      TEXT NOT NULL REFERENCES meetings(id) ON DELETE CASCADE,
                participant_id  TEXT NOT NULL,
                PRIMARY KEY (meeting_id, participant_id)
            );

            CREATE TABLE IF NOT EXISTS availability (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                participant_id  TEXT NOT NULL,
                day_of_week     INTEGER NOT NULL,
                start_time      TEXT NOT NULL,
                end_time        TEXT NOT NULL,
                preferred       INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_meetings_range ON meetings(start_time, end_time);
            CREATE INDEX IF NOT EXISTS idx_participants_participant ON meeting_participants(participant_id);
            CREATE INDEX IF NOT EXISTS idx_availability_participant ON availability(participant_id);",
        )?;
        Ok(())
    }

    /// Insert or replace a meeting and its participant list.
    pub fn insert_meeting(&self, meeting: &Meeting) -> Result<(), DataSourceError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_meeting(&tx, meeting)?;
        tx.commit()?;
        Ok(())
    }

    /// Append an availability entry. Duplicates are kept.
    pub fn insert_availability(&self, pref: &AvailabilityPreference) -> Result<i64, DataSourceError> {
        write_availability(&*self.conn()?, pref)
    }

    /// Validate and import a whole snapshot in one transaction.
    ///
    /// With `replace` the existing cache is emptied first. On any failure the
    /// cache is left exactly as it was. Returns (meetings, availability) counts.
    pub fn import_snapshot(
        &self,
        snapshot: &SchedulingSnapshot,
        replace: bool,
    ) -> Result<(usize, usize), DataSourceError> {
        snapshot.validate()?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if replace {
            clear_tables(&tx)?;
        }
        for meeting in &snapshot.meetings {
            write_meeting(&tx, meeting)?;
        }
        for pref in &snapshot.availability {
            write_availability(&tx, pref)?;
        }
        tx.commit()?;
        tracing::debug!(
            meetings = snapshot.meetings.len(),
            availability = snapshot.availability.len(),
            replace,
            "imported snapshot into sqlite cache"
        );
        Ok((snapshot.meetings.len(), snapshot.availability.len()))
    }

    /// Remove all cached data.
    pub fn clear(&self) -> Result<(), DataSourceError> {
        clear_tables(&*self.conn()?)
    }
}

#[async_trait]
impl SchedulingStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn list_availability(
        &self,
        participant_ids: &[String],
    ) -> Result<Vec<AvailabilityPreference>, DataSourceError> {
        let ids = participant_ids.to_vec();
        self.blocking(move |conn| query_availability(conn, &ids)).await
    }

    async fn list_meetings(
        &self,
        participant_ids: &[String],
        range: DateRange,
    ) -> Result<Vec<Meeting>, DataSourceError> {
        let ids = participant_ids.to_vec();
        self.blocking(move |conn| query_meetings(conn, &ids, range)).await
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, DataSourceError> {
    conn.lock()
        .map_err(|_| DataSourceError::Query("sqlite connection lock poisoned".to_string()))
}

fn write_meeting(conn: &Connection, meeting: &Meeting) -> Result<(), DataSourceError> {
    conn.execute(
        "INSERT OR REPLACE INTO meetings (id, title, start_time, end_time)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            meeting.id,
            meeting.title,
            instant_to_sql(meeting.start_time),
            instant_to_sql(meeting.end_time),
        ],
    )?;
    conn.execute(
        "DELETE FROM meeting_participants WHERE meeting_id = ?1",
        params![meeting.id],
    )?;
    for participant in &meeting.participants {
        conn.execute(
            "INSERT OR IGNORE INTO meeting_participants (meeting_id, participant_id)
             VALUES (?1, ?2)",
            params![meeting.id, participant],
        )?;
    }
    Ok(())
}

fn write_availability(conn: &Connection, pref: &AvailabilityPreference) -> Result<i64, DataSourceError> {
    conn.execute(
        "INSERT INTO availability (participant_id, day_of_week, start_time, end_time, preferred)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            pref.participant_id,
            pref.day_of_week,
            pref.start_time.format("%H:%M").to_string(),
            pref.end_time.format("%H:%M").to_string(),
            pref.preferred,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn clear_tables(conn: &Connection) -> Result<(), DataSourceError> {
    conn.execute_batch(
        "DELETE FROM meeting_participants;
         DELETE FROM meetings;
         DELETE FROM availability;",
    )?;
    Ok(())
}

fn query_availability(
    conn: &Connection,
    participant_ids: &[String],
) -> Result<Vec<AvailabilityPreference>, DataSourceError> {
    if participant_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT participant_id, day_of_week, start_time, end_time, preferred
         FROM availability
         WHERE participant_id IN ({})
         ORDER BY id",
        placeholders(participant_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(participant_ids.iter()), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, bool>(4)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (participant_id, day, start, end, preferred) = row?;
        let day_of_week = u8::try_from(day)
            .map_err(|_| DataSourceError::Malformed(format!("day_of_week {day} out of range")))?;
        out.push(AvailabilityPreference {
            participant_id,
            day_of_week,
            start_time: hhmm::parse(&start).map_err(DataSourceError::Malformed)?,
            end_time: hhmm::parse(&end).map_err(DataSourceError::Malformed)?,
            preferred,
        });
    }
    Ok(out)
}

fn query_meetings(
    conn: &Connection,
    participant_ids: &[String],
    range: DateRange,
) -> Result<Vec<Meeting>, DataSourceError> {
    if participant_ids.is_empty() {
        return Ok(Vec::new());
    }
    let n = participant_ids.len();
    let sql = format!(
        "SELECT DISTINCT m.id, m.title, m.start_time, m.end_time
         FROM meetings m
         JOIN meeting_participants p ON p.meeting_id = m.id
         WHERE p.participant_id IN ({})
           AND m.start_time < ?{}
           AND m.end_time > ?{}
         ORDER BY m.start_time, m.id",
        placeholders(n),
        n + 1,
        n + 2
    );

    let mut values: Vec<String> = participant_ids.to_vec();
    values.push(instant_to_sql(range.end));
    values.push(instant_to_sql(range.start));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;
    let headers = rows.collect::<Result<Vec<_>, _>>()?;

    let mut participants_stmt = conn.prepare(
        "SELECT participant_id FROM meeting_participants WHERE meeting_id = ?1 ORDER BY rowid",
    )?;

    let mut out = Vec::with_capacity(headers.len());
    for (id, title, start, end) in headers {
        let participants = participants_stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        out.push(Meeting {
            start_time: instant_from_sql(&start)?,
            end_time: instant_from_sql(&end)?,
            id,
            title,
            participants,
        });
    }
    Ok(out)
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

/// Fixed-width UTC text so lexicographic order matches time order.
fn instant_to_sql(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn instant_from_sql(raw: &str) -> Result<DateTime<Utc>, DataSourceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DataSourceError::Malformed(format!("invalid timestamp '{raw}': {e}")))
}
