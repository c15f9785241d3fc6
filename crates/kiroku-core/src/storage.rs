use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::KirokuError;
use crate::models::UserAnimeEntry;

const SCHEMA_V1: &str = include_str!("../../../migrations/001_kv_store.sql");

/// Key under which the whole list is stored as one JSON array.
pub const LIST_KEY: &str = "userAnimeList";

/// Where the list store reads and writes its state.
///
/// Writes always replace the whole list.
pub trait ListBackend: Send + Sync {
    fn load(&self) -> Result<Vec<UserAnimeEntry>, KirokuError>;
    fn save(&self, list: &[UserAnimeEntry]) -> Result<(), KirokuError>;
}

impl<T: ListBackend + ?Sized> ListBackend for Box<T> {
    fn load(&self) -> Result<Vec<UserAnimeEntry>, KirokuError> {
        (**self).load()
    }

    fn save(&self, list: &[UserAnimeEntry]) -> Result<(), KirokuError> {
        (**self).save(list)
    }
}

/// Decode a persisted value. Absent or blank values are an empty list.
pub fn decode_list(raw: Option<&str>) -> Result<Vec<UserAnimeEntry>, KirokuError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(json) => serde_json::from_str(json).map_err(|e| KirokuError::Corrupt(e.to_string())),
    }
}

pub fn encode_list(list: &[UserAnimeEntry]) -> Result<String, KirokuError> {
    Ok(serde_json::to_string(list)?)
}

// ── SQLite ──────────────────────────────────────────────────────

/// SQLite-backed key-value storage for the list.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, KirokuError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, KirokuError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, KirokuError> {
        self.conn
            .lock()
            .map_err(|_| KirokuError::Unavailable("database lock poisoned".into()))
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<String>, KirokuError> {
        self.conn()?
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn set_raw(&self, key: &str, value: &str) -> Result<(), KirokuError> {
        self.conn()?.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }
}

impl ListBackend for SqliteBackend {
    fn load(&self) -> Result<Vec<UserAnimeEntry>, KirokuError> {
        let raw = self.get_raw(LIST_KEY)?;
        decode_list(raw.as_deref())
    }

    fn save(&self, list: &[UserAnimeEntry]) -> Result<(), KirokuError> {
        let json = encode_list(list)?;
        self.set_raw(LIST_KEY, &json)
    }
}

fn run_migrations(conn: &Connection) -> Result<(), KirokuError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}

// ── In-memory ───────────────────────────────────────────────────

/// Keeps the serialized list in memory. Reads and writes can be made to
/// fail on demand.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    raw: Mutex<Option<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-serialized value, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
            ..Self::default()
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().ok().and_then(|raw| raw.clone())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl ListBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<UserAnimeEntry>, KirokuError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(KirokuError::Unavailable("simulated read failure".into()));
        }
        let raw = self
            .raw
            .lock()
            .map_err(|_| KirokuError::Unavailable("memory lock poisoned".into()))?;
        decode_list(raw.as_deref())
    }

    fn save(&self, list: &[UserAnimeEntry]) -> Result<(), KirokuError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KirokuError::Unavailable("simulated write failure".into()));
        }
        let json = encode_list(list)?;
        let mut raw = self
            .raw
            .lock()
            .map_err(|_| KirokuError::Unavailable("memory lock poisoned".into()))?;
        *raw = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::library::now;
    use crate::models::{AiringStatus, MediaType, Season, Title, WatchStatus};

    fn test_list() -> Vec<UserAnimeEntry> {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut frieren = Title::new(52991, "Sousou no Frieren");
        frieren.total_episodes = Some(28);
        frieren.genres = vec!["Adventure".into(), "Drama".into()];
        let mut entry = UserAnimeEntry::new(frieren, WatchStatus::Watching, at);
        entry.episodes_watched = 14;
        entry.user_rating = Some(9);
        entry.notes = Some("Weekly with friends".into());

        let one_piece = Title::new(21, "One Piece");
        vec![entry, UserAnimeEntry::new(one_piece, WatchStatus::PlanToWatch, at)]
    }

    /// One entry with every optional field set, timestamps carrying milliseconds.
    fn full_list() -> Vec<UserAnimeEntry> {
        let added = Utc.timestamp_millis_opt(1_704_067_200_123).unwrap();
        let title = Title {
            id: 52991,
            title: "Sousou no Frieren".into(),
            english_title: Some("Frieren: Beyond Journey's End".into()),
            japanese_title: Some("葬送のフリーレン".into()),
            cover_image: Some("https://cdn.myanimelist.net/images/anime/1015/138006.jpg".into()),
            large_cover_image: Some(
                "https://cdn.myanimelist.net/images/anime/1015/138006l.jpg".into(),
            ),
            synopsis: Some("During their decade-long quest to defeat the Demon King...".into()),
            media_type: Some(MediaType::Tv),
            total_episodes: Some(28),
            airing_status: Some(AiringStatus::Finished),
            average_score: Some(9.31),
            popularity: Some(142),
            genres: vec!["Adventure".into(), "Drama".into(), "Fantasy".into()],
            studios: vec!["Madhouse".into()],
            year: Some(2023),
            season: Some(Season::Fall),
            duration: Some("24 min per ep".into()),
            rating: Some("PG-13 - Teens 13 or older".into()),
        };
        let mut entry = UserAnimeEntry::new(title, WatchStatus::Completed, added);
        entry.episodes_watched = 28;
        entry.user_rating = Some(10);
        entry.notes = Some("Rewatch before season 2".into());
        entry.start_date = Some("2023-09-29".into());
        entry.finish_date = Some("2024-03-22".into());
        entry.last_updated = now();
        entry.is_favorite = Some(true);
        entry.rewatch_count = Some(2);

        let mut airing = Title::new(21, "One Piece");
        airing.media_type = Some(MediaType::Ona);
        airing.airing_status = Some(AiringStatus::Airing);
        airing.season = Some(Season::Winter);
        airing.average_score = Some(0.0);
        let mut other = UserAnimeEntry::new(airing, WatchStatus::OnHold, now());
        other.is_favorite = Some(false);
        other.rewatch_count = Some(0);

        vec![entry, other]
    }

    #[test]
    fn test_fully_populated_list_roundtrips() {
        let list = full_list();

        let db = SqliteBackend::open_memory().unwrap();
        db.save(&list).unwrap();
        assert_eq!(db.load().unwrap(), list);

        let memory = MemoryBackend::new();
        memory.save(&list).unwrap();
        assert_eq!(memory.load().unwrap(), list);

        let raw = memory.raw().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["anime"]["type"], "TV");
        assert_eq!(value[0]["anime"]["airingStatus"], "Finished Airing");
        assert_eq!(value[0]["anime"]["season"], "fall");
        assert_eq!(value[0]["dateAdded"], "2024-01-01T00:00:00.123Z");
    }

    #[test]
    fn test_decode_blank_and_missing() {
        assert!(decode_list(None).unwrap().is_empty());
        assert!(decode_list(Some("")).unwrap().is_empty());
        assert!(decode_list(Some("  \n")).unwrap().is_empty());
        assert!(matches!(
            decode_list(Some("{not json")),
            Err(KirokuError::Corrupt(_))
        ));
    }

    #[test]
    fn test_sqlite_roundtrip() {
        let db = SqliteBackend::open_memory().unwrap();
        assert!(db.load().unwrap().is_empty());

        let list = test_list();
        db.save(&list).unwrap();
        assert_eq!(db.load().unwrap(), list);

        // Whole-list replace on write.
        db.save(&list[1..]).unwrap();
        assert_eq!(db.load().unwrap(), list[1..].to_vec());
    }

    #[test]
    fn test_sqlite_stores_json_under_list_key() {
        let db = SqliteBackend::open_memory().unwrap();
        db.save(&test_list()).unwrap();
        let raw = db.get_raw(LIST_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["animeId"], 52991);
        assert_eq!(value[1]["status"], "plan-to-watch");
    }

    #[test]
    fn test_sqlite_corrupt_value() {
        let db = SqliteBackend::open_memory().unwrap();
        db.set_raw(LIST_KEY, "[{\"animeId\": ").unwrap();
        assert!(matches!(db.load(), Err(KirokuError::Corrupt(_))));
    }

    #[test]
    fn test_sqlite_file_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiroku.db");
        let list = test_list();
        {
            let db = SqliteBackend::open(&path).unwrap();
            db.save(&list).unwrap();
        }
        let db = SqliteBackend::open(&path).unwrap();
        assert_eq!(db.load().unwrap(), list);
    }

    #[test]
    fn test_memory_backend_failures() {
        let backend = MemoryBackend::new();
        backend.save(&test_list()).unwrap();
        assert_eq!(backend.load().unwrap().len(), 2);

        backend.set_fail_writes(true);
        assert!(backend.save(&[]).is_err());
        assert_eq!(backend.load().unwrap().len(), 2);

        backend.set_fail_reads(true);
        assert!(matches!(backend.load(), Err(KirokuError::Unavailable(_))));
    }
}
