use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::anime::Title;

/// User's watch status for a list entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchStatus {
    Watching,
    Completed,
    #[default]
    PlanToWatch,
    Dropped,
    OnHold,
}

impl WatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Watching => "Watching",
            Self::Completed => "Completed",
            Self::PlanToWatch => "Plan to Watch",
            Self::Dropped => "Dropped",
            Self::OnHold => "On Hold",
        }
    }

    /// Persisted string representation (lowercase, hyphenated).
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Watching => "watching",
            Self::Completed => "completed",
            Self::PlanToWatch => "plan-to-watch",
            Self::Dropped => "dropped",
            Self::OnHold => "on-hold",
        }
    }

    pub const ALL: &[WatchStatus] = &[
        Self::Watching,
        Self::Completed,
        Self::PlanToWatch,
        Self::Dropped,
        Self::OnHold,
    ];
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown watch status: {0}")]
pub struct ParseWatchStatusError(pub String);

impl FromStr for WatchStatus {
    type Err = ParseWatchStatusError;

    /// Accepts the wire form plus `_` and space separated spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();
        match key.as_str() {
            "watching" => Ok(Self::Watching),
            "completed" => Ok(Self::Completed),
            "plan-to-watch" | "planned" => Ok(Self::PlanToWatch),
            "dropped" => Ok(Self::Dropped),
            "on-hold" | "paused" => Ok(Self::OnHold),
            _ => Err(ParseWatchStatusError(s.to_string())),
        }
    }
}

/// Lowest and highest accepted user rating.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// Current time at the millisecond precision the persisted format keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// One user's tracking record for one title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnimeEntry {
    pub anime_id: u64,
    pub anime: Title,
    pub status: WatchStatus,
    pub episodes_watched: u32,
    #[serde(default)]
    pub user_rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub finish_date: Option<String>,
    #[serde(with = "timestamp")]
    pub date_added: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub is_favorite: Option<bool>,
    #[serde(default)]
    pub rewatch_count: Option<u32>,
}

impl UserAnimeEntry {
    /// A fresh entry: no episodes watched, both timestamps set to `at`.
    pub fn new(anime: Title, status: WatchStatus, at: DateTime<Utc>) -> Self {
        Self {
            anime_id: anime.id,
            anime,
            status,
            episodes_watched: 0,
            user_rating: None,
            notes: None,
            start_date: None,
            finish_date: None,
            date_added: at,
            last_updated: at,
            is_favorite: None,
            rewatch_count: None,
        }
    }

    /// Merge a patch, enforcing the episode and rating bounds, and refresh
    /// `last_updated` without letting it move backwards.
    pub fn apply(&mut self, patch: EntryPatch, at: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(episodes) = patch.episodes_watched {
            self.episodes_watched = self.anime.clamp_episodes(i64::from(episodes));
        }
        if let Some(rating) = patch.user_rating {
            self.user_rating =
                rating.map(|r| r.clamp(*RATING_RANGE.start(), *RATING_RANGE.end()));
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(date) = patch.start_date {
            self.start_date = date;
        }
        if let Some(date) = patch.finish_date {
            self.finish_date = date;
        }
        if let Some(favorite) = patch.is_favorite {
            self.is_favorite = favorite;
        }
        if let Some(count) = patch.rewatch_count {
            self.rewatch_count = count;
        }
        self.touch(at);
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = self.last_updated.max(at);
    }

    /// Re-apply the data-model bounds to an entry that came from outside the
    /// store (e.g. an imported backup).
    pub fn sanitize(&mut self) {
        self.anime_id = self.anime.id;
        self.episodes_watched = self.anime.clamp_episodes(i64::from(self.episodes_watched));
        self.user_rating = self
            .user_rating
            .map(|r| r.clamp(*RATING_RANGE.start(), *RATING_RANGE.end()));
        if self.last_updated < self.date_added {
            self.last_updated = self.date_added;
        }
    }

    /// Whether every known episode has been watched.
    pub fn is_caught_up(&self) -> bool {
        self.anime
            .total_episodes
            .is_some_and(|total| total > 0 && self.episodes_watched >= total)
    }
}

/// The patchable subset of a list entry.
///
/// `None` leaves a field alone. For nullable fields, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub status: Option<WatchStatus>,
    pub episodes_watched: Option<u32>,
    pub user_rating: Option<Option<u8>>,
    pub notes: Option<Option<String>>,
    pub start_date: Option<Option<String>>,
    pub finish_date: Option<Option<String>>,
    pub is_favorite: Option<Option<bool>>,
    pub rewatch_count: Option<Option<u32>>,
}

impl EntryPatch {
    pub fn status(mut self, status: WatchStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn episodes(mut self, episodes: u32) -> Self {
        self.episodes_watched = Some(episodes);
        self
    }

    pub fn rating(mut self, rating: Option<u8>) -> Self {
        self.user_rating = Some(rating);
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn start_date(mut self, date: Option<String>) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn finish_date(mut self, date: Option<String>) -> Self {
        self.finish_date = Some(date);
        self
    }

    pub fn favorite(mut self, favorite: Option<bool>) -> Self {
        self.is_favorite = Some(favorite);
        self
    }

    pub fn rewatch_count(mut self, count: Option<u32>) -> Self {
        self.rewatch_count = Some(count);
        self
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub(crate) mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn test_entry(total: Option<u32>) -> UserAnimeEntry {
        let mut title = Title::new(52991, "Sousou no Frieren");
        title.total_episodes = total;
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        UserAnimeEntry::new(title, WatchStatus::PlanToWatch, at)
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("plan-to-watch".parse::<WatchStatus>(), Ok(WatchStatus::PlanToWatch));
        assert_eq!("on_hold".parse::<WatchStatus>(), Ok(WatchStatus::OnHold));
        assert_eq!("Plan to Watch".parse::<WatchStatus>(), Ok(WatchStatus::PlanToWatch));
        assert!("rewatching".parse::<WatchStatus>().is_err());
        for status in WatchStatus::ALL {
            assert_eq!(status.as_wire_str().parse::<WatchStatus>(), Ok(*status));
        }
    }

    #[test]
    fn test_apply_clamps_episodes_and_rating() {
        let mut entry = test_entry(Some(28));
        let at = entry.last_updated + chrono::Duration::hours(1);
        entry.apply(EntryPatch::default().episodes(40).rating(Some(0)), at);
        assert_eq!(entry.episodes_watched, 28);
        assert_eq!(entry.user_rating, Some(1));
        assert_eq!(entry.last_updated, at);

        entry.apply(EntryPatch::default().rating(Some(11)), at);
        assert_eq!(entry.user_rating, Some(10));
    }

    #[test]
    fn test_apply_clears_nullable_fields() {
        let mut entry = test_entry(None);
        let at = entry.last_updated;
        entry.apply(EntryPatch::default().notes(Some("rewatch later".into())), at);
        assert_eq!(entry.notes.as_deref(), Some("rewatch later"));

        // A patch that does not mention notes leaves them alone.
        entry.apply(EntryPatch::default().status(WatchStatus::Watching), at);
        assert_eq!(entry.notes.as_deref(), Some("rewatch later"));

        entry.apply(EntryPatch::default().notes(None), at);
        assert!(entry.notes.is_none());
    }

    #[test]
    fn test_last_updated_never_moves_backwards() {
        let mut entry = test_entry(None);
        let before = entry.last_updated - chrono::Duration::days(1);
        entry.apply(EntryPatch::default().episodes(1), before);
        assert_eq!(entry.last_updated, entry.date_added);
    }

    #[test]
    fn test_serialized_layout() {
        let entry = test_entry(Some(28));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["animeId"], 52991);
        assert_eq!(value["status"], "plan-to-watch");
        assert_eq!(value["episodesWatched"], 0);
        assert_eq!(value["dateAdded"], "2024-01-01T00:00:00.000Z");
        assert!(value["userRating"].is_null());
        assert!(value["isFavorite"].is_null());
        assert_eq!(value["anime"]["totalEpisodes"], 28);
    }

    #[test]
    fn test_sanitize_repairs_imported_entry() {
        let mut entry = test_entry(Some(12));
        entry.anime_id = 1;
        entry.episodes_watched = 99;
        entry.user_rating = Some(42);
        entry.last_updated = entry.date_added - chrono::Duration::days(3);
        entry.sanitize();
        assert_eq!(entry.anime_id, 52991);
        assert_eq!(entry.episodes_watched, 12);
        assert_eq!(entry.user_rating, Some(10));
        assert_eq!(entry.last_updated, entry.date_added);
    }
}
