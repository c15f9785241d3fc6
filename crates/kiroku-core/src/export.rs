use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KirokuError;
use crate::models::library::timestamp;
use crate::models::UserAnimeEntry;
use crate::views;

/// Format version written into backups.
pub const EXPORT_VERSION: &str = "1.0";

/// A full backup of the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub version: String,
    #[serde(with = "timestamp")]
    pub export_date: DateTime<Utc>,
    pub anime_list: Vec<UserAnimeEntry>,
    pub metadata: ExportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub total_anime: usize,
    pub total_episodes: u64,
    pub average_rating: Option<f32>,
}

impl ExportData {
    pub fn new(anime_list: Vec<UserAnimeEntry>, at: DateTime<Utc>) -> Self {
        let stats = views::stats(&anime_list);
        Self {
            version: EXPORT_VERSION.to_string(),
            export_date: at,
            metadata: ExportMetadata {
                total_anime: stats.total_anime,
                total_episodes: stats.total_episodes,
                average_rating: stats.average_rating,
            },
            anime_list,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, KirokuError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read the entries out of a backup file. Accepts either a full backup
    /// object or a bare array of entries (the raw persisted value).
    pub fn parse_entries(json: &str) -> Result<Vec<UserAnimeEntry>, KirokuError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| KirokuError::Corrupt(e.to_string()))?;
        let entries = if value.is_array() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value::<ExportData>(value).map(|data| data.anime_list)
        };
        entries.map_err(|e| KirokuError::Corrupt(e.to_string()))
    }
}
