use serde::{Deserialize, Serialize};

/// Catalog media format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "TV")]
    Tv,
    Movie,
    #[serde(rename = "OVA")]
    Ova,
    Special,
    #[serde(rename = "ONA")]
    Ona,
    Music,
}

impl MediaType {
    /// Parse the catalog's label. Unknown labels (e.g. "PV", "CM") yield `None`.
    pub fn from_catalog_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tv" => Some(Self::Tv),
            "movie" => Some(Self::Movie),
            "ova" => Some(Self::Ova),
            "special" => Some(Self::Special),
            "ona" => Some(Self::Ona),
            "music" => Some(Self::Music),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tv => "TV",
            Self::Movie => "Movie",
            Self::Ova => "OVA",
            Self::Special => "Special",
            Self::Ona => "ONA",
            Self::Music => "Music",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broadcast state as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiringStatus {
    #[serde(rename = "Currently Airing")]
    Airing,
    #[serde(rename = "Finished Airing")]
    Finished,
    #[serde(rename = "Not yet aired")]
    NotYetAired,
}

impl AiringStatus {
    pub fn from_catalog_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "currently airing" | "airing" => Some(Self::Airing),
            "finished airing" | "finished" => Some(Self::Finished),
            "not yet aired" | "upcoming" => Some(Self::NotYetAired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Airing => "Currently Airing",
            Self::Finished => "Finished Airing",
            Self::NotYetAired => "Not yet aired",
        }
    }
}

impl std::fmt::Display for AiringStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anime season (quarter of the year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn from_catalog_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "winter" => Some(Self::Winter),
            "spring" => Some(Self::Spring),
            "summer" => Some(Self::Summer),
            "fall" | "autumn" => Some(Self::Fall),
            _ => None,
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Winter => write!(f, "Winter"),
            Self::Spring => write!(f, "Spring"),
            Self::Summer => write!(f, "Summer"),
            Self::Fall => write!(f, "Fall"),
        }
    }
}

/// Normalized catalog metadata for one anime work.
///
/// Built once from a catalog response and never mutated afterwards. A list
/// entry embeds a copy taken at add time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub english_title: Option<String>,
    #[serde(default)]
    pub japanese_title: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub large_cover_image: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(rename = "type", default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub total_episodes: Option<u32>,
    #[serde(default)]
    pub airing_status: Option<AiringStatus>,
    #[serde(default)]
    pub average_score: Option<f32>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub studios: Vec<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
}

impl Title {
    /// A title with only the required fields set.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            english_title: None,
            japanese_title: None,
            cover_image: None,
            large_cover_image: None,
            synopsis: None,
            media_type: None,
            total_episodes: None,
            airing_status: None,
            average_score: None,
            popularity: None,
            genres: Vec::new(),
            studios: Vec::new(),
            year: None,
            season: None,
            duration: None,
            rating: None,
        }
    }

    /// Localized title if present, else the primary title.
    pub fn display_title(&self) -> &str {
        self.english_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.title)
    }

    /// Clamp an episode count to `[0, total_episodes]`; unbounded above when
    /// the total is unknown.
    pub fn clamp_episodes(&self, episodes: i64) -> u32 {
        let upper = self.total_episodes.map_or(i64::from(u32::MAX), i64::from);
        // `upper` is at most u32::MAX, so the cast cannot truncate.
        episodes.clamp(0, upper) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_prefers_english() {
        let mut title = Title::new(1, "Sousou no Frieren");
        assert_eq!(title.display_title(), "Sousou no Frieren");

        title.english_title = Some("Frieren: Beyond Journey's End".into());
        assert_eq!(title.display_title(), "Frieren: Beyond Journey's End");

        title.english_title = Some("   ".into());
        assert_eq!(title.display_title(), "Sousou no Frieren");
    }

    #[test]
    fn test_clamp_episodes() {
        let mut title = Title::new(1, "Test");
        title.total_episodes = Some(12);
        assert_eq!(title.clamp_episodes(-3), 0);
        assert_eq!(title.clamp_episodes(7), 7);
        assert_eq!(title.clamp_episodes(13), 12);

        title.total_episodes = None;
        assert_eq!(title.clamp_episodes(-1), 0);
        assert_eq!(title.clamp_episodes(500), 500);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&MediaType::Tv).unwrap(), r#""TV""#);
        assert_eq!(
            serde_json::to_string(&AiringStatus::Finished).unwrap(),
            r#""Finished Airing""#
        );
        assert_eq!(serde_json::to_string(&Season::Fall).unwrap(), r#""fall""#);
        assert_eq!(MediaType::from_catalog_str("TV Special"), None);
        assert_eq!(AiringStatus::from_catalog_str("Not yet aired"), Some(AiringStatus::NotYetAired));
    }

    #[test]
    fn test_deserialize_persisted_title() {
        let json = r#"{
            "id": 16498,
            "title": "Shingeki no Kyojin",
            "type": "TV",
            "totalEpisodes": 25,
            "airingStatus": "Finished Airing",
            "genres": ["Action", "Drama"],
            "studios": ["Wit Studio"]
        }"#;
        let title: Title = serde_json::from_str(json).unwrap();
        assert_eq!(title.id, 16498);
        assert_eq!(title.media_type, Some(MediaType::Tv));
        assert_eq!(title.total_episodes, Some(25));
        assert_eq!(title.airing_status, Some(AiringStatus::Finished));
        assert!(title.synopsis.is_none());
        assert_eq!(title.studios, vec!["Wit Studio".to_string()]);
    }
}
