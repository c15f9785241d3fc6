use serde::Deserialize;

use kiroku_core::models::{AiringStatus, MediaType, Season, Title};

use super::error::NormalizeError;

// ── Responses ───────────────────────────────────────────────────

/// Envelope of `/anime?q=` and `/top/anime`.
///
/// Records are kept as raw JSON so that one malformed record can be dropped
/// without failing the whole page.
#[derive(Debug, Deserialize)]
pub struct JikanListResponse {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

/// Envelope of `/anime/{id}`.
#[derive(Debug, Deserialize)]
pub struct JikanSingleResponse {
    pub data: JikanAnime,
}

// ── Records ─────────────────────────────────────────────────────

/// One raw anime record. Every field is optional here; `into_title` decides
/// what is required.
#[derive(Debug, Default, Deserialize)]
pub struct JikanAnime {
    pub mal_id: Option<u64>,
    pub title: Option<String>,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub images: Option<JikanImages>,
    pub synopsis: Option<String>,
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub episodes: Option<u32>,
    pub status: Option<String>,
    pub score: Option<f32>,
    pub rank: Option<u32>,
    pub popularity: Option<u32>,
    pub genres: Option<Vec<JikanEntity>>,
    pub studios: Option<Vec<JikanEntity>>,
    pub year: Option<u32>,
    pub season: Option<String>,
    pub duration: Option<String>,
    pub rating: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JikanImages {
    pub jpg: Option<JikanImageSet>,
    pub webp: Option<JikanImageSet>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JikanImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

/// Genre, studio, producer... anything with a name.
#[derive(Debug, Deserialize)]
pub struct JikanEntity {
    pub mal_id: Option<u64>,
    pub name: Option<String>,
}

// ── Conversion to the internal title ────────────────────────────

impl JikanAnime {
    pub fn into_title(self) -> Result<Title, NormalizeError> {
        let id = self.mal_id.ok_or(NormalizeError::MissingId)?;
        let title = non_blank(self.title).ok_or(NormalizeError::MissingTitle(id))?;

        let (cover_image, large_cover_image) = self
            .images
            .map(JikanImages::into_urls)
            .unwrap_or_default();

        Ok(Title {
            id,
            english_title: non_blank(self.title_english).or_else(|| Some(title.clone())),
            japanese_title: non_blank(self.title_japanese),
            cover_image,
            large_cover_image,
            synopsis: non_blank(self.synopsis),
            media_type: self.anime_type.as_deref().and_then(MediaType::from_catalog_str),
            total_episodes: self.episodes,
            airing_status: self.status.as_deref().and_then(AiringStatus::from_catalog_str),
            average_score: self.score.filter(|s| (0.0..=10.0).contains(s)),
            popularity: self.popularity,
            genres: entity_names(self.genres),
            studios: entity_names(self.studios),
            year: self.year,
            season: self.season.as_deref().and_then(Season::from_catalog_str),
            duration: non_blank(self.duration),
            rating: non_blank(self.rating),
            title,
        })
    }
}

impl JikanImages {
    /// (cover, large cover), preferring JPEG and falling back to WebP.
    fn into_urls(self) -> (Option<String>, Option<String>) {
        let jpg = self.jpg.unwrap_or_default();
        let webp = self.webp.unwrap_or_default();
        let cover = non_blank(jpg.image_url)
            .or_else(|| non_blank(jpg.small_image_url))
            .or_else(|| non_blank(webp.image_url));
        let large = non_blank(jpg.large_image_url)
            .or_else(|| non_blank(webp.large_image_url))
            .or_else(|| cover.clone());
        (cover, large)
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

fn entity_names(entities: Option<Vec<JikanEntity>>) -> Vec<String> {
    entities
        .unwrap_or_default()
        .into_iter()
        .filter_map(|e| non_blank(e.name))
        .collect()
}
