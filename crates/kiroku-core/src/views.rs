//! Read-only projections over a list snapshot.
//!
//! Everything here is a pure function of its input: no I/O, no mutation.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{UserAnimeEntry, WatchStatus};

/// Maximum number of genres reported by [`stats`].
const TOP_GENRES_LIMIT: usize = 5;

/// Which entries a list view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(WatchStatus),
}

impl From<WatchStatus> for StatusFilter {
    fn from(status: WatchStatus) -> Self {
        Self::Only(status)
    }
}

impl FromStr for StatusFilter {
    type Err = crate::models::library::ParseWatchStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl std::fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(status) => write!(f, "{status}"),
        }
    }
}

pub fn filter_by_status(list: &[UserAnimeEntry], filter: StatusFilter) -> Vec<&UserAnimeEntry> {
    match filter {
        StatusFilter::All => list.iter().collect(),
        StatusFilter::Only(status) => list.iter().filter(|e| e.status == status).collect(),
    }
}

pub fn count_by_status(list: &[UserAnimeEntry], status: WatchStatus) -> usize {
    list.iter().filter(|e| e.status == status).count()
}

pub fn total_count(list: &[UserAnimeEntry]) -> usize {
    list.len()
}

/// Per-status counts in [`WatchStatus::ALL`] order, zeros included.
pub fn status_counts(list: &[UserAnimeEntry]) -> Vec<(WatchStatus, usize)> {
    WatchStatus::ALL
        .iter()
        .map(|&status| (status, count_by_status(list, status)))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Rating,
    #[default]
    DateAdded,
    LastUpdated,
    EpisodesWatched,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "title" => Ok(Self::Title),
            "rating" => Ok(Self::Rating),
            "dateadded" | "added" => Ok(Self::DateAdded),
            "lastupdated" | "updated" => Ok(Self::LastUpdated),
            "episodeswatched" | "episodes" | "progress" => Ok(Self::EpisodesWatched),
            _ => Err(format!("unknown sort key: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Stable sort by `key`. Unrated entries always sort after rated ones.
pub fn sort_entries(
    list: &[UserAnimeEntry],
    key: SortKey,
    order: SortOrder,
) -> Vec<&UserAnimeEntry> {
    let directed = |ord: Ordering| match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    };

    let mut sorted: Vec<&UserAnimeEntry> = list.iter().collect();
    sorted.sort_by(|a, b| match key {
        SortKey::Title => directed(
            a.anime
                .display_title()
                .to_lowercase()
                .cmp(&b.anime.display_title().to_lowercase()),
        ),
        SortKey::Rating => match (a.user_rating, b.user_rating) {
            (Some(x), Some(y)) => directed(x.cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::DateAdded => directed(a.date_added.cmp(&b.date_added)),
        SortKey::LastUpdated => directed(a.last_updated.cmp(&b.last_updated)),
        SortKey::EpisodesWatched => directed(a.episodes_watched.cmp(&b.episodes_watched)),
    });
    sorted
}

/// Aggregate numbers for a stats page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListStats {
    pub total_anime: usize,
    pub total_episodes: u64,
    pub average_rating: Option<f32>,
    pub status_counts: Vec<(WatchStatus, usize)>,
    pub top_genres: Vec<(String, usize)>,
}

pub fn stats(list: &[UserAnimeEntry]) -> ListStats {
    let total_episodes = list.iter().map(|e| u64::from(e.episodes_watched)).sum();

    let ratings: Vec<u8> = list.iter().filter_map(|e| e.user_rating).collect();
    let average_rating = (!ratings.is_empty()).then(|| {
        ratings.iter().map(|&r| f32::from(r)).sum::<f32>() / ratings.len() as f32
    });

    let mut genre_counts: HashMap<&str, usize> = HashMap::new();
    for genre in list.iter().flat_map(|e| e.anime.genres.iter()) {
        *genre_counts.entry(genre.as_str()).or_default() += 1;
    }
    let mut top_genres: Vec<(String, usize)> = genre_counts
        .into_iter()
        .map(|(genre, count)| (genre.to_string(), count))
        .collect();
    top_genres.sort_by(|(ga, ca), (gb, cb)| cb.cmp(ca).then_with(|| ga.cmp(gb)));
    top_genres.truncate(TOP_GENRES_LIMIT);

    ListStats {
        total_anime: total_count(list),
        total_episodes,
        average_rating,
        status_counts: status_counts(list),
        top_genres,
    }
}
