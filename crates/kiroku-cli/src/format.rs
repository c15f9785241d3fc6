//! Plain-text rendering for terminal output.

use std::fmt::Write;

use kiroku_core::models::{Title, UserAnimeEntry};
use kiroku_core::views::{self, ListStats};

/// `episodes_watched/total`, with `?` for an unknown total.
pub fn progress(watched: u32, total: Option<u32>) -> String {
    match total {
        Some(total) => format!("{watched}/{total}"),
        None => format!("{watched}/?"),
    }
}

/// One search or popular result.
pub fn title_line(title: &Title, in_list: bool) -> String {
    let mut line = format!("{:>6}  {}", title.id, title.display_title());
    let mut facts = Vec::new();
    if let Some(media_type) = title.media_type {
        facts.push(media_type.to_string());
    }
    if let Some(year) = title.year {
        facts.push(year.to_string());
    }
    if let Some(eps) = title.total_episodes {
        facts.push(format!("{eps} eps"));
    }
    if let Some(score) = title.average_score {
        facts.push(format!("★ {score:.2}"));
    }
    if !facts.is_empty() {
        let _ = write!(line, " ({})", facts.join(", "));
    }
    if in_list {
        line.push_str("  [in list]");
    }
    line
}

/// One row of the user's list.
pub fn entry_line(entry: &UserAnimeEntry) -> String {
    let mut line = format!(
        "{:>6}  {:<14} {:>7}  {}",
        entry.anime_id,
        entry.status.as_str(),
        progress(entry.episodes_watched, entry.anime.total_episodes),
        entry.anime.display_title(),
    );
    if let Some(rating) = entry.user_rating {
        let _ = write!(line, "  {rating}/10");
    }
    if entry.is_favorite == Some(true) {
        line.push_str("  ♥");
    }
    line
}

pub fn title_details(title: &Title) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title.display_title());
    if title.display_title() != title.title {
        let _ = writeln!(out, "  Romaji:     {}", title.title);
    }
    if let Some(japanese) = &title.japanese_title {
        let _ = writeln!(out, "  Japanese:   {japanese}");
    }
    let _ = writeln!(out, "  ID:         {}", title.id);
    if let Some(media_type) = title.media_type {
        let _ = writeln!(out, "  Type:       {media_type}");
    }
    let episodes = title
        .total_episodes
        .map_or_else(|| "unknown".to_string(), |n| n.to_string());
    let _ = writeln!(out, "  Episodes:   {episodes}");
    if let Some(status) = title.airing_status {
        let _ = writeln!(out, "  Status:     {status}");
    }
    match (title.season, title.year) {
        (Some(season), Some(year)) => {
            let _ = writeln!(out, "  Season:     {season} {year}");
        }
        (None, Some(year)) => {
            let _ = writeln!(out, "  Year:       {year}");
        }
        _ => {}
    }
    if let Some(score) = title.average_score {
        let _ = writeln!(out, "  Score:      {score:.2}");
    }
    if !title.genres.is_empty() {
        let _ = writeln!(out, "  Genres:     {}", title.genres.join(", "));
    }
    if !title.studios.is_empty() {
        let _ = writeln!(out, "  Studios:    {}", title.studios.join(", "));
    }
    if let Some(duration) = &title.duration {
        let _ = writeln!(out, "  Duration:   {duration}");
    }
    if let Some(rating) = &title.rating {
        let _ = writeln!(out, "  Rating:     {rating}");
    }
    if let Some(synopsis) = &title.synopsis {
        let _ = writeln!(out);
        let _ = writeln!(out, "{synopsis}");
    }
    out
}

/// Tab-style header: `All 4 · Watching 1 · Completed 2 ...`
pub fn status_badges(list: &[UserAnimeEntry]) -> String {
    let mut badges = vec![format!("All {}", views::total_count(list))];
    badges.extend(
        views::status_counts(list)
            .into_iter()
            .map(|(status, n)| format!("{status} {n}")),
    );
    badges.join(" · ")
}

pub fn stats(stats: &ListStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Titles:          {}", stats.total_anime);
    let _ = writeln!(out, "Episodes:        {}", stats.total_episodes);
    let average = stats
        .average_rating
        .map_or_else(|| "-".to_string(), |r| format!("{r:.1}"));
    let _ = writeln!(out, "Average rating:  {average}");
    for (status, n) in &stats.status_counts {
        let _ = writeln!(out, "  {:<14} {n}", status.as_str());
    }
    if !stats.top_genres.is_empty() {
        let genres: Vec<String> = stats
            .top_genres
            .iter()
            .map(|(genre, n)| format!("{genre} ({n})"))
            .collect();
        let _ = writeln!(out, "Top genres:      {}", genres.join(", "));
    }
    out
}
