use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use kiroku_api::CatalogService;
use kiroku_core::export::ExportData;
use kiroku_core::models::library::RATING_RANGE;
use kiroku_core::models::{EntryPatch, UserAnimeEntry, WatchStatus};
use kiroku_core::views::{self, SortKey, SortOrder, StatusFilter};

use crate::format;
use crate::Store;

#[derive(Subcommand)]
pub enum Command {
    /// Search the catalog by title
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Show the most popular TV series
    Popular,
    /// Show catalog details for one title
    Show { id: u64 },
    /// Add a title to your list
    Add {
        id: u64,
        /// Initial status (defaults to the configured one)
        #[arg(short, long)]
        status: Option<WatchStatus>,
    },
    /// Remove a title from your list
    Remove { id: u64 },
    /// Change the watch status of an entry
    Status { id: u64, status: WatchStatus },
    /// Change progress: `+`, `-`, `+N`, `-N` or an absolute count
    Episode {
        id: u64,
        #[arg(allow_hyphen_values = true)]
        change: EpisodeChange,
    },
    /// Rate an entry from 1 to 10, or `none` to clear
    Rate { id: u64, rating: RatingArg },
    /// Set or clear the notes on an entry
    Note {
        id: u64,
        #[arg(required_unless_present = "clear", conflicts_with = "clear")]
        text: Option<String>,
        #[arg(long)]
        clear: bool,
    },
    /// Toggle the favorite flag on an entry
    Favorite { id: u64 },
    /// Print your list
    List {
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,
        #[arg(long, default_value = "date-added")]
        sort: SortKey,
        #[arg(long)]
        desc: bool,
    },
    /// Print list statistics
    Stats,
    /// Write a JSON backup (to stdout when no path is given)
    Export { path: Option<PathBuf> },
    /// Merge entries from a JSON backup
    Import { path: PathBuf },
}

/// Argument of `kiroku episode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeChange {
    Increment,
    Decrement,
    Delta(i64),
    Set(u32),
}

impl FromStr for EpisodeChange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "+" => return Ok(Self::Increment),
            "-" => return Ok(Self::Decrement),
            _ => {}
        }
        if s.starts_with(['+', '-']) {
            return s
                .parse::<i64>()
                .map(Self::Delta)
                .map_err(|_| format!("invalid episode delta: {s}"));
        }
        s.parse::<u32>()
            .map(Self::Set)
            .map_err(|_| format!("invalid episode count: {s}"))
    }
}

/// Argument of `kiroku rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingArg(pub Option<u8>);

impl FromStr for RatingArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("clear") {
            return Ok(Self(None));
        }
        match s.parse::<u8>() {
            Ok(r) if RATING_RANGE.contains(&r) => Ok(Self(Some(r))),
            _ => Err(format!(
                "rating must be {}-{} or `none`, got {s}",
                RATING_RANGE.start(),
                RATING_RANGE.end()
            )),
        }
    }
}

pub async fn run(command: Command, store: &Store, catalog: &impl CatalogService) -> Result<()> {
    match command {
        Command::Search { query } => {
            let query = query.join(" ");
            let titles = catalog.search(&query).await;
            if titles.is_empty() {
                println!("No results for \"{query}\".");
            }
            for title in &titles {
                println!("{}", format::title_line(title, store.contains(title.id)));
            }
        }
        Command::Popular => {
            for title in &catalog.popular().await {
                println!("{}", format::title_line(title, store.contains(title.id)));
            }
        }
        Command::Show { id } => {
            let Some(title) = catalog.get_by_id(id).await else {
                bail!("anime {id} not found in the catalog");
            };
            print!("{}", format::title_details(&title));
            if let Some(entry) = store.get(id) {
                println!();
                println!("In your list: {}", format::entry_line(&entry));
            }
        }
        Command::Add { id, status } => {
            if let Some(entry) = store.get(id) {
                println!("Already in your list: {}", format::entry_line(&entry));
                return Ok(());
            }
            let Some(title) = catalog.get_by_id(id).await else {
                bail!("anime {id} not found in the catalog");
            };
            let entry = store.add(title, status);
            println!("Added: {}", format::entry_line(&entry));
        }
        Command::Remove { id } => match store.get(id) {
            Some(entry) => {
                store.remove(id);
                println!("Removed: {}", entry.anime.display_title());
            }
            None => println!("Anime {id} is not in your list; nothing to remove."),
        },
        Command::Status { id, status } => {
            report(id, store.set_status(id, status))?;
        }
        Command::Episode { id, change } => {
            let updated = match change {
                EpisodeChange::Increment => store.increment_episode(id),
                EpisodeChange::Decrement => store.decrement_episode(id),
                EpisodeChange::Delta(delta) => store.adjust_episodes(id, delta),
                EpisodeChange::Set(n) => store.set_episodes(id, n),
            };
            report(id, updated)?;
        }
        Command::Rate { id, rating } => {
            report(id, store.update(id, EntryPatch::default().rating(rating.0)))?;
        }
        Command::Note { id, text, clear } => {
            let notes = if clear {
                None
            } else {
                text.filter(|t| !t.trim().is_empty())
            };
            report(id, store.update(id, EntryPatch::default().notes(notes)))?;
        }
        Command::Favorite { id } => {
            report(id, store.toggle_favorite(id))?;
        }
        Command::List { status, sort, desc } => {
            let list = store.get_all();
            let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
            let shown: Vec<UserAnimeEntry> = views::filter_by_status(&list, status)
                .into_iter()
                .cloned()
                .collect();

            println!("{}", format::status_badges(&list));
            if shown.is_empty() {
                println!("Nothing here yet ({status}).");
            }
            for entry in views::sort_entries(&shown, sort, order) {
                println!("{}", format::entry_line(entry));
            }
        }
        Command::Stats => {
            print!("{}", format::stats(&views::stats(&store.get_all())));
        }
        Command::Export { path } => {
            let json = store.export().to_json_pretty()?;
            match path {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "list exported");
                }
                None => println!("{json}"),
            }
        }
        Command::Import { path } => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let entries = ExportData::parse_entries(&json)
                .with_context(|| format!("{} is not a kiroku backup", path.display()))?;
            let total = entries.len();
            let added = store.import(entries);
            println!("Imported {added} of {total} entries.");
        }
    }
    Ok(())
}

fn report(id: u64, updated: Option<UserAnimeEntry>) -> Result<()> {
    match updated {
        Some(entry) => {
            println!("{}", format::entry_line(&entry));
            Ok(())
        }
        None => bail!("anime {id} is not in your list"),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use kiroku_core::models::Title;
    use kiroku_core::storage::{ListBackend, MemoryBackend};
    use kiroku_core::store::ListStore;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Command,
    }

    #[test]
    fn test_episode_change_parsing() {
        assert_eq!("+".parse::<EpisodeChange>(), Ok(EpisodeChange::Increment));
        assert_eq!("-".parse::<EpisodeChange>(), Ok(EpisodeChange::Decrement));
        assert_eq!("+3".parse::<EpisodeChange>(), Ok(EpisodeChange::Delta(3)));
        assert_eq!("-2".parse::<EpisodeChange>(), Ok(EpisodeChange::Delta(-2)));
        assert_eq!("12".parse::<EpisodeChange>(), Ok(EpisodeChange::Set(12)));
        assert!("twelve".parse::<EpisodeChange>().is_err());
        assert!("+x".parse::<EpisodeChange>().is_err());
    }

    #[test]
    fn test_rating_parsing() {
        assert_eq!("7".parse::<RatingArg>(), Ok(RatingArg(Some(7))));
        assert_eq!("none".parse::<RatingArg>(), Ok(RatingArg(None)));
        assert_eq!("Clear".parse::<RatingArg>(), Ok(RatingArg(None)));
        assert!("0".parse::<RatingArg>().is_err());
        assert!("11".parse::<RatingArg>().is_err());
    }

    #[test]
    fn test_negative_delta_is_not_a_flag() {
        let cli = TestCli::try_parse_from(["kiroku", "episode", "21", "-2"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Episode {
                id: 21,
                change: EpisodeChange::Delta(-2)
            }
        ));
    }

    #[test]
    fn test_list_defaults() {
        let cli = TestCli::try_parse_from(["kiroku", "list"]).unwrap();
        match cli.command {
            Command::List { status, sort, desc } => {
                assert_eq!(status, StatusFilter::All);
                assert_eq!(sort, SortKey::DateAdded);
                assert!(!desc);
            }
            _ => panic!("expected list"),
        }

        let cli =
            TestCli::try_parse_from(["kiroku", "list", "--status", "on-hold", "--sort", "rating"])
                .unwrap();
        match cli.command {
            Command::List { status, sort, .. } => {
                assert_eq!(status, StatusFilter::Only(WatchStatus::OnHold));
                assert_eq!(sort, SortKey::Rating);
            }
            _ => panic!("expected list"),
        }
    }

    fn store() -> Store {
        let backend: Box<dyn ListBackend> = Box::new(MemoryBackend::new());
        ListStore::new(backend)
    }

    /// A catalog that knows nothing; commands here must not need it.
    struct NoCatalog;

    impl CatalogService for NoCatalog {
        async fn search(&self, _query: &str) -> Vec<Title> {
            Vec::new()
        }

        async fn popular(&self) -> Vec<Title> {
            Vec::new()
        }

        async fn get_by_id(&self, _id: u64) -> Option<Title> {
            None
        }
    }

    #[tokio::test]
    async fn test_remove_untracked_id_succeeds() {
        let store = store();
        store.add(Title::new(1, "Cowboy Bebop"), None);

        run(Command::Remove { id: 99 }, &store, &NoCatalog).await.unwrap();
        assert!(store.contains(1));

        run(Command::Remove { id: 1 }, &store, &NoCatalog).await.unwrap();
        run(Command::Remove { id: 1 }, &store, &NoCatalog).await.unwrap();
        assert!(store.get_all().is_empty());
    }

    #[tokio::test]
    async fn test_update_untracked_id_fails() {
        let store = store();
        let result = run(
            Command::Status {
                id: 5,
                status: WatchStatus::Dropped,
            },
            &store,
            &NoCatalog,
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_note_requires_text_or_clear() {
        assert!(TestCli::try_parse_from(["kiroku", "note", "1"]).is_err());
        assert!(TestCli::try_parse_from(["kiroku", "note", "1", "hi", "--clear"]).is_err());
        assert!(TestCli::try_parse_from(["kiroku", "note", "1", "--clear"]).is_ok());
    }
}
