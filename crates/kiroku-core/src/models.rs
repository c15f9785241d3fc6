pub mod anime;
pub mod library;

pub use anime::{AiringStatus, MediaType, Season, Title};
pub use library::{EntryPatch, UserAnimeEntry, WatchStatus};
