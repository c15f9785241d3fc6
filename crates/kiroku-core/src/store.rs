use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::bus::{ChangeBus, SubscriptionId};
use crate::error::KirokuError;
use crate::export::ExportData;
use crate::models::library::now;
use crate::models::{EntryPatch, Title, UserAnimeEntry, WatchStatus};
use crate::storage::ListBackend;

/// Behaviour switches for a [`ListStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Status given to `add` calls that don't name one.
    pub default_status: WatchStatus,
    /// Mark an entry completed once an episode change reaches the known total.
    pub auto_mark_completed: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_status: WatchStatus::PlanToWatch,
            auto_mark_completed: false,
        }
    }
}

/// Sole writer of the persisted list.
///
/// Every mutation reads the current list from the backend, changes a copy,
/// and writes the whole list back. Subscribers are notified only after the
/// write succeeded. Storage failures never reach the caller: reads degrade to
/// an empty list and failed writes are logged and dropped. A mutation that
/// cannot read the current list does not write at all.
pub struct ListStore<B> {
    backend: B,
    bus: ChangeBus,
    options: StoreOptions,
}

impl<B: ListBackend> ListStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    pub fn with_options(backend: B, options: StoreOptions) -> Self {
        Self {
            backend,
            bus: ChangeBus::new(),
            options,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    // ── Reads ───────────────────────────────────────────────────

    /// Snapshot of all entries in insertion order.
    pub fn get_all(&self) -> Vec<UserAnimeEntry> {
        match self.backend.load() {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read list; treating as empty");
                Vec::new()
            }
        }
    }

    pub fn get(&self, anime_id: u64) -> Option<UserAnimeEntry> {
        self.get_all().into_iter().find(|e| e.anime_id == anime_id)
    }

    pub fn contains(&self, anime_id: u64) -> bool {
        self.get(anime_id).is_some()
    }

    // ── Mutations ───────────────────────────────────────────────

    /// Add a title to the list.
    ///
    /// If the title is already tracked the existing entry is returned
    /// unchanged and `status` is ignored.
    pub fn add(&self, title: Title, status: Option<WatchStatus>) -> UserAnimeEntry {
        let status = status.unwrap_or(self.options.default_status);
        let Some(mut list) = self.load_for_write() else {
            return UserAnimeEntry::new(title, status, now());
        };
        if let Some(existing) = list.iter().find(|e| e.anime_id == title.id) {
            tracing::debug!(anime_id = title.id, "already in list");
            return existing.clone();
        }

        let entry = UserAnimeEntry::new(title, status, now());
        tracing::debug!(anime_id = entry.anime_id, status = %entry.status, "adding to list");
        list.push(entry.clone());
        self.persist(&list);
        entry
    }

    /// Remove the entry for `anime_id`. Absent ids are a no-op.
    pub fn remove(&self, anime_id: u64) {
        let Some(mut list) = self.load_for_write() else {
            return;
        };
        let before = list.len();
        list.retain(|e| e.anime_id != anime_id);
        if list.len() == before {
            tracing::debug!(anime_id, "remove: not in list");
            return;
        }
        tracing::debug!(anime_id, "removing from list");
        self.persist(&list);
    }

    /// Merge `patch` into the entry for `anime_id`.
    ///
    /// Returns `None` without touching storage if the id is not tracked.
    pub fn update(&self, anime_id: u64, patch: EntryPatch) -> Option<UserAnimeEntry> {
        let mut list = self.load_for_write()?;
        let Some(entry) = list.iter_mut().find(|e| e.anime_id == anime_id) else {
            tracing::debug!(anime_id, "update: not in list");
            return None;
        };

        let at = now();
        let episodes_changed = patch.episodes_watched.is_some();
        let explicit_status = patch.status.is_some();
        entry.apply(patch, at);
        if self.options.auto_mark_completed && episodes_changed && !explicit_status {
            mark_completed_if_caught_up(entry, at);
        }

        let updated = entry.clone();
        self.persist(&list);
        Some(updated)
    }

    pub fn set_status(&self, anime_id: u64, status: WatchStatus) -> Option<UserAnimeEntry> {
        self.update(anime_id, EntryPatch::default().status(status))
    }

    /// Set the watched count, clamped to the title's episode bound.
    pub fn set_episodes(&self, anime_id: u64, episodes: u32) -> Option<UserAnimeEntry> {
        self.update(anime_id, EntryPatch::default().episodes(episodes))
    }

    /// Move the watched count by `delta`, clamped to `[0, total]`.
    pub fn adjust_episodes(&self, anime_id: u64, delta: i64) -> Option<UserAnimeEntry> {
        let entry = self.get(anime_id)?;
        let target = entry
            .anime
            .clamp_episodes(i64::from(entry.episodes_watched).saturating_add(delta));
        self.set_episodes(anime_id, target)
    }

    pub fn increment_episode(&self, anime_id: u64) -> Option<UserAnimeEntry> {
        self.adjust_episodes(anime_id, 1)
    }

    pub fn decrement_episode(&self, anime_id: u64) -> Option<UserAnimeEntry> {
        self.adjust_episodes(anime_id, -1)
    }

    pub fn toggle_favorite(&self, anime_id: u64) -> Option<UserAnimeEntry> {
        let entry = self.get(anime_id)?;
        let favorite = !entry.is_favorite.unwrap_or(false);
        self.update(anime_id, EntryPatch::default().favorite(Some(favorite)))
    }

    /// Merge entries from a backup. Already-tracked ids are skipped and
    /// duplicates within `entries` collapse to the first. Returns how many
    /// entries were added.
    pub fn import(&self, entries: Vec<UserAnimeEntry>) -> usize {
        let Some(mut list) = self.load_for_write() else {
            return 0;
        };
        let mut seen: HashSet<u64> = list.iter().map(|e| e.anime_id).collect();
        let mut added = 0;
        for mut entry in entries {
            entry.sanitize();
            if seen.insert(entry.anime_id) {
                list.push(entry);
                added += 1;
            }
        }
        if added == 0 {
            return 0;
        }
        tracing::info!(added, "imported entries");
        if self.persist(&list) {
            added
        } else {
            0
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        match self.load_for_write() {
            Some(list) if !list.is_empty() => {}
            _ => return,
        }
        self.persist(&[]);
    }

    pub fn export(&self) -> ExportData {
        ExportData::new(self.get_all(), now())
    }

    // ── Notifications ───────────────────────────────────────────

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// The current list for a read-modify-write.
    ///
    /// Corrupt data reads as empty and is replaced by the next successful
    /// write. Any other read failure yields `None` and the caller must not
    /// write, or it would overwrite entries it could not see.
    fn load_for_write(&self) -> Option<Vec<UserAnimeEntry>> {
        match self.backend.load() {
            Ok(list) => Some(list),
            Err(KirokuError::Corrupt(e)) => {
                tracing::warn!(error = %e, "stored list is corrupt; it will be replaced");
                Some(Vec::new())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to read list; change skipped");
                None
            }
        }
    }

    /// Write the whole list and notify on success.
    fn persist(&self, list: &[UserAnimeEntry]) -> bool {
        match self.backend.save(list) {
            Ok(()) => {
                self.bus.emit();
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save list; change dropped");
                false
            }
        }
    }
}

fn mark_completed_if_caught_up(entry: &mut UserAnimeEntry, at: DateTime<Utc>) {
    if !entry.is_caught_up() || entry.status == WatchStatus::Completed {
        return;
    }
    entry.status = WatchStatus::Completed;
    if entry.finish_date.is_none() {
        entry.finish_date = Some(at.date_naive().to_string());
    }
}
