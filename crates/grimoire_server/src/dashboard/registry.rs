//! Registry of re-renderable dashboard regions.
//!
//! # Responsibility
//! - Map chapter keys and grimoire names to refresh callbacks.
//! - Fan refresh events out to connected dashboards.
//!
//! # Invariants
//! - A region is known only after it has been rendered at least once.
//! - Callbacks run outside the registry locks.
//! - Writers never touch the UI directly; they only publish events.

use grimoire_core::{ChapterKey, Grimoire};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Callback that re-renders one region.
pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

/// Which region a connected dashboard must re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RefreshEvent {
    Dashboard,
    Grimoire { grimoire: String },
    Chapter { grimoire: String, chapter: String },
}

pub struct RefreshRegistry {
    events: broadcast::Sender<RefreshEvent>,
    chapters: RwLock<HashMap<ChapterKey, RefreshCallback>>,
    grimoires: RwLock<HashMap<String, RefreshCallback>>,
}

impl Default for RefreshRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            chapters: RwLock::new(HashMap::new()),
            grimoires: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    /// Registers a custom callback for one chapter region.
    pub fn register_chapter(&self, key: ChapterKey, callback: RefreshCallback) {
        self.chapters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, callback);
    }

    /// Registers a custom callback for one grimoire region.
    pub fn register_grimoire(&self, name: String, callback: RefreshCallback) {
        self.grimoires
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, callback);
    }

    /// Re-renders one chapter region.
    ///
    /// Returns `false` when the chapter has never been rendered, so the
    /// caller can fall back to a wider refresh.
    pub fn refresh_chapter(&self, key: &ChapterKey) -> bool {
        let callback = self
            .chapters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Re-renders one grimoire region; `false` when unknown.
    pub fn refresh_grimoire(&self, name: &str) -> bool {
        let callback = self
            .grimoires
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Re-renders the whole dashboard. Always succeeds.
    pub fn refresh_dashboard(&self) {
        self.publish(RefreshEvent::Dashboard);
    }

    /// Registers every grimoire and chapter of a freshly rendered dashboard.
    ///
    /// Regions absent from `grimoires` are dropped.
    pub fn track_dashboard(&self, grimoires: &[Grimoire]) {
        let mut grimoire_map = HashMap::new();
        let mut chapter_map = HashMap::new();
        for grimoire in grimoires {
            grimoire_map.insert(grimoire.name.clone(), self.grimoire_callback(&grimoire.name));
            for chapter in &grimoire.chapters {
                let key = chapter.key();
                let callback = self.chapter_callback(&key);
                chapter_map.insert(key, callback);
            }
        }
        *self.grimoires.write().unwrap_or_else(PoisonError::into_inner) = grimoire_map;
        *self.chapters.write().unwrap_or_else(PoisonError::into_inner) = chapter_map;
    }

    /// Registers one freshly rendered grimoire and its chapters.
    pub fn track_grimoire(&self, grimoire: &Grimoire) {
        self.register_grimoire(grimoire.name.clone(), self.grimoire_callback(&grimoire.name));
        let mut chapters = self.chapters.write().unwrap_or_else(PoisonError::into_inner);
        chapters.retain(|key, _| key.grimoire != grimoire.name);
        for chapter in &grimoire.chapters {
            let key = chapter.key();
            let callback = self.chapter_callback(&key);
            chapters.insert(key, callback);
        }
    }

    /// Registers one freshly rendered chapter.
    pub fn track_chapter(&self, key: &ChapterKey) {
        self.register_chapter(key.clone(), self.chapter_callback(key));
    }

    pub fn forget_chapter(&self, key: &ChapterKey) {
        self.chapters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn forget_grimoire(&self, name: &str) {
        self.grimoires
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        self.chapters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| key.grimoire != name);
    }

    fn chapter_callback(&self, key: &ChapterKey) -> RefreshCallback {
        let events = self.events.clone();
        let event = RefreshEvent::Chapter {
            grimoire: key.grimoire.clone(),
            chapter: key.chapter.clone(),
        };
        Arc::new(move || send_event(&events, event.clone()))
    }

    fn grimoire_callback(&self, name: &str) -> RefreshCallback {
        let events = self.events.clone();
        let event = RefreshEvent::Grimoire {
            grimoire: name.to_string(),
        };
        Arc::new(move || send_event(&events, event.clone()))
    }

    fn publish(&self, event: RefreshEvent) {
        send_event(&self.events, event);
    }
}

fn send_event(events: &broadcast::Sender<RefreshEvent>, event: RefreshEvent) {
    let kind = match &event {
        RefreshEvent::Dashboard => "dashboard",
        RefreshEvent::Grimoire { .. } => "grimoire",
        RefreshEvent::Chapter { .. } => "chapter",
    };
    // No subscribers means no open dashboard; nothing to do.
    let receivers = events.send(event).unwrap_or(0);
    debug!("event=refresh module=dashboard status=ok kind={kind} receivers={receivers}");
}
