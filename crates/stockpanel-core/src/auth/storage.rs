//! Process-wide key/value storage shared by every tab.
//!
//! A `SharedStorage` plays the part of the browser's local storage area: all
//! tabs read and write the same map, and a mutation made through one tab's
//! `StorageHandle` is announced to every *other* tab as a `StorageEvent`.
//! Writes that do not change the stored value are silent.
//!
//! When opened from a file, the map is rewritten as pretty JSON after every
//! mutation so a restarted client picks up the same session. Several
//! processes may share one file: changes another process made are merged in
//! before every write and by `sync_from_disk` (polled by `watch`), and are
//! announced to every tab of this process.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Buffer size for storage-change notifications.
/// Subscribers that fall further behind skip the missed events.
const EVENT_BUFFER_SIZE: usize = 64;

/// Origin of changes made by another process. Tab ids start at 1.
const EXTERNAL_ORIGIN: u64 = 0;

/// A change to one storage key, as observed from another tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
}

#[derive(Debug, Clone)]
struct TaggedEvent {
    origin: u64,
    event: StorageEvent,
}

#[derive(Default)]
struct Items {
    current: HashMap<String, String>,
    /// File contents as last read or written by this process.
    on_disk: HashMap<String, String>,
}

struct StorageArea {
    items: Mutex<Items>,
    path: Option<PathBuf>,
    events: broadcast::Sender<TaggedEvent>,
    next_tab: AtomicU64,
}

/// The storage area itself. Clone is cheap and shares the same map.
#[derive(Clone)]
pub struct SharedStorage {
    area: Arc<StorageArea>,
}

fn read_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read storage file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse storage file {}", path.display()))
}

/// Write through a per-process temp file and rename, so a concurrent reader
/// never sees a half-written map.
fn write_file(path: &Path, items: &HashMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", std::process::id()));
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, serde_json::to_string_pretty(items)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl SharedStorage {
    /// Storage that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::with_items(HashMap::new(), None)
    }

    /// Storage persisted to a JSON file, loading existing contents if present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items = read_file(&path)?;
        debug!(path = %path.display(), keys = items.len(), "Storage opened");
        Ok(Self::with_items(items, Some(path)))
    }

    fn with_items(items: HashMap<String, String>, path: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        let on_disk = if path.is_some() { items.clone() } else { HashMap::new() };
        Self {
            area: Arc::new(StorageArea {
                items: Mutex::new(Items {
                    current: items,
                    on_disk,
                }),
                path,
                events,
                next_tab: AtomicU64::new(1),
            }),
        }
    }

    /// Open a new tab onto this storage area.
    pub fn open_tab(&self) -> StorageHandle {
        StorageHandle {
            storage: self.clone(),
            tab_id: self.area.next_tab.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.area.path.as_deref()
    }

    /// Pick up changes other processes made to the storage file and announce
    /// them to every tab. Returns the number of keys that changed.
    pub fn sync_from_disk(&self) -> usize {
        let changes = {
            let mut items = self.items();
            self.merge_from_disk(&mut items)
        };
        let count = changes.len();
        for change in changes {
            self.notify(EXTERNAL_ORIGIN, change);
        }
        count
    }

    /// Poll the storage file for changes made by other processes until the
    /// storage area is dropped. `None` for in-memory storage or outside a
    /// runtime.
    pub fn watch(&self, interval: Duration) -> Option<JoinHandle<()>> {
        self.area.path.as_ref()?;
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let area: Weak<StorageArea> = Arc::downgrade(&self.area);
        Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(area) = area.upgrade() else {
                    break;
                };
                let storage = SharedStorage { area };
                let changed = tokio::task::spawn_blocking(move || storage.sync_from_disk())
                    .await
                    .unwrap_or(0);
                if changed > 0 {
                    debug!(changed, "Storage file changed by another process");
                }
            }
        }))
    }

    fn items(&self) -> MutexGuard<'_, Items> {
        // A panic while holding the lock cannot leave the map half-written,
        // so a poisoned lock is still safe to use.
        self.area
            .items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply keys that changed on disk since this process last saw the file.
    /// Every change is in the map before any event is sent.
    fn merge_from_disk(&self, items: &mut Items) -> Vec<StorageEvent> {
        let Some(ref path) = self.area.path else {
            return Vec::new();
        };
        let disk = match read_file(path) {
            Ok(disk) => disk,
            Err(e) => {
                debug!(error = format!("{:#}", e), "Storage file not readable, skipping sync");
                return Vec::new();
            }
        };

        let keys: HashSet<&String> = disk.keys().chain(items.on_disk.keys()).collect();
        let mut changes = Vec::new();
        for key in keys {
            let now = disk.get(key);
            if now == items.on_disk.get(key) || now == items.current.get(key) {
                continue;
            }
            match now {
                Some(value) => {
                    items.current.insert(key.clone(), value.clone());
                }
                None => {
                    items.current.remove(key);
                }
            }
            changes.push(StorageEvent {
                key: key.clone(),
                new_value: now.cloned(),
            });
        }
        items.on_disk = disk;
        changes
    }

    fn persist(&self, items: &mut Items) {
        let Some(ref path) = self.area.path else {
            return;
        };
        match write_file(path, &items.current) {
            Ok(()) => items.on_disk = items.current.clone(),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to persist storage"),
        }
    }

    /// Merge foreign changes, apply `change` to the map, and persist. Returns
    /// the foreign changes and whether `change` altered anything.
    fn mutate(
        &self,
        change: impl FnOnce(&mut HashMap<String, String>) -> bool,
    ) -> (Vec<StorageEvent>, bool) {
        let mut items = self.items();
        let external = self.merge_from_disk(&mut items);
        let changed = change(&mut items.current);
        if changed {
            self.persist(&mut items);
        }
        (external, changed)
    }

    fn notify(&self, origin: u64, event: StorageEvent) {
        // No subscribers is not an error
        let _ = self.area.events.send(TaggedEvent { origin, event });
    }
}

/// One tab's view of the shared storage area.
#[derive(Clone)]
pub struct StorageHandle {
    storage: SharedStorage,
    tab_id: u64,
}

impl StorageHandle {
    pub fn tab_id(&self) -> u64 {
        self.tab_id
    }

    /// Read from this process's view. Changes from other processes show up
    /// after the next sync.
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.storage.items().current.get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let (external, changed) = self.storage.mutate(|items| {
            if items.get(key) == Some(&value) {
                return false;
            }
            items.insert(key.to_string(), value.clone());
            true
        });
        self.announce(external, changed.then(|| StorageEvent {
            key: key.to_string(),
            new_value: Some(value),
        }));
    }

    pub fn remove_item(&self, key: &str) {
        let (external, changed) = self.storage.mutate(|items| items.remove(key).is_some());
        self.announce(external, changed.then(|| StorageEvent {
            key: key.to_string(),
            new_value: None,
        }));
    }

    fn announce(&self, external: Vec<StorageEvent>, own: Option<StorageEvent>) {
        for event in external {
            self.storage.notify(EXTERNAL_ORIGIN, event);
        }
        if let Some(event) = own {
            self.storage.notify(self.tab_id, event);
        }
    }

    /// Subscribe to changes made by other tabs.
    pub fn subscribe(&self) -> StorageEvents {
        StorageEvents {
            rx: self.storage.area.events.subscribe(),
            tab_id: self.tab_id,
        }
    }
}

/// Stream of storage changes made by other tabs.
pub struct StorageEvents {
    rx: broadcast::Receiver<TaggedEvent>,
    tab_id: u64,
}

impl StorageEvents {
    /// Wait for the next foreign change. Returns `None` once the storage area
    /// has been dropped.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(tagged) if tagged.origin == self.tab_id => continue,
                Ok(tagged) => return Some(tagged.event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Storage event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of `recv` for polling loops.
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(tagged) if tagged.origin == self.tab_id => continue,
                Ok(tagged) => return Some(tagged.event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Storage event subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}
