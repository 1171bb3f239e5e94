pub mod file_store;

use crate::models::Notification;
use std::collections::HashMap;
use std::sync::Mutex;

pub use file_store::FileStore;

/// Key-value persistence primitive supplied by the host. Plain read/write
/// with no compare-and-swap: concurrent read-modify-write cycles on the same
/// key are last-writer-wins.
pub trait KvStore {
    fn read(&self, key: &str) -> Option<String>;

    /// Writes `Some(value)` under `key`; `None` clears the key.
    fn write(&self, value: Option<&str>, key: &str);
}

/// User-notification channel supplied by the host.
pub trait Notifier {
    fn post(&self, title: &str, subtitle: &str, body: &str);
}

/// In-memory [`KvStore`] for tests and embedding without a host store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys, for leak assertions in tests.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .cloned()
    }

    fn write(&self, value: Option<&str>, key: &str) {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        match value {
            Some(v) => {
                entries.insert(key.to_string(), v.to_string());
            }
            None => {
                entries.remove(key);
            }
        }
    }
}

/// [`Notifier`] that records every posted notification, for assertions.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    posted: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posted(&self) -> Vec<Notification> {
        self.posted.lock().expect("notifier lock poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn post(&self, title: &str, subtitle: &str, body: &str) {
        self.posted
            .lock()
            .expect("notifier lock poisoned")
            .push(Notification {
                title: title.to_string(),
                subtitle: subtitle.to_string(),
                body: body.to_string(),
            });
    }
}

/// [`Notifier`] that prints to stdout, used by the CLI harness where no
/// host notification channel exists.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn post(&self, title: &str, subtitle: &str, body: &str) {
        if subtitle.is_empty() {
            println!("{title}");
        } else {
            println!("{title} — {subtitle}");
        }
        println!("{body}");
    }
}
