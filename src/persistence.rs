//! Task persistence over a key-value store.
//!
//! Tasks live one per key under the `task/` namespace; settings live under
//! the bare `settings` key. The namespaces cannot overlap, whatever a task
//! id looks like.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::kv::KeyValueStore;
use crate::task::{Settings, Task};

pub const SETTINGS_KEY: &str = "settings";
pub const TASK_NAMESPACE: &str = "task";

pub fn task_key(id: &str) -> String {
    format!("{TASK_NAMESPACE}/{id}")
}

fn task_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(TASK_NAMESPACE)?.strip_prefix('/')
}

/// A stored entry that could not be read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub key: String,
    pub reason: String,
}

impl From<SkippedRecord> for Error {
    fn from(record: SkippedRecord) -> Self {
        Error::CorruptStoredRecord {
            key: record.key,
            reason: record.reason,
        }
    }
}

/// Result of reading every task back from the store.
#[derive(Debug, Clone, Default)]
pub struct LoadedTasks {
    /// Raw store order; sorting is the task store's job.
    pub tasks: Vec<Task>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug)]
pub struct Persistence {
    kv: Box<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }

    pub fn save_one(&mut self, task: &Task) -> Result<()> {
        let json = serde_json::to_string(task)?;
        self.kv.set(&task_key(&task.id), &json)
    }

    /// Write every task under its own key.
    pub fn save_all(&mut self, tasks: &[Task]) -> Result<()> {
        for task in tasks {
            self.save_one(task)?;
        }
        debug!(count = tasks.len(), "tasks written");
        Ok(())
    }

    /// Read every task record. Corrupt records are skipped, not fatal.
    pub fn load_all(&self) -> Result<LoadedTasks> {
        let mut loaded = LoadedTasks::default();

        for key in self.kv.keys()? {
            if key == SETTINGS_KEY {
                continue;
            }
            let Some(id) = task_id_from_key(&key) else {
                warn!(%key, "ignoring entry outside the task namespace");
                continue;
            };
            let Some(raw) = self.kv.get(&key)? else {
                continue;
            };

            match parse_task(id, &raw) {
                Ok(task) => loaded.tasks.push(task),
                Err(reason) => {
                    warn!(%key, %reason, "skipping corrupt task record");
                    loaded.skipped.push(SkippedRecord { key, reason });
                }
            }
        }

        Ok(loaded)
    }

    pub fn remove_one(&mut self, id: &str) -> Result<()> {
        self.kv.remove(&task_key(id))
    }

    /// Delete every task entry. Settings are untouched.
    pub fn clear_all_except_settings(&mut self) -> Result<usize> {
        let mut removed = 0;
        for key in self.kv.keys()? {
            if task_id_from_key(&key).is_some() {
                self.kv.remove(&key)?;
                removed += 1;
            }
        }
        debug!(removed, "task entries cleared");
        Ok(removed)
    }

    /// Swap the stored task set for `tasks`, keeping settings.
    pub fn replace_all(&mut self, tasks: &[Task]) -> Result<()> {
        let removed = self.clear_all_except_settings()?;
        self.save_all(tasks)?;
        info!(removed, imported = tasks.len(), "stored tasks replaced");
        Ok(())
    }

    /// Read settings, writing defaults back when none are stored.
    ///
    /// An unreadable record yields defaults and is reported, but left in
    /// place until the next settings write.
    pub fn load_settings(&mut self) -> Result<(Settings, Option<SkippedRecord>)> {
        let Some(raw) = self.kv.get(SETTINGS_KEY)? else {
            let settings = Settings::default();
            self.save_settings(&settings)?;
            return Ok((settings, None));
        };

        match serde_json::from_str::<Settings>(&raw) {
            Ok(settings) => Ok((settings, None)),
            Err(err) => {
                warn!(error = %err, "settings record unreadable, using defaults");
                let skipped = SkippedRecord {
                    key: SETTINGS_KEY.to_string(),
                    reason: err.to_string(),
                };
                Ok((Settings::default(), Some(skipped)))
            }
        }
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.kv.set(SETTINGS_KEY, &json)
    }
}

fn parse_task(id: &str, raw: &str) -> std::result::Result<Task, String> {
    let task: Task = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    if task.id != id {
        return Err(format!("record id '{}' does not match its key", task.id));
    }
    if !task.has_valid_date() {
        return Err(format!("date {} is out of range", task.date));
    }
    Ok(task)
}
