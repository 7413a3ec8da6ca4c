//! Task and settings records.
//!
//! Field names on the wire (`id`, `text`, `isChecked`, `date`) are shared by
//! the key-value store and share payloads.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Largest `date` magnitude a browser `Date` accepts, in milliseconds.
pub const MAX_DATE_MILLIS: i64 = 8_640_000_000_000_000;

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub is_checked: bool,
    /// Creation time in milliseconds since the Unix epoch.
    pub date: i64,
}

impl Task {
    pub fn new(id: impl Into<String>, text: impl Into<String>, date: i64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_checked: false,
            date,
        }
    }

    pub fn has_valid_date(&self) -> bool {
        (-MAX_DATE_MILLIS..=MAX_DATE_MILLIS).contains(&self.date)
    }

    /// Creation time as a UTC timestamp, if `date` is representable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.date).single()
    }
}

/// Sort tasks oldest first. Stable, so ties keep their current order.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by_key(|task| task.date);
}

/// Color theme persisted alongside the task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(Error::InvalidArgument(format!(
                "unknown theme '{other}' (expected light|dark)"
            ))),
        }
    }
}

/// Singleton settings record. Never part of a share payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
}

/// Source of task ids.
pub trait IdGenerator: fmt::Debug + Send {
    fn generate(&mut self) -> String;
}

/// 128-bit random ids (UUID v4, simple hex form).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn generate(&mut self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Source of creation timestamps, in epoch milliseconds.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now_millis(&self) -> i64;
}

pub type SharedClock = Arc<dyn Clock>;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that returns a fixed instant, advanced by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}
