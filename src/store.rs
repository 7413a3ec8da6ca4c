//! In-memory task list.
//!
//! The store is the source of truth for listing. It knows nothing about
//! persistence or sharing; the session layers those on top.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::task::{sort_tasks, IdGenerator, RandomIds, SharedClock, SystemClock, Task};

/// Attempts before giving up on finding an unused id.
const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Debug)]
pub struct TaskStore {
    tasks: Vec<Task>,
    ids: Box<dyn IdGenerator>,
    clock: SharedClock,
    last_date: Option<i64>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_sources(Box::new(RandomIds), Arc::new(SystemClock))
    }

    pub fn with_sources(ids: Box<dyn IdGenerator>, clock: SharedClock) -> Self {
        Self {
            tasks: Vec::new(),
            ids,
            clock,
            last_date: None,
        }
    }

    /// Append a new unchecked task. Blank text is a no-op.
    pub fn add(&mut self, text: &str) -> Option<Task> {
        if text.trim().is_empty() {
            return None;
        }

        let id = self.fresh_id()?;
        let date = self.next_date();
        let task = Task::new(id, text, date);
        debug!(id = %task.id, date = task.date, "task added");
        self.tasks.push(task.clone());
        Some(task)
    }

    pub fn toggle(&mut self, id: &str) -> Result<Task> {
        let task = self.find_mut(id)?;
        task.is_checked = !task.is_checked;
        Ok(task.clone())
    }

    pub fn set_checked(&mut self, id: &str, checked: bool) -> Result<Task> {
        let task = self.find_mut(id)?;
        task.is_checked = checked;
        Ok(task.clone())
    }

    /// Remove a task. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(index))
    }

    /// Tasks oldest first.
    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Replace the whole list, as after a load or import.
    ///
    /// Later duplicates of an id are dropped so the store never holds two
    /// records with the same id.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        let mut unique: Vec<Task> = Vec::with_capacity(tasks.len());
        for task in tasks {
            if unique.iter().any(|kept| kept.id == task.id) {
                continue;
            }
            unique.push(task);
        }
        sort_tasks(&mut unique);
        self.last_date = unique.iter().map(|task| task.date).max();
        self.tasks = unique;
    }

    /// Resolve a full id or a unique prefix of one.
    pub fn resolve_id(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }
        if self.get(query).is_some() {
            return Ok(query.to_string());
        }

        let mut matches = self.tasks.iter().filter(|task| task.id.starts_with(query));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id.clone()),
            (Some(_), Some(_)) => Err(Error::AmbiguousTaskId(query.to_string())),
            (None, _) => Err(Error::TaskNotFound(query.to_string())),
        }
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    fn fresh_id(&mut self) -> Option<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.generate();
            if !id.is_empty() && self.get(&id).is_none() {
                return Some(id);
            }
            debug!(%id, "generated id already in use, retrying");
        }
        tracing::error!("could not generate an unused task id");
        None
    }

    // Strictly increasing so creation order survives a reload.
    fn next_date(&mut self) -> i64 {
        let now = self.clock.now_millis();
        let date = match self.last_date {
            Some(last) if now <= last => last.saturating_add(1),
            _ => now,
        };
        self.last_date = Some(date);
        date
    }
}
