//! Application session.
//!
//! A `Session` owns the task store, its persistence and the address it
//! publishes to. Opening a session runs the load path:
//!
//! ```text
//! Start ──share data?──▶ ValidatingImport ──ok──▶ Importing ──▶ Ready
//!   │                          └──malformed──▶ ClearingUrl ──▶ Ready (empty)
//!   └──no share data──▶ LoadingLocal ──▶ Ready
//! ```
//!
//! Every mutation runs store -> persistence -> codec -> address, in that
//! order, before returning to the caller. A local load republishes too, so
//! the address always mirrors the list; only a cleared malformed link is
//! left bare.

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::address::{Published, UrlSynchronizer};
use crate::error::{Error, Result};
use crate::persistence::{Persistence, SkippedRecord};
use crate::share;
use crate::store::TaskStore;
use crate::task::{Settings, Task, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Start,
    ValidatingImport,
    Importing,
    LoadingLocal,
    ClearingUrl,
    Ready,
    Closed,
}

/// What happened while loading.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// States visited, `Start` first and `Ready` last.
    pub path: Vec<LoadState>,
    pub tasks: usize,
    /// Number of tasks taken from share data, when an import happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<usize>,
    /// Why share data in the address was discarded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed: Option<String>,
    /// Local tasks dropped because the link was malformed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discarded: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRecord>,
    pub address: String,
}

impl LoadReport {
    fn start() -> Self {
        Self {
            path: vec![LoadState::Start],
            tasks: 0,
            imported: None,
            malformed: None,
            discarded: None,
            skipped: Vec::new(),
            address: String::new(),
        }
    }
}

/// Result of a mutation together with the address it published.
#[derive(Debug, Clone, Serialize)]
pub struct Change<T> {
    pub value: T,
    pub published: Published,
}

#[derive(Debug)]
pub struct Session {
    store: TaskStore,
    persistence: Persistence,
    address: UrlSynchronizer,
    settings: Settings,
    state: LoadState,
    report: LoadReport,
}

impl Session {
    /// Open a session with a default task store.
    pub fn open(persistence: Persistence, address: UrlSynchronizer) -> Result<Self> {
        Self::open_with(TaskStore::new(), persistence, address)
    }

    /// Open a session around a preconfigured task store.
    pub fn open_with(
        store: TaskStore,
        persistence: Persistence,
        address: UrlSynchronizer,
    ) -> Result<Self> {
        let mut session = Self {
            store,
            persistence,
            address,
            settings: Settings::default(),
            state: LoadState::Start,
            report: LoadReport::start(),
        };
        session.load()?;
        Ok(session)
    }

    /// Point the address at `url` and load again, as a page visit would.
    pub fn navigate(&mut self, url: &Url) -> Result<&LoadReport> {
        self.ensure_open()?;
        self.address.navigate(url)?;
        self.load()?;
        Ok(&self.report)
    }

    /// Import a bare share payload onto the current page address.
    pub fn import(&mut self, payload: &str) -> Result<&LoadReport> {
        let url = crate::address::with_payload(&self.address.current()?, payload.trim());
        self.navigate(&url)
    }

    /// End the session. Mutations afterwards fail with `SessionClosed`.
    pub fn close(&mut self) {
        if self.state != LoadState::Closed {
            debug!(tasks = self.store.len(), "session closed");
        }
        self.state = LoadState::Closed;
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.list()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Resolve a full id or unique prefix to a task id.
    pub fn resolve_id(&self, query: &str) -> Result<String> {
        self.store.resolve_id(query)
    }

    /// Add a task. Blank text changes nothing and returns `None`.
    pub fn add(&mut self, text: &str) -> Result<Option<Change<Task>>> {
        self.ensure_ready()?;
        let Some(task) = self.store.add(text) else {
            return Ok(None);
        };
        if let Err(err) = self.persistence.save_one(&task) {
            self.store.remove(&task.id);
            return Err(err);
        }
        let published = self.republish()?;
        info!(id = %task.id, "task added");
        Ok(Some(Change {
            value: task,
            published,
        }))
    }

    pub fn toggle(&mut self, id: &str) -> Result<Change<Task>> {
        self.ensure_ready()?;
        let was_checked = self.checked_state(id)?;
        let task = self.store.toggle(id)?;
        self.write_back(task, was_checked)
    }

    pub fn set_checked(&mut self, id: &str, checked: bool) -> Result<Change<Task>> {
        self.ensure_ready()?;
        let was_checked = self.checked_state(id)?;
        let task = self.store.set_checked(id, checked)?;
        self.write_back(task, was_checked)
    }

    /// Remove a task. Unknown ids leave everything as it was.
    pub fn remove(&mut self, id: &str) -> Result<Change<Option<Task>>> {
        self.ensure_ready()?;
        if self.store.get(id).is_some() {
            self.persistence.remove_one(id)?;
        }
        let removed = self.store.remove(id);
        if let Some(task) = &removed {
            info!(id = %task.id, "task removed");
        }
        let published = self.republish()?;
        Ok(Change {
            value: removed,
            published,
        })
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<Settings> {
        self.ensure_ready()?;
        let settings = Settings { theme };
        self.persistence.save_settings(&settings)?;
        self.settings = settings;
        Ok(settings)
    }

    pub fn toggle_theme(&mut self) -> Result<Settings> {
        self.set_theme(self.settings.theme.toggled())
    }

    /// Encoded form of the current task list.
    pub fn share_payload(&self) -> Result<String> {
        share::encode(self.store.list())
    }

    /// The current page address.
    pub fn share_url(&self) -> Result<Url> {
        self.address.current()
    }

    fn checked_state(&self, id: &str) -> Result<bool> {
        self.store
            .get(id)
            .map(|task| task.is_checked)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    // A failed write rolls the store back so memory never runs ahead of disk.
    fn write_back(&mut self, task: Task, was_checked: bool) -> Result<Change<Task>> {
        if let Err(err) = self.persistence.save_one(&task) {
            self.store.set_checked(&task.id, was_checked)?;
            return Err(err);
        }
        let published = self.republish()?;
        Ok(Change {
            value: task,
            published,
        })
    }

    fn republish(&mut self) -> Result<Published> {
        let payload = share::encode(self.store.list())?;
        self.address.publish(&payload)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == LoadState::Closed {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            LoadState::Ready => Ok(()),
            _ => Err(Error::SessionClosed),
        }
    }

    fn enter(&mut self, state: LoadState) {
        debug!(?state, "load state");
        self.state = state;
        self.report.path.push(state);
    }

    fn load(&mut self) -> Result<()> {
        self.state = LoadState::Start;
        self.report = LoadReport::start();

        let (settings, skipped) = self.persistence.load_settings()?;
        self.settings = settings;
        self.report.skipped.extend(skipped);

        match self.address.share_data()? {
            Some(payload) => {
                self.enter(LoadState::ValidatingImport);
                match share::decode(&payload) {
                    Ok(tasks) => {
                        self.enter(LoadState::Importing);
                        self.persistence.replace_all(&tasks)?;
                        self.store.replace_all(tasks);
                        self.report.imported = Some(self.store.len());
                        self.republish()?;
                    }
                    Err(err) => {
                        warn!(error = %err, "discarding share data from address");
                        self.enter(LoadState::ClearingUrl);
                        self.report.malformed = Some(err.to_string());
                        self.address.clear()?;
                        // Opening a share link always starts from an empty list.
                        let discarded = self.persistence.clear_all_except_settings()?;
                        self.store.replace_all(Vec::new());
                        self.report.discarded = Some(discarded);
                    }
                }
            }
            None => {
                self.enter(LoadState::LoadingLocal);
                self.load_local()?;
                self.republish()?;
            }
        }

        self.enter(LoadState::Ready);
        self.report.tasks = self.store.len();
        self.report.address = self.address.current()?.to_string();
        info!(
            tasks = self.report.tasks,
            imported = ?self.report.imported,
            "session ready"
        );
        Ok(())
    }

    fn load_local(&mut self) -> Result<()> {
        let loaded = self.persistence.load_all()?;
        self.report.skipped.extend(loaded.skipped);
        self.store.replace_all(loaded.tasks);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::MemoryAddressBar;
    use crate::kv::{KeyValueStore, MemoryStore};
    use crate::task::{ManualClock, RandomIds};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const BASE: &str = "https://todo.example/";

    fn open(kv: MemoryStore, address: &str) -> Session {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = TaskStore::with_sources(Box::new(RandomIds), clock);
        Session::open_with(
            store,
            Persistence::new(Box::new(kv)),
            UrlSynchronizer::new(Box::new(MemoryAddressBar::parse(address).unwrap()), 2048),
        )
        .unwrap()
    }

    #[test]
    fn fresh_open_loads_local() {
        let session = open(MemoryStore::new(), BASE);
        assert_eq!(session.state(), LoadState::Ready);
        assert_eq!(
            session.load_report().path,
            vec![LoadState::Start, LoadState::LoadingLocal, LoadState::Ready]
        );
        assert!(session.tasks().is_empty());
        assert_eq!(session.load_report().address, BASE);
    }

    #[test]
    fn local_load_republishes_stored_tasks() {
        let mut kv = MemoryStore::new();
        let stored = Task::new("s1", "Stored", 5);
        kv.set("task/s1", &serde_json::to_string(&stored).unwrap())
            .unwrap();

        let session = open(kv, BASE);
        let payload = share::encode(&[stored]).unwrap();
        assert_eq!(session.load_report().address, format!("{BASE}?{payload}"));
    }

    #[test]
    fn add_writes_through_and_publishes() {
        let mut session = open(MemoryStore::new(), BASE);
        let change = session.add("Buy milk").unwrap().expect("added");

        let payload = session.share_payload().unwrap();
        assert_eq!(change.published.url, format!("{BASE}?{payload}"));
        assert_eq!(session.share_url().unwrap().query(), Some(payload.as_str()));
        assert_eq!(share::decode(&payload).unwrap(), vec![change.value.clone()]);
    }

    #[test]
    fn blank_add_is_a_no_op() {
        let mut session = open(MemoryStore::new(), BASE);
        assert!(session.add("  ").unwrap().is_none());
        assert!(session.tasks().is_empty());
        assert_eq!(session.share_url().unwrap().as_str(), BASE);
    }

    #[test]
    fn toggle_unknown_id_is_not_found() {
        let mut session = open(MemoryStore::new(), BASE);
        assert!(matches!(
            session.toggle("nope"),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn removing_last_task_clears_query() {
        let mut session = open(MemoryStore::new(), BASE);
        let task = session.add("Only").unwrap().expect("added").value;
        let change = session.remove(&task.id).unwrap();
        assert_eq!(change.value.map(|t| t.id), Some(task.id));
        assert_eq!(change.published.url, BASE);
        assert_eq!(session.share_payload().unwrap(), "");
        assert_eq!(session.share_url().unwrap().query(), None);
    }

    #[test]
    fn theme_changes_do_not_touch_address() {
        let mut session = open(MemoryStore::new(), BASE);
        session.add("A").unwrap();
        let before = session.share_url().unwrap();
        assert_eq!(session.toggle_theme().unwrap().theme, Theme::Dark);
        assert_eq!(session.share_url().unwrap(), before);
        assert_eq!(session.set_theme(Theme::Light).unwrap().theme, Theme::Light);
    }

    #[test]
    fn malformed_link_discards_local_tasks() {
        let mut kv = MemoryStore::new();
        let local = Task::new("keep", "Kept", 5);
        kv.set("task/keep", &serde_json::to_string(&local).unwrap())
            .unwrap();
        kv.set("settings", r#"{"theme":"dark"}"#).unwrap();

        let mut session = open(kv, "https://todo.example/?not-valid-base64!!");
        let report = session.load_report();
        assert_eq!(
            report.path,
            vec![
                LoadState::Start,
                LoadState::ValidatingImport,
                LoadState::ClearingUrl,
                LoadState::Ready
            ]
        );
        assert!(report.malformed.is_some());
        assert_eq!(report.discarded, Some(1));
        assert!(session.tasks().is_empty());
        assert_eq!(session.settings().theme, Theme::Dark);
        assert_eq!(session.share_url().unwrap().as_str(), BASE);

        // The wipe reached the store, so a plain reload stays empty.
        session.navigate(&Url::parse(BASE).unwrap()).unwrap();
        assert!(session.tasks().is_empty());
    }

    #[test]
    fn import_replaces_local_tasks() {
        let mut kv = MemoryStore::new();
        let local = Task::new("local", "Local", 5);
        kv.set("task/local", &serde_json::to_string(&local).unwrap())
            .unwrap();
        kv.set("settings", r#"{"theme":"dark"}"#).unwrap();

        let shared = vec![Task::new("s2", "Second", 20), Task::new("s1", "First", 10)];
        let payload = share::encode(&shared).unwrap();
        let session = open(kv, &format!("{BASE}?{payload}"));

        assert_eq!(session.load_report().imported, Some(2));
        let ids: Vec<&str> = session.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert_eq!(session.settings().theme, Theme::Dark);
    }

    #[test]
    fn closed_session_rejects_mutations() {
        let mut session = open(MemoryStore::new(), BASE);
        session.close();
        assert_eq!(session.state(), LoadState::Closed);
        assert!(matches!(session.add("late"), Err(Error::SessionClosed)));
        assert!(matches!(session.remove("x"), Err(Error::SessionClosed)));
        assert!(matches!(session.toggle_theme(), Err(Error::SessionClosed)));
        let url = Url::parse(BASE).unwrap();
        assert!(matches!(session.navigate(&url), Err(Error::SessionClosed)));
    }

    #[derive(Debug)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: Arc<AtomicBool>,
    }

    impl FlakyStore {
        fn check(&self) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            self.check()?;
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            self.check()?;
            self.inner.remove(key)
        }

        fn keys(&self) -> Result<Vec<String>> {
            self.inner.keys()
        }
    }

    fn open_flaky() -> (Session, Arc<AtomicBool>) {
        let fail_writes = Arc::new(AtomicBool::new(false));
        let kv = FlakyStore {
            inner: MemoryStore::new(),
            fail_writes: Arc::clone(&fail_writes),
        };
        let clock = Arc::new(ManualClock::new(1_000));
        let session = Session::open_with(
            TaskStore::with_sources(Box::new(RandomIds), clock),
            Persistence::new(Box::new(kv)),
            UrlSynchronizer::new(Box::new(MemoryAddressBar::parse(BASE).unwrap()), 2048),
        )
        .unwrap();
        (session, fail_writes)
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let (mut session, fail_writes) = open_flaky();
        let task = session.add("Stored").unwrap().expect("added").value;
        let address = session.share_url().unwrap();

        fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(session.add("Lost"), Err(Error::Io(_))));
        assert!(matches!(session.toggle(&task.id), Err(Error::Io(_))));
        assert!(matches!(session.set_checked(&task.id, true), Err(Error::Io(_))));
        assert!(matches!(session.remove(&task.id), Err(Error::Io(_))));
        assert!(matches!(session.set_theme(Theme::Dark), Err(Error::Io(_))));

        assert_eq!(session.tasks(), &[task.clone()]);
        assert_eq!(session.settings().theme, Theme::Light);
        assert_eq!(session.share_url().unwrap(), address);

        fail_writes.store(false, Ordering::SeqCst);
        assert!(session.toggle(&task.id).unwrap().value.is_checked);
    }
}
