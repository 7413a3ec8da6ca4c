//! Page address synchronization.
//!
//! The whole query component of the address is the share payload. Updates
//! replace the current address; nothing is ever pushed onto a history.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::lock;

/// Where the current address lives.
pub trait AddressBar: fmt::Debug {
    fn current(&self) -> Result<Url>;

    /// Swap the current address in place.
    fn replace(&mut self, url: &Url) -> Result<()>;
}

/// In-process address, used by tests and embedders.
#[derive(Debug, Clone)]
pub struct MemoryAddressBar {
    url: Url,
}

impl MemoryAddressBar {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(raw)?))
    }
}

impl AddressBar for MemoryAddressBar {
    fn current(&self) -> Result<Url> {
        Ok(self.url.clone())
    }

    fn replace(&mut self, url: &Url) -> Result<()> {
        self.url = url.clone();
        Ok(())
    }
}

/// Address persisted as a one-line file, defaulting to a base URL.
#[derive(Debug, Clone)]
pub struct FileAddressBar {
    path: PathBuf,
    base: Url,
}

impl FileAddressBar {
    pub fn new(path: impl Into<PathBuf>, base: Url) -> Self {
        Self {
            path: path.into(),
            base,
        }
    }
}

impl AddressBar for FileAddressBar {
    fn current(&self) -> Result<Url> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(self.base.clone()),
            Ok(raw) => Ok(Url::parse(raw.trim())?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(self.base.clone()),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn replace(&mut self, url: &Url) -> Result<()> {
        lock::write_atomic(&self.path, format!("{url}\n").as_bytes())
    }
}

/// Outcome of a publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Published {
    pub url: String,
    /// Longer than the configured limit; many clients truncate such links.
    pub oversized: bool,
}

/// Mirrors the encoded task list into the address.
#[derive(Debug)]
pub struct UrlSynchronizer {
    bar: Box<dyn AddressBar>,
    max_url_len: usize,
}

impl UrlSynchronizer {
    pub fn new(bar: Box<dyn AddressBar>, max_url_len: usize) -> Self {
        Self { bar, max_url_len }
    }

    pub fn current(&self) -> Result<Url> {
        self.bar.current()
    }

    /// The share payload carried by the current address, if any.
    pub fn share_data(&self) -> Result<Option<String>> {
        let url = self.bar.current()?;
        Ok(url
            .query()
            .filter(|query| !query.trim().is_empty())
            .map(str::to_string))
    }

    /// Replace the query with `encoded`, or drop it when empty.
    pub fn publish(&mut self, encoded: &str) -> Result<Published> {
        let url = with_payload(&self.bar.current()?, encoded);
        self.bar.replace(&url)?;

        let url = url.to_string();
        let oversized = url.len() > self.max_url_len;
        if oversized {
            warn!(
                len = url.len(),
                max = self.max_url_len,
                "share link exceeds the configured length"
            );
        }
        debug!(len = url.len(), "address published");
        Ok(Published { url, oversized })
    }

    /// Replace the whole address, as when a link is opened.
    pub fn navigate(&mut self, url: &Url) -> Result<()> {
        debug!(%url, "navigating");
        self.bar.replace(url)
    }

    /// Reset to the bare page address.
    pub fn clear(&mut self) -> Result<Published> {
        self.publish("")
    }
}

/// `base` with its query replaced by `encoded` and no fragment.
pub fn with_payload(base: &Url, encoded: &str) -> Url {
    let mut url = base.clone();
    url.set_fragment(None);
    if encoded.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(encoded));
    }
    url
}
