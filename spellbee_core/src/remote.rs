//! Missed-word store backed by a remote JSON document
//!
//! The document lives in a hosted JSON bin: read with GET, replaced with PUT.
//! There is no versioning or conflict detection; the last write wins.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::StoreError;
use crate::missed::{clear_word, record_miss, MissedWord, MissedWordStore, MissedWordsDocument};

pub const DEFAULT_STORE_URL: &str = "https://api.jsonbin.io/v3";

/// Connection settings for [`RemoteStore`]
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub base_url: String,
    pub bin_id: String,
    pub token: String,
    pub timeout: Duration,
    pub disable_versioning: bool,
    pub cache: bool,
}

/// The service may answer with the bare document or wrap it in `record`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RemoteBody {
    Wrapped { record: MissedWordsDocument },
    Bare(MissedWordsDocument),
}

impl RemoteBody {
    fn into_document(self) -> MissedWordsDocument {
        match self {
            RemoteBody::Wrapped { record } => record,
            RemoteBody::Bare(doc) => doc,
        }
    }
}

pub fn parse_document(body: &str) -> Result<MissedWordsDocument, StoreError> {
    Ok(serde_json::from_str::<RemoteBody>(body)?.into_document())
}

pub struct RemoteStore {
    client: Client,
    settings: RemoteSettings,
    // Refreshed by this process's own writes only; other writers go unseen.
    cache: Mutex<Option<Vec<MissedWord>>>,
    // Serializes read-modify-write within this process.
    write_lock: Mutex<()>,
}

impl RemoteStore {
    pub fn new(settings: RemoteSettings) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            settings,
            cache: Mutex::new(None),
            write_lock: Mutex::new(()),
        })
    }

    fn read_url(&self) -> String {
        format!(
            "{}/b/{}/latest",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.bin_id
        )
    }

    fn write_url(&self) -> String {
        format!(
            "{}/b/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.bin_id
        )
    }

    fn fetch(&self) -> Result<Vec<MissedWord>, StoreError> {
        let response = self
            .client
            .get(self.read_url())
            .bearer_auth(&self.settings.token)
            .header("X-Bin-Meta", "false")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }

        let body = response.text()?;
        Ok(parse_document(&body)?.missed_words)
    }

    fn push(&self, records: &[MissedWord]) -> Result<(), StoreError> {
        let document = MissedWordsDocument {
            missed_words: records.to_vec(),
        };

        let mut request = self
            .client
            .put(self.write_url())
            .bearer_auth(&self.settings.token)
            .json(&document);
        if self.settings.disable_versioning {
            request = request.header("X-Bin-Versioning", "false");
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(())
    }

    fn cached(&self) -> Option<Vec<MissedWord>> {
        if !self.settings.cache {
            return None;
        }
        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn remember(&self, records: &[MissedWord]) {
        if self.settings.cache {
            *self.cache.lock().unwrap_or_else(|p| p.into_inner()) = Some(records.to_vec());
        }
    }

    fn mutate(&self, what: &str, word: &str, apply: impl FnOnce(&mut Vec<MissedWord>) -> bool) {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());

        // A failed read must not be mistaken for an empty document.
        let current = match self.cached() {
            Some(records) => Ok(records),
            None => self.fetch(),
        };
        let mut records = match current {
            Ok(records) => records,
            Err(e) => {
                log::warn!("missed-word store: read failed, skipping {what} '{word}': {e}");
                return;
            }
        };
        if !apply(&mut records) {
            return;
        }

        match self.push(&records) {
            Ok(()) => {
                log::debug!("missed-word store: {what} '{word}'");
                self.remember(&records);
            }
            Err(e) => log::warn!("missed-word store: failed to {what} '{word}': {e}"),
        }
    }
}

impl MissedWordStore for RemoteStore {
    fn load(&self) -> Vec<MissedWord> {
        if let Some(records) = self.cached() {
            return records;
        }

        match self.fetch() {
            Ok(records) => {
                self.remember(&records);
                records
            }
            Err(e) => {
                log::warn!("missed-word store: read failed, using empty list: {e}");
                Vec::new()
            }
        }
    }

    fn add(&self, word: &str) {
        self.mutate("add", word, |records| {
            record_miss(records, word);
            true
        });
    }

    fn remove(&self, word: &str) {
        self.mutate("remove", word, |records| clear_word(records, word));
    }
}
