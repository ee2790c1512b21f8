//! Runtime configuration read from `SPELLBEE_*` environment variables

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::{AudioLibrary, HttpSpeechSynthesizer, Pronouncer, SpeechSynthesizer};
use crate::db::SqliteStore;
use crate::error::{ConfigError, StoreError};
use crate::missed::{MemoryStore, MissedWordStore};
use crate::remote::{RemoteSettings, RemoteStore, DEFAULT_STORE_URL};
use crate::selection::MAX_WORD_ID;
use crate::words::WordCatalog;

const DEFAULT_WORD_LISTS: &str =
    "2025.txt,2024.txt,2023.txt,2022.txt,2021.txt,2020.txt,2019.txt";
const DEFAULT_TTS_URL: &str = "https://translate.google.com/translate_tts";
/// One year.
const MAX_SESSION_TTL_MINUTES: u32 = 60 * 24 * 365;

/// Where missed words are kept
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Remote(RemoteSettings),
    Sqlite(PathBuf),
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub data_dir: PathBuf,
    pub word_lists: Vec<String>,
    pub max_word_id: usize,
    pub store: StoreBackend,
    pub tts_url: Option<String>,
    pub tts_lang: String,
    pub service_timeout: Duration,
    pub sensitive_words: PathBuf,
    pub session_ttl: chrono::Duration,
}

fn parse<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

fn parse_flag(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: v }),
        },
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset and blank values mean "use the default".
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = PathBuf::from(get("SPELLBEE_DATA_DIR").unwrap_or_else(|| "data".into()));
        let word_lists = get("SPELLBEE_WORD_LISTS")
            .unwrap_or_else(|| DEFAULT_WORD_LISTS.into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_word_id = parse("SPELLBEE_MAX_WORD_ID", get("SPELLBEE_MAX_WORD_ID"), MAX_WORD_ID)?;
        let timeout_secs: u64 = parse(
            "SPELLBEE_STORE_TIMEOUT_SECS",
            get("SPELLBEE_STORE_TIMEOUT_SECS"),
            5,
        )?;
        let service_timeout = Duration::from_secs(timeout_secs);

        let store = match get("SPELLBEE_STORE").as_deref().unwrap_or("remote") {
            "remote" => StoreBackend::Remote(RemoteSettings {
                base_url: get("SPELLBEE_STORE_URL").unwrap_or_else(|| DEFAULT_STORE_URL.into()),
                bin_id: get("SPELLBEE_BIN_ID").ok_or(ConfigError::Missing("SPELLBEE_BIN_ID"))?,
                token: get("SPELLBEE_BIN_TOKEN").ok_or(ConfigError::Missing("SPELLBEE_BIN_TOKEN"))?,
                timeout: service_timeout,
                disable_versioning: parse_flag(
                    "SPELLBEE_DISABLE_VERSIONING",
                    get("SPELLBEE_DISABLE_VERSIONING"),
                )?,
                cache: parse_flag("SPELLBEE_STORE_CACHE", get("SPELLBEE_STORE_CACHE"))?,
            }),
            "sqlite" => StoreBackend::Sqlite(PathBuf::from(
                get("SPELLBEE_SQLITE_PATH").unwrap_or_else(|| "spellbee.db".into()),
            )),
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "SPELLBEE_STORE",
                    value: other.to_string(),
                })
            }
        };

        // Set but blank disables synthesis; unset uses the default service.
        let tts_url = match lookup("SPELLBEE_TTS_URL") {
            None => Some(DEFAULT_TTS_URL.to_string()),
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
        };

        let sensitive_words = get("SPELLBEE_SENSITIVE_WORDS")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("sensitive_words.txt"));

        let ttl_minutes: u32 = parse(
            "SPELLBEE_SESSION_TTL_MINUTES",
            get("SPELLBEE_SESSION_TTL_MINUTES"),
            120,
        )?;
        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&ttl_minutes) {
            return Err(ConfigError::Invalid {
                key: "SPELLBEE_SESSION_TTL_MINUTES",
                value: ttl_minutes.to_string(),
            });
        }

        Ok(Self {
            bind: get("SPELLBEE_BIND").unwrap_or_else(|| "0.0.0.0:8080".into()),
            data_dir,
            word_lists,
            max_word_id,
            store,
            tts_url,
            tts_lang: get("SPELLBEE_TTS_LANG").unwrap_or_else(|| "en".into()),
            service_timeout,
            sensitive_words,
            session_ttl: chrono::Duration::minutes(i64::from(ttl_minutes)),
        })
    }

    pub fn catalog(&self) -> WordCatalog {
        WordCatalog::new(self.data_dir.join("lists"), self.word_lists.clone())
    }

    pub fn open_store(&self) -> Result<Arc<dyn MissedWordStore>, StoreError> {
        Ok(match &self.store {
            StoreBackend::Remote(settings) => Arc::new(RemoteStore::new(settings.clone())?),
            StoreBackend::Sqlite(path) => Arc::new(SqliteStore::open(path)?),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        })
    }

    pub fn pronouncer(&self) -> Result<Pronouncer, StoreError> {
        let synthesizer: Option<Arc<dyn SpeechSynthesizer>> = match &self.tts_url {
            Some(url) => Some(Arc::new(HttpSpeechSynthesizer::new(
                url.clone(),
                self.tts_lang.clone(),
                self.service_timeout,
            )?)),
            None => None,
        };

        let library = AudioLibrary::new(self.data_dir.join("audio"));
        Ok(Pronouncer::new(library, synthesizer)
            .with_sensitive_words(Pronouncer::load_sensitive_words(&self.sensitive_words)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn remote_store_requires_credentials() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SPELLBEE_BIN_ID")));

        let err = Config::from_lookup(lookup(&[("SPELLBEE_BIN_ID", "abc")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SPELLBEE_BIN_TOKEN")));
    }

    #[test]
    fn defaults_with_remote_credentials() {
        let config = Config::from_lookup(lookup(&[
            ("SPELLBEE_BIN_ID", "abc"),
            ("SPELLBEE_BIN_TOKEN", "secret"),
            ("SPELLBEE_DISABLE_VERSIONING", "true"),
        ]))
        .unwrap();

        assert_eq!(config.max_word_id, 1500);
        assert_eq!(config.word_lists.len(), 7);
        assert_eq!(config.word_lists[0], "2025.txt");
        assert_eq!(config.service_timeout, Duration::from_secs(5));
        assert_eq!(config.tts_url.as_deref(), Some(DEFAULT_TTS_URL));
        match config.store {
            StoreBackend::Remote(settings) => {
                assert_eq!(settings.base_url, DEFAULT_STORE_URL);
                assert!(settings.disable_versioning);
                assert!(!settings.cache);
            }
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn local_backends_need_no_credentials() {
        let config = Config::from_lookup(lookup(&[
            ("SPELLBEE_STORE", "sqlite"),
            ("SPELLBEE_SQLITE_PATH", "/tmp/x.db"),
            ("SPELLBEE_TTS_URL", ""),
            ("SPELLBEE_WORD_LISTS", "a.txt, b.txt,"),
        ]))
        .unwrap();

        assert!(matches!(config.store, StoreBackend::Sqlite(ref p) if p == &PathBuf::from("/tmp/x.db")));
        assert!(config.tts_url.is_none());
        assert_eq!(config.word_lists, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("SPELLBEE_STORE", "redis")])),
            Err(ConfigError::Invalid { key: "SPELLBEE_STORE", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("SPELLBEE_STORE", "memory"), ("SPELLBEE_MAX_WORD_ID", "lots")])),
            Err(ConfigError::Invalid { key: "SPELLBEE_MAX_WORD_ID", .. })
        ));
    }

    #[test]
    fn session_ttl_must_be_a_sane_positive_span() {
        for bad in ["-5", "0", "9223372036854775807", "525601"] {
            let result = Config::from_lookup(lookup(&[
                ("SPELLBEE_STORE", "memory"),
                ("SPELLBEE_SESSION_TTL_MINUTES", bad),
            ]));
            assert!(
                matches!(result, Err(ConfigError::Invalid { key: "SPELLBEE_SESSION_TTL_MINUTES", .. })),
                "accepted {bad}"
            );
        }

        let config = Config::from_lookup(lookup(&[
            ("SPELLBEE_STORE", "memory"),
            ("SPELLBEE_SESSION_TTL_MINUTES", "30"),
        ]))
        .unwrap();
        assert_eq!(config.session_ttl, chrono::Duration::minutes(30));
    }
}
