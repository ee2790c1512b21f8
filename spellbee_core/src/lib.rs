//! Spellbee Core - word contest engine
//!
//! Weighted word selection, answer checking, missed-word tracking, per-user
//! quiz sessions and pronunciation lookup.

mod answer;
mod audio;
mod config;
mod contest;
mod db;
mod error;
mod missed;
mod remote;
mod selection;
mod session;
mod words;

pub use answer::{check, AnswerCheck};
pub use audio::{
    AudioClip, AudioLibrary, ClipSource, HttpSpeechSynthesizer, Pronouncer, SpeechSynthesizer, Voice,
    FALLBACK_CLIP,
};
pub use config::{Config, StoreBackend};
pub use contest::{ContestService, SessionStatus, StartRequest, Started};
pub use db::SqliteStore;
pub use error::{ConfigError, ContestError, StoreError};
pub use missed::{MemoryStore, MissedWord, MissedWordStore, MissedWordsDocument};
pub use remote::{RemoteSettings, RemoteStore};
pub use selection::{copies_for_attempts, select, select_unweighted, weighted_pool, MAX_WORD_ID};
pub use session::{
    AnswerStep, ContestWord, ContestWordSet, Phase, QuizSession, SessionId, SessionRegistry, Summary,
    WrongAnswer,
};
pub use words::{accepted_answers, canonical_form, WordCatalog, WordList, REVIEW_LIST};
