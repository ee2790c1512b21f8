//! Contest orchestration
//!
//! Glues the word catalog, the missed-word store, the session registry and
//! the pronouncer together. Every call names its session explicitly.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::answer::check;
use crate::audio::{AudioClip, Pronouncer, Voice};
use crate::error::ContestError;
use crate::missed::{MissedWord, MissedWordStore};
use crate::selection::{select, select_unweighted};
use crate::session::{
    AnswerStep, ContestWord, ContestWordSet, Phase, SessionId, SessionRegistry, Summary, WrongAnswer,
};
use crate::words::{canonical_form, WordCatalog, WordList, REVIEW_LIST};

/// Parameters for starting a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub list: String,
    pub start_id: usize,
    pub end_id: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Started {
    pub list: String,
    pub review: bool,
    pub requested: usize,
    /// May be below `requested` when the range holds fewer words.
    pub selected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub created_at: DateTime<Utc>,
    pub phase: Phase,
    pub cursor: usize,
    pub total: usize,
    pub review: bool,
    pub wrong_answers: Vec<WrongAnswer>,
}

pub struct ContestService {
    catalog: WordCatalog,
    store: Arc<dyn MissedWordStore>,
    sessions: SessionRegistry,
    pronouncer: Pronouncer,
    max_word_id: usize,
}

impl ContestService {
    pub fn new(
        catalog: WordCatalog,
        store: Arc<dyn MissedWordStore>,
        pronouncer: Pronouncer,
        max_word_id: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            sessions: SessionRegistry::new(),
            pronouncer,
            max_word_id,
        }
    }

    pub fn open_session(&self) -> SessionId {
        let id = self.sessions.open();
        log::info!("opened session {id}");
        id
    }

    /// Selectable list names, review list last.
    pub fn list_names(&self) -> Vec<String> {
        let mut names = self.catalog.names().to_vec();
        names.push(REVIEW_LIST.to_string());
        names
    }

    pub fn missed_words(&self) -> Vec<MissedWord> {
        self.store.load()
    }

    pub fn start(&self, id: &SessionId, request: &StartRequest) -> Result<Started, ContestError> {
        self.start_with_rng(&mut rand::thread_rng(), id, request)
    }

    /// Select words and begin a run. Nothing about the session changes unless
    /// the selection is non-empty.
    pub fn start_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        id: &SessionId,
        request: &StartRequest,
    ) -> Result<Started, ContestError> {
        self.sessions.get(id)?;

        let review = request.list == REVIEW_LIST;
        let (words, ids) = if review {
            let words = WordList::new(
                REVIEW_LIST,
                self.store.load().into_iter().map(|r| r.word).collect(),
            );
            let ids = select_unweighted(rng, 1, words.len(), words.len(), request.count);
            (words, ids)
        } else {
            let words = self.catalog.load(&request.list)?;
            let weights = self.store.as_weight_map();
            let ids = select(
                rng,
                &words,
                request.start_id,
                request.end_id,
                self.max_word_id,
                request.count,
                &weights,
            );
            (words, ids)
        };

        let contest_words: Vec<ContestWord> = ids
            .into_iter()
            .filter_map(|word_id| {
                words.get(word_id).map(|entry| ContestWord {
                    id: word_id,
                    entry: entry.to_string(),
                })
            })
            .collect();

        let set = ContestWordSet::new(&request.list, review, contest_words).ok_or_else(|| {
            ContestError::EmptySelection {
                list: request.list.clone(),
                start_id: request.start_id,
                end_id: request.end_id,
            }
        })?;

        let started = Started {
            list: request.list.clone(),
            review,
            requested: request.count,
            selected: set.len(),
        };
        if started.selected < started.requested {
            log::info!(
                "session {id}: only {} of {} words available in {}",
                started.selected,
                started.requested,
                request.list
            );
        }

        self.sessions.with_session(id, |session| {
            session.begin(set);
            Ok(())
        })?;
        Ok(started)
    }

    /// Check an answer for the current word and update the missed-word store:
    /// a miss is counted, a correct answer clears the word.
    pub fn answer(&self, id: &SessionId, given: &str) -> Result<AnswerStep, ContestError> {
        let step = self.sessions.with_session(id, |session| {
            let entry = session
                .current()
                .ok_or(ContestError::NotInProgress)?
                .entry
                .clone();
            session.record(check(&entry, given), given)
        })?;

        let word = canonical_form(&step.word.entry);
        if step.check.is_match() {
            self.store.remove(word);
        } else {
            log::debug!("session {id}: missed '{word}'");
            self.store.add(word);
        }

        if step.phase == Phase::Complete {
            log::info!("session {id}: contest complete ({} words)", step.total);
        }
        Ok(step)
    }

    pub fn current(&self, id: &SessionId) -> Result<Option<ContestWord>, ContestError> {
        self.sessions
            .with_session(id, |session| Ok(session.current().cloned()))
    }

    pub fn status(&self, id: &SessionId) -> Result<SessionStatus, ContestError> {
        self.sessions.with_session(id, |session| {
            Ok(SessionStatus {
                created_at: session.created_at,
                phase: session.phase(),
                cursor: session.cursor(),
                total: session.total(),
                review: session.is_review(),
                wrong_answers: session.wrong_answers().to_vec(),
            })
        })
    }

    pub fn summary(&self, id: &SessionId) -> Result<Option<Summary>, ContestError> {
        self.sessions.with_session(id, |session| Ok(session.summary()))
    }

    /// Audio for the current word; an empty clip when nothing is being asked.
    pub fn pronounce(&self, id: &SessionId, voice: Voice) -> Result<AudioClip, ContestError> {
        let current = self
            .sessions
            .with_session(id, |session| Ok(session.current().cloned().map(|w| (w, session.is_review()))))?;

        Ok(match current {
            Some((word, review)) => self.pronouncer.pronounce(word.id, &word.entry, review, voice),
            None => AudioClip::empty(),
        })
    }

    pub fn prune_sessions(&self, ttl: chrono::Duration) -> usize {
        let pruned = self.sessions.prune(ttl, Utc::now());
        if pruned > 0 {
            log::info!("pruned {pruned} idle sessions");
        }
        pruned
    }
}
