//! Quiz sessions
//!
//! Each logical user gets a [`QuizSession`] keyed by a [`SessionId`]. A session
//! walks one contest word set front to back: a correct answer advances the
//! cursor, a wrong one is logged and the same word is asked again.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answer::AnswerCheck;
use crate::error::ContestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = ContestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|_| ContestError::UnknownSession(s.to_string()))
    }
}

/// One word of a contest, with its position in the source list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestWord {
    pub id: usize,
    pub entry: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongAnswer {
    pub word: ContestWord,
    pub given: String,
}

/// Ordered, non-empty set of words for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestWordSet {
    pub list: String,
    /// Words come from the missed-word review list.
    pub review: bool,
    words: Vec<ContestWord>,
}

impl ContestWordSet {
    /// `None` when `words` is empty.
    pub fn new(list: impl Into<String>, review: bool, words: Vec<ContestWord>) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        Some(Self {
            list: list.into(),
            review,
            words,
        })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[ContestWord] {
        &self.words
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    InProgress,
    Complete,
}

#[derive(Debug, Clone)]
struct Contest {
    set: ContestWordSet,
    cursor: usize,
    wrong: Vec<WrongAnswer>,
}

/// Where a session stands after an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerStep {
    /// The word the answer was for.
    pub word: ContestWord,
    pub check: AnswerCheck,
    pub cursor: usize,
    pub total: usize,
    pub phase: Phase,
}

/// End-of-run tally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub list: String,
    pub total: usize,
    pub completed: usize,
    pub first_try: usize,
    pub wrong_answers: Vec<WrongAnswer>,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    contest: Option<Contest>,
}

impl QuizSession {
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            last_active: now,
            contest: None,
        }
    }

    pub fn phase(&self) -> Phase {
        match &self.contest {
            None => Phase::Idle,
            Some(c) if c.cursor < c.set.len() => Phase::InProgress,
            Some(_) => Phase::Complete,
        }
    }

    /// Start a new run, discarding any previous cursor and wrong-answer log.
    pub fn begin(&mut self, set: ContestWordSet) {
        self.touch();
        self.contest = Some(Contest {
            set,
            cursor: 0,
            wrong: Vec::new(),
        });
    }

    /// Word being asked, if a run is in progress.
    pub fn current(&self) -> Option<&ContestWord> {
        let contest = self.contest.as_ref()?;
        contest.set.words().get(contest.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.contest.as_ref().map_or(0, |c| c.cursor)
    }

    pub fn total(&self) -> usize {
        self.contest.as_ref().map_or(0, |c| c.set.len())
    }

    pub fn is_review(&self) -> bool {
        self.contest.as_ref().is_some_and(|c| c.set.review)
    }

    pub fn wrong_answers(&self) -> &[WrongAnswer] {
        self.contest
            .as_ref()
            .map(|c| c.wrong.as_slice())
            .unwrap_or(&[])
    }

    /// Apply a checked answer for the current word.
    pub fn record(&mut self, check: AnswerCheck, given: &str) -> Result<AnswerStep, ContestError> {
        self.touch();
        let contest = self
            .contest
            .as_mut()
            .filter(|c| c.cursor < c.set.len())
            .ok_or(ContestError::NotInProgress)?;

        let word = contest.set.words()[contest.cursor].clone();
        if check.is_match() {
            contest.cursor += 1;
        } else {
            contest.wrong.push(WrongAnswer {
                word: word.clone(),
                given: given.to_string(),
            });
        }

        let (cursor, total) = (contest.cursor, contest.set.len());
        Ok(AnswerStep {
            word,
            check,
            cursor,
            total,
            phase: self.phase(),
        })
    }

    pub fn summary(&self) -> Option<Summary> {
        let contest = self.contest.as_ref()?;
        let missed: HashSet<usize> = contest.wrong.iter().map(|w| w.word.id).collect();
        Some(Summary {
            list: contest.set.list.clone(),
            total: contest.set.len(),
            completed: contest.cursor,
            first_try: contest.set.words()[..contest.cursor]
                .iter()
                .filter(|w| !missed.contains(&w.id))
                .count(),
            wrong_answers: contest.wrong.clone(),
        })
    }

    fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

/// All live sessions. Each session has its own lock, so a slow store call
/// made on behalf of one session does not hold up the others.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<Mutex<QuizSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<Mutex<QuizSession>>>> {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn open(&self) -> SessionId {
        let id = SessionId::new();
        self.map()
            .insert(id, Arc::new(Mutex::new(QuizSession::new(id))));
        id
    }

    pub fn get(&self, id: &SessionId) -> Result<Arc<Mutex<QuizSession>>, ContestError> {
        self.map()
            .get(id)
            .cloned()
            .ok_or_else(|| ContestError::UnknownSession(id.to_string()))
    }

    /// Run `f` with the session locked.
    pub fn with_session<T>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut QuizSession) -> Result<T, ContestError>,
    ) -> Result<T, ContestError> {
        let session = self.get(id)?;
        let mut guard = session.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Drop sessions idle for longer than `ttl`. Returns how many went.
    /// A negative or out-of-range `ttl` drops nothing.
    pub fn prune(&self, ttl: Duration, now: DateTime<Utc>) -> usize {
        if ttl < Duration::zero() {
            return 0;
        }
        let Some(cutoff) = now.checked_sub_signed(ttl) else {
            return 0;
        };
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, session| {
            let session = session.lock().unwrap_or_else(|p| p.into_inner());
            session.last_active >= cutoff
        });
        before - map.len()
    }
}
