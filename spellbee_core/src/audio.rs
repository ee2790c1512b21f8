//! Pronunciation audio
//!
//! Recorded clips are looked up by word ID in blocks of 500 (`500/`,
//! `1000/`, `1500/`, ...), trying `<id>.wav`, then `<id>.mp3`, then a shared
//! fallback clip. Some words are spoken by a speech service instead.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::StoreError;
use crate::words::canonical_form;

pub const FALLBACK_CLIP: &str = "fallback.mp3";
const BUCKET_SIZE: usize = 500;

/// Audio bytes ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub source: ClipSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipSource {
    Recorded,
    Fallback,
    Synthesized,
    Missing,
}

impl AudioClip {
    pub fn empty() -> Self {
        Self {
            bytes: Vec::new(),
            mime: "audio/mpeg",
            source: ClipSource::Missing,
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => "audio/wav",
        _ => "audio/mpeg",
    }
}

/// Directory of recorded clips
#[derive(Debug, Clone)]
pub struct AudioLibrary {
    root: PathBuf,
}

impl AudioLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Block directory for a word ID: 1-500 -> "500", 501-1000 -> "1000", ...
    pub fn bucket(word_id: usize) -> Option<String> {
        if word_id == 0 {
            return None;
        }
        Some((word_id.div_ceil(BUCKET_SIZE) * BUCKET_SIZE).to_string())
    }

    /// Files tried for `word_id`, most preferred first.
    pub fn candidates(&self, word_id: usize) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(bucket) = Self::bucket(word_id) {
            let dir = self.root.join(bucket);
            paths.push(dir.join(format!("{word_id}.wav")));
            paths.push(dir.join(format!("{word_id}.mp3")));
        }
        paths.push(self.root.join(FALLBACK_CLIP));
        paths
    }

    /// First readable clip for `word_id`. Never fails: with nothing on disk
    /// the clip is empty.
    pub fn lookup(&self, word_id: usize) -> AudioClip {
        let clip = self.first_readable(self.candidates(word_id));
        if clip.source == ClipSource::Fallback {
            log::warn!("no recording for word {word_id}, using fallback clip");
        }
        clip
    }

    /// The shared fallback clip alone, for words that have no recording slot.
    pub fn fallback(&self) -> AudioClip {
        log::debug!("unrecorded word, using fallback clip");
        self.first_readable(vec![self.root.join(FALLBACK_CLIP)])
    }

    fn first_readable(&self, candidates: Vec<PathBuf>) -> AudioClip {
        let fallback = self.root.join(FALLBACK_CLIP);
        for path in candidates {
            match fs::read(&path) {
                Ok(bytes) => {
                    let source = if path == fallback {
                        ClipSource::Fallback
                    } else {
                        ClipSource::Recorded
                    };
                    return AudioClip {
                        bytes,
                        mime: mime_for(&path),
                        source,
                    };
                }
                Err(e) => log::debug!("audio {}: {e}", path.display()),
            }
        }

        log::error!(
            "fallback clip missing at {}; serving empty audio",
            fallback.display()
        );
        AudioClip::empty()
    }
}

/// Text-to-speech service
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, StoreError>;
}

/// Speech over HTTP: `GET <url>?ie=UTF-8&client=tw-ob&tl=<lang>&q=<text>`
/// answered with MP3 bytes.
pub struct HttpSpeechSynthesizer {
    client: Client,
    url: String,
    lang: String,
}

impl HttpSpeechSynthesizer {
    pub fn new(url: impl Into<String>, lang: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.into(),
            lang: lang.into(),
        })
    }
}

impl SpeechSynthesizer for HttpSpeechSynthesizer {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.lang.as_str()),
                ("q", text),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// How a word should be voiced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    /// Recorded clip unless the word is flagged for synthesis.
    Default,
    /// Always synthesize.
    Alternate,
}

/// Chooses between recorded clips and the speech service
pub struct Pronouncer {
    library: AudioLibrary,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    sensitive: HashSet<String>,
}

impl Pronouncer {
    pub fn new(library: AudioLibrary, synthesizer: Option<Arc<dyn SpeechSynthesizer>>) -> Self {
        Self {
            library,
            synthesizer,
            sensitive: HashSet::new(),
        }
    }

    /// Entries whose recordings are unusable; matched on canonical form.
    pub fn with_sensitive_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sensitive = words
            .into_iter()
            .map(|w| canonical_form(w.as_ref()).to_string())
            .filter(|w| !w.is_empty())
            .collect();
        self
    }

    pub fn load_sensitive_words(path: &Path) -> Vec<String> {
        match fs::read_to_string(path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                log::info!("no sensitive word list at {}: {e}", path.display());
                Vec::new()
            }
        }
    }

    pub fn is_sensitive(&self, raw_entry: &str) -> bool {
        self.sensitive.contains(canonical_form(raw_entry))
    }

    /// Audio for a word. Review words and sensitive words are synthesized;
    /// synthesis failures fall back to the recorded chain.
    ///
    /// Review IDs are positions in the missed-word list, not in a recorded
    /// list, so a failed review synthesis goes straight to the fallback clip.
    pub fn pronounce(&self, word_id: usize, raw_entry: &str, review: bool, voice: Voice) -> AudioClip {
        let synthesize = review || voice == Voice::Alternate || self.is_sensitive(raw_entry);
        if synthesize {
            if let Some(clip) = self.synthesize(raw_entry) {
                return clip;
            }
        }
        if review {
            self.library.fallback()
        } else {
            self.library.lookup(word_id)
        }
    }

    fn synthesize(&self, raw_entry: &str) -> Option<AudioClip> {
        let synthesizer = self.synthesizer.as_ref()?;
        let text = canonical_form(raw_entry).split(',').next().unwrap_or_default().trim();
        if text.is_empty() {
            return None;
        }

        match synthesizer.synthesize(text) {
            Ok(bytes) if !bytes.is_empty() => Some(AudioClip {
                bytes,
                mime: "audio/mpeg",
                source: ClipSource::Synthesized,
            }),
            Ok(_) => {
                log::warn!("speech service returned no audio for '{text}'");
                None
            }
            Err(e) => {
                log::warn!("speech synthesis failed for '{text}': {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        spoken: Mutex<Vec<String>>,
        fail: bool,
    }

    impl SpeechSynthesizer for Recorder {
        fn synthesize(&self, text: &str) -> Result<Vec<u8>, StoreError> {
            self.spoken.lock().unwrap().push(text.to_string());
            if self.fail {
                Err(StoreError::Status(503))
            } else {
                Ok(b"tts".to_vec())
            }
        }
    }

    fn library() -> (tempfile::TempDir, AudioLibrary) {
        let dir = tempfile::tempdir().unwrap();
        for bucket in ["500", "1000", "1500"] {
            fs::create_dir(dir.path().join(bucket)).unwrap();
        }
        fs::write(dir.path().join("500/7.wav"), b"wav7").unwrap();
        fs::write(dir.path().join("500/7.mp3"), b"mp37").unwrap();
        fs::write(dir.path().join("1000/501.mp3"), b"mp3-501").unwrap();
        fs::write(dir.path().join(FALLBACK_CLIP), b"fallback").unwrap();
        let library = AudioLibrary::new(dir.path());
        (dir, library)
    }

    #[test]
    fn buckets_by_five_hundred() {
        assert_eq!(AudioLibrary::bucket(0), None);
        assert_eq!(AudioLibrary::bucket(1).as_deref(), Some("500"));
        assert_eq!(AudioLibrary::bucket(500).as_deref(), Some("500"));
        assert_eq!(AudioLibrary::bucket(501).as_deref(), Some("1000"));
        assert_eq!(AudioLibrary::bucket(1500).as_deref(), Some("1500"));
    }

    #[test]
    fn prefers_wav_then_mp3_then_fallback() {
        let (_dir, library) = library();

        let wav = library.lookup(7);
        assert_eq!((wav.bytes.as_slice(), wav.mime), (&b"wav7"[..], "audio/wav"));

        let mp3 = library.lookup(501);
        assert_eq!((mp3.bytes.as_slice(), mp3.source), (&b"mp3-501"[..], ClipSource::Recorded));

        let fallback = library.lookup(1200);
        assert_eq!(fallback.source, ClipSource::Fallback);
        assert_eq!(fallback.bytes, b"fallback");
    }

    #[test]
    fn fallback_skips_recordings() {
        let (_dir, library) = library();
        let clip = library.fallback();
        assert_eq!((clip.bytes.as_slice(), clip.source), (&b"fallback"[..], ClipSource::Fallback));
    }

    #[test]
    fn missing_fallback_gives_empty_clip() {
        let dir = tempfile::tempdir().unwrap();
        let clip = AudioLibrary::new(dir.path()).lookup(3);
        assert_eq!(clip, AudioClip::empty());
    }

    #[test]
    fn sensitive_words_are_synthesized() {
        let (_dir, library) = library();
        let recorder = Arc::new(Recorder {
            spoken: Mutex::new(Vec::new()),
            fail: false,
        });
        let pronouncer = Pronouncer::new(library, Some(recorder.clone()))
            .with_sensitive_words(["klutzy"]);

        let clip = pronouncer.pronounce(7, "klutzy (clumsy)", false, Voice::Default);
        assert_eq!(clip.source, ClipSource::Synthesized);

        let clip = pronouncer.pronounce(7, "ferocity", false, Voice::Default);
        assert_eq!(clip.source, ClipSource::Recorded);

        let clip = pronouncer.pronounce(7, "cat, kat (animal)", false, Voice::Alternate);
        assert_eq!(clip.source, ClipSource::Synthesized);

        assert_eq!(*recorder.spoken.lock().unwrap(), vec!["klutzy", "cat"]);
    }

    #[test]
    fn failed_synthesis_falls_back_to_recordings() {
        let (_dir, library) = library();
        let recorder = Arc::new(Recorder {
            spoken: Mutex::new(Vec::new()),
            fail: true,
        });
        let pronouncer = Pronouncer::new(library, Some(recorder));

        let clip = pronouncer.pronounce(7, "ferocity", false, Voice::Alternate);
        assert_eq!(clip.source, ClipSource::Recorded);
    }

    #[test]
    fn review_words_never_use_recordings_by_id() {
        let (_dir, library) = library();
        let pronouncer = Pronouncer::new(library, None);
        assert_eq!(pronouncer.pronounce(7, "x", true, Voice::Default).source, ClipSource::Fallback);
        assert_eq!(pronouncer.pronounce(7, "x", false, Voice::Alternate).source, ClipSource::Recorded);
    }
}
