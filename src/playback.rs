//! Single-utterance playback.
//!
//! The controller owns the only live utterance. Every new `speak` cancels the
//! previous one first, and synthesizer events are matched against the current
//! utterance id so late events from a superseded utterance are dropped.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SpeechSettings;
use crate::errors::SpeechError;
use crate::gestures::PlaybackCommand;
use crate::segmenter::Document;

const STATUS_PREVIEW_CHARS: usize = 40;
const MIN_RATE: f32 = 0.25;
const MAX_RATE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceId(Uuid);

impl UtteranceId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeakTarget {
    Word { segment: usize, token: usize },
    Sentence { segment: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    pub id: UtteranceId,
    pub text: String,
    pub lang: String,
    pub voice: Option<String>,
    pub rate: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceEvent {
    Started(UtteranceId),
    Ended(UtteranceId),
    Errored(UtteranceId, String),
}

impl UtteranceEvent {
    pub fn id(&self) -> UtteranceId {
        match self {
            UtteranceEvent::Started(id) | UtteranceEvent::Ended(id) | UtteranceEvent::Errored(id, _) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceOutcome {
    Done,
    Failed(String),
    Canceled,
}

pub type UtteranceSink = UnboundedSender<UtteranceEvent>;

pub trait SpeechSynthesizer: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    /// Current inventory; may change over the synthesizer's lifetime.
    fn voices(&self) -> Vec<Voice>;

    /// Starts speaking without blocking. Lifecycle events go to `events`.
    fn speak(&self, request: UtteranceRequest, events: UtteranceSink);

    fn cancel_all(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Speaking {
        id: UtteranceId,
        target: Option<SpeakTarget>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStatus {
    Ready,
    Speaking { preview: String },
    Stopped,
    Failed { reason: String },
}

/// Explicit voice if it is installed, else the first voice matching the language
/// hint, else any English voice, else whatever comes first.
pub fn pick_voice<'a>(voices: &'a [Voice], preferred: Option<&str>, lang_hint: &str) -> Option<&'a Voice> {
    if let Some(name) = preferred {
        if let Some(voice) = voices.iter().find(|voice| voice.name == name) {
            return Some(voice);
        }
    }
    let hint = lang_hint.to_lowercase();
    voices
        .iter()
        .find(|voice| voice.lang.to_lowercase().starts_with(&hint))
        .or_else(|| voices.iter().find(|voice| voice.lang.to_lowercase().starts_with("en")))
        .or_else(|| voices.first())
}

fn status_preview(text: &str) -> String {
    if text.chars().count() > STATUS_PREVIEW_CHARS {
        let head: String = text.chars().take(STATUS_PREVIEW_CHARS).collect();
        format!("{head}…")
    } else {
        text.to_string()
    }
}

pub struct PlaybackController {
    synth: Arc<dyn SpeechSynthesizer>,
    settings: SpeechSettings,
    phase: PlaybackPhase,
    status: PlaybackStatus,
    events_tx: UtteranceSink,
    events_rx: UnboundedReceiver<UtteranceEvent>,
}

impl PlaybackController {
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, settings: SpeechSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            synth,
            settings,
            phase: PlaybackPhase::Idle,
            status: PlaybackStatus::Ready,
            events_tx,
            events_rx,
        }
    }

    pub fn phase(&self) -> &PlaybackPhase {
        &self.phase
    }

    pub fn status(&self) -> &PlaybackStatus {
        &self.status
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self.phase, PlaybackPhase::Speaking { .. })
    }

    pub fn current(&self) -> Option<UtteranceId> {
        match self.phase {
            PlaybackPhase::Speaking { id, .. } => Some(id),
            PlaybackPhase::Idle => None,
        }
    }

    pub fn highlighted(&self) -> Option<SpeakTarget> {
        match self.phase {
            PlaybackPhase::Speaking { target, .. } => target,
            PlaybackPhase::Idle => None,
        }
    }

    pub fn settings(&self) -> &SpeechSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SpeechSettings) {
        self.settings = settings;
    }

    /// Speaks `text`, superseding whatever is playing. Blank text changes nothing.
    pub fn speak(&mut self, text: &str, target: Option<SpeakTarget>) -> Result<Option<UtteranceId>, SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if !self.synth.is_available() {
            return Err(SpeechError::Unsupported);
        }

        if let Some(previous) = self.current() {
            debug!(%previous, "superseding utterance");
        }
        self.cancel_current();

        let voices = self.synth.voices();
        let voice = pick_voice(&voices, self.settings.voice.as_deref(), &self.settings.lang);
        let id = UtteranceId::new();
        let request = UtteranceRequest {
            id,
            text: text.to_string(),
            lang: self.settings.lang.clone(),
            voice: voice.map(|voice| voice.name.clone()),
            rate: self.settings.rate.clamp(MIN_RATE, MAX_RATE),
        };

        self.phase = PlaybackPhase::Speaking { id, target };
        self.status = PlaybackStatus::Speaking {
            preview: status_preview(text),
        };
        info!(%id, voice = ?request.voice, chars = text.chars().count(), "speaking");
        self.synth.speak(request, self.events_tx.clone());
        Ok(Some(id))
    }

    pub fn stop(&mut self) -> Option<UtteranceOutcome> {
        let outcome = self.cancel_current();
        self.status = PlaybackStatus::Stopped;
        outcome
    }

    fn cancel_current(&mut self) -> Option<UtteranceOutcome> {
        self.synth.cancel_all();
        match std::mem::replace(&mut self.phase, PlaybackPhase::Idle) {
            PlaybackPhase::Speaking { id, .. } => {
                debug!(%id, "utterance canceled");
                Some(UtteranceOutcome::Canceled)
            }
            PlaybackPhase::Idle => None,
        }
    }

    /// Applies one synthesizer event. Returns the outcome when it ends the
    /// current utterance; events for any other utterance are ignored.
    pub fn handle_event(&mut self, event: UtteranceEvent) -> Option<UtteranceOutcome> {
        let Some(current) = self.current() else {
            debug!(id = %event.id(), "event while idle, ignoring");
            return None;
        };
        if event.id() != current {
            debug!(id = %event.id(), %current, "stale utterance event, ignoring");
            return None;
        }

        match event {
            UtteranceEvent::Started(_) => None,
            UtteranceEvent::Ended(_) => {
                self.phase = PlaybackPhase::Idle;
                self.status = PlaybackStatus::Ready;
                Some(UtteranceOutcome::Done)
            }
            UtteranceEvent::Errored(_, reason) => {
                warn!(id = %current, %reason, "speech failed");
                self.phase = PlaybackPhase::Idle;
                self.status = PlaybackStatus::Failed {
                    reason: format!(
                        "{} (the system may have blocked audio; interact with the page once and try again)",
                        SpeechError::Playback(reason.clone())
                    ),
                };
                Some(UtteranceOutcome::Failed(reason))
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<UtteranceOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            outcomes.extend(self.handle_event(event));
        }
        outcomes
    }

    /// Waits until the current utterance reaches a terminal event.
    pub async fn next_outcome(&mut self) -> Option<UtteranceOutcome> {
        while self.is_speaking() {
            let event = self.events_rx.recv().await?;
            if let Some(outcome) = self.handle_event(event) {
                return Some(outcome);
            }
        }
        None
    }

    /// Resolves a gesture command against the live document and speaks it.
    pub fn dispatch(&mut self, document: &Document, command: PlaybackCommand) -> Result<Option<UtteranceId>, SpeechError> {
        match command {
            PlaybackCommand::SpeakWord { segment, token } => {
                let Some(word) = document.token(segment, token).filter(|t| t.is_word()) else {
                    return Ok(None);
                };
                let text = word.text().to_string();
                self.speak(&text, Some(SpeakTarget::Word { segment, token }))
            }
            PlaybackCommand::SpeakSentence { segment } => {
                let Some(sentence) = document.segment(segment) else {
                    return Ok(None);
                };
                let text = sentence.text().to_string();
                self.speak(&text, Some(SpeakTarget::Sentence { segment }))
            }
        }
    }
}
