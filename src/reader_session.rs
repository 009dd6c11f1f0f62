//! The one live document and the playback state attached to it.
//!
//! A generate is split into `begin_generate` and `finish_generate` so callers
//! can run extraction off the session. Only the newest ticket may install its
//! result; anything older is reported as superseded and dropped.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend_resolver::PageContext;
use crate::errors::{ExtractError, ExtractResult, SpeechError};
use crate::gestures::{GestureArbiter, PlaybackCommand, PointerEvent};
use crate::orchestrator::ExtractionOrchestrator;
use crate::playback::{PlaybackController, UtteranceId};
use crate::segmenter::Document;
use crate::strategy::SourceFile;

#[derive(Debug, Clone)]
pub enum DocumentInput {
    Pasted(String),
    File(SourceFile),
}

impl DocumentInput {
    /// Pasted text wins when it has any content; a file is used otherwise.
    pub fn choose(pasted: Option<String>, file: Option<SourceFile>) -> ExtractResult<Self> {
        match (pasted, file) {
            (Some(text), _) if !text.trim().is_empty() => Ok(Self::Pasted(text)),
            (_, Some(file)) => Ok(Self::File(file)),
            (Some(text), None) => Ok(Self::Pasted(text)),
            (None, None) => Err(ExtractError::NoInput),
        }
    }

    pub async fn read(self, orchestrator: &ExtractionOrchestrator, page: &PageContext) -> ExtractResult<String> {
        match self {
            Self::Pasted(text) => Ok(text),
            Self::File(file) => orchestrator.extract(&file, page).await.map(|extraction| extraction.text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    Ready { segments: usize },
    /// Extraction worked but there is nothing to display.
    NoContent,
    Failed(ExtractError),
    Superseded,
}

pub struct ReaderSession {
    orchestrator: Arc<ExtractionOrchestrator>,
    playback: PlaybackController,
    gestures: GestureArbiter,
    page: PageContext,
    document: Document,
    generation: u64,
}

impl ReaderSession {
    pub fn new(
        orchestrator: Arc<ExtractionOrchestrator>,
        playback: PlaybackController,
        gestures: GestureArbiter,
        page: PageContext,
    ) -> Self {
        Self {
            orchestrator,
            playback,
            gestures,
            page,
            document: Document::default(),
            generation: 0,
        }
    }

    pub fn orchestrator(&self) -> Arc<ExtractionOrchestrator> {
        self.orchestrator.clone()
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackController {
        &mut self.playback
    }

    /// Starts a new generate. Any earlier ticket becomes stale, speech stops and
    /// a press armed on the old document is dropped.
    pub fn begin_generate(&mut self) -> GenerateTicket {
        self.generation += 1;
        self.playback.stop();
        self.gestures.reset();
        debug!(generation = self.generation, "generate started");
        GenerateTicket(self.generation)
    }

    pub fn finish_generate(&mut self, ticket: GenerateTicket, result: ExtractResult<String>) -> GenerateOutcome {
        if ticket.0 != self.generation {
            debug!(ticket = ticket.0, current = self.generation, "stale generate result dropped");
            return GenerateOutcome::Superseded;
        }
        match result {
            Ok(text) => {
                self.document = Document::from_source(text);
                let segments = self.document.segments().len();
                info!(segments, "document ready");
                if segments == 0 {
                    GenerateOutcome::NoContent
                } else {
                    GenerateOutcome::Ready { segments }
                }
            }
            Err(err) => {
                warn!(error = %err, "generate failed");
                GenerateOutcome::Failed(err)
            }
        }
    }

    pub async fn generate(&mut self, input: DocumentInput) -> GenerateOutcome {
        let ticket = self.begin_generate();
        let orchestrator = self.orchestrator.clone();
        let result = input.read(&orchestrator, &self.page).await;
        self.finish_generate(ticket, result)
    }

    pub fn pointer(&mut self, event: PointerEvent, now: Instant) -> Result<Option<UtteranceId>, SpeechError> {
        match self.gestures.handle(event, now) {
            Some(command) => self.command(command),
            None => Ok(None),
        }
    }

    /// Fires a pending long press whose deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Result<Option<UtteranceId>, SpeechError> {
        match self.gestures.fire_long_press(now) {
            Some(command) => self.command(command),
            None => Ok(None),
        }
    }

    pub fn long_press_deadline(&self) -> Option<Instant> {
        self.gestures.long_press_deadline()
    }

    pub fn command(&mut self, command: PlaybackCommand) -> Result<Option<UtteranceId>, SpeechError> {
        self.playback.dispatch(&self.document, command)
    }
}
