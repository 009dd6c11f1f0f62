//! Click-to-hear document reader core.
//!
//! Files and pasted text become a [`segmenter::Document`] of sentences and word
//! tokens; pointer gestures on that document become single, superseding
//! utterances on a speech synthesizer.

pub mod backend_resolver;
pub mod config;
pub mod errors;
pub mod extract_local;
pub mod extract_remote;
pub mod gestures;
pub mod orchestrator;
pub mod playback;
pub mod reader_session;
pub mod segmenter;
pub mod settings_store;
pub mod strategy;
pub mod text_normalizer;

pub use backend_resolver::{BackendConfig, BackendResolver, PageContext};
pub use config::{ReaderConfig, SpeechSettings};
pub use errors::{ExtractError, ExtractResult, SpeechError};
pub use gestures::{GestureArbiter, HitTarget, PlaybackCommand, PointerEvent};
pub use orchestrator::{Extraction, ExtractionOrchestrator, Strategies};
pub use playback::{PlaybackController, SpeechSynthesizer};
pub use reader_session::{DocumentInput, GenerateOutcome, ReaderSession};
pub use segmenter::{Document, Segment, Token, TokenKind};
pub use strategy::SourceFile;
