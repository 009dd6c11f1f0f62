//! Chooses and sequences extraction strategies for one file.
//!
//! Every file kind maps to an ordered plan. The plan is walked by a single loop
//! that records an [`ExtractionAttempt`] per step and stops at the first result
//! that passes its content gate. When the plan runs out, a remote failure is
//! surfaced as is; everything else becomes `EmptyExtraction`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend_resolver::{BackendConfig, BackendResolver, PageContext};
use crate::config::ReaderConfig;
use crate::errors::{ExtractError, ExtractResult};
use crate::extract_local::{DocxStrategy, PdfStrategy, PlainTextStrategy};
use crate::extract_remote::RemoteStrategy;
use crate::strategy::{ExtractionStrategy, FileKind, SourceFile, StrategyContext};
use crate::text_normalizer::normalize;

#[derive(Clone)]
pub struct Strategies {
    pub plain_text: Arc<dyn ExtractionStrategy>,
    pub pdf: Arc<dyn ExtractionStrategy>,
    pub docx: Arc<dyn ExtractionStrategy>,
    pub remote: Arc<dyn ExtractionStrategy>,
}

impl Strategies {
    pub fn builtin(config: &ReaderConfig) -> Self {
        Self {
            plain_text: Arc::new(PlainTextStrategy),
            pdf: Arc::new(PdfStrategy),
            docx: Arc::new(DocxStrategy),
            remote: Arc::new(RemoteStrategy::new(config.request_timeout())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentGate {
    /// Whatever the strategy returns is the document, even if empty.
    Any,
    NonEmpty,
    /// The minimum-viable-content heuristic.
    MoreThanMinimum,
}

struct PlanStep {
    strategy: Arc<dyn ExtractionStrategy>,
    gate: ContentGate,
    needs_backend: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded { chars: usize },
    InsufficientContent { chars: usize },
    Failed(ExtractError),
    Skipped(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionAttempt {
    pub strategy: &'static str,
    pub outcome: AttemptOutcome,
}

impl ExtractionAttempt {
    fn ran(&self) -> bool {
        !matches!(self.outcome, AttemptOutcome::Skipped(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub strategy: &'static str,
    pub attempts: Vec<ExtractionAttempt>,
}

impl Extraction {
    pub fn fallback_count(&self) -> usize {
        self.attempts.iter().filter(|attempt| attempt.ran()).count().saturating_sub(1)
    }
}

pub struct ExtractionOrchestrator {
    strategies: Strategies,
    resolver: BackendResolver,
    min_content_chars: usize,
    backend_paths: Vec<String>,
}

impl ExtractionOrchestrator {
    pub fn new(strategies: Strategies, resolver: BackendResolver, config: &ReaderConfig) -> Self {
        Self {
            strategies,
            resolver,
            min_content_chars: config.min_content_chars,
            backend_paths: config.backend_paths.clone(),
        }
    }

    fn plan(&self, kind: FileKind) -> Option<Vec<PlanStep>> {
        let local = |strategy: &Arc<dyn ExtractionStrategy>, gate| PlanStep {
            strategy: strategy.clone(),
            gate,
            needs_backend: false,
        };
        let remote = PlanStep {
            strategy: self.strategies.remote.clone(),
            gate: ContentGate::NonEmpty,
            needs_backend: true,
        };

        match kind {
            FileKind::Text => Some(vec![local(&self.strategies.plain_text, ContentGate::Any)]),
            FileKind::Pdf => Some(vec![local(&self.strategies.pdf, ContentGate::MoreThanMinimum), remote]),
            FileKind::Docx => Some(vec![local(&self.strategies.docx, ContentGate::MoreThanMinimum), remote]),
            FileKind::Unsupported => None,
        }
    }

    fn admits(&self, gate: ContentGate, chars: usize) -> bool {
        match gate {
            ContentGate::Any => true,
            ContentGate::NonEmpty => chars > 0,
            ContentGate::MoreThanMinimum => chars > self.min_content_chars,
        }
    }

    pub async fn extract(&self, file: &SourceFile, page: &PageContext) -> ExtractResult<Extraction> {
        let kind = file.kind();
        let plan = self.plan(kind).ok_or_else(|| ExtractError::UnsupportedFileType {
            name: file.name().to_string(),
        })?;
        info!(name = file.name(), ?kind, steps = plan.len(), "extracting file");

        let mut ctx = StrategyContext {
            page: page.clone(),
            backend: BackendConfig::NotConfigured,
            backend_paths: self.backend_paths.clone(),
        };
        let mut attempts = Vec::with_capacity(plan.len());
        let mut backend_tried = false;

        for step in &plan {
            let name = step.strategy.name();
            if step.needs_backend {
                ctx.backend = self.resolver.resolve(page);
                if !ctx.backend.is_configured() {
                    info!(strategy = name, "skipping, no backend configured");
                    attempts.push(ExtractionAttempt {
                        strategy: name,
                        outcome: AttemptOutcome::Skipped("no backend configured"),
                    });
                    continue;
                }
                backend_tried = true;
            }

            match step.strategy.extract(file, &ctx).await {
                Ok(raw) => {
                    let text = normalize(&raw);
                    let chars = text.chars().count();
                    if self.admits(step.gate, chars) {
                        info!(strategy = name, chars, "extraction succeeded");
                        attempts.push(ExtractionAttempt {
                            strategy: name,
                            outcome: AttemptOutcome::Succeeded { chars },
                        });
                        return Ok(Extraction {
                            text,
                            strategy: name,
                            attempts,
                        });
                    }
                    info!(strategy = name, chars, threshold = self.min_content_chars, "too little text, falling back");
                    attempts.push(ExtractionAttempt {
                        strategy: name,
                        outcome: AttemptOutcome::InsufficientContent { chars },
                    });
                }
                Err(err) => {
                    warn!(strategy = name, error = %err, "extraction attempt failed");
                    attempts.push(ExtractionAttempt {
                        strategy: name,
                        outcome: AttemptOutcome::Failed(err),
                    });
                }
            }
        }

        Err(final_failure(file, &attempts, backend_tried))
    }
}

/// A failed remote step is the most actionable error. When remote did not run,
/// or ran and came back empty, the user sees `EmptyExtraction`, carrying what the
/// last strategy that ran reported.
fn final_failure(file: &SourceFile, attempts: &[ExtractionAttempt], backend_tried: bool) -> ExtractError {
    let empty = |detail: Option<String>| ExtractError::EmptyExtraction {
        name: file.name().to_string(),
        detail,
        backend_tried,
    };
    let insufficient = |strategy: &str, chars: usize| Some(format!("{strategy} found {chars} characters of text"));

    match attempts.last().map(|attempt| (attempt.strategy, &attempt.outcome)) {
        Some((_, AttemptOutcome::Failed(err))) => err.clone(),
        Some((strategy, AttemptOutcome::InsufficientContent { chars })) => empty(insufficient(strategy, *chars)),
        Some((_, AttemptOutcome::Skipped(_))) => {
            let last_ran = attempts.iter().rev().find(|attempt| attempt.ran());
            match last_ran.map(|attempt| (attempt.strategy, &attempt.outcome)) {
                Some((_, AttemptOutcome::Failed(err))) => empty(Some(err.to_string())),
                Some((strategy, AttemptOutcome::InsufficientContent { chars })) => {
                    empty(insufficient(strategy, *chars))
                }
                _ => empty(None),
            }
        }
        _ => empty(None),
    }
}
