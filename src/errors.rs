//! Error types surfaced by extraction and playback.
//!
//! Extraction failures carry remediation steps because every one of them ends up
//! in front of a user who has to decide what to try next.

use thiserror::Error;

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Neither pasted text nor a file was provided.
    #[error("nothing to read: paste some text or choose a TXT/PDF/DOCX file")]
    NoInput,

    /// The file is not TXT, PDF or DOCX.
    #[error("unsupported file type: {name}")]
    UnsupportedFileType { name: String },

    /// Extraction ran but produced no usable text (typically a scanned PDF).
    #[error("no readable text could be extracted from {name}; it may be a scanned document without a text layer")]
    EmptyExtraction {
        name: String,
        detail: Option<String>,
        /// Whether a configured backend was asked and came back empty too.
        backend_tried: bool,
    },

    /// Transport failure or non-success HTTP status from the backend.
    #[error("backend request to {url} failed: {detail}")]
    NetworkFailure {
        url: String,
        status: Option<u16>,
        detail: String,
    },

    /// The backend answered, but not with the `{ok, text}` payload we expect.
    #[error("backend at {url} returned a malformed response: {reason}")]
    MalformedBackendResponse { url: String, reason: String },

    /// The backend answered with `ok: false`.
    #[error("backend could not parse the file: {message}")]
    BackendRejected {
        message: String,
        suggestions: Vec<String>,
    },

    #[error("refusing to call insecure backend {base} from a secure (https) page")]
    MixedContentBlocked { base: String },

    #[error("no extraction backend is configured for this host")]
    BackendNotConfigured,

    /// In-process decoder failure for a rich document.
    #[error("failed to decode {format}: {reason}")]
    Decode { format: &'static str, reason: String },

    #[error("failed to read {name}: {reason}")]
    Io { name: String, reason: String },
}

impl ExtractError {
    /// Concrete next steps for the user, most useful first.
    pub fn remedies(&self) -> Vec<String> {
        match self {
            ExtractError::NoInput => vec![
                "Paste text into the input box, or choose a TXT/PDF/DOCX file, then generate again.".to_string(),
            ],
            ExtractError::UnsupportedFileType { .. } => vec![
                "Only TXT, PDF and DOCX files are supported.".to_string(),
                "Convert the document to one of those formats, or copy its text and paste it.".to_string(),
            ],
            ExtractError::EmptyExtraction { backend_tried: false, .. } => vec![
                "Convert the document to plain text locally (or run OCR on it) and load the TXT file.".to_string(),
                "Configure an extraction backend with ?api=https://<your-backend> and try again.".to_string(),
            ],
            ExtractError::EmptyExtraction { backend_tried: true, .. } => vec![
                "The extraction backend found no text either; run OCR on the document and load the result."
                    .to_string(),
                "Or copy the text out of the original application and paste it.".to_string(),
            ],
            ExtractError::NetworkFailure { status, .. } => {
                let mut steps = Vec::new();
                if matches!(status, Some(404) | Some(405)) {
                    steps.push(
                        "The page host does not serve the parse endpoint; point ?api= at a real backend."
                            .to_string(),
                    );
                }
                steps.push("Check that the backend is running and reachable from this machine.".to_string());
                steps.push("Or convert the document to plain text locally and load the TXT file.".to_string());
                steps
            }
            ExtractError::MalformedBackendResponse { .. } => vec![
                "Check that ?api= points at the extraction backend and not at a static site.".to_string(),
                "Or convert the document to plain text locally and load the TXT file.".to_string(),
            ],
            ExtractError::BackendRejected { suggestions, .. } => {
                let mut steps = suggestions.clone();
                if steps.is_empty() {
                    steps.push("Convert the document to plain text locally and load the TXT file.".to_string());
                }
                steps
            }
            ExtractError::MixedContentBlocked { .. } => vec![
                "Serve the backend over https and set ?api=https://<your-backend>.".to_string(),
                "Or open this page over http (for example from localhost) while using an http backend."
                    .to_string(),
            ],
            ExtractError::BackendNotConfigured => vec![
                "Set the backend once with ?api=https://<your-backend>; it is remembered afterwards.".to_string(),
                "Or convert the document to plain text locally and load the TXT file.".to_string(),
            ],
            ExtractError::Decode { .. } => vec![
                "Re-save the document from its original application and try again.".to_string(),
                "Or convert the document to plain text locally and load the TXT file.".to_string(),
            ],
            ExtractError::Io { .. } => vec!["Check that the file still exists and is readable.".to_string()],
        }
    }

    /// The error message followed by its numbered remedies.
    pub fn user_message(&self) -> String {
        let mut lines = vec![self.to_string(), String::new(), "What you can do:".to_string()];
        for (index, step) in self.remedies().iter().enumerate() {
            lines.push(format!("{}) {}", index + 1, step));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    #[error("speech synthesis is not available on this system")]
    Unsupported,

    #[error("speech playback failed: {0}")]
    Playback(String),
}
