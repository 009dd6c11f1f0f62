use std::path::Path;

use futures_util::future::BoxFuture;

use crate::backend_resolver::{BackendConfig, PageContext};
use crate::errors::{ExtractError, ExtractResult};

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
    Docx,
    Unsupported,
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes,
        }
    }

    pub async fn read(path: &Path) -> ExtractResult<Self> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = tokio::fs::read(path).await.map_err(|err| ExtractError::Io {
            name: name.clone(),
            reason: err.to_string(),
        })?;
        let content_type = content_type_for_name(&name).map(str::to_string);
        Ok(Self::new(name, content_type, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Extension first, then the declared content type.
    pub fn kind(&self) -> FileKind {
        let name = self.name.to_lowercase();
        if name.ends_with(".txt") {
            return FileKind::Text;
        }
        if name.ends_with(".pdf") {
            return FileKind::Pdf;
        }
        if name.ends_with(".docx") {
            return FileKind::Docx;
        }
        match self.content_type.as_deref().map(str::to_ascii_lowercase) {
            Some(ct) if ct.starts_with("text/plain") => FileKind::Text,
            Some(ct) if ct.starts_with("application/pdf") => FileKind::Pdf,
            Some(ct) if ct.starts_with(DOCX_MIME) => FileKind::Docx,
            _ => FileKind::Unsupported,
        }
    }
}

fn content_type_for_name(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    if lower.ends_with(".txt") {
        Some("text/plain")
    } else if lower.ends_with(".pdf") {
        Some("application/pdf")
    } else if lower.ends_with(".docx") {
        Some(DOCX_MIME)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub page: PageContext,
    pub backend: BackendConfig,
    pub backend_paths: Vec<String>,
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract<'a>(
        &'a self,
        file: &'a SourceFile,
        ctx: &'a StrategyContext,
    ) -> BoxFuture<'a, ExtractResult<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("notes.txt", None, FileKind::Text)]
    #[case("Paper.PDF", None, FileKind::Pdf)]
    #[case("essay.docx", None, FileKind::Docx)]
    #[case("essay.doc", None, FileKind::Unsupported)]
    #[case("blob", Some("text/plain; charset=utf-8"), FileKind::Text)]
    #[case("blob", Some("application/pdf"), FileKind::Pdf)]
    #[case("blob", Some(DOCX_MIME), FileKind::Docx)]
    #[case("image.png", Some("image/png"), FileKind::Unsupported)]
    fn detects_kind(#[case] name: &str, #[case] content_type: Option<&str>, #[case] expected: FileKind) {
        let file = SourceFile::new(name, content_type.map(str::to_string), Vec::new());
        assert_eq!(file.kind(), expected);
    }

    #[tokio::test]
    async fn read_reports_missing_files_as_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceFile::read(&dir.path().join("missing.txt")).await.unwrap_err();
        assert!(matches!(err, ExtractError::Io { ref name, .. } if name == "missing.txt"));
    }

    #[tokio::test]
    async fn read_guesses_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hi").unwrap();

        let file = SourceFile::read(&path).await.unwrap();
        assert_eq!(file.content_type(), Some("text/plain"));
        assert_eq!(file.bytes(), b"hi");
    }
}
