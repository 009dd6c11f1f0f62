//! In-process strategies: plain text, PDF text layer, DOCX body text.
//!
//! The rich-document strategies are best effort. A scanned PDF decodes fine and
//! yields next to nothing; deciding whether that counts is the orchestrator's job.

use std::io::{Cursor, Read};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::errors::{ExtractError, ExtractResult};
use crate::strategy::{ExtractionStrategy, SourceFile, StrategyContext};

const DOCX_BODY_PART: &str = "word/document.xml";

pub struct PlainTextStrategy;

impl ExtractionStrategy for PlainTextStrategy {
    fn name(&self) -> &'static str {
        "local-text-read"
    }

    fn extract<'a>(
        &'a self,
        file: &'a SourceFile,
        _ctx: &'a StrategyContext,
    ) -> BoxFuture<'a, ExtractResult<String>> {
        async move { Ok(String::from_utf8_lossy(file.bytes()).into_owned()) }.boxed()
    }
}

pub struct PdfStrategy;

impl ExtractionStrategy for PdfStrategy {
    fn name(&self) -> &'static str {
        "in-process-pdf"
    }

    fn extract<'a>(
        &'a self,
        file: &'a SourceFile,
        _ctx: &'a StrategyContext,
    ) -> BoxFuture<'a, ExtractResult<String>> {
        async move {
            let bytes = file.bytes().to_vec();
            let pages = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|err| err.to_string())
            })
            .await
            .map_err(|err| ExtractError::Decode {
                format: "PDF",
                reason: format!("decoder aborted: {err}"),
            })?
            .map_err(|reason| ExtractError::Decode {
                format: "PDF",
                reason,
            })?;
            debug!(name = file.name(), pages = pages.len(), "pdf text layer read");
            Ok(pages.join("\n"))
        }
        .boxed()
    }
}

pub struct DocxStrategy;

impl ExtractionStrategy for DocxStrategy {
    fn name(&self) -> &'static str {
        "in-process-docx"
    }

    fn extract<'a>(
        &'a self,
        file: &'a SourceFile,
        _ctx: &'a StrategyContext,
    ) -> BoxFuture<'a, ExtractResult<String>> {
        async move {
            let bytes = file.bytes().to_vec();
            tokio::task::spawn_blocking(move || docx_raw_text(&bytes))
                .await
                .map_err(|err| ExtractError::Decode {
                    format: "DOCX",
                    reason: format!("decoder aborted: {err}"),
                })?
                .map_err(|reason| ExtractError::Decode {
                    format: "DOCX",
                    reason,
                })
        }
        .boxed()
    }
}

/// Raw text of the main document part: runs of `w:t`, tabs, breaks, and a blank
/// line after each paragraph.
pub fn docx_raw_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|err| format!("not a DOCX archive: {err}"))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|err| format!("missing {DOCX_BODY_PART}: {err}"))?
        .read_to_string(&mut xml)
        .map_err(|err| format!("unreadable {DOCX_BODY_PART}: {err}"))?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text = false;
    let mut in_tab_stops = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) => match tag.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:tabs" => in_tab_stops = true,
                _ => {}
            },
            Ok(Event::End(tag)) => match tag.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:tabs" => in_tab_stops = false,
                b"w:p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Empty(tag)) => match tag.name().as_ref() {
                b"w:tab" if !in_tab_stops => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                b"w:p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Text(text)) if in_text => {
                let unescaped = text
                    .unescape()
                    .map_err(|err| format!("bad text at byte {}: {err}", reader.buffer_position()))?;
                out.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(format!("XML error at byte {}: {err}", reader.buffer_position()));
            }
            _ => {}
        }
    }

    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend_resolver::{BackendConfig, PageContext};
    use std::io::Write;

    pub(crate) fn docx_with_body(body: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            zip.start_file(DOCX_BODY_PART, zip::write::SimpleFileOptions::default())
                .unwrap();
            write!(
                zip,
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
            )
            .unwrap();
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn ctx() -> StrategyContext {
        StrategyContext {
            page: PageContext::parse("http://localhost/").unwrap(),
            backend: BackendConfig::NotConfigured,
            backend_paths: Vec::new(),
        }
    }

    #[test]
    fn docx_paragraphs_tabs_and_breaks() {
        let bytes = docx_with_body(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Tom &amp; Jerry</w:t><w:tab/><w:t xml:space="preserve"> run</w:t></w:r></w:p><w:p><w:r><w:t>line</w:t><w:br/><w:t>two</w:t></w:r></w:p>"#,
        );
        assert_eq!(docx_raw_text(&bytes).unwrap(), "Tom & Jerry\t run\n\nline\ntwo\n\n");
    }

    #[test]
    fn docx_without_body_part_is_rejected() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default()).unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = docx_raw_text(&buffer.into_inner()).unwrap_err();
        assert!(err.contains("word/document.xml"));
    }

    #[tokio::test]
    async fn plain_text_is_decoded_lossily() {
        let file = SourceFile::new("a.txt", None, vec![b'h', b'i', 0xff]);
        let text = PlainTextStrategy.extract(&file, &ctx()).await.unwrap();
        assert_eq!(text, "hi\u{fffd}");
    }

    #[tokio::test]
    async fn garbage_pdf_is_a_decode_failure() {
        let file = SourceFile::new("broken.pdf", None, b"definitely not a pdf".to_vec());
        let err = PdfStrategy.extract(&file, &ctx()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Decode { format: "PDF", .. }));
    }

    #[tokio::test]
    async fn docx_strategy_reads_body_text() {
        let file = SourceFile::new("a.docx", None, docx_with_body("<w:p><w:r><w:t>Hello there.</w:t></w:r></w:p>"));
        let text = DocxStrategy.extract(&file, &ctx()).await.unwrap();
        assert_eq!(text.trim(), "Hello there.");
    }
}
