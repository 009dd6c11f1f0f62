mod common;

use std::sync::Arc;

use clickreader::extract_remote::RemoteStrategy;
use clickreader::settings_store::{MemorySettingsStore, SettingsStore};
use clickreader::{
    BackendResolver, ExtractError, ExtractionOrchestrator, PageContext, ReaderConfig, SourceFile, Strategies,
};
use common::{docx_with_paragraphs, StubBackend};

const PARSED: &str = r#"{"ok": true, "text": "Parsed by the backend.  It works."}"#;

fn orchestrator(store: Arc<MemorySettingsStore>) -> ExtractionOrchestrator {
    let config = ReaderConfig::default();
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let strategies = Strategies {
        remote: Arc::new(RemoteStrategy::with_client(client)),
        ..Strategies::builtin(&config)
    };
    ExtractionOrchestrator::new(strategies, BackendResolver::new(store), &config)
}

fn broken_pdf() -> SourceFile {
    SourceFile::new("report.pdf", Some("application/pdf".into()), b"not really a pdf".to_vec())
}

fn page_pointing_at(page: &str, backend: &StubBackend) -> PageContext {
    PageContext::parse(&format!("{page}?api={}/", backend.base)).unwrap()
}

#[tokio::test]
async fn primary_endpoint_answers() {
    let backend = StubBackend::start(&[("/api/parse", 200, PARSED)]).await;
    let store = Arc::new(MemorySettingsStore::default());
    let page = page_pointing_at("http://localhost/", &backend);

    let extraction = orchestrator(store.clone()).extract(&broken_pdf(), &page).await.unwrap();

    assert_eq!(extraction.strategy, "remote-extract");
    assert_eq!(extraction.text, "Parsed by the backend. It works.");
    assert_eq!(backend.hits(), vec!["/api/parse"]);
    assert_eq!(store.load_api_base(), Some(backend.base.clone()));
}

#[tokio::test]
async fn missing_primary_route_falls_back_to_secondary() {
    let backend = StubBackend::start(&[("/parse", 200, PARSED)]).await;
    let page = page_pointing_at("http://localhost/", &backend);

    let extraction = orchestrator(Arc::new(MemorySettingsStore::default()))
        .extract(&broken_pdf(), &page)
        .await
        .unwrap();

    assert_eq!(extraction.text, "Parsed by the backend. It works.");
    assert_eq!(backend.hits(), vec!["/api/parse", "/parse"]);
}

#[tokio::test]
async fn rejection_surfaces_backend_suggestions() {
    let body = r#"{"ok": false, "reason": "PDF parsing is not supported here", "suggestion": ["Convert the PDF to TXT locally"]}"#;
    let backend = StubBackend::start(&[("/api/parse", 200, body)]).await;
    let page = page_pointing_at("http://localhost/", &backend);

    let err = orchestrator(Arc::new(MemorySettingsStore::default()))
        .extract(&broken_pdf(), &page)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExtractError::BackendRejected {
            message: "PDF parsing is not supported here".into(),
            suggestions: vec!["Convert the PDF to TXT locally".into()],
        }
    );
    assert!(err.user_message().contains("1) Convert the PDF to TXT locally"));
}

#[tokio::test]
async fn server_errors_become_network_failures() {
    let backend = StubBackend::start(&[("/api/parse", 500, "boom"), ("/parse", 500, "boom")]).await;
    let page = page_pointing_at("http://localhost/", &backend);

    let err = orchestrator(Arc::new(MemorySettingsStore::default()))
        .extract(&broken_pdf(), &page)
        .await
        .unwrap_err();

    match err {
        ExtractError::NetworkFailure { url, status, detail } => {
            assert!(url.ends_with("/api/parse"));
            assert_eq!(status, Some(500));
            assert!(detail.contains("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_reply_is_malformed() {
    let backend = StubBackend::start(&[("/api/parse", 200, "<html>static site</html>")]).await;
    let page = page_pointing_at("http://localhost/", &backend);

    let err = orchestrator(Arc::new(MemorySettingsStore::default()))
        .extract(&broken_pdf(), &page)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::MalformedBackendResponse { .. }));
}

#[tokio::test]
async fn secure_page_never_calls_plain_http_backend() {
    let backend = StubBackend::start(&[("/api/parse", 200, PARSED), ("/parse", 200, PARSED)]).await;
    let page = page_pointing_at("https://reader.example.com/", &backend);

    let err = orchestrator(Arc::new(MemorySettingsStore::default()))
        .extract(&broken_pdf(), &page)
        .await
        .unwrap_err();

    assert_eq!(err, ExtractError::MixedContentBlocked { base: backend.base.clone() });
    assert!(backend.hits().is_empty());
}

#[tokio::test]
async fn docx_with_enough_text_stays_local() {
    let backend = StubBackend::start(&[("/api/parse", 200, PARSED)]).await;
    let page = page_pointing_at("http://localhost/", &backend);
    let bytes = docx_with_paragraphs(&["The quarterly report is ready.", "Please read it before Monday."]);
    let file = SourceFile::new("report.docx", None, bytes);

    let extraction = orchestrator(Arc::new(MemorySettingsStore::default()))
        .extract(&file, &page)
        .await
        .unwrap();

    assert_eq!(extraction.strategy, "in-process-docx");
    assert_eq!(
        extraction.text,
        "The quarterly report is ready.\n\nPlease read it before Monday."
    );
    assert!(backend.hits().is_empty());
}

#[tokio::test]
async fn nearly_empty_docx_falls_back_to_backend() {
    let backend = StubBackend::start(&[("/api/parse", 200, PARSED)]).await;
    let page = page_pointing_at("http://localhost/", &backend);
    let file = SourceFile::new("stub.docx", None, docx_with_paragraphs(&["Fig. 1"]));

    let extraction = orchestrator(Arc::new(MemorySettingsStore::default()))
        .extract(&file, &page)
        .await
        .unwrap();

    assert_eq!(extraction.strategy, "remote-extract");
    assert_eq!(extraction.fallback_count(), 1);
}
