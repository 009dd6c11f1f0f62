use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use clickreader::settings_store::{JsonSettingsStore, MemorySettingsStore, SettingsStore};
use clickreader::{
    BackendResolver, Document, DocumentInput, ExtractionOrchestrator, PageContext, ReaderConfig, SourceFile,
    Strategies,
};

/// Extract a TXT, PDF or DOCX file into sentences and word tokens.
#[derive(Debug, Parser)]
#[command(name = "clickreader", version)]
struct Cli {
    /// File to read. Ignored when --text is given.
    file: Option<PathBuf>,

    /// Use this text instead of a file.
    #[arg(long)]
    text: Option<String>,

    /// Address of the page the reader runs on; decides the extraction backend.
    #[arg(long, default_value = "http://localhost/")]
    page_url: String,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    strategy: Option<&'static str>,
    fallbacks: usize,
    document: &'a Document,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ReaderConfig::load(path)?,
        None => ReaderConfig::default(),
    };
    let page = PageContext::parse(&cli.page_url)?;

    let store: Arc<dyn SettingsStore> = match &config.settings_path {
        Some(path) => Arc::new(JsonSettingsStore::new(path)),
        None => Arc::new(MemorySettingsStore::default()),
    };
    let orchestrator =
        ExtractionOrchestrator::new(Strategies::builtin(&config), BackendResolver::new(store), &config);

    let file = match (&cli.text, &cli.file) {
        (None, Some(path)) => Some(SourceFile::read(path).await),
        _ => None,
    };
    let file = match file.transpose() {
        Ok(file) => file,
        Err(err) => return Ok(fail(&err)),
    };
    let input = match DocumentInput::choose(cli.text.clone(), file) {
        Ok(input) => input,
        Err(err) => return Ok(fail(&err)),
    };

    let (text, strategy, fallbacks) = match input {
        DocumentInput::Pasted(text) => (text, None, 0),
        DocumentInput::File(file) => match orchestrator.extract(&file, &page).await {
            Ok(extraction) => {
                let fallbacks = extraction.fallback_count();
                (extraction.text, Some(extraction.strategy), fallbacks)
            }
            Err(err) => return Ok(fail(&err)),
        },
    };

    let document = Document::from_source(text);
    info!(segments = document.segments().len(), "document ready");
    let report = Report {
        strategy,
        fallbacks,
        document: &document,
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize document")?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

fn fail(err: &clickreader::ExtractError) -> ExitCode {
    eprintln!("{}", err.user_message());
    ExitCode::FAILURE
}
