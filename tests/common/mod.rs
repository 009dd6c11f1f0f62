#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use clickreader::playback::{UtteranceRequest, UtteranceSink, Voice};
use clickreader::settings_store::MemorySettingsStore;
use clickreader::strategy::{ExtractionStrategy, StrategyContext};
use clickreader::{
    BackendResolver, ExtractResult, ExtractionOrchestrator, ReaderConfig, SourceFile, SpeechSynthesizer, Strategies,
};

/// Synthesizer that only records what it was asked to say.
#[derive(Default)]
pub struct RecordingSynth {
    pub requests: Mutex<Vec<UtteranceRequest>>,
}

impl RecordingSynth {
    pub fn spoken(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|r| r.text.clone()).collect()
    }
}

impl SpeechSynthesizer for RecordingSynth {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice {
            name: "Daniel".into(),
            lang: "en-GB".into(),
        }]
    }

    fn speak(&self, request: UtteranceRequest, _events: UtteranceSink) {
        self.requests.lock().unwrap().push(request);
    }

    fn cancel_all(&self) {}
}

/// Strategy returning a fixed result and counting calls.
pub struct Canned {
    pub name: &'static str,
    pub result: ExtractResult<String>,
    pub calls: Mutex<usize>,
}

impl Canned {
    pub fn text(name: &'static str, text: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            result: Ok(text.to_string()),
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ExtractionStrategy for Canned {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract<'a>(&'a self, _file: &'a SourceFile, _ctx: &'a StrategyContext) -> BoxFuture<'a, ExtractResult<String>> {
        *self.calls.lock().unwrap() += 1;
        let result = self.result.clone();
        async move { result }.boxed()
    }
}

pub fn orchestrator_with(strategies: Strategies, store: MemorySettingsStore) -> ExtractionOrchestrator {
    let config = ReaderConfig::default();
    ExtractionOrchestrator::new(strategies, BackendResolver::new(Arc::new(store)), &config)
}

pub fn builtin_orchestrator(store: MemorySettingsStore) -> ExtractionOrchestrator {
    orchestrator_with(Strategies::builtin(&ReaderConfig::default()), store)
}

pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|text| format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"))
        .collect();
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
        .unwrap();
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

/// Canned HTTP backend on a loopback port. Unknown paths answer 404.
pub struct StubBackend {
    pub base: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl StubBackend {
    pub async fn start(routes: &[(&str, u16, &str)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<HashMap<String, (u16, String)>> = Arc::new(
            routes
                .iter()
                .map(|(path, status, body)| (path.to_string(), (*status, body.to_string())))
                .collect(),
        );
        let hits = Arc::new(Mutex::new(Vec::new()));

        let hits_for_server = hits.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let hits = hits_for_server.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &routes, &hits).await;
                });
            }
        });

        Self { base, hits }
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &HashMap<String, (u16, String)>,
    hits: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let header = |name: &str| {
        head.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim().to_string())
        })
    };

    if let Some(length) = header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while buf.len() < header_end + length {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    } else if header("transfer-encoding").map_or(false, |v| v.eq_ignore_ascii_case("chunked")) {
        while find(&buf[header_end..], b"0\r\n\r\n").is_none() {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    hits.lock().unwrap().push(path.clone());
    let (status, body) = routes
        .get(&path)
        .cloned()
        .unwrap_or((404, "Not Found".to_string()));
    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
