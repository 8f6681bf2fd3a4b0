use crate::acquire::{extract_file, guess_mime, UrlFetcher};
use crate::errors::{AcquireError, SummarizeError};
use crate::health;
use crate::pipeline::assemble::SummaryResult;
use crate::pipeline::target::{
    Preset, Priority, SelectionMode, TargetSpec, CUSTOM_SENTENCE_RANGE, CUSTOM_WORD_RANGE,
};
use crate::pipeline::{Document, Pipeline};
use crate::stats::SummaryStats;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const SERVER_NAME: &str = "text-summarizer";
const METRICS_URI: &str = "mcp://text-summarizer/metrics";
const PRESETS_URI: &str = "mcp://text-summarizer/presets";

// Global switch: once we detect raw JSON (no Content-Length) from the client,
// we reply in ND-JSON (one JSON per line, no headers).
static RAW_JSON_MODE: AtomicBool = AtomicBool::new(false);

/// Everything a `summarize` call needs. Shared with blocking worker threads.
pub struct SummaryService {
    pub pipeline: Pipeline,
    pub fetcher: UrlFetcher,
    pub stats: Arc<SummaryStats>,
    pub max_upload_bytes: usize,
    pub default_preset: Preset,
}

/// Where to probe for `health_check`.
#[derive(Debug, Clone)]
pub struct HealthTarget {
    pub backend: String,
    pub ollama_host: String,
    pub hosted_endpoint: Option<String>,
}

pub struct StdioMcpServer {
    service: Arc<SummaryService>,
    health: HealthTarget,
}

struct ToolOutput {
    value: serde_json::Value,
    is_error: bool,
}

impl ToolOutput {
    fn ok(value: serde_json::Value) -> Self {
        Self {
            value,
            is_error: false,
        }
    }
}

impl StdioMcpServer {
    pub fn new(service: Arc<SummaryService>, health: HealthTarget) -> Self {
        Self { service, health }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut reader = std::io::BufReader::new(stdin.lock());
        let mut writer = std::io::BufWriter::new(stdout.lock());
        tracing::info!("run loop started: waiting for framed MCP requests on stdin");
        loop {
            let msg = match read_framed_message_buf(&mut reader) {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(error=?e, "stdin closed or invalid frame");
                    break;
                }
            };
            let req: serde_json::Value = match serde_json::from_slice(&msg) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error=?e, "invalid JSON");
                    continue;
                }
            };

            let method = req.get("method").and_then(|m| m.as_str()).unwrap_or("");
            let id_opt = req.get("id").cloned();
            let id_reply = id_opt.as_ref().filter(|v| !v.is_null()).cloned();
            tracing::debug!(%method, id=?id_opt, "received request");
            match method {
                "initialize" => {
                    let params = req.get("params").cloned().unwrap_or(json!({}));
                    let client_proto = params
                        .get("protocolVersion")
                        .and_then(|x| x.as_str())
                        .unwrap_or("2024-11-05");
                    let result = json!({
                        "protocolVersion": client_proto,
                        "capabilities": {
                            "tools": {"list": true, "call": true},
                            "prompts": {"list": true},
                            "resources": {"list": true, "read": true, "subscribe": false}
                        },
                        "serverInfo": server_info()
                    });
                    if let Some(id) = id_reply.clone() {
                        write_response(&mut writer, id, result)?;
                    }
                }
                "server/info" => {
                    if let Some(id) = id_reply.clone() {
                        write_response(&mut writer, id, json!({"serverInfo": server_info()}))?;
                    }
                }
                "tools/list" => {
                    if let Some(id) = id_reply.clone() {
                        write_response(&mut writer, id, json!({"tools": list_tools_schema()}))?;
                    }
                }
                "prompts/list" => {
                    if let Some(id) = id_reply.clone() {
                        write_response(&mut writer, id, json!({"prompts": []}))?;
                    }
                }
                "resources/list" => {
                    let resources = vec![
                        json!({
                            "uri": METRICS_URI,
                            "name": "Summary metrics snapshot",
                            "description": "Request counters, compression and backend usage since start",
                            "mimeType": "application/json"
                        }),
                        json!({
                            "uri": PRESETS_URI,
                            "name": "Length presets",
                            "description": "Named sentence and word targets plus custom ranges",
                            "mimeType": "application/json"
                        }),
                    ];
                    if let Some(id) = id_reply.clone() {
                        write_response(&mut writer, id, json!({"resources": resources}))?;
                    }
                }
                "resources/read" => {
                    let params = req.get("params").cloned().unwrap_or(json!({}));
                    let uri = params.get("uri").and_then(|x| x.as_str()).unwrap_or("");
                    let body = match uri {
                        METRICS_URI => self.metrics_json(),
                        PRESETS_URI => self.presets_json(),
                        _ => {
                            if let Some(id) = id_reply.clone() {
                                write_error(&mut writer, id, -32602, "Unknown resource uri")?;
                            }
                            continue;
                        }
                    };
                    let contents = vec![json!({
                        "uri": uri,
                        "mimeType": "application/json",
                        "text": serde_json::to_string_pretty(&body).unwrap_or_else(|_| "{}".into())
                    })];
                    if let Some(id) = id_reply.clone() {
                        write_response(&mut writer, id, json!({"contents": contents}))?;
                    }
                }
                "tools/call" => {
                    let params = req.get("params").cloned().unwrap_or(json!({}));
                    let name = params.get("name").and_then(|x| x.as_str()).unwrap_or("");
                    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
                    match self.dispatch_tool(name, arguments).await {
                        Ok(out) => {
                            if let Some(id) = id_reply.clone() {
                                write_response(
                                    &mut writer,
                                    id,
                                    json!({"content": [{"type":"json","json": out.value}], "isError": out.is_error}),
                                )?;
                            }
                        }
                        Err(e) => {
                            if let Some(id) = id_reply.clone() {
                                write_error(&mut writer, id, -32001, &format!("{e}"))?;
                            }
                        }
                    }
                }
                _ => {
                    // Do not respond to notifications (no id)
                    if let Some(id) = id_reply.clone() {
                        write_error(&mut writer, id, -32601, "method not found")?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn dispatch_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> anyhow::Result<ToolOutput> {
        match name {
            "summarize" => {
                let args: SummarizeArgs = serde_json::from_value(arguments)?;
                let input = args.input()?;
                let service = self.service.clone();
                let result =
                    tokio::task::spawn_blocking(move || service.handle(input, &args)).await?;
                Ok(ToolOutput {
                    is_error: !result.is_ok(),
                    value: serde_json::to_value(result)?,
                })
            }
            "list_presets" => Ok(ToolOutput::ok(self.presets_json())),
            "metrics" => Ok(ToolOutput::ok(self.metrics_json())),
            "health_check" => {
                let target = self.health.clone();
                let report = tokio::task::spawn_blocking(move || {
                    health::check_backend(
                        &target.backend,
                        &target.ollama_host,
                        target.hosted_endpoint.as_deref(),
                    )
                })
                .await?;
                Ok(ToolOutput::ok(json!({
                    "backend": report,
                    "server": server_info()
                })))
            }
            _ => anyhow::bail!("unknown tool: {name}"),
        }
    }

    fn metrics_json(&self) -> serde_json::Value {
        json!({
            "backend": self.service.pipeline.backend_name(),
            "stats": self.service.stats.snapshot()
        })
    }

    fn presets_json(&self) -> serde_json::Value {
        let presets: Vec<_> = Preset::ALL
            .into_iter()
            .map(|p| {
                let (sentences, words) = p.counts();
                json!({"name": p.name(), "target_sentences": sentences, "target_words": words})
            })
            .collect();
        json!({
            "presets": presets,
            "default": self.service.default_preset.name(),
            "custom": {
                "target_sentences": [CUSTOM_SENTENCE_RANGE.0, CUSTOM_SENTENCE_RANGE.1],
                "target_words": [CUSTOM_WORD_RANGE.0, CUSTOM_WORD_RANGE.1]
            }
        })
    }
}

/// Which of the three input fields a `summarize` call used.
enum Input {
    Text(String),
    Url(String),
    File { data: String, mime: String, name: String },
}

impl Input {
    fn source(&self) -> String {
        match self {
            Input::Text(_) => "pasted".to_string(),
            Input::Url(u) => format!("url:{u}"),
            Input::File { name, .. } => format!("file:{name}"),
        }
    }
}

impl SummaryService {
    fn handle(&self, input: Input, args: &SummarizeArgs) -> SummaryResult {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("summarize", %request_id);
        let _guard = span.enter();
        let started = Instant::now();
        let source = input.source();

        let result = match args.target(self.default_preset) {
            Err(e) => SummaryResult::failure(e.to_string(), source, started.elapsed().as_secs_f64()),
            Ok(target) => match self.acquire(input) {
                Err(e) => {
                    tracing::warn!(%source, error=%e, "acquisition failed");
                    SummaryResult::failure(e.to_string(), source, started.elapsed().as_secs_f64())
                }
                Ok(doc) => {
                    let mut result = self.pipeline.run(&doc, &target);
                    result.elapsed_seconds = started.elapsed().as_secs_f64();
                    result
                }
            },
        };

        self.stats.record(&result);
        tracing::info!(
            source=%result.source,
            backend=%result.backend,
            status=?result.status,
            sentence_count=result.sentence_count,
            compression_pct=result.compression_pct,
            elapsed_ms=started.elapsed().as_millis() as u64,
            "summarize finished"
        );
        result
    }

    fn acquire(&self, input: Input) -> Result<Document, AcquireError> {
        match input {
            Input::Text(text) => Ok(Document::pasted(text)),
            Input::Url(url) => self.fetcher.fetch_url(&url),
            Input::File { data, mime, name } => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data.trim())
                    .map_err(|e| AcquireError::MalformedUpload(format!("invalid base64: {e}")))?;
                extract_file(&bytes, &mime, &name, self.max_upload_bytes)
            }
        }
    }
}

fn server_info() -> serde_json::Value {
    json!({"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")})
}

fn list_tools_schema() -> Vec<serde_json::Value> {
    vec![
        json!({"name":"summarize","description":"Extractive summary of pasted text, an uploaded file or a web page","inputSchema":{"type":"object","properties":{
            "text": {"type":"string","description":"Text to summarize"},
            "url": {"type":"string","description":"http(s) page or document to fetch"},
            "file_base64": {"type":"string","description":"Uploaded file, base64 encoded"},
            "mime_type": {"type":"string","enum":["text/plain","text/markdown","text/csv","text/html","application/pdf"]},
            "file_name": {"type":"string"},
            "preset": {"type":"string","enum":["tweet","quick","executive","detailed"]},
            "target_sentences": {"type":"number","minimum": CUSTOM_SENTENCE_RANGE.0,"maximum": CUSTOM_SENTENCE_RANGE.1},
            "target_words": {"type":"number","minimum": CUSTOM_WORD_RANGE.0,"maximum": CUSTOM_WORD_RANGE.1},
            "priority": {"type":"string","enum":["sentences-first","words-first"]},
            "selection": {"type":"string","enum":["ranked","positional"]}
        }}}),
        json!({"name":"list_presets","description":"Named length presets and custom target ranges","inputSchema": {"type":"object","properties":{}}}),
        json!({"name":"metrics","description":"Return summary request metrics","inputSchema": {"type":"object","properties":{}}}),
        json!({"name":"health_check","description":"Reachability of the configured summary backend","inputSchema": {"type":"object","properties":{}}}),
    ]
}

fn read_framed_message_buf<R: std::io::BufRead>(bufreader: &mut R) -> anyhow::Result<Vec<u8>> {
    let mut header = String::new();
    let mut content_length: Option<usize> = None;
    let mut header_lines: usize = 0;
    loop {
        header.clear();
        let n = bufreader.read_line(&mut header)?;
        if n == 0 {
            anyhow::bail!("eof");
        }
        let line = header.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        header_lines += 1;
        tracing::trace!(%line, "framing header line");
        // Fallback for clients that send newline-delimited raw JSON instead of framed headers
        if header_lines == 1 && line.starts_with('{') && line.contains("\"jsonrpc\"") {
            tracing::debug!("detected raw JSON line without Content-Length; accepting as body");
            RAW_JSON_MODE.store(true, Ordering::Relaxed);
            return Ok(line.as_bytes().to_vec());
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = Some(value.trim().parse::<usize>()?);
            }
        }
    }
    let len = content_length.ok_or_else(|| anyhow::anyhow!("missing Content-Length"))?;
    let mut body = vec![0u8; len];
    bufreader.read_exact(&mut body)?;
    tracing::trace!(header_lines, content_length = len, "framed message parsed");
    Ok(body)
}

fn write_response<W: Write>(
    writer: &mut W,
    id: serde_json::Value,
    result: serde_json::Value,
) -> anyhow::Result<()> {
    let resp = json!({"jsonrpc":"2.0","id": id, "result": result});
    write_framed(writer, &resp)
}

fn write_error<W: Write>(
    writer: &mut W,
    id: serde_json::Value,
    code: i64,
    message: &str,
) -> anyhow::Result<()> {
    let resp = json!({"jsonrpc":"2.0","id": id, "error": {"code": code, "message": message}});
    write_framed(writer, &resp)
}

fn write_framed<W: Write>(writer: &mut W, v: &serde_json::Value) -> anyhow::Result<()> {
    let s = serde_json::to_string(v)?;
    // ND-JSON once detected (or forced), Content-Length framing otherwise.
    let force_ndjson = std::env::var("MCP_FORCE_NDJSON").ok().as_deref() == Some("1");
    if force_ndjson || RAW_JSON_MODE.load(Ordering::Relaxed) {
        writeln!(writer, "{s}")?;
    } else {
        write!(writer, "Content-Length: {}\r\n\r\n{}", s.len(), s)?;
    }
    writer.flush()?;
    Ok(())
}

// Wire struct for the summarize tool
#[derive(Debug, Default, Deserialize)]
struct SummarizeArgs {
    text: Option<String>,
    url: Option<String>,
    file_base64: Option<String>,
    mime_type: Option<String>,
    file_name: Option<String>,
    preset: Option<String>,
    target_sentences: Option<usize>,
    target_words: Option<usize>,
    priority: Option<String>,
    selection: Option<String>,
}

impl SummarizeArgs {
    /// Exactly one input field must be set; anything else is a malformed call.
    fn input(&self) -> anyhow::Result<Input> {
        let given = [self.text.is_some(), self.url.is_some(), self.file_base64.is_some()]
            .into_iter()
            .filter(|set| *set)
            .count();
        if given != 1 {
            anyhow::bail!("provide exactly one of text, url or file_base64");
        }
        if let Some(text) = &self.text {
            return Ok(Input::Text(text.clone()));
        }
        if let Some(url) = &self.url {
            return Ok(Input::Url(url.clone()));
        }
        let data = self.file_base64.clone().unwrap_or_default();
        let name = self
            .file_name
            .clone()
            .unwrap_or_else(|| "upload".to_string());
        let mime = self
            .mime_type
            .clone()
            .unwrap_or_else(|| guess_mime(&name).to_string());
        Ok(Input::File { data, mime, name })
    }

    /// Custom counts win over a preset; a missing count comes from the default preset.
    fn target(&self, default_preset: Preset) -> Result<TargetSpec, SummarizeError> {
        let base = match &self.preset {
            Some(name) => TargetSpec::from_preset(name.parse()?),
            None => TargetSpec::from_preset(default_preset),
        };
        let mut target = if self.target_sentences.is_some() || self.target_words.is_some() {
            TargetSpec::custom(
                self.target_sentences.unwrap_or(base.target_sentences),
                self.target_words.unwrap_or(base.target_words),
            )?
        } else {
            base
        };
        if let Some(p) = &self.priority {
            target = target.with_priority(p.parse::<Priority>()?);
        }
        if let Some(s) = &self.selection {
            target = target.with_selection(s.parse::<SelectionMode>()?);
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::Summarizer;
    use std::time::Duration;

    const AI_SAMPLE: &str = include_str!("../tests/fixtures/ai_sample.txt");

    struct FailingBackend;
    impl Summarizer for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn draft(&self, _: &str, _: usize, _: usize) -> Result<String, crate::errors::BackendError> {
            Err(crate::errors::BackendError::Unavailable("offline".into()))
        }
    }

    fn server_with(pipeline: Pipeline) -> StdioMcpServer {
        let service = SummaryService {
            pipeline,
            fetcher: UrlFetcher::new(Duration::from_secs(2), 1024 * 1024).unwrap(),
            stats: Arc::new(SummaryStats::new()),
            max_upload_bytes: 1024 * 1024,
            default_preset: Preset::Quick,
        };
        StdioMcpServer::new(
            Arc::new(service),
            HealthTarget {
                backend: "extractive".into(),
                ollama_host: "http://127.0.0.1:11434".into(),
                hosted_endpoint: None,
            },
        )
    }

    fn server() -> StdioMcpServer {
        server_with(Pipeline::extractive())
    }

    // The blocking HTTP client must be built and dropped outside the runtime.
    fn call(server: &StdioMcpServer, tool: &str, args: serde_json::Value) -> anyhow::Result<ToolOutput> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(server.dispatch_tool(tool, args))
    }

    #[test]
    fn framed_write_and_read_roundtrip() {
        let v = json!({"jsonrpc":"2.0","id":1,"result":{"ok":true}});
        let mut out = Vec::new();
        write_framed(&mut out, &v).expect("write");
        let mut bufreader = std::io::BufReader::new(std::io::Cursor::new(out));
        let body = read_framed_message_buf(&mut bufreader).expect("read");
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn raw_json_line_is_accepted() {
        let line = b"{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"tools/list\"}\n".to_vec();
        let mut bufreader = std::io::BufReader::new(std::io::Cursor::new(line));
        let body = read_framed_message_buf(&mut bufreader).expect("read");
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["id"], 7);
    }

    #[test]
    fn summarize_pasted_text() {
        let server = server();
        let out = call(&server, "summarize", json!({"text": AI_SAMPLE, "preset": "tweet"}))
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(out.value["status"], "ok");
        assert_eq!(out.value["sentence_count"], 2);
        assert_eq!(out.value["source"], "pasted");
        assert_eq!(out.value["backend"], "extractive");

        let metrics = call(&server, "metrics", json!({})).unwrap();
        assert_eq!(metrics.value["stats"]["requests"], 1);
        assert_eq!(metrics.value["stats"]["succeeded"], 1);
    }

    #[test]
    fn short_text_is_an_error_result() {
        let out = call(&server(), "summarize", json!({"text": "Too short."}))
            .unwrap();
        assert!(out.is_error);
        assert_eq!(out.value["status"], "error");
        let detail = out.value["error_detail"].as_str().unwrap();
        assert!(detail.contains("input too short"), "{detail}");
    }

    #[test]
    fn bad_upload_is_an_error_result() {
        let out = call(&server(), "summarize", json!({"file_base64": "@@not base64@@", "file_name": "notes.txt"}))
            .unwrap();
        assert!(out.is_error);
        assert_eq!(out.value["source"], "file:notes.txt");
        assert!(out.value["error_detail"]
            .as_str()
            .unwrap()
            .starts_with("could not read the file"));
    }

    #[test]
    fn uploaded_file_is_summarized() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(AI_SAMPLE);
        let out = call(&server(), "summarize", json!({"file_base64": encoded, "file_name": "ai.txt", "target_sentences": 3, "target_words": 60}))
            .unwrap();
        assert!(!out.is_error, "{:?}", out.value);
        assert_eq!(out.value["sentence_count"], 3);
        assert_eq!(out.value["source"], "file:ai.txt");
    }

    #[test]
    fn invalid_targets_are_error_results() {
        let server = server();
        let out = call(&server, "summarize", json!({"text": AI_SAMPLE, "target_sentences": 40}))
            .unwrap();
        assert!(out.is_error);
        assert!(out.value["error_detail"]
            .as_str()
            .unwrap()
            .contains("target_sentences"));

        let out = call(&server, "summarize", json!({"text": AI_SAMPLE, "priority": "sideways"}))
            .unwrap();
        assert!(out.is_error);
    }

    #[test]
    fn input_fields_are_mutually_exclusive() {
        let server = server();
        assert!(call(&server, "summarize", json!({"text": AI_SAMPLE, "url": "https://example.com"}))
            .is_err());
        assert!(call(&server, "summarize", json!({})).is_err());
        assert!(call(&server, "no_such_tool", json!({})).is_err());
    }

    #[test]
    fn backend_failure_falls_back() {
        let server = server_with(Pipeline::new(Some(Arc::new(FailingBackend)), 50));
        let out = call(&server, "summarize", json!({"text": AI_SAMPLE}))
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(out.value["backend"], "extractive");
        assert_eq!(out.value["backend_fallback"], true);

        let metrics = call(&server, "metrics", json!({})).unwrap();
        assert_eq!(metrics.value["backend"], "failing");
        assert_eq!(metrics.value["stats"]["backend_fallbacks"], 1);
    }

    #[test]
    fn presets_and_health() {
        let server = server();
        let out = call(&server, "list_presets", json!({})).unwrap();
        assert_eq!(out.value["presets"].as_array().unwrap().len(), 4);
        assert_eq!(out.value["default"], "quick");

        let health = call(&server, "health_check", json!({})).unwrap();
        assert_eq!(health.value["backend"]["ok"], true);
        assert_eq!(health.value["server"]["name"], SERVER_NAME);
    }

    #[test]
    fn target_resolution() {
        let args = SummarizeArgs {
            preset: Some("detailed".into()),
            selection: Some("positional".into()),
            ..Default::default()
        };
        let t = args.target(Preset::Quick).unwrap();
        assert_eq!((t.target_sentences, t.target_words), (10, 170));
        assert_eq!(t.selection, SelectionMode::Positional);

        let args = SummarizeArgs {
            target_words: Some(200),
            ..Default::default()
        };
        let t = args.target(Preset::Executive).unwrap();
        assert_eq!((t.target_sentences, t.target_words), (7, 200));
    }
}
