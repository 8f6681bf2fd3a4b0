//! Turns uploads and URLs into plain-text documents.
//!
//! Nothing here summarizes; callers get a [`Document`] or a descriptive error and
//! the pipeline is never invoked on failure.

use crate::errors::AcquireError;
use crate::pipeline::Document;
use reqwest::blocking::Client;
use std::io::{Cursor, Read};
use std::time::Duration;

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_HTML: &str = "text/html";
pub const MIME_PDF: &str = "application/pdf";

/// Wide enough that html2text never wraps; whitespace is collapsed later anyway.
const HTML_WIDTH: usize = 10_000;

pub fn html_to_text(html: &str) -> String {
    html2text::from_read(Cursor::new(html.as_bytes()), HTML_WIDTH)
}

/// Best guess from a file name when the caller sent no MIME type.
pub fn guess_mime(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => MIME_PDF,
        "html" | "htm" => MIME_HTML,
        "md" | "markdown" => MIME_MARKDOWN,
        "csv" => MIME_CSV,
        _ => MIME_TEXT,
    }
}

/// Drops parameters (`; charset=utf-8`) and case.
fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn decode_bytes(bytes: &[u8], mime_type: &str) -> Result<String, AcquireError> {
    match essence(mime_type).as_str() {
        MIME_TEXT | MIME_MARKDOWN | MIME_CSV => String::from_utf8(bytes.to_vec())
            .map_err(|e| AcquireError::MalformedUpload(format!("not valid UTF-8: {e}"))),
        MIME_HTML => {
            let html = String::from_utf8_lossy(bytes);
            Ok(html_to_text(&html))
        }
        // the PDF parser can panic on hostile input
        MIME_PDF => std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| AcquireError::MalformedUpload("PDF parser aborted".into()))?
            .map_err(|e| AcquireError::MalformedUpload(format!("PDF extraction failed: {e}"))),
        other => Err(AcquireError::UnsupportedContentType(other.to_string())),
    }
}

/// Decodes an uploaded file. `name` only feeds the source tag.
pub fn extract_file(
    bytes: &[u8],
    mime_type: &str,
    name: &str,
    max_bytes: usize,
) -> Result<Document, AcquireError> {
    if bytes.is_empty() {
        return Err(AcquireError::MalformedUpload("file is empty".into()));
    }
    if bytes.len() > max_bytes {
        return Err(AcquireError::MalformedUpload(format!(
            "file is {} bytes (limit {max_bytes})",
            bytes.len()
        )));
    }
    let text = decode_bytes(bytes, mime_type)?;
    if text.trim().is_empty() {
        return Err(AcquireError::MalformedUpload("no text found in file".into()));
    }
    tracing::debug!(%name, bytes = bytes.len(), chars = text.len(), "file decoded");
    Ok(Document::new(text, format!("file:{name}")))
}

pub struct UrlFetcher {
    client: Client,
    max_bytes: usize,
}

impl UrlFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, AcquireError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("text-summarizer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AcquireError::UnreadableUrl(format!("http client: {e}")))?;
        Ok(Self { client, max_bytes })
    }

    /// Fetches a page or document and reduces it to its text.
    pub fn fetch_url(&self, raw: &str) -> Result<Document, AcquireError> {
        let url = url::Url::parse(raw.trim())
            .map_err(|e| AcquireError::UnreadableUrl(format!("{raw}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AcquireError::UnreadableUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| AcquireError::UnreadableUrl(format!("{url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AcquireError::UnreadableUrl(format!("{url}: status {status}")));
        }
        let mime_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(MIME_HTML)
            .to_string();
        let too_large =
            || AcquireError::UnreadableUrl(format!("{url}: body exceeds {} bytes", self.max_bytes));
        if resp.content_length().is_some_and(|len| len > self.max_bytes as u64) {
            return Err(too_large());
        }
        // chunked bodies carry no length; read one byte past the cap to detect overflow
        let mut bytes = Vec::new();
        resp.take(self.max_bytes as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| AcquireError::UnreadableUrl(format!("{url}: {e}")))?;
        if bytes.len() > self.max_bytes {
            return Err(too_large());
        }

        let text = decode_bytes(&bytes, &mime_type).map_err(|e| match e {
            AcquireError::UnsupportedContentType(ct) => AcquireError::UnsupportedContentType(ct),
            other => AcquireError::UnreadableUrl(format!("{url}: {other}")),
        })?;
        if text.trim().is_empty() {
            return Err(AcquireError::UnreadableUrl(format!("{url}: no readable text")));
        }
        tracing::debug!(%url, %mime_type, chars = text.len(), "url fetched");
        Ok(Document::new(text, format!("url:{url}")))
    }
}
