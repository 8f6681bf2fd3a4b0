use crate::errors::BackendError;
use crate::summarize::{draft_prompt, Summarizer};
use reqwest::blocking::Client;
use std::time::Duration;

pub struct OllamaSummarizer {
    host: String,
    model: String,
    timeout: Duration,
    attempts: u32,
    client: Client,
}

impl OllamaSummarizer {
    pub fn new(host: String, model: String, timeout: Duration, attempts: u32) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            host,
            model,
            timeout,
            attempts: attempts.max(1),
            client,
        })
    }
}

impl Summarizer for OllamaSummarizer {
    fn name(&self) -> &str {
        "ollama"
    }

    fn draft(&self, text: &str, max_len: usize, min_len: usize) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.host.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "prompt": draft_prompt(text, max_len, min_len),
            // words to tokens, roughly
            "options": { "temperature": 0.2, "top_p": 0.9, "num_predict": max_len * 2 },
            "stream": false,
        });

        let mut last_err: Option<BackendError> = None;
        for attempt in 0..self.attempts {
            match self.client.post(&url).json(&body).send() {
                Ok(resp) if resp.status().is_success() => {
                    let v: serde_json::Value = resp
                        .json()
                        .map_err(|e| BackendError::Malformed(format!("decode response: {e}")))?;
                    let summary = v
                        .get("response")
                        .and_then(|x| x.as_str())
                        .map(str::trim)
                        .unwrap_or("");
                    if summary.is_empty() {
                        return Err(BackendError::Malformed("empty response field".into()));
                    }
                    return Ok(summary.to_string());
                }
                Ok(resp) => {
                    last_err = Some(BackendError::Http(format!(
                        "status {} from {}",
                        resp.status(),
                        self.host
                    )));
                }
                Err(e) if e.is_timeout() => {
                    last_err = Some(BackendError::Timeout(self.timeout.as_secs()));
                }
                Err(e) => {
                    last_err = Some(BackendError::Http(format!("connect {}: {}", self.host, e)));
                }
            }
            tracing::debug!(attempt, host=%self.host, "ollama attempt failed");
            if attempt + 1 < self.attempts {
                std::thread::sleep(Duration::from_millis(100 * u64::from(attempt + 1)));
            }
        }
        Err(last_err.unwrap_or_else(|| BackendError::Http("ollama request failed".into())))
    }
}
