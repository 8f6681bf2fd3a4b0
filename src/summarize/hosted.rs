//! Remote summarization endpoint speaking the common inference-API shape:
//! `{"inputs": ..., "parameters": {"max_length", "min_length"}}` in,
//! `[{"summary_text": ...}]` out.

use crate::errors::BackendError;
use crate::summarize::Summarizer;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// Models behind these endpoints truncate long inputs anyway.
const MAX_INPUT_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
struct SummaryItem {
    summary_text: String,
}

pub struct HostedSummarizer {
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
    attempts: u32,
    client: Client,
}

impl HostedSummarizer {
    pub fn new(
        endpoint: String,
        token: Option<String>,
        timeout: Duration,
        attempts: u32,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            endpoint,
            token,
            timeout,
            attempts: attempts.max(1),
            client,
        })
    }

    fn request_once(&self, body: &serde_json::Value) -> Result<String, BackendError> {
        let mut req = self.client.post(&self.endpoint).json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout.as_secs())
            } else {
                BackendError::Http(format!("connect {}: {e}", self.endpoint))
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Http(format!("status {status} from {}", self.endpoint)));
        }
        let items: Vec<SummaryItem> = resp
            .json()
            .map_err(|e| BackendError::Malformed(format!("decode response: {e}")))?;
        items
            .into_iter()
            .next()
            .map(|item| item.summary_text.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BackendError::Malformed("no summary_text in response".into()))
    }
}

impl Summarizer for HostedSummarizer {
    fn name(&self) -> &str {
        "hosted"
    }

    fn draft(&self, text: &str, max_len: usize, min_len: usize) -> Result<String, BackendError> {
        let input: String = text.chars().take(MAX_INPUT_CHARS).collect();
        let body = serde_json::json!({
            "inputs": input,
            "parameters": {
                "max_length": max_len,
                "min_length": min_len,
                "do_sample": false,
            },
        });

        let mut last_err = None;
        for attempt in 0..self.attempts {
            match self.request_once(&body) {
                Ok(summary) => return Ok(summary),
                // a bad payload will not improve on retry
                Err(e @ BackendError::Malformed(_)) => return Err(e),
                Err(e) => {
                    tracing::debug!(attempt, error=%e, "hosted attempt failed");
                    last_err = Some(e);
                }
            }
            if attempt + 1 < self.attempts {
                std::thread::sleep(Duration::from_millis(200 * u64::from(attempt + 1)));
            }
        }
        Err(last_err.unwrap_or_else(|| BackendError::Http("hosted request failed".into())))
    }
}
