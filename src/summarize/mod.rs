use crate::errors::BackendError;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;

/// A model-backed source of draft summaries. The pipeline re-segments whatever
/// comes back, so implementations only need to return prose.
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;
    fn draft(&self, text: &str, max_len: usize, min_len: usize) -> Result<String, BackendError>;
}

mod hosted;
#[cfg(feature = "summarizer-llama-cpp")]
mod llama_cpp;
mod ollama;

pub use hosted::HostedSummarizer;
pub use ollama::OllamaSummarizer;

#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub model: String,
    pub ollama_host: String,
    pub hosted_endpoint: Option<String>,
    pub hosted_token: Option<String>,
    pub timeout: Duration,
    pub attempts: u32,
}

/// `None` means the built-in extractive path handles every request.
pub fn build_summarizer(backend: &str, opts: &BackendOptions) -> Option<Arc<dyn Summarizer>> {
    match backend {
        "ollama" => match OllamaSummarizer::new(
            opts.ollama_host.clone(),
            opts.model.clone(),
            opts.timeout,
            opts.attempts,
        ) {
            Ok(s) => Some(Arc::new(s)),
            Err(e) => {
                tracing::warn!(error=%e, "ollama backend disabled");
                None
            }
        },
        "hosted" => {
            let Some(endpoint) = opts.hosted_endpoint.clone() else {
                tracing::warn!("hosted backend selected without an endpoint; using extractive");
                return None;
            };
            match HostedSummarizer::new(endpoint, opts.hosted_token.clone(), opts.timeout, opts.attempts) {
                Ok(s) => Some(Arc::new(s)),
                Err(e) => {
                    tracing::warn!(error=%e, "hosted backend disabled");
                    None
                }
            }
        }
        #[cfg(feature = "summarizer-llama-cpp")]
        "llama_cpp" => {
            let model = opts.model.clone();
            let timeout = opts.timeout;
            Some(Arc::new(LazySummarizer::new("llama_cpp", move || {
                llama_cpp::LlamaCppSummarizer::load(model.clone(), timeout)
                    .map(|s| Arc::new(s) as Arc<dyn Summarizer>)
            })))
        }
        _ => None,
    }
}

pub(crate) fn draft_prompt(text: &str, max_len: usize, min_len: usize) -> String {
    format!(
        "[System]\nYou are a concise, factual summarizer. Write the summary as plain prose in complete sentences, between {min_len} and {max_len} words. No headings, lists or commentary.\n\n[User]\nText:\n{text}"
    )
}

type InitFn = Box<dyn Fn() -> Result<Arc<dyn Summarizer>, BackendError> + Send + Sync>;

/// Defers loading an expensive backend until the first request needs it. The
/// outcome, success or failure, is cached for the life of the process.
pub struct LazySummarizer {
    name: &'static str,
    init: InitFn,
    handle: OnceCell<Result<Arc<dyn Summarizer>, String>>,
}

impl LazySummarizer {
    pub fn new<F>(name: &'static str, init: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Summarizer>, BackendError> + Send + Sync + 'static,
    {
        Self {
            name,
            init: Box::new(init),
            handle: OnceCell::new(),
        }
    }
}

impl Summarizer for LazySummarizer {
    fn name(&self) -> &str {
        self.name
    }

    fn draft(&self, text: &str, max_len: usize, min_len: usize) -> Result<String, BackendError> {
        let handle = self.handle.get_or_init(|| {
            tracing::info!(backend = self.name, "initializing backend");
            (self.init)().map_err(|e| e.to_string())
        });
        match handle {
            Ok(inner) => inner.draft(text, max_len, min_len),
            Err(msg) => Err(BackendError::Unavailable(msg.clone())),
        }
    }
}
