use crate::pipeline::target::Preset;
use crate::pipeline::DEFAULT_MIN_INPUT_CHARS;
use crate::summarize::BackendOptions;
use clap::Parser;
use std::time::Duration;

pub const BACKENDS: [&str; 4] = ["extractive", "ollama", "hosted", "llama_cpp"];

#[derive(Debug, Clone, Parser)]
#[command(name = "text-summarizer")]
#[command(about = "MCP server that summarizes pasted text, uploads and web pages", long_about = None)]
pub struct AppConfig {
    #[arg(long, env = "SUMMARY_BACKEND", default_value = "extractive")]
    pub summary_backend: String,

    /// Model name for ollama, or path to a GGUF file for llama_cpp.
    #[arg(long, env = "SUMMARY_MODEL", default_value = "llama3.2:3b-instruct")]
    pub summary_model: String,

    #[arg(long, env = "OLLAMA_HOST", default_value = "http://127.0.0.1:11434")]
    pub ollama_host: String,

    #[arg(long, env = "HOSTED_ENDPOINT")]
    pub hosted_endpoint: Option<String>,

    #[arg(long, env = "HOSTED_TOKEN", hide_env_values = true)]
    pub hosted_token: Option<String>,

    #[arg(long, env = "BACKEND_TIMEOUT_SECS", default_value_t = 20)]
    pub backend_timeout_secs: u64,

    #[arg(long, env = "BACKEND_ATTEMPTS", default_value_t = 2)]
    pub backend_attempts: u32,

    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 15)]
    pub fetch_timeout_secs: u64,

    #[arg(long, env = "MIN_INPUT_CHARS", default_value_t = DEFAULT_MIN_INPUT_CHARS)]
    pub min_input_chars: usize,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    #[arg(long, env = "DEFAULT_PRESET", default_value = "quick")]
    pub default_preset: String,
}

impl AppConfig {
    pub fn from_env_and_args() -> Self {
        Self::parse()
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            model: self.summary_model.clone(),
            ollama_host: self.ollama_host.clone(),
            hosted_endpoint: self.hosted_endpoint.clone(),
            hosted_token: self.hosted_token.clone(),
            timeout: Duration::from_secs(self.backend_timeout_secs),
            attempts: self.backend_attempts,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Falls back to `quick` when the configured preset is unknown.
    pub fn default_preset(&self) -> Preset {
        self.default_preset.parse().unwrap_or(Preset::Quick)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !BACKENDS.contains(&self.summary_backend.as_str()) {
            return Err(format!(
                "unknown SUMMARY_BACKEND '{}' (expected one of {})",
                self.summary_backend,
                BACKENDS.join(", ")
            ));
        }
        if self.backend_timeout_secs == 0 || self.backend_timeout_secs > 300 {
            return Err("backend_timeout_secs must be in 1..=300".into());
        }
        if self.backend_attempts == 0 || self.backend_attempts > 5 {
            return Err("backend_attempts must be in 1..=5".into());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("fetch_timeout_secs must be > 0".into());
        }
        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be > 0".into());
        }
        if self.max_upload_bytes > 100 * 1024 * 1024 {
            return Err("max_upload_bytes too large (max 100MB)".into());
        }
        if self.default_preset.parse::<Preset>().is_err() {
            return Err(format!("unknown DEFAULT_PRESET '{}'", self.default_preset));
        }
        match self.summary_backend.as_str() {
            "ollama" => {
                url::Url::parse(&self.ollama_host)
                    .map_err(|_| "Invalid OLLAMA_HOST URL format".to_string())?;
            }
            "hosted" => {
                let endpoint = self
                    .hosted_endpoint
                    .as_deref()
                    .ok_or_else(|| "HOSTED_ENDPOINT is required for the hosted backend".to_string())?;
                url::Url::parse(endpoint)
                    .map_err(|_| "Invalid HOSTED_ENDPOINT URL format".to_string())?;
            }
            "llama_cpp" => {
                if !cfg!(feature = "summarizer-llama-cpp") {
                    return Err("llama_cpp backend not compiled in".into());
                }
                if !std::path::Path::new(&self.summary_model).exists() {
                    return Err("llama.cpp model file does not exist".into());
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppConfig {
        let mut argv = vec!["text-summarizer"];
        argv.extend_from_slice(args);
        AppConfig::try_parse_from(argv).expect("parse")
    }

    #[test]
    fn explicit_extractive_config_is_valid() {
        let cfg = parse(&["--summary-backend", "extractive", "--default-preset", "quick"]);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.default_preset(), Preset::Quick);
    }

    #[test]
    fn rejects_unknown_backend_and_bad_urls() {
        let cfg = parse(&["--summary-backend", "gpt"]);
        assert!(cfg.validate().unwrap_err().contains("unknown SUMMARY_BACKEND"));

        let cfg = parse(&["--summary-backend", "ollama", "--ollama-host", "not a url"]);
        assert!(cfg.validate().is_err());

        let cfg = parse(&["--summary-backend", "hosted"]);
        assert!(cfg.validate().unwrap_err().contains("HOSTED_ENDPOINT"));
    }

    #[test]
    fn rejects_out_of_range_limits() {
        let cfg = parse(&["--summary-backend", "extractive", "--backend-timeout-secs", "0"]);
        assert!(cfg.validate().is_err());
        let cfg = parse(&["--summary-backend", "extractive", "--default-preset", "novella"]);
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.default_preset(), Preset::Quick);
    }

    #[test]
    fn backend_options_carry_timeout() {
        let cfg = parse(&["--summary-backend", "extractive", "--backend-timeout-secs", "12"]);
        assert_eq!(cfg.backend_options().timeout, Duration::from_secs(12));
    }
}
