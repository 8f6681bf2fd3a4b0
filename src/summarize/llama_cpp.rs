use crate::errors::BackendError;
use crate::summarize::{draft_prompt, Summarizer};
use process_control::{ChildExt, Control};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

pub struct LlamaCppSummarizer {
    model_path: PathBuf,
    cli_path: PathBuf,
    timeout: Duration,
}

impl LlamaCppSummarizer {
    /// Resolves the model file and the CLI binary. Meant to run once per process.
    pub fn load(model_path: String, timeout: Duration) -> Result<Self, BackendError> {
        let model_path = PathBuf::from(model_path);
        if !model_path.is_file() {
            return Err(BackendError::Unavailable(format!(
                "llama.cpp model file not found: {}",
                model_path.display()
            )));
        }
        // LLAMA_CPP_CLI overrides the PATH lookup
        let cli = std::env::var("LLAMA_CPP_CLI").unwrap_or_else(|_| "llama-cli".to_string());
        let cli_path = if Path::new(&cli).is_file() {
            PathBuf::from(&cli)
        } else {
            which::which(&cli)
                .map_err(|e| BackendError::Unavailable(format!("{cli} not found: {e}")))?
        };
        tracing::info!(model=%model_path.display(), cli=%cli_path.display(), "llama.cpp backend ready");
        Ok(Self {
            model_path,
            cli_path,
            timeout,
        })
    }
}

impl Summarizer for LlamaCppSummarizer {
    fn name(&self) -> &str {
        "llama_cpp"
    }

    fn draft(&self, text: &str, max_len: usize, min_len: usize) -> Result<String, BackendError> {
        let prompt = draft_prompt(text, max_len, min_len);
        let child = Command::new(&self.cli_path)
            .arg("-m")
            .arg(&self.model_path)
            .arg("-p")
            .arg(&prompt)
            .arg("-n")
            .arg((max_len * 2).to_string())
            .arg("--no-display-prompt")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::Unavailable(format!("spawn {}: {e}", self.cli_path.display())))?;

        let output = child
            .controlled_with_output()
            .time_limit(self.timeout)
            .terminate_for_timeout()
            .wait()
            .map_err(|e| BackendError::Unavailable(format!("wait for llama.cpp: {e}")))?
            .ok_or(BackendError::Timeout(self.timeout.as_secs()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Unavailable(format!(
                "llama.cpp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let out = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if out.is_empty() {
            return Err(BackendError::Malformed("llama.cpp produced no output".into()));
        }
        Ok(out)
    }
}
