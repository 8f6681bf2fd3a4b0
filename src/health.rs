use serde::Serialize;
use std::process::Command;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Serialize)]
pub struct BackendHealth {
    pub backend: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn probe_client() -> Option<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .ok()
}

pub fn check_ollama(host: &str) -> bool {
    let url = format!("{}/api/tags", host.trim_end_matches('/'));
    probe_client()
        .and_then(|c| c.get(url).send().ok())
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}

/// Any HTTP answer counts: inference endpoints reject a bare GET with 4xx.
pub fn check_hosted(endpoint: &str) -> bool {
    probe_client()
        .and_then(|c| c.get(endpoint).send().ok())
        .map(|r| !r.status().is_server_error())
        .unwrap_or(false)
}

pub fn check_llama_cpp_cli() -> bool {
    let cli = std::env::var("LLAMA_CPP_CLI").unwrap_or_else(|_| "llama-cli".to_string());
    let Ok(path) = which::which(&cli) else {
        return false;
    };
    Command::new(path).arg("-h").output().is_ok()
}

/// Probes whichever backend is configured. The extractive path is always healthy.
pub fn check_backend(
    backend: &str,
    ollama_host: &str,
    hosted_endpoint: Option<&str>,
) -> BackendHealth {
    let (ok, detail) = match backend {
        "ollama" => (check_ollama(ollama_host), Some(ollama_host.to_string())),
        "hosted" => match hosted_endpoint {
            Some(ep) => (check_hosted(ep), Some(ep.to_string())),
            None => (false, Some("no endpoint configured".to_string())),
        },
        "llama_cpp" => (check_llama_cpp_cli(), None),
        _ => (true, None),
    };
    BackendHealth {
        backend: backend.to_string(),
        ok,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn extractive_is_always_healthy() {
        let h = check_backend("extractive", "http://127.0.0.1:1", None);
        assert!(h.ok);
        assert!(h.detail.is_none());
    }

    #[test]
    fn hosted_without_endpoint_is_unhealthy() {
        let h = check_backend("hosted", "http://127.0.0.1:1", None);
        assert!(!h.ok);
    }

    #[test]
    fn ollama_probe_hits_tags() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 2048];
            let n = stream.read(&mut buf).unwrap();
            let req = String::from_utf8_lossy(&buf[..n]).to_string();
            let body = r#"{"models":[]}"#;
            let _ = stream.write_all(
                format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                )
                .as_bytes(),
            );
            req
        });
        assert!(check_ollama(&format!("http://{addr}/")));
        let req = handle.join().unwrap();
        assert!(req.starts_with("GET /api/tags"));
    }

    #[test]
    fn unreachable_ollama_is_unhealthy() {
        // bind then drop to get a port nobody listens on
        let port = TcpListener::bind(("127.0.0.1", 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        assert!(!check_ollama(&format!("http://127.0.0.1:{port}")));
    }
}
