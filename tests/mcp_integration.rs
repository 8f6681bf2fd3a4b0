use assert_cmd::prelude::*;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::Duration;

const AI_SAMPLE: &str = include_str!("fixtures/ai_sample.txt");

fn write_framed<W: Write>(w: &mut W, v: &serde_json::Value) {
    let s = serde_json::to_string(v).unwrap();
    write!(w, "Content-Length: {}\r\n\r\n{}", s.len(), s).unwrap();
    w.flush().unwrap();
}

fn read_framed<R: Read>(r: &mut R) -> serde_json::Value {
    use std::io::BufRead;
    let mut reader = std::io::BufReader::new(r);
    let mut header = String::new();
    let mut content_length: Option<usize> = None;
    loop {
        header.clear();
        let n = reader.read_line(&mut header).unwrap();
        assert!(n > 0, "unexpected eof reading header");
        let line = header.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        if let Some(rest) = line.strip_prefix("Content-Length:") {
            content_length = Some(rest.trim().parse::<usize>().unwrap());
        }
    }
    let len = content_length.expect("missing Content-Length");
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn tool_json(resp: &serde_json::Value) -> &serde_json::Value {
    resp.get("result")
        .and_then(|r| r.get("content"))
        .and_then(|c| c.get(0))
        .and_then(|j| j.get("json"))
        .expect("tool result json")
}

#[test]
fn mcp_end_to_end() {
    let mut cmd = Command::cargo_bin("text-summarizer").unwrap();
    let mut child = cmd
        .env("SUMMARY_BACKEND", "extractive")
        .env("DEFAULT_PRESET", "quick")
        .env_remove("MCP_FORCE_NDJSON")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = child.stdout.take().unwrap();

    // initialize
    write_framed(
        &mut stdin,
        &serde_json::json!({"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}),
    );
    let resp = read_framed(&mut stdout);
    assert_eq!(resp.get("id").and_then(|x| x.as_i64()), Some(1));
    assert_eq!(resp["result"]["serverInfo"]["name"], "text-summarizer");

    // notifications get no reply; the next frame read must belong to id 2
    write_framed(
        &mut stdin,
        &serde_json::json!({"jsonrpc":"2.0","method":"notifications/initialized"}),
    );

    // tools/list
    write_framed(
        &mut stdin,
        &serde_json::json!({"jsonrpc":"2.0","id":2,"method":"tools/list"}),
    );
    let resp = read_framed(&mut stdout);
    assert_eq!(resp.get("id").and_then(|x| x.as_i64()), Some(2));
    let tools = resp["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(names, ["summarize", "list_presets", "metrics", "health_check"]);

    // summarize the sample with three sentences
    write_framed(
        &mut stdin,
        &serde_json::json!({
            "jsonrpc":"2.0","id":3,"method":"tools/call",
            "params": {"name":"summarize","arguments":{"text": AI_SAMPLE, "target_sentences": 3, "target_words": 60}}
        }),
    );
    let resp = read_framed(&mut stdout);
    assert_eq!(resp["result"]["isError"], false);
    let summary = tool_json(&resp);
    assert_eq!(summary["status"], "ok");
    assert_eq!(summary["sentence_count"], 3);
    assert_eq!(summary["original_word_count"], 288);
    let pct = summary["compression_pct"].as_f64().unwrap();
    assert!((60.0..=90.0).contains(&pct), "compression {pct}");
    let text = summary["text"].as_str().unwrap();
    assert!(text.contains("about two billion people"), "{text}");

    // too-short input comes back as an error result, not a protocol error
    write_framed(
        &mut stdin,
        &serde_json::json!({
            "jsonrpc":"2.0","id":4,"method":"tools/call",
            "params": {"name":"summarize","arguments":{"text": "Far too short."}}
        }),
    );
    let resp = read_framed(&mut stdout);
    assert_eq!(resp["result"]["isError"], true);
    assert_eq!(tool_json(&resp)["status"], "error");

    // metrics resource reflects both requests
    write_framed(
        &mut stdin,
        &serde_json::json!({
            "jsonrpc":"2.0","id":5,"method":"resources/read",
            "params": {"uri": "mcp://text-summarizer/metrics"}
        }),
    );
    let resp = read_framed(&mut stdout);
    let text = resp["result"]["contents"][0]["text"].as_str().unwrap();
    let metrics: serde_json::Value = serde_json::from_str(text).unwrap();
    assert_eq!(metrics["stats"]["requests"], 2);
    assert_eq!(metrics["stats"]["failed"], 1);

    // unknown method
    write_framed(
        &mut stdin,
        &serde_json::json!({"jsonrpc":"2.0","id":6,"method":"completion/complete"}),
    );
    let resp = read_framed(&mut stdout);
    assert_eq!(resp["error"]["code"], -32601);

    // close stdin to signal server to exit, then best-effort shutdown
    drop(stdin);
    std::thread::sleep(Duration::from_millis(300));
    let _ = child.try_wait();
    let _ = child.kill();
}
