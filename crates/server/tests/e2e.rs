//! Drives the real `pw-dispatch-server` binary over its stdio pipes.

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde_json::{Value, json};

struct Client {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
}

impl Client {
    fn spawn(args: &[&str]) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_pw-dispatch-server"))
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn pw-dispatch-server");
        let stdin = child.stdin.take();
        let stdout = child.stdout.take().unwrap();
        Self {
            child,
            stdin,
            stdout,
        }
    }

    fn send(&mut self, message: Value) {
        let bytes = serde_json::to_vec(&message).unwrap();
        let stdin = self.stdin.as_mut().unwrap();
        stdin.write_all(&(bytes.len() as u32).to_le_bytes()).unwrap();
        stdin.write_all(&bytes).unwrap();
        stdin.flush().unwrap();
    }

    fn recv(&mut self) -> Value {
        let mut len_buf = [0u8; 4];
        self.stdout.read_exact(&mut len_buf).unwrap();
        let mut buf = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        self.stdout.read_exact(&mut buf).unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    /// Reads until the response for `id`, returning it and the events before it.
    fn response(&mut self, id: u32) -> (Vec<Value>, Value) {
        let mut events = Vec::new();
        loop {
            let message = self.recv();
            if message.get("id") == Some(&json!(id)) {
                return (events, message);
            }
            events.push(message);
        }
    }

    fn disconnect(mut self) -> std::process::ExitStatus {
        drop(self.stdin.take());
        self.child.wait().unwrap()
    }
}

#[test]
fn bootstrap_call_and_clean_exit() {
    let mut client = Client::spawn(&["--grace-period", "1"]);

    let selectors = client.recv();
    assert_eq!(selectors["guid"], "");
    assert_eq!(selectors["method"], "__create__");
    assert_eq!(selectors["params"]["type"], "Selectors");
    let selectors_guid = selectors["params"]["guid"].as_str().unwrap().to_string();

    let playwright = client.recv();
    assert_eq!(playwright["params"]["type"], "Playwright");
    assert_eq!(
        playwright["params"]["initializer"]["selectors"]["guid"],
        selectors_guid.as_str()
    );
    let playwright_guid = playwright["params"]["guid"].as_str().unwrap().to_string();

    client.send(json!({"id": 1, "guid": playwright_guid, "method": "newContext", "params": {}}));
    let (events, response) = client.response(1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["params"]["type"], "BrowserContext");
    let context_guid = response["result"]["context"]["guid"].as_str().unwrap().to_string();

    client.send(json!({"id": 2, "guid": "", "method": "debugScopeState"}));
    let (_, response) = client.response(2);
    let children = response["result"]["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[1]["guid"], playwright_guid.as_str());
    assert_eq!(children[1]["children"][0]["guid"], context_guid.as_str());

    client.send(json!({"id": 3, "guid": "Ghost@1", "method": "newContext", "params": {}}));
    let (_, response) = client.response(3);
    assert_eq!(response["error"]["name"], "TargetClosedError");

    client.send(json!({"id": 4, "guid": context_guid, "method": "newElement", "params": {"tagName": 7}}));
    let (_, response) = client.response(4);
    assert_eq!(response["error"]["message"], "tagName: expected string, got number");

    let status = client.disconnect();
    assert!(status.success(), "server exited with {status}");
}

#[test]
fn invalid_schema_file_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    std::fs::write(&path, "not json").unwrap();

    let client = Client::spawn(&["--schema", path.to_str().unwrap()]);
    let status = client.disconnect();
    assert_eq!(status.code(), Some(1));
}
