//! Integration tests for the `atelier serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port,
//! makes HTTP requests, and verifies the responses. GEMINI_API_KEY is
//! removed from the child's environment, so every generation reaches the
//! gateway and fails with a configuration error; that is enough to observe
//! rollback behavior without network access.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use serde_json::Value;

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so parallel `cargo test --workspace` runs
/// (which spawn separate test binaries) don't collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// A served studio; the child process is killed on drop.
struct Server {
    port: u16,
    child: Child,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

/// Helper: start `atelier serve` on a fresh port.
fn start_server(envs: &[(&str, &str)]) -> Server {
    let port = next_port();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_atelier"));
    cmd.arg("serve").arg("--port").arg(port.to_string());
    cmd.env_remove("GEMINI_API_KEY");
    cmd.env_remove("ATELIER_MAX_SESSIONS");
    cmd.env_remove("ATELIER_SESSION_TTL_SECS");
    cmd.env_remove("ATELIER_GEMINI_BASE_URL");
    for (key, value) in envs {
        cmd.env(key, value);
    }
    // Redirect stdout/stderr to avoid blocking
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd.spawn().expect("failed to start atelier serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server { port, child }
}

impl Server {
    /// Make an HTTP request and return (status, body).
    fn request(&self, method: &str, path: &str, body: Option<&str>) -> (u16, String) {
        let mut stream =
            TcpStream::connect(format!("127.0.0.1:{}", self.port)).expect("failed to connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();

        let request = match body {
            Some(body) => format!(
                "{} {} HTTP/1.1\r\nHost: localhost:{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                method, path, self.port, body.len(), body
            ),
            None => format!(
                "{} {} HTTP/1.1\r\nHost: localhost:{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                method, path, self.port
            ),
        };
        std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

        let mut response = String::new();
        let _ = stream.read_to_string(&mut response);

        parse_http_response(&response)
    }

    fn get(&self, path: &str) -> (u16, Value) {
        json(self.request("GET", path, None))
    }

    fn post(&self, path: &str, body: Value) -> (u16, Value) {
        json(self.request("POST", path, Some(&body.to_string())))
    }

    fn post_empty(&self, path: &str) -> (u16, Value) {
        json(self.request("POST", path, None))
    }

    fn delete(&self, path: &str) -> (u16, String) {
        self.request("DELETE", path, None)
    }

    /// Open a session and return its id.
    fn open_session(&self) -> String {
        let (status, body) = self.post_empty("/sessions");
        assert_eq!(status, 201, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Open a session seeded with a model image.
    fn seeded_session(&self) -> String {
        let id = self.open_session();
        let (status, body) = self.post(
            &format!("/sessions/{}/model/finalize", id),
            serde_json::json!({ "image_url": MODEL_IMAGE }),
        );
        assert_eq!(status, 200, "{}", body);
        id
    }
}

const MODEL_IMAGE: &str = "data:image/png;base64,AQID";
const GARMENT_IMAGE: &str = "data:image/png;base64,BAUG";

fn json((status, body): (u16, String)) -> (u16, Value) {
    let value = serde_json::from_str(&body)
        .unwrap_or_else(|e| panic!("invalid JSON ({}): {}", e, body));
    (status, value)
}

/// Parse an HTTP response into (status_code, body).
fn parse_http_response(response: &str) -> (u16, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status_line = headers.lines().next().unwrap_or("");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    // Handle chunked transfer encoding
    let body = if headers.to_lowercase().contains("transfer-encoding: chunked") {
        decode_chunked(&body)
    } else {
        body
    };

    (status, body)
}

/// Decode chunked transfer encoding.
fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = (chunk_start + size).min(remaining.len());
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = remaining.get(chunk_end + 2..).unwrap_or("");
    }

    result
}

// ──────────────────────────────────────────────
// Catalog
// ──────────────────────────────────────────────

#[test]
fn health_returns_200() {
    let server = start_server(&[]);
    let (status, body) = server.get("/health");
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"], 0);
    assert_eq!(body["max_sessions"], 64);
}

#[test]
fn poses_and_wardrobe() {
    let server = start_server(&[]);

    let (status, body) = server.get("/poses");
    assert_eq!(status, 200);
    let poses = body["poses"].as_array().unwrap();
    assert_eq!(poses.len(), 6);
    assert_eq!(poses[1]["index"], 1);
    assert_eq!(poses[1]["instruction"], "Slightly turned, 3/4 view");

    let (status, body) = server.get("/wardrobe");
    assert_eq!(status, 200);
    assert_eq!(body["wardrobe"][0]["id"], "black-jodhpuri");
    assert_eq!(body["wardrobe"][1]["name"], "Purple Business Suit");
}

#[test]
fn unknown_route_is_404_json() {
    let server = start_server(&[]);
    let (status, body) = server.get("/nope");
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not found");
}

// ──────────────────────────────────────────────
// Session lifecycle
// ──────────────────────────────────────────────

#[test]
fn new_session_is_empty() {
    let server = start_server(&[]);
    let id = server.open_session();

    let (status, body) = server.get(&format!("/sessions/{}", id));
    assert_eq!(status, 200);
    let session = &body["session"];
    assert_eq!(session["history_len"], 0);
    assert_eq!(session["display_image"], Value::Null);
    assert_eq!(session["loading"], false);
    assert_eq!(session["pose_index"], 0);
    assert_eq!(session["available_poses"].as_array().unwrap().len(), 0);
}

#[test]
fn unknown_session_is_404() {
    let server = start_server(&[]);
    let (status, body) = server.get("/sessions/does-not-exist");
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("does-not-exist"));

    let (status, _) = server.post_empty("/sessions/does-not-exist/pose/next");
    assert_eq!(status, 404);
}

#[test]
fn delete_session() {
    let server = start_server(&[]);
    let id = server.open_session();

    let (status, _) = server.delete(&format!("/sessions/{}", id));
    assert_eq!(status, 204);
    let (status, _) = server.get(&format!("/sessions/{}", id));
    assert_eq!(status, 404);
    let (status, _) = server.delete(&format!("/sessions/{}", id));
    assert_eq!(status, 404);
}

#[test]
fn session_limit_is_enforced() {
    let server = start_server(&[("ATELIER_MAX_SESSIONS", "1")]);
    server.open_session();
    let (status, body) = server.post_empty("/sessions");
    assert_eq!(status, 503);
    assert!(body["error"].as_str().unwrap().contains("session limit"));
}

#[test]
fn idle_sessions_make_room_for_new_ones() {
    let server = start_server(&[
        ("ATELIER_MAX_SESSIONS", "1"),
        ("ATELIER_SESSION_TTL_SECS", "1"),
    ]);
    let abandoned = server.open_session();
    std::thread::sleep(Duration::from_millis(1500));

    let (status, body) = server.post_empty("/sessions");
    assert_eq!(status, 201, "{}", body);
    let (status, _) = server.get(&format!("/sessions/{}", abandoned));
    assert_eq!(status, 404);
    let (_, health) = server.get("/health");
    assert_eq!(health["sessions"], 1);
}

#[test]
fn used_sessions_are_not_reclaimed() {
    let server = start_server(&[
        ("ATELIER_MAX_SESSIONS", "1"),
        ("ATELIER_SESSION_TTL_SECS", "2"),
    ]);
    let id = server.open_session();
    std::thread::sleep(Duration::from_millis(1200));
    let (status, _) = server.get(&format!("/sessions/{}", id));
    assert_eq!(status, 200);
    std::thread::sleep(Duration::from_millis(1200));

    let (status, _) = server.post_empty("/sessions");
    assert_eq!(status, 503);
    let (status, _) = server.get(&format!("/sessions/{}", id));
    assert_eq!(status, 200);
}

#[test]
fn invalid_session_ttl_fails_startup() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_atelier"));
    cmd.arg("serve")
        .arg("--port")
        .arg(next_port().to_string())
        .env_remove("GEMINI_API_KEY")
        .env("ATELIER_SESSION_TTL_SECS", "soon");
    let output = cmd.output().expect("failed to run atelier serve");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ATELIER_SESSION_TTL_SECS"), "{}", stderr);
}

// ──────────────────────────────────────────────
// Model
// ──────────────────────────────────────────────

#[test]
fn finalize_seeds_history() {
    let server = start_server(&[]);
    let id = server.open_session();

    let (status, body) = server.post(
        &format!("/sessions/{}/model/finalize", id),
        serde_json::json!({ "image_url": MODEL_IMAGE }),
    );
    assert_eq!(status, 200);
    assert_eq!(body["transition"]["kind"], "seeded");
    let session = &body["session"];
    assert_eq!(session["history_len"], 1);
    assert_eq!(session["outfit_index"], 0);
    assert_eq!(session["display_image"], MODEL_IMAGE);
    assert_eq!(session["layers"][0]["name"], "Base Avatar");
    assert_eq!(session["available_poses"][0]["index"], 0);
    assert_eq!(session["can_remove_garment"], false);
}

#[test]
fn finalize_requires_image_url() {
    let server = start_server(&[]);
    let id = server.open_session();
    let (status, body) = server.post(
        &format!("/sessions/{}/model/finalize", id),
        serde_json::json!({}),
    );
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("image_url"));
}

#[test]
fn model_photo_must_be_an_image() {
    let server = start_server(&[]);
    let id = server.open_session();
    let (status, body) = server.post(
        &format!("/sessions/{}/model", id),
        serde_json::json!({ "photo": "data:text/plain;base64,aGVsbG8=" }),
    );
    assert_eq!(status, 400);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("please select an image file"));
}

#[test]
fn model_creation_failure_is_502_and_recorded() {
    let server = start_server(&[]);
    let id = server.open_session();
    let (status, body) = server.post(
        &format!("/sessions/{}/model", id),
        serde_json::json!({ "photo": MODEL_IMAGE }),
    );
    assert_eq!(status, 502);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to create model"));

    let (_, body) = server.get(&format!("/sessions/{}", id));
    assert_eq!(body["session"]["loading"], false);
    assert_eq!(body["session"]["history_len"], 0);
    assert!(body["session"]["error"]
        .as_str()
        .unwrap()
        .contains("GEMINI_API_KEY"));
}

// ──────────────────────────────────────────────
// Garments
// ──────────────────────────────────────────────

#[test]
fn garment_before_model_is_skipped() {
    let server = start_server(&[]);
    let id = server.open_session();
    let (status, body) = server.post(
        &format!("/sessions/{}/garments", id),
        serde_json::json!({ "id": "purple-suit" }),
    );
    assert_eq!(status, 200);
    assert_eq!(body["transition"]["kind"], "skipped");
    assert_eq!(body["transition"]["reason"], "no_history");
}

#[test]
fn garment_failure_leaves_history_unchanged() {
    let server = start_server(&[]);
    let id = server.seeded_session();

    let (status, body) = server.post(
        &format!("/sessions/{}/garments", id),
        serde_json::json!({ "name": "Test Coat", "image_url": GARMENT_IMAGE }),
    );
    assert_eq!(status, 502);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to apply garment"));

    let (_, body) = server.get(&format!("/sessions/{}", id));
    let session = &body["session"];
    assert_eq!(session["history_len"], 1);
    assert_eq!(session["outfit_index"], 0);
    assert_eq!(session["display_image"], MODEL_IMAGE);
    assert_eq!(session["loading"], false);
    assert!(session["error"].is_string());
    // A failed custom garment does not join the wardrobe.
    assert_eq!(session["wardrobe"].as_array().unwrap().len(), 2);
}

#[test]
fn unknown_wardrobe_item_is_404() {
    let server = start_server(&[]);
    let id = server.seeded_session();
    let (status, body) = server.post(
        &format!("/sessions/{}/garments", id),
        serde_json::json!({ "id": "tuxedo" }),
    );
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("tuxedo"));
}

#[test]
fn custom_garment_must_be_an_image() {
    let server = start_server(&[]);
    let id = server.seeded_session();
    let (status, _) = server.post(
        &format!("/sessions/{}/garments", id),
        serde_json::json!({ "name": "Notes", "image_url": "data:text/plain;base64,aGk=" }),
    );
    assert_eq!(status, 400);

    let (status, _) = server.post(
        &format!("/sessions/{}/garments", id),
        serde_json::json!({ "name": "No image" }),
    );
    assert_eq!(status, 400);
}

#[test]
fn remove_at_base_layer_is_skipped() {
    let server = start_server(&[]);
    let id = server.seeded_session();
    let (status, body) = server.delete(&format!("/sessions/{}/garments/last", id));
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["transition"]["kind"], "skipped");
    assert_eq!(body["transition"]["reason"], "at_base_layer");
    assert_eq!(body["session"]["history_len"], 1);
}

// ──────────────────────────────────────────────
// Poses
// ──────────────────────────────────────────────

#[test]
fn pose_out_of_range_is_400() {
    let server = start_server(&[]);
    let id = server.seeded_session();
    let (status, body) = server.post(
        &format!("/sessions/{}/pose", id),
        serde_json::json!({ "index": 99 }),
    );
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("out of range"));

    let (status, _) = server.post(
        &format!("/sessions/{}/pose", id),
        serde_json::json!({ "index": -1 }),
    );
    assert_eq!(status, 400);

    let (status, body) = server.post(
        &format!("/sessions/{}/pose", id),
        serde_json::json!({ "index": u64::MAX }),
    );
    assert_eq!(status, 400, "{}", body);
    let (_, view) = server.get(&format!("/sessions/{}", id));
    assert_eq!(view["session"]["pose_index"], 0);
}

#[test]
fn same_pose_is_skipped() {
    let server = start_server(&[]);
    let id = server.seeded_session();
    let (status, body) = server.post(
        &format!("/sessions/{}/pose", id),
        serde_json::json!({ "index": 0 }),
    );
    assert_eq!(status, 200);
    assert_eq!(body["transition"]["reason"], "same_pose");
}

#[test]
fn previous_pose_needs_two_generated_poses() {
    let server = start_server(&[]);
    let id = server.seeded_session();
    let (status, body) = server.post_empty(&format!("/sessions/{}/pose/previous", id));
    assert_eq!(status, 200);
    assert_eq!(body["transition"]["reason"], "no_previous_pose");
}

#[test]
fn pose_failure_reverts_pose_cursor() {
    let server = start_server(&[]);
    let id = server.seeded_session();
    let (status, body) = server.post_empty(&format!("/sessions/{}/pose/next", id));
    assert_eq!(status, 502);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to change pose"));

    let (_, body) = server.get(&format!("/sessions/{}", id));
    assert_eq!(body["session"]["pose_index"], 0);
    assert_eq!(body["session"]["display_image"], MODEL_IMAGE);
}

// ──────────────────────────────────────────────
// Reset
// ──────────────────────────────────────────────

#[test]
fn reset_clears_the_session() {
    let server = start_server(&[]);
    let id = server.seeded_session();
    let (status, body) = server.post_empty(&format!("/sessions/{}/reset", id));
    assert_eq!(status, 200);
    assert_eq!(body["session"]["history_len"], 0);
    assert_eq!(body["session"]["display_image"], Value::Null);
    assert_eq!(body["session"]["error"], Value::Null);
}
