//! Shared helpers: a local webhook endpoint and throwaway git repositories.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

/// Path segment standing in for the webhook secret.
pub const SECRET_PATH: &str = "/services/T000/B000/s3cr3tT0k3n";

/// Local stand-in for a Slack incoming webhook.
pub struct MockWebhook {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockWebhook {
    /// Starts a server answering every POST with `status`.
    pub async fn start(status: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured = requests.clone();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let io = TokioIo::new(stream);
                let captured = captured.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let captured = captured.clone();
                        async move {
                            let body = req.into_body().collect().await?.to_bytes();
                            captured
                                .lock()
                                .unwrap()
                                .push(String::from_utf8_lossy(&body).to_string());

                            let reply = if (200..300).contains(&status) {
                                "ok"
                            } else {
                                "invalid_payload"
                            };
                            Ok::<_, hyper::Error>(
                                Response::builder()
                                    .status(status)
                                    .body(Full::new(Bytes::from(reply)))
                                    .unwrap(),
                            )
                        }
                    });

                    let _ = http1::Builder::new().serve_connection(io, service).await;
                });
            }
        });

        Self {
            url: webhook_url(addr),
            requests,
        }
    }

    /// Bodies of every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts a server that accepts connections and never answers.
pub async fn hanging_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    webhook_url(addr)
}

/// Returns a URL on a port nothing listens on.
pub async fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    webhook_url(addr)
}

fn webhook_url(addr: SocketAddr) -> String {
    format!("http://{}{}", addr, SECRET_PATH)
}

/// Runs git in `path`, panicking on failure.
pub fn git(path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("Failed to execute git");

    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Initializes an empty git repository with a committer identity.
pub fn init_git_repo(path: &Path) {
    git(path, &["init", "--quiet"]);
    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);
    git(path, &["config", "commit.gpgsign", "false"]);
}

/// Creates a commit and returns its full hash.
pub fn commit_file(path: &Path, file: &str, subject: &str) -> String {
    std::fs::write(path.join(file), subject).unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "--quiet", "-m", subject]);
    git(path, &["rev-parse", "HEAD"])
}
