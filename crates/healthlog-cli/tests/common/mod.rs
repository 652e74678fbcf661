use std::path::PathBuf;
use std::process::Output;

use serde_json::json;
use tempfile::TempDir;
use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The CLI binary pointed at a mock backend with an isolated session file.
pub struct Harness {
    pub server: MockServer,
    dir: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn session_file(&self) -> PathBuf {
        self.dir.path().join("session.json")
    }

    /// Contents of the session file, if it exists.
    pub fn session_json(&self) -> Option<serde_json::Value> {
        let content = std::fs::read_to_string(self.session_file()).ok()?;
        Some(serde_json::from_str(&content).expect("Session file is not JSON"))
    }

    /// Run the CLI binary with arguments.
    pub async fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_healthlog"));
        cmd.args(args)
            .env("HEALTHLOG_API", self.server.uri())
            .env("HEALTHLOG_SESSION_FILE", self.session_file())
            .env("NO_COLOR", "1")
            .env_remove("HEALTHLOG_PASSWORD")
            .env_remove("HEALTHLOG_TIMEOUT")
            .env_remove("RUST_LOG");
        cmd.output().await.expect("Failed to execute CLI")
    }

    /// Run the CLI and expect success, returning stdout.
    pub async fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args).await;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run the CLI and expect failure, returning stderr.
    pub async fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args).await;
        if output.status.success() {
            panic!("CLI command should have failed: {:?}", args);
        }
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    /// Mount a login endpoint issuing A1/R1 and log in through the CLI.
    pub async fn login(&self) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "A1",
                "refresh_token": "R1",
                "user": {"id": 7, "email": "alice@example.com", "name": "Alice"}
            })))
            .mount(&self.server)
            .await;

        self.run_success(&[
            "login",
            "--email",
            "alice@example.com",
            "--password",
            "secret123",
        ])
        .await;
    }
}
