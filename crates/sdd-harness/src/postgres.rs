//! Ephemeral postgres for SQL-backed scenarios, driven through the docker
//! CLI so the harness needs no database driver or daemon socket bindings.
//!
//! Lifecycle calls return booleans rather than errors: a missing engine or a
//! rejected `docker run` is an environmental condition the suite reacts to
//! (usually by skipping), not a harness fault.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::Result;

/// Container name shared by a whole suite run.
pub const DEFAULT_CONTAINER_NAME: &str = "sdd-harness-pg";

/// Default host port. Not 5432, so a developer's local postgres keeps its
/// port while the suite runs.
pub const DEFAULT_HOST_PORT: u16 = 5433;

const IMAGE: &str = "postgres:16-alpine";
const READY_ATTEMPTS: u32 = 30;
const READY_INTERVAL: Duration = Duration::from_secs(1);

/// Whether a docker engine is installed and answering. Suites that need the
/// container call this once and self-skip when it is false.
pub async fn engine_available() -> bool {
    if which::which("docker").is_err() {
        return false;
    }
    match Command::new("docker").arg("info").output().await {
        Ok(out) => out.status.success(),
        Err(_) => false,
    }
}

/// Handle to one named postgres container.
///
/// The handle is explicit state: tests receive it from the suite setup and
/// call [`exec_sql`](Self::exec_sql) on it, and the suite teardown is the
/// single place that removes the container. Tests sharing a handle must not
/// run concurrently against it.
#[derive(Debug, Clone)]
pub struct PostgresContainer {
    name: String,
    port: u16,
}

/// Captured output of one in-container `psql` invocation. The client's exit
/// status is data for assertions, not a harness error.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SqlOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl SqlOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl Default for PostgresContainer {
    fn default() -> Self {
        Self::new(DEFAULT_CONTAINER_NAME)
    }
}

impl PostgresContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: DEFAULT_HOST_PORT,
        }
    }

    /// Use a different host port, e.g. when 5433 is taken on CI.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Launch the container with stock credentials (user `postgres`,
    /// password `postgres`, database `postgres`).
    ///
    /// Any leftover container with the same name is removed first, so a
    /// crashed earlier run never blocks a fresh start. Returns true once
    /// `docker run` is accepted; readiness is [`wait_ready`](Self::wait_ready).
    pub async fn start(&self) -> bool {
        self.teardown().await;
        let port_map = format!("{}:5432", self.port);
        let result = Command::new("docker")
            .args([
                "run",
                "-d",
                "--name",
                self.name.as_str(),
                "-e",
                "POSTGRES_PASSWORD=postgres",
                "-p",
                port_map.as_str(),
                IMAGE,
            ])
            .output()
            .await;
        match result {
            Ok(out) if out.status.success() => {
                tracing::debug!(container = %self.name, port = self.port, "postgres started");
                true
            }
            Ok(out) => {
                tracing::warn!(
                    container = %self.name,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "docker run rejected"
                );
                false
            }
            Err(e) => {
                tracing::warn!(container = %self.name, error = %e, "docker run failed");
                false
            }
        }
    }

    /// One readiness probe, via `pg_isready` inside the container. No
    /// host-side client is needed.
    pub async fn is_ready(&self) -> bool {
        let result = Command::new("docker")
            .args(["exec", self.name.as_str(), "pg_isready", "-U", "postgres"])
            .output()
            .await;
        matches!(result, Ok(out) if out.status.success())
    }

    /// Poll until the server accepts connections, up to a fixed budget of
    /// thirty one-second attempts. Returns false when the budget runs out;
    /// never hangs.
    pub async fn wait_ready(&self) -> bool {
        self.poll_ready(READY_ATTEMPTS, READY_INTERVAL).await
    }

    async fn poll_ready(&self, attempts: u32, interval: Duration) -> bool {
        for attempt in 1..=attempts {
            if self.is_ready().await {
                tracing::debug!(container = %self.name, attempt, "postgres ready");
                return true;
            }
            tokio::time::sleep(interval).await;
        }
        tracing::warn!(container = %self.name, attempts, "postgres never became ready");
        false
    }

    /// Pipe a SQL script into `psql` inside the container. Multi-statement
    /// scripts are fine; `ON_ERROR_STOP` makes the first failing statement
    /// set a non-zero exit code.
    pub async fn exec_sql(&self, sql: &str) -> Result<SqlOutput> {
        let mut child = Command::new("docker")
            .args([
                "exec",
                "-i",
                self.name.as_str(),
                "psql",
                "-U",
                "postgres",
                "-d",
                "postgres",
                "-v",
                "ON_ERROR_STOP=1",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(sql.as_bytes()).await?;
            // Dropping stdin closes the pipe and lets psql finish.
        }

        let out = child.wait_with_output().await?;
        Ok(SqlOutput {
            exit_code: out.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }

    /// Remove the container, ignoring every error. Safe when the container is
    /// running, stopped, or absent, and safe to call twice; cleanup paths
    /// must never fail on top of a failing test.
    pub async fn teardown(&self) {
        let _ = Command::new("docker")
            .args(["rm", "-f", self.name.as_str()])
            .output()
            .await;
    }
}
