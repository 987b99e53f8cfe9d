//! Supervised execution of the `claude` CLI.
//!
//! One call spawns the agent in unattended mode, merges its stdout and stderr
//! into a single buffer in emission order, mirrors every chunk to a debug
//! transcript under the scratch root, prints progress markers as new tools
//! and sub-agents appear, and enforces a single wall-clock deadline. A run
//! that reaches process exit yields a [`RunResult`]; hitting the deadline
//! kills the process and yields [`HarnessError::Timeout`] instead, so a
//! timeout can never be mistaken for a completed run.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep_until, timeout_at, Instant};

use crate::error::{HarnessError, Result};
use crate::markers;
use crate::scratch;

/// Agent executable resolved from `PATH` unless overridden.
pub const DEFAULT_EXECUTABLE: &str = "claude";

/// Default wall-clock deadline for one run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

const READ_BUF_SIZE: usize = 8192;

/// Options for one supervised agent invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Wall-clock deadline; the process is killed when it fires.
    pub timeout: Duration,
    /// Working directory for the agent, typically a test project path.
    pub cwd: Option<PathBuf>,
    /// Extra directories the agent is allowed to touch (`--add-dir`).
    pub add_dirs: Vec<PathBuf>,
    /// Extra environment variables for the subprocess.
    pub env: HashMap<String, String>,
    /// Override for the agent executable.
    pub executable: Option<String>,
    /// Override for the transcript directory; defaults to the scratch root.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            cwd: None,
            add_dirs: Vec::new(),
            env: HashMap::new(),
            executable: None,
            scratch_dir: None,
        }
    }
}

/// Terminal outcome of a run whose process exited on its own.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunResult {
    /// Combined stdout and stderr, in emission order.
    pub output: String,
    /// Process exit code; -1 when the platform reports none (signal death).
    pub exit_status: i32,
    /// Whole seconds from spawn to exit, truncated.
    pub elapsed_seconds: u64,
}

/// Run the agent once with `instruction` as its prompt.
///
/// The transcript file is created before the process starts, so even a run
/// that dies mid-stream leaves its partial output on disk.
pub async fn run_agent(instruction: &str, opts: RunOptions) -> Result<RunResult> {
    let scratch = opts.scratch_dir.clone().unwrap_or_else(scratch::scratch_root);
    tokio::fs::create_dir_all(&scratch).await?;
    let transcript = scratch::transcript_path(&scratch);
    let mut transcript_file = tokio::fs::File::create(&transcript).await?;

    let program = opts
        .executable
        .clone()
        .unwrap_or_else(|| DEFAULT_EXECUTABLE.to_string());
    let mut cmd = build_command(&program, instruction, &opts);

    tracing::debug!(%program, transcript = %transcript.display(), "spawning agent");
    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|source| HarnessError::Spawn {
        program: program.clone(),
        source,
    })?;

    let (tx, mut rx) = mpsc::channel::<String>(64);
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, tx.clone());
    }
    // The channel closes once both reader tasks hit EOF.
    drop(tx);

    let deadline = start + opts.timeout;
    let mut ticker = interval_at(start + PROGRESS_INTERVAL, PROGRESS_INTERVAL);

    let mut progress = Progress::default();
    let mut output = String::new();

    loop {
        tokio::select! {
            chunk = rx.recv() => match chunk {
                Some(chunk) => {
                    output.push_str(&chunk);
                    transcript_file.write_all(chunk.as_bytes()).await?;
                    transcript_file.flush().await?;
                    progress.report(&output, start.elapsed());
                }
                None => break,
            },
            _ = sleep_until(deadline) => {
                let _ = child.kill().await;
                return Err(HarnessError::Timeout {
                    limit_secs: opts.timeout.as_secs(),
                    transcript,
                });
            }
            _ = ticker.tick() => {
                tracing::debug!(elapsed_secs = start.elapsed().as_secs(), "agent still running");
            }
        }
    }

    // Streams are done; the exit itself stays bounded by the same deadline.
    let status = match timeout_at(deadline, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            let _ = child.kill().await;
            return Err(HarnessError::Timeout {
                limit_secs: opts.timeout.as_secs(),
                transcript,
            });
        }
    };

    let result = RunResult {
        output,
        exit_status: status.code().unwrap_or(-1),
        elapsed_seconds: start.elapsed().as_secs(),
    };
    tracing::debug!(
        exit_status = result.exit_status,
        elapsed_seconds = result.elapsed_seconds,
        "agent exited"
    );
    Ok(result)
}

fn build_command(program: &str, instruction: &str, opts: &RunOptions) -> Command {
    let mut cmd = Command::new(program);
    cmd.arg("-p")
        .arg(instruction)
        .arg("--output-format")
        .arg("stream-json")
        .arg("--verbose")
        .arg("--dangerously-skip-permissions");
    for dir in &opts.add_dirs {
        cmd.arg("--add-dir").arg(dir);
    }
    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &opts.env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

fn spawn_reader<R>(mut stream: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    if tx.send(chunk).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Tracks which tools and sub-agents have already been announced so the
/// whole-buffer scan never double-counts across chunks.
#[derive(Default)]
struct Progress {
    tools: HashSet<String>,
    agents: HashSet<String>,
    tool_count: usize,
}

impl Progress {
    fn report(&mut self, output: &str, elapsed: Duration) {
        let secs = elapsed.as_secs();
        for name in markers::tool_names(output) {
            if self.tools.insert(name.to_string()) {
                self.tool_count += 1;
                println!("  [{secs}s] tool #{}: {name}", self.tool_count);
            }
        }
        for name in markers::subagent_names(output) {
            if self.agents.insert(name.to_string()) {
                println!("  [{secs}s] subagent: {name}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_failure_is_its_own_error() {
        let scratch = tempfile::TempDir::new().unwrap();
        let err = run_agent(
            "anything",
            RunOptions {
                executable: Some("/nonexistent/sdd-agent-binary".into()),
                scratch_dir: Some(scratch.path().to_path_buf()),
                timeout: Duration::from_secs(5),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        match err {
            HarnessError::Spawn { program, .. } => {
                assert_eq!(program, "/nonexistent/sdd-agent-binary");
            }
            other => panic!("expected Spawn, got {other:?}"),
        }
    }

    #[test]
    fn progress_never_announces_a_name_twice() {
        let mut progress = Progress::default();
        let out = r#"{"name":"Write"}{"subagent_type":"planner"}"#;
        progress.report(out, Duration::from_secs(1));
        assert_eq!(progress.tool_count, 1);
        // Same buffer again, as the runner does after each chunk.
        let grown = format!("{out}{}", r#"{"name":"Read"}"#);
        progress.report(&grown, Duration::from_secs(2));
        assert_eq!(progress.tool_count, 2);
        assert!(progress.agents.contains("planner"));
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use std::path::Path;

        fn write_stub(dir: &Path, name: &str, body: &str) -> String {
            use std::os::unix::fs::PermissionsExt;
            let path = dir.join(name);
            std::fs::write(&path, body).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path.to_string_lossy().into_owned()
        }

        fn opts(scratch: &Path, stub: String) -> RunOptions {
            RunOptions {
                executable: Some(stub),
                scratch_dir: Some(scratch.to_path_buf()),
                timeout: Duration::from_secs(30),
                ..Default::default()
            }
        }

        fn transcripts(scratch: &Path) -> Vec<std::path::PathBuf> {
            let mut paths: Vec<_> = std::fs::read_dir(scratch)
                .unwrap()
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with("output-"))
                })
                .collect();
            paths.sort();
            paths
        }

        #[tokio::test]
        async fn deadline_kills_a_hung_agent() {
            let scratch = tempfile::TempDir::new().unwrap();
            let stub = write_stub(scratch.path(), "hang.sh", "#!/bin/sh\nsleep 10\n");
            let started = std::time::Instant::now();
            let err = run_agent(
                "hang",
                RunOptions {
                    timeout: Duration::from_secs(2),
                    ..opts(scratch.path(), stub)
                },
            )
            .await
            .unwrap_err();
            assert!(started.elapsed() < Duration::from_secs(8));
            match err {
                HarnessError::Timeout { limit_secs, transcript } => {
                    assert_eq!(limit_secs, 2);
                    assert!(transcript.exists());
                }
                other => panic!("expected Timeout, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn nonzero_exit_with_no_output_is_a_result() {
            let scratch = tempfile::TempDir::new().unwrap();
            let stub = write_stub(scratch.path(), "fail.sh", "#!/bin/sh\nexit 1\n");
            let result = run_agent("fail", opts(scratch.path(), stub)).await.unwrap();
            assert_eq!(result.exit_status, 1);
            assert_eq!(result.output, "");
        }

        #[tokio::test]
        async fn merges_stdout_and_stderr() {
            let scratch = tempfile::TempDir::new().unwrap();
            let stub = write_stub(
                scratch.path(),
                "both.sh",
                "#!/bin/sh\necho out-line\necho err-line >&2\nexit 0\n",
            );
            let result = run_agent("both", opts(scratch.path(), stub)).await.unwrap();
            assert_eq!(result.exit_status, 0);
            assert!(result.output.contains("out-line"));
            assert!(result.output.contains("err-line"));
        }

        #[tokio::test]
        async fn passes_the_unattended_cli_contract() {
            let scratch = tempfile::TempDir::new().unwrap();
            let stub = write_stub(
                scratch.path(),
                "args.sh",
                "#!/bin/sh\nprintf '%s\\n' \"$@\"\n",
            );
            let result = run_agent(
                "write a spec",
                RunOptions {
                    add_dirs: vec![PathBuf::from("/tmp/extra")],
                    ..opts(scratch.path(), stub)
                },
            )
            .await
            .unwrap();
            let lines: Vec<&str> = result.output.lines().collect();
            assert_eq!(
                lines,
                [
                    "-p",
                    "write a spec",
                    "--output-format",
                    "stream-json",
                    "--verbose",
                    "--dangerously-skip-permissions",
                    "--add-dir",
                    "/tmp/extra",
                ]
            );
        }

        #[tokio::test]
        async fn applies_cwd_and_env() {
            let scratch = tempfile::TempDir::new().unwrap();
            let workdir = tempfile::TempDir::new().unwrap();
            let stub = write_stub(
                scratch.path(),
                "env.sh",
                "#!/bin/sh\npwd\nprintf '%s\\n' \"$SDD_PROBE\"\n",
            );
            let result = run_agent(
                "env",
                RunOptions {
                    cwd: Some(workdir.path().to_path_buf()),
                    env: HashMap::from([("SDD_PROBE".to_string(), "probe-value".to_string())]),
                    ..opts(scratch.path(), stub)
                },
            )
            .await
            .unwrap();
            let canonical = workdir.path().canonicalize().unwrap();
            let mut lines = result.output.lines();
            assert_eq!(
                Path::new(lines.next().unwrap()).canonicalize().unwrap(),
                canonical
            );
            assert_eq!(lines.next().unwrap(), "probe-value");
        }

        #[tokio::test]
        async fn transcript_survives_a_timeout() {
            let scratch = tempfile::TempDir::new().unwrap();
            let stub = write_stub(
                scratch.path(),
                "partial.sh",
                "#!/bin/sh\nprintf '%s\\n' '{\"name\":\"Write\"}'\nsleep 10\n",
            );
            let err = run_agent(
                "partial",
                RunOptions {
                    timeout: Duration::from_secs(2),
                    ..opts(scratch.path(), stub)
                },
            )
            .await
            .unwrap_err();
            let HarnessError::Timeout { transcript, .. } = err else {
                panic!("expected Timeout");
            };
            let saved = std::fs::read_to_string(transcript).unwrap();
            assert!(saved.contains(r#""name":"Write""#));
        }

        #[tokio::test]
        async fn every_run_leaves_a_transcript() {
            let scratch = tempfile::TempDir::new().unwrap();
            let stub = write_stub(
                scratch.path(),
                "talk.sh",
                "#!/bin/sh\nprintf '%s\\n' '{\"name\":\"Read\"}'\nexit 0\n",
            );
            let result = run_agent("talk", opts(scratch.path(), stub.clone()))
                .await
                .unwrap();
            assert_eq!(result.exit_status, 0);
            run_agent("talk again", opts(scratch.path(), stub))
                .await
                .unwrap();
            let found = transcripts(scratch.path());
            assert_eq!(found.len(), 2);
            let first = std::fs::read_to_string(&found[0]).unwrap();
            assert!(first.contains(r#""name":"Read""#));
        }

        #[tokio::test]
        async fn elapsed_seconds_track_wall_time() {
            let scratch = tempfile::TempDir::new().unwrap();
            let stub = write_stub(scratch.path(), "slow.sh", "#!/bin/sh\nsleep 1\nexit 0\n");
            let result = run_agent("slow", opts(scratch.path(), stub)).await.unwrap();
            assert!(result.elapsed_seconds >= 1);
            assert!(result.elapsed_seconds < 30);
        }
    }
}
