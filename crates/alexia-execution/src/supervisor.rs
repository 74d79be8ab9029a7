//! Background process supervision.
//!
//! Each managed process runs `sh -c <command>` in its own process group.
//! stderr is merged into the stdout pipe. A draining task per process reads
//! that pipe into a shared line buffer until it closes, then reaps the child
//! and clears the running flag. Entries leave the table only through [`ProcessControl::stop`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::shell_command;

pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process with PID {0} is not managed by Alexia or was already stopped")]
    NotFound(u32),

    #[error("failed to signal process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Point-in-time view of a managed process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSummary {
    pub pid: u32,
    pub command: String,
    pub running: bool,
    pub working_dir: Option<PathBuf>,
    pub buffered_lines: usize,
    pub uptime: Duration,
}

/// Lifecycle operations on background processes.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Spawn `command` and return its pid without waiting for it.
    async fn start(&self, command: &str, working_dir: Option<&Path>) -> Result<u32, ProcessError>;

    /// Optionally wait, then take every line buffered since the last drain.
    async fn drain(&self, pid: u32, wait: Duration) -> Result<Vec<String>, ProcessError>;

    /// Terminate the process group and forget the process.
    async fn stop(&self, pid: u32) -> Result<(), ProcessError>;

    /// Managed pids, ascending.
    fn list(&self) -> Vec<u32>;

    fn snapshot(&self) -> Vec<ProcessSummary>;
}

struct ManagedProcess {
    command: String,
    running: Arc<AtomicBool>,
    output: Arc<Mutex<Vec<String>>>,
    working_dir: Option<PathBuf>,
    started_at: Instant,
}

pub struct ProcessSupervisor {
    processes: Mutex<HashMap<u32, ManagedProcess>>,
    stop_grace: Duration,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::with_stop_grace(DEFAULT_STOP_GRACE)
    }

    /// How long `stop` waits after SIGTERM before sending SIGKILL.
    pub fn with_stop_grace(stop_grace: Duration) -> Self {
        Self {
            processes: Mutex::new(HashMap::new()),
            stop_grace,
        }
    }

    /// Stop every managed process. The session never calls this on exit;
    /// background processes outlive it unless stopped explicitly.
    pub async fn stop_all(&self) {
        for pid in self.list() {
            if let Err(e) = self.stop(pid).await {
                warn!("Failed to stop process {}: {}", pid, e);
            }
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<u32, ManagedProcess>> {
        self.processes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn spawn_drain_task(mut child: Child, output: Arc<Mutex<Vec<String>>>, running: Arc<AtomicBool>) {
        let stdout = child.stdout.take();

        tokio::spawn(async move {
            if let Some(stdout) = stdout {
                read_into(stdout, output).await;
            }

            match child.wait().await {
                Ok(status) => debug!("Managed process exited: {}", status),
                Err(e) => warn!("Failed to reap managed process: {}", e),
            }
            running.store(false, Ordering::SeqCst);
        });
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy lines from one pipe into the shared buffer until it closes.
async fn read_into<R: AsyncRead + Unpin>(pipe: R, output: Arc<Mutex<Vec<String>>>) {
    let mut segments = BufReader::new(pipe).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes).trim_end_matches('\r').to_string();
                output
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(line);
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Managed process pipe closed with error: {}", e);
                break;
            }
        }
    }
}

#[async_trait]
impl ProcessControl for ProcessSupervisor {
    async fn start(&self, command: &str, working_dir: Option<&Path>) -> Result<u32, ProcessError> {
        let mut cmd = shell_command(command);

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                // own process group, so stop can signal the whole tree
                if libc::setpgid(0, 0) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let pid = child.id().ok_or_else(|| ProcessError::Spawn {
            command: command.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "process exited before its pid was read"),
        })?;

        let output = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));
        Self::spawn_drain_task(child, output.clone(), running.clone());

        self.table().insert(
            pid,
            ManagedProcess {
                command: command.to_string(),
                running,
                output,
                working_dir: working_dir.map(Path::to_path_buf),
                started_at: Instant::now(),
            },
        );

        info!("Started managed process {}: {}", pid, command);
        Ok(pid)
    }

    async fn drain(&self, pid: u32, wait: Duration) -> Result<Vec<String>, ProcessError> {
        let known = self.table().contains_key(&pid);
        if !known {
            return Err(ProcessError::NotFound(pid));
        }

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let output = self
            .table()
            .get(&pid)
            .map(|p| p.output.clone())
            .ok_or(ProcessError::NotFound(pid))?;

        let lines = std::mem::take(&mut *output.lock().unwrap_or_else(|e| e.into_inner()));
        Ok(lines)
    }

    async fn stop(&self, pid: u32) -> Result<(), ProcessError> {
        let process = self.table().remove(&pid).ok_or(ProcessError::NotFound(pid))?;

        if !process.running.load(Ordering::SeqCst) {
            debug!("Process {} already exited, forgetting it", pid);
            return Ok(());
        }

        signal_group(pid, Signal::Terminate)?;

        let deadline = Instant::now() + self.stop_grace;
        while process.running.load(Ordering::SeqCst) && Instant::now() < deadline {
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }

        if process.running.load(Ordering::SeqCst) {
            warn!(
                "Process {} ignored SIGTERM for {:?}, sending SIGKILL",
                pid, self.stop_grace
            );
            signal_group(pid, Signal::Kill)?;
        }

        info!("Stopped managed process {}", pid);
        Ok(())
    }

    fn list(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.table().keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    fn snapshot(&self) -> Vec<ProcessSummary> {
        let mut summaries: Vec<ProcessSummary> = self
            .table()
            .iter()
            .map(|(pid, p)| ProcessSummary {
                pid: *pid,
                command: p.command.clone(),
                running: p.running.load(Ordering::SeqCst),
                working_dir: p.working_dir.clone(),
                buffered_lines: p.output.lock().map(|o| o.len()).unwrap_or(0),
                uptime: p.started_at.elapsed(),
            })
            .collect();
        summaries.sort_by_key(|s| s.pid);
        summaries
    }
}

enum Signal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: Signal) -> Result<(), ProcessError> {
    let signo = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };

    // negative pid addresses the process group
    let rc = unsafe { libc::kill(-(pid as libc::pid_t), signo) };
    if rc == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        // group already gone
        return Ok(());
    }
    Err(ProcessError::Signal { pid, source: err })
}

#[cfg(not(unix))]
fn signal_group(pid: u32, _signal: Signal) -> Result<(), ProcessError> {
    Err(ProcessError::Signal {
        pid,
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "process groups are only supported on unix",
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn wait_until_exited(supervisor: &ProcessSupervisor, pid: u32) {
        for _ in 0..100 {
            let running = supervisor
                .snapshot()
                .into_iter()
                .find(|s| s.pid == pid)
                .map(|s| s.running)
                .unwrap_or(false);
            if !running {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("process {} did not exit", pid);
    }

    #[tokio::test]
    async fn test_start_and_drain_output() {
        let supervisor = ProcessSupervisor::new();
        let pid = supervisor
            .start("echo one; echo two 1>&2; echo three", None)
            .await
            .unwrap();

        wait_until_exited(&supervisor, pid).await;
        let lines = supervisor.drain(pid, Duration::ZERO).await.unwrap();
        assert_eq!(lines, vec!["one", "two", "three"]);

        // buffer is cleared by draining
        assert!(supervisor.drain(pid, Duration::ZERO).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stdout_order_preserved() {
        let supervisor = ProcessSupervisor::new();
        let pid = supervisor.start("for i in 1 2 3 4 5; do echo $i; done", None).await.unwrap();
        wait_until_exited(&supervisor, pid).await;

        let lines = supervisor.drain(pid, Duration::ZERO).await.unwrap();
        assert_eq!(lines, vec!["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_exited_process_stays_listed_until_stopped() {
        let supervisor = ProcessSupervisor::new();
        let pid = supervisor.start("true", None).await.unwrap();
        wait_until_exited(&supervisor, pid).await;

        assert_eq!(supervisor.list(), vec![pid]);
        let summary = &supervisor.snapshot()[0];
        assert!(!summary.running);
        assert_eq!(summary.command, "true");

        supervisor.stop(pid).await.unwrap();
        assert!(supervisor.list().is_empty());
    }

    #[tokio::test]
    async fn test_stop_running_process() {
        let supervisor = ProcessSupervisor::new();
        let pid = supervisor.start("sleep 30", None).await.unwrap();
        assert!(supervisor.snapshot()[0].running);

        let started = Instant::now();
        supervisor.stop(pid).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(supervisor.list().is_empty());
    }

    #[tokio::test]
    async fn test_stop_escalates_to_kill() {
        let supervisor = ProcessSupervisor::with_stop_grace(Duration::from_millis(300));
        let pid = supervisor.start("trap '' TERM; sleep 30", None).await.unwrap();
        // give the shell time to install the trap
        tokio::time::sleep(Duration::from_millis(200)).await;

        supervisor.stop(pid).await.unwrap();
        assert!(supervisor.list().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_pid_is_not_found() {
        let supervisor = ProcessSupervisor::new();
        let pid = supervisor.start("sleep 30", None).await.unwrap();

        assert!(matches!(
            supervisor.stop(999_999).await,
            Err(ProcessError::NotFound(999_999))
        ));
        assert!(matches!(
            supervisor.drain(999_999, Duration::ZERO).await,
            Err(ProcessError::NotFound(_))
        ));
        assert_eq!(supervisor.list(), vec![pid]);

        supervisor.stop_all().await;
        assert!(supervisor.list().is_empty());
    }

    #[tokio::test]
    async fn test_working_directory_is_used() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("here.txt"), "").unwrap();

        let supervisor = ProcessSupervisor::new();
        let pid = supervisor.start("ls", Some(temp_dir.path())).await.unwrap();
        wait_until_exited(&supervisor, pid).await;

        let lines = supervisor.drain(pid, Duration::ZERO).await.unwrap();
        assert_eq!(lines, vec!["here.txt"]);
        assert_eq!(
            supervisor.snapshot()[0].working_dir.as_deref(),
            Some(temp_dir.path())
        );
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let supervisor = ProcessSupervisor::new();
        let a = supervisor.start("sleep 30", None).await.unwrap();
        let b = supervisor.start("sleep 30", None).await.unwrap();

        let mut expected = vec![a, b];
        expected.sort_unstable();
        assert_eq!(supervisor.list(), expected);

        supervisor.stop_all().await;
    }
}
