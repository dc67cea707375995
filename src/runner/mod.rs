//! Trial Runner
//!
//! Runs one counter process for one matrix cell and measures it.
//!
//! Toyota Way: Genchi Genbutsu (measure the real binary, wall clock around
//! the whole process)
//!
//! ## Failure handling
//!
//! Nothing a single trial does can abort an orchestration run:
//! - nonzero exit → [`TrialFailure::NonZeroExit`], stderr logged
//! - timeout → child killed, [`TrialFailure::TimedOut`]
//! - output pipes held open by leftover descendants → partial output is
//!   used once the timeout has passed
//! - spawn/wait errors → [`TrialFailure::Spawn`] / [`TrialFailure::Wait`]
//!
//! Only [`TrialExecutor::preflight`] returns a fatal [`crate::Error`].

mod environment;
mod parse;

pub use environment::{
    library_path_var, EnvironmentProvisioner, InheritEnvironment, LibrarySearchPath,
    StaticEnvironment,
};
pub use parse::{parse_counters, ParsedCounters, TOTAL_WORDS_LABEL, UNIQUE_WORDS_LABEL};

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::config::{BenchPlan, BinariesConfig};
use crate::experiment::{ExperimentConfig, RawSample, WordCounts};
use crate::{Error, Result};

/// Default per-trial timeout (five minutes).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default `top_n` argument of the parallel counter.
pub const DEFAULT_TOP_N: u32 = 100;

/// Read size of the pipe drainers.
const DRAIN_CHUNK: usize = 8 * 1024;

/// Longest stderr excerpt written to the log.
const STDERR_EXCERPT_CHARS: usize = 200;

/// Why a trial produced no sample.
#[derive(Error, Debug)]
pub enum TrialFailure {
    /// Process exited unsuccessfully
    #[error("exited with {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| format!("code {c}")))]
    NonZeroExit {
        /// Exit code, `None` if killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
        /// Wall time until exit
        elapsed: Duration,
    },

    /// Process exceeded the timeout and was killed
    #[error("timed out after {timeout:?}")]
    TimedOut {
        /// Configured timeout
        timeout: Duration,
    },

    /// Process could not be started
    #[error("failed to spawn: {0}")]
    Spawn(#[source] std::io::Error),

    /// Waiting on the process failed
    #[error("failed to wait: {0}")]
    Wait(#[source] std::io::Error),
}

impl TrialFailure {
    /// Wall time consumed by the failed attempt, in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        match self {
            Self::NonZeroExit { elapsed, .. } => duration_ms(*elapsed),
            Self::TimedOut { timeout } => duration_ms(*timeout),
            Self::Spawn(_) | Self::Wait(_) => 0.0,
        }
    }

    /// Whether the attempt hit the timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Executes one trial of one matrix cell.
///
/// The seam between orchestration and the outside world: the collector and
/// orchestrator only see this trait, so tests drive them with scripted
/// executors instead of real processes.
pub trait TrialExecutor {
    /// Check, before any phase starts, that trials can run at all.
    ///
    /// # Errors
    ///
    /// Any error here is fatal for the orchestration run.
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Run one trial. `prior` holds the last known counters, returned
    /// unchanged for fields the output lacks.
    ///
    /// # Errors
    ///
    /// A [`TrialFailure`] means the attempt is discarded; it never aborts the run.
    fn execute(
        &self,
        config: &ExperimentConfig,
        prior: WordCounts,
    ) -> std::result::Result<RawSample, TrialFailure>;
}

impl<T: TrialExecutor + ?Sized> TrialExecutor for &T {
    fn preflight(&self) -> Result<()> {
        (**self).preflight()
    }

    fn execute(
        &self,
        config: &ExperimentConfig,
        prior: WordCounts,
    ) -> std::result::Result<RawSample, TrialFailure> {
        (**self).execute(config, prior)
    }
}

/// Program and arguments for one counter launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable path
    pub program: PathBuf,
    /// Positional arguments
    pub args: Vec<OsString>,
}

/// Captured result of a process that exited on its own.
#[derive(Debug)]
struct Completed {
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
    elapsed: Duration,
}

/// Trial runner backed by real processes.
#[derive(Debug, Clone)]
pub struct ProcessTrialRunner<P = InheritEnvironment> {
    binaries: BinariesConfig,
    timeout: Duration,
    top_n: u32,
    output_dir: PathBuf,
    provisioner: P,
}

impl ProcessTrialRunner {
    /// Create a runner with default timeout, `top_n` and output directory.
    #[must_use]
    pub fn new(binaries: BinariesConfig) -> Self {
        Self {
            binaries,
            timeout: DEFAULT_TIMEOUT,
            top_n: DEFAULT_TOP_N,
            output_dir: PathBuf::from("results/parallel"),
            provisioner: InheritEnvironment,
        }
    }
}

impl ProcessTrialRunner<LibrarySearchPath> {
    /// Create a runner from a validated plan.
    #[must_use]
    pub fn from_plan(plan: &BenchPlan) -> Self {
        ProcessTrialRunner::new(plan.binaries().clone())
            .timeout(plan.timeout())
            .top_n(plan.top_n())
            .output_dir(plan.output_dir())
            .provisioner(LibrarySearchPath::new(plan.library_paths().iter().cloned()))
    }
}

impl<P: EnvironmentProvisioner> ProcessTrialRunner<P> {
    /// Set the per-trial timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `top_n` argument of the parallel counter.
    #[must_use]
    pub fn top_n(mut self, top_n: u32) -> Self {
        self.top_n = top_n;
        self
    }

    /// Set the directory for the parallel counter's output files.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Replace the environment provisioner.
    #[must_use]
    pub fn provisioner<Q: EnvironmentProvisioner>(self, provisioner: Q) -> ProcessTrialRunner<Q> {
        ProcessTrialRunner {
            binaries: self.binaries,
            timeout: self.timeout,
            top_n: self.top_n,
            output_dir: self.output_dir,
            provisioner,
        }
    }

    /// Output file handed to the parallel counter for a cell:
    /// `<output_dir>/bench_<stem>_<threads>t_<sync>.txt`.
    #[must_use]
    pub fn output_path(&self, config: &ExperimentConfig) -> PathBuf {
        let dataset = Path::new(config.dataset());
        let stem = dataset
            .file_stem()
            .map_or_else(|| config.dataset().into(), |s| s.to_string_lossy());
        self.output_dir.join(format!(
            "bench_{stem}_{}t_{}.txt",
            config.threads(),
            config.sync_method()
        ))
    }

    /// Build the command line for a cell.
    #[must_use]
    pub fn invocation(&self, config: &ExperimentConfig) -> Invocation {
        if config.is_baseline() {
            return Invocation {
                program: self.binaries.sequential.clone(),
                args: vec![config.dataset().into()],
            };
        }
        Invocation {
            program: self.binaries.parallel.clone(),
            args: vec![
                config.dataset().into(),
                self.output_path(config).into_os_string(),
                self.top_n.to_string().into(),
                config.threads().to_string().into(),
                config.sync_method().as_str().into(),
            ],
        }
    }

    fn launch(&self, invocation: &Invocation) -> std::result::Result<Completed, TrialFailure> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(self.provisioner.environment())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let started = Instant::now();
        let mut child = command.spawn().map_err(TrialFailure::Spawn)?;

        // Drain both pipes so a chatty child never blocks on a full pipe.
        let stdout = Drain::spawn(child.stdout.take());
        let stderr = Drain::spawn(child.stderr.take());

        let status = match wait_with_timeout(&mut child, self.timeout) {
            Ok(Some(status)) => status,
            // Drainers are detached: a killed child's descendants may still
            // hold the pipes open.
            Ok(None) => return Err(TrialFailure::TimedOut { timeout: self.timeout }),
            Err(e) => return Err(TrialFailure::Wait(e)),
        };
        let elapsed = started.elapsed();

        let deadline = started + self.timeout;
        let (stdout, stdout_closed) = Drain::collect(stdout, deadline);
        let (stderr, stderr_closed) = Drain::collect(stderr, deadline);
        if !(stdout_closed && stderr_closed) {
            warn!(
                program = %invocation.program.display(),
                "output pipes still open at the timeout, using partial output"
            );
        }

        Ok(Completed {
            success: status.success(),
            code: status.code(),
            stdout,
            stderr,
            elapsed,
        })
    }
}

impl<P: EnvironmentProvisioner> TrialExecutor for ProcessTrialRunner<P> {
    fn preflight(&self) -> Result<()> {
        for binary in [&self.binaries.sequential, &self.binaries.parallel] {
            if !binary.is_file() {
                return Err(Error::MissingExecutable {
                    path: binary.clone(),
                });
            }
        }
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    fn execute(
        &self,
        config: &ExperimentConfig,
        prior: WordCounts,
    ) -> std::result::Result<RawSample, TrialFailure> {
        let invocation = self.invocation(config);
        debug!(program = %invocation.program.display(), args = ?invocation.args, "launching counter");

        let completed = self.launch(&invocation)?;
        if !completed.success {
            warn!(
                cell = %config,
                code = ?completed.code,
                stderr = %excerpt(&completed.stderr),
                "counter exited unsuccessfully"
            );
            return Err(TrialFailure::NonZeroExit {
                code: completed.code,
                stderr: completed.stderr,
                elapsed: completed.elapsed,
            });
        }

        let parsed = parse_counters(&completed.stdout, prior);
        if !parsed.found_total {
            warn!(cell = %config, "no '{TOTAL_WORDS_LABEL}' line in output, keeping previous count");
        }

        Ok(RawSample::succeeded(duration_ms(completed.elapsed), parsed.counts))
    }
}

/// Block until the child exits or the timeout expires.
///
/// Returns `Ok(None)` after killing and reaping a child that timed out. A
/// child that turns out to have exited on its own at the deadline is
/// reported with its own status.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    match child.wait_timeout(timeout) {
        Ok(Some(status)) => Ok(Some(status)),
        Ok(None) => {
            let killed = child.kill();
            let status = child.wait()?;
            if killed.is_err() || exited_on_its_own(&status) {
                Ok(Some(status))
            } else {
                Ok(None)
            }
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(e)
        }
    }
}

/// Whether an exit status comes from a normal exit rather than a kill.
#[cfg(unix)]
fn exited_on_its_own(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal().is_none()
}

#[cfg(not(unix))]
fn exited_on_its_own(_status: &ExitStatus) -> bool {
    false
}

/// Background reader of one child pipe.
///
/// Bytes are published as they arrive, so a reader that never sees EOF still
/// yields everything read so far.
struct Drain {
    buffer: Arc<Mutex<Vec<u8>>>,
    closed: Receiver<()>,
}

impl Drain {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Self> {
        let mut pipe = pipe?;
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (tx, closed) = mpsc::channel();
        let shared = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut chunk = [0u8; DRAIN_CHUNK];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match shared.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(poisoned) => poisoned.into_inner().extend_from_slice(&chunk[..n]),
                    },
                }
            }
            let _ = tx.send(());
        });
        Some(Self { buffer, closed })
    }

    /// Wait for EOF until `deadline`, then take what was read. The flag is
    /// `false` if the pipe was still open; its reader thread is left behind.
    fn collect(drain: Option<Self>, deadline: Instant) -> (String, bool) {
        let Some(drain) = drain else {
            return (String::new(), true);
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        let closed = !matches!(
            drain.closed.recv_timeout(remaining),
            Err(RecvTimeoutError::Timeout)
        );
        let text = match drain.buffer.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        };
        (text, closed)
    }
}

fn excerpt(text: &str) -> String {
    text.trim().chars().take(STDERR_EXCERPT_CHARS).collect()
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
