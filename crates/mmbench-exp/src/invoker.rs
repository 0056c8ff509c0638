use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use mmbench_core::{TrialFailure, TrialOutcome};
use tracing::debug;

/// Pause between two exit checks of a child process.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Runs one external program as an isolated trial.
pub trait ProgramRunner {
    /// Runs `program` with `args` and waits for it to finish.
    ///
    /// On success the outcome carries the wall-clock duration measured around
    /// the call, in milliseconds.
    fn run(&self, program: &Path, args: &[String]) -> TrialOutcome;
}

impl<R: ProgramRunner + ?Sized> ProgramRunner for &R {
    fn run(&self, program: &Path, args: &[String]) -> TrialOutcome {
        (**self).run(program, args)
    }
}

/// Child-process backed [`ProgramRunner`] with an optional per-trial timeout.
#[derive(Debug, Clone, Default)]
pub struct Invoker {
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Invoker {
    /// Creates an invoker that waits indefinitely in the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs children inside `dir`; the external programs use relative paths.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kills children that run longer than `timeout` and reports a failed trial.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured per-trial timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn command(&self, program: &Path, args: &[String]) -> Command {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        own_process_group(&mut command);
        command
    }

    fn wait(&self, child: &mut Child, started: Instant) -> Result<ExitStatus, TrialFailure> {
        let Some(limit) = self.timeout else {
            return child.wait().map_err(|err| TrialFailure::Spawn {
                detail: err.to_string(),
            });
        };
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(err) => {
                    terminate_and_reap(child);
                    return Err(TrialFailure::Spawn {
                        detail: err.to_string(),
                    });
                }
            }
            let elapsed = started.elapsed();
            if elapsed >= limit {
                terminate_and_reap(child);
                return Err(TrialFailure::TimedOut {
                    limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                });
            }
            thread::sleep(POLL_INTERVAL.min(limit - elapsed));
        }
    }
}

impl ProgramRunner for Invoker {
    fn run(&self, program: &Path, args: &[String]) -> TrialOutcome {
        let started = Instant::now();
        let mut child = match self.command(program, args).spawn() {
            Ok(child) => child,
            Err(err) => {
                return TrialOutcome::failed(TrialFailure::Spawn {
                    detail: format!("{}: {err}", program.display()),
                })
            }
        };
        let status = match self.wait(&mut child, started) {
            Ok(status) => status,
            Err(failure) => return TrialOutcome::failed(failure),
        };
        let elapsed = started.elapsed();
        debug!(
            program = %program.display(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            %status,
            "child exited"
        );
        outcome_from_status(status, elapsed)
    }
}

/// Makes the child lead a fresh process group so its workers can be killed with it.
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// Kills the child together with every worker it forked, then reaps it.
///
/// Workers that outlive a timed-out trial would otherwise write result files
/// into the next trial.
#[cfg(unix)]
fn terminate_and_reap(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: the group id is our own, still unreaped child's pid, which
        // leads the group created by `own_process_group`.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn outcome_from_status(status: ExitStatus, elapsed: Duration) -> TrialOutcome {
    if status.success() {
        return TrialOutcome::succeeded(duration_ms(elapsed));
    }
    match status.code() {
        Some(code) => TrialOutcome::failed(TrialFailure::NonZeroExit { code }),
        None => TrialOutcome::failed(TrialFailure::Signalled),
    }
}

/// Converts a wall-clock duration to the harness-wide millisecond unit.
pub fn duration_ms(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn zero_exit_succeeds_with_duration() {
        let outcome = Invoker::new().run(Path::new("sh"), &sh("exit 0"));
        let duration = outcome.duration_ms().expect("success");
        assert!(duration >= 0.0);
    }

    #[test]
    fn non_zero_exit_is_recorded_without_retry() {
        let outcome = Invoker::new().run(Path::new("sh"), &sh("exit 3"));
        assert_eq!(
            outcome.failure(),
            Some(&TrialFailure::NonZeroExit { code: 3 })
        );
    }

    #[test]
    fn missing_program_is_a_spawn_failure() {
        let outcome = Invoker::new().run(Path::new("/nonexistent/mmbench-program"), &[]);
        assert!(matches!(
            outcome.failure(),
            Some(TrialFailure::Spawn { .. })
        ));
    }

    #[test]
    fn hung_program_times_out() {
        let invoker = Invoker::new().with_timeout(Some(Duration::from_millis(100)));
        let started = Instant::now();
        let outcome = invoker.run(Path::new("sleep"), &["5".to_string()]);
        assert_eq!(
            outcome.failure(),
            Some(&TrialFailure::TimedOut { limit_ms: 100 })
        );
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn timeout_kills_forked_workers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let invoker = Invoker::new()
            .with_working_dir(dir.path())
            .with_timeout(Some(Duration::from_millis(300)));
        let outcome = invoker.run(
            Path::new("sh"),
            &sh("(sleep 0.45; echo TEMPO,999 > proc_0) & sleep 5"),
        );
        assert_eq!(
            outcome.failure(),
            Some(&TrialFailure::TimedOut { limit_ms: 300 })
        );
        thread::sleep(Duration::from_millis(700));
        assert!(!dir.path().join("proc_0").exists());
    }

    #[test]
    fn working_dir_is_applied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let invoker = Invoker::new().with_working_dir(dir.path());
        let outcome = invoker.run(Path::new("sh"), &sh("touch marker"));
        assert!(outcome.is_success());
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn duration_is_reported_in_milliseconds() {
        assert!((duration_ms(Duration::from_micros(5_140)) - 5.14).abs() < 1e-9);
    }
}
