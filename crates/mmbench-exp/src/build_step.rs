use std::path::Path;
use std::process::Command;

use mmbench_core::errors::{BenchError, ErrorInfo};
use tracing::{info, warn};

use crate::config::BuildConfig;

/// Runs the configured build command once in `project_root`.
///
/// Returns `Ok(false)` when building is disabled. A command that cannot be
/// started or exits unsuccessfully is a [`BenchError::Build`] carrying the
/// tail of its diagnostic output.
pub fn ensure_built(build: &BuildConfig, project_root: &Path) -> Result<bool, BenchError> {
    if !build.enabled {
        info!("build step disabled");
        return Ok(false);
    }
    let command_line = std::iter::once(build.program.as_str())
        .chain(build.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    info!(command = %command_line, root = %project_root.display(), "building programs");
    let output = Command::new(&build.program)
        .args(&build.args)
        .current_dir(project_root)
        .output()
        .map_err(|err| {
            BenchError::Build(
                ErrorInfo::new("build-spawn", "failed to start build command")
                    .with_context("command", command_line.clone())
                    .with_hint(err.to_string()),
            )
        })?;
    if output.status.success() {
        return Ok(true);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let diagnostics = tail_lines(&stderr, 20);
    warn!(command = %command_line, status = %output.status, "build failed");
    let mut info = ErrorInfo::new("build-failed", "build command exited unsuccessfully")
        .with_context("command", command_line)
        .with_context("status", output.status.to_string());
    if !diagnostics.is_empty() {
        info = info.with_hint(diagnostics);
    }
    Err(BenchError::Build(info))
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_build_is_skipped() {
        let build = BuildConfig {
            enabled: false,
            ..BuildConfig::default()
        };
        assert!(!ensure_built(&build, Path::new(".")).expect("skipped"));
    }

    #[test]
    fn missing_build_tool_is_a_build_failure() {
        let build = BuildConfig {
            enabled: true,
            program: "mmbench-definitely-missing-tool".to_string(),
            args: Vec::new(),
        };
        let err = ensure_built(&build, Path::new(".")).expect_err("spawn fails");
        assert!(err.is_build_failure());
        assert_eq!(err.info().code, "build-spawn");
    }

    #[cfg(unix)]
    #[test]
    fn failing_build_reports_stderr() {
        let dir = tempfile::tempdir().expect("tempdir");
        let build = BuildConfig {
            enabled: true,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo 'missing rule' >&2; exit 2".to_string()],
        };
        let err = ensure_built(&build, dir.path()).expect_err("build fails");
        assert!(err.is_build_failure());
        assert_eq!(err.info().hint.as_deref(), Some("missing rule"));
    }

    #[cfg(unix)]
    #[test]
    fn successful_build_runs_in_project_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let build = BuildConfig {
            enabled: true,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "touch built".to_string()],
        };
        assert!(ensure_built(&build, dir.path()).expect("build"));
        assert!(dir.path().join("built").exists());
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail_lines("a\n\nb\nc\n", 2), "b\nc");
    }
}
