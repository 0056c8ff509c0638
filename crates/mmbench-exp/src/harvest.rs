use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mmbench_core::errors::{BenchError, ErrorInfo};
use mmbench_core::Variant;
use tracing::{debug, warn};

use crate::aggregate::max_duration;
use crate::config::ArtifactConfig;

/// Marker preceding the duration in a worker result file.
const TIMING_MARKER: &str = "TEMPO,";

/// Source of self-reported worker timings for the parallel variants.
///
/// This is the only place that knows how workers report their completion
/// time; swapping the shared directory for another channel only touches
/// implementations of this trait.
pub trait TimingCollector {
    /// Removes every leftover result file of `variant`. Idempotent.
    fn clear(&self, variant: Variant) -> Result<usize, BenchError>;

    /// Maximum duration reported by the workers of the last trial, or `None`
    /// when no file yielded a parseable value.
    fn collect_max(&self, variant: Variant) -> Result<Option<f64>, BenchError>;
}

impl<C: TimingCollector + ?Sized> TimingCollector for &C {
    fn clear(&self, variant: Variant) -> Result<usize, BenchError> {
        (**self).clear(variant)
    }

    fn collect_max(&self, variant: Variant) -> Result<Option<f64>, BenchError> {
        (**self).collect_max(variant)
    }
}

/// [`TimingCollector`] reading per-worker files from a shared result directory.
#[derive(Debug, Clone)]
pub struct ArtifactHarvester {
    results_dir: PathBuf,
    prefixes: ArtifactConfig,
}

impl ArtifactHarvester {
    /// Creates a harvester over `results_dir` with the given naming convention.
    pub fn new(results_dir: impl Into<PathBuf>, prefixes: ArtifactConfig) -> Self {
        Self {
            results_dir: results_dir.into(),
            prefixes,
        }
    }

    /// Directory scanned for result files.
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    fn prefix(&self, variant: Variant) -> Result<&str, BenchError> {
        self.prefixes.prefix(variant).ok_or_else(|| {
            BenchError::Harvest(
                ErrorInfo::new("harvest-variant", "variant does not write result files")
                    .with_context("variant", variant.label()),
            )
        })
    }

    /// Result files of `variant`, sorted by name.
    fn matching_files(&self, variant: Variant) -> Result<Vec<PathBuf>, BenchError> {
        let prefix = self.prefix(variant)?;
        let entries = match fs::read_dir(&self.results_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(BenchError::Harvest(
                    ErrorInfo::new("harvest-list", "failed to list result directory")
                        .with_context("path", self.results_dir.display().to_string())
                        .with_hint(err.to_string()),
                ))
            }
        };
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                BenchError::Harvest(
                    ErrorInfo::new("harvest-entry", "failed to read result directory entry")
                        .with_context("path", self.results_dir.display().to_string())
                        .with_hint(err.to_string()),
                )
            })?;
            let name = entry.file_name();
            if !name.to_str().is_some_and(|name| name.starts_with(prefix)) {
                continue;
            }
            if entry.file_type().map(|kind| kind.is_file()).unwrap_or(false) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parsed duration of every readable worker file; unparseable files are
    /// skipped with a warning.
    pub fn collect(&self, variant: Variant) -> Result<Vec<f64>, BenchError> {
        let mut durations = Vec::new();
        for path in self.matching_files(variant)? {
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping unreadable result file");
                    continue;
                }
            };
            match parse_duration(&content) {
                Some(value) => durations.push(value),
                None => {
                    warn!(file = %path.display(), "skipping result file without a timing value")
                }
            }
        }
        Ok(durations)
    }
}

impl TimingCollector for ArtifactHarvester {
    fn clear(&self, variant: Variant) -> Result<usize, BenchError> {
        fs::create_dir_all(&self.results_dir).map_err(|err| {
            BenchError::Harvest(
                ErrorInfo::new("harvest-create", "failed to create result directory")
                    .with_context("path", self.results_dir.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        let mut removed = 0;
        let mut first_failure = None;
        for path in self.matching_files(variant)? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(
                        file = %path.display(),
                        error = %err,
                        "failed to remove stale result file"
                    );
                    first_failure.get_or_insert_with(|| {
                        BenchError::Harvest(
                            ErrorInfo::new("harvest-remove", "failed to remove stale result file")
                                .with_context("path", path.display().to_string())
                                .with_hint(err.to_string()),
                        )
                    });
                }
            }
        }
        if let Some(err) = first_failure {
            return Err(err);
        }
        debug!(variant = %variant, removed, "cleared result files");
        Ok(removed)
    }

    fn collect_max(&self, variant: Variant) -> Result<Option<f64>, BenchError> {
        Ok(max_duration(&self.collect(variant)?))
    }
}

/// Extracts the self-reported duration from a worker file.
///
/// The current format carries `TEMPO,<ms>` anywhere in the file; the value is
/// the run of digits and dots right after the marker, so trailing units or a
/// leading label are tolerated. Files without such a marker fall back to the
/// older format where the first non-empty line is the bare value. Negative and
/// non-finite values are rejected.
pub fn parse_duration(content: &str) -> Option<f64> {
    let raw = match marked_value(content) {
        Some(raw) => raw,
        None => content.lines().map(str::trim).find(|line| !line.is_empty())?,
    };
    let value: f64 = raw.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Numeric run following the first marker that is followed by one.
fn marked_value(content: &str) -> Option<&str> {
    content.match_indices(TIMING_MARKER).find_map(|(idx, _)| {
        let rest = &content[idx + TIMING_MARKER.len()..];
        let end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        (end > 0).then(|| &rest[..end])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_marker_line() {
        assert_eq!(parse_duration("LINHAS,0,99\nTEMPO,120.5\n"), Some(120.5));
        assert_eq!(parse_duration("  TEMPO,17 \n"), Some(17.0));
    }

    #[test]
    fn marker_is_found_mid_line() {
        assert_eq!(parse_duration("Processo 3 TEMPO,120.5\n"), Some(120.5));
        assert_eq!(parse_duration("worker=2;TEMPO,8.25;rows=100"), Some(8.25));
    }

    #[test]
    fn trailing_text_after_value_is_ignored() {
        assert_eq!(parse_duration("TEMPO,120.5ms\n"), Some(120.5));
    }

    #[test]
    fn first_marker_with_a_value_wins() {
        assert_eq!(parse_duration("TEMPO,\nTEMPO,33\nTEMPO,44\n"), Some(33.0));
    }

    #[test]
    fn parses_legacy_bare_value() {
        assert_eq!(parse_duration("\n  42.25\nignored\n"), Some(42.25));
    }

    #[test]
    fn marker_with_garbage_is_rejected() {
        assert_eq!(parse_duration("TEMPO,abc\n12\n"), None);
    }

    #[test]
    fn rejects_corrupt_and_negative_values() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("\u{0}\u{1}garbage"), None);
        assert_eq!(parse_duration("TEMPO,-3"), None);
        assert_eq!(parse_duration("TEMPO,NaN"), None);
        assert_eq!(parse_duration("inf"), None);
    }
}
