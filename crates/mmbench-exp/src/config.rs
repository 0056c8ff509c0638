use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mmbench_core::errors::{BenchError, ErrorInfo};
use mmbench_core::Variant;
use serde::{Deserialize, Serialize};

/// YAML-configurable description of a complete experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Directory every relative path below is resolved against.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,
    /// Number of trials per configuration.
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// Per-trial wall-clock limit in seconds; `None` waits forever.
    #[serde(default = "default_trial_timeout_secs")]
    pub trial_timeout_secs: Option<u64>,
    /// E1 definition.
    #[serde(default)]
    pub size_sweep: SizeSweepConfig,
    /// E2 definition.
    #[serde(default)]
    pub granularity_sweep: GranularitySweepConfig,
    /// Locations of the external executables.
    #[serde(default)]
    pub programs: ProgramPaths,
    /// Input, result and report locations.
    #[serde(default)]
    pub paths: DataPaths,
    /// Result-file naming convention of the parallel programs.
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    /// Command that builds the external programs.
    #[serde(default)]
    pub build: BuildConfig,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_repetitions() -> u32 {
    10
}

fn default_trial_timeout_secs() -> Option<u64> {
    Some(300)
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            repetitions: default_repetitions(),
            trial_timeout_secs: default_trial_timeout_secs(),
            size_sweep: SizeSweepConfig::default(),
            granularity_sweep: GranularitySweepConfig::default(),
            programs: ProgramPaths::default(),
            paths: DataPaths::default(),
            artifacts: ArtifactConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

/// Matrix sizes explored by the size sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSweepConfig {
    #[serde(default = "default_sizes")]
    pub sizes: Vec<u32>,
}

fn default_sizes() -> Vec<u32> {
    vec![100, 200, 400, 800]
}

impl Default for SizeSweepConfig {
    fn default() -> Self {
        Self {
            sizes: default_sizes(),
        }
    }
}

/// Fixed size and granularity values explored by the granularity sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranularitySweepConfig {
    #[serde(default = "default_fixed_size")]
    pub size: u32,
    #[serde(default = "default_granularities")]
    pub values: Vec<u64>,
}

fn default_fixed_size() -> u32 {
    800
}

fn default_granularities() -> Vec<u64> {
    vec![20000, 40000, 60000, 80000, 120000, 160000, 240000, 320000]
}

impl Default for GranularitySweepConfig {
    fn default() -> Self {
        Self {
            size: default_fixed_size(),
            values: default_granularities(),
        }
    }
}

/// Paths of the external programs, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramPaths {
    #[serde(default = "default_generator")]
    pub generator: PathBuf,
    #[serde(default = "default_sequential")]
    pub sequential: PathBuf,
    #[serde(default = "default_threads")]
    pub threads: PathBuf,
    #[serde(default = "default_process")]
    pub process: PathBuf,
}

fn default_generator() -> PathBuf {
    PathBuf::from("bin/auxiliar")
}

fn default_sequential() -> PathBuf {
    PathBuf::from("bin/algoritmo_sequencial")
}

fn default_threads() -> PathBuf {
    PathBuf::from("bin/algoritmo_paralelo_threads")
}

fn default_process() -> PathBuf {
    PathBuf::from("bin/algoritmo_paralelo_process")
}

impl Default for ProgramPaths {
    fn default() -> Self {
        Self {
            generator: default_generator(),
            sequential: default_sequential(),
            threads: default_threads(),
            process: default_process(),
        }
    }
}

impl ProgramPaths {
    /// Program implementing the given variant.
    pub fn for_variant(&self, variant: Variant) -> &Path {
        match variant {
            Variant::Sequential => &self.sequential,
            Variant::ThreadParallel => &self.threads,
            Variant::ProcessParallel => &self.process,
        }
    }
}

/// Data file and directory locations, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaths {
    #[serde(default = "default_matrix_a")]
    pub matrix_a: PathBuf,
    #[serde(default = "default_matrix_b")]
    pub matrix_b: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

fn default_matrix_a() -> PathBuf {
    PathBuf::from("data/m1.txt")
}

fn default_matrix_b() -> PathBuf {
    PathBuf::from("data/m2.txt")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("report")
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            matrix_a: default_matrix_a(),
            matrix_b: default_matrix_b(),
            results_dir: default_results_dir(),
            report_dir: default_report_dir(),
        }
    }
}

/// File-name prefixes that identify each parallel variant's worker files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_thread_prefix")]
    pub thread_prefix: String,
    #[serde(default = "default_process_prefix")]
    pub process_prefix: String,
}

fn default_thread_prefix() -> String {
    "thread_".to_string()
}

fn default_process_prefix() -> String {
    "proc_".to_string()
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            thread_prefix: default_thread_prefix(),
            process_prefix: default_process_prefix(),
        }
    }
}

impl ArtifactConfig {
    /// Prefix owned by a parallel variant; `None` for the sequential program.
    pub fn prefix(&self, variant: Variant) -> Option<&str> {
        match variant {
            Variant::Sequential => None,
            Variant::ThreadParallel => Some(&self.thread_prefix),
            Variant::ProcessParallel => Some(&self.process_prefix),
        }
    }
}

/// Build command run once before any sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_build_enabled")]
    pub enabled: bool,
    #[serde(default = "default_build_program")]
    pub program: String,
    #[serde(default = "default_build_args")]
    pub args: Vec<String>,
}

fn default_build_enabled() -> bool {
    true
}

fn default_build_program() -> String {
    "make".to_string()
}

fn default_build_args() -> Vec<String> {
    vec!["all".to_string()]
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            enabled: default_build_enabled(),
            program: default_build_program(),
            args: default_build_args(),
        }
    }
}

impl ExperimentConfig {
    /// Loads a configuration from a YAML file. Missing keys take their defaults.
    pub fn from_yaml_path(path: &Path) -> Result<Self, BenchError> {
        let text = fs::read_to_string(path).map_err(|err| {
            BenchError::Config(
                ErrorInfo::new("config-read", "failed to read configuration file")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, BenchError> {
        serde_yaml::from_str(text).map_err(|err| {
            BenchError::Config(
                ErrorInfo::new("config-parse", "invalid configuration YAML")
                    .with_hint(err.to_string()),
            )
        })
    }

    /// Checks the invariants the sweeps rely on.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.repetitions == 0 {
            return Err(BenchError::Config(
                ErrorInfo::new("config-repetitions", "repetitions must be positive")
                    .with_context("repetitions", "0"),
            ));
        }
        if self.size_sweep.sizes.is_empty() {
            return Err(BenchError::Config(ErrorInfo::new(
                "config-size-sweep",
                "size sweep has no sizes",
            )));
        }
        if self.size_sweep.sizes.contains(&0) || self.granularity_sweep.size == 0 {
            return Err(BenchError::Config(ErrorInfo::new(
                "config-size",
                "matrix sizes must be positive",
            )));
        }
        if self.granularity_sweep.values.is_empty() {
            return Err(BenchError::Config(ErrorInfo::new(
                "config-granularity-sweep",
                "granularity sweep has no values",
            )));
        }
        if self.granularity_sweep.values.contains(&0) {
            return Err(BenchError::Config(ErrorInfo::new(
                "config-granularity-sweep",
                "granularity values must be positive",
            )));
        }
        let thread = self.artifacts.thread_prefix.as_str();
        let process = self.artifacts.process_prefix.as_str();
        if thread.is_empty() || process.is_empty() {
            return Err(BenchError::Config(ErrorInfo::new(
                "config-artifacts",
                "artifact prefixes must not be empty",
            )));
        }
        // A prefix that starts another would make one variant harvest the other's files.
        if thread.starts_with(process) || process.starts_with(thread) {
            return Err(BenchError::Config(
                ErrorInfo::new("config-artifacts", "artifact prefixes overlap")
                    .with_context("thread_prefix", thread)
                    .with_context("process_prefix", process),
            ));
        }
        Ok(())
    }

    /// Resolves a configured path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Per-trial timeout, if any.
    pub fn trial_timeout(&self) -> Option<Duration> {
        self.trial_timeout_secs.map(Duration::from_secs)
    }
}
