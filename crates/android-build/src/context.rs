use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::BuildEnvConfig;
use crate::log::{BuildLog, TracingLog};
use crate::runner::{CommandRunner, DryRunRunner, ShellRunner};

/// Execution environment shared with `Build`: the Android tree, the lunch
/// selection, where log entries go and how scripts get executed.
#[derive(Clone)]
pub struct ExecutionContext {
    pub android_build_top: Option<PathBuf>,
    pub target_product: Option<String>,
    pub target_build_variant: Option<String>,
    pub log: Arc<dyn BuildLog>,
    pub runner: Arc<dyn CommandRunner>,
}

impl ExecutionContext {
    pub fn new(
        android_build_top: impl Into<PathBuf>,
        target_product: impl Into<String>,
        target_build_variant: impl Into<String>,
    ) -> Self {
        Self {
            android_build_top: Some(android_build_top.into()),
            target_product: Some(target_product.into()),
            target_build_variant: Some(target_build_variant.into()),
            log: Arc::new(TracingLog),
            runner: Arc::new(ShellRunner::default()),
        }
    }

    pub fn from_config(cfg: &BuildEnvConfig) -> Self {
        let runner = match cfg.shell.as_ref() {
            Some(shell) => ShellRunner::new(shell),
            None => ShellRunner::default(),
        };
        Self {
            android_build_top: cfg.android_build_top.clone(),
            target_product: cfg.target_product.clone(),
            target_build_variant: cfg.target_build_variant.clone(),
            log: Arc::new(TracingLog),
            runner: Arc::new(runner),
        }
    }

    /// Reads the variables `lunch` exports into the shell.
    pub fn from_env() -> Self {
        let mut cfg = BuildEnvConfig::default();
        cfg.fill_from_env();
        Self::from_config(&cfg)
    }

    pub fn with_log(mut self, log: Arc<dyn BuildLog>) -> Self {
        self.log = log;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Swaps the runner for one that only logs what it would execute.
    pub fn dry_run(self) -> Self {
        let runner = Arc::new(DryRunRunner::new(Arc::clone(&self.log)));
        self.with_runner(runner)
    }

    pub fn android_build_top(&self) -> Option<&Path> {
        self.android_build_top
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn target_product(&self) -> Option<&str> {
        non_empty(self.target_product.as_deref())
    }

    pub fn target_build_variant(&self) -> Option<&str> {
        non_empty(self.target_build_variant.as_deref())
    }

    /// Names of required fields that are empty or absent.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.android_build_top().is_none() {
            missing.push("android_build_top");
        }
        if self.target_product().is_none() {
            missing.push("target_product");
        }
        if self.target_build_variant().is_none() {
            missing.push("target_build_variant");
        }
        missing
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}
