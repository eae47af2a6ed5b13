//! Playbook runner invocation: builds the `ansible-playbook` argument list
//! for a run and classifies the exit status.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::builder::ProcessCommandBuilder;
use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessRunner};

/// Which inventory partition a run is scoped to. Creation playbooks target
/// the `odd` group, deletion playbooks the `even` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetGroup {
    Creation,
    Deletion,
}

impl TargetGroup {
    /// Inventory limit passed to the runner via `-l`.
    pub fn limit(&self) -> &'static str {
        match self {
            TargetGroup::Creation => "odd",
            TargetGroup::Deletion => "even",
        }
    }
}

/// One playbook run: the declarative artifact, the inventory it applies to,
/// the host-group limit, and any inline variable overrides.
#[derive(Debug, Clone)]
pub struct PlaybookSpec {
    pub playbook: PathBuf,
    pub inventory: PathBuf,
    pub limit: TargetGroup,
    pub extra_vars: Vec<(String, String)>,
    pub extra_args: Vec<String>,
}

impl PlaybookSpec {
    pub fn new(playbook: PathBuf, inventory: PathBuf, limit: TargetGroup) -> Self {
        Self {
            playbook,
            inventory,
            limit,
            extra_vars: Vec::new(),
            extra_args: Vec::new(),
        }
    }

    pub fn extra_var(mut self, key: &str, value: &str) -> Self {
        self.extra_vars.push((key.to_string(), value.to_string()));
        self
    }

    pub fn extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }
}

#[async_trait]
pub trait PlaybookRunner: Send + Sync {
    /// Check whether the runner binary is reachable on the execution path.
    async fn check_availability(&self) -> Result<bool, ProcessError>;

    /// Apply a playbook run; the runner's output is not parsed, only its
    /// exit status.
    async fn apply(&self, spec: &PlaybookSpec) -> Result<(), ProcessError>;
}

pub struct PlaybookRunnerImpl {
    binary: String,
    runner: Arc<dyn ProcessRunner>,
}

impl PlaybookRunnerImpl {
    pub fn new(binary: &str, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            binary: binary.to_string(),
            runner,
        }
    }
}

#[async_trait]
impl PlaybookRunner for PlaybookRunnerImpl {
    async fn check_availability(&self) -> Result<bool, ProcessError> {
        let result = self
            .runner
            .run(
                ProcessCommandBuilder::new(&self.binary)
                    .args(["--version"])
                    .build(),
            )
            .await;

        match result {
            Ok(output) => Ok(output.status.success()),
            Err(ProcessError::CommandNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn apply(&self, spec: &PlaybookSpec) -> Result<(), ProcessError> {
        let mut builder = ProcessCommandBuilder::new(&self.binary)
            .arg("-i")
            .arg(&spec.inventory.to_string_lossy())
            .arg(&spec.playbook.to_string_lossy());

        for (key, value) in &spec.extra_vars {
            builder = builder.arg("-e").arg(&format!("{key}={value}"));
        }

        for arg in &spec.extra_args {
            builder = builder.arg(arg);
        }

        builder = builder.arg("-l").arg(spec.limit.limit());

        let output = self.runner.run(builder.build()).await?;

        match output.status {
            ExitStatus::Success => Ok(()),
            ExitStatus::Error(code) => Err(ProcessError::ExitCode(code)),
            ExitStatus::Signal(signal) => Err(ProcessError::Signal(signal)),
            ExitStatus::Timeout => Err(ProcessError::Timeout(output.duration)),
        }
    }
}
