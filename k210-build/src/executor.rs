//! Running the actions of a [`TargetGraph`].

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::SystemTime;

use crate::action::{quote, CommandAction, FailurePolicy};
use crate::upload::port::{select_port, PortScanner};
use crate::{Action, BuildError, CommandLine, TargetGraph, TargetNode};

/// Port handed to uploaders when none was configured or found.
const FALLBACK_PORT: &str = "DEFAULT";

/// A fully resolved command, ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    fn new(command: &CommandLine, upload_port: &str) -> Self {
        Self {
            program: command.program().to_owned(),
            args: command.resolved_args(upload_port),
            envs: command.envs().to_vec(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.envs {
            write!(f, "{key}={} ", quote(value))?;
        }
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// How an external tool terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    /// `None` if the tool was killed by a signal.
    pub code: Option<i32>,
}

impl ToolExit {
    pub const SUCCESS: ToolExit = ToolExit { code: Some(0) };

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external tools on behalf of the executor.
pub trait CommandRunner {
    /// Runs `invocation` to completion.
    fn run(&mut self, invocation: &Invocation) -> std::io::Result<ToolExit>;

    /// Shows a progress line to the user.
    fn announce(&mut self, message: &str) {
        println!("{message}");
    }
}

/// What happened while executing the requested goals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Nodes whose actions ran, in order.
    pub executed: Vec<String>,
    /// Nodes which were up to date.
    pub up_to_date: Vec<String>,
    /// Problems of best-effort steps.
    pub warnings: Vec<String>,
}

/// Executes target graphs sequentially, in dependency order.
pub struct Executor<'a> {
    runner: &'a mut dyn CommandRunner,
    ports: &'a dyn PortScanner,
    verbose: bool,
    upload_port: Option<String>,
}

impl<'a> Executor<'a> {
    pub fn new(runner: &'a mut dyn CommandRunner, ports: &'a dyn PortScanner) -> Self {
        Self {
            runner,
            ports,
            verbose: false,
            upload_port: None,
        }
    }

    /// Announce full command lines instead of short descriptions.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The configured upload port. Port detection is skipped when set.
    pub fn upload_port(mut self, port: Option<String>) -> Self {
        self.upload_port = port;
        self
    }

    pub fn run<S: AsRef<str>>(
        &mut self,
        graph: &TargetGraph,
        goals: &[S],
    ) -> Result<ExecutionReport, BuildError> {
        let schedule = graph.schedule(goals)?;
        let mut report = ExecutionReport::default();
        let mut rebuilt = HashSet::new();

        for node in schedule {
            let prerequisite_rebuilt = node
                .prerequisites
                .iter()
                .any(|name| rebuilt.contains(name.as_str()));

            if !self.needs_run(graph, node, prerequisite_rebuilt)? {
                tracing::debug!("'{}' is up to date", node.name);
                report.up_to_date.push(node.name.clone());
                continue;
            }

            let needs_port = node
                .actions
                .iter()
                .filter_map(Action::as_command)
                .any(CommandLine::uses_upload_port);

            for action in &node.actions {
                self.execute(action, needs_port, &mut report)?;
            }

            rebuilt.insert(node.name.as_str());
            report.executed.push(node.name.clone());
        }

        Ok(report)
    }

    fn needs_run(
        &self,
        graph: &TargetGraph,
        node: &TargetNode,
        prerequisite_rebuilt: bool,
    ) -> Result<bool, BuildError> {
        if node.actions.is_empty() {
            // Nothing can produce a missing output.
            if let Some(missing) = node.outputs.iter().find(|output| !output.exists()) {
                return Err(BuildError::MissingArtifact {
                    path: missing.clone(),
                });
            }
            return Ok(node.always_build);
        }

        if node.always_build || prerequisite_rebuilt {
            return Ok(true);
        }
        if node.outputs.is_empty() {
            return Ok(false);
        }

        let Some(oldest_output) = oldest(&node.outputs) else {
            return Ok(true);
        };

        let inputs = node
            .prerequisites
            .iter()
            .filter_map(|name| graph.node(name))
            .flat_map(|prerequisite| prerequisite.outputs.iter())
            .chain(node.sources.iter());

        for input in inputs {
            match modified(input) {
                Some(time) if time <= oldest_output => {}
                // Newer, or missing and therefore unknown.
                _ => return Ok(true),
            }
        }

        Ok(false)
    }

    fn execute(
        &mut self,
        action: &Action,
        needs_port: bool,
        report: &mut ExecutionReport,
    ) -> Result<(), BuildError> {
        match action {
            Action::DetectUploadPort => {
                self.runner.announce(action.description());
                if needs_port {
                    self.detect_upload_port(report);
                } else {
                    tracing::debug!("The uploader selects the port on its own");
                }
                Ok(())
            }
            Action::Command(command) => self.execute_command(command, report),
        }
    }

    fn detect_upload_port(&mut self, report: &mut ExecutionReport) {
        if let Some(port) = &self.upload_port {
            tracing::debug!("Using configured upload port {}", port);
            return;
        }

        match self.ports.serial_ports() {
            Ok(candidates) => match select_port(None, &candidates) {
                Some(port) => {
                    self.runner.announce(&format!("Auto-detected: {port}"));
                    self.upload_port = Some(port);
                }
                None => {
                    warn(report, "No serial port found for the upload".to_owned());
                }
            },
            Err(error) => {
                warn(report, format!("Failed to list serial ports: {error}"));
            }
        }
    }

    fn execute_command(
        &mut self,
        action: &CommandAction,
        report: &mut ExecutionReport,
    ) -> Result<(), BuildError> {
        let upload_port = match (&self.upload_port, action.command.uses_upload_port()) {
            (Some(port), _) => port.clone(),
            (None, true) => {
                warn(
                    report,
                    format!("No upload port is known, passing '{FALLBACK_PORT}' to the uploader"),
                );
                FALLBACK_PORT.to_owned()
            }
            (None, false) => String::new(),
        };

        if self.verbose {
            self.runner.announce(&action.command.render(&upload_port));
        } else {
            self.runner.announce(&action.description);
        }

        let invocation = Invocation::new(&action.command, &upload_port);
        let result = self.runner.run(&invocation);

        let failure = match result {
            Ok(exit) if exit.success() => return Ok(()),
            Ok(exit) => BuildError::ToolFailed {
                program: invocation.program,
                code: exit.code,
            },
            Err(source) => BuildError::Spawn {
                program: invocation.program,
                source,
            },
        };

        match action.policy {
            FailurePolicy::Fatal => Err(failure),
            FailurePolicy::BestEffort => {
                warn(report, failure.to_string());
                Ok(())
            }
        }
    }
}

fn warn(report: &mut ExecutionReport, message: String) {
    tracing::warn!("{}", message);
    report.warnings.push(message);
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn oldest(paths: &[std::path::PathBuf]) -> Option<SystemTime> {
    paths
        .iter()
        .map(|path| modified(path))
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .min()
}
