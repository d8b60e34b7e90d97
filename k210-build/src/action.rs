//! Actions attached to build targets and the command lines they execute.

use std::fmt;
use std::path::Path;

use crate::HostOs;

/// A single argument of a [`CommandLine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    Literal(String),
    /// The serial port of the board, filled in once port detection has run.
    UploadPort,
}

impl CommandArg {
    fn resolve<'a>(&'a self, upload_port: &'a str) -> &'a str {
        match self {
            CommandArg::Literal(arg) => arg,
            CommandArg::UploadPort => upload_port,
        }
    }
}

/// An external program together with its arguments and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<CommandArg>,
    envs: Vec<(String, String)>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Run `script` through the shell of `host`, without touching it.
    pub fn shell(script: impl Into<String>, host: HostOs) -> Self {
        match host {
            HostOs::Windows => CommandLine::new("cmd").arg("/C").arg(script),
            HostOs::MacOs | HostOs::Other => CommandLine::new("sh").arg("-c").arg(script),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(CommandArg::Literal(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|arg| CommandArg::Literal(arg.into())));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Append the upload port placeholder.
    pub fn upload_port_arg(mut self) -> Self {
        self.args.push(CommandArg::UploadPort);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn raw_args(&self) -> &[CommandArg] {
        &self.args
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Whether any argument still refers to the upload port.
    pub fn uses_upload_port(&self) -> bool {
        self.args.contains(&CommandArg::UploadPort)
    }

    /// The arguments with the upload port placeholder replaced by `upload_port`.
    pub fn resolved_args(&self, upload_port: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.resolve(upload_port).to_owned())
            .collect()
    }

    /// Renders the full command the way a shell user would type it.
    pub fn render(&self, upload_port: &str) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|arg| arg.resolve(upload_port)))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render("$UPLOAD_PORT"))
    }
}

pub(crate) fn quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains(char::is_whitespace) && !arg.contains('"') {
        return arg.to_owned();
    }
    format!("\"{}\"", arg.replace('"', "\\\""))
}

/// What happens to the session when a command fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The failure ends the session.
    Fatal,
    /// The failure is reported and the session carries on.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAction {
    pub description: String,
    pub command: CommandLine,
    pub policy: FailurePolicy,
}

/// One step of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Look for the serial port of the board if none was configured.
    DetectUploadPort,
    Command(CommandAction),
}

impl Action {
    pub fn command(description: impl Into<String>, command: CommandLine) -> Self {
        Action::Command(CommandAction {
            description: description.into(),
            command,
            policy: FailurePolicy::Fatal,
        })
    }

    pub fn best_effort(description: impl Into<String>, command: CommandLine) -> Self {
        Action::Command(CommandAction {
            description: description.into(),
            command,
            policy: FailurePolicy::BestEffort,
        })
    }

    pub fn as_command(&self) -> Option<&CommandLine> {
        match self {
            Action::Command(action) => Some(&action.command),
            Action::DetectUploadPort => None,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Action::DetectUploadPort => "Looking for upload port...",
            Action::Command(action) => &action.description,
        }
    }
}
