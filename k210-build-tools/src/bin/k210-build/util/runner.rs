//! Command runners backing the executor.

use std::process::Command;

use k210_build::executor::{CommandRunner, Invocation, ToolExit};

use crate::util::logging;

/// Spawns every invocation as a child process sharing our stdio.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> std::io::Result<ToolExit> {
        tracing::debug!("Running {}", invocation);

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.envs.iter().cloned())
            .status()?;

        tracing::debug!("'{}' exited with {}", invocation.program, status);

        Ok(ToolExit {
            code: status.code(),
        })
    }

    fn announce(&mut self, message: &str) {
        logging::println(message);
    }
}

/// Prints what would run without running anything.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    /// Number of commands that would have run.
    pub skipped: usize,
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, invocation: &Invocation) -> std::io::Result<ToolExit> {
        self.skipped += 1;
        logging::println(invocation.to_string());
        Ok(ToolExit::SUCCESS)
    }

    fn announce(&mut self, message: &str) {
        logging::println(message);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dry_run_always_succeeds() {
        let mut runner = DryRunRunner::default();
        let invocation = Invocation {
            program: "definitely-not-installed-objcopy".into(),
            args: vec!["-O".into(), "binary".into()],
            envs: Vec::new(),
        };

        assert_eq!(runner.run(&invocation).unwrap(), ToolExit::SUCCESS);
        assert_eq!(runner.skipped, 1);
    }

    #[cfg(unix)]
    #[test]
    fn exit_codes_are_passed_through() {
        let mut runner = ProcessRunner;
        let invocation = Invocation {
            program: "sh".into(),
            args: vec!["-c".into(), "exit \"$CODE\"".into()],
            envs: vec![("CODE".into(), "3".into())],
        };

        assert_eq!(runner.run(&invocation).unwrap(), ToolExit { code: Some(3) });
    }

    #[test]
    fn missing_programs_fail_to_spawn() {
        let mut runner = ProcessRunner;
        let invocation = Invocation {
            program: "definitely-not-installed-objcopy".into(),
            args: Vec::new(),
            envs: Vec::new(),
        };

        assert!(runner.run(&invocation).is_err());
    }
}
