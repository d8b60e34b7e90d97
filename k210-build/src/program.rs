//! The sources of the firmware and the compiler invocation linking them.

use std::path::{Path, PathBuf};

use crate::toolchain::ToolRole;
use crate::{Action, BuildEnvironment, BuildError, CommandLine};

const C_EXTENSIONS: &[&str] = &["c", "S", "s"];
const CXX_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx"];

/// Source files making up the firmware program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramSources {
    files: Vec<PathBuf>,
}

impl ProgramSources {
    pub fn new(mut files: Vec<PathBuf>) -> Self {
        files.sort();
        Self { files }
    }

    /// Collects all C, C++ and assembly files below `dir`.
    pub fn scan(dir: &Path) -> Result<Self, BuildError> {
        let mut files = Vec::new();
        collect(dir, &mut files).map_err(|source| BuildError::SourceScan {
            path: dir.to_path_buf(),
            source,
        })?;

        tracing::debug!("Found {} source files in {}", files.len(), dir.display());

        Ok(Self::new(files))
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn has_cxx(&self) -> bool {
        self.files.iter().any(|file| has_extension(file, CXX_EXTENSIONS))
    }

    /// One compiler driver call compiling and linking every source into `output`.
    ///
    /// C++ sources switch the driver to `CXX` so the C++ runtime gets linked.
    pub fn link_command(&self, env: &BuildEnvironment, output: &Path) -> CommandLine {
        let driver = env.toolchain().tool(if self.has_cxx() {
            ToolRole::CxxCompiler
        } else {
            ToolRole::CCompiler
        });

        let command = CommandLine::new(driver)
            .args(env.ccflags().iter().cloned())
            .args(env.linkflags().iter().cloned())
            .arg("-o")
            .path_arg(output);

        self.files
            .iter()
            .fold(command, |command, file| command.path_arg(file))
    }

    pub fn link_action(&self, env: &BuildEnvironment, output: &Path) -> Action {
        Action::command(
            format!("Linking {}", output.display()),
            self.link_command(env, output),
        )
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}

fn collect(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect(&path, files)?;
        } else if has_extension(&path, C_EXTENSIONS) || has_extension(&path, CXX_EXTENSIONS) {
            files.push(path);
        }
    }
    Ok(())
}
