use std::path::PathBuf;

use thiserror::Error;

/// Errors which abort a build session.
///
/// Configuration problems in the upload path are not represented here, they
/// are reported as warnings by [`crate::upload::dispatch`].
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to start '{program}'.")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' failed with exit code {}.", display_code(.code))]
    ToolFailed { program: String, code: Option<i32> },
    #[error("The artifact '{}' does not exist and no action can produce it.", .path.display())]
    MissingArtifact { path: PathBuf },
    #[error("No build rule named '{0}' has been registered.")]
    UnknownConverter(String),
    #[error("The target '{0}' is not part of the build graph.")]
    UnknownTarget(String),
    #[error("The target '{0}' depends on itself.")]
    DependencyCycle(String),
    #[error("Failed to read the sources in '{}'.", .path.display())]
    SourceScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// The exit code the session should terminate with.
    ///
    /// A failing external tool hands its own exit code through, everything
    /// else maps to `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::ToolFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "<terminated by signal>".to_owned(),
    }
}
