//! Rendering of session errors.
use colored::{ColoredString, Colorize};
use std::io::Write;

use k210_build::board::BoardError;
use k210_build::toolchain::TOOLCHAIN_PREFIX;
use k210_build::BuildError;

/// The exit code of a failed session.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<BuildError>())
        .map(BuildError::exit_code)
        .unwrap_or(1)
}

pub fn render_diagnostics(error: &anyhow::Error) {
    let mut stderr = std::io::stderr();
    write_diagnostics(&mut stderr, error);
    let _ = stderr.flush();
}

fn write_diagnostics(mut output: impl Write, error: &anyhow::Error) {
    write_with_offset(&mut output, "Error".red().bold(), &error.to_string());

    let mut causes = error.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(output); // whitespace
        write_with_offset(&mut output, "Caused by:".bold(), " ");
        for (i, cause) in causes.enumerate() {
            write_with_offset(&mut output, format!("{i}:").bold(), &cause.to_string());
        }
    }

    let _ = writeln!(output);

    for hint in hints(error) {
        write_with_offset(&mut output, "Hint".blue().bold(), &hint);
        let _ = writeln!(output);
    }
}

fn hints(error: &anyhow::Error) -> Vec<String> {
    if let Some(error) = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<BuildError>())
    {
        return build_error_hints(error);
    }

    if let Some(error) = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<BoardError>())
    {
        return match error {
            BoardError::Io(source) if source.kind() == std::io::ErrorKind::NotFound => vec![
                "The board manifest is selected with `--board` or the `board` key of `.k210-build.toml`.".into(),
            ],
            BoardError::Parse(_) | BoardError::NotAnObject => vec![
                "Board manifests use the PlatformIO board format, a JSON object with `upload` and `debug` sections.".into(),
            ],
            _ => vec![],
        };
    }

    vec![]
}

fn build_error_hints(error: &BuildError) -> Vec<String> {
    match error {
        BuildError::Spawn { program, source } if source.kind() == std::io::ErrorKind::NotFound => {
            let mut hints = vec![format!(
                "Make sure '{program}' is installed and can be found in your PATH."
            )];
            if program.starts_with(TOOLCHAIN_PREFIX) {
                hints.push(format!(
                    "The firmware is built with the '{TOOLCHAIN_PREFIX}' GCC cross toolchain."
                ));
            }
            hints
        }
        BuildError::ToolFailed { program, .. } => vec![format!(
            "'{program}' was not successful. Have a look at its output above."
        )],
        BuildError::MissingArtifact { .. } => vec![
            "The `nobuild` target uploads the artifacts of an earlier build. Run `k210-build buildprog` first.".into(),
        ],
        BuildError::SourceScan { .. } => vec![
            "Make sure the source directory exists, or point `src_dir` in `.k210-build.toml` to it.".into(),
        ],
        _ => vec![],
    }
}

fn write_with_offset(mut output: impl Write, header: ColoredString, msg: &str) {
    let _ = write!(output, "{: >1$} ", header, 12);

    let mut lines = msg.lines();

    if let Some(first_line) = lines.next() {
        let _ = writeln!(output, "{first_line}");
    }

    for line in lines {
        let _ = writeln!(output, "            {line}");
    }
}
