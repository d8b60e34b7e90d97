use std::path::PathBuf;

use super::UploadContext;
use crate::board::AUTO_PORT_BURN_TOOL;
use crate::package::KFLASH_PACKAGE;
use crate::{Action, CommandLine, HostOs};

/// The Python interpreter kflash is started with on macOS.
const MACOS_PYTHON3: &str = "/usr/local/bin/python3";

/// Tells kflash to look for the port itself.
const DEFAULT_PORT: &str = "DEFAULT";

/// The uploader and the interpreter it needs on `host`.
fn uploader(package_dir: PathBuf, host: HostOs) -> (PathBuf, Option<&'static str>) {
    match host {
        HostOs::Windows => (package_dir.join("kflash_py.exe"), None),
        HostOs::MacOs => (package_dir.join("kflash.py"), Some(MACOS_PYTHON3)),
        HostOs::Other => (package_dir.join("kflash.py"), Some("python3")),
    }
}

pub(super) fn actions(ctx: &UploadContext<'_>) -> Vec<Action> {
    let package_dir = ctx.packages.package_dir(KFLASH_PACKAGE).unwrap_or_else(|| {
        tracing::warn!("The package '{}' is not installed", KFLASH_PACKAGE);
        PathBuf::new()
    });
    let (uploader, interpreter) = uploader(package_dir, ctx.host);

    let command = match interpreter {
        Some(python) => CommandLine::new(python).path_arg(&uploader),
        None => CommandLine::new(uploader.display().to_string()),
    };

    let burn_tool = ctx.board.burn_tool();

    let command = command.arg("-n").arg("-p");
    let mut command = if burn_tool.as_deref() == Some(AUTO_PORT_BURN_TOOL) {
        command.arg(DEFAULT_PORT)
    } else {
        command.upload_port_arg()
    };

    if let Some(speed) = &ctx.settings.speed {
        command = command.arg("-b").arg(speed);
    }
    match burn_tool {
        Some(burn_tool) => command = command.arg("-B").arg(burn_tool),
        None => tracing::debug!("The board does not select a kflash burn tool"),
    }

    let command = command.path_arg(ctx.source);

    vec![
        Action::DetectUploadPort,
        Action::command(format!("Uploading {}", ctx.source.display()), command),
    ]
}
