use super::UploadContext;
use crate::package::OPENOCD_PACKAGE;
use crate::{Action, CommandLine};

pub(super) fn actions(ctx: &UploadContext<'_>, server_arguments: &[String]) -> Vec<Action> {
    let debug_level = if ctx.verbose { 2 } else { 1 };
    let scripts = ctx
        .packages
        .package_dir(OPENOCD_PACKAGE)
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();
    let flash_start = ctx.board.flash_start().unwrap_or_default();

    let command = CommandLine::new("openocd")
        .arg("-c")
        .arg(format!("debug_level {debug_level}"))
        .arg("-s")
        .arg(scripts)
        .args(server_arguments.iter().cloned())
        .arg("-c")
        .arg(format!(
            "program {{{}}} {} verify; shutdown;",
            ctx.source.display(),
            flash_start
        ));

    vec![Action::command(
        format!("Uploading {}", ctx.source.display()),
        command,
    )]
}
