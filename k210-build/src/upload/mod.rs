//! Selecting and configuring the tool that programs the board.
//!
//! [`dispatch`] turns a protocol name into the list of actions of the
//! `upload` target. Protocols are matched in a fixed priority order:
//!
//! 1. `kflash`, the serial bootloader flasher of the K210,
//! 2. any protocol listed in the board's `debug.tools`, driven through OpenOCD,
//! 3. `custom`, a user supplied upload command,
//! 4. everything else, which leaves the upload target without actions.
//!
//! `kflash` is checked before the debug tools, so a board listing a debug
//! tool named `kflash` still uploads through the serial flasher.

mod kflash;
mod openocd;
pub mod port;

use std::fmt;
use std::path::Path;

use crate::board::{BoardConfig, DebugTools};
use crate::package::PackageResolver;
use crate::{Action, CommandLine, HostOs};

pub const KFLASH_PROTOCOL: &str = "kflash";
pub const CUSTOM_PROTOCOL: &str = "custom";

/// A protocol name resolved against the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadProtocol {
    Kflash,
    /// A protocol the board lists under `debug.tools`.
    DebugTool(String),
    Custom,
    Unknown(String),
}

impl UploadProtocol {
    pub fn resolve(protocol: &str, debug_tools: &DebugTools) -> Self {
        match protocol {
            KFLASH_PROTOCOL => UploadProtocol::Kflash,
            name if debug_tools.contains(name) => UploadProtocol::DebugTool(name.to_owned()),
            CUSTOM_PROTOCOL => UploadProtocol::Custom,
            other => UploadProtocol::Unknown(other.to_owned()),
        }
    }
}

impl fmt::Display for UploadProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadProtocol::Kflash => f.write_str(KFLASH_PROTOCOL),
            UploadProtocol::DebugTool(name) | UploadProtocol::Unknown(name) => f.write_str(name),
            UploadProtocol::Custom => f.write_str(CUSTOM_PROTOCOL),
        }
    }
}

/// Upload options coming from the command line, the environment or the
/// configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSettings {
    pub protocol: String,
    pub port: Option<String>,
    pub speed: Option<String>,
    /// The command run by the `custom` protocol.
    pub command: Option<String>,
}

impl UploadSettings {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            ..Default::default()
        }
    }

    /// Fills every option that was not given explicitly from the board.
    pub fn with_board_defaults(mut self, board: &BoardConfig) -> Self {
        if self.protocol.is_empty() {
            self.protocol = board.upload_protocol().unwrap_or_default();
        }
        self.port = self.port.or_else(|| board.upload_port());
        self.speed = self.speed.or_else(|| board.upload_speed());
        self
    }
}

/// Everything the dispatcher looks at.
pub struct UploadContext<'a> {
    pub board: &'a BoardConfig,
    pub packages: &'a dyn PackageResolver,
    pub host: HostOs,
    /// Verbose output was requested (`PIOVERBOSE`).
    pub verbose: bool,
    pub settings: &'a UploadSettings,
    /// The firmware image to upload.
    pub source: &'a Path,
}

/// The resolved `upload` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub protocol: UploadProtocol,
    pub actions: Vec<Action>,
    /// Set when the upload is misconfigured. The plan then has no actions.
    pub warning: Option<String>,
}

impl UploadPlan {
    fn with_actions(protocol: UploadProtocol, actions: Vec<Action>) -> Self {
        Self {
            protocol,
            actions,
            warning: None,
        }
    }

    fn warning(protocol: UploadProtocol, warning: String) -> Self {
        Self {
            protocol,
            actions: Vec::new(),
            warning: Some(warning),
        }
    }
}

/// Resolves the actions of the `upload` target.
///
/// Never fails: a protocol that cannot be served results in a plan without
/// actions and a warning, so the rest of the build stays usable.
pub fn dispatch(ctx: &UploadContext<'_>) -> UploadPlan {
    let debug_tools = ctx.board.debug_tools();
    let protocol = UploadProtocol::resolve(&ctx.settings.protocol, &debug_tools);

    tracing::debug!("Upload protocol '{}' resolved to {:?}", ctx.settings.protocol, protocol);

    match &protocol {
        UploadProtocol::Kflash => {
            let actions = kflash::actions(ctx);
            UploadPlan::with_actions(protocol, actions)
        }
        UploadProtocol::DebugTool(name) => {
            let arguments = debug_tools
                .get(name)
                .map(|tool| tool.server_arguments())
                .unwrap_or_default();
            let actions = openocd::actions(ctx, arguments);
            UploadPlan::with_actions(protocol, actions)
        }
        UploadProtocol::Custom => match &ctx.settings.command {
            Some(command) => {
                let action = Action::command(
                    format!("Uploading {}", ctx.source.display()),
                    CommandLine::shell(command.clone(), ctx.host)
                        .env("SOURCE", ctx.source.display().to_string()),
                );
                UploadPlan::with_actions(protocol, vec![action])
            }
            None => UploadPlan::warning(
                protocol,
                "The custom upload protocol needs an upload command (UPLOADCMD)".to_owned(),
            ),
        },
        UploadProtocol::Unknown(name) => {
            let warning = format!("Unknown upload protocol {name}");
            UploadPlan::warning(protocol, warning)
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;
    use crate::action::CommandArg;
    use crate::package::{KFLASH_PACKAGE, OPENOCD_PACKAGE};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    pub(super) struct Packages(pub HashMap<&'static str, PathBuf>);

    impl PackageResolver for Packages {
        fn package_dir(&self, name: &str) -> Option<PathBuf> {
            self.0.get(name).cloned()
        }
    }

    pub(super) fn installed() -> Packages {
        Packages(HashMap::from([
            (KFLASH_PACKAGE, PathBuf::from("/pkg/kflash")),
            (OPENOCD_PACKAGE, PathBuf::from("/pkg/openocd")),
        ]))
    }

    fn board() -> BoardConfig {
        BoardConfig::from_json_str(
            r#"{
                "upload": { "burn_tool": "dan", "flash_start": "0x08000000" },
                "debug": { "tools": {
                    "swd": { "server": { "arguments": ["-f", "cfg.cfg"] } },
                    "kflash": { "server": { "arguments": ["-f", "never.cfg"] } },
                    "custom": { "server": { "arguments": [] } }
                } }
            }"#,
        )
        .unwrap()
    }

    fn plan(protocol: &str, settings: UploadSettings, verbose: bool) -> UploadPlan {
        let board = board();
        let packages = installed();
        let settings = UploadSettings {
            protocol: protocol.to_owned(),
            ..settings
        };
        dispatch(&UploadContext {
            board: &board,
            packages: &packages,
            host: HostOs::Other,
            verbose,
            settings: &settings,
            source: Path::new("build/firmware.bin"),
        })
    }

    fn args(action: &Action) -> Vec<String> {
        action.as_command().unwrap().resolved_args("")
    }

    #[test_case("kflash", UploadProtocol::Kflash; "kflash before debug tools")]
    #[test_case("swd", UploadProtocol::DebugTool("swd".into()); "debug tool")]
    #[test_case("custom", UploadProtocol::DebugTool("custom".into()); "debug tool before custom")]
    #[test_case("teleport", UploadProtocol::Unknown("teleport".into()); "unknown")]
    fn priority(protocol: &str, expected: UploadProtocol) {
        assert_eq!(UploadProtocol::resolve(protocol, &board().debug_tools()), expected);
    }

    #[test]
    fn custom_without_debug_tool_entry() {
        assert_eq!(
            UploadProtocol::resolve("custom", &DebugTools::default()),
            UploadProtocol::Custom
        );
    }

    #[test]
    fn kflash_listed_as_debug_tool_still_uses_kflash() {
        let plan = plan("kflash", UploadSettings::default(), false);

        assert_eq!(plan.protocol, UploadProtocol::Kflash);
        assert_eq!(plan.actions.len(), 2);
        assert!(!args(&plan.actions[1]).contains(&"never.cfg".to_owned()));
    }

    #[test]
    fn debug_tool_runs_openocd() {
        let plan = plan("swd", UploadSettings::default(), false);

        assert_eq!(plan.warning, None);
        assert_eq!(plan.actions.len(), 1);
        let command = plan.actions[0].as_command().unwrap();
        assert_eq!(command.program(), "openocd");
        assert_eq!(
            command.resolved_args(""),
            vec![
                "-c",
                "debug_level 1",
                "-s",
                "/pkg/openocd",
                "-f",
                "cfg.cfg",
                "-c",
                "program {build/firmware.bin} 0x08000000 verify; shutdown;",
            ]
        );
    }

    #[test_case(true, "debug_level 2")]
    #[test_case(false, "debug_level 1")]
    fn verbosity_sets_debug_level(verbose: bool, expected: &str) {
        let plan = plan("swd", UploadSettings::default(), verbose);
        assert_eq!(args(&plan.actions[0])[1], expected);
    }

    #[test]
    fn custom_command_is_run_verbatim() {
        let command = "my-flasher --port /dev/ttyS3 \"$SOURCE\"";
        let board = BoardConfig::default();
        let packages = Packages(HashMap::new());
        let settings = UploadSettings {
            protocol: "custom".into(),
            command: Some(command.into()),
            ..Default::default()
        };

        let plan = dispatch(&UploadContext {
            board: &board,
            packages: &packages,
            host: HostOs::Other,
            verbose: false,
            settings: &settings,
            source: Path::new("build/firmware.bin"),
        });

        assert_eq!(plan.protocol, UploadProtocol::Custom);
        assert_eq!(plan.actions.len(), 1);
        let shell = plan.actions[0].as_command().unwrap();
        assert_eq!(
            shell.raw_args(),
            [
                CommandArg::Literal("-c".into()),
                CommandArg::Literal(command.into())
            ]
        );
        assert_eq!(
            shell.envs(),
            [("SOURCE".to_owned(), "build/firmware.bin".to_owned())]
        );
    }

    #[test]
    fn custom_without_command_warns() {
        let board = BoardConfig::default();
        let packages = Packages(HashMap::new());
        let settings = UploadSettings::new("custom");

        let plan = dispatch(&UploadContext {
            board: &board,
            packages: &packages,
            host: HostOs::Other,
            verbose: false,
            settings: &settings,
            source: Path::new("firmware.bin"),
        });

        assert!(plan.actions.is_empty());
        assert!(plan.warning.is_some());
    }

    #[test]
    fn unknown_protocol_warns_once() {
        let plan = plan("teleport", UploadSettings::default(), false);

        assert_eq!(plan.protocol, UploadProtocol::Unknown("teleport".into()));
        assert!(plan.actions.is_empty());
        assert_eq!(
            plan.warning.as_deref(),
            Some("Unknown upload protocol teleport")
        );
    }

    #[test]
    fn board_fills_missing_settings() {
        let board = BoardConfig::from_json_str(
            r#"{ "upload": { "protocol": "kflash", "speed": 1500000, "port": "COM3" } }"#,
        )
        .unwrap();

        let settings = UploadSettings {
            speed: Some("115200".into()),
            ..Default::default()
        }
        .with_board_defaults(&board);

        assert_eq!(
            settings,
            UploadSettings {
                protocol: "kflash".into(),
                port: Some("COM3".into()),
                speed: Some("115200".into()),
                command: None,
            }
        );
    }
}
