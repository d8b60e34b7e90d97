mod util;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use k210_build::board::BoardConfig;
use k210_build::executor::{CommandRunner, Executor};
use k210_build::graph::firmware_graph;
use k210_build::package::PackagesDirectory;
use k210_build::program::ProgramSources;
use k210_build::upload::port::SerialPorts;
use k210_build::upload::{self, UploadContext, UploadSettings};
use k210_build::{BuildEnvironment, BuildMode, Goal, HostOs};

use crate::util::config::{load_config, Config};
use crate::util::diagnostics;
use crate::util::logging::{self, setup_logging, LevelFilter};
use crate::util::runner::{DryRunRunner, ProcessRunner};

#[derive(clap::Parser)]
#[clap(
    name = "k210-build",
    about = "Builds and uploads Kendryte K210 firmware",
    version = env!("K210_BUILD_VERSION"),
    long_version = env!("K210_BUILD_LONG_VERSION")
)]
struct Cli {
    /// The targets to build: buildprog, nobuild, size or upload.
    ///
    /// Builds `buildprog` and `size` if no target is given.
    #[clap(value_name = "TARGET")]
    goals: Vec<Goal>,

    /// The project directory, containing the sources and `.k210-build.toml`.
    #[clap(long, short = 'd', value_name = "PATH", default_value = ".")]
    project_dir: PathBuf,
    /// The board manifest in the PlatformIO board format.
    #[clap(long, value_name = "PATH")]
    board: Option<PathBuf>,
    /// The directory tool packages are installed in.
    #[clap(long, value_name = "PATH")]
    packages_dir: Option<PathBuf>,
    /// The directory build artifacts are written to.
    #[clap(long, value_name = "PATH")]
    build_dir: Option<PathBuf>,

    #[clap(flatten)]
    upload: UploadOptions,

    /// Verbosity, anything above 0 echoes the full command lines.
    #[clap(long, short, env = "PIOVERBOSE", default_value_t = 0)]
    verbose: u8,
    /// Print the commands instead of running them.
    #[clap(long)]
    dry_run: bool,

    /// The log level, overriding `RUST_LOG` and the configuration file.
    #[clap(long, value_enum, help_heading = "LOG CONFIGURATION")]
    log: Option<LevelFilter>,
    /// Location for log file
    #[clap(long, help_heading = "LOG CONFIGURATION")]
    log_file: Option<PathBuf>,
}

#[derive(clap::Args)]
#[clap(next_help_heading = "UPLOAD CONFIGURATION")]
struct UploadOptions {
    /// The upload protocol: kflash, a debug tool of the board or custom.
    #[clap(long = "upload-protocol", env = "UPLOAD_PROTOCOL")]
    protocol: Option<String>,
    /// The serial port of the board. Detected if not given.
    #[clap(long = "upload-port", env = "UPLOAD_PORT")]
    port: Option<String>,
    /// The baud rate used by kflash.
    #[clap(long = "upload-speed", env = "UPLOAD_SPEED")]
    speed: Option<String>,
    /// The command run by the custom protocol, `$SOURCE` is the firmware image.
    #[clap(long = "upload-command", env = "UPLOADCMD")]
    command: Option<String>,
}

impl UploadOptions {
    /// Command line and environment first, then the configuration file.
    fn into_settings(self, config: &Config) -> UploadSettings {
        let config = config.upload.clone();
        UploadSettings {
            protocol: self.protocol.or(config.protocol).unwrap_or_default(),
            port: self.port.or(config.port),
            speed: self.speed.or(config.speed),
            command: self.command.or(config.command),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(error) = run(cli) {
        diagnostics::render_diagnostics(&error);
        std::process::exit(diagnostics::exit_code(&error));
    }
}

fn run(cli: Cli) -> Result<()> {
    let project_dir = cli.project_dir.as_path();
    let config = load_config(project_dir).context("Failed to load configuration.")?;

    let _logger_guard = setup_logging(cli.log_file.as_deref(), cli.log.or(config.log_level))
        .context("Failed to set up logging.")?;

    let goals = if cli.goals.is_empty() {
        Goal::DEFAULT.to_vec()
    } else {
        cli.goals.clone()
    };
    let mode = BuildMode::from_goals(&goals);

    let mut builder = BuildEnvironment::builder()
        .build_dir(project_dir.join(cli.build_dir.as_ref().unwrap_or(&config.build_dir)))
        .ccflags(config.ccflags.iter().cloned())
        .linkflags(config.linkflags.iter().cloned())
        .verbose(cli.verbose > 0)
        .with_default_converters();
    if let Some(name) = &config.program_name {
        builder = builder.program_name(name.clone());
    }
    let env = builder.build();

    let board = match cli.board.as_ref().or(config.board.as_ref()) {
        Some(path) => {
            let path = project_dir.join(path);
            BoardConfig::load(&path)
                .with_context(|| format!("Failed to load the board '{}'.", path.display()))?
        }
        None => BoardConfig::default(),
    };
    if let Some(name) = board.name() {
        tracing::info!("Building for {}", name);
    }

    let packages = PackagesDirectory::new(
        cli.packages_dir
            .clone()
            .or_else(|| config.packages_dir.clone())
            .unwrap_or_else(default_packages_dir),
    );
    tracing::debug!("Looking for packages in {}", packages.root().display());

    let settings = cli.upload.into_settings(&config).with_board_defaults(&board);
    let firmware = env.firmware_path();

    let plan = upload::dispatch(&UploadContext {
        board: &board,
        packages: &packages,
        host: HostOs::current(),
        verbose: env.verbose(),
        settings: &settings,
        source: &firmware,
    });
    if let Some(warning) = &plan.warning {
        logging::eprintln(format!("{} {warning}", "Warning!".yellow().bold()));
    }

    let sources = match mode {
        BuildMode::Compile => {
            let src_dir = project_dir.join(&config.src_dir);
            let sources = ProgramSources::scan(&src_dir)?;
            if sources.is_empty() {
                tracing::warn!("No sources found in {}", src_dir.display());
            }
            sources
        }
        BuildMode::NoBuild => ProgramSources::default(),
    };

    let graph = firmware_graph(&env, mode, &sources, &plan)?;
    let goal_names: Vec<_> = goals.iter().map(Goal::name).collect();

    let mut process_runner = ProcessRunner;
    let mut dry_run_runner = DryRunRunner::default();
    let runner: &mut dyn CommandRunner = if cli.dry_run {
        &mut dry_run_runner
    } else {
        &mut process_runner
    };

    let report = Executor::new(runner, &SerialPorts)
        .verbose(env.verbose())
        .upload_port(settings.port.clone())
        .run(&graph, &goal_names)
        .context("Failed to build the requested targets.")?;

    tracing::info!(
        "{} targets built, {} up to date",
        report.executed.len(),
        report.up_to_date.len()
    );
    if cli.dry_run {
        logging::println(format!(
            "Dry run, {} commands were not executed.",
            dry_run_runner.skipped
        ));
    }

    Ok(())
}

/// PlatformIO keeps its packages in `~/.platformio/packages`.
fn default_packages_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|user| user.home_dir().to_path_buf())
        .unwrap_or_default()
        .join(Path::new(".platformio").join("packages"))
}
