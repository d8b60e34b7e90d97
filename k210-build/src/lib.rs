//! # Build and upload pipeline for Kendryte K210 firmware
//!
//! This crate wires together everything that happens around a firmware
//! image once sources exist: the RISC-V cross toolchain, the post-link
//! converters, the graph of build goals and the upload dispatcher that
//! selects between `kflash`, OpenOCD debug tools and user supplied commands.
//!
//! The compiler, `objcopy` and the flashing tools themselves are external
//! programs. This crate only decides *what* to run and in which order.
//!
//! ## Planning an upload
//!
//! ```
//! use std::path::Path;
//! use k210_build::{
//!     board::BoardConfig,
//!     package::PackagesDirectory,
//!     upload::{self, UploadContext, UploadSettings},
//!     HostOs,
//! };
//!
//! let board = BoardConfig::from_json_str(r#"{ "upload": { "burn_tool": "goE" } }"#)?;
//! let packages = PackagesDirectory::new("/opt/packages");
//! let settings = UploadSettings::new("kflash");
//!
//! let plan = upload::dispatch(&UploadContext {
//!     board: &board,
//!     packages: &packages,
//!     host: HostOs::Other,
//!     verbose: false,
//!     settings: &settings,
//!     source: Path::new(".pio/build/firmware.bin"),
//! });
//!
//! assert_eq!(plan.actions.len(), 2);
//! # Ok::<(), k210_build::board::BoardError>(())
//! ```

pub mod action;
pub mod board;
pub mod convert;
pub mod environment;
mod error;
pub mod executor;
pub mod graph;
mod host;
pub mod package;
pub mod program;
pub mod toolchain;
pub mod upload;

pub use crate::action::{Action, CommandArg, CommandLine, FailurePolicy};
pub use crate::environment::BuildEnvironment;
pub use crate::error::BuildError;
pub use crate::graph::{BuildMode, Goal, TargetGraph, TargetNode};
pub use crate::host::HostOs;
pub use crate::toolchain::Toolchain;
