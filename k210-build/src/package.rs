//! Locating installed tool packages.

use std::path::{Path, PathBuf};

/// Package providing the `kflash` uploader.
pub const KFLASH_PACKAGE: &str = "tool-kflash-kendryte210";

/// Package providing OpenOCD and its scripts for the K210.
pub const OPENOCD_PACKAGE: &str = "tool-openocd-kendryte210";

/// Maps a package name to the directory it is installed in.
pub trait PackageResolver {
    /// Returns `None` if the package is not installed.
    fn package_dir(&self, name: &str) -> Option<PathBuf>;
}

/// Packages installed as sub-directories of one root, the way PlatformIO
/// keeps them in `~/.platformio/packages`.
#[derive(Debug, Clone)]
pub struct PackagesDirectory {
    root: PathBuf,
}

impl PackagesDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PackageResolver for PackagesDirectory {
    fn package_dir(&self, name: &str) -> Option<PathBuf> {
        let dir = self.root.join(name);
        if dir.is_dir() {
            Some(dunce::canonicalize(&dir).unwrap_or(dir))
        } else {
            tracing::debug!("Package '{}' is not installed in {}", name, self.root.display());
            None
        }
    }
}
