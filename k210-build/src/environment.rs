//! The configuration shared by every step of a build session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::convert::ArtifactConverter;
use crate::toolchain::resolve_program_name;
use crate::{BuildError, Toolchain};

/// Default location of build outputs, relative to the project.
pub const DEFAULT_BUILD_DIR: &str = ".pio/build";

/// Tools, flags and build rules of one session.
///
/// Created once through [`BuildEnvironment::builder`] and only read afterwards.
#[derive(Debug, Clone)]
pub struct BuildEnvironment {
    toolchain: Toolchain,
    program_name: String,
    build_dir: PathBuf,
    ccflags: Vec<String>,
    linkflags: Vec<String>,
    converters: BTreeMap<&'static str, ArtifactConverter>,
    verbose: bool,
}

impl BuildEnvironment {
    pub fn builder() -> BuildEnvironmentBuilder {
        BuildEnvironmentBuilder::default()
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn ccflags(&self) -> &[String] {
        &self.ccflags
    }

    pub fn linkflags(&self) -> &[String] {
        &self.linkflags
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// `<build_dir>/<program name>` without any suffix.
    pub fn program_stem(&self) -> PathBuf {
        self.build_dir.join(&self.program_name)
    }

    /// The linked program, `<build_dir>/<program name>.elf`.
    pub fn elf_path(&self) -> PathBuf {
        let mut path = self.program_stem().into_os_string();
        path.push(&self.toolchain.prog_suffix);
        PathBuf::from(path)
    }

    /// The raw firmware image, `<build_dir>/<program name>.bin`.
    pub fn firmware_path(&self) -> PathBuf {
        ArtifactConverter::ELF_TO_BIN.target_path(&self.program_stem())
    }

    pub fn converter(&self, name: &str) -> Result<&ArtifactConverter, BuildError> {
        self.converters
            .get(name)
            .ok_or_else(|| BuildError::UnknownConverter(name.to_owned()))
    }

    pub fn converters(&self) -> impl Iterator<Item = &ArtifactConverter> {
        self.converters.values()
    }
}

#[derive(Debug, Default)]
pub struct BuildEnvironmentBuilder {
    toolchain: Option<Toolchain>,
    program_name: Option<String>,
    build_dir: Option<PathBuf>,
    ccflags: Vec<String>,
    linkflags: Vec<String>,
    converters: BTreeMap<&'static str, ArtifactConverter>,
    verbose: bool,
}

impl BuildEnvironmentBuilder {
    pub fn toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    /// A program name chosen by the user. It is never replaced.
    pub fn program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    pub fn build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = Some(dir.into());
        self
    }

    pub fn ccflags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ccflags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn linkflags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.linkflags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Register a converter. A later registration under the same name wins.
    pub fn with_converter(mut self, converter: ArtifactConverter) -> Self {
        self.converters.insert(converter.name, converter);
        self
    }

    /// Register `ElfToBin` and `ElfToHex`.
    pub fn with_default_converters(self) -> Self {
        self.with_converter(ArtifactConverter::ELF_TO_BIN)
            .with_converter(ArtifactConverter::ELF_TO_HEX)
    }

    pub fn build(self) -> BuildEnvironment {
        let toolchain = self.toolchain.unwrap_or_default();
        let program_name = resolve_program_name(self.program_name.as_deref());

        tracing::debug!(
            "Using toolchain '{}' for program '{}'",
            toolchain.cc,
            program_name
        );

        BuildEnvironment {
            toolchain,
            program_name,
            build_dir: self
                .build_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR)),
            ccflags: self.ccflags,
            linkflags: self.linkflags,
            converters: self.converters,
            verbose: self.verbose,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_paths() {
        let env = BuildEnvironment::builder().build();

        assert_eq!(env.program_name(), "firmware");
        assert_eq!(env.elf_path(), Path::new(".pio/build/firmware.elf"));
        assert_eq!(env.firmware_path(), Path::new(".pio/build/firmware.bin"));
    }

    #[test]
    fn user_program_name_is_kept() {
        let env = BuildEnvironment::builder()
            .program_name("blinky")
            .build_dir("out")
            .build();

        assert_eq!(env.elf_path(), Path::new("out/blinky.elf"));
    }

    #[test]
    fn converters_are_looked_up_by_name() {
        let env = BuildEnvironment::builder()
            .with_default_converters()
            .build();

        assert_eq!(
            env.converter("ElfToHex").unwrap(),
            &ArtifactConverter::ELF_TO_HEX
        );
        assert_eq!(env.converters().count(), 2);
        assert!(matches!(
            env.converter("ElfToUf2"),
            Err(BuildError::UnknownConverter(name)) if name == "ElfToUf2"
        ));
    }
}
