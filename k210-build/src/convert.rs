//! Post-link converters turning the linked ELF into flashable images.

use std::path::{Path, PathBuf};

use crate::{Action, CommandLine};

/// Output formats understood by `objcopy -O`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFormat {
    /// Raw memory image.
    Binary,
    /// Motorola S-record.
    Srec,
}

impl ObjectFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectFormat::Binary => "binary",
            ObjectFormat::Srec => "srec",
        }
    }
}

/// A build rule producing one artifact from another with `objcopy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactConverter {
    pub name: &'static str,
    pub format: ObjectFormat,
    pub suffix: &'static str,
}

impl ArtifactConverter {
    pub const ELF_TO_BIN: ArtifactConverter = ArtifactConverter {
        name: "ElfToBin",
        format: ObjectFormat::Binary,
        suffix: ".bin",
    };

    pub const ELF_TO_HEX: ArtifactConverter = ArtifactConverter {
        name: "ElfToHex",
        format: ObjectFormat::Srec,
        suffix: ".hex",
    };

    /// Where the converted artifact for `stem` ends up.
    ///
    /// The suffix is appended, so `build/firmware` becomes `build/firmware.bin`.
    pub fn target_path(&self, stem: &Path) -> PathBuf {
        let mut target = stem.as_os_str().to_owned();
        target.push(self.suffix);
        PathBuf::from(target)
    }

    pub fn command(&self, objcopy: &str, source: &Path, target: &Path) -> CommandLine {
        CommandLine::new(objcopy)
            .arg("-O")
            .arg(self.format.as_str())
            .path_arg(source)
            .path_arg(target)
    }

    pub fn action(&self, objcopy: &str, source: &Path, target: &Path) -> Action {
        Action::command(
            format!("Building {}", target.display()),
            self.command(objcopy, source, target),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn elf_to_bin() {
        let converter = ArtifactConverter::ELF_TO_BIN;
        let target = converter.target_path(Path::new("build/firmware"));
        assert_eq!(target, Path::new("build/firmware.bin"));

        let command = converter.command(
            "riscv64-unknown-elf-objcopy",
            Path::new("build/firmware.elf"),
            &target,
        );
        assert_eq!(
            command.to_string(),
            "riscv64-unknown-elf-objcopy -O binary build/firmware.elf build/firmware.bin"
        );
    }

    #[test]
    fn elf_to_hex_writes_srec() {
        let converter = ArtifactConverter::ELF_TO_HEX;
        let target = converter.target_path(Path::new("build/firmware"));
        assert_eq!(target, Path::new("build/firmware.hex"));

        let action = converter.action("objcopy", Path::new("build/firmware.elf"), &target);
        assert_eq!(action.description(), "Building build/firmware.hex");
        assert_eq!(
            action.as_command().map(|command| command.resolved_args("")),
            Some(vec![
                "-O".to_owned(),
                "srec".to_owned(),
                "build/firmware.elf".to_owned(),
                "build/firmware.hex".to_owned(),
            ])
        );
    }

    #[test]
    fn stems_with_dots_keep_their_name() {
        let target = ArtifactConverter::ELF_TO_BIN.target_path(Path::new("out/app.v2"));
        assert_eq!(target, Path::new("out/app.v2.bin"));
    }
}
