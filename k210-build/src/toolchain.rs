//! The RISC-V cross toolchain used to build firmware.

use std::path::Path;

use crate::CommandLine;

/// Prefix of every binary of the cross toolchain.
pub const TOOLCHAIN_PREFIX: &str = "riscv64-unknown-elf-";

/// The program name a project gets when nobody chose one.
pub const DEFAULT_PROGRAM_NAME: &str = "program";

/// The program name used for firmware images.
pub const FIRMWARE_PROGRAM_NAME: &str = "firmware";

/// The roles a toolchain binary can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolRole {
    Archiver,
    Assembler,
    CCompiler,
    CxxCompiler,
    Debugger,
    ObjectCopy,
    Ranlib,
    SizeReporter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub ar: String,
    pub assembler: String,
    pub cc: String,
    pub cxx: String,
    pub gdb: String,
    pub objcopy: String,
    pub ranlib: String,
    pub size_tool: String,
    pub ar_flags: Vec<String>,
    /// Suffix of linked programs.
    pub prog_suffix: String,
}

impl Toolchain {
    pub fn with_prefix(prefix: &str) -> Self {
        let tool = |name: &str| format!("{prefix}{name}");

        Self {
            ar: tool("ar"),
            assembler: tool("as"),
            cc: tool("gcc"),
            cxx: tool("g++"),
            gdb: tool("gdb"),
            objcopy: tool("objcopy"),
            ranlib: tool("ranlib"),
            size_tool: tool("size"),
            ar_flags: vec!["rcs".to_owned()],
            prog_suffix: ".elf".to_owned(),
        }
    }

    pub fn riscv64() -> Self {
        Self::with_prefix(TOOLCHAIN_PREFIX)
    }

    pub fn tool(&self, role: ToolRole) -> &str {
        match role {
            ToolRole::Archiver => &self.ar,
            ToolRole::Assembler => &self.assembler,
            ToolRole::CCompiler => &self.cc,
            ToolRole::CxxCompiler => &self.cxx,
            ToolRole::Debugger => &self.gdb,
            ToolRole::ObjectCopy => &self.objcopy,
            ToolRole::Ranlib => &self.ranlib,
            ToolRole::SizeReporter => &self.size_tool,
        }
    }

    /// `size -d <sources>`, the command printing section sizes in decimal.
    pub fn size_command<'a>(&self, sources: impl IntoIterator<Item = &'a Path>) -> CommandLine {
        let command = CommandLine::new(self.tool(ToolRole::SizeReporter)).arg("-d");

        sources
            .into_iter()
            .fold(command, |command, source| command.path_arg(source))
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::riscv64()
    }
}

/// Picks the program name, keeping whatever the user configured.
pub fn resolve_program_name(configured: Option<&str>) -> String {
    match configured {
        None | Some(DEFAULT_PROGRAM_NAME) => FIRMWARE_PROGRAM_NAME.to_owned(),
        Some(name) => name.to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(ToolRole::Archiver, "riscv64-unknown-elf-ar")]
    #[test_case(ToolRole::Assembler, "riscv64-unknown-elf-as")]
    #[test_case(ToolRole::CCompiler, "riscv64-unknown-elf-gcc")]
    #[test_case(ToolRole::CxxCompiler, "riscv64-unknown-elf-g++")]
    #[test_case(ToolRole::Debugger, "riscv64-unknown-elf-gdb")]
    #[test_case(ToolRole::ObjectCopy, "riscv64-unknown-elf-objcopy")]
    #[test_case(ToolRole::Ranlib, "riscv64-unknown-elf-ranlib")]
    #[test_case(ToolRole::SizeReporter, "riscv64-unknown-elf-size")]
    fn riscv64_roles(role: ToolRole, expected: &str) {
        assert_eq!(Toolchain::riscv64().tool(role), expected);
    }

    #[test]
    fn flags_and_suffix() {
        let toolchain = Toolchain::default();
        assert_eq!(toolchain.ar_flags, vec!["rcs"]);
        assert_eq!(toolchain.prog_suffix, ".elf");
    }

    #[test]
    fn size_command_is_decimal() {
        let command = Toolchain::riscv64().size_command([Path::new("build/firmware.elf")]);
        assert_eq!(
            command.to_string(),
            "riscv64-unknown-elf-size -d build/firmware.elf"
        );
    }

    #[test_case(None, "firmware"; "unset name becomes firmware")]
    #[test_case(Some("program"), "firmware"; "default name becomes firmware")]
    #[test_case(Some("blinky"), "blinky"; "user override is kept")]
    fn program_name(configured: Option<&str>, expected: &str) {
        assert_eq!(resolve_program_name(configured), expected);
    }
}
