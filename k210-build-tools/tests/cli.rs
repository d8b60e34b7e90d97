use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use std::path::Path;
use std::process::Command; // Run programs

use tempfile::TempDir;

/// A project with one C source and no configuration.
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/main.c"), "int main(void) { return 0; }\n").unwrap();
    dir
}

/// The binary, isolated from the settings of the user running the tests.
fn k210_build(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("k210-build").unwrap();
    cmd.current_dir(project)
        .env("HOME", project)
        .env_remove("UPLOAD_PROTOCOL")
        .env_remove("UPLOAD_PORT")
        .env_remove("UPLOAD_SPEED")
        .env_remove("UPLOADCMD")
        .env_remove("PIOVERBOSE")
        .env_remove("RUST_LOG")
        .arg("--packages-dir")
        .arg(project.join("packages"));
    cmd
}

#[test]
fn query_long_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("k210-build")?;

    cmd.arg("--version");
    cmd.assert().success().stdout(
        predicate::str::is_match("^k210-build \\S+ \\(git commit: \\S+\\)\\n$").unwrap(),
    );

    Ok(())
}

#[test]
fn query_short_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("k210-build")?;

    cmd.arg("-V");
    cmd.assert()
        .success()
        .stdout(predicate::str::is_match("^k210-build \\S+\\n$").unwrap());

    Ok(())
}

#[test]
fn unknown_targets_are_rejected() {
    let project = project();

    k210_build(project.path())
        .arg("flash")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown target 'flash'"));
}

#[test]
fn dry_run_prints_the_build() {
    let project = project();

    k210_build(project.path())
        .args(["--dry-run", "size"])
        .assert()
        .success()
        .stdout(predicate::str::contains("riscv64-unknown-elf-gcc"))
        .stdout(predicate::str::contains("riscv64-unknown-elf-objcopy -O binary").not())
        .stdout(predicate::str::contains("riscv64-unknown-elf-size -d"));
}

#[test]
fn default_targets_convert_the_program() {
    let project = project();

    k210_build(project.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("riscv64-unknown-elf-objcopy -O binary"))
        .stdout(predicate::str::contains("riscv64-unknown-elf-size -d"));
}

#[test]
fn unknown_protocols_only_warn() {
    let project = project();

    k210_build(project.path())
        .args(["--upload-protocol", "teleport", "--dry-run", "upload"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Unknown upload protocol teleport"));
}

#[test]
fn protocol_from_the_configuration_file() {
    let project = project();
    std::fs::write(
        project.path().join(".k210-build.toml"),
        "[upload]\nprotocol = \"teleport\"\n",
    )
    .unwrap();

    k210_build(project.path())
        .args(["--dry-run", "size"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Unknown upload protocol teleport"));
}

#[test]
fn custom_command_runs_verbatim() {
    let project = project();

    k210_build(project.path())
        .env("UPLOAD_PROTOCOL", "custom")
        .env("UPLOADCMD", "flash-it --port 3 $SOURCE")
        .args(["--dry-run", "upload"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"flash-it --port 3 $SOURCE\""))
        .stdout(predicate::str::contains("SOURCE="));
}

#[cfg(not(windows))]
#[test]
fn kflash_with_automatic_port() {
    let project = project();
    std::fs::write(
        project.path().join("board.json"),
        r#"{
            "name": "Sipeed MAIX BiT",
            "upload": { "protocol": "kflash", "burn_tool": "goE", "speed": 1500000 }
        }"#,
    )
    .unwrap();

    k210_build(project.path())
        .args(["--board", "board.json", "--dry-run", "upload"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Looking for upload port..."))
        .stdout(predicate::str::contains(
            "kflash.py -n -p DEFAULT -b 1500000 -B goE",
        ));
}

#[test]
fn debug_tool_uploads_through_openocd() {
    let project = project();
    std::fs::write(
        project.path().join("board.json"),
        r#"{
            "upload": { "flash_start": "0x08000000" },
            "debug": { "tools": { "swd": { "server": { "arguments": ["-f", "cfg.cfg"] } } } }
        }"#,
    )
    .unwrap();

    k210_build(project.path())
        .env("UPLOAD_PROTOCOL", "swd")
        .env("PIOVERBOSE", "1")
        .args(["--board", "board.json", "--dry-run", "upload"])
        .assert()
        .success()
        .stdout(predicate::str::contains("openocd -c \"debug_level 2\""))
        .stdout(predicate::str::contains("-f cfg.cfg"))
        .stdout(predicate::str::contains("0x08000000 verify; shutdown;"));
}

#[test]
fn nobuild_needs_an_earlier_build() {
    let project = project();

    k210_build(project.path())
        .args(["--dry-run", "nobuild"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}
