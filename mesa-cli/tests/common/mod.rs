//! Common test utilities for CLI integration tests.
//!
//! This module provides shared helpers for CLI testing, including:
//! - Test environment setup with temporary directories
//! - Command builder helpers for common patterns
//! - A small seeded floor

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A service date far enough ahead that nothing is in the past.
pub const DATE: &str = "2030-06-15";

/// Environment variables that would leak host settings into a test.
const MESA_ENV_VARS: [&str; 7] = [
    "MESA_DATA_DIR",
    "MESA_BUSY_TIMEOUT",
    "MESA_ACTOR",
    "MESA_ROLE",
    "MESA_OUTPUT_FORMAT",
    "MESA_SERVICE_WINDOWS",
    "MESA_DEFAULT_DURATION_MINUTES",
];

/// Test environment with isolated data directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for the duration of the test)
    #[allow(dead_code)]
    temp_dir: TempDir,
    /// Path to the temporary directory, used as the working directory
    pub temp_path: PathBuf,
    /// Path to the mesa data directory
    pub data_dir: PathBuf,
}

#[allow(dead_code)]
impl TestEnv {
    /// Create a new test environment; the data directory is not created.
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let temp_path = temp_dir.path().to_path_buf();
        let data_dir = temp_path.join("mesa-data");

        Self {
            temp_dir,
            temp_path,
            data_dir,
        }
    }

    /// Create an environment and run `mesa init` in it.
    pub fn initialized() -> Self {
        let env = Self::new();
        env.command().arg("init").assert().success();
        env
    }

    /// Create an initialized environment with the standard floor.
    ///
    /// Zone `hall` holds tables 1 (2 seats), 2 (4 seats), and the
    /// combinable pair 4 and 5 (4 seats each, 8 together). Zone `terrace`
    /// holds table 10 (6 seats).
    pub fn with_floor() -> Self {
        let env = Self::initialized();
        env.manager(&["zone", "add", "hall", "--name", "Salón", "--capacity", "40"]);
        env.manager(&["zone", "add", "terrace", "--name", "Terraza", "--capacity", "24"]);
        env.manager(&["table", "add", "1", "--zone", "hall", "--capacity", "2"]);
        env.manager(&["table", "add", "2", "--zone", "hall", "--capacity", "4"]);
        env.manager(&[
            "table", "add", "4", "--zone", "hall", "--capacity", "4", "--combinable",
            "--max-combined", "8",
        ]);
        env.manager(&["table", "add", "5", "--zone", "hall", "--capacity", "4", "--combinable"]);
        env.manager(&["table", "add", "10", "--zone", "terrace", "--capacity", "6"]);
        env
    }

    /// Get a bare command builder without pre-configured flags.
    ///
    /// The working directory is the temp directory, so no project
    /// configuration from the repository is picked up.
    pub fn command_bare(&self) -> Command {
        let mut cmd = Command::cargo_bin("mesa").expect("Failed to find mesa binary");
        cmd.current_dir(&self.temp_path);
        for var in MESA_ENV_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Get a command builder with the data directory pre-configured.
    pub fn command(&self) -> Command {
        let mut cmd = self.command_bare();
        cmd.arg("--data-dir").arg(&self.data_dir);
        cmd
    }

    /// Run a command as a manager and assert success.
    pub fn manager(&self, args: &[&str]) {
        self.command()
            .args(["--role", "manager"])
            .args(args)
            .assert()
            .success();
    }

    /// Get the temp path.
    pub fn path(&self) -> &Path {
        &self.temp_path
    }

    /// Take a phone booking on [`DATE`] and return its id.
    pub fn reserve(&self, name: &str, party: u32, time: &str, phone: &str) -> i64 {
        let party = party.to_string();
        let output = self
            .command()
            .args(["reserve", name, "--party", &party, "--date", DATE, "--time", time])
            .args(["--phone", phone])
            .output()
            .expect("Failed to run reserve command");

        assert!(
            output.status.success(),
            "Reserve failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        parse_id(&String::from_utf8(output.stdout).expect("Invalid UTF-8 in output"))
    }

    /// Run `list --format json` and return the parsed array.
    pub fn list_json(&self, extra: &[&str]) -> Vec<serde_json::Value> {
        let output = self
            .command()
            .args(["list", "--format", "json"])
            .args(extra)
            .output()
            .expect("Failed to run list command");

        assert!(
            output.status.success(),
            "List failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        serde_json::from_slice(&output.stdout).expect("List output is not JSON")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the id a command printed on stdout.
#[allow(dead_code)]
pub fn parse_id(output: &str) -> i64 {
    output
        .trim()
        .parse()
        .expect("Output is not a valid reservation id")
}
