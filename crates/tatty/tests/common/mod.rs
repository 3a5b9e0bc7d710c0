//! Common test utilities for tatty CLI tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

const ENV_VARS: &[&str] = &[
    "TATTY_API_KEY",
    "OPENAI_API_KEY",
    "TATTY_API_BASE",
    "TATTY_MODEL",
    "TATTY_MAX_ITERATIONS",
    "TATTY_MAX_DEPTH",
    "TATTY_WORKING_DIR",
    "TATTY_TEMPERATURE",
    "TATTY_EXEC_TIMEOUT",
    "TATTY_ENABLE_SHELL",
    "RUST_LOG",
];

/// Isolated home directory with a project directory inside
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub project_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempdir()?;
        let config_dir = temp_dir.path().join(".tatty");
        let project_dir = temp_dir.path().join("project");
        std::fs::create_dir_all(&project_dir)?;

        Ok(Self {
            temp_dir,
            config_dir,
            project_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    /// Command run from the project directory, with HOME pointed at the test
    /// environment and no inherited settings
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tatty"));
        cmd.current_dir(&self.project_dir);
        cmd.env("HOME", self.temp_dir.path());
        for var in ENV_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    pub fn write_config(&self, json: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::write(self.config_file(), json)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
