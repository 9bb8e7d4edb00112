//! Builder for config directories written to a temp dir

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestConfigBuilder {
    temp_dir: TempDir,
    main_toml: Option<String>,
    secrets_toml: Option<String>,
    server_files: Vec<(String, String)>,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            main_toml: None,
            secrets_toml: None,
            server_files: Vec::new(),
        }
    }

    /// Main settings with the status log placed inside the temp dir
    pub fn with_default_main(self) -> Self {
        let log_path = self.temp_dir.path().join("logs").join("status.log");
        self.with_main(&format!(
            r#"
status_log_path = "{}"
script_name = "snapshot-manager"
hostname = "test-host"
delay_between_servers_seconds = 0
"#,
            log_path.display()
        ))
    }

    pub fn with_main(mut self, toml: &str) -> Self {
        self.main_toml = Some(toml.to_string());
        self
    }

    pub fn with_secrets(mut self, toml: &str) -> Self {
        self.secrets_toml = Some(toml.to_string());
        self
    }

    /// A well-formed server file
    pub fn with_server(self, file_stem: &str, id: u64, retain: i64) -> Self {
        let toml = format!(
            r#"
[server]
id = "{}"
name = "{}"
api_token = "token-{}-abcdefghijklmnop"
retain_last_snapshots = {}
"#,
            id, file_stem, file_stem, retain
        );
        self.with_server_file(file_stem, &toml)
    }

    pub fn with_server_file(mut self, file_stem: &str, toml: &str) -> Self {
        self.server_files
            .push((format!("{}.toml", file_stem), toml.to_string()));
        self
    }

    pub fn build(self) -> TestConfig {
        let config_dir = self.temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        if let Some(main) = &self.main_toml {
            fs::write(config_dir.join("main.toml"), main).expect("Failed to write main.toml");
        }
        if let Some(secrets) = &self.secrets_toml {
            fs::write(config_dir.join("secrets.toml"), secrets)
                .expect("Failed to write secrets.toml");
        }
        for (file_name, content) in &self.server_files {
            fs::write(config_dir.join(file_name), content).expect("Failed to write server config");
        }

        TestConfig {
            temp_dir: self.temp_dir,
            config_dir,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestConfig {
    temp_dir: TempDir,
    pub config_dir: PathBuf,
}

impl TestConfig {
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn status_log_path(&self) -> PathBuf {
        self.temp_dir.path().join("logs").join("status.log")
    }
}
