use crate::disposition::Disposition;
use crate::settle::Settle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "UPLOADER";
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_URL: &str = "http://localhost:8000";

pub const EXAMPLE_CONFIG: &str = r#"paperless_url: "http://localhost:8000"
api_key: "your-api-key"
watch_folder: "consume"
# post_upload_action can be 'delete', 'move', or left empty to do nothing.
post_upload_action: ""
# processed_folder is where files are moved to if post_upload_action is 'move'.
processed_folder: "processed"
# A list of tags to apply to the document.
# tags:
#  - tag1
#  - tag2
# Milliseconds to wait after a file appears before uploading it.
settle_delay_ms: 1000
# Poll the file size until it stops changing instead of a single fixed wait.
settle_check_size: false
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("{} already exists. Use --force to overwrite", .0.display())]
    Exists(PathBuf),
    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub paperless_url: String,
    #[serde(default)]
    pub api_key: String,
    pub watch_folder: PathBuf,
    #[serde(default)]
    pub post_upload_action: PostUploadAction,
    pub processed_folder: PathBuf,
    #[serde(default)]
    pub tags: Vec<String>,
    pub settle_delay_ms: u64,
    #[serde(default)]
    pub settle_check_size: bool,
    pub settle_max_wait_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostUploadAction {
    #[default]
    #[serde(rename = "", alias = "none")]
    None,
    Delete,
    Move,
}

impl AppConfig {
    /// API key reduced to its last four characters, for logging.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() > 4 {
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("...{tail}")
        } else {
            "(too short to be valid)".to_string()
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self.post_upload_action {
            PostUploadAction::None => Disposition::None,
            PostUploadAction::Delete => Disposition::Delete,
            PostUploadAction::Move => Disposition::MoveTo(self.processed_folder.clone()),
        }
    }

    pub fn settle(&self) -> Settle {
        let delay = Duration::from_millis(self.settle_delay_ms);
        if self.settle_check_size {
            Settle::SizeStable {
                interval: delay,
                max_wait: Duration::from_millis(self.settle_max_wait_ms),
            }
        } else {
            Settle::Fixed(delay)
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.paperless_url.trim().is_empty() {
            return Err(ConfigError::Invalid("paperless_url must not be empty".into()));
        }
        if self.post_upload_action == PostUploadAction::Move
            && self.processed_folder.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid(
                "processed_folder is required when post_upload_action is 'move'".into(),
            ));
        }
        Ok(self)
    }
}

/// Loads configuration from the optional file and `UPLOADER_*` environment variables.
pub fn load(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    load_with_env(path, None)
}

/// Like [`load`], reading environment overrides from `env` instead of the process
/// environment when given.
pub fn load_with_env(
    path: Option<&str>,
    env: Option<HashMap<String, String>>,
) -> Result<AppConfig, ConfigError> {
    let mut settings = config::Config::builder()
        .set_default("paperless_url", DEFAULT_URL)?
        .set_default("api_key", "")?
        .set_default("watch_folder", "watch")?
        .set_default("post_upload_action", "")?
        .set_default("processed_folder", "processed")?
        .set_default("settle_delay_ms", 1000i64)?
        .set_default("settle_check_size", false)?
        .set_default("settle_max_wait_ms", 60_000i64)?;
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("tags")
            .source(env),
    );
    let cfg = settings.build()?;
    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()
}

/// Writes [`EXAMPLE_CONFIG`] to `path`. Returns true when an existing file was replaced.
pub fn write_example(path: &Path, force: bool) -> Result<bool, ConfigError> {
    let existed = path.exists();
    if existed && !force {
        return Err(ConfigError::Exists(path.to_path_buf()));
    }
    fs::write(path, EXAMPLE_CONFIG).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(existed)
}
