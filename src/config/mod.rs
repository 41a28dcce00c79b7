// ABOUTME: Cloud profile configuration loaded from localcloud.yml.
// ABOUTME: Handles YAML parsing, file discovery, and agent home path resolution.

mod deserialize;
mod init;

pub use init::init_config;

use crate::error::{Error, Result};
use crate::types::{ImageId, ImageName};
use deserialize::{deserialize_image_id, deserialize_image_name, deserialize_images};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "localcloud.yml";
pub const CONFIG_FILENAME_ALT: &str = "localcloud.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".localcloud/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default = "default_server_address")]
    pub server_address: String,

    #[serde(default, with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,

    #[serde(deserialize_with = "deserialize_images")]
    pub images: NonEmpty<ImageConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    #[serde(deserialize_with = "deserialize_image_id")]
    pub id: ImageId,

    #[serde(deserialize_with = "deserialize_image_name")]
    pub name: ImageName,

    pub agent_home: PathBuf,

    #[serde(default)]
    pub max_instances: Option<usize>,
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_server_address() -> String {
    "http://localhost:8111".to_string()
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. Relative agent homes are resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Loading config from {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn find_image(&self, id: &ImageId) -> Option<&ImageConfig> {
        self.images.iter().find(|image| &image.id == id)
    }

    pub fn template() -> Self {
        Config {
            profile: default_profile(),
            server_address: default_server_address(),
            idle_timeout: Some(Duration::from_secs(30 * 60)),
            images: NonEmpty::new(ImageConfig {
                id: ImageId::new("local"),
                name: ImageName::new("reuse-local").expect("template image name is valid"),
                agent_home: PathBuf::from("buildAgent"),
                max_instances: Some(2),
            }),
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for image in self.images.iter() {
            if !seen.insert(&image.id) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate image id: {}",
                    image.id
                )));
            }
            if image.max_instances == Some(0) {
                return Err(Error::InvalidConfig(format!(
                    "image {}: max_instances must be at least 1",
                    image.id
                )));
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for image in self.images.iter_mut() {
            if image.agent_home.is_relative() {
                image.agent_home = base.join(&image.agent_home);
            }
        }
    }
}
