// ABOUTME: Config scaffolding for new cloud profiles.
// ABOUTME: Creates localcloud.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::template());
    std::fs::write(&config_path, yaml)?;
    tracing::debug!("Wrote config template to {}", config_path.display());

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let image = config.images.first();
    format!(
        r#"profile: {}
server_address: {}
idle_timeout: 30m
images:
  - id: {}
    # Names starting with "reuse" keep stopped instances around for reuse
    name: {}
    # Relative paths are resolved against this file's directory
    agent_home: {}
    max_instances: {}
"#,
        config.profile,
        config.server_address,
        image.id,
        image.name,
        image.agent_home.display(),
        image.max_instances.unwrap_or(1)
    )
}
