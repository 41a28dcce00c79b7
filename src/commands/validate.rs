// ABOUTME: Validate command implementation.
// ABOUTME: Builds every configured image and reports the ones that are degraded.

use localcloud::cloud::CloudClient;
use localcloud::config::Config;
use localcloud::error::{Error, Result};
use localcloud::output::Output;

pub fn validate(config: &Config, output: &Output) -> Result<()> {
    let client = CloudClient::from_config(config)?;
    let images = client.images();

    output.progress(&format!(
        "Profile {}: {} image(s)",
        config.profile,
        images.len()
    ));

    for image in &images {
        output.image(image);
    }

    let degraded = images
        .iter()
        .filter(|image| image.error_info().is_some())
        .count();
    if degraded > 0 {
        return Err(Error::DegradedImages(degraded));
    }

    output.success("All images can provision instances");
    Ok(())
}
