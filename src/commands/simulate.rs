// ABOUTME: Simulate command implementation.
// ABOUTME: Sends concurrent start requests to one image and prints the resulting registry.

use futures::future::join_all;
use localcloud::cloud::{CloudClient, CloudError, Image, InstanceSnapshot, UserData};
use localcloud::config::Config;
use localcloud::error::Result;
use localcloud::output::Output;
use localcloud::types::ImageId;
use std::sync::Arc;

pub struct SimulateOptions {
    pub image: String,
    pub requests: usize,
    pub rounds: usize,
    pub stop: bool,
}

pub async fn simulate(config: Config, options: SimulateOptions, mut output: Output) -> Result<()> {
    let client = Arc::new(CloudClient::from_config(&config)?);
    let image_id = ImageId::new(options.image);
    let image = client
        .find_image_by_id(&image_id)
        .ok_or_else(|| CloudError::UnknownImage {
            id: image_id.clone(),
        })?;

    if let Some(error) = image.error_info() {
        return Err(CloudError::Degraded {
            id: image_id,
            error: error.clone(),
        }
        .into());
    }

    output.start_timer();
    let mut started = 0;
    let mut failed = 0;

    for round in 1..=options.rounds {
        output.progress(&format!(
            "Round {}: {} concurrent start request(s) on {}",
            round, options.requests, image_id
        ));

        let tasks = (0..options.requests).map(|n| {
            let client = Arc::clone(&client);
            let image_id = image_id.clone();
            let data = user_data(&config, round, n);
            tokio::task::spawn_blocking(move || client.start_new_instance(&image_id, &data))
        });

        let mut round_instances = Vec::new();
        for result in join_all(tasks).await {
            match result? {
                Ok(instance) => {
                    started += 1;
                    round_instances.push(instance);
                }
                Err(e) => {
                    failed += 1;
                    output.error(&e.to_string());
                }
            }
        }

        if options.stop {
            for instance in &round_instances {
                if let Err(e) = instance.terminate() {
                    tracing::warn!("Failed to stop instance {}: {}", instance.id(), e);
                }
            }
        }

        output.instances(&snapshot(&image));
    }

    client.dispose();

    output.success(&format!(
        "{} start(s) succeeded, {} failed",
        started, failed
    ));
    Ok(())
}

fn user_data(config: &Config, round: usize, request: usize) -> UserData {
    let mut data = UserData::new(
        format!("{}-agent-{}-{}", config.profile, round, request),
        config.server_address.clone(),
    )
    .profile(config.profile.clone());
    if let Some(timeout) = config.idle_timeout {
        data = data.idle_timeout(timeout);
    }
    data
}

fn snapshot(image: &Image) -> Vec<InstanceSnapshot> {
    let mut instances: Vec<_> = image
        .instances()
        .iter()
        .map(|instance| InstanceSnapshot::of(instance.as_ref()))
        .collect();
    instances.sort_by_key(|s| s.id.as_str().parse::<u64>().unwrap_or(u64::MAX));
    instances
}
