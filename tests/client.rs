// ABOUTME: Integration tests for the cloud client.
// ABOUTME: Tests image lookup, start gating, limits, and instance routing.

mod support;

use localcloud::cloud::{CloudClient, CloudErrorKind, Image, InstanceStatus};
use localcloud::config::Config;
use localcloud::types::{ImageId, ImageName, InstanceId};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::time::Duration;
use support::{RecordingFactory, local_image, recording_image, user_data};
use tempfile::TempDir;

fn config_for(dir: &Path) -> Config {
    let yaml = format!(
        r#"
images:
  - id: reuse
    name: reuse-linux
    agent_home: {home}
    max_instances: 2
  - id: once
    name: linux
    agent_home: {home}
  - id: broken
    name: broken
    agent_home: {home}/missing
"#,
        home = dir.display()
    );
    Config::from_yaml(&yaml).unwrap()
}

#[test]
fn from_config_builds_every_image() {
    let dir = TempDir::new().unwrap();
    let client = CloudClient::from_config(&config_for(dir.path())).unwrap();

    let ids: Vec<_> = client
        .images()
        .iter()
        .map(|image| image.id().to_string())
        .collect();
    assert_eq!(ids, ["reuse", "once", "broken"]);
    assert!(client.error_info().is_none());

    let broken = client.find_image_by_id(&ImageId::new("broken")).unwrap();
    assert!(broken.error_info().is_some());
    assert!(!client.can_start_new_instance(&broken));
}

#[test]
fn duplicate_image_ids_are_rejected() {
    let dir = TempDir::new().unwrap();
    let mut client = CloudClient::new();
    client
        .add_image(local_image("linux", "linux", dir.path()), None)
        .unwrap();

    let err = client
        .add_image(local_image("linux", "other", dir.path()), None)
        .unwrap_err();
    assert_eq!(err.kind(), CloudErrorKind::Duplicate);
}

#[test]
fn start_on_unknown_image_fails() {
    let client = CloudClient::new();
    let err = client
        .start_new_instance(&ImageId::new("nope"), &user_data("a"))
        .unwrap_err();
    assert_eq!(err.kind(), CloudErrorKind::NotFound);
}

#[test]
fn start_on_degraded_image_fails_without_registering() {
    let dir = TempDir::new().unwrap();
    let client = CloudClient::from_config(&config_for(dir.path())).unwrap();
    let id = ImageId::new("broken");

    let err = client.start_new_instance(&id, &user_data("a")).unwrap_err();

    assert_eq!(err.kind(), CloudErrorKind::Degraded);
    assert!(err.error_info().is_some());
    let image = client.find_image_by_id(&id).unwrap();
    assert!(image.instances().is_empty());
}

#[test]
fn limit_caps_running_instances() {
    let dir = TempDir::new().unwrap();
    let client = CloudClient::from_config(&config_for(dir.path())).unwrap();
    let id = ImageId::new("reuse");

    let first = client.start_new_instance(&id, &user_data("a")).unwrap();
    client.start_new_instance(&id, &user_data("b")).unwrap();
    let err = client.start_new_instance(&id, &user_data("c")).unwrap_err();
    assert_eq!(err.kind(), CloudErrorKind::Capacity);

    // Stopping one frees a slot, and the stopped instance is reused.
    client.terminate_instance(&id, first.id()).unwrap();
    let again = client.start_new_instance(&id, &user_data("c")).unwrap();
    assert_eq!(again.id(), first.id());
}

#[test]
fn limit_holds_under_concurrent_starts() {
    const CALLERS: usize = 8;
    const LIMIT: usize = 2;

    let dir = TempDir::new().unwrap();
    let factory = Arc::new(RecordingFactory::slow(Duration::from_millis(50)));
    let image = Image::with_factory(
        ImageId::new("slow"),
        ImageName::new("linux").unwrap(),
        dir.path(),
        factory,
    )
    .unwrap();
    let mut client = CloudClient::new();
    client.add_image(image.clone(), Some(LIMIT)).unwrap();
    let client = Arc::new(client);

    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|n| {
            let client = Arc::clone(&client);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                client.start_new_instance(&ImageId::new("slow"), &user_data(&format!("agent-{n}")))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, LIMIT);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind(), CloudErrorKind::Capacity);
    }
    assert_eq!(image.running_instance_count(), LIMIT);
    assert_eq!(image.instances().len(), LIMIT);
}

#[test]
fn restart_routes_to_instance() {
    let dir = TempDir::new().unwrap();
    let client = CloudClient::from_config(&config_for(dir.path())).unwrap();
    let id = ImageId::new("reuse");
    let instance = client.start_new_instance(&id, &user_data("a")).unwrap();
    let started = instance.started_at().unwrap();

    client.restart_instance(&id, instance.id()).unwrap();

    assert_eq!(instance.status(), InstanceStatus::Running);
    assert!(instance.started_at().unwrap() >= started);
}

#[test]
fn restart_unsupported_by_instance_is_reported() {
    let dir = TempDir::new().unwrap();
    let (image, _factory) = recording_image("reuse-linux", dir.path());
    let mut client = CloudClient::new();
    client.add_image(image.clone(), None).unwrap();
    let instance = client
        .start_new_instance(image.id(), &user_data("a"))
        .unwrap();

    let err = client.restart_instance(image.id(), instance.id()).unwrap_err();
    assert_eq!(err.kind(), CloudErrorKind::Instance);
}

#[test]
fn instance_actions_on_unknown_instance_fail() {
    let dir = TempDir::new().unwrap();
    let client = CloudClient::from_config(&config_for(dir.path())).unwrap();

    let err = client
        .terminate_instance(&ImageId::new("once"), &InstanceId::new("99"))
        .unwrap_err();
    assert_eq!(err.kind(), CloudErrorKind::NotFound);
}

#[test]
fn finds_instance_by_agent_name_across_images() {
    let dir = TempDir::new().unwrap();
    let client = CloudClient::from_config(&config_for(dir.path())).unwrap();
    client
        .start_new_instance(&ImageId::new("reuse"), &user_data("alpha"))
        .unwrap();
    let beta = client
        .start_new_instance(&ImageId::new("once"), &user_data("beta"))
        .unwrap();

    let found = client.find_instance_by_agent_name("beta").unwrap();
    assert_eq!(found.id(), beta.id());
    assert!(client.find_instance_by_agent_name("gamma").is_none());
}

#[test]
fn stopped_instance_no_longer_hosts_its_agent() {
    let dir = TempDir::new().unwrap();
    let client = CloudClient::from_config(&config_for(dir.path())).unwrap();
    let id = ImageId::new("reuse");
    let alpha = client.start_new_instance(&id, &user_data("alpha")).unwrap();

    client.terminate_instance(&id, alpha.id()).unwrap();

    // Still registered for reuse, but not running the agent
    assert!(client.find_image_by_id(&id).unwrap().find_instance_by_id(alpha.id()).is_some());
    assert!(client.find_instance_by_agent_name("alpha").is_none());
}

#[test]
fn dispose_empties_every_image() {
    let dir = TempDir::new().unwrap();
    let client = CloudClient::from_config(&config_for(dir.path())).unwrap();
    client
        .start_new_instance(&ImageId::new("reuse"), &user_data("a"))
        .unwrap();
    client
        .start_new_instance(&ImageId::new("once"), &user_data("b"))
        .unwrap();

    client.dispose();

    for image in client.images() {
        assert!(image.instances().is_empty());
    }
}
