// ABOUTME: Shared test fixtures for integration tests.
// ABOUTME: Provides a recording Instance implementation and image builders.

#![allow(dead_code)]

use localcloud::cloud::{
    ErrorInfo, Image, ImageHandle, Instance, InstanceError, InstanceFactory, InstanceStatus,
    ReusePolicy, UserData,
};
use localcloud::types::{ImageId, ImageName, InstanceId};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Instance that records calls and lets tests drive its state directly.
#[derive(Debug)]
pub struct RecordingInstance {
    id: InstanceId,
    restartable: bool,
    status: Mutex<InstanceStatus>,
    error: Mutex<Option<ErrorInfo>>,
    fail_start: AtomicBool,
    start_delay: Option<Duration>,
    pub starts: AtomicUsize,
    pub terminations: AtomicUsize,
}

impl RecordingInstance {
    pub fn new(id: InstanceId, restartable: bool) -> Self {
        Self {
            id,
            restartable,
            status: Mutex::new(InstanceStatus::ScheduledToStart),
            error: Mutex::new(None),
            fail_start: AtomicBool::new(false),
            start_delay: None,
            starts: AtomicUsize::new(0),
            terminations: AtomicUsize::new(0),
        }
    }

    /// Stay in Starting for `delay` before reporting Running.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    pub fn set_status(&self, status: InstanceStatus) {
        *self.status.lock() = status;
    }

    pub fn set_error(&self, error: ErrorInfo) {
        *self.error.lock() = Some(error);
    }

    pub fn fail_next_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn termination_count(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

impl Instance for RecordingInstance {
    fn id(&self) -> &InstanceId {
        &self.id
    }

    fn status(&self) -> InstanceStatus {
        *self.status.lock()
    }

    fn error_info(&self) -> Option<ErrorInfo> {
        self.error.lock().clone()
    }

    fn is_restartable(&self) -> bool {
        self.restartable
    }

    fn start(&self, _data: &UserData) -> Result<(), InstanceError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.swap(false, Ordering::SeqCst) {
            self.set_error(ErrorInfo::new("start failed"));
            self.set_status(InstanceStatus::Error);
            return Err(InstanceError::Failed("start failed".to_string()));
        }
        if let Some(delay) = self.start_delay {
            self.set_status(InstanceStatus::Starting);
            std::thread::sleep(delay);
        }
        self.set_status(InstanceStatus::Running);
        Ok(())
    }

    fn terminate(&self) -> Result<(), InstanceError> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        self.set_status(InstanceStatus::Stopped);
        Ok(())
    }
}

/// Factory that keeps a handle on every instance it creates.
#[derive(Default)]
pub struct RecordingFactory {
    created: Mutex<Vec<Arc<RecordingInstance>>>,
    /// When set, the next created instance fails its first start.
    fail_next: AtomicBool,
    start_delay: Option<Duration>,
}

impl RecordingFactory {
    /// Factory whose instances take `delay` to start.
    pub fn slow(delay: Duration) -> Self {
        Self {
            start_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<Arc<RecordingInstance>> {
        self.created.lock().clone()
    }

    pub fn get(&self, id: &InstanceId) -> Arc<RecordingInstance> {
        self.created()
            .into_iter()
            .find(|instance| instance.id() == id)
            .expect("instance created by this factory")
    }

    pub fn fail_next_instance(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl InstanceFactory for RecordingFactory {
    fn create(
        &self,
        id: InstanceId,
        _image: ImageHandle,
        policy: ReusePolicy,
    ) -> Arc<dyn Instance> {
        let mut instance = RecordingInstance::new(id, policy.is_restartable());
        if let Some(delay) = self.start_delay {
            instance = instance.with_start_delay(delay);
        }
        let instance = Arc::new(instance);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            instance.fail_next_start();
        }
        self.created.lock().push(Arc::clone(&instance));
        instance
    }
}

pub fn user_data(agent: &str) -> UserData {
    UserData::new(agent, "http://localhost:8111")
}

pub fn local_image(id: &str, name: &str, agent_home: &Path) -> Arc<Image> {
    Image::new(ImageId::new(id), ImageName::new(name).unwrap(), agent_home).unwrap()
}

pub fn recording_image(name: &str, agent_home: &Path) -> (Arc<Image>, Arc<RecordingFactory>) {
    let factory = Arc::new(RecordingFactory::default());
    let image = Image::with_factory(
        ImageId::new("recorded"),
        ImageName::new(name).unwrap(),
        agent_home,
        factory.clone(),
    )
    .unwrap();
    (image, factory)
}
