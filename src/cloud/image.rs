// ABOUTME: Cloud image owning the registry of instances provisioned from one agent home.
// ABOUTME: Serializes reuse-or-create decisions so concurrent starts never race.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use super::{
    ErrorInfo, IdGenerator, ImageError, Instance, InstanceError, InstanceFactory,
    LocalInstanceFactory, ReusePolicy, UserData,
};
use crate::types::{ImageId, ImageName, InstanceId};

type Registry = HashMap<InstanceId, Arc<dyn Instance>>;

/// A template for provisioning instances, plus the instances it provisioned.
///
/// An image whose agent home is missing is still constructed. It carries a
/// permanent [`ErrorInfo`] so the orchestrator can list it and show why it is
/// unusable.
pub struct Image {
    id: ImageId,
    name: ImageName,
    agent_home: PathBuf,
    error: Option<ErrorInfo>,
    policy: ReusePolicy,
    instances: RwLock<Registry>,
    id_generator: IdGenerator,
    factory: Arc<dyn InstanceFactory>,
    /// Held for the whole of an acquisition or a disposal.
    acquisition: Mutex<()>,
    self_ref: Weak<Image>,
}

impl Image {
    /// Create an image that mints [`LocalInstance`](super::LocalInstance)s.
    pub fn new(
        id: ImageId,
        name: ImageName,
        agent_home: impl AsRef<Path>,
    ) -> Result<Arc<Self>, ImageError> {
        Self::with_factory(id, name, agent_home, Arc::new(LocalInstanceFactory))
    }

    pub fn with_factory(
        id: ImageId,
        name: ImageName,
        agent_home: impl AsRef<Path>,
        factory: Arc<dyn InstanceFactory>,
    ) -> Result<Arc<Self>, ImageError> {
        if id.is_empty() {
            return Err(ImageError::EmptyId);
        }

        let (agent_home, error) = resolve_agent_home(agent_home.as_ref());
        if let Some(ref error) = error {
            tracing::warn!("Image {} is degraded: {}", id, error);
        }

        let policy = if name.is_reusable() {
            ReusePolicy::Restartable
        } else {
            ReusePolicy::SingleUse
        };

        Ok(Arc::new_cyclic(|self_ref| Image {
            id,
            name,
            agent_home,
            error,
            policy,
            instances: RwLock::new(HashMap::new()),
            id_generator: IdGenerator::new(),
            factory,
            acquisition: Mutex::new(()),
            self_ref: self_ref.clone(),
        }))
    }

    pub fn id(&self) -> &ImageId {
        &self.id
    }

    pub fn name(&self) -> &ImageName {
        &self.name
    }

    pub fn agent_home(&self) -> &Path {
        &self.agent_home
    }

    pub fn error_info(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn reuse_policy(&self) -> ReusePolicy {
        self.policy
    }

    /// Non-owning handle given to instances of this image.
    pub fn handle(&self) -> ImageHandle {
        ImageHandle(self.self_ref.clone())
    }

    /// Snapshot of the current instances. Mutating the returned vector does
    /// not touch the registry.
    pub fn instances(&self) -> Vec<Arc<dyn Instance>> {
        self.instances.read().values().cloned().collect()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.read().len()
    }

    /// Number of instances currently starting, running or restarting.
    pub fn running_instance_count(&self) -> usize {
        self.instances()
            .iter()
            .filter(|instance| instance.status().is_running())
            .count()
    }

    pub fn find_instance_by_id(&self, id: &InstanceId) -> Option<Arc<dyn Instance>> {
        self.instances.read().get(id).cloned()
    }

    /// Start an instance for `data`, reusing an idle one when possible.
    ///
    /// A stopped, healthy, restartable instance is started again if one exists.
    /// Otherwise a new instance is minted, registered and started. Image-level
    /// errors are not checked here; the instance's own start reports them.
    pub fn start_new_instance(&self, data: &UserData) -> Result<Arc<dyn Instance>, InstanceError> {
        let _guard = self.acquisition.lock();

        // Any eligible instance will do; no ordering among candidates.
        if let Some(instance) = self
            .instances()
            .into_iter()
            .find(|instance| is_reusable(instance.as_ref()))
        {
            tracing::debug!("Reusing stopped instance {} of image {}", instance.id(), self.id);
            instance.start(data)?;
            return Ok(instance);
        }

        let id = self.id_generator.next_id();
        let instance = self.factory.create(id, self.handle(), self.policy);
        self.instances
            .write()
            .insert(instance.id().clone(), Arc::clone(&instance));
        tracing::info!("Created instance {} of image {}", instance.id(), self.id);

        instance.start(data)?;
        Ok(instance)
    }

    /// Drop `id` from the registry. Called by instances that discard themselves.
    ///
    /// Returns whether an entry was removed.
    pub fn forget_instance(&self, id: &InstanceId) -> bool {
        self.instances.write().remove(id).is_some()
    }

    /// Terminate every instance and clear the registry.
    ///
    /// Termination failures are logged and otherwise ignored.
    pub fn dispose(&self) {
        let _guard = self.acquisition.lock();

        let instances = self.instances();
        tracing::info!(
            "Disposing image {} with {} instance(s)",
            self.id,
            instances.len()
        );

        for instance in &instances {
            if let Err(e) = instance.terminate() {
                tracing::warn!("Failed to terminate instance {}: {}", instance.id(), e);
            }
        }

        self.instances.write().clear();
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("agent_home", &self.agent_home)
            .field("error", &self.error)
            .field("instances", &self.instance_count())
            .finish()
    }
}

/// Weak back-reference from an instance to its image.
#[derive(Debug, Clone)]
pub struct ImageHandle(Weak<Image>);

impl ImageHandle {
    pub fn upgrade(&self) -> Option<Arc<Image>> {
        self.0.upgrade()
    }

    /// Ask the image to forget an instance. Returns false if nothing was
    /// removed or the image no longer exists.
    pub fn forget(&self, id: &InstanceId) -> bool {
        self.upgrade()
            .map(|image| image.forget_instance(id))
            .unwrap_or(false)
    }
}

fn is_reusable(instance: &dyn Instance) -> bool {
    instance.error_info().is_none() && instance.status().is_stopped() && instance.is_restartable()
}

fn resolve_agent_home(path: &Path) -> (PathBuf, Option<ErrorInfo>) {
    match std::fs::canonicalize(path) {
        Ok(resolved) if resolved.is_dir() => (resolved, None),
        Ok(resolved) => (resolved, Some(not_a_directory(path))),
        Err(_) => (path.to_path_buf(), Some(not_a_directory(path))),
    }
}

fn not_a_directory(path: &Path) -> ErrorInfo {
    ErrorInfo::new(format!(
        "\"{}\" is not a directory or does not exist.",
        path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = Image::new(ImageId::new(""), ImageName::new("linux").unwrap(), dir.path());
        assert!(matches!(result, Err(ImageError::EmptyId)));
    }

    #[test]
    fn agent_home_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("agent");
        std::fs::create_dir(&nested).unwrap();

        let image = Image::new(
            ImageId::new("linux"),
            ImageName::new("linux").unwrap(),
            nested.join("..").join("agent"),
        )
        .unwrap();

        assert_eq!(image.agent_home(), std::fs::canonicalize(&nested).unwrap());
        assert!(image.error_info().is_none());
    }

    #[test]
    fn regular_file_degrades_image() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("agent.zip");
        std::fs::write(&file, b"zip").unwrap();

        let image = Image::new(ImageId::new("linux"), ImageName::new("linux").unwrap(), &file).unwrap();

        let error = image.error_info().expect("file is not a directory");
        assert!(error.message().contains("is not a directory or does not exist"));
    }

    #[test]
    fn reuse_policy_follows_name_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let reusable =
            Image::new(ImageId::new("a"), ImageName::new("reuse-a").unwrap(), dir.path()).unwrap();
        let single =
            Image::new(ImageId::new("b"), ImageName::new("b").unwrap(), dir.path()).unwrap();

        assert_eq!(reusable.reuse_policy(), ReusePolicy::Restartable);
        assert_eq!(single.reuse_policy(), ReusePolicy::SingleUse);
    }

    #[test]
    fn handle_forget_after_drop_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let image =
            Image::new(ImageId::new("a"), ImageName::new("a").unwrap(), dir.path()).unwrap();
        let handle = image.handle();
        drop(image);

        assert!(handle.upgrade().is_none());
        assert!(!handle.forget(&InstanceId::new("1")));
    }
}
