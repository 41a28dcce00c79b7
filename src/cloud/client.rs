// ABOUTME: Cloud client owning every image of a profile.
// ABOUTME: Gates starts on image health and limits, and routes instance actions to images.

use parking_lot::Mutex;
use std::sync::Arc;

use super::{CloudError, ErrorInfo, Image, Instance, InstanceFactory, LocalInstanceFactory, UserData};
use crate::config::Config;
use crate::types::{ImageId, InstanceId};

struct Entry {
    image: Arc<Image>,
    max_instances: Option<usize>,
    /// Held across the limit check and the start it admits.
    admission: Mutex<()>,
}

/// Entry point an orchestrator talks to.
#[derive(Default)]
pub struct CloudClient {
    entries: Vec<Entry>,
}

impl CloudClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one image per configured entry, minting [`LocalInstance`](super::LocalInstance)s.
    pub fn from_config(config: &Config) -> Result<Self, CloudError> {
        Self::from_config_with_factory(config, Arc::new(LocalInstanceFactory))
    }

    pub fn from_config_with_factory(
        config: &Config,
        factory: Arc<dyn InstanceFactory>,
    ) -> Result<Self, CloudError> {
        let mut client = Self::new();
        for image_config in config.images.iter() {
            let image = Image::with_factory(
                image_config.id.clone(),
                image_config.name.clone(),
                &image_config.agent_home,
                Arc::clone(&factory),
            )?;
            client.add_image(image, image_config.max_instances)?;
        }
        Ok(client)
    }

    /// Register an image. Image ids must be unique within a client.
    pub fn add_image(
        &mut self,
        image: Arc<Image>,
        max_instances: Option<usize>,
    ) -> Result<(), CloudError> {
        if self.find_image_by_id(image.id()).is_some() {
            return Err(CloudError::DuplicateImage {
                id: image.id().clone(),
            });
        }
        self.entries.push(Entry {
            image,
            max_instances,
            admission: Mutex::new(()),
        });
        Ok(())
    }

    pub fn images(&self) -> Vec<Arc<Image>> {
        self.entries.iter().map(|e| Arc::clone(&e.image)).collect()
    }

    pub fn find_image_by_id(&self, id: &ImageId) -> Option<Arc<Image>> {
        self.entry(id).map(|e| Arc::clone(&e.image))
    }

    /// Client-level error. A locally built client has none; images carry their own.
    pub fn error_info(&self) -> Option<ErrorInfo> {
        None
    }

    /// Whether `image` is healthy and below its instance limit.
    ///
    /// A point-in-time answer; `start_new_instance` checks again while holding
    /// the image's admission lock.
    pub fn can_start_new_instance(&self, image: &Image) -> bool {
        self.check_can_start(image).is_ok()
    }

    pub fn start_new_instance(
        &self,
        image_id: &ImageId,
        data: &UserData,
    ) -> Result<Arc<dyn Instance>, CloudError> {
        let entry = self.require(image_id)?;
        let _admission = entry.admission.lock();
        self.check_can_start(&entry.image)?;
        Ok(entry.image.start_new_instance(data)?)
    }

    pub fn restart_instance(
        &self,
        image_id: &ImageId,
        instance_id: &InstanceId,
    ) -> Result<(), CloudError> {
        let instance = self.require_instance(image_id, instance_id)?;
        tracing::info!("Restarting instance {} of image {}", instance_id, image_id);
        Ok(instance.restart()?)
    }

    pub fn terminate_instance(
        &self,
        image_id: &ImageId,
        instance_id: &InstanceId,
    ) -> Result<(), CloudError> {
        let instance = self.require_instance(image_id, instance_id)?;
        tracing::info!("Terminating instance {} of image {}", instance_id, image_id);
        Ok(instance.terminate()?)
    }

    /// Find the running instance hosting the agent with the given name, across all images.
    pub fn find_instance_by_agent_name(&self, agent_name: &str) -> Option<Arc<dyn Instance>> {
        self.entries
            .iter()
            .flat_map(|e| e.image.instances())
            .find(|instance| {
                instance.status().is_running() && instance.agent_name().as_deref() == Some(agent_name)
            })
    }

    pub fn dispose(&self) {
        for entry in &self.entries {
            entry.image.dispose();
        }
    }

    fn entry(&self, id: &ImageId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.image.id() == id)
    }

    fn require(&self, id: &ImageId) -> Result<&Entry, CloudError> {
        self.entry(id)
            .ok_or_else(|| CloudError::UnknownImage { id: id.clone() })
    }

    fn require_instance(
        &self,
        image_id: &ImageId,
        instance_id: &InstanceId,
    ) -> Result<Arc<dyn Instance>, CloudError> {
        self.require(image_id)?
            .image
            .find_instance_by_id(instance_id)
            .ok_or_else(|| CloudError::UnknownInstance {
                image: image_id.clone(),
                instance: instance_id.clone(),
            })
    }

    fn check_can_start(&self, image: &Image) -> Result<(), CloudError> {
        if let Some(error) = image.error_info() {
            return Err(CloudError::Degraded {
                id: image.id().clone(),
                error: error.clone(),
            });
        }

        let limit = self.entry(image.id()).and_then(|e| e.max_instances);
        if let Some(limit) = limit
            && image.running_instance_count() >= limit
        {
            return Err(CloudError::LimitReached {
                id: image.id().clone(),
                limit,
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for CloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.image))
            .finish()
    }
}
