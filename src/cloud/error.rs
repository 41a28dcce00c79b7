// ABOUTME: Error types for images, instances, and the cloud client.
// ABOUTME: Instance and image errors use thiserror; the client error unifies them with SNAFU.

use snafu::Snafu;

use super::ErrorInfo;
use crate::types::{ImageId, InstanceId};

/// Errors raised while constructing an image.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image id cannot be empty")]
    EmptyId,
}

/// Errors raised by an instance's own lifecycle actions.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    /// The owning image carries a permanent error.
    #[error("image {image} cannot provision instances: {reason}")]
    ImageDegraded { image: ImageId, reason: ErrorInfo },

    /// The owning image was dropped while the instance was still referenced.
    #[error("instance {0} outlived its image")]
    ImageGone(InstanceId),

    #[error("instance {0} is already running")]
    AlreadyRunning(InstanceId),

    #[error("instance {0} is not running")]
    NotRunning(InstanceId),

    /// A single-use instance that has already run once.
    #[error("instance {0} cannot be started again")]
    NotRestartable(InstanceId),

    #[error("instance does not support {0}")]
    Unsupported(&'static str),

    #[error("instance failed: {0}")]
    Failed(String),
}

/// Errors surfaced by [`CloudClient`](super::CloudClient) operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CloudError {
    #[snafu(display("unknown image: {id}"))]
    UnknownImage { id: ImageId },

    #[snafu(display("unknown instance {instance} in image {image}"))]
    UnknownInstance { image: ImageId, instance: InstanceId },

    #[snafu(display("duplicate image id: {id}"))]
    DuplicateImage { id: ImageId },

    #[snafu(display("image {id} is degraded: {error}"))]
    Degraded { id: ImageId, error: ErrorInfo },

    #[snafu(display("image {id} reached its limit of {limit} running instance(s)"))]
    LimitReached { id: ImageId, limit: usize },

    #[snafu(display("invalid image: {source}"))]
    Image { source: ImageError },

    #[snafu(display("instance operation failed: {source}"))]
    Instance { source: InstanceError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudErrorKind {
    /// Image or instance lookup failed.
    NotFound,
    /// Image id collides with an existing image.
    Duplicate,
    /// Image cannot provision because its agent home is invalid.
    Degraded,
    /// Image is at its configured instance limit.
    Capacity,
    /// Image could not be constructed.
    InvalidImage,
    /// The instance itself rejected the operation.
    Instance,
}

impl CloudError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> CloudErrorKind {
        match self {
            CloudError::UnknownImage { .. } | CloudError::UnknownInstance { .. } => {
                CloudErrorKind::NotFound
            }
            CloudError::DuplicateImage { .. } => CloudErrorKind::Duplicate,
            CloudError::Degraded { .. } => CloudErrorKind::Degraded,
            CloudError::LimitReached { .. } => CloudErrorKind::Capacity,
            CloudError::Image { .. } => CloudErrorKind::InvalidImage,
            CloudError::Instance { source } => match source {
                InstanceError::ImageDegraded { .. } => CloudErrorKind::Degraded,
                _ => CloudErrorKind::Instance,
            },
        }
    }

    /// Returns the image's error descriptor if this is a degradation failure.
    pub fn error_info(&self) -> Option<&ErrorInfo> {
        match self {
            CloudError::Degraded { error, .. } => Some(error),
            CloudError::Instance {
                source: InstanceError::ImageDegraded { reason, .. },
            } => Some(reason),
            _ => None,
        }
    }
}

impl From<ImageError> for CloudError {
    fn from(source: ImageError) -> Self {
        CloudError::Image { source }
    }
}

impl From<InstanceError> for CloudError {
    fn from(source: InstanceError) -> Self {
        CloudError::Instance { source }
    }
}
