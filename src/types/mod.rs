// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to keep image and instance IDs apart at compile time.

mod id;
mod image_name;

pub use id::{Id, ImageId, InstanceId};
pub use image_name::{ImageName, ImageNameError, REUSE_PREFIX};
