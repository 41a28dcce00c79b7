// ABOUTME: Cloud images, their instances, and the client that owns them.
// ABOUTME: Exports the acquisition core along with the instance contract and error types.

mod client;
mod error;
mod error_info;
mod id_generator;
mod image;
mod instance;
mod status;
mod user_data;

pub use client::CloudClient;
pub use error::{CloudError, CloudErrorKind, ImageError, InstanceError};
pub use error_info::ErrorInfo;
pub use id_generator::IdGenerator;
pub use image::{Image, ImageHandle};
pub use instance::{
    Instance, InstanceFactory, InstanceSnapshot, LocalInstance, LocalInstanceFactory, ReusePolicy,
};
pub use status::InstanceStatus;
pub use user_data::UserData;
