// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Validates image ids and names, and requires a non-empty image list.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::ImageConfig;
use crate::types::{ImageId, ImageName};

pub fn deserialize_image_id<'de, D>(deserializer: D) -> Result<ImageId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.trim().is_empty() {
        return Err(serde::de::Error::custom("image id cannot be empty"));
    }
    Ok(ImageId::new(s))
}

pub fn deserialize_image_name<'de, D>(deserializer: D) -> Result<ImageName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ImageName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_images<'de, D>(deserializer: D) -> Result<NonEmpty<ImageConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let images: Vec<ImageConfig> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(images)
        .ok_or_else(|| serde::de::Error::custom("at least one image is required"))
}
