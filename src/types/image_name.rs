// ABOUTME: Validated display name for a cloud image.
// ABOUTME: The name's prefix decides whether instances of the image are reused.

use std::fmt;
use thiserror::Error;

/// Names starting with this marker produce restartable instances.
pub const REUSE_PREFIX: &str = "reuse";

#[derive(Debug, Error)]
pub enum ImageNameError {
    #[error("image name cannot be empty")]
    Empty,

    #[error("image name cannot be blank")]
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageName(String);

impl ImageName {
    pub fn new(value: &str) -> Result<Self, ImageNameError> {
        if value.is_empty() {
            return Err(ImageNameError::Empty);
        }

        if value.trim().is_empty() {
            return Err(ImageNameError::Blank);
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this name carries the reuse marker.
    pub fn is_reusable(&self) -> bool {
        self.0.starts_with(REUSE_PREFIX)
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_blank() {
        assert!(matches!(ImageName::new(""), Err(ImageNameError::Empty)));
        assert!(matches!(ImageName::new("  "), Err(ImageNameError::Blank)));
    }

    #[test]
    fn reuse_marker_is_a_prefix() {
        assert!(ImageName::new("reuse-linux").unwrap().is_reusable());
        assert!(ImageName::new("reuse").unwrap().is_reusable());
        assert!(!ImageName::new("linux-reuse").unwrap().is_reusable());
        assert!(!ImageName::new("Reuse-linux").unwrap().is_reusable());
    }
}
