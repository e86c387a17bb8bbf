//! Base and builder image descriptors

use super::error::DefinitionError;
use super::schema::ImageRecord;
use std::fmt;

/// Which image slot of the `images` section a descriptor came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKey {
    BaseImage,
    BuilderImage,
}

impl ImageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKey::BaseImage => "base_image",
            ImageKey::BuilderImage => "builder_image",
        }
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated container image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescription {
    pub name: String,
    /// Name the image was signed under, when pulled from a mirror
    pub signature_original_name: Option<String>,
}

impl ImageDescription {
    /// Validate a structurally-checked image record.
    ///
    /// `name` is required and, like `signature_original_name`, must carry a
    /// tag. Empty strings count as absent.
    pub(crate) fn from_record(key: ImageKey, record: ImageRecord) -> Result<Self, DefinitionError> {
        let name = record
            .name
            .filter(|name| !name.is_empty())
            .ok_or(DefinitionError::MissingImageName(key))?;
        let signature_original_name = record
            .signature_original_name
            .filter(|name| !name.is_empty());

        for image in std::iter::once(&name).chain(signature_original_name.as_ref()) {
            if !has_tag(image) {
                return Err(DefinitionError::MissingImageTag(image.clone()));
            }
        }

        Ok(Self {
            name,
            signature_original_name,
        })
    }
}

/// Whether the final path segment of an image reference ends in a non-empty
/// `:tag`. Registry ports (`host:5000/ns/img`) live in earlier segments and
/// are ignored.
pub fn has_tag(image: &str) -> bool {
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    match last_segment.rsplit_once(':') {
        Some((repository, tag)) => !repository.is_empty() && !tag.is_empty(),
        None => false,
    }
}
