//! Image reference types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an image resource inside a document.
///
/// This is the indirect object id `(object number, generation)` of the image
/// XObject. The document stores image data once under this id and may place
/// it any number of times, so it is the deduplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// Object number
    pub number: u32,
    /// Generation number
    pub generation: u16,
}

impl ResourceId {
    /// Create a new resource id.
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl From<(u32, u16)> for ResourceId {
    fn from((number, generation): (u32, u16)) -> Self {
        Self::new(number, generation)
    }
}

impl From<ResourceId> for (u32, u16) {
    fn from(id: ResourceId) -> Self {
        (id.number, id.generation)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// One placement of an image on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Page number (1-indexed)
    pub page: u32,

    /// Resource name in the XObject dictionary (e.g., "Im0")
    pub name: String,

    /// Underlying image resource
    pub resource: ResourceId,

    /// Whether the image was reached through a Form XObject
    pub via_form: bool,
}

impl ImageRef {
    /// Create a reference found directly in a page's resources.
    pub fn new(page: u32, name: impl Into<String>, resource: impl Into<ResourceId>) -> Self {
        Self {
            page,
            name: name.into(),
            resource: resource.into(),
            via_form: false,
        }
    }

    /// Mark the reference as found inside a Form XObject.
    pub fn in_form(mut self) -> Self {
        self.via_form = true;
        self
    }
}

/// A reference as reported by a listing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedImage {
    #[serde(flatten)]
    pub reference: ImageRef,

    /// Whether an earlier reference already named the same resource
    pub duplicate: bool,
}
