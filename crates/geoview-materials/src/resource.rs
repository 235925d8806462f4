//! Engine-side resource identity and texture handles.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a GPU-side resource (texture, material, geometry).
///
/// Two handles refer to the same resource exactly when their ids are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

/// A texture owned by the render backend, e.g. satellite imagery.
#[derive(Debug)]
pub struct Texture {
    id: ResourceId,
    label: String,
    width: u32,
    height: u32,
}

impl Texture {
    /// Describe a new texture of the given size.
    pub fn new(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: ResourceId::next(),
            label: label.into(),
            width,
            height,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Width and height in texels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
