//! Releasing GPU-side resources held by discarded scene objects.
//!
//! The render backend does the actual freeing; [`ResourceDisposer`] decides
//! the order (texture before the material that samples it) and makes sure a
//! resource reached through several paths is released once.

use std::collections::HashSet;

use geoview_materials::{Material, ResourceId, Texture};
use tracing::debug;

use crate::object::{Geometry, SceneObject};

/// Frees engine-side resources. Implemented by the 3D runtime.
pub trait ResourceBackend {
    fn release_geometry(&mut self, geometry: &Geometry);
    fn release_texture(&mut self, texture: &Texture);
    fn release_material(&mut self, material: &Material);
}

/// Release order enforcement and dedup by resource identity.
#[derive(Debug)]
pub struct ResourceDisposer<B> {
    backend: B,
    released: HashSet<ResourceId>,
}

impl<B: ResourceBackend> ResourceDisposer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            released: HashSet::new(),
        }
    }

    /// Release the material's texture map, then the material.
    pub fn dispose_material(&mut self, material: &Material) {
        if let Some(map) = material.map() {
            self.dispose_texture(map);
        }
        if self.released.insert(material.id()) {
            debug!(material = %material.id(), name = material.name(), "release material");
            self.backend.release_material(material);
        }
    }

    /// Release geometry, then material (with its map), then any texture the
    /// object references directly.
    pub fn dispose_object(&mut self, object: &SceneObject) {
        if let Some(geometry) = &object.geometry
            && self.released.insert(geometry.id())
        {
            debug!(geometry = %geometry.id(), object = %object.id(), "release geometry");
            self.backend.release_geometry(geometry);
        }
        if let Some(material) = &object.material {
            self.dispose_material(material);
        }
        if let Some(texture) = &object.texture {
            self.dispose_texture(texture);
        }
    }

    /// Whether a resource has already gone through this disposer.
    pub fn is_released(&self, id: ResourceId) -> bool {
        self.released.contains(&id)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn dispose_texture(&mut self, texture: &Texture) {
        if self.released.insert(texture.id()) {
            debug!(texture = %texture.id(), label = texture.label(), "release texture");
            self.backend.release_texture(texture);
        }
    }
}

/// A released resource, as recorded by [`ReleaseLog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Released {
    Geometry(ResourceId),
    Texture(ResourceId),
    Material(ResourceId),
}

/// Backend that records releases in order instead of freeing anything.
#[derive(Debug, Default)]
pub struct ReleaseLog {
    pub events: Vec<Released>,
}

impl ReleaseLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_materials(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Released::Material(_)))
            .count()
    }

    /// Position of a release in the log.
    pub fn position(&self, event: Released) -> Option<usize> {
        self.events.iter().position(|&e| e == event)
    }
}

impl ResourceBackend for ReleaseLog {
    fn release_geometry(&mut self, geometry: &Geometry) {
        self.events.push(Released::Geometry(geometry.id()));
    }

    fn release_texture(&mut self, texture: &Texture) {
        self.events.push(Released::Texture(texture.id()));
    }

    fn release_material(&mut self, material: &Material) {
        self.events.push(Released::Material(material.id()));
    }
}
