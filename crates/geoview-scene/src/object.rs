//! Scene objects and the geometry they carry.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use geoview_materials::{Material, ResourceId, Texture};
use glam::Vec3;

use crate::raycast::Aabb;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a scene object, assigned once at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// Mesh geometry held by the render backend. Only its local bounds are kept
/// on the CPU side, for picking.
#[derive(Debug)]
pub struct Geometry {
    id: ResourceId,
    label: String,
    bounds: Aabb,
}

impl Geometry {
    pub fn new(label: impl Into<String>, bounds: Aabb) -> Self {
        Self {
            id: ResourceId::next(),
            label: label.into(),
            bounds,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Bounds in object-local space.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

/// A renderable node: terrain vector mesh, DEM tile, or satellite plane.
///
/// Not `Clone`: each object has its own identity.
#[derive(Debug)]
pub struct SceneObject {
    id: ObjectId,
    pub name: String,
    pub visible: bool,
    /// Translation of the object's local space in the scene.
    pub position: Vec3,
    pub geometry: Option<Arc<Geometry>>,
    pub material: Option<Arc<Material>>,
    /// Texture referenced directly by the object rather than via its material.
    pub texture: Option<Arc<Texture>>,
}

impl SceneObject {
    /// A visible object at the origin with no resources attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::next(),
            name: name.into(),
            visible: true,
            position: Vec3::ZERO,
            geometry: None,
            material: None,
            texture: None,
        }
    }

    pub fn with_geometry(mut self, geometry: Arc<Geometry>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_material(mut self, material: Arc<Material>) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Geometry bounds translated into scene space.
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.geometry
            .as_ref()
            .map(|g| g.bounds().translated(self.position))
    }
}
