//! Ray picking against object bounds.
//!
//! Only visible objects are hit, which is why interactive queries run inside a
//! [`VisibilityGuard`](crate::VisibilityGuard).

use glam::Vec3;

use crate::object::ObjectId;
use crate::scene::Scene;

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from two corners, sorting components so `min <= max`.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Slab test. Returns the entry distance along the ray, or the exit
    /// distance when the origin is inside the box.
    pub fn ray_hit(&self, ray: &Ray) -> Option<f32> {
        let inv = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv;
        let t1 = (self.max - ray.origin) * inv;

        // NaN from 0 * inf (origin on a slab plane) is discarded by min/max.
        let t_near = t0.min(t1).max_element();
        let t_far = t0.max(t1).min_element();

        if t_near > t_far || t_far < 0.0 {
            return None;
        }
        Some(if t_near >= 0.0 { t_near } else { t_far })
    }
}

/// A half-line with a normalized direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Normalizes `direction`; a zero direction yields `None`.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// One object hit by a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub object: ObjectId,
    pub distance: f32,
    pub point: Vec3,
}

/// Casts a ray into a set of scene objects.
#[derive(Clone, Copy, Debug)]
pub struct Raycaster {
    pub ray: Ray,
    /// Hits beyond this distance are ignored.
    pub far: f32,
}

impl Raycaster {
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            far: f32::INFINITY,
        }
    }

    pub fn with_far(mut self, far: f32) -> Self {
        self.far = far;
        self
    }

    /// Hits among `ids`, nearest first. Hidden objects, objects without
    /// geometry, and ids missing from the scene are skipped.
    pub fn intersect_objects(&self, scene: &Scene, ids: &[ObjectId]) -> Vec<Intersection> {
        let mut hits: Vec<Intersection> = ids
            .iter()
            .filter_map(|&id| scene.get(id))
            .filter(|obj| obj.visible)
            .filter_map(|obj| {
                let distance = obj.world_bounds()?.ray_hit(&self.ray)?;
                (distance <= self.far).then(|| Intersection {
                    object: obj.id(),
                    distance,
                    point: self.ray.at(distance),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Nearest hit among `ids`.
    pub fn first_hit(&self, scene: &Scene, ids: &[ObjectId]) -> Option<Intersection> {
        self.intersect_objects(scene, ids).into_iter().next()
    }
}
