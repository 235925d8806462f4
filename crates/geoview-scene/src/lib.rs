//! Retained scene graph the terrain session feeds: objects, camera, ray
//! picking, scoped visibility for hit-tests, and GPU resource disposal.

pub mod camera;
pub mod dispose;
pub mod interaction;
pub mod object;
pub mod raycast;
pub mod scene;

pub use camera::{Camera, Projection, SharedCamera};
pub use dispose::{ReleaseLog, Released, ResourceBackend, ResourceDisposer};
pub use interaction::{VisibilityGuard, apply};
pub use object::{Geometry, ObjectId, SceneObject};
pub use raycast::{Aabb, Intersection, Ray, Raycaster};
pub use scene::{Scene, SharedScene};
