//! Scoped visibility override for hit-tests.
//!
//! Raycasts skip hidden objects, so a query over interactive objects first
//! forces them visible. The original flags are restored when the guard drops,
//! which also covers early returns and panics inside the query.

use std::collections::HashMap;

use crate::object::ObjectId;
use crate::scene::Scene;

/// Forces a set of objects visible for its lifetime.
pub struct VisibilityGuard<'a> {
    scene: &'a mut Scene,
    saved: HashMap<ObjectId, bool>,
}

impl<'a> VisibilityGuard<'a> {
    /// Save each object's visibility, keyed by identity, then show it.
    ///
    /// Ids listed twice keep the flag saved on first sight. Ids not in the
    /// scene are ignored.
    pub fn force_visible(scene: &'a mut Scene, ids: &[ObjectId]) -> Self {
        let mut saved = HashMap::with_capacity(ids.len());
        for &id in ids {
            if let Some(object) = scene.get_mut(id) {
                saved.entry(id).or_insert(object.visible);
                object.visible = true;
            }
        }
        Self { scene, saved }
    }

    pub fn scene(&self) -> &Scene {
        self.scene
    }

    /// Number of distinct objects whose visibility will be restored.
    pub fn saved_len(&self) -> usize {
        self.saved.len()
    }
}

impl Drop for VisibilityGuard<'_> {
    fn drop(&mut self) {
        for (&id, &visible) in &self.saved {
            if let Some(object) = self.scene.get_mut(id) {
                object.visible = visible;
            }
        }
    }
}

/// Run `query` with every object in `ids` visible, then restore visibility.
pub fn apply<R>(
    scene: &mut Scene,
    ids: &[ObjectId],
    query: impl FnOnce(&Scene, &[ObjectId]) -> R,
) -> R {
    let guard = VisibilityGuard::force_visible(scene, ids);
    query(guard.scene(), ids)
}
