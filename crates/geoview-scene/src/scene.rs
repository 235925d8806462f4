//! Insertion-ordered container of scene objects.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::object::{ObjectId, SceneObject};

/// Scene handle shared between its owner and the terrain session.
pub type SharedScene = Rc<RefCell<Scene>>;

/// The set of renderable objects, iterated in the order they were added.
#[derive(Debug, Default)]
pub struct Scene {
    objects: HashMap<ObjectId, SceneObject>,
    order: Vec<ObjectId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a new empty scene in a shared handle.
    pub fn shared() -> SharedScene {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Add an object and return its id. Re-adding an id already present
    /// replaces the stored object and keeps its position in the order.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id();
        debug!(object = %id, name = %object.name, "scene add");
        if self.objects.insert(id, object).is_some() {
            warn!(object = %id, "object was already in the scene; replaced");
        } else {
            self.order.push(id);
        }
        id
    }

    /// Detach an object, handing ownership back to the caller.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let object = self.objects.remove(&id)?;
        self.order.retain(|&other| other != id);
        debug!(object = %id, name = %object.name, "scene remove");
        Some(object)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// First object (in add order) with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<&SceneObject> {
        self.iter().find(|obj| obj.name == name)
    }

    /// Objects in add order.
    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.order.iter().filter_map(|id| self.objects.get(id))
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
