//! Viewer camera: view/projection matrices and picking rays.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::raycast::Ray;

/// Camera handle owned by the viewer; the terrain session only reads it.
pub type SharedCamera = Rc<RefCell<Camera>>;

/// A camera that generates view and projection matrices.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    pub projection: Projection,
    /// Near clip plane distance (always positive).
    pub near: f32,
    /// Far clip plane distance (always positive, > near).
    pub far: f32,
}

/// Projection type for the camera.
#[derive(Debug, Clone)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        /// Width / height.
        aspect_ratio: f32,
    },
    Orthographic {
        half_width: f32,
        half_height: f32,
    },
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            projection: Projection::Perspective {
                fov_y: 45f32.to_radians(),
                aspect_ratio: 16.0 / 9.0,
            },
            near: 0.001,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Wrap in a shared handle.
    pub fn shared(self) -> SharedCamera {
        Rc::new(RefCell::new(self))
    }

    /// Place the camera at `position` looking at `target`.
    pub fn look_at(mut self, position: Vec3, target: Vec3) -> Self {
        self.position = position;
        let view = Mat4::look_at_rh(position, target, Vec3::Y);
        self.rotation = Quat::from_mat4(&view.inverse());
        self
    }

    /// Inverse of the camera transform.
    pub fn view_matrix(&self) -> Mat4 {
        (Mat4::from_translation(self.position) * Mat4::from_quat(self.rotation)).inverse()
    }

    /// Projection matrix with reverse-Z: the near plane maps to depth 1.
    pub fn projection_matrix(&self) -> Mat4 {
        match &self.projection {
            Projection::Perspective {
                fov_y,
                aspect_ratio,
            } => Mat4::perspective_rh(*fov_y, *aspect_ratio, self.far, self.near),
            Projection::Orthographic {
                half_width,
                half_height,
            } => Mat4::orthographic_rh(
                -*half_width,
                *half_width,
                -*half_height,
                *half_height,
                self.far,
                self.near,
            ),
        }
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// The forward direction vector (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if let Projection::Perspective { aspect_ratio, .. } = &mut self.projection {
            *aspect_ratio = width / height;
        }
    }

    /// Picking ray through a point in normalized device coordinates
    /// (`[-1, 1]` on both axes, +Y up), starting on the near plane.
    pub fn ray_through(&self, ndc: Vec2) -> Option<Ray> {
        let inverse = self.view_projection_matrix().inverse();
        let near = inverse.project_point3(ndc.extend(1.0));
        let far = inverse.project_point3(ndc.extend(0.0));
        Ray::new(near, far - near)
    }
}
