//! Material handles and the [`MaterialFactory`] that builds them from shader
//! definitions.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use log::{debug, info};
use thiserror::Error;

use crate::resource::{ResourceId, Texture};
use crate::shader::{
    ShaderDef, ShaderProgram, UniformSet, UniformValue, constant_color_shader, distance_shader,
    textured_shader, uniform_names,
};

// ---------------------------------------------------------------------------
// MaterialError
// ---------------------------------------------------------------------------

/// Errors returned while building or updating materials.
#[derive(Debug, Error, PartialEq)]
pub enum MaterialError {
    /// The material name must not be empty.
    #[error("material name must not be empty")]
    EmptyName,

    /// Distance shading needs `max_depth > min_depth`, both finite.
    #[error("degenerate depth range: min_depth {min_depth} must be below max_depth {max_depth}")]
    DegenerateDepthRange { min_depth: f32, max_depth: f32 },

    /// The material's program declares no uniform with this name.
    #[error("material '{material}' has no uniform named '{name}'")]
    UnknownUniform { material: String, name: String },
}

// ---------------------------------------------------------------------------
// DistanceShading
// ---------------------------------------------------------------------------

/// Parameters of camera-distance shading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceShading {
    /// Linear RGB at `min_depth` and closer.
    pub near_color: Vec3,
    /// Linear RGB at `max_depth` and farther.
    pub far_color: Vec3,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Default for DistanceShading {
    fn default() -> Self {
        Self {
            near_color: Vec3::new(0.0, 0.0, 1.0),
            far_color: Vec3::new(1.0, 0.0, 0.0),
            min_depth: 0.0,
            max_depth: 1.9,
        }
    }
}

impl DistanceShading {
    /// Rejects ranges that would divide by zero (or go negative) in the
    /// fragment program.
    pub fn validated(self) -> Result<Self, MaterialError> {
        let finite = self.min_depth.is_finite() && self.max_depth.is_finite();
        if !finite || self.max_depth <= self.min_depth {
            return Err(MaterialError::DegenerateDepthRange {
                min_depth: self.min_depth,
                max_depth: self.max_depth,
            });
        }
        Ok(self)
    }

    /// Normalized depth `t` in `[0, 1]` for a camera distance.
    pub fn depth_factor(&self, distance: f32) -> f32 {
        ((distance - self.min_depth) / (self.max_depth - self.min_depth)).clamp(0.0, 1.0)
    }

    /// CPU mirror of the fragment program.
    pub fn shade(&self, world_position: Vec3, camera_position: Vec3) -> Vec3 {
        let t = self.depth_factor(world_position.distance(camera_position));
        self.near_color.lerp(self.far_color, t)
    }

    /// Pack into the uniform buffer layout.
    pub fn to_uniforms(&self, camera_position: Vec3) -> DistanceUniforms {
        DistanceUniforms {
            camera_position: camera_position.to_array(),
            min_depth: self.min_depth,
            near_color: self.near_color.to_array(),
            max_depth: self.max_depth,
            far_color: self.far_color.to_array(),
            _padding: 0.0,
        }
    }

    fn shader_def(&self, camera_position: Vec3) -> ShaderDef {
        distance_shader(
            camera_position,
            self.near_color,
            self.far_color,
            self.min_depth,
            self.max_depth,
        )
    }
}

/// GPU-friendly distance shading uniforms, 48 bytes, std140-compatible.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DistanceUniforms {
    pub camera_position: [f32; 3],
    pub min_depth: f32,
    pub near_color: [f32; 3],
    pub max_depth: f32,
    pub far_color: [f32; 3],
    pub _padding: f32,
}

// ---------------------------------------------------------------------------
// Material
// ---------------------------------------------------------------------------

/// A renderable surface material.
///
/// Shared through `Arc` by the scene object it is attached to and by any
/// bookkeeping that tracks it. Uniform values can be refreshed in place.
#[derive(Debug)]
pub struct Material {
    id: ResourceId,
    name: String,
    program: Arc<ShaderProgram>,
    uniforms: RwLock<UniformSet>,
    map: Option<Arc<Texture>>,
}

impl Material {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// Bound texture map, if any.
    pub fn map(&self) -> Option<&Arc<Texture>> {
        self.map.as_ref()
    }

    /// Snapshot of the current uniform values.
    pub fn uniforms(&self) -> UniformSet {
        self.uniforms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
    }

    /// Replace a declared uniform value.
    pub fn set_uniform(&self, name: &str, value: UniformValue) -> Result<(), MaterialError> {
        let updated = self
            .uniforms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .update(name, value);
        if updated {
            Ok(())
        } else {
            Err(MaterialError::UnknownUniform {
                material: self.name.clone(),
                name: name.to_string(),
            })
        }
    }

    /// Whether this material blends by camera distance.
    pub fn is_distance_shaded(&self) -> bool {
        self.uniform(uniform_names::CAMERA_POSITION).is_some()
    }
}

// ---------------------------------------------------------------------------
// MaterialFactory
// ---------------------------------------------------------------------------

/// Builds materials from shader definitions, sharing one program per shader
/// name across every material that uses it.
#[derive(Debug, Default)]
pub struct MaterialFactory {
    programs: HashMap<&'static str, Arc<ShaderProgram>>,
}

impl MaterialFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a material from an arbitrary shader definition.
    pub fn build(
        &mut self,
        name: &str,
        def: ShaderDef,
        map: Option<Arc<Texture>>,
    ) -> Result<Arc<Material>, MaterialError> {
        if name.is_empty() {
            return Err(MaterialError::EmptyName);
        }
        Ok(self.assemble(name.to_string(), def, map))
    }

    /// Fixed color, full opacity.
    pub fn constant_color(&mut self, color: Vec3) -> Arc<Material> {
        self.assemble("constant-color".to_string(), constant_color_shader(color), None)
    }

    /// Camera-distance shading. The camera position is captured once; refresh
    /// it with [`Material::set_uniform`] when the camera moves.
    pub fn distance_shaded(
        &mut self,
        shading: &DistanceShading,
        camera_position: Vec3,
    ) -> Result<Arc<Material>, MaterialError> {
        let shading = shading.validated()?;
        Ok(self.assemble(
            "distance-shaded".to_string(),
            shading.shader_def(camera_position),
            None,
        ))
    }

    /// Samples `texture` as its map.
    pub fn textured(&mut self, texture: Arc<Texture>) -> Arc<Material> {
        self.assemble("textured".to_string(), textured_shader(), Some(texture))
    }

    /// Number of distinct shader programs allocated so far.
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    fn assemble(
        &mut self,
        name: String,
        def: ShaderDef,
        map: Option<Arc<Texture>>,
    ) -> Arc<Material> {
        let program = self.program(def.program);
        let material = Material {
            id: ResourceId::next(),
            name,
            program,
            uniforms: RwLock::new(def.uniforms),
            map,
        };
        debug!("Built material '{}' ({})", material.name, material.id);
        Arc::new(material)
    }

    fn program(&mut self, program: ShaderProgram) -> Arc<ShaderProgram> {
        self.programs
            .entry(program.name)
            .or_insert_with(|| {
                info!("Allocated shader program '{}'", program.name);
                Arc::new(program)
            })
            .clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
