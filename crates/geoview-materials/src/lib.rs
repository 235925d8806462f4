//! Surface materials: shader definitions, the material factory, textures, and
//! the resource identifiers the render backend releases them by.

mod material;
mod resource;
mod shader;

pub use material::{
    DistanceShading, DistanceUniforms, Material, MaterialError, MaterialFactory,
};
pub use resource::{ResourceId, Texture};
pub use shader::{
    ShaderDef, ShaderProgram, UniformSet, UniformValue, constant_color_shader, distance_shader,
    textured_shader, uniform_names,
};
