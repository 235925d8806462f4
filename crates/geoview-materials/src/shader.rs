//! Declarative shader definitions: WGSL vertex/fragment programs plus the
//! named uniform values a material binds to them.

use glam::Vec3;

/// Uniform names shared between the WGSL programs and [`UniformSet`] lookups.
pub mod uniform_names {
    pub const COLOR: &str = "color";
    pub const CAMERA_POSITION: &str = "cameraPosition";
    pub const NEAR_COLOR: &str = "nearColor";
    pub const FAR_COLOR: &str = "farColor";
    pub const MIN_DEPTH: &str = "minDepth";
    pub const MAX_DEPTH: &str = "maxDepth";
}

use uniform_names::*;

/// Per-object transforms shared by every program (group 0).
const TRANSFORMS: &str = r#"
struct Transforms {
    model: mat4x4<f32>,
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> transforms: Transforms;
"#;

const CONSTANT_COLOR_VERTEX: &str = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return transforms.view_proj * transforms.model * vec4<f32>(position, 1.0);
}
"#;

const CONSTANT_COLOR_FRAGMENT: &str = r#"
struct ConstantColor {
    color: vec3<f32>,
};

@group(1) @binding(0) var<uniform> material: ConstantColor;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(material.color, 1.0);
}
"#;

const DISTANCE_VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    let world = transforms.model * vec4<f32>(position, 1.0);
    var out: VertexOutput;
    out.clip_position = transforms.view_proj * world;
    out.world_position = world.xyz;
    return out;
}
"#;

// Field order matches `DistanceUniforms`.
const DISTANCE_FRAGMENT: &str = r#"
struct DistanceShading {
    cameraPosition: vec3<f32>,
    minDepth: f32,
    nearColor: vec3<f32>,
    maxDepth: f32,
    farColor: vec3<f32>,
    _padding: f32,
};

@group(1) @binding(0) var<uniform> shading: DistanceShading;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let d = distance(in.world_position, shading.cameraPosition);
    let t = clamp((d - shading.minDepth) / (shading.maxDepth - shading.minDepth), 0.0, 1.0);
    return vec4<f32>(mix(shading.nearColor, shading.farColor, t), 1.0);
}
"#;

const TEXTURED_VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = transforms.view_proj * transforms.model * vec4<f32>(position, 1.0);
    out.uv = uv;
    return out;
}
"#;

const TEXTURED_FRAGMENT: &str = r#"
@group(1) @binding(0) var map_texture: texture_2d<f32>;
@group(1) @binding(1) var map_sampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(map_texture, map_sampler, in.uv);
}
"#;

/// A uniform value as the render backend sees it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec3(Vec3),
    /// Linear RGB.
    Color(Vec3),
}

/// Ordered set of named uniform values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformSet {
    entries: Vec<(&'static str, UniformValue)>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &'static str, value: UniformValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: &'static str, value: UniformValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Replace an existing value. Returns `false` if `name` is not declared.
    pub fn update(&mut self, name: &str, value: UniformValue) -> bool {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Float uniform by name.
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Vector or color uniform by name.
    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.get(name)? {
            UniformValue::Vec3(v) | UniformValue::Color(v) => Some(v),
            UniformValue::Float(_) => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Vertex and fragment programs under a stable name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderProgram {
    pub name: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
}

impl ShaderProgram {
    /// Single WGSL module: shared transforms, vertex stage, then fragment stage.
    pub fn module_source(&self) -> String {
        let mut source =
            String::with_capacity(TRANSFORMS.len() + self.vertex.len() + self.fragment.len());
        source.push_str(TRANSFORMS);
        source.push_str(self.vertex);
        source.push_str(self.fragment);
        source
    }
}

/// A program together with its initial uniform values.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderDef {
    pub program: ShaderProgram,
    pub uniforms: UniformSet,
}

/// Fixed color at full opacity.
pub fn constant_color_shader(color: Vec3) -> ShaderDef {
    ShaderDef {
        program: ShaderProgram {
            name: "constant_color",
            vertex: CONSTANT_COLOR_VERTEX,
            fragment: CONSTANT_COLOR_FRAGMENT,
        },
        uniforms: UniformSet::new().with(COLOR, UniformValue::Color(color)),
    }
}

/// Near/far color blend driven by the fragment's distance from the camera.
pub fn distance_shader(
    camera_position: Vec3,
    near_color: Vec3,
    far_color: Vec3,
    min_depth: f32,
    max_depth: f32,
) -> ShaderDef {
    ShaderDef {
        program: ShaderProgram {
            name: "distance_shaded",
            vertex: DISTANCE_VERTEX,
            fragment: DISTANCE_FRAGMENT,
        },
        uniforms: UniformSet::new()
            .with(CAMERA_POSITION, UniformValue::Vec3(camera_position))
            .with(NEAR_COLOR, UniformValue::Color(near_color))
            .with(FAR_COLOR, UniformValue::Color(far_color))
            .with(MIN_DEPTH, UniformValue::Float(min_depth))
            .with(MAX_DEPTH, UniformValue::Float(max_depth)),
    }
}

/// Samples a bound texture map; no uniforms.
pub fn textured_shader() -> ShaderDef {
    ShaderDef {
        program: ShaderProgram {
            name: "textured",
            vertex: TEXTURED_VERTEX,
            fragment: TEXTURED_FRAGMENT,
        },
        uniforms: UniformSet::new(),
    }
}
