//! Built-in WGSL programs.
//!
//! The integrator exists twice: as a vertex-stage stream-out program (the
//! preferred path) and as a compute fallback. Both share [`NOISE_WGSL`] and
//! [`FIELD_WGSL`], which mirror [`crate::field`] line for line.
//!
//! Particle streams are `array<f32>` with three floats per particle so the
//! same buffers work as tightly packed `Float32x3` vertex buffers.

/// Integer hash and 3D value noise.
pub const NOISE_WGSL: &str = r#"
fn hash(n: u32) -> u32 {
    var x = n;
    x = x ^ (x >> 17u);
    x = x * 0xed5ad4bbu;
    x = x ^ (x >> 11u);
    x = x * 0xac4c1b51u;
    x = x ^ (x >> 15u);
    x = x * 0x31848babu;
    x = x ^ (x >> 14u);
    return x;
}

fn hash3(p: vec3<u32>) -> u32 {
    return hash(p.x + hash(p.y + hash(p.z)));
}

// Lattice value in [0, 1), 24 bits.
fn lattice(c: vec3<i32>) -> f32 {
    return f32(hash3(vec3<u32>(c)) >> 8u) / 16777216.0;
}

fn value_noise3(p: vec3<f32>) -> f32 {
    let i = floor(p);
    let f = p - i;
    let u = f * f * (3.0 - 2.0 * f);
    let c = vec3<i32>(i);

    let c000 = lattice(c);
    let c100 = lattice(c + vec3<i32>(1, 0, 0));
    let c010 = lattice(c + vec3<i32>(0, 1, 0));
    let c110 = lattice(c + vec3<i32>(1, 1, 0));
    let c001 = lattice(c + vec3<i32>(0, 0, 1));
    let c101 = lattice(c + vec3<i32>(1, 0, 1));
    let c011 = lattice(c + vec3<i32>(0, 1, 1));
    let c111 = lattice(c + vec3<i32>(1, 1, 1));

    return mix(
        mix(mix(c000, c100, u.x), mix(c010, c110, u.x), u.y),
        mix(mix(c001, c101, u.x), mix(c011, c111, u.x), u.y),
        u.z
    );
}
"#;

/// Uniform block, output streams and the per-particle step.
pub const FIELD_WGSL: &str = r#"
const TAU: f32 = 6.28318530718;
const DECORRELATION_SCALE: f32 = 7.88822129;

struct FlowUniforms {
    env_vec: vec3<f32>, // premultiplied by force
    time: f32,
    time_delta: f32,
    noise_force: f32,
    damping: f32,
    particle_count: u32,
    extent: vec2<f32>,
    _pad: vec2<f32>,
};

struct ParticleState {
    pos: vec3<f32>,
    vel: vec3<f32>,
};

@group(0) @binding(0)
var<uniform> flow: FlowUniforms;

@group(0) @binding(1)
var<storage, read_write> out_pos: array<f32>;

@group(0) @binding(2)
var<storage, read_write> out_vel: array<f32>;

fn noise_direction(pos: vec3<f32>) -> vec3<f32> {
    let n1 = value_noise3(vec3<f32>(pos.xy, flow.time));
    let n2 = value_noise3(vec3<f32>(pos.xy * DECORRELATION_SCALE, flow.time));

    let a1 = n1 * TAU;
    let a2 = n2 * TAU;

    let raw = vec3<f32>(
        cos(a1) - cos(a2),
        sin(a1) * 0.5 + sin(a2) * 0.5,
        0.0
    );
    let len = length(raw);
    if len > 1e-6 {
        return raw / len;
    }
    return vec3<f32>(0.0);
}

fn wrap_axis(v: f32, e: f32) -> f32 {
    var w = v;
    if w > e {
        w = w - e * 2.0;
    }
    if w < -e {
        w = w + e * 2.0;
    }
    return w;
}

fn integrate(pos: vec3<f32>, vel: vec3<f32>) -> ParticleState {
    let dir = noise_direction(pos);

    var next_vel = vel + (dir * flow.noise_force + flow.env_vec) * flow.time_delta;
    next_vel = next_vel * flow.damping;

    var next_pos = pos + next_vel;
    next_pos.x = wrap_axis(next_pos.x, flow.extent.x);
    next_pos.y = wrap_axis(next_pos.y, flow.extent.y);

    return ParticleState(next_pos, next_vel);
}

fn store_particle(index: u32, state: ParticleState) {
    let base = index * 3u;
    out_pos[base] = state.pos.x;
    out_pos[base + 1u] = state.pos.y;
    out_pos[base + 2u] = state.pos.z;
    out_vel[base] = state.vel.x;
    out_vel[base + 1u] = state.vel.y;
    out_vel[base + 2u] = state.vel.z;
}
"#;

/// Stream-out entry point: one invocation per particle, nothing rasterized.
pub const INTEGRATE_VERTEX_ENTRY_WGSL: &str = r#"
@vertex
fn vs_main(
    @builtin(vertex_index) index: u32,
    @location(0) in_pos: vec3<f32>,
    @location(1) in_vel: vec3<f32>,
) -> @builtin(position) vec4<f32> {
    store_particle(index, integrate(in_pos, in_vel));

    // Outside the clip volume: the point is dropped before rasterization.
    return vec4<f32>(2.0, 2.0, 2.0, 1.0);
}
"#;

/// Pass-through fragment stage of the integrator program. Never produces
/// visible output; the pipeline masks all color writes.
pub const INTEGRATE_FRAGMENT_WGSL: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;

/// Compute entry point used when vertex-stage storage writes are unavailable.
pub const INTEGRATE_COMPUTE_ENTRY_WGSL: &str = r#"
@group(0) @binding(3)
var<storage, read> in_pos: array<f32>;

@group(0) @binding(4)
var<storage, read> in_vel: array<f32>;

@compute @workgroup_size(256)
fn cs_main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let index = global_id.x;
    if index >= flow.particle_count {
        return;
    }

    let base = index * 3u;
    let pos = vec3<f32>(in_pos[base], in_pos[base + 1u], in_pos[base + 2u]);
    let vel = vec3<f32>(in_vel[base], in_vel[base + 1u], in_vel[base + 2u]);

    store_particle(index, integrate(pos, vel));
}
"#;

/// Point renderer vertex stage: one screen-aligned quad per particle.
pub const POINTS_VERTEX_WGSL: &str = r#"
struct PointUniforms {
    view_proj: mat4x4<f32>,
    viewport: vec2<f32>,
    point_size: f32,
    color_mode: u32,
};

@group(0) @binding(0)
var<uniform> points: PointUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

fn direction_color(vel: vec3<f32>) -> vec3<f32> {
    var dir = vec2<f32>(0.0);
    if length(vel.xy) > 0.0 {
        dir = normalize(vel.xy);
    }
    return vec3<f32>(dir * 0.5 + 0.5, 0.5);
}

fn speed_color(vel: vec3<f32>) -> vec3<f32> {
    let speed = clamp(length(vel) * 14.0, 0.0, 1.0);
    return vec3<f32>(0.9, speed, 0.2);
}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) in_pos: vec3<f32>,
    @location(1) in_vel: vec3<f32>,
) -> VertexOutput {
    var quad_vertices = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );
    let corner = quad_vertices[vertex_index];

    var clip_pos = points.view_proj * vec4<f32>(in_pos, 1.0);
    // Orthographic: every particle sits on the near plane.
    clip_pos.z = 0.0;

    // point_size pixels across; NDC spans 2 units per viewport.
    let half_ndc = points.point_size / points.viewport;
    clip_pos.x += corner.x * half_ndc.x * clip_pos.w;
    clip_pos.y += corner.y * half_ndc.y * clip_pos.w;

    var out: VertexOutput;
    out.clip_position = clip_pos;
    if points.color_mode == 1u {
        out.color = speed_color(in_vel);
    } else {
        out.color = direction_color(in_vel);
    }
    return out;
}
"#;

/// Point renderer fragment stage: opaque flat color.
pub const POINTS_FRAGMENT_WGSL: &str = r#"
@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
"#;

/// Full stream-out integrator program.
pub fn integrate_vertex_program() -> String {
    format!("{NOISE_WGSL}\n{FIELD_WGSL}\n{INTEGRATE_VERTEX_ENTRY_WGSL}")
}

/// Full compute integrator program.
pub fn integrate_compute_program() -> String {
    format!("{NOISE_WGSL}\n{FIELD_WGSL}\n{INTEGRATE_COMPUTE_ENTRY_WGSL}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) -> Result<naga::Module, String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {}", e.emit_to_string(code)))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(module)
    }

    fn entry_points(module: &naga::Module) -> Vec<(naga::ShaderStage, String)> {
        module
            .entry_points
            .iter()
            .map(|ep| (ep.stage, ep.name.clone()))
            .collect()
    }

    #[test]
    fn test_integrate_vertex_program_is_valid() {
        let module = validate_wgsl(&integrate_vertex_program()).expect("stream-out program");
        assert_eq!(
            entry_points(&module),
            vec![(naga::ShaderStage::Vertex, "vs_main".to_string())]
        );
    }

    #[test]
    fn test_integrate_fragment_program_is_valid() {
        validate_wgsl(INTEGRATE_FRAGMENT_WGSL).expect("pass-through fragment");
    }

    #[test]
    fn test_integrate_compute_program_is_valid() {
        let module = validate_wgsl(&integrate_compute_program()).expect("compute program");
        assert_eq!(
            entry_points(&module),
            vec![(naga::ShaderStage::Compute, "cs_main".to_string())]
        );
    }

    #[test]
    fn test_point_programs_are_valid() {
        validate_wgsl(POINTS_VERTEX_WGSL).expect("point vertex stage");
        validate_wgsl(POINTS_FRAGMENT_WGSL).expect("point fragment stage");
    }

    #[test]
    fn test_field_constants_match_reference() {
        assert!(FIELD_WGSL.contains("7.88822129"));
        assert!((crate::field::DECORRELATION_SCALE - 7.888_221_3).abs() < 1e-6);
    }
}
