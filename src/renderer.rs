use glow::{Context, HasContext as _};
use nalgebra::{Matrix4, Point3, Vector3};

use crate::document::GeometryDocument;

const MESH_COLOR: [f32; 3] = [0.78, 0.80, 0.84];
const WIRE_COLOR: [f32; 3] = [0.15, 0.15, 0.18];
const AMBIENT: f32 = 0.35;
const SUN_INTENSITY: f32 = 1.25;
/// Points are drawn as axis crosses of this fraction of the scene size.
const POINT_MARKER: f32 = 0.01;

/// Interleaved `xyz rgb` vertex streams for one document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SceneVertices {
    pub triangles: Vec<f32>,
    pub lines: Vec<f32>,
}

impl SceneVertices {
    pub fn from_document(doc: &GeometryDocument) -> Self {
        let size = doc.bounds().size().norm().max(1.0) as f32;
        let sun = Vector3::new(0.3, -0.4, 1.0).normalize();

        let mut tris = Vec::new();
        let mut segs = Vec::new();
        for object in doc.objects() {
            object.geometry.append_triangles(&mut tris);
            object.geometry.append_segments(size * POINT_MARKER, &mut segs);
        }

        let mut out = SceneVertices::default();
        for [a, b, c] in &tris {
            let n = (b - a).cross(&(c - a));
            // double-sided: light whichever side faces the sun
            let diffuse = n.try_normalize(1e-12).map_or(0.0, |n| n.dot(&sun).abs());
            let shade = (AMBIENT + SUN_INTENSITY * (1.0 - AMBIENT) * diffuse).min(1.0);
            let col = MESH_COLOR.map(|c| c * shade);
            for p in [a, b, c] {
                push_vertex(&mut out.triangles, p, col);
            }
        }
        for [a, b] in &segs {
            push_vertex(&mut out.lines, a, WIRE_COLOR);
            push_vertex(&mut out.lines, b, WIRE_COLOR);
        }
        out
    }
}

fn push_vertex(buf: &mut Vec<f32>, p: &Point3<f32>, col: [f32; 3]) {
    buf.extend_from_slice(&[p.x, p.y, p.z, col[0], col[1], col[2]]);
}

struct Batch {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    vertex_count: i32,
}

impl Batch {
    unsafe fn new(gl: &Context) -> Result<Self, String> {
        unsafe {
            let vao = gl.create_vertex_array()?;
            let vbo = gl.create_buffer()?;
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 24, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, 24, 12);
            gl.bind_vertex_array(None);
            Ok(Self { vao, vbo, vertex_count: 0 })
        }
    }

    unsafe fn upload(&mut self, gl: &Context, verts: &[f32]) {
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(verts), glow::STATIC_DRAW);
        }
        // 6 floats per vertex: xyz rgb
        self.vertex_count = (verts.len() / 6) as i32;
    }

    unsafe fn draw(&self, gl: &Context, mode: u32) {
        if self.vertex_count == 0 {
            return;
        }
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(mode, 0, self.vertex_count);
        }
    }
}

/// GPU side of the viewport: one shader, a triangle batch and a line batch.
pub struct GpuScene {
    program: glow::Program,
    u_mvp: glow::UniformLocation,
    triangles: Batch,
    lines: Batch,
    revision: Option<u64>,
}

unsafe impl Send for GpuScene {}
unsafe impl Sync for GpuScene {}

impl GpuScene {
    pub unsafe fn new(gl: &Context) -> Result<Self, String> {
        unsafe {
            let program = link_program(gl)?;
            let u_mvp = gl
                .get_uniform_location(program, "u_mvp")
                .ok_or_else(|| "u_mvp uniform missing".to_owned())?;
            Ok(Self {
                program,
                u_mvp,
                triangles: Batch::new(gl)?,
                lines: Batch::new(gl)?,
                revision: None,
            })
        }
    }

    /// Re-upload vertex data if `revision` differs from what is on the GPU.
    pub unsafe fn sync(&mut self, gl: &Context, revision: u64, doc: Option<&GeometryDocument>) {
        if self.revision == Some(revision) {
            return;
        }
        let verts = doc.map(SceneVertices::from_document).unwrap_or_default();
        unsafe {
            self.triangles.upload(gl, &verts.triangles);
            self.lines.upload(gl, &verts.lines);
        }
        self.revision = Some(revision);
    }

    pub unsafe fn paint(&self, gl: &Context, mvp: Matrix4<f32>) {
        unsafe {
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.clear(glow::DEPTH_BUFFER_BIT);
            gl.use_program(Some(self.program));
            gl.uniform_matrix_4_f32_slice(Some(&self.u_mvp), false, mvp.as_slice());
            self.triangles.draw(gl, glow::TRIANGLES);
            self.lines.draw(gl, glow::LINES);
            gl.bind_vertex_array(None);
            gl.disable(glow::DEPTH_TEST);
        }
    }
}

unsafe fn link_program(gl: &Context) -> Result<glow::Program, String> {
    let sources = [
        (
            glow::VERTEX_SHADER,
            r#"#version 300 es
            precision highp float;
            uniform mat4 u_mvp;
            layout(location = 0) in vec3 a_pos;
            layout(location = 1) in vec3 a_col;
            out vec3 v_col;
            void main() {
                v_col = a_col;
                gl_Position = u_mvp * vec4(a_pos, 1.0);
            }"#,
        ),
        (
            glow::FRAGMENT_SHADER,
            r#"#version 300 es
            precision mediump float;
            in vec3 v_col;
            out vec4 o_col;
            void main() { o_col = vec4(v_col, 1.0); }"#,
        ),
    ];

    unsafe {
        let program = gl.create_program()?;
        let mut shaders = Vec::with_capacity(sources.len());
        for (kind, source) in sources {
            let shader = gl.create_shader(kind)?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                return Err(gl.get_shader_info_log(shader));
            }
            gl.attach_shader(program, shader);
            shaders.push(shader);
        }
        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            return Err(gl.get_program_info_log(program));
        }
        for shader in shaders {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }
        Ok(program)
    }
}
