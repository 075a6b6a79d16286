//! A [`Driver`] that needs no GPU.
//!
//! [`RecordingDriver`] keeps GL objects in memory, counts every call it receives and
//! rasterizes indexed triangles into the color texture and stencil renderbuffer attached to
//! the bound framebuffer. That is enough to observe both how many calls a
//! [`GraphicsContext`](crate::context::GraphicsContext) issues and what ends up in a
//! framebuffer.
//!
//! Shaders are not executed. Positions are read from attribute `0` as normalized device
//! coordinates, and every fragment gets the program's fill color: the value of a `vec4` uniform
//! named `color` if one was uploaded, otherwise the constant `gl_FragColor = vec4(..)`
//! assignment of the fragment shader, otherwise opaque white. A shader containing an `#error`
//! line fails to compile with the remainder of that line as its log.
#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};

use tracing::trace;

use super::{
    ffi::{self, types::*},
    Driver,
};
use crate::context::{GlError, Program};


use raster::{BlendState, Pipeline, StencilState, Target};

#[derive(Debug, Default)]
struct TextureObject {
    width: i32,
    height: i32,
    pixels: Vec<u8>,
}

#[derive(Debug, Default)]
struct RenderbufferObject {
    format: GLenum,
    width: i32,
    height: i32,
    stencil: Vec<u8>,
}

#[derive(Debug, Default)]
struct FramebufferObject {
    color: Option<GLuint>,
    stencil: Option<GLuint>,
}

#[derive(Debug)]
struct ShaderObject {
    kind: GLenum,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    shaders: Vec<GLuint>,
    attrib_bindings: HashMap<String, GLuint>,
    linked: bool,
    log: String,
    uniforms: HashMap<String, GLint>,
    attribs: HashMap<String, GLint>,
    values: HashMap<GLint, Vec<u32>>,
    fill: Option<[f32; 4]>,
}

impl ProgramObject {
    fn fill_color(&self) -> [f32; 4] {
        let uniform = self
            .uniforms
            .get("color")
            .and_then(|location| self.values.get(location))
            .filter(|words| words.len() == 4);
        match uniform {
            Some(words) => [
                f32::from_bits(words[0]),
                f32::from_bits(words[1]),
                f32::from_bits(words[2]),
                f32::from_bits(words[3]),
            ],
            None => self.fill.unwrap_or([1.0; 4]),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct VertexAttrib {
    buffer: GLuint,
    size: GLint,
    stride: GLint,
    offset: usize,
    enabled: bool,
}

/// Names declared with one of `qualifiers`, in declaration order
fn declarations(source: &str, qualifiers: &[&str]) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            let qualifier = words.next()?;
            if !qualifiers.contains(&qualifier) {
                return None;
            }
            let declarator = words.last()?.trim_end_matches(';');
            let name = declarator.split('[').next()?;
            (!name.is_empty()).then(|| name.to_owned())
        })
        .collect()
}

/// The constant color of a `gl_FragColor = vec4(r, g, b, a);` assignment
fn constant_fill(source: &str) -> Option<[f32; 4]> {
    let (_, rest) = source.split_once("gl_FragColor = vec4(")?;
    let (args, _) = rest.split_once(')')?;
    let mut components = args.split(',').map(|c| c.trim().parse::<f32>());
    let mut color = [0.0; 4];
    for c in color.iter_mut() {
        *c = components.next()?.ok()?;
    }
    components.next().is_none().then_some(color)
}

/// Call-counting, software-rasterizing [`Driver`]
#[derive(Debug)]
pub struct RecordingDriver {
    calls: HashMap<&'static str, usize>,

    failing_loads: usize,
    fail_next_create: bool,
    fail_next_map: bool,
    forced_status: Option<GLenum>,
    version: String,
    max_texture_size: GLint,
    high_float_precision: GLint,
    error: GLenum,
    next_name: GLuint,

    textures: HashMap<GLuint, TextureObject>,
    renderbuffers: HashMap<GLuint, RenderbufferObject>,
    framebuffers: HashMap<GLuint, FramebufferObject>,
    shaders: HashMap<GLuint, ShaderObject>,
    programs: HashMap<GLuint, ProgramObject>,
    buffers: HashMap<GLuint, Vec<u8>>,

    screen_framebuffer: GLuint,
    bound_texture: GLuint,
    unit_textures: HashMap<GLenum, GLuint>,
    bound_renderbuffer: GLuint,
    bound_framebuffer: GLuint,
    bound_buffers: HashMap<GLenum, GLuint>,
    current_program: GLuint,
    active_texture: GLenum,
    attribs: HashMap<GLuint, VertexAttrib>,

    capabilities: HashSet<GLenum>,
    blend_func: [GLenum; 4],
    blend_equation: [GLenum; 2],
    viewport: [GLint; 4],
    scissor: [GLint; 4],
    color_mask: [bool; 4],
    stencil_func: (GLenum, GLint, GLuint),
    stencil_op: [GLenum; 3],
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDriver {
    pub fn new() -> RecordingDriver {
        RecordingDriver {
            calls: HashMap::new(),
            failing_loads: 0,
            fail_next_create: false,
            fail_next_map: false,
            forced_status: None,
            version: String::from("OpenGL ES 3.0 RecordingDriver"),
            max_texture_size: 2048,
            high_float_precision: 23,
            error: ffi::NO_ERROR,
            next_name: 1,
            textures: HashMap::new(),
            renderbuffers: HashMap::new(),
            framebuffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            screen_framebuffer: 0,
            bound_texture: 0,
            unit_textures: HashMap::new(),
            bound_renderbuffer: 0,
            bound_framebuffer: 0,
            bound_buffers: HashMap::new(),
            current_program: 0,
            active_texture: ffi::TEXTURE0,
            attribs: HashMap::new(),
            capabilities: HashSet::new(),
            blend_func: [ffi::ONE, ffi::ZERO, ffi::ONE, ffi::ZERO],
            blend_equation: [ffi::FUNC_ADD, ffi::FUNC_ADD],
            viewport: [0; 4],
            scissor: [0; 4],
            color_mask: [true; 4],
            stencil_func: (ffi::ALWAYS, 0, 0xff),
            stencil_op: [ffi::KEEP; 3],
        }
    }

    /// Number of calls to the [`Driver`] method `name` since creation or the last
    /// [`reset_counts`](Self::reset_counts)
    pub fn count(&self, name: &str) -> usize {
        self.calls.get(name).copied().unwrap_or(0)
    }

    pub fn reset_counts(&mut self) {
        self.calls.clear();
    }

    /// Makes the next `n` calls to [`Driver::load_functions`] fail
    pub fn fail_function_loads(&mut self, n: usize) {
        self.failing_loads = n;
    }

    /// Makes the next `create_*` call of any kind return `0`
    pub fn fail_next_create(&mut self) {
        self.fail_next_create = true;
    }

    /// Makes the next [`Driver::get_buffer_sub_data`] fail as if the buffer could not be mapped
    pub fn fail_next_map(&mut self) {
        self.fail_next_map = true;
    }

    /// Makes the next completeness check report `status`, with `error` pending
    pub fn force_framebuffer_status(&mut self, status: GLenum, error: GLenum) {
        self.forced_status = Some(status);
        self.error = error;
    }

    /// Uses `framebuffer` as the platform's default framebuffer, and binds it
    pub fn set_screen_framebuffer(&mut self, framebuffer: GLuint) {
        self.screen_framebuffer = framebuffer;
        self.bound_framebuffer = framebuffer;
    }

    /// Sets the `GL_VERSION` string
    pub fn set_version(&mut self, version: &str) {
        self.version = version.to_owned();
    }

    pub fn set_max_texture_size(&mut self, size: GLint) {
        self.max_texture_size = size;
    }

    /// Sets the precision reported for fragment shader `highp` floats
    pub fn set_high_float_precision(&mut self, precision: GLint) {
        self.high_float_precision = precision;
    }

    /// Creates a linked program whose only shader is the fragment shader `source`, without
    /// recording any calls
    pub fn linked_program(&mut self, source: &str) -> Program {
        let name = self.next_name();
        let uniforms = declarations(source, &["uniform"])
            .into_iter()
            .enumerate()
            .map(|(location, uniform)| (uniform, location as GLint))
            .collect();
        self.programs.insert(
            name,
            ProgramObject {
                linked: true,
                uniforms,
                fill: constant_fill(source),
                ..Default::default()
            },
        );
        Program(name)
    }

    pub fn is_enabled(&self, cap: GLenum) -> bool {
        self.capabilities.contains(&cap)
    }

    pub fn blend_func(&self) -> [GLenum; 4] {
        self.blend_func
    }

    pub fn blend_equation(&self) -> [GLenum; 2] {
        self.blend_equation
    }

    pub fn viewport_rect(&self) -> [GLint; 4] {
        self.viewport
    }

    /// Stencil function and the sfail, dpfail, dppass operations
    pub fn stencil_state(&self) -> (GLenum, [GLenum; 3]) {
        (self.stencil_func.0, self.stencil_op)
    }

    pub fn color_write_mask(&self) -> [bool; 4] {
        self.color_mask
    }

    pub fn active_texture_unit(&self) -> GLenum {
        self.active_texture
    }

    /// Texture bound to `TEXTURE_2D` of texture unit `unit`
    pub fn texture_binding(&self, unit: GLenum) -> GLuint {
        if unit == self.active_texture {
            self.bound_texture
        } else {
            self.unit_textures.get(&unit).copied().unwrap_or(0)
        }
    }

    pub fn bound_framebuffer(&self) -> GLuint {
        self.bound_framebuffer
    }

    pub fn bound_buffer(&self, target: GLenum) -> GLuint {
        self.bound_buffers.get(&target).copied().unwrap_or(0)
    }

    /// Size given to the texture's storage, if it has any
    pub fn texture_size(&self, texture: GLuint) -> Option<(i32, i32)> {
        self.textures
            .get(&texture)
            .filter(|t| !t.pixels.is_empty())
            .map(|t| (t.width, t.height))
    }

    /// Internal format given to the renderbuffer's storage, if it has any
    pub fn renderbuffer_format(&self, renderbuffer: GLuint) -> Option<GLenum> {
        self.renderbuffers
            .get(&renderbuffer)
            .filter(|r| r.format != 0)
            .map(|r| r.format)
    }

    pub fn color_attachment(&self, framebuffer: GLuint) -> Option<GLuint> {
        self.framebuffers.get(&framebuffer).and_then(|f| f.color)
    }

    /// Last value uploaded to `location` of `program`, as raw words
    pub fn uniform_value(&self, program: Program, location: GLint) -> Option<Vec<u32>> {
        self.programs
            .get(&program.0)
            .and_then(|p| p.values.get(&location))
            .cloned()
    }

    fn record(&mut self, call: &'static str) {
        *self.calls.entry(call).or_default() += 1;
    }

    fn set_error(&mut self, error: GLenum) {
        if self.error == ffi::NO_ERROR {
            self.error = error;
        }
    }

    fn next_name(&mut self) -> GLuint {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    fn create(&mut self, call: &'static str) -> GLuint {
        self.record(call);
        if std::mem::take(&mut self.fail_next_create) {
            return 0;
        }
        self.next_name()
    }

    fn bound_buffer_mut(&mut self, target: GLenum) -> Option<&mut Vec<u8>> {
        let buffer = self.bound_buffers.get(&target).copied()?;
        self.buffers.get_mut(&buffer)
    }

    fn upload_uniform(&mut self, call: &'static str, location: GLint, words: Vec<u32>) {
        self.record(call);
        match self.programs.get_mut(&self.current_program) {
            Some(program) if program.uniforms.values().any(|l| *l == location) => {
                program.values.insert(location, words);
            }
            Some(_) if location == -1 => {}
            _ => self.set_error(ffi::INVALID_OPERATION),
        }
    }

    fn upload_floats(&mut self, call: &'static str, location: GLint, v: &[f32]) {
        self.upload_uniform(call, location, v.iter().map(|f| f.to_bits()).collect());
    }

    fn framebuffer_status(&self) -> GLenum {
        if self.bound_framebuffer == self.screen_framebuffer {
            return ffi::FRAMEBUFFER_COMPLETE;
        }
        let Some(framebuffer) = self.framebuffers.get(&self.bound_framebuffer) else {
            return ffi::FRAMEBUFFER_UNDEFINED;
        };
        let Some(color) = framebuffer.color else {
            return ffi::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        };
        let Some(size) = self.texture_size(color) else {
            return ffi::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
        };
        if let Some(stencil) = framebuffer.stencil {
            match self.renderbuffers.get(&stencil) {
                Some(r) if r.format != 0 && (r.width, r.height) == size => {}
                _ => return ffi::FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
            }
        }
        ffi::FRAMEBUFFER_COMPLETE
    }

    /// Window-space positions of the vertices referenced by `count` indices at `offset`
    fn assemble(&self, count: GLint, offset: usize) -> Option<Vec<[f64; 2]>> {
        let indices = self.buffers.get(self.bound_buffers.get(&ffi::ELEMENT_ARRAY_BUFFER)?)?;
        let attrib = self.attribs.get(&0).filter(|a| a.enabled && a.size >= 2)?;
        let vertices = self.buffers.get(&attrib.buffer)?;
        let stride = if attrib.stride == 0 {
            4 * attrib.size as usize
        } else {
            attrib.stride as usize
        };
        let float = |at: usize| -> Option<f32> {
            let bytes = vertices.get(at..at + 4)?;
            Some(f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        };

        let [vx, vy, vw, vh] = self.viewport.map(f64::from);
        let end = offset + 2 * count.max(0) as usize;
        indices
            .get(offset..end)?
            .chunks_exact(2)
            .map(|index| {
                let index = u16::from_ne_bytes([index[0], index[1]]) as usize;
                let at = attrib.offset + index * stride;
                let x = f64::from(float(at)?);
                let y = f64::from(float(at + 4)?);
                Some([vx + (x + 1.0) * vw / 2.0, vy + (y + 1.0) * vh / 2.0])
            })
            .collect()
    }

    fn pipeline(&self) -> Option<Pipeline> {
        let program = self.programs.get(&self.current_program).filter(|p| p.linked)?;
        let [vx, vy, vw, vh] = self.viewport;
        let mut clip = [vx, vy, vx + vw, vy + vh];
        if self.is_enabled(ffi::SCISSOR_TEST) {
            let [sx, sy, sw, sh] = self.scissor;
            clip = [clip[0].max(sx), clip[1].max(sy), clip[2].min(sx + sw), clip[3].min(sy + sh)];
        }
        Some(Pipeline {
            clip,
            stencil: self.is_enabled(ffi::STENCIL_TEST).then_some(StencilState {
                func: self.stencil_func.0,
                reference: self.stencil_func.1,
                mask: self.stencil_func.2,
                ops: self.stencil_op,
            }),
            blend: self.is_enabled(ffi::BLEND).then_some(BlendState {
                func: self.blend_func,
                equation: self.blend_equation,
            }),
            color_mask: self.color_mask,
            color: program.fill_color(),
        })
    }
}

impl Driver for RecordingDriver {
    fn load_functions(&mut self) -> Result<(), GlError> {
        self.record("load_functions");
        if self.failing_loads > 0 {
            self.failing_loads -= 1;
            return Err(GlError::FunctionLoad("glGetString"));
        }
        Ok(())
    }

    fn get_string(&mut self, name: GLenum) -> String {
        self.record("get_string");
        match name {
            ffi::VERSION => self.version.clone(),
            ffi::VENDOR => String::from("glstate"),
            ffi::RENDERER => String::from("RecordingDriver"),
            _ => String::new(),
        }
    }

    fn get_integer(&mut self, pname: GLenum) -> GLint {
        self.record("get_integer");
        match pname {
            ffi::FRAMEBUFFER_BINDING => self.bound_framebuffer as GLint,
            ffi::MAX_TEXTURE_SIZE => self.max_texture_size,
            _ => 0,
        }
    }

    fn get_error(&mut self) -> GLenum {
        self.record("get_error");
        std::mem::replace(&mut self.error, ffi::NO_ERROR)
    }

    fn get_shader_precision_format(&mut self, _shader_type: GLenum, precision_type: GLenum) -> GLint {
        self.record("get_shader_precision_format");
        match precision_type {
            ffi::HIGH_FLOAT => self.high_float_precision,
            _ => 10,
        }
    }

    fn enable(&mut self, cap: GLenum) {
        self.record("enable");
        self.capabilities.insert(cap);
    }

    fn disable(&mut self, cap: GLenum) {
        self.record("disable");
        self.capabilities.remove(&cap);
    }

    fn blend_func_separate(
        &mut self,
        src_rgb: GLenum,
        dst_rgb: GLenum,
        src_alpha: GLenum,
        dst_alpha: GLenum,
    ) {
        self.record("blend_func_separate");
        self.blend_func = [src_rgb, dst_rgb, src_alpha, dst_alpha];
    }

    fn blend_equation_separate(&mut self, mode_rgb: GLenum, mode_alpha: GLenum) {
        self.record("blend_equation_separate");
        self.blend_equation = [mode_rgb, mode_alpha];
    }

    fn scissor(&mut self, x: GLint, y: GLint, width: GLint, height: GLint) {
        self.record("scissor");
        self.scissor = [x, y, width, height];
    }

    fn viewport(&mut self, x: GLint, y: GLint, width: GLint, height: GLint) {
        self.record("viewport");
        self.viewport = [x, y, width, height];
    }

    fn flush(&mut self) {
        self.record("flush");
    }

    fn clear(&mut self, mask: GLenum) {
        self.record("clear");
        let Some(framebuffer) = self.framebuffers.get(&self.bound_framebuffer) else {
            return;
        };
        if mask & ffi::STENCIL_BUFFER_BIT != 0 {
            if let Some(r) = framebuffer.stencil.and_then(|r| self.renderbuffers.get_mut(&r)) {
                r.stencil.fill(0);
            }
        }
        if mask & ffi::COLOR_BUFFER_BIT != 0 {
            if let Some(t) = framebuffer.color.and_then(|t| self.textures.get_mut(&t)) {
                t.pixels.fill(0);
            }
        }
    }

    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        self.record("color_mask");
        self.color_mask = [red, green, blue, alpha];
    }

    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint) {
        self.record("stencil_func");
        self.stencil_func = (func, reference, mask);
    }

    fn stencil_op(&mut self, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
        self.record("stencil_op");
        self.stencil_op = [sfail, dpfail, dppass];
    }

    fn create_texture(&mut self) -> GLuint {
        let name = self.create("create_texture");
        if name != 0 {
            self.textures.insert(name, TextureObject::default());
        }
        name
    }

    fn active_texture(&mut self, unit: GLenum) {
        self.record("active_texture");
        self.unit_textures.insert(self.active_texture, self.bound_texture);
        self.bound_texture = self.unit_textures.get(&unit).copied().unwrap_or(0);
        self.active_texture = unit;
    }

    fn bind_texture(&mut self, _target: GLenum, texture: GLuint) {
        self.record("bind_texture");
        self.bound_texture = texture;
    }

    fn is_texture(&mut self, texture: GLuint) -> bool {
        self.record("is_texture");
        self.textures.contains_key(&texture)
    }

    fn delete_texture(&mut self, texture: GLuint) {
        self.record("delete_texture");
        if self.textures.remove(&texture).is_some() {
            for bound in self.unit_textures.values_mut().chain([&mut self.bound_texture]) {
                if *bound == texture {
                    *bound = 0;
                }
            }
        }
    }

    fn tex_parameteri(&mut self, _target: GLenum, _pname: GLenum, _param: GLint) {
        self.record("tex_parameteri");
    }

    fn pixel_storei(&mut self, _pname: GLenum, _param: GLint) {
        self.record("pixel_storei");
    }

    fn tex_image_2d(
        &mut self,
        _target: GLenum,
        _level: GLint,
        _internal_format: GLint,
        width: GLint,
        height: GLint,
        _format: GLenum,
        _type_: GLenum,
        pixels: Option<&[u8]>,
    ) {
        self.record("tex_image_2d");
        let len = 4 * width.max(0) as usize * height.max(0) as usize;
        let Some(texture) = self.textures.get_mut(&self.bound_texture) else {
            self.set_error(ffi::INVALID_OPERATION);
            return;
        };
        texture.width = width;
        texture.height = height;
        texture.pixels = match pixels {
            Some(pixels) if pixels.len() >= len => pixels[..len].to_vec(),
            _ => vec![0; len],
        };
    }

    fn tex_sub_image_2d(
        &mut self,
        _target: GLenum,
        _level: GLint,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
        _format: GLenum,
        _type_: GLenum,
        pixels: &[u8],
    ) {
        self.record("tex_sub_image_2d");
        let Some(texture) = self.textures.get_mut(&self.bound_texture) else {
            self.set_error(ffi::INVALID_OPERATION);
            return;
        };
        if x < 0
            || y < 0
            || width < 0
            || height < 0
            || x + width > texture.width
            || y + height > texture.height
        {
            self.set_error(ffi::INVALID_VALUE);
            return;
        }
        let row = 4 * width as usize;
        for (r, src) in pixels.chunks_exact(row.max(1)).take(height as usize).enumerate() {
            let start = 4 * ((y as usize + r) * texture.width as usize + x as usize);
            texture.pixels[start..start + row].copy_from_slice(&src[..row]);
        }
    }

    fn create_renderbuffer(&mut self) -> GLuint {
        let name = self.create("create_renderbuffer");
        if name != 0 {
            self.renderbuffers.insert(name, RenderbufferObject::default());
        }
        name
    }

    fn bind_renderbuffer(&mut self, _target: GLenum, renderbuffer: GLuint) {
        self.record("bind_renderbuffer");
        self.bound_renderbuffer = renderbuffer;
    }

    fn is_renderbuffer(&mut self, renderbuffer: GLuint) -> bool {
        self.record("is_renderbuffer");
        self.renderbuffers.contains_key(&renderbuffer)
    }

    fn delete_renderbuffer(&mut self, renderbuffer: GLuint) {
        self.record("delete_renderbuffer");
        if self.renderbuffers.remove(&renderbuffer).is_some() && self.bound_renderbuffer == renderbuffer {
            self.bound_renderbuffer = 0;
        }
    }

    fn renderbuffer_storage(
        &mut self,
        _target: GLenum,
        internal_format: GLenum,
        width: GLint,
        height: GLint,
    ) {
        self.record("renderbuffer_storage");
        let Some(renderbuffer) = self.renderbuffers.get_mut(&self.bound_renderbuffer) else {
            self.set_error(ffi::INVALID_OPERATION);
            return;
        };
        renderbuffer.format = internal_format;
        renderbuffer.width = width;
        renderbuffer.height = height;
        renderbuffer.stencil = vec![0; width.max(0) as usize * height.max(0) as usize];
    }

    fn create_framebuffer(&mut self) -> GLuint {
        let name = self.create("create_framebuffer");
        if name != 0 {
            self.framebuffers.insert(name, FramebufferObject::default());
        }
        name
    }

    fn bind_framebuffer(&mut self, _target: GLenum, framebuffer: GLuint) {
        self.record("bind_framebuffer");
        self.bound_framebuffer = framebuffer;
    }

    fn is_framebuffer(&mut self, framebuffer: GLuint) -> bool {
        self.record("is_framebuffer");
        self.framebuffers.contains_key(&framebuffer)
    }

    fn delete_framebuffer(&mut self, framebuffer: GLuint) {
        self.record("delete_framebuffer");
        if self.framebuffers.remove(&framebuffer).is_some() && self.bound_framebuffer == framebuffer {
            self.bound_framebuffer = 0;
        }
    }

    fn framebuffer_texture_2d(
        &mut self,
        _target: GLenum,
        attachment: GLenum,
        _tex_target: GLenum,
        texture: GLuint,
        _level: GLint,
    ) {
        self.record("framebuffer_texture_2d");
        match self.framebuffers.get_mut(&self.bound_framebuffer) {
            Some(framebuffer) if attachment == ffi::COLOR_ATTACHMENT0 => framebuffer.color = Some(texture),
            _ => self.set_error(ffi::INVALID_OPERATION),
        }
    }

    fn framebuffer_renderbuffer(
        &mut self,
        _target: GLenum,
        attachment: GLenum,
        _rb_target: GLenum,
        renderbuffer: GLuint,
    ) {
        self.record("framebuffer_renderbuffer");
        match self.framebuffers.get_mut(&self.bound_framebuffer) {
            Some(framebuffer) if attachment == ffi::STENCIL_ATTACHMENT => {
                framebuffer.stencil = Some(renderbuffer)
            }
            _ => self.set_error(ffi::INVALID_OPERATION),
        }
    }

    fn check_framebuffer_status(&mut self, _target: GLenum) -> GLenum {
        self.record("check_framebuffer_status");
        match self.forced_status.take() {
            Some(status) => status,
            None => self.framebuffer_status(),
        }
    }

    fn read_pixels(
        &mut self,
        dst: Option<&mut [u8]>,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
        _format: GLenum,
        _type_: GLenum,
    ) {
        self.record("read_pixels");
        let (width, height) = (width.max(0), height.max(0));
        let mut pixels = vec![0; 4 * width as usize * height as usize];
        let source = self
            .framebuffers
            .get(&self.bound_framebuffer)
            .and_then(|f| f.color)
            .and_then(|t| self.textures.get(&t));
        if let Some(texture) = source {
            for row in 0..height {
                for col in 0..width {
                    let (sx, sy) = (x + col, y + row);
                    if sx < 0 || sy < 0 || sx >= texture.width || sy >= texture.height {
                        continue;
                    }
                    let from = 4 * (sy * texture.width + sx) as usize;
                    let to = 4 * (row * width + col) as usize;
                    pixels[to..to + 4].copy_from_slice(&texture.pixels[from..from + 4]);
                }
            }
        }

        let dst = match dst {
            Some(dst) => Some(dst),
            None => self.bound_buffer_mut(ffi::PIXEL_PACK_BUFFER).map(|b| b.as_mut_slice()),
        };
        match dst {
            Some(dst) if dst.len() >= pixels.len() => dst[..pixels.len()].copy_from_slice(&pixels),
            _ => self.set_error(ffi::INVALID_OPERATION),
        }
    }

    fn create_shader(&mut self, shader_type: GLenum) -> GLuint {
        let name = self.create("create_shader");
        if name != 0 {
            self.shaders.insert(
                name,
                ShaderObject {
                    kind: shader_type,
                    source: String::new(),
                    compiled: false,
                    log: String::new(),
                },
            );
        }
        name
    }

    fn shader_source(&mut self, shader: GLuint, source: &str) {
        self.record("shader_source");
        if let Some(shader) = self.shaders.get_mut(&shader) {
            shader.source = source.to_owned();
        }
    }

    fn compile_shader(&mut self, shader: GLuint) {
        self.record("compile_shader");
        let Some(shader) = self.shaders.get_mut(&shader) else {
            self.set_error(ffi::INVALID_VALUE);
            return;
        };
        let error = shader
            .source
            .lines()
            .find_map(|line| line.trim().strip_prefix("#error"));
        match error {
            Some(log) => {
                shader.compiled = false;
                shader.log = log.trim().to_owned();
            }
            None => {
                shader.compiled = true;
                shader.log.clear();
            }
        }
    }

    fn get_shaderi(&mut self, shader: GLuint, pname: GLenum) -> GLint {
        self.record("get_shaderi");
        let Some(shader) = self.shaders.get(&shader) else {
            return 0;
        };
        match pname {
            ffi::COMPILE_STATUS => shader.compiled as GLint,
            ffi::INFO_LOG_LENGTH => shader.log.len() as GLint,
            ffi::SHADER_TYPE => shader.kind as GLint,
            _ => 0,
        }
    }

    fn get_shader_info_log(&mut self, shader: GLuint) -> String {
        self.record("get_shader_info_log");
        self.shaders.get(&shader).map(|s| s.log.clone()).unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: GLuint) {
        self.record("delete_shader");
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> GLuint {
        let name = self.create("create_program");
        if name != 0 {
            self.programs.insert(name, ProgramObject::default());
        }
        name
    }

    fn attach_shader(&mut self, program: GLuint, shader: GLuint) {
        self.record("attach_shader");
        if let Some(program) = self.programs.get_mut(&program) {
            program.shaders.push(shader);
        }
    }

    fn bind_attrib_location(&mut self, program: GLuint, index: GLuint, name: &str) {
        self.record("bind_attrib_location");
        if let Some(program) = self.programs.get_mut(&program) {
            program.attrib_bindings.insert(name.to_owned(), index);
        }
    }

    fn link_program(&mut self, program: GLuint) {
        self.record("link_program");
        let Some(object) = self.programs.get(&program) else {
            self.set_error(ffi::INVALID_VALUE);
            return;
        };

        let mut vertex = Vec::new();
        let mut fragment = Vec::new();
        let mut log = None;
        for name in &object.shaders {
            match self.shaders.get(name) {
                Some(shader) if !shader.compiled => {
                    log = Some(format!("error: shader {} is not compiled", name))
                }
                Some(shader) if shader.kind == ffi::VERTEX_SHADER => vertex.push(shader.source.as_str()),
                Some(shader) => fragment.push(shader.source.as_str()),
                None => log = Some(format!("error: shader {} does not exist", name)),
            }
        }
        if log.is_none() && (vertex.is_empty() || fragment.is_empty()) {
            log = Some(String::from("error: program requires a vertex and a fragment shader"));
        }

        let mut uniforms = HashMap::new();
        for uniform in vertex
            .iter()
            .chain(fragment.iter())
            .flat_map(|source| declarations(source, &["uniform"]))
        {
            let next = uniforms.len() as GLint;
            uniforms.entry(uniform).or_insert(next);
        }

        let mut attribs = HashMap::new();
        let declared: Vec<String> = vertex
            .iter()
            .flat_map(|source| declarations(source, &["attribute", "in"]))
            .collect();
        for attrib in &declared {
            if let Some(index) = object.attrib_bindings.get(attrib) {
                attribs.insert(attrib.clone(), *index as GLint);
            }
        }
        for attrib in declared {
            if attribs.contains_key(&attrib) {
                continue;
            }
            let free = (0..).find(|i| !attribs.values().any(|used| used == i)).unwrap_or(0);
            attribs.insert(attrib, free);
        }

        let fill = fragment.iter().find_map(|source| constant_fill(source));

        let Some(object) = self.programs.get_mut(&program) else {
            return;
        };
        match log {
            Some(log) => {
                object.linked = false;
                object.log = log;
            }
            None => {
                object.linked = true;
                object.log.clear();
                object.uniforms = uniforms;
                object.attribs = attribs;
                object.values.clear();
                object.fill = fill;
            }
        }
    }

    fn get_programi(&mut self, program: GLuint, pname: GLenum) -> GLint {
        self.record("get_programi");
        let Some(program) = self.programs.get(&program) else {
            return 0;
        };
        match pname {
            ffi::LINK_STATUS => program.linked as GLint,
            ffi::INFO_LOG_LENGTH => program.log.len() as GLint,
            _ => 0,
        }
    }

    fn get_program_info_log(&mut self, program: GLuint) -> String {
        self.record("get_program_info_log");
        self.programs.get(&program).map(|p| p.log.clone()).unwrap_or_default()
    }

    fn use_program(&mut self, program: GLuint) {
        self.record("use_program");
        self.current_program = program;
    }

    fn is_program(&mut self, program: GLuint) -> bool {
        self.record("is_program");
        self.programs.contains_key(&program)
    }

    fn delete_program(&mut self, program: GLuint) {
        self.record("delete_program");
        self.programs.remove(&program);
    }

    fn get_uniform_location(&mut self, program: GLuint, name: &str) -> GLint {
        self.record("get_uniform_location");
        self.programs
            .get(&program)
            .and_then(|p| p.uniforms.get(name))
            .copied()
            .unwrap_or(-1)
    }

    fn get_attrib_location(&mut self, program: GLuint, name: &str) -> GLint {
        self.record("get_attrib_location");
        self.programs
            .get(&program)
            .and_then(|p| p.attribs.get(name))
            .copied()
            .unwrap_or(-1)
    }

    fn uniform_1i(&mut self, location: GLint, v: GLint) {
        self.upload_uniform("uniform_1i", location, vec![v as u32]);
    }

    fn uniform_1iv(&mut self, location: GLint, v: &[i32]) {
        self.upload_uniform("uniform_1iv", location, v.iter().map(|i| *i as u32).collect());
    }

    fn uniform_1fv(&mut self, location: GLint, v: &[f32]) {
        self.upload_floats("uniform_1fv", location, v);
    }

    fn uniform_2fv(&mut self, location: GLint, v: &[f32]) {
        self.upload_floats("uniform_2fv", location, v);
    }

    fn uniform_3fv(&mut self, location: GLint, v: &[f32]) {
        self.upload_floats("uniform_3fv", location, v);
    }

    fn uniform_4fv(&mut self, location: GLint, v: &[f32]) {
        self.upload_floats("uniform_4fv", location, v);
    }

    fn uniform_matrix_2fv(&mut self, location: GLint, v: &[f32]) {
        self.upload_floats("uniform_matrix_2fv", location, v);
    }

    fn uniform_matrix_3fv(&mut self, location: GLint, v: &[f32]) {
        self.upload_floats("uniform_matrix_3fv", location, v);
    }

    fn uniform_matrix_4fv(&mut self, location: GLint, v: &[f32]) {
        self.upload_floats("uniform_matrix_4fv", location, v);
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: GLuint,
        size: GLint,
        _type_: GLenum,
        _normalized: bool,
        stride: GLint,
        offset: usize,
    ) {
        self.record("vertex_attrib_pointer");
        let buffer = self.bound_buffer(ffi::ARRAY_BUFFER);
        let attrib = self.attribs.entry(index).or_default();
        attrib.buffer = buffer;
        attrib.size = size;
        attrib.stride = stride;
        attrib.offset = offset;
    }

    fn enable_vertex_attrib_array(&mut self, index: GLuint) {
        self.record("enable_vertex_attrib_array");
        self.attribs.entry(index).or_default().enabled = true;
    }

    fn disable_vertex_attrib_array(&mut self, index: GLuint) {
        self.record("disable_vertex_attrib_array");
        self.attribs.entry(index).or_default().enabled = false;
    }

    fn create_buffer(&mut self) -> GLuint {
        let name = self.create("create_buffer");
        if name != 0 {
            self.buffers.insert(name, Vec::new());
        }
        name
    }

    fn bind_buffer(&mut self, target: GLenum, buffer: GLuint) {
        self.record("bind_buffer");
        self.bound_buffers.insert(target, buffer);
    }

    fn buffer_init(&mut self, target: GLenum, size: usize, _usage: GLenum) {
        self.record("buffer_init");
        match self.bound_buffer_mut(target) {
            Some(buffer) => *buffer = vec![0; size],
            None => self.set_error(ffi::INVALID_OPERATION),
        }
    }

    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]) {
        self.record("buffer_sub_data");
        match self.bound_buffer_mut(target) {
            Some(buffer) if offset + data.len() <= buffer.len() => {
                buffer[offset..offset + data.len()].copy_from_slice(data)
            }
            _ => self.set_error(ffi::INVALID_VALUE),
        }
    }

    fn get_buffer_size(&mut self, target: GLenum) -> usize {
        self.record("get_buffer_size");
        match self.bound_buffer_mut(target) {
            Some(buffer) => buffer.len(),
            None => {
                self.set_error(ffi::INVALID_OPERATION);
                0
            }
        }
    }

    fn get_buffer_sub_data(&mut self, target: GLenum, offset: usize, dst: &mut [u8]) -> Result<(), GlError> {
        self.record("get_buffer_sub_data");
        if std::mem::take(&mut self.fail_next_map) {
            self.set_error(ffi::OUT_OF_MEMORY);
            return Err(GlError::MapBuffer(ffi::OUT_OF_MEMORY));
        }
        match self.bound_buffer_mut(target) {
            Some(buffer) if offset + dst.len() <= buffer.len() => {
                dst.copy_from_slice(&buffer[offset..offset + dst.len()]);
                Ok(())
            }
            _ => {
                self.set_error(ffi::INVALID_VALUE);
                Err(GlError::MapBuffer(ffi::INVALID_VALUE))
            }
        }
    }

    fn delete_buffer(&mut self, buffer: GLuint) {
        self.record("delete_buffer");
        if self.buffers.remove(&buffer).is_some() {
            self.bound_buffers.retain(|_, bound| *bound != buffer);
        }
    }

    fn draw_elements(&mut self, mode: GLenum, count: GLint, type_: GLenum, offset: usize) {
        self.record("draw_elements");
        if mode != ffi::TRIANGLES || type_ != ffi::UNSIGNED_SHORT {
            self.set_error(ffi::INVALID_ENUM);
            return;
        }
        let (Some(vertices), Some(pipeline)) = (self.assemble(count, offset), self.pipeline()) else {
            self.set_error(ffi::INVALID_OPERATION);
            return;
        };
        let Some(framebuffer) = self.framebuffers.get(&self.bound_framebuffer) else {
            return;
        };
        let (color, stencil) = (framebuffer.color, framebuffer.stencil);
        let Some(texture) = color.and_then(|t| self.textures.get_mut(&t)) else {
            return;
        };
        let stencil = stencil
            .and_then(|r| self.renderbuffers.get_mut(&r))
            .filter(|r| (r.width, r.height) == (texture.width, texture.height))
            .map(|r| r.stencil.as_mut_slice());

        trace!(triangles = vertices.len() / 3, "Rasterizing");
        let mut target = Target {
            width: texture.width,
            height: texture.height,
            color: &mut texture.pixels,
            stencil,
        };
        for triangle in vertices.chunks_exact(3) {
            raster::triangle(&mut target, &pipeline, [triangle[0], triangle[1], triangle[2]]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_strip_qualifiers_and_arrays() {
        let source = "precision mediump float;
uniform highp vec4 color;
uniform vec2 offsets[3];
attribute vec2 position;";
        assert_eq!(declarations(source, &["uniform"]), ["color", "offsets"]);
        assert_eq!(declarations(source, &["attribute"]), ["position"]);
    }

    #[test]
    fn constant_fill_reads_vec4_literals() {
        assert_eq!(
            constant_fill("void main() {\n  gl_FragColor = vec4(1.0, 0.5, 0.0, 1.0);\n}"),
            Some([1.0, 0.5, 0.0, 1.0])
        );
        assert_eq!(constant_fill("gl_FragColor = vec4(v_color);"), None);
    }

    #[test]
    fn failed_creates_affect_a_single_call() {
        let mut driver = RecordingDriver::new();
        driver.fail_next_create();
        assert_eq!(driver.create_buffer(), 0);
        assert_ne!(driver.create_buffer(), 0);
        assert_eq!(driver.count("create_buffer"), 2);
    }

    #[test]
    fn errors_are_reported_once() {
        let mut driver = RecordingDriver::new();
        driver.tex_sub_image_2d(ffi::TEXTURE_2D, 0, 0, 0, 1, 1, ffi::RGBA, ffi::UNSIGNED_BYTE, &[0; 4]);
        assert_eq!(driver.get_error(), ffi::INVALID_OPERATION);
        assert_eq!(driver.get_error(), ffi::NO_ERROR);
    }

    #[test]
    fn uploaded_color_uniform_overrides_the_constant_fill() {
        let mut driver = RecordingDriver::new();
        let program = driver.linked_program("uniform vec4 color;\ngl_FragColor = vec4(1.0, 1.0, 1.0, 1.0);");
        driver.use_program(program.0);
        let location = driver.get_uniform_location(program.0, "color");
        driver.uniform_4fv(location, &[0.0, 0.25, 0.5, 1.0]);
        assert_eq!(driver.programs[&program.0].fill_color(), [0.0, 0.25, 0.5, 1.0]);
    }
}
