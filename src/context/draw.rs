//! Vertex input, draw submission, stencil configuration and pixel transfer.

use tracing::{error, instrument, trace};

use super::{
    contract_violation, Buffer, ContractViolation, Framebuffer, GlError, GraphicsContext, TextureNative,
    WritePixelsArgs,
};
use crate::driver::{ffi, Driver};

/// Byte length of a tightly packed RGBA8 region
fn rgba_len(width: i32, height: i32) -> usize {
    4 * width.max(0) as usize * height.max(0) as usize
}

impl<D: Driver> GraphicsContext<D> {
    /// Sources attribute `index` from the bound array buffer as `size` floats per vertex
    pub fn vertex_attrib_pointer(&mut self, index: u32, size: i32, stride: i32, offset: usize) {
        self.driver
            .vertex_attrib_pointer(index, size, ffi::FLOAT, false, stride, offset);
    }

    /// Enables attribute `index` for draws
    pub fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.driver.enable_vertex_attrib_array(index);
    }

    /// Disables attribute `index` for draws
    pub fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.driver.disable_vertex_attrib_array(index);
    }

    /// Creates a vertex buffer of `size` bytes, leaving it bound
    pub fn new_array_buffer(&mut self, size: usize) -> Buffer {
        self.new_buffer(ffi::ARRAY_BUFFER, size, ffi::DYNAMIC_DRAW)
    }

    /// Creates an index buffer of `size` bytes, leaving it bound
    pub fn new_element_array_buffer(&mut self, size: usize) -> Buffer {
        self.new_buffer(ffi::ELEMENT_ARRAY_BUFFER, size, ffi::DYNAMIC_DRAW)
    }

    /// Creates a buffer of `size` bytes to read pixels into without stalling.
    ///
    /// See [`framebuffer_pixels_to_buffer`](Self::framebuffer_pixels_to_buffer).
    pub fn new_pixel_pack_buffer(&mut self, size: usize) -> Buffer {
        let buffer = self.new_buffer(ffi::PIXEL_PACK_BUFFER, size, ffi::STREAM_READ);
        self.driver.bind_buffer(ffi::PIXEL_PACK_BUFFER, 0);
        buffer
    }

    fn new_buffer(&mut self, target: ffi::types::GLenum, size: usize, usage: ffi::types::GLenum) -> Buffer {
        let b = self.driver.create_buffer();
        self.driver.bind_buffer(target, b);
        self.driver.buffer_init(target, size, usage);
        trace!(parent: &self.span, buffer = b, size, "Created buffer");
        Buffer(b)
    }

    /// Binds `b` as the vertex buffer
    pub fn bind_array_buffer(&mut self, b: Buffer) {
        self.driver.bind_buffer(ffi::ARRAY_BUFFER, b.0);
    }

    /// Binds `b` as the index buffer
    pub fn bind_element_array_buffer(&mut self, b: Buffer) {
        self.driver.bind_buffer(ffi::ELEMENT_ARRAY_BUFFER, b.0);
    }

    /// Replaces the start of the bound vertex buffer with `data`
    pub fn array_buffer_sub_data(&mut self, data: &[f32]) {
        self.driver
            .buffer_sub_data(ffi::ARRAY_BUFFER, 0, bytemuck::cast_slice(data));
    }

    /// Replaces the start of the bound index buffer with `data`
    pub fn element_array_buffer_sub_data(&mut self, data: &[u16]) {
        self.driver
            .buffer_sub_data(ffi::ELEMENT_ARRAY_BUFFER, 0, bytemuck::cast_slice(data));
    }

    /// Releases a buffer
    pub fn delete_buffer(&mut self, b: Buffer) {
        self.driver.delete_buffer(b.0);
    }

    /// Draws `count` indices of the bound index buffer as triangles, starting at `offset` bytes
    pub fn draw_elements(&mut self, count: i32, offset: usize) {
        self.driver
            .draw_elements(ffi::TRIANGLES, count, ffi::UNSIGNED_SHORT, offset);
    }

    /// Selects texture unit `idx` for subsequent texture binds.
    ///
    /// The cached texture binding only describes one unit, so it is forgotten when the unit
    /// changes.
    pub fn active_texture(&mut self, idx: u32) {
        if self.last_texture_unit != Some(idx) {
            self.last_texture = TextureNative(0);
            self.last_texture_unit = Some(idx);
        }
        self.driver.active_texture(ffi::TEXTURE0 + idx);
    }

    /// Submits all queued commands
    pub fn flush(&mut self) {
        self.driver.flush();
    }

    /// Uploads RGBA8 regions into `t`.
    ///
    /// # Panics
    ///
    /// A region whose payload is not exactly `4 * width * height` bytes is a
    /// [`ContractViolation`].
    #[instrument(level = "trace", parent = &self.span, skip(self, args), fields(regions = args.len()))]
    pub fn tex_sub_image_2d(&mut self, t: TextureNative, args: &[WritePixelsArgs<'_>]) {
        self.bind_texture(t);
        for a in args {
            let expected = rgba_len(a.width, a.height);
            if a.pixels.len() != expected {
                contract_violation(ContractViolation::PixelsLength {
                    expected,
                    actual: a.pixels.len(),
                });
            }
            self.driver.tex_sub_image_2d(
                ffi::TEXTURE_2D,
                0,
                a.x,
                a.y,
                a.width,
                a.height,
                ffi::RGBA,
                ffi::UNSIGNED_BYTE,
                a.pixels,
            );
        }
    }

    /// Enables the stencil test
    pub fn enable_stencil_test(&mut self) {
        self.driver.enable(ffi::STENCIL_TEST);
    }

    /// Disables the stencil test
    pub fn disable_stencil_test(&mut self) {
        self.driver.disable(ffi::STENCIL_TEST);
    }

    /// Starts accumulating coverage parity into the stencil buffer.
    ///
    /// Draws up to [`end_stencil_with_even_odd_rule`](Self::end_stencil_with_even_odd_rule)
    /// write no color, they only flip the stencil value of every fragment they cover.
    pub fn begin_stencil_with_even_odd_rule(&mut self) {
        self.driver.clear(ffi::STENCIL_BUFFER_BIT);
        self.driver.stencil_func(ffi::ALWAYS, 0x00, 0xff);
        self.driver.stencil_op(ffi::KEEP, ffi::KEEP, ffi::INVERT);
        self.driver.color_mask(false, false, false, false);
    }

    /// Restricts color writes to pixels covered an odd number of times since
    /// [`begin_stencil_with_even_odd_rule`](Self::begin_stencil_with_even_odd_rule)
    pub fn end_stencil_with_even_odd_rule(&mut self) {
        self.driver.stencil_func(ffi::NOTEQUAL, 0x00, 0xff);
        self.driver.stencil_op(ffi::KEEP, ffi::KEEP, ffi::KEEP);
        self.driver.color_mask(true, true, true, true);
    }

    /// Reads a region of `f` into `buf` as RGBA8, rows bottom to top.
    ///
    /// Blocks until all pending rendering to `f` is finished.
    #[instrument(level = "trace", parent = &self.span, skip(self, buf))]
    pub fn framebuffer_pixels(
        &mut self,
        buf: &mut [u8],
        f: &Framebuffer,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<(), GlError> {
        let expected = rgba_len(width, height);
        if buf.len() != expected {
            return Err(GlError::UnexpectedSize {
                expected,
                actual: buf.len(),
            });
        }

        self.driver.flush();
        self.bind_framebuffer(f.native);
        self.driver
            .read_pixels(Some(buf), x, y, width, height, ffi::RGBA, ffi::UNSIGNED_BYTE);
        Ok(())
    }

    /// Queues a read of the lower-left `width` x `height` pixels of `f` into `buffer`.
    ///
    /// Returns without waiting for the GPU. Fetch the result with
    /// [`pixel_pack_buffer_data`](Self::pixel_pack_buffer_data). Fails with
    /// [`GlError::UnexpectedSize`] if `buffer` is smaller than `4 * width * height` bytes.
    #[instrument(level = "trace", parent = &self.span, skip(self))]
    pub fn framebuffer_pixels_to_buffer(
        &mut self,
        f: &Framebuffer,
        buffer: Buffer,
        width: i32,
        height: i32,
    ) -> Result<(), GlError> {
        let expected = rgba_len(width, height);
        self.driver.bind_buffer(ffi::PIXEL_PACK_BUFFER, buffer.0);
        let actual = self.driver.get_buffer_size(ffi::PIXEL_PACK_BUFFER);
        if actual < expected {
            self.driver.bind_buffer(ffi::PIXEL_PACK_BUFFER, 0);
            return Err(GlError::UnexpectedSize { expected, actual });
        }

        self.driver.flush();
        self.bind_framebuffer(f.native);
        self.driver
            .read_pixels(None, 0, 0, width, height, ffi::RGBA, ffi::UNSIGNED_BYTE);
        self.driver.bind_buffer(ffi::PIXEL_PACK_BUFFER, 0);
        Ok(())
    }

    /// Copies the start of a pixel pack buffer into `dst`, waiting for pending reads into it.
    ///
    /// `dst` must not be longer than the buffer. Nothing is written to `dst` on error.
    pub fn pixel_pack_buffer_data(&mut self, buffer: Buffer, dst: &mut [u8]) -> Result<(), GlError> {
        self.driver.bind_buffer(ffi::PIXEL_PACK_BUFFER, buffer.0);
        let size = self.driver.get_buffer_size(ffi::PIXEL_PACK_BUFFER);
        let result = if dst.len() > size {
            Err(GlError::UnexpectedSize {
                expected: size,
                actual: dst.len(),
            })
        } else {
            self.driver.get_buffer_sub_data(ffi::PIXEL_PACK_BUFFER, 0, dst)
        };
        self.driver.bind_buffer(ffi::PIXEL_PACK_BUFFER, 0);
        if let Err(err) = &result {
            error!(parent: &self.span, buffer = buffer.0, "Reading pixel pack buffer failed: {}", err);
        }
        result
    }
}
