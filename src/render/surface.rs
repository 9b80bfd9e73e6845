use crate::assets::decode::PreparedFrame;
use crate::effects::composite::draw_transformed;
use crate::effects::fit::placement;
use crate::effects::transitions::CompositeOp;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u8;

/// A rendered frame in CPU memory.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

/// Raster surface owned by one capture session. Pixels are premultiplied RGBA8.
#[derive(Debug)]
pub struct Surface {
    canvas: Canvas,
    frame: FrameRGBA,
}

impl Surface {
    pub fn new(canvas: Canvas) -> ReelResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(ReelError::capture("surface width/height must be non-zero"));
        }
        let len = (canvas.width as usize)
            .checked_mul(canvas.height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| ReelError::capture("surface size overflow"))?;
        Ok(Self {
            canvas,
            frame: FrameRGBA {
                width: canvas.width,
                height: canvas.height,
                data: vec![0u8; len],
                premultiplied: true,
            },
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Fill with a straight-alpha color.
    pub fn clear(&mut self, rgba: [u8; 4]) {
        let a = u16::from(rgba[3]);
        let px = [
            mul_div255_u8(u16::from(rgba[0]), a),
            mul_div255_u8(u16::from(rgba[1]), a),
            mul_div255_u8(u16::from(rgba[2]), a),
            rgba[3],
        ];
        for d in self.frame.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }

    /// Draw `frame` cover-fit onto the surface, adjusted by `op`.
    pub fn draw(&mut self, frame: &PreparedFrame, op: CompositeOp) -> ReelResult<()> {
        let transform = placement(self.canvas, frame.width, frame.height, op);
        draw_transformed(
            &mut self.frame.data,
            self.canvas.width,
            self.canvas.height,
            frame,
            transform,
            op.opacity,
        )
    }

    pub fn frame(&self) -> &FrameRGBA {
        &self.frame
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.canvas.width || y >= self.canvas.height {
            return None;
        }
        let idx = ((y as usize) * (self.canvas.width as usize) + (x as usize)) * 4;
        let d = &self.frame.data[idx..idx + 4];
        Some([d[0], d[1], d[2], d[3]])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
