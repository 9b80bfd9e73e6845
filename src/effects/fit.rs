use crate::effects::transitions::CompositeOp;
use crate::foundation::core::{Affine, Canvas, Rect};

/// Scale factor that makes a `width x height` asset fill `canvas` with no margins.
pub fn cover_scale(canvas: Canvas, width: u32, height: u32) -> f64 {
    let sx = f64::from(canvas.width) / f64::from(width.max(1));
    let sy = f64::from(canvas.height) / f64::from(height.max(1));
    sx.max(sy)
}

/// Centered destination rectangle of a cover-fit asset. It may extend past the canvas.
pub fn cover_rect(canvas: Canvas, width: u32, height: u32) -> Rect {
    let s = cover_scale(canvas, width, height);
    let w = f64::from(width) * s;
    let h = f64::from(height) * s;
    let x0 = (f64::from(canvas.width) - w) / 2.0;
    let y0 = (f64::from(canvas.height) - h) / 2.0;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

/// Map from asset pixel space to surface pixel space: cover fit, then the op's scale about the
/// surface center, then its horizontal offset.
pub fn placement(canvas: Canvas, width: u32, height: u32, op: CompositeOp) -> Affine {
    let rect = cover_rect(canvas, width, height);
    let fit = Affine::translate((rect.x0, rect.y0))
        * Affine::scale(cover_scale(canvas, width, height));
    Affine::translate((op.translate_x, 0.0)) * Affine::scale_about(op.scale, canvas.center()) * fit
}

#[cfg(test)]
#[path = "../../tests/unit/effects/fit.rs"]
mod tests;
