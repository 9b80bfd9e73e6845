use rayon::prelude::*;

use crate::assets::decode::PreparedFrame;
use crate::foundation::core::{Affine, Point, Rect};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u8;

pub type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied pixels, with the source scaled by `opacity`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Draw `src` into the premultiplied `dst` buffer through `transform` (asset px to surface px).
///
/// Pixels are sampled bilinearly at their centers; rows are composited in parallel.
pub fn draw_transformed(
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
    src: &PreparedFrame,
    transform: Affine,
    opacity: f32,
) -> ReelResult<()> {
    let row_bytes = (dst_width as usize) * 4;
    if dst.len() != row_bytes * dst_height as usize {
        return Err(ReelError::validation(
            "draw_transformed expects dst matching width*height*4",
        ));
    }
    if opacity <= 0.0 || src.width == 0 || src.height == 0 {
        return Ok(());
    }
    if transform.determinant().abs() < 1e-12 {
        return Ok(());
    }
    let inv = transform.inverse();

    let bbox = transform.transform_rect_bbox(Rect::new(
        0.0,
        0.0,
        f64::from(src.width),
        f64::from(src.height),
    ));
    let y0 = bbox.y0.floor().clamp(0.0, f64::from(dst_height)) as usize;
    let y1 = bbox.y1.ceil().clamp(0.0, f64::from(dst_height)) as usize;
    let x0 = bbox.x0.floor().clamp(0.0, f64::from(dst_width)) as usize;
    let x1 = bbox.x1.ceil().clamp(0.0, f64::from(dst_width)) as usize;
    if y0 >= y1 || x0 >= x1 {
        return Ok(());
    }

    dst.par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0)
        .take(y1 - y0)
        .for_each(|(y, row)| {
            for x in x0..x1 {
                let p = inv * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let Some(s) = sample_bilinear(src, p) else {
                    continue;
                };
                let d = &mut row[x * 4..x * 4 + 4];
                let out = over([d[0], d[1], d[2], d[3]], s, opacity);
                d.copy_from_slice(&out);
            }
        });
    Ok(())
}

fn sample_bilinear(src: &PreparedFrame, p: Point) -> Option<PremulRgba8> {
    let (w, h) = (f64::from(src.width), f64::from(src.height));
    if p.x < 0.0 || p.y < 0.0 || p.x >= w || p.y >= h {
        return None;
    }
    let fx = (p.x - 0.5).clamp(0.0, w - 1.0);
    let fy = (p.y - 0.5).clamp(0.0, h - 1.0);
    let (ix, iy) = (fx.floor() as u32, fy.floor() as u32);
    let (tx, ty) = (fx - f64::from(ix), fy - f64::from(iy));
    let ix1 = (ix + 1).min(src.width - 1);
    let iy1 = (iy + 1).min(src.height - 1);

    let px = |x: u32, y: u32| -> [f64; 4] {
        let idx = ((y as usize) * (src.width as usize) + (x as usize)) * 4;
        let b = &src.rgba8_premul[idx..idx + 4];
        [
            f64::from(b[0]),
            f64::from(b[1]),
            f64::from(b[2]),
            f64::from(b[3]),
        ]
    };
    let (a, b, c, d) = (px(ix, iy), px(ix1, iy), px(ix, iy1), px(ix1, iy1));

    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = a[i] + (b[i] - a[i]) * tx;
        let bottom = c[i] + (d[i] - c[i]) * tx;
        out[i] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
