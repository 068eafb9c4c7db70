use crate::core::geometry::DrawPlan;
use crate::utils::error::{BulkError, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Paint `plan.source` of `img` into `plan.dest` on a fresh canvas.
pub fn render(img: &DynamicImage, plan: &DrawPlan, background: Rgba<u8>) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(plan.canvas.width, plan.canvas.height, background);

    let (src_w, src_h) = (img.width(), img.height());
    let sx = (plan.source.x.round().max(0.0) as u32).min(src_w.saturating_sub(1));
    let sy = (plan.source.y.round().max(0.0) as u32).min(src_h.saturating_sub(1));
    let sw = (plan.source.width.round() as u32).clamp(1, src_w - sx);
    let sh = (plan.source.height.round() as u32).clamp(1, src_h - sy);

    let dx = plan.dest.x.round().max(0.0) as u32;
    let dy = plan.dest.y.round().max(0.0) as u32;
    let dw = (plan.dest.width.round() as u32).clamp(1, plan.canvas.width.saturating_sub(dx).max(1));
    let dh = (plan.dest.height.round() as u32).clamp(1, plan.canvas.height.saturating_sub(dy).max(1));

    let cropped = img.crop_imm(sx, sy, sw, sh);
    let scaled = if (sw, sh) == (dw, dh) {
        cropped.to_rgba8()
    } else {
        cropped.resize_exact(dw, dh, FilterType::Lanczos3).to_rgba8()
    };

    imageops::overlay(&mut canvas, &scaled, dx as i64, dy as i64);
    canvas
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}

/// Accepts `#rrggbb`, `#rrggbbaa` or `transparent`.
pub fn parse_background(value: &str) -> Result<Rgba<u8>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("transparent") {
        return Ok(TRANSPARENT);
    }

    let hex = value.strip_prefix('#').unwrap_or(value);
    let invalid = || BulkError::InvalidConfigValueError {
        field: "background".to_string(),
        value: value.to_string(),
        reason: "expected #rrggbb, #rrggbbaa or 'transparent'".to_string(),
    };

    if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
        return Err(invalid());
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}
