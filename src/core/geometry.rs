//! Placement math for adapting an image to a print area.
//!
//! A [`DrawPlan`] describes a single canvas draw: take `source` out of the
//! input image and paint it into `dest` on a canvas of size `canvas`.

use crate::domain::model::{FitMode, Size};
use crate::utils::error::{BulkError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width as f64, size.height as f64)
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Whether this rect lies inside `bounds`, allowing for float noise.
    pub fn fits_within(&self, bounds: Size) -> bool {
        const EPS: f64 = 1e-6;
        self.x >= -EPS
            && self.y >= -EPS
            && self.x + self.width <= bounds.width as f64 + EPS
            && self.y + self.height <= bounds.height as f64 + EPS
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawPlan {
    pub canvas: Size,
    pub source: Rect,
    pub dest: Rect,
}

impl DrawPlan {
    /// True when drawing would reproduce the input pixel for pixel.
    pub fn is_identity(&self, source: Size) -> bool {
        self.canvas == source
            && self.source == Rect::full(source)
            && self.dest == Rect::full(source)
    }

    /// True when part of the canvas is left for the background.
    pub fn has_padding(&self) -> bool {
        self.dest != Rect::full(self.canvas)
    }
}

pub fn plan(source: Size, target: Size, mode: FitMode) -> Result<DrawPlan> {
    if source.is_empty() {
        return Err(BulkError::GeometryError {
            message: format!("source image has no pixels ({})", source),
        });
    }
    if mode != FitMode::Original && target.is_empty() {
        return Err(BulkError::GeometryError {
            message: format!("print area has no pixels ({})", target),
        });
    }

    let (sw, sh) = (source.width as f64, source.height as f64);
    let (tw, th) = (target.width as f64, target.height as f64);

    let plan = match mode {
        FitMode::Cover => {
            let scale = (tw / sw).max(th / sh);
            // Visible window of the source, clamped against rounding overshoot.
            let cw = (tw / scale).min(sw);
            let ch = (th / scale).min(sh);
            DrawPlan {
                canvas: target,
                source: Rect::new((sw - cw) / 2.0, (sh - ch) / 2.0, cw, ch),
                dest: Rect::full(target),
            }
        }
        FitMode::Contain => {
            let scale = (tw / sw).min(th / sh);
            let dw = (sw * scale).min(tw);
            let dh = (sh * scale).min(th);
            DrawPlan {
                canvas: target,
                source: Rect::full(source),
                dest: Rect::new((tw - dw) / 2.0, (th - dh) / 2.0, dw, dh),
            }
        }
        FitMode::Stretch => DrawPlan {
            canvas: target,
            source: Rect::full(source),
            dest: Rect::full(target),
        },
        FitMode::Original => DrawPlan {
            canvas: source,
            source: Rect::full(source),
            dest: Rect::full(source),
        },
    };

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_cover_crops_wide_image_horizontally() {
        // 2000x1000 into a 1000x1000 square: keep the centre 1000x1000.
        let p = plan(Size::new(2000, 1000), Size::new(1000, 1000), FitMode::Cover).unwrap();
        assert_eq!(p.canvas, Size::new(1000, 1000));
        assert!(approx(p.source.x, 500.0));
        assert!(approx(p.source.y, 0.0));
        assert!(approx(p.source.width, 1000.0));
        assert!(approx(p.source.height, 1000.0));
        assert_eq!(p.dest, Rect::full(Size::new(1000, 1000)));
        assert!(!p.has_padding());
    }

    #[test]
    fn test_cover_crops_tall_image_vertically() {
        // 1200x1800 (2:3) into a 3600x1800 (2:1) banner.
        let p = plan(Size::new(1200, 1800), Size::new(3600, 1800), FitMode::Cover).unwrap();
        assert!(approx(p.source.x, 0.0));
        assert!(approx(p.source.width, 1200.0));
        assert!(approx(p.source.height, 600.0));
        assert!(approx(p.source.y, 600.0));
        assert!(approx(p.source.aspect(), p.dest.aspect()));
    }

    #[test]
    fn test_contain_letterboxes() {
        // 2000x1000 into 1000x1000: full width, 500 tall, centred.
        let p = plan(Size::new(2000, 1000), Size::new(1000, 1000), FitMode::Contain).unwrap();
        assert_eq!(p.source, Rect::full(Size::new(2000, 1000)));
        assert!(approx(p.dest.x, 0.0));
        assert!(approx(p.dest.y, 250.0));
        assert!(approx(p.dest.width, 1000.0));
        assert!(approx(p.dest.height, 500.0));
        assert!(p.has_padding());
    }

    #[test]
    fn test_contain_upscales_small_image() {
        let p = plan(Size::new(100, 200), Size::new(1000, 1000), FitMode::Contain).unwrap();
        assert!(approx(p.dest.height, 1000.0));
        assert!(approx(p.dest.width, 500.0));
        assert!(approx(p.dest.x, 250.0));
    }

    #[test]
    fn test_stretch_and_original() {
        let source = Size::new(640, 480);
        let p = plan(source, Size::new(300, 900), FitMode::Stretch).unwrap();
        assert_eq!(p.source, Rect::full(source));
        assert_eq!(p.dest, Rect::full(Size::new(300, 900)));

        let p = plan(source, Size::new(300, 900), FitMode::Original).unwrap();
        assert!(p.is_identity(source));
    }

    #[test]
    fn test_same_aspect_is_plain_scale() {
        let p = plan(Size::new(400, 600), Size::new(800, 1200), FitMode::Cover).unwrap();
        assert_eq!(p.source, Rect::full(Size::new(400, 600)));
        let q = plan(Size::new(400, 600), Size::new(800, 1200), FitMode::Contain).unwrap();
        assert_eq!(q.dest, Rect::full(Size::new(800, 1200)));
    }

    #[test]
    fn test_rects_stay_in_bounds() {
        let sources = [Size::new(1, 1), Size::new(333, 777), Size::new(4096, 17)];
        let targets = [Size::new(1, 1), Size::new(4500, 5400), Size::new(13, 999)];
        for source in sources {
            for target in targets {
                for mode in [FitMode::Cover, FitMode::Contain, FitMode::Stretch] {
                    let p = plan(source, target, mode).unwrap();
                    assert!(p.source.fits_within(source), "{:?} {} {}", mode, source, target);
                    assert!(p.dest.fits_within(p.canvas), "{:?} {} {}", mode, source, target);
                }
            }
        }
    }

    #[test]
    fn test_empty_sizes_rejected() {
        assert!(plan(Size::new(0, 10), Size::new(10, 10), FitMode::Cover).is_err());
        assert!(plan(Size::new(10, 10), Size::new(10, 0), FitMode::Contain).is_err());
        assert!(plan(Size::new(10, 10), Size::new(0, 0), FitMode::Original).is_ok());
    }
}
