//! Smooth pan-and-zoom interpolation between two view windows.
//!
//! Van Wijk and Nuij's optimal path with curvature ρ = √2: the camera pulls
//! back while panning so apparent motion stays uniform.

use crate::layout::LayoutRecord;

const RHO: f64 = std::f64::consts::SQRT_2;
const RHO2: f64 = 2.0;
const RHO4: f64 = 4.0;
const EPSILON2: f64 = 1e-12;

/// Visible square of layout space: center plus edge length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewWindow {
    pub cx: f64,
    pub cy: f64,
    pub diameter: f64,
}

impl ViewWindow {
    pub fn new(cx: f64, cy: f64, diameter: f64) -> Self {
        Self { cx, cy, diameter }
    }

    /// Window centered on `record`, `overscan` times its radius wide.
    pub fn around(record: &LayoutRecord, overscan: f64) -> Self {
        Self::new(record.x, record.y, record.radius * overscan)
    }

    /// Layout-to-screen scale factor for a viewport.
    pub fn scale(&self, width: f64, height: f64, fit_margin: f64) -> f64 {
        if self.diameter <= 0.0 {
            return 1.0;
        }
        (width / self.diameter).min(height / self.diameter) * fit_margin
    }

    /// Maps a layout point to screen offsets from the viewport center.
    pub fn project(&self, x: f64, y: f64, scale: f64) -> (f64, f64) {
        ((x - self.cx) * scale, (y - self.cy) * scale)
    }

    /// Inverse of [`ViewWindow::project`].
    pub fn unproject(&self, screen_x: f64, screen_y: f64, scale: f64) -> (f64, f64) {
        if scale == 0.0 {
            return (self.cx, self.cy);
        }
        (self.cx + screen_x / scale, self.cy + screen_y / scale)
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        let tolerance = 1e-9 * self.diameter.abs().max(other.diameter.abs()).max(1.0);
        (self.cx - other.cx).abs() <= tolerance
            && (self.cy - other.cy).abs() <= tolerance
            && (self.diameter - other.diameter).abs() <= tolerance
    }
}

/// Precomputed zoom path from one window to another.
#[derive(Debug, Clone, Copy)]
pub struct ZoomPath {
    from: ViewWindow,
    to: ViewWindow,
    shape: PathShape,
}

#[derive(Debug, Clone, Copy)]
enum PathShape {
    /// Centers coincide: pure exponential zoom.
    ZoomOnly { s: f64 },
    General { d1: f64, r0: f64, s: f64 },
}

impl ZoomPath {
    pub fn new(from: ViewWindow, to: ViewWindow) -> Self {
        let dx = to.cx - from.cx;
        let dy = to.cy - from.cy;
        let d2 = dx * dx + dy * dy;
        let w0 = from.diameter.max(f64::MIN_POSITIVE);
        let w1 = to.diameter.max(f64::MIN_POSITIVE);

        let shape = if d2 < EPSILON2 {
            PathShape::ZoomOnly {
                s: (w1 / w0).ln() / RHO,
            }
        } else {
            let d1 = d2.sqrt();
            let b0 = (w1 * w1 - w0 * w0 + RHO4 * d2) / (2.0 * w0 * RHO2 * d1);
            let b1 = (w1 * w1 - w0 * w0 - RHO4 * d2) / (2.0 * w1 * RHO2 * d1);
            let r0 = ((b0 * b0 + 1.0).sqrt() - b0).ln();
            let r1 = ((b1 * b1 + 1.0).sqrt() - b1).ln();
            PathShape::General {
                d1,
                r0,
                s: (r1 - r0) / RHO,
            }
        };
        Self { from, to, shape }
    }

    pub fn from(&self) -> ViewWindow {
        self.from
    }

    pub fn to(&self) -> ViewWindow {
        self.to
    }

    /// Window at parameter `t` in `[0, 1]`; endpoints are exact.
    pub fn at(&self, t: f64) -> ViewWindow {
        if t <= 0.0 {
            return self.from;
        }
        if t >= 1.0 {
            return self.to;
        }
        let ViewWindow {
            cx: ux0,
            cy: uy0,
            diameter: w0,
        } = self.from;
        let dx = self.to.cx - ux0;
        let dy = self.to.cy - uy0;
        match self.shape {
            PathShape::ZoomOnly { s } => ViewWindow::new(
                ux0 + t * dx,
                uy0 + t * dy,
                w0 * (RHO * t * s).exp(),
            ),
            PathShape::General { d1, r0, s } => {
                let arc = t * s;
                let coshr0 = r0.cosh();
                let u = w0 / (RHO2 * d1) * (coshr0 * (RHO * arc + r0).tanh() - r0.sinh());
                ViewWindow::new(
                    ux0 + u * dx,
                    uy0 + u * dy,
                    w0 * coshr0 / (RHO * arc + r0).cosh(),
                )
            }
        }
    }
}

/// Cubic ease-in-out on `[0, 1]`.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::{ease_cubic_in_out, ViewWindow, ZoomPath};

    #[test]
    fn path_endpoints_are_exact() {
        let from = ViewWindow::new(0.0, 0.0, 600.0);
        let to = ViewWindow::new(120.0, -40.0, 90.0);
        let path = ZoomPath::new(from, to);
        assert_eq!(path.at(0.0), from);
        assert_eq!(path.at(1.0), to);
    }

    #[test]
    fn path_is_continuous_near_the_end() {
        let from = ViewWindow::new(0.0, 0.0, 600.0);
        let to = ViewWindow::new(120.0, -40.0, 90.0);
        let path = ZoomPath::new(from, to);
        let near = path.at(1.0 - 1e-9);
        assert!((near.cx - to.cx).abs() < 1e-4);
        assert!((near.cy - to.cy).abs() < 1e-4);
        assert!((near.diameter - to.diameter).abs() < 1e-4);
    }

    #[test]
    fn panning_between_equal_windows_zooms_out_midway() {
        let from = ViewWindow::new(0.0, 0.0, 100.0);
        let to = ViewWindow::new(500.0, 0.0, 100.0);
        let mid = ZoomPath::new(from, to).at(0.5);
        assert!(mid.diameter > 100.0);
        assert!((mid.cx - 250.0).abs() < 1e-6);
    }

    #[test]
    fn zoom_only_path_scales_geometrically() {
        let from = ViewWindow::new(10.0, 10.0, 100.0);
        let to = ViewWindow::new(10.0, 10.0, 400.0);
        let mid = ZoomPath::new(from, to).at(0.5);
        assert!((mid.diameter - 200.0).abs() < 1e-9);
        assert_eq!((mid.cx, mid.cy), (10.0, 10.0));
    }

    #[test]
    fn easing_is_symmetric_and_pinned() {
        assert_eq!(ease_cubic_in_out(0.0), 0.0);
        assert_eq!(ease_cubic_in_out(1.0), 1.0);
        assert!((ease_cubic_in_out(0.5) - 0.5).abs() < 1e-12);
        let a = ease_cubic_in_out(0.2);
        let b = ease_cubic_in_out(0.8);
        assert!((a + b - 1.0).abs() < 1e-12);
    }

    #[test]
    fn projection_round_trips_through_the_same_scale() {
        let view = ViewWindow::new(30.0, -12.0, 210.0);
        let k = view.scale(800.0, 600.0, 0.95);
        let (sx, sy) = view.project(55.0, 7.0, k);
        let (x, y) = view.unproject(sx, sy, k);
        assert!((x - 55.0).abs() < 1e-9 && (y - 7.0).abs() < 1e-9);
    }
}
