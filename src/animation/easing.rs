use serde::{Deserialize, Serialize};

const NEWTON_ITERATIONS: usize = 8;
const NEWTON_EPSILON: f32 = 1e-6;
const BISECTION_ITERATIONS: usize = 32;

/// Cubic-Bezier easing curve through (0,0), (x1,y1), (x2,y2), (1,1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl CubicBezier {
    pub const LINEAR: CubicBezier = CubicBezier::new(0.0, 0.0, 1.0, 1.0);
    pub const EASE_IN: CubicBezier = CubicBezier::new(0.42, 0.0, 1.0, 1.0);
    pub const EASE_OUT: CubicBezier = CubicBezier::new(0.0, 0.0, 0.58, 1.0);
    pub const EASE_IN_OUT: CubicBezier = CubicBezier::new(0.42, 0.0, 0.58, 1.0);

    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Look up a preset by its kebab-case name.
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Self::LINEAR),
            "ease-in" => Some(Self::EASE_IN),
            "ease-out" => Some(Self::EASE_OUT),
            "ease-in-out" => Some(Self::EASE_IN_OUT),
            _ => None,
        }
    }

    /// Eased progress for linear progress `t` in `[0, 1]`.
    pub fn sample(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        if *self == Self::LINEAR || t == 0.0 || t == 1.0 {
            return t;
        }
        let s = self.solve_x(t);
        bezier(self.y1, self.y2, s)
    }

    /// Curve parameter whose x-coordinate is `x`.
    fn solve_x(&self, x: f32) -> f32 {
        let mut s = x;
        for _ in 0..NEWTON_ITERATIONS {
            let err = bezier(self.x1, self.x2, s) - x;
            if err.abs() < NEWTON_EPSILON {
                return s;
            }
            let slope = bezier_slope(self.x1, self.x2, s);
            if slope.abs() < NEWTON_EPSILON {
                break;
            }
            s -= err / slope;
        }

        // Newton stalled on a flat segment; fall back to bisection.
        let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
        s = x;
        for _ in 0..BISECTION_ITERATIONS {
            let v = bezier(self.x1, self.x2, s);
            if (v - x).abs() < NEWTON_EPSILON {
                break;
            }
            if v < x {
                lo = s;
            } else {
                hi = s;
            }
            s = (lo + hi) * 0.5;
        }
        s
    }
}

impl Default for CubicBezier {
    fn default() -> Self {
        Self::LINEAR
    }
}

/// One coordinate of the curve with endpoints fixed at 0 and 1.
fn bezier(p1: f32, p2: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn bezier_slope(p1: f32, p2: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed() {
        for curve in [
            CubicBezier::LINEAR,
            CubicBezier::EASE_IN,
            CubicBezier::EASE_OUT,
            CubicBezier::EASE_IN_OUT,
        ] {
            assert_eq!(curve.sample(0.0), 0.0);
            assert_eq!(curve.sample(1.0), 1.0);
        }
    }

    #[test]
    fn ease_in_lags_and_ease_out_leads() {
        assert!(CubicBezier::EASE_IN.sample(0.5) < 0.5);
        assert!(CubicBezier::EASE_OUT.sample(0.5) > 0.5);
    }

    #[test]
    fn ease_in_out_is_symmetric() {
        let a = CubicBezier::EASE_IN_OUT.sample(0.25);
        let b = CubicBezier::EASE_IN_OUT.sample(0.75);
        assert!((a + b - 1.0).abs() < 1e-3);
    }

    #[test]
    fn sampling_is_monotonic() {
        let mut last = 0.0;
        for i in 1..=100 {
            let v = CubicBezier::EASE_IN_OUT.sample(i as f32 / 100.0);
            assert!(v >= last - 1e-5);
            last = v;
        }
    }

    #[test]
    fn presets_by_name() {
        assert_eq!(CubicBezier::named("ease-out"), Some(CubicBezier::EASE_OUT));
        assert_eq!(CubicBezier::named("bounce"), None);
    }
}
