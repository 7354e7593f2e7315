use std::f64::consts::{PI, TAU};

/// Normalizes an angle to `[0, 2π)`.
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Normalizes an angle to `(-π, π]`.
#[must_use]
pub fn wrap_signed(angle: f64) -> f64 {
    let a = wrap_angle(angle);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

/// Shortest angular distance between two angles, in `[0, π]`.
#[must_use]
pub fn angular_distance(a: f64, b: f64) -> f64 {
    wrap_signed(a - b).abs()
}

/// Hermite smoothstep of `x` between `edge0` and `edge1`.
///
/// Returns exactly `0` at or below `edge0` and exactly `1` at or above
/// `edge1`. A degenerate range acts as a step at `edge0`.
#[must_use]
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// A counter-clockwise angular interval starting at `start` and covering
/// `width` radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularSpan {
    start: f64,
    width: f64,
}

impl AngularSpan {
    /// Creates a span from a start angle and a non-negative width.
    ///
    /// Widths of `2π` or more cover the whole circle.
    #[must_use]
    pub fn new(start: f64, width: f64) -> Self {
        Self {
            start: wrap_angle(start),
            width: width.clamp(0.0, TAU),
        }
    }

    /// The shorter arc between two angles, regardless of their order.
    #[must_use]
    pub fn from_endpoints(a: f64, b: f64) -> Self {
        let d = wrap_signed(b - a);
        if d >= 0.0 {
            Self::new(a, d)
        } else {
            Self::new(b, -d)
        }
    }

    /// The counter-clockwise arc from `start` to `end`.
    #[must_use]
    pub fn counter_clockwise(start: f64, end: f64) -> Self {
        Self::new(start, wrap_angle(end - start))
    }

    /// A zero-width span at a single angle.
    #[must_use]
    pub fn point(angle: f64) -> Self {
        Self::new(angle, 0.0)
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        wrap_angle(self.start + self.width)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Angle halfway through the span.
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        wrap_angle(self.start + self.width * 0.5)
    }

    /// Grows the span by `pad` on both sides.
    #[must_use]
    pub fn padded(&self, pad: f64) -> Self {
        let pad = pad.max(0.0);
        Self::new(self.start - pad, self.width + 2.0 * pad)
    }

    /// Returns `true` if `theta` lies in the closed span.
    #[must_use]
    pub fn contains(&self, theta: f64) -> bool {
        self.width >= TAU || wrap_angle(theta - self.start) <= self.width
    }

    /// Returns `true` if `theta` lies in `[start, end)`.
    #[must_use]
    pub fn contains_half_open(&self, theta: f64) -> bool {
        self.width >= TAU || wrap_angle(theta - self.start) < self.width
    }

    /// Angular distance from `theta` to the nearest point of the span;
    /// zero inside.
    #[must_use]
    pub fn distance_to(&self, theta: f64) -> f64 {
        if self.contains(theta) {
            return 0.0;
        }
        angular_distance(theta, self.start).min(angular_distance(theta, self.end()))
    }
}

/// Weight that suppresses a displacement near a protected span.
///
/// `0` inside the span grown by `pad`, rising with a smoothstep to `1`
/// over the next `feather` radians. Non-decreasing in the angular distance
/// from the span.
#[must_use]
pub fn lock_weight(theta: f64, span: &AngularSpan, pad: f64, feather: f64) -> f64 {
    let locked = span.padded(pad);
    let d = locked.distance_to(theta);
    if d <= 0.0 {
        return 0.0;
    }
    if feather <= 0.0 {
        return 1.0;
    }
    smoothstep(0.0, feather, d)
}
