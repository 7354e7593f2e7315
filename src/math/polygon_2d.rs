use super::{cross_2d, is_finite_point, Point2, Vector2, TOLERANCE};

/// Computes the signed area of a polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Arithmetic mean of the finite vertices, or `None` if there are none.
#[must_use]
pub fn vertex_centroid(points: &[Point2]) -> Option<Point2> {
    let mut sum = Vector2::zeros();
    let mut count = 0_u32;
    for p in points.iter().filter(|p| is_finite_point(p)) {
        sum += p.coords;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(Point2::from(sum / f64::from(count)))
}

/// Cross product of the turn `prev → cur → next`.
///
/// Positive for a left (counter-clockwise) turn.
#[must_use]
pub fn turn_cross(prev: &Point2, cur: &Point2, next: &Point2) -> f64 {
    cross_2d(&(cur - prev), &(next - cur))
}

/// Unsigned angle at `cur` between the edges towards `prev` and `next`,
/// in `[0, π]`. Returns `0` for a zero-length edge.
#[must_use]
pub fn interior_angle(prev: &Point2, cur: &Point2, next: &Point2) -> f64 {
    let a = prev - cur;
    let b = next - cur;
    let la = a.norm();
    let lb = b.norm();
    if la < TOLERANCE || lb < TOLERANCE {
        return 0.0;
    }
    (a.dot(&b) / (la * lb)).clamp(-1.0, 1.0).acos()
}

/// Length of the longest axis-aligned bounding box side of the finite vertices.
#[must_use]
pub fn bounding_extent(points: &[Point2]) -> f64 {
    let mut min = Vector2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Vector2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points.iter().filter(|p| is_finite_point(p)) {
        min = min.inf(&p.coords);
        max = max.sup(&p.coords);
    }
    if min.x > max.x {
        return 0.0;
    }
    (max.x - min.x).max(max.y - min.y)
}

/// Even-odd point containment test.
#[must_use]
pub fn point_in_polygon(p: &Point2, polygon: &[Point2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Total length of a closed ring.
#[must_use]
pub fn perimeter(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| (points[(i + 1) % n] - points[i]).norm()).sum()
}

/// Closest point on a closed ring to `p`, returned as
/// `(arc_length_from_vertex_0, point, edge_index)`.
#[must_use]
pub fn project_onto_ring(p: &Point2, ring: &[Point2]) -> Option<(f64, Point2, usize)> {
    let n = ring.len();
    if n < 2 {
        return None;
    }
    let mut best: Option<(f64, f64, Point2, usize)> = None;
    let mut walked = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        let d = b - a;
        let len_sq = d.norm_squared();
        let t = if len_sq < TOLERANCE * TOLERANCE {
            0.0
        } else {
            ((p - a).dot(&d) / len_sq).clamp(0.0, 1.0)
        };
        let q = a + d * t;
        let dist_sq = (p - q).norm_squared();
        if best.is_none_or(|(bd, ..)| dist_sq < bd) {
            best = Some((dist_sq, walked + len_sq.sqrt() * t, q, i));
        }
        walked += len_sq.sqrt();
    }
    best.map(|(_, s, q, i)| (s, q, i))
}
