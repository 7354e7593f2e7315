/// Smooths a circular sequence with a triangular kernel of half-width
/// `radius` samples. Radius zero returns the input unchanged.
#[must_use]
pub fn smooth_circular(values: &[f64], radius: usize) -> Vec<f64> {
    let n = values.len();
    if radius == 0 || n < 3 {
        return values.to_vec();
    }
    // A kernel wider than the ring would count samples twice.
    let radius = radius.min((n - 1) / 2);
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let mut acc = 0.0;
        let mut weight_sum = 0.0;
        for k in 0..=2 * radius {
            #[allow(clippy::cast_precision_loss)]
            let w = (radius + 1 - k.abs_diff(radius)) as f64;
            let j = (i + n + k - radius) % n;
            acc += values[j] * w;
            weight_sum += w;
        }
        out.push(acc / weight_sum);
    }
    out
}

/// Limits the difference between neighbouring samples to `max_step`.
///
/// One forward and one backward pass clamp each sample to within
/// `max_step` of its already-limited neighbour, which bounds every linear
/// neighbour pair. A closing pass then lowers samples to the circular
/// min-plus envelope so the wrap-around pair obeys the same bound.
pub fn limit_slope(values: &mut [f64], max_step: f64) {
    let n = values.len();
    if n < 2 {
        return;
    }
    for i in 1..n {
        let prev = values[i - 1];
        values[i] = values[i].clamp(prev - max_step, prev + max_step);
    }
    for i in (0..n - 1).rev() {
        let next = values[i + 1];
        values[i] = values[i].clamp(next - max_step, next + max_step);
    }
    close_ring(values, max_step);
}

/// Lowers every sample to `min_j(values[j] + max_step * ring_distance(i, j))`.
///
/// Two laps in each direction reach every sample from every other.
fn close_ring(values: &mut [f64], max_step: f64) {
    let n = values.len();
    for k in 1..=2 * n {
        let i = k % n;
        let prev = values[(i + n - 1) % n];
        values[i] = values[i].min(prev + max_step);
    }
    for k in (0..2 * n).rev() {
        let i = k % n;
        let next = values[(i + 1) % n];
        values[i] = values[i].min(next + max_step);
    }
}
