// Grid helpers shared by nuclide data and majorant tables

/// Index `i` of the interval `[x[i], x[i+1])` that holds `x_new`.
/// Values below the grid map to 0, values at or above the last point map to
/// the last interval.
pub fn lower_index(x: &[f64], x_new: f64) -> usize {
    if x.len() < 2 || x_new <= x[0] {
        return 0;
    }
    if x_new >= x[x.len() - 1] {
        return x.len() - 2;
    }

    // Binary search for interval: find largest i with x[i] <= x_new
    let mut low = 0usize;
    let mut high = x.len() - 1;
    while high - low > 1 {
        let mid = (low + high) >> 1;
        if x[mid] <= x_new {
            low = mid;
        } else {
            high = mid;
        }
    }
    low
}

/// Linear interpolation using a precomputed interval index.
/// Outside the grid the end values are held constant.
pub fn interpolate_at(x: &[f64], y: &[f64], idx: usize, x_new: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    if x.len() == 1 || x_new <= x[0] {
        return y[0];
    }
    if x_new >= x[x.len() - 1] {
        return y[y.len() - 1];
    }
    let x1 = x[idx];
    let x2 = x[idx + 1];
    let y1 = y[idx];
    let y2 = y[idx + 1];
    y1 + (x_new - x1) * (y2 - y1) / (x2 - x1)
}

/// Linear interpolation on a linear scale.
///
/// If `x_new` is outside the range of `x`, returns the first or last y value.
pub fn interpolate_linear(x: &[f64], y: &[f64], x_new: f64) -> f64 {
    interpolate_at(x, y, lower_index(x, x_new), x_new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_index() {
        let x = [1.0, 2.0, 4.0, 8.0];
        assert_eq!(lower_index(&x, 0.5), 0);
        assert_eq!(lower_index(&x, 1.0), 0);
        assert_eq!(lower_index(&x, 2.0), 1);
        assert_eq!(lower_index(&x, 3.9), 1);
        assert_eq!(lower_index(&x, 7.0), 2);
        assert_eq!(lower_index(&x, 100.0), 2);
    }

    #[test]
    fn test_interpolate_linear() {
        let x = [0.0, 1.0, 3.0];
        let y = [0.0, 10.0, 30.0];
        assert_eq!(interpolate_linear(&x, &y, 0.5), 5.0);
        assert_eq!(interpolate_linear(&x, &y, 2.0), 20.0);
        assert_eq!(interpolate_linear(&x, &y, -1.0), 0.0);
        assert_eq!(interpolate_linear(&x, &y, 10.0), 30.0);
    }

    #[test]
    fn test_interpolate_single_point() {
        assert_eq!(interpolate_linear(&[2.0], &[7.0], 5.0), 7.0);
        assert!(interpolate_linear(&[], &[], 5.0).is_nan());
    }
}
