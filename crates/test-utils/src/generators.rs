//! Synthetic band data with predictable patterns.
//!
//! All grids are row-major `Vec<f64>` of `width * height` values.

/// Each cell is `col * 1000 + row`, so `grid[row * width + col]` is easy to
/// verify after reshaping or cropping.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// Sequential values `start, start + 1, ...` in row-major order.
pub fn create_sequential_grid(width: usize, height: usize, start: f64) -> Vec<f64> {
    (0..width * height).map(|i| start + i as f64).collect()
}

/// A diagonal ramp from 0.0 (top-left) to 1.0 (bottom-right) with every
/// `step`-th cell replaced by NaN.
pub fn create_grid_with_nans(width: usize, height: usize, step: usize) -> Vec<f64> {
    let step = step.max(1);
    let span = (width + height).saturating_sub(2).max(1) as f64;
    (0..width * height)
        .map(|i| {
            if i % step == 0 {
                f64::NAN
            } else {
                (i / width + i % width) as f64 / span
            }
        })
        .collect()
}

/// Three 0..=255 bands: red ramps left to right, green top to bottom,
/// blue is constant 128.
pub fn create_rgb_bands(width: usize, height: usize) -> [Vec<f64>; 3] {
    let scale = |i: usize, n: usize| (i * 255 / n.saturating_sub(1).max(1)) as f64;
    let mut r = Vec::with_capacity(width * height);
    let mut g = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            r.push(scale(col, width));
            g.push(scale(row, height));
        }
    }
    [r, g, vec![128.0; width * height]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(10, 5);
        assert_eq!(grid[2 * 10 + 3], 3002.0);
    }

    #[test]
    fn test_grid_with_nans_ramp() {
        let grid = create_grid_with_nans(4, 3, 100);
        assert!(grid[0].is_nan());
        assert_eq!(grid[11], 1.0);
    }

    #[test]
    fn test_grid_with_nans() {
        let grid = create_grid_with_nans(3, 3, 4);
        assert!(grid[0].is_nan());
        assert!(grid[4].is_nan());
        assert!(!grid[1].is_nan());
    }

    #[test]
    fn test_rgb_bands() {
        let [r, g, b] = create_rgb_bands(2, 2);
        assert_eq!(r, vec![0.0, 255.0, 0.0, 255.0]);
        assert_eq!(g, vec![0.0, 0.0, 255.0, 255.0]);
        assert!(b.iter().all(|v| *v == 128.0));
    }
}
