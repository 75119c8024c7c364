//! Fixed-bin histograms and the histogram overlap ratio.

/// Index of `v` among `bins` equal bins over `[lo, hi]`, or `None` when outside.
/// The last bin is closed on the right.
fn bin_index(v: f64, bins: usize, lo: f64, hi: f64) -> Option<usize> {
    if !(v >= lo && v <= hi) {
        return None;
    }
    let idx = ((v - lo) / (hi - lo) * bins as f64) as usize;
    Some(idx.min(bins - 1))
}

/// Raw counts of `values` in `bins` equal bins over `range`. Out-of-range
/// values are dropped.
pub fn bin_counts<I>(values: I, bins: usize, range: (f64, f64)) -> Vec<u64>
where
    I: IntoIterator<Item = f64>,
{
    let mut counts = vec![0u64; bins];
    add_counts(&mut counts, values, range);
    counts
}

/// Add counts of `values` into an existing histogram.
pub fn add_counts<I>(counts: &mut [u64], values: I, range: (f64, f64))
where
    I: IntoIterator<Item = f64>,
{
    let bins = counts.len();
    if bins == 0 {
        return;
    }
    for v in values {
        if let Some(i) = bin_index(v, bins, range.0, range.1) {
            counts[i] += 1;
        }
    }
}

/// Histogram normalised to a probability density over `range`: each bin holds
/// `count / (in_range_total * bin_width)`. With no value in range every bin is 0.
pub fn density_histogram<I>(values: I, bins: usize, range: (f64, f64)) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let counts = bin_counts(values, bins, range);
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return vec![0.0; bins];
    }
    let width = (range.1 - range.0) / bins as f64;
    let norm = total as f64 * width;
    counts.iter().map(|&c| c as f64 / norm).collect()
}

/// Data-derived histogram range `(min, max)` of the finite values.
/// A degenerate range is widened by 0.5 on each side.
pub fn auto_range(values: &[f64]) -> (f64, f64) {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return (0.0, 1.0);
    }
    if min == max {
        return (min - 0.5, max + 0.5);
    }
    (min, max)
}

/// Σ min(h1, h2) / (Σ max(h1, h2) + epsilon). Lies in [0, 1] for
/// non-negative histograms.
pub fn overlap_ratio(h1: &[f64], h2: &[f64], epsilon: f64) -> f64 {
    let (num, den) = h1
        .iter()
        .zip(h2)
        .fold((0.0, 0.0), |(num, den), (&a, &b)| (num + a.min(b), den + a.max(b)));
    num / (den + epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_bin_is_closed() {
        let counts = bin_counts([0.0, 0.5, 1.0, 1.0001, -0.1], 4, (0.0, 1.0));
        assert_eq!(counts, vec![1, 0, 1, 1]);
    }

    #[test]
    fn test_density_integrates_to_one() {
        let values = [0.05, 0.1, 0.15, 0.6, 0.61, 0.99];
        let hist = density_histogram(values, 20, (0.0, 1.0));
        let integral: f64 = hist.iter().map(|d| d * (1.0 / 20.0)).sum();
        assert!((integral - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_density_of_nothing_in_range_is_zero() {
        let hist = density_histogram([2.0, 3.0], 5, (0.0, 1.0));
        assert_eq!(hist, vec![0.0; 5]);
    }

    #[test]
    fn test_auto_range() {
        assert_eq!(auto_range(&[1.0, -2.0, 3.5]), (-2.0, 3.5));
        assert_eq!(auto_range(&[4.0, 4.0]), (3.5, 4.5));
        assert_eq!(auto_range(&[]), (0.0, 1.0));
    }

    #[test]
    fn test_overlap_ratio_bounds() {
        let a = [1.0, 2.0, 0.0];
        assert!((overlap_ratio(&a, &a, 1e-10) - 1.0).abs() < 1e-9);
        assert_eq!(overlap_ratio(&[1.0, 0.0], &[0.0, 1.0], 1e-10), 0.0);
        assert_eq!(overlap_ratio(&[0.0, 0.0], &[0.0, 0.0], 1e-10), 0.0);

        let r = overlap_ratio(&[0.2, 0.8], &[0.5, 0.5], 1e-10);
        assert!(r > 0.0 && r < 1.0);
    }
}
