use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Radial distance bands
// ---------------------------------------------------------------------------

/// Assigns points to radial distance bands.
///
/// A point goes to the first band whose upper bound is strictly greater than
/// its distance from the sensor origin. The last band is open-ended: its
/// configured bound is never compared against, so every point gets a band.
#[derive(Debug, Clone)]
pub struct DistanceBinner {
    upper_bounds: Vec<f64>,
}

impl DistanceBinner {
    /// `upper_bounds` must be non-empty and strictly ascending.
    pub fn new(upper_bounds: Vec<f64>) -> Result<Self, ConfigError> {
        if upper_bounds.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one distance band is required".into(),
            ));
        }
        if upper_bounds.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(ConfigError::Invalid(format!(
                "band upper bounds must be strictly ascending, got {upper_bounds:?}"
            )));
        }
        Ok(DistanceBinner { upper_bounds })
    }

    pub fn band_count(&self) -> usize {
        self.upper_bounds.len()
    }

    /// Band of a single distance.
    pub fn band_of(&self, distance: f64) -> usize {
        let last = self.upper_bounds.len().saturating_sub(1);
        self.upper_bounds[..last]
            .iter()
            .position(|&ub| distance < ub)
            .unwrap_or(last)
    }

    /// Band of every point, written into `out` (cleared first).
    pub fn assign_into(&self, points: &[[f32; 4]], out: &mut Vec<usize>) {
        out.clear();
        out.extend(points.iter().map(|p| self.band_of(radial_distance(p))));
    }

    pub fn assign(&self, points: &[[f32; 4]]) -> Vec<usize> {
        let mut out = Vec::with_capacity(points.len());
        self.assign_into(points, &mut out);
        out
    }
}

/// Euclidean distance of a point from the origin.
pub fn radial_distance(p: &[f32; 4]) -> f64 {
    let (x, y, z) = (p[0] as f64, p[1] as f64, p[2] as f64);
    (x * x + y * y + z * z).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binner() -> DistanceBinner {
        DistanceBinner::new(vec![10.0, 20.0, 30.0, 40.0, 50.0]).unwrap()
    }

    #[test]
    fn test_band_edges() {
        let b = binner();
        assert_eq!(b.band_of(0.0), 0);
        assert_eq!(b.band_of(9.999), 0);
        assert_eq!(b.band_of(10.0), 1);
        assert_eq!(b.band_of(39.9), 3);
        assert_eq!(b.band_of(40.0), 4);
    }

    #[test]
    fn test_last_band_is_open_ended() {
        let b = binner();
        assert_eq!(b.band_of(50.0), 4);
        assert_eq!(b.band_of(1.0e6), 4);
    }

    #[test]
    fn test_assign_uses_3d_distance() {
        let b = binner();
        let points = [[3.0, 4.0, 0.0, 0.1], [6.0, 8.0, 0.0, 0.1], [0.0, 0.0, -25.0, 0.9]];
        // distances 5, 10, 25
        assert_eq!(b.assign(&points), vec![0, 1, 2]);
    }

    #[test]
    fn test_single_band_takes_everything() {
        let b = DistanceBinner::new(vec![1.0]).unwrap();
        assert_eq!(b.band_count(), 1);
        assert_eq!(b.band_of(0.5), 0);
        assert_eq!(b.band_of(500.0), 0);
    }

    #[test]
    fn test_rejects_unusable_bounds() {
        assert!(matches!(DistanceBinner::new(vec![]), Err(ConfigError::Invalid(_))));
        assert!(matches!(
            DistanceBinner::new(vec![10.0, 10.0, 30.0]),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            DistanceBinner::new(vec![f64::NAN, 10.0]),
            Err(ConfigError::Invalid(_))
        ));
    }
}
