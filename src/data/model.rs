use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ClassPair – two distinct semantic classes, smaller id first
// ---------------------------------------------------------------------------

/// An unordered pair of semantic classes, stored with the smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassPair {
    pub first: u32,
    pub second: u32,
}

impl ClassPair {
    /// Build a pair from two distinct ids in any order.
    pub fn new(a: u32, b: u32) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(ClassPair { first: a, second: b }),
            std::cmp::Ordering::Greater => Some(ClassPair { first: b, second: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn contains(&self, class: u32) -> bool {
        self.first == class || self.second == class
    }
}

impl fmt::Display for ClassPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

// ---------------------------------------------------------------------------
// Frame – one labelled LiDAR scan
// ---------------------------------------------------------------------------

/// One scan: points as `[x, y, z, intensity]` and one semantic label per point.
///
/// The constructor enforces `points.len() == labels.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    points: Vec<[f32; 4]>,
    labels: Vec<u32>,
}

impl Frame {
    /// Returns `Err((points, labels))` with both lengths on mismatch.
    pub fn new(points: Vec<[f32; 4]>, labels: Vec<u32>) -> Result<Self, (usize, usize)> {
        if points.len() != labels.len() {
            return Err((points.len(), labels.len()));
        }
        Ok(Frame { points, labels })
    }

    pub fn points(&self) -> &[[f32; 4]] {
        &self.points
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points carrying `class`.
    pub fn count_class(&self, class: u32) -> usize {
        self.labels.iter().filter(|&&l| l == class).count()
    }

    /// Indices of all points labelled with either class of `pair`, ascending.
    pub fn indices_of_pair(&self, pair: ClassPair) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| pair.contains(l))
            .map(|(i, _)| i)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// SampleFrame – first good frame of a sequence, kept for visualization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFrame {
    /// Positions `[x, y, z]`.
    pub positions: Vec<[f32; 3]>,
    pub labels: Vec<u32>,
}

impl SampleFrame {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl From<&Frame> for SampleFrame {
    fn from(frame: &Frame) -> Self {
        SampleFrame {
            positions: frame.points.iter().map(|p| [p[0], p[1], p[2]]).collect(),
            labels: frame.labels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_pair_orders_ids() {
        let pair = ClassPair::new(48, 40).unwrap();
        assert_eq!((pair.first, pair.second), (40, 48));
        assert_eq!(pair.to_string(), "40-48");
        assert!(ClassPair::new(7, 7).is_none());
    }

    #[test]
    fn test_frame_rejects_length_mismatch() {
        let err = Frame::new(vec![[0.0; 4]; 3], vec![1, 2]).unwrap_err();
        assert_eq!(err, (3, 2));
    }

    #[test]
    fn test_indices_of_pair() {
        let frame = Frame::new(vec![[0.0; 4]; 5], vec![1, 2, 3, 2, 1]).unwrap();
        let pair = ClassPair::new(1, 2).unwrap();
        assert_eq!(frame.indices_of_pair(pair), vec![0, 1, 3, 4]);
        assert_eq!(frame.count_class(2), 2);
        assert_eq!(frame.count_class(9), 0);
    }

    #[test]
    fn test_sample_frame_drops_intensity() {
        let frame = Frame::new(vec![[1.0, 2.0, 3.0, 0.5]], vec![40]).unwrap();
        let sample = SampleFrame::from(&frame);
        assert_eq!(sample.positions, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(sample.labels, vec![40]);
    }
}
