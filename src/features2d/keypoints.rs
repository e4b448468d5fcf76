/// A salient image location with detector score and orientation.
///
/// Coordinates are in the pixel space of the pyramid level the keypoint was
/// detected on; the pattern trainer rescales them to base-level units before
/// storing.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
    pub level: usize,
    pub angle: f32,
}

impl KeyPoint {
    #[must_use]
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self {
            x,
            y,
            score,
            level: 0,
            angle: 0.0,
        }
    }
}

/// Keep the `cap` best keypoints by score.
///
/// Ordering is total: descending score with ties resolved by discovery
/// order, so repeated runs over the same image produce the same set.
pub fn retain_best(keypoints: &mut Vec<KeyPoint>, cap: usize) {
    // Stable sort preserves discovery order within equal scores.
    keypoints.sort_by(|a, b| b.score.total_cmp(&a.score));
    keypoints.truncate(cap);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_best_orders_and_truncates() {
        let mut kps = vec![
            KeyPoint::new(0.0, 0.0, 5.0),
            KeyPoint::new(1.0, 0.0, 9.0),
            KeyPoint::new(2.0, 0.0, 1.0),
            KeyPoint::new(3.0, 0.0, 7.0),
        ];
        retain_best(&mut kps, 3);

        assert_eq!(kps.len(), 3);
        assert_eq!(kps[0].score, 9.0);
        assert_eq!(kps[1].score, 7.0);
        assert_eq!(kps[2].score, 5.0);
        for pair in kps.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_retain_best_ties_keep_discovery_order() {
        let mut kps = vec![
            KeyPoint::new(10.0, 0.0, 3.0),
            KeyPoint::new(20.0, 0.0, 3.0),
            KeyPoint::new(30.0, 0.0, 3.0),
        ];
        retain_best(&mut kps, 2);

        assert_eq!(kps.len(), 2);
        assert_eq!(kps[0].x, 10.0);
        assert_eq!(kps[1].x, 20.0);
    }

    #[test]
    fn test_retain_best_cap_larger_than_len() {
        let mut kps = vec![KeyPoint::new(0.0, 0.0, 1.0)];
        retain_best(&mut kps, 100);
        assert_eq!(kps.len(), 1);
    }
}
