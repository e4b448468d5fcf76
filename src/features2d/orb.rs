use crate::core::rng::Lcg;
use crate::core::Mat;
use crate::error::{Error, Result};
use crate::features2d::KeyPoint;
use ndarray::Array2;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// 32-bit words per descriptor row (256 bits).
pub const DESCRIPTOR_WORDS: usize = 8;

/// Half-radius of the orientation disk and descriptor patch.
const HALF_PATCH: i32 = 15;

/// Per-row half-width of the orientation disk: index v gives the +-u bound
/// for row offset v.
const U_MAX: [i32; 16] = [15, 15, 15, 15, 14, 14, 14, 13, 13, 12, 11, 10, 9, 8, 6, 3];

/// Seed for the shared descriptor sampling pattern. Training and per-frame
/// extraction must agree on it or descriptors stop being comparable.
const PATTERN_SEED: u64 = 0x5bd1_e995;

/// Bank of 256-bit binary descriptors packed as 8 little-endian u32 words
/// per row. Row i belongs to keypoint i of the same extraction pass.
#[derive(Debug, Clone)]
pub struct DescriptorBank {
    words: Array2<u32>,
    len: usize,
}

impl DescriptorBank {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: Array2::zeros((capacity, DESCRIPTOR_WORDS)),
            len: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.words.nrows()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn push(&mut self, row: [u32; DESCRIPTOR_WORDS]) -> Result<()> {
        if self.len >= self.capacity() {
            return Err(Error::CapacityExceeded(format!(
                "descriptor bank capacity {} exceeded",
                self.capacity()
            )));
        }
        for (w, &value) in row.iter().enumerate() {
            self.words[[self.len, w]] = value;
        }
        self.len += 1;
        Ok(())
    }

    #[must_use]
    pub fn row(&self, i: usize) -> [u32; DESCRIPTOR_WORDS] {
        debug_assert!(i < self.len);
        let mut out = [0u32; DESCRIPTOR_WORDS];
        for (w, value) in out.iter_mut().enumerate() {
            *value = self.words[[i, w]];
        }
        out
    }

    /// Hamming distance between row `i` of this bank and row `j` of `other`.
    #[must_use]
    pub fn distance(&self, i: usize, other: &DescriptorBank, j: usize) -> u32 {
        let mut dist = 0;
        for w in 0..DESCRIPTOR_WORDS {
            dist += (self.words[[i, w]] ^ other.words[[j, w]]).count_ones();
        }
        dist
    }

    /// The occupied rows as one contiguous word slice, 8 words per row.
    /// Matching strides over this directly.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        let end = self.len * DESCRIPTOR_WORDS;
        self.words.as_slice().map_or(&[], |all| &all[..end])
    }
}

/// Hamming distance between two packed descriptor rows.
#[must_use]
pub fn hamming_distance(a: &[u32; DESCRIPTOR_WORDS], b: &[u32; DESCRIPTOR_WORDS]) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Oriented binary descriptor extractor.
///
/// The 256 sampling pairs are generated once from a fixed seed; every `Orb`
/// instance carries the same pattern, keeping trained and per-frame
/// descriptors comparable.
pub struct Orb {
    pattern: Vec<[i32; 4]>,
}

impl Orb {
    #[must_use]
    pub fn new() -> Self {
        let mut rng = Lcg::new(PATTERN_SEED);
        let span = u32::try_from(2 * HALF_PATCH + 1).unwrap_or(31);
        let mut pattern = Vec::with_capacity(DESCRIPTOR_WORDS * 32);
        for _ in 0..DESCRIPTOR_WORDS * 32 {
            #[allow(clippy::cast_possible_wrap)]
            let pair = [
                rng.below(span) as i32 - HALF_PATCH,
                rng.below(span) as i32 - HALF_PATCH,
                rng.below(span) as i32 - HALF_PATCH,
                rng.below(span) as i32 - HALF_PATCH,
            ];
            pattern.push(pair);
        }
        Self { pattern }
    }

    /// Intensity-centroid orientation at (x, y), in radians.
    ///
    /// Moments are taken over a disk of half-radius 15 whose per-row width
    /// follows `U_MAX`; samples beyond the image clamp to the border.
    #[must_use]
    pub fn orientation(img: &Mat, x: f32, y: f32) -> f32 {
        #[allow(clippy::cast_possible_truncation)]
        let cx = x.round() as i32;
        #[allow(clippy::cast_possible_truncation)]
        let cy = y.round() as i32;

        let mut m01 = 0i32;
        let mut m10 = 0i32;

        // Center row contributes to m10 only.
        for u in -HALF_PATCH..=HALF_PATCH {
            m10 += u * i32::from(img.pixel_clamped(cy, cx + u));
        }

        for v in 1..=HALF_PATCH {
            #[allow(clippy::cast_sign_loss)]
            let d = U_MAX[v as usize];
            for u in -d..=d {
                let below = i32::from(img.pixel_clamped(cy + v, cx + u));
                let above = i32::from(img.pixel_clamped(cy - v, cx + u));
                m10 += u * (below + above);
                m01 += v * (below - above);
            }
        }

        #[allow(clippy::cast_precision_loss)]
        (m01 as f32).atan2(m10 as f32)
    }

    /// Fill in the orientation of every keypoint from the given plane.
    pub fn compute_orientations(&self, img: &Mat, keypoints: &mut [KeyPoint]) {
        #[cfg(feature = "rayon")]
        keypoints
            .par_iter_mut()
            .for_each(|kp| kp.angle = Self::orientation(img, kp.x, kp.y));

        #[cfg(not(feature = "rayon"))]
        for kp in keypoints.iter_mut() {
            kp.angle = Self::orientation(img, kp.x, kp.y);
        }
    }

    /// Extract a descriptor row per keypoint into `bank` (cleared first).
    ///
    /// Sampling pairs are rotated by the keypoint angle; pairs falling
    /// outside the plane contribute zero bits.
    pub fn describe(&self, img: &Mat, keypoints: &[KeyPoint], bank: &mut DescriptorBank) -> Result<()> {
        if keypoints.len() > bank.capacity() {
            return Err(Error::CapacityExceeded(format!(
                "{} keypoints exceed descriptor bank capacity {}",
                keypoints.len(),
                bank.capacity()
            )));
        }

        bank.clear();

        #[cfg(feature = "rayon")]
        let rows: Vec<[u32; DESCRIPTOR_WORDS]> = keypoints
            .par_iter()
            .map(|kp| self.describe_one(img, kp))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let rows: Vec<[u32; DESCRIPTOR_WORDS]> = keypoints
            .iter()
            .map(|kp| self.describe_one(img, kp))
            .collect();

        for row in rows {
            bank.push(row)?;
        }

        Ok(())
    }

    fn describe_one(&self, img: &Mat, kp: &KeyPoint) -> [u32; DESCRIPTOR_WORDS] {
        #[allow(clippy::cast_possible_truncation)]
        let cx = kp.x.round() as i32;
        #[allow(clippy::cast_possible_truncation)]
        let cy = kp.y.round() as i32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let cols = img.cols() as i32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let rows = img.rows() as i32;

        let (sin_a, cos_a) = kp.angle.sin_cos();
        let mut words = [0u32; DESCRIPTOR_WORDS];

        for (bit, pair) in self.pattern.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let (p1x, p1y, p2x, p2y) = (
                pair[0] as f32,
                pair[1] as f32,
                pair[2] as f32,
                pair[3] as f32,
            );

            #[allow(clippy::cast_possible_truncation)]
            let x1 = cx + (p1x * cos_a - p1y * sin_a).round() as i32;
            #[allow(clippy::cast_possible_truncation)]
            let y1 = cy + (p1x * sin_a + p1y * cos_a).round() as i32;
            #[allow(clippy::cast_possible_truncation)]
            let x2 = cx + (p2x * cos_a - p2y * sin_a).round() as i32;
            #[allow(clippy::cast_possible_truncation)]
            let y2 = cy + (p2x * sin_a + p2y * cos_a).round() as i32;

            let in_bounds = x1 >= 0
                && x1 < cols
                && y1 >= 0
                && y1 < rows
                && x2 >= 0
                && x2 < cols
                && y2 >= 0
                && y2 < rows;

            if in_bounds {
                #[allow(clippy::cast_sign_loss)]
                let a = img.pixel(y1 as usize, x1 as usize);
                #[allow(clippy::cast_sign_loss)]
                let b = img.pixel(y2 as usize, x2 as usize);
                if a < b {
                    words[bit / 32] |= 1 << (bit % 32);
                }
            }
        }

        words
    }
}

impl Default for Orb {
    fn default() -> Self {
        Self::new()
    }
}
