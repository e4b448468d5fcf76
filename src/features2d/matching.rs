use crate::features2d::{DescriptorBank, DESCRIPTOR_WORDS};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A query descriptor paired with its nearest pattern descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Match {
    pub screen_idx: usize,
    pub pattern_level: usize,
    pub pattern_idx: usize,
    pub distance: u32,
}

/// Brute-force Hamming matching of a query bank against every level of the
/// trained pattern.
///
/// Each query walks all levels tracking its best and second-best distances
/// and is kept only when the best distance falls under the absolute
/// `threshold`. Ties keep the first candidate seen. `matches` is cleared
/// first and reused across frames.
pub fn match_pattern(
    query: &DescriptorBank,
    pattern_levels: &[DescriptorBank],
    threshold: u32,
    matches: &mut Vec<Match>,
) {
    matches.clear();

    #[cfg(feature = "rayon")]
    {
        let found: Vec<Option<Match>> = (0..query.len())
            .into_par_iter()
            .map(|qi| best_for_query(query, qi, pattern_levels, threshold))
            .collect();
        matches.extend(found.into_iter().flatten());
    }

    #[cfg(not(feature = "rayon"))]
    {
        for qi in 0..query.len() {
            if let Some(m) = best_for_query(query, qi, pattern_levels, threshold) {
                matches.push(m);
            }
        }
    }
}

fn best_for_query(
    query: &DescriptorBank,
    qi: usize,
    pattern_levels: &[DescriptorBank],
    threshold: u32,
) -> Option<Match> {
    let q = query.row(qi);
    let mut best = u32::MAX;
    let mut second = u32::MAX;
    let mut best_level = 0;
    let mut best_idx = 0;

    for (level, bank) in pattern_levels.iter().enumerate() {
        for (idx, row) in bank.words().chunks_exact(DESCRIPTOR_WORDS).enumerate() {
            let mut dist = 0;
            for (a, b) in q.iter().zip(row.iter()) {
                dist += (a ^ b).count_ones();
            }
            if dist < best {
                second = best;
                best = dist;
                best_level = level;
                best_idx = idx;
            } else if dist < second {
                second = dist;
            }
        }
    }

    // Only the absolute gate applies; no ratio test against the runner-up.
    debug_assert!(best <= second);

    if best < threshold {
        Some(Match {
            screen_idx: qi,
            pattern_level: best_level,
            pattern_idx: best_idx,
            distance: best,
        })
    } else {
        None
    }
}
