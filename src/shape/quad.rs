use crate::core::types::{Point2f, Quad, TransformVariant};
use crate::core::Mat3;

/// Interior-angle band for a trackable quad, in degrees.
pub const MIN_QUAD_ANGLE: f32 = 15.0;
pub const MAX_QUAD_ANGLE: f32 = 165.0;

/// Allowed deviation of the interior angle sum from 360 degrees.
const ANGLE_SUM_TOLERANCE: f32 = 5.0;

/// Project the reference rectangle (ref_w x ref_h) through a homography,
/// applying the normalized offset/scale placement first.
///
/// The placement keeps the scaled rectangle centered: a scale below one
/// shrinks it in place, the offsets then shift it in units of the reference
/// size. Corners come back ordered TL, TR, BR, BL.
#[must_use]
pub fn project_reference_corners(
    h: &Mat3,
    ref_w: f32,
    ref_h: f32,
    variant: &TransformVariant,
) -> Quad {
    let sx = variant.scale[0];
    let sy = variant.scale[1];
    let ox = variant.offset[0];
    let oy = variant.offset[1];

    let scaled_w = ref_w * sx;
    let scaled_h = ref_h * sy;
    let offset_x = ox * ref_w + (1.0 - sx) * ref_w / 2.0;
    let offset_y = oy * ref_h - (1.0 - sy) * ref_h / 2.0;

    let reference = [
        Point2f::new(offset_x, offset_y),
        Point2f::new(offset_x + scaled_w, offset_y),
        Point2f::new(offset_x + scaled_w, offset_y + scaled_h),
        Point2f::new(offset_x, offset_y + scaled_h),
    ];

    Quad::new([
        h.project(reference[0]),
        h.project(reference[1]),
        h.project(reference[2]),
        h.project(reference[3]),
    ])
}

/// Interior angles at the four vertices, in degrees. `None` when two
/// consecutive corners coincide.
#[must_use]
pub fn interior_angles(quad: &Quad) -> Option<[f32; 4]> {
    let c = &quad.corners;
    let mut angles = [0.0f32; 4];

    for i in 0..4 {
        let prev = c[(i + 3) % 4] - c[i];
        let next = c[(i + 1) % 4] - c[i];

        let norm_prev = (prev.x * prev.x + prev.y * prev.y).sqrt();
        let norm_next = (next.x * next.x + next.y * next.y).sqrt();
        if norm_prev < 1e-6 || norm_next < 1e-6 {
            return None;
        }

        let cos = ((prev.x * next.x + prev.y * next.y) / (norm_prev * norm_next)).clamp(-1.0, 1.0);
        angles[i] = cos.acos().to_degrees();
    }

    Some(angles)
}

/// A quad is valid when its interior angles sum to 360 degrees (within
/// tolerance) and each lies strictly inside the trackable band. Reflex and
/// self-crossing shapes fail the sum check.
#[must_use]
pub fn quad_is_valid(quad: &Quad) -> bool {
    let Some(angles) = interior_angles(quad) else {
        return false;
    };

    let sum: f32 = angles.iter().sum();
    if (sum - 360.0).abs() > ANGLE_SUM_TOLERANCE {
        return false;
    }

    angles
        .iter()
        .all(|&a| a > MIN_QUAD_ANGLE && a < MAX_QUAD_ANGLE)
}
