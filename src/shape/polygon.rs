use crate::core::types::Point2f;

/// Tolerance for treating a point as lying on a polygon edge.
const EDGE_EPS: f32 = 1e-5;

/// Point-in-polygon by ray crossing, with a closed interior: vertices and
/// edge points count as inside.
#[must_use]
pub fn point_in_polygon(point: Point2f, polygon: &[Point2f]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        if point_on_segment(point, polygon[i], polygon[(i + 1) % n]) {
            return true;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Unsigned polygon area by the shoelace formula.
#[must_use]
pub fn polygon_area(polygon: &[Point2f]) -> f32 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }

    let mut signed = 0.0f32;
    let mut j = n - 1;
    for i in 0..n {
        signed += (polygon[j].x + polygon[i].x) * (polygon[j].y - polygon[i].y);
        j = i;
    }
    (signed / 2.0).abs()
}

fn point_on_segment(p: Point2f, a: Point2f, b: Point2f) -> bool {
    let ab = b - a;
    let ap = p - a;
    let cross = ab.x * ap.y - ab.y * ap.x;
    if cross.abs() > EDGE_EPS * (ab.x.abs() + ab.y.abs()).max(1.0) {
        return false;
    }
    let dot = ap.x * ab.x + ap.y * ab.y;
    let len2 = ab.x * ab.x + ab.y * ab.y;
    dot >= -EDGE_EPS && dot <= len2 + EDGE_EPS
}
