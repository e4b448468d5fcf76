/// End-to-end detect/track scenarios on synthetic textured patterns.
use planar_tracker::config::TrackerConfig;
use planar_tracker::core::{Mat, Point2f, Quad, TransformVariant};
use planar_tracker::pipeline::{Mode, Pipeline};

struct TestRng(u64);

impl TestRng {
    fn below(&mut self, n: u32) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) as u32) % n
    }
}

/// Random bright/dark rectangles: strong corners, globally distinctive
/// arrangement, no repetitive structure to alias the matcher.
fn blob_pattern(cols: usize, rows: usize, seed: u64) -> Mat {
    let mut rng = TestRng(seed);
    let mut img = Mat::new(rows, cols, 1).unwrap();
    for b in img.data_mut() {
        *b = 96;
    }
    for _ in 0..350 {
        let w = 4 + rng.below(13) as usize;
        let h = 4 + rng.below(13) as usize;
        let x0 = rng.below((cols - w) as u32) as usize;
        let y0 = rng.below((rows - h) as u32) as usize;
        let value = if rng.below(2) == 0 {
            10 + rng.below(60) as u8
        } else {
            180 + rng.below(70) as u8
        };
        for row in y0..y0 + h {
            for col in x0..x0 + w {
                img.set_pixel(row, col, value);
            }
        }
    }
    img
}

fn gray_to_rgba(gray: &Mat) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(gray.data().len() * 4);
    for &v in gray.data() {
        rgba.extend_from_slice(&[v, v, v, 255]);
    }
    rgba
}

/// Paste the pattern into a black canvas at (ox, oy), clipping at edges.
fn embed_frame(pattern: &Mat, canvas_w: usize, canvas_h: usize, ox: i32, oy: i32) -> Vec<u8> {
    let mut canvas = Mat::new(canvas_h, canvas_w, 1).unwrap();
    for row in 0..pattern.rows() {
        for col in 0..pattern.cols() {
            let y = row as i32 + oy;
            let x = col as i32 + ox;
            if y >= 0 && (y as usize) < canvas_h && x >= 0 && (x as usize) < canvas_w {
                canvas.set_pixel(y as usize, x as usize, pattern.pixel(row, col));
            }
        }
    }
    gray_to_rgba(&canvas)
}

/// Render the pattern rotated by `angle` and scaled by `scale` about the
/// canvas center, by inverse-mapped bilinear sampling.
fn warp_frame(
    pattern: &Mat,
    canvas_w: usize,
    canvas_h: usize,
    angle: f32,
    scale: f32,
) -> Vec<u8> {
    let mut canvas = Mat::new(canvas_h, canvas_w, 1).unwrap();
    let (sin, cos) = angle.sin_cos();
    let ccx = canvas_w as f32 / 2.0;
    let ccy = canvas_h as f32 / 2.0;
    let pcx = pattern.cols() as f32 / 2.0;
    let pcy = pattern.rows() as f32 / 2.0;

    for row in 0..canvas_h {
        for col in 0..canvas_w {
            let dx = col as f32 - ccx;
            let dy = row as f32 - ccy;
            // Inverse of rotate-then-scale.
            let sx = (cos * dx + sin * dy) / scale + pcx;
            let sy = (-sin * dx + cos * dy) / scale + pcy;

            if sx >= 0.0 && sy >= 0.0 && sx < (pattern.cols() - 1) as f32 && sy < (pattern.rows() - 1) as f32
            {
                let x0 = sx.floor() as usize;
                let y0 = sy.floor() as usize;
                let fx = sx - x0 as f32;
                let fy = sy - y0 as f32;
                let top = f32::from(pattern.pixel(y0, x0)) * (1.0 - fx)
                    + f32::from(pattern.pixel(y0, x0 + 1)) * fx;
                let bottom = f32::from(pattern.pixel(y0 + 1, x0)) * (1.0 - fx)
                    + f32::from(pattern.pixel(y0 + 1, x0 + 1)) * fx;
                let value = top * (1.0 - fy) + bottom * fy;
                canvas.set_pixel(row, col, (value + 0.5) as u8);
            }
        }
    }
    gray_to_rgba(&canvas)
}

fn test_config() -> TrackerConfig {
    TrackerConfig {
        lk_win_size: 25,
        ..TrackerConfig::default()
    }
}

fn make_pipeline(pattern: &Mat) -> Pipeline {
    Pipeline::new(
        &gray_to_rgba(pattern),
        pattern.cols(),
        pattern.rows(),
        TransformVariant::default(),
        test_config(),
    )
    .unwrap()
}

fn corner_near(quad: &Quad, index: usize, x: f32, y: f32, tol: f32) {
    let c = quad.corners[index];
    assert!(
        (c.x - x).abs() < tol && (c.y - y).abs() < tol,
        "corner {index} at ({}, {}), expected ({x}, {y})",
        c.x,
        c.y
    );
}

#[test]
fn test_identity_embedding_detected() {
    let pattern = blob_pattern(512, 384, 41);
    let mut pipeline = make_pipeline(&pattern);

    let frame = embed_frame(&pattern, 640, 480, 40, 30);
    let quad = pipeline
        .tick(&frame, 640, 480)
        .unwrap()
        .expect("pattern embedded verbatim must be found");

    assert_eq!(pipeline.mode(), Mode::Tracking);
    corner_near(&quad, 0, 40.0, 30.0, 2.0);
    corner_near(&quad, 1, 552.0, 30.0, 2.0);
    corner_near(&quad, 2, 552.0, 414.0, 2.0);
    corner_near(&quad, 3, 40.0, 414.0, 2.0);
}

#[test]
fn test_pure_translation_shifts_centroid() {
    let pattern = blob_pattern(512, 384, 42);

    let mut base_pipeline = make_pipeline(&pattern);
    let base_quad = base_pipeline
        .tick(&embed_frame(&pattern, 640, 480, 40, 30), 640, 480)
        .unwrap()
        .expect("base placement must be found");

    let mut moved_pipeline = make_pipeline(&pattern);
    let moved_quad = moved_pipeline
        .tick(&embed_frame(&pattern, 640, 480, 80, 50), 640, 480)
        .unwrap()
        .expect("translated placement must be found");

    let delta = moved_quad.centroid() - base_quad.centroid();
    assert!((delta.x - 40.0).abs() < 1.0, "dx {}", delta.x);
    assert!((delta.y - 20.0).abs() < 1.0, "dy {}", delta.y);
}

#[test]
fn test_rotated_scaled_pattern_detected() {
    let pattern = blob_pattern(512, 384, 43);
    let mut pipeline = make_pipeline(&pattern);

    let frame = warp_frame(&pattern, 640, 480, 30f32.to_radians(), 0.8);
    let quad = pipeline
        .tick(&frame, 640, 480)
        .unwrap()
        .expect("rotated and scaled pattern must be found");

    // Both diagonals of the similarity-warped rectangle keep their length.
    let expected = (512.0f32 * 512.0 + 384.0 * 384.0).sqrt() * 0.8;
    let d1 = quad.corners[0].distance_to(quad.corners[2]);
    let d2 = quad.corners[1].distance_to(quad.corners[3]);
    assert!((d1 - expected).abs() / expected < 0.03, "diagonal 1: {d1} vs {expected}");
    assert!((d2 - expected).abs() / expected < 0.03, "diagonal 2: {d2} vs {expected}");
}

#[test]
fn test_noise_frames_never_lock() {
    let pattern = blob_pattern(512, 384, 44);
    let mut pipeline = make_pipeline(&pattern);
    let mut rng = TestRng(777);

    for frame_idx in 0..30 {
        let mut gray = Mat::new(240, 320, 1).unwrap();
        for b in gray.data_mut() {
            *b = rng.below(256) as u8;
        }
        let quad = pipeline.tick(&gray_to_rgba(&gray), 320, 240).unwrap();
        assert!(quad.is_none(), "noise frame {frame_idx} produced a quad");
        assert_eq!(pipeline.mode(), Mode::Detecting);
    }
}

#[test]
fn test_detect_then_track_follows_translation() {
    let pattern = blob_pattern(512, 384, 45);
    let mut pipeline = make_pipeline(&pattern);

    // Detection frame.
    let first = pipeline
        .tick(&embed_frame(&pattern, 640, 480, 40, 30), 640, 480)
        .unwrap();
    assert!(first.is_some());
    assert_eq!(pipeline.mode(), Mode::Tracking);

    // 20 frames of 2 px/axis incremental motion.
    let mut late_errors = Vec::new();
    for k in 1..=20i32 {
        let frame = embed_frame(&pattern, 640, 480, 40 + 2 * k, 30 + 2 * k);
        let quad = pipeline
            .tick(&frame, 640, 480)
            .unwrap()
            .unwrap_or_else(|| panic!("frame {k} lost tracking"));
        assert_eq!(pipeline.mode(), Mode::Tracking, "frame {k} fell out of tracking");

        let truth = Point2f::new(
            (40 + 2 * k) as f32 + 256.0,
            (30 + 2 * k) as f32 + 192.0,
        );
        let err = quad.centroid().distance_to(truth);
        // Damping converges over the first persistence window; measure after.
        if k >= 8 {
            late_errors.push(err);
        }
    }

    let rms = (late_errors.iter().map(|e| e * e).sum::<f32>() / late_errors.len() as f32).sqrt();
    assert!(rms < 2.0, "centroid RMS error {rms}");
}

#[test]
fn test_jump_loses_track_and_overlay_expires() {
    let pattern = blob_pattern(512, 384, 46);
    let mut pipeline = make_pipeline(&pattern);

    assert!(pipeline
        .tick(&embed_frame(&pattern, 640, 480, 40, 30), 640, 480)
        .unwrap()
        .is_some());

    // A couple of quiet tracked frames.
    for _ in 0..2 {
        assert!(pipeline
            .tick(&embed_frame(&pattern, 640, 480, 40, 30), 640, 480)
            .unwrap()
            .is_some());
        assert_eq!(pipeline.mode(), Mode::Tracking);
    }

    // Whole-scene jump far over the prune limit: lost within one tick, the
    // stale quad goes out once.
    let jump = pipeline
        .tick(&embed_frame(&pattern, 640, 480, 80, 70), 640, 480)
        .unwrap();
    assert_eq!(pipeline.mode(), Mode::Detecting);
    assert!(jump.is_some(), "loss tick must emit the stale quad");

    // Featureless frames: the stale quad persists through the window, then
    // the overlay hides.
    let black = vec![0u8; 640 * 480 * 4];
    for i in 0..6 {
        let quad = pipeline.tick(&black, 640, 480).unwrap();
        assert!(quad.is_some(), "persistence frame {i} should repeat the quad");
    }
    let expired = pipeline.tick(&black, 640, 480).unwrap();
    assert!(expired.is_none(), "overlay must hide after the persistence window");

    // And it stays hidden.
    assert!(pipeline.tick(&black, 640, 480).unwrap().is_none());
}
