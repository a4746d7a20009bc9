//! Face alignment via 4-DOF similarity transform.
//!
//! Warps a detected face to the canonical 112×112 pose used by the
//! embedding model, estimated from the five detected landmarks against
//! the InsightFace reference positions.

use image::{Rgb, RgbImage};

/// Canonical five-point landmark positions for a 112×112 aligned crop,
/// ordered left eye, right eye, nose, left mouth, right mouth.
const REFERENCE_LANDMARKS: [(f32, f32); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// Side length of the aligned crop fed to the embedding model.
pub const ALIGNED_SIZE: u32 = 112;

/// Align a detected face to the canonical 112×112 crop.
pub fn align_face(image: &RgbImage, landmarks: &[(f32, f32); 5]) -> RgbImage {
    let matrix = similarity_transform(landmarks, &REFERENCE_LANDMARKS);
    warp_rgb(image, &matrix, ALIGNED_SIZE)
}

/// Estimate the 2×3 similarity transform (scale, rotation, translation)
/// mapping `src` landmarks onto `dst`, least-squares over all five points.
///
/// Returned as `[a, -b, tx, b, a, ty]` for the matrix:
/// ```text
/// | a  -b  tx |
/// | b   a  ty |
/// ```
fn similarity_transform(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> [f32; 6] {
    // Each point pair contributes two equations in [a, b, tx, ty]:
    //   sx * a - sy * b + tx = dx
    //   sy * a + sx * b + ty = dy
    // Accumulate the normal equations A^T A x = A^T b directly.
    let mut ata = [[0.0f32; 4]; 4];
    let mut atb = [0.0f32; 4];

    for i in 0..5 {
        let (sx, sy) = src[i];
        let (dx, dy) = dst[i];
        let rows = [[sx, -sy, 1.0, 0.0], [sy, sx, 0.0, 1.0]];
        let rhs = [dx, dy];

        for (row, value) in rows.iter().zip(rhs) {
            for j in 0..4 {
                for k in 0..4 {
                    ata[j][k] += row[j] * row[k];
                }
                atb[j] += row[j] * value;
            }
        }
    }

    let [a, b, tx, ty] = solve_normal_equations(ata, atb);
    [a, -b, tx, b, a, ty]
}

/// Solve the 4×4 normal-equation system by Gaussian elimination with
/// partial pivoting. Degenerate systems (collinear or coincident
/// landmarks) fall back to an identity-like solution.
fn solve_normal_equations(ata: [[f32; 4]; 4], atb: [f32; 4]) -> [f32; 4] {
    let mut m = [[0.0f32; 5]; 4];
    for i in 0..4 {
        m[i][..4].copy_from_slice(&ata[i]);
        m[i][4] = atb[i];
    }

    for col in 0..4 {
        let pivot_row = (col..4)
            .max_by(|&r1, &r2| m[r1][col].abs().total_cmp(&m[r2][col].abs()))
            .unwrap_or(col);
        m.swap(col, pivot_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return [1.0, 0.0, 0.0, 0.0];
        }
        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        x[i] = m[i][4];
        for j in (i + 1)..4 {
            x[i] -= m[i][j] * x[j];
        }
        x[i] /= m[i][i];
    }
    x
}

/// Inverse-map an affine warp over an RGB image with bilinear sampling.
/// Pixels mapping outside the source fill with black.
fn warp_rgb(image: &RgbImage, matrix: &[f32; 6], out_size: u32) -> RgbImage {
    let (a, tx, b, ty) = (matrix[0], matrix[2], matrix[3], matrix[5]);

    // The 2x2 part is [[a, -b], [b, a]] with det = a^2 + b^2.
    let det = a * a + b * b;
    if det.abs() < 1e-12 {
        return RgbImage::new(out_size, out_size);
    }
    let ia = a / det;
    let ib = b / det;

    let (src_width, src_height) = image.dimensions();
    let mut output = RgbImage::new(out_size, out_size);

    for oy in 0..out_size {
        for ox in 0..out_size {
            let dx = ox as f32 - tx;
            let dy = oy as f32 - ty;
            let sx = ia * dx + ib * dy;
            let sy = -ib * dx + ia * dy;

            let x0 = sx.floor() as i32;
            let y0 = sy.floor() as i32;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            let sample = |x: i32, y: i32, channel: usize| -> f32 {
                if x >= 0 && (x as u32) < src_width && y >= 0 && (y as u32) < src_height {
                    image.get_pixel(x as u32, y as u32)[channel] as f32
                } else {
                    0.0
                }
            };

            let mut pixel = [0u8; 3];
            for (channel, out) in pixel.iter_mut().enumerate() {
                let value = sample(x0, y0, channel) * (1.0 - fx) * (1.0 - fy)
                    + sample(x0 + 1, y0, channel) * fx * (1.0 - fy)
                    + sample(x0, y0 + 1, channel) * (1.0 - fx) * fy
                    + sample(x0 + 1, y0 + 1, channel) * fx * fy;
                *out = value.round().clamp(0.0, 255.0) as u8;
            }
            output.put_pixel(ox, oy, Rgb(pixel));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform() {
        let m = similarity_transform(&REFERENCE_LANDMARKS, &REFERENCE_LANDMARKS);
        assert!((m[0] - 1.0).abs() < 1e-4, "a = {}", m[0]);
        assert!(m[1].abs() < 1e-4, "-b = {}", m[1]);
        assert!(m[2].abs() < 1e-3, "tx = {}", m[2]);
        assert!(m[3].abs() < 1e-4, "b = {}", m[3]);
        assert!((m[4] - 1.0).abs() < 1e-4, "a2 = {}", m[4]);
        assert!(m[5].abs() < 1e-3, "ty = {}", m[5]);
    }

    #[test]
    fn test_double_scale_landmarks_halve() {
        let src: [(f32, f32); 5] = [
            (76.5892, 103.3926),
            (147.0636, 103.0028),
            (112.0504, 143.4732),
            (83.0986, 184.7310),
            (141.4598, 184.4082),
        ];
        let m = similarity_transform(&src, &REFERENCE_LANDMARKS);
        assert!((m[0] - 0.5).abs() < 0.05, "a = {}, expected ~0.5", m[0]);
    }

    #[test]
    fn test_degenerate_landmarks_fall_back() {
        let collapsed = [(50.0, 50.0); 5];
        let m = similarity_transform(&collapsed, &REFERENCE_LANDMARKS);
        assert_eq!(m[0], 1.0);
        assert_eq!(m[3], 0.0);
    }

    #[test]
    fn test_align_face_output_size() {
        let image = RgbImage::from_pixel(640, 480, Rgb([128, 128, 128]));
        let aligned = align_face(&image, &REFERENCE_LANDMARKS);
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
    }

    #[test]
    fn test_colored_patch_lands_at_reference_position() {
        // Paint a red patch at the detected left-eye position; after
        // alignment it should sit near the reference left eye, still red.
        let mut image = RgbImage::new(200, 200);
        let src_landmarks: [(f32, f32); 5] = [
            (80.0, 60.0),
            (120.0, 60.0),
            (100.0, 85.0),
            (85.0, 110.0),
            (115.0, 110.0),
        ];
        let (lx, ly) = (src_landmarks[0].0 as u32, src_landmarks[0].1 as u32);
        for dy in 0..5 {
            for dx in 0..5 {
                image.put_pixel(lx - 2 + dx, ly - 2 + dy, Rgb([255, 0, 0]));
            }
        }

        let aligned = align_face(&image, &src_landmarks);

        let ref_x = REFERENCE_LANDMARKS[0].0.round() as u32;
        let ref_y = REFERENCE_LANDMARKS[0].1.round() as u32;
        let mut max_red = 0u8;
        let mut max_green = 0u8;
        for dy in 0..3 {
            for dx in 0..3 {
                let pixel = aligned.get_pixel(ref_x - 1 + dx, ref_y - 1 + dy);
                max_red = max_red.max(pixel[0]);
                max_green = max_green.max(pixel[1]);
            }
        }
        assert!(max_red > 100, "expected red patch near ({ref_x}, {ref_y})");
        assert_eq!(max_green, 0, "green channel should stay empty");
    }

    #[test]
    fn test_warp_out_of_bounds_is_black() {
        let image = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));
        // Large translation pushes every output pixel outside the source.
        let m = [1.0, 0.0, -500.0, 0.0, 1.0, -500.0];
        let out = warp_rgb(&image, &m, 16);
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
