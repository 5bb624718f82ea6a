//! CPU versions of the noise functions in `shaders/noise.wgsl`.
//!
//! Every function here is pure and mirrors its WGSL counterpart line by line,
//! so the compute kernel can be reasoned about (and tested) on the host.

use cgmath::{InnerSpace, Vector2, Vector3};

const PHASES: [f32; 8] = [
    0.5432895,
    9.5432895,
    4.535463,
    -1.534534,
    2.42345,
    -5.53450,
    -5.5345354313,
    4.4234521243,
];

/// WGSL `fract`, which floors instead of truncating.
fn fract(x: f32) -> f32 {
    x - x.floor()
}

fn phases(t: f32) -> [f32; 8] {
    PHASES.map(|p| t * p)
}

fn dp3_dy(v: Vector3<f32>, t: &[f32; 8]) -> f32 {
    let mut noise = 0.0;
    noise += 3.0 * (v.z * 1.8 + v.y * 3.0 - 194.58 + t[0]).cos()
        + 4.5 * (v.z * 4.8 + v.y * 4.5 - 83.13 + t[1]).cos()
        + 1.2 * (v.z * -7.0 + v.y * 1.2 - 845.2 + t[2]).cos()
        + 2.13 * (v.z * -5.0 + v.y * 2.13 - 762.185 + t[3]).cos();
    noise += 5.4 * (v.x * -0.48 + v.y * 5.4 - 707.916 + t[4]).cos()
        + 5.4 * (v.x * 2.56 + v.y * 5.4 - 482.348 + t[5]).cos()
        + 2.4 * (v.x * 4.16 + v.y * 2.4 + 9.872 + t[6]).cos()
        + 1.35 * (v.x * -4.16 + v.y * 1.35 - 476.747 + t[7]).cos();
    noise
}

fn dp2_dz(v: Vector3<f32>, t: &[f32; 8]) -> f32 {
    -0.48 * (v.z * -0.48 + v.x * 5.4 - 125.796 + t[4]).cos()
        + 2.56 * (v.z * 2.56 + v.x * 5.4 + 17.692 + t[5]).cos()
        + 4.16 * (v.z * 4.16 + v.x * 2.4 + 150.512 + t[6]).cos()
        - 4.16 * (v.z * -4.16 + v.x * 1.35 - 222.137 + t[7]).cos()
}

fn dp1_dz(v: Vector3<f32>, t: &[f32; 8]) -> f32 {
    let mut noise = 0.0;
    noise += 3.0 * (v.x * 1.8 + v.z * 3.0 + t[0]).cos()
        + 4.5 * (v.x * 4.8 + v.z * 4.5 + t[1]).cos()
        + 1.2 * (v.x * -7.0 + v.z * 1.2 + t[2]).cos()
        + 2.13 * (v.x * -5.0 + v.z * 2.13 + t[3]).cos();
    noise += 5.4 * (v.y * -0.48 + v.z * 5.4 + t[4]).cos()
        + 5.4 * (v.y * 2.56 + v.z * 5.4 + t[5]).cos()
        + 2.4 * (v.y * 4.16 + v.z * 2.4 + t[6]).cos()
        + 1.35 * (v.y * -4.16 + v.z * 1.35 + t[7]).cos();
    noise
}

fn dp3_dx(v: Vector3<f32>, t: &[f32; 8]) -> f32 {
    -0.48 * (v.x * -0.48 + v.y * 5.4 - 707.916 + t[4]).cos()
        + 2.56 * (v.x * 2.56 + v.y * 5.4 - 482.348 + t[5]).cos()
        + 4.16 * (v.x * 4.16 + v.y * 2.4 + 9.872 + t[6]).cos()
        - 4.16 * (v.x * -4.16 + v.y * 1.35 - 476.747 + t[7]).cos()
}

fn dp2_dx(v: Vector3<f32>, t: &[f32; 8]) -> f32 {
    let mut noise = 0.0;
    noise += 3.0 * (v.y * 1.8 + v.x * 3.0 - 2.82 + t[0]).cos()
        + 4.5 * (v.y * 4.8 + v.x * 4.5 + 74.37 + t[1]).cos()
        + 1.2 * (v.y * -7.0 + v.x * 1.2 - 256.72 + t[2]).cos()
        + 2.13 * (v.y * -5.0 + v.x * 2.13 - 207.683 + t[3]).cos();
    noise += 5.4 * (v.z * -0.48 + v.x * 5.4 - 125.796 + t[4]).cos()
        + 5.4 * (v.z * 2.56 + v.x * 5.4 + 17.692 + t[5]).cos()
        + 2.4 * (v.z * 4.16 + v.x * 2.4 + 150.512 + t[6]).cos()
        + 1.35 * (v.z * -4.16 + v.x * 1.35 - 222.137 + t[7]).cos();
    noise
}

fn dp1_dy(v: Vector3<f32>, t: &[f32; 8]) -> f32 {
    -0.48 * (v.y * -0.48 + v.z * 5.4 + t[4]).cos()
        + 2.56 * (v.y * 2.56 + v.z * 5.4 + t[5]).cos()
        + 4.16 * (v.y * 4.16 + v.z * 2.4 + t[6]).cos()
        - 4.16 * (v.y * -4.16 + v.z * 1.35 + t[7]).cos()
}

/// Normalized curl of the hand-tuned potential field at `p`, animated by `t`
/// (already multiplied by the curl time scale).
pub fn curl_noise(p: Vector3<f32>, t: f32) -> Vector3<f32> {
    let t = phases(t);

    let curl = Vector3::new(
        dp3_dy(p, &t) - dp2_dz(p, &t),
        dp1_dz(p, &t) - dp3_dx(p, &t),
        dp2_dx(p, &t) - dp1_dy(p, &t),
    );

    let len = curl.magnitude();

    if len > 0.0 {
        curl / len
    } else {
        Vector3::new(0.0, 0.0, 0.0)
    }
}

fn mod289(x: f32) -> f32 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute(x: [f32; 3]) -> [f32; 3] {
    x.map(|x| mod289((x * 34.0 + 1.0) * x))
}

/// 2D simplex noise (Ian McEwan, Stefan Gustavson, MIT), roughly in `[-1, 1]`.
pub fn simplex_noise2(v: Vector2<f32>) -> f32 {
    const C: [f32; 4] = [
        0.211324865405187,
        0.366025403784439,
        -0.577350269189626,
        0.024390243902439,
    ];

    // First corner
    let skew = (v.x + v.y) * C[1];
    let i = Vector2::new((v.x + skew).floor(), (v.y + skew).floor());
    let unskew = (i.x + i.y) * C[0];
    let x0 = Vector2::new(v.x - i.x + unskew, v.y - i.y + unskew);

    // Other corners
    let i1 = if x0.x > x0.y { (1.0, 0.0) } else { (0.0, 1.0) };

    let mut x12 = [x0.x + C[0], x0.y + C[0], x0.x + C[2], x0.y + C[2]];
    x12[0] -= i1.0;
    x12[1] -= i1.1;

    // Permutations
    let i = Vector2::new(mod289(i.x), mod289(i.y));
    let p = permute([i.y, i.y + i1.1, i.y + 1.0]);
    let p = permute([p[0] + i.x, p[1] + i.x + i1.0, p[2] + i.x + 1.0]);

    let mut m = [
        (0.5 - x0.dot(x0)).max(0.0),
        (0.5 - (x12[0] * x12[0] + x12[1] * x12[1])).max(0.0),
        (0.5 - (x12[2] * x12[2] + x12[3] * x12[3])).max(0.0),
    ];
    m = m.map(|m| {
        let m2 = m * m;
        m2 * m2
    });

    // Gradients: 41 points on a line mapped onto a diamond
    let x = p.map(|p| 2.0 * fract(p * C[3]) - 1.0);
    let h = x.map(|x| x.abs() - 0.5);
    let ox = x.map(|x| (x + 0.5).floor());
    let a0 = [x[0] - ox[0], x[1] - ox[1], x[2] - ox[2]];

    for k in 0..3 {
        m[k] *= 1.79284291400159 - 0.85373472095314 * (a0[k] * a0[k] + h[k] * h[k]);
    }

    let g = [
        a0[0] * x0.x + h[0] * x0.y,
        a0[1] * x12[0] + h[1] * x12[1],
        a0[2] * x12[2] + h[2] * x12[3],
    ];

    130.0 * (m[0] * g[0] + m[1] * g[1] + m[2] * g[2])
}

/// Simplex sample remapped to `[0, 1]`.
pub fn random_unit(v: Vector2<f32>) -> f32 {
    (simplex_noise2(v) * 0.5 + 0.5).clamp(0.0, 1.0)
}

/// Two independent values in `[0, 1]` for particle `index`.
pub fn random_pair(index: u32, seed: f32, time: f32) -> Vector2<f32> {
    let i = index as f32;

    Vector2::new(
        random_unit(Vector2::new(i * 0.0173 + time, seed)),
        random_unit(Vector2::new(seed + time * 0.71, i * 0.0311)),
    )
}

/// Triangle index and barycentric weights `(u, v, w)` for particle `index`.
pub fn barycentric_sample(
    index: u32,
    seed: f32,
    time: f32,
    triangle_count: u32,
) -> (u32, Vector3<f32>) {
    let r = random_pair(index, seed, time);
    let i = index as f32;
    let r2 = random_unit(Vector2::new(i * 0.0457 - time, seed * 1.3));

    let count = triangle_count.max(1);
    let triangle = ((r.x * count as f32) as u32).min(count - 1);

    (triangle, barycentric_weights(r.y, r2))
}

/// `v` is scaled by `1 - u` so the point stays inside the triangle.
pub fn barycentric_weights(u: f32, r: f32) -> Vector3<f32> {
    let v = r * (1.0 - u);
    let w = 1.0 - u - v;

    Vector3::new(u, v, w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curl_noise_is_pure() {
        let p = Vector3::new(0.3, -1.2, 2.5);

        assert_eq!(curl_noise(p, 1.5), curl_noise(p, 1.5));
        assert_ne!(curl_noise(p, 1.5), curl_noise(p, 2.5));
    }

    #[test]
    fn curl_noise_is_normalized() {
        for i in 0..50 {
            let f = i as f32 * 0.37;
            let v = curl_noise(Vector3::new(f.sin(), f.cos() * 2.0, f * 0.1), f);
            assert!((v.magnitude() - 1.0).abs() < 1e-4, "{:?}", v);
        }
    }

    #[test]
    fn simplex_is_pure_and_bounded() {
        for x in -20..20 {
            for y in -20..20 {
                let v = Vector2::new(x as f32 * 0.37, y as f32 * 0.53);
                let n = simplex_noise2(v);

                assert_eq!(n, simplex_noise2(v));
                assert!(n.abs() <= 1.1, "{} at {:?}", n, v);
            }
        }
    }

    #[test]
    fn simplex_is_zero_at_lattice_origin() {
        assert!(simplex_noise2(Vector2::new(0.0, 0.0)).abs() < 1e-6);
    }

    #[test]
    fn wgsl_fract_floors_negatives() {
        assert!((fract(-0.25) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn barycentric_weights_stay_in_triangle() {
        for index in 0..2000 {
            for seed in [0.0, 3.7, 9.99] {
                let (triangle, w) = barycentric_sample(index, seed, index as f32 * 0.01, 17);

                assert!(triangle < 17);
                assert!((w.x + w.y + w.z - 1.0).abs() < 1e-5);

                for c in [w.x, w.y, w.z] {
                    assert!((-1e-6..=1.0 + 1e-6).contains(&c), "{:?}", w);
                }
            }
        }
    }

    #[test]
    fn barycentric_extremes() {
        assert_eq!(barycentric_weights(1.0, 1.0), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(barycentric_weights(0.0, 1.0), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(barycentric_weights(0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn random_pair_depends_on_index() {
        let a = random_pair(1, 4.2, 0.0);
        let b = random_pair(2, 4.2, 0.0);

        assert_eq!(a, random_pair(1, 4.2, 0.0));
        assert_ne!(a, b);
    }
}
