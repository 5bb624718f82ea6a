use cgmath::{Matrix4, Quaternion};

/// cgmath projections map depth to `[-1, 1]`, wgpu expects `[0, 1]`.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub fn mat4_to_array(mat: &Matrix4<f32>) -> [[f32; 4]; 4] {
    (*mat).into()
}

/// Quaternion as `[x, y, z, w]`, the order the shaders read.
pub fn quat_to_array(quat: &Quaternion<f32>) -> [f32; 4] {
    [quat.v.x, quat.v.y, quat.v.z, quat.s]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, InnerSpace, Rotation, Rotation3, Vector3};

    /// Mirrors `apply_quaternion` in `quaternion.wgsl`.
    fn apply_quaternion(q: [f32; 4], v: Vector3<f32>) -> Vector3<f32> {
        let [qx, qy, qz, qw] = q;

        let ix = qw * v.x + qy * v.z - qz * v.y;
        let iy = qw * v.y + qz * v.x - qx * v.z;
        let iz = qw * v.z + qx * v.y - qy * v.x;
        let iw = -qx * v.x - qy * v.y - qz * v.z;

        Vector3::new(
            ix * qw + iw * -qx + iy * -qz - iz * -qy,
            iy * qw + iw * -qy + iz * -qx - ix * -qz,
            iz * qw + iw * -qz + ix * -qy - iy * -qx,
        )
    }

    #[test]
    fn apply_quaternion_matches_cgmath() {
        let q = Quaternion::from_axis_angle(Vector3::new(1.0, 2.0, 0.5).normalize(), Deg(73.0));
        let v = Vector3::new(0.4, -1.0, 2.0);

        let ours = apply_quaternion(quat_to_array(&q), v);
        let theirs = q.rotate_vector(v);

        assert!((ours - theirs).magnitude() < 1e-5);
    }

    #[test]
    fn wgpu_matrix_remaps_depth() {
        let near = OPENGL_TO_WGPU_MATRIX * cgmath::Vector4::new(0.0, 0.0, -1.0, 1.0);
        let far = OPENGL_TO_WGPU_MATRIX * cgmath::Vector4::new(0.0, 0.0, 1.0, 1.0);

        assert_eq!(near.z, 0.0);
        assert_eq!(far.z, 1.0);
    }
}
