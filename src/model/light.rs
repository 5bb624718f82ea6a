use crate::math::OPENGL_TO_WGPU_MATRIX;
use cgmath::{EuclideanSpace, InnerSpace, Matrix3, Matrix4, Point3, Quaternion, SquareMatrix, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Half width of the orthographic box.
    pub extent: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            position: [10., 10., 0.1],
            target: [0., 0., 0.],
            extent: 7.,
            near: 0.1,
            far: 20.,
        }
    }
}

/// Orthographic directional light casting the shadow map.
#[derive(Debug, Clone)]
pub struct Light {
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
    extent: f32,
    near: f32,
    far: f32,
}

impl Light {
    pub fn new(settings: &LightSettings) -> Self {
        Self {
            position: settings.position.into(),
            target: settings.target.into(),
            extent: settings.extent,
            near: settings.near,
            far: settings.far,
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.position),
            Point3::from_vec(self.target),
            Vector3::unit_y(),
        )
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let e = self.extent;
        OPENGL_TO_WGPU_MATRIX * cgmath::ortho(-e, e, -e, e, self.near, self.far)
    }

    /// Rotation of the light's view space, used to face particles towards it.
    pub fn orientation(&self) -> Quaternion<f32> {
        let view = self.view_matrix().invert().unwrap_or_else(Matrix4::identity);
        let rotation = Matrix3::from_cols(view.x.truncate(), view.y.truncate(), view.z.truncate());

        Quaternion::from(rotation)
    }

    /// Unit vector from the target towards the light.
    pub fn direction(&self) -> Vector3<f32> {
        (self.position - self.target).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Rotation, Vector4};

    #[test]
    fn target_lands_in_the_middle_of_the_map() {
        let light = Light::new(&LightSettings::default());
        let clip = light.projection_matrix() * light.view_matrix() * Vector4::new(0., 0., 0., 1.);

        assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4);
        assert!((0. ..=1.).contains(&clip.z));
    }

    #[test]
    fn orientation_faces_the_target() {
        let light = Light::new(&LightSettings::default());
        let forward = light.orientation().rotate_vector(Vector3::new(0., 0., -1.));

        assert!((forward + light.direction()).magnitude() < 1e-4);
    }
}
