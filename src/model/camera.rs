use crate::math::OPENGL_TO_WGPU_MATRIX;
use cgmath::{Deg, EuclideanSpace, Matrix3, Matrix4, Point3, Quaternion, Rad, Vector3};
use serde::{Deserialize, Serialize};
use winit::event::{ElementState, KeyboardInput, VirtualKeyCode};

const MIN_DISTANCE: f32 = 0.5;
const MAX_PITCH: f32 = 1.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub target: [f32; 3],
    pub distance: f32,
    /// Radians around +Y.
    pub yaw: f32,
    /// Radians above the horizon.
    pub pitch: f32,
    pub fov_deg: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            target: [0., 0.8, 0.],
            distance: 7.,
            yaw: 0.4,
            pitch: 0.25,
            fov_deg: 45.,
        }
    }
}

/// Orbit camera around a target, driven by the keyboard.
#[derive(Debug)]
pub struct Camera {
    pub target: Vector3<f32>,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,

    fov: f32,  // Field of view (frustum vertical degrees)
    near: f32, // What is too close to show
    far: f32,  // What is too far to show
    aspect: f32,

    is_forward_pressed: bool,
    is_backward_pressed: bool,
    is_rotate_left_pressed: bool,
    is_rotate_right_pressed: bool,
    is_rotate_up_pressed: bool,
    is_rotate_down_pressed: bool,
    is_up_pressed: bool,
    is_down_pressed: bool,
}

impl Camera {
    pub fn new(settings: &CameraSettings, aspect: f32) -> Self {
        Self {
            target: settings.target.into(),
            distance: settings.distance.max(MIN_DISTANCE),
            yaw: settings.yaw,
            pitch: settings.pitch.clamp(-MAX_PITCH, MAX_PITCH),
            fov: settings.fov_deg,
            near: 0.1,
            far: 100.0,
            aspect,
            is_forward_pressed: false,
            is_backward_pressed: false,
            is_rotate_left_pressed: false,
            is_rotate_right_pressed: false,
            is_rotate_up_pressed: false,
            is_rotate_down_pressed: false,
            is_up_pressed: false,
            is_down_pressed: false,
        }
    }

    pub fn update(&mut self, delta_sec: f32) {
        let speed = 3.0;
        let move_delta = speed * delta_sec;
        let rotation = move_delta / 3.0;

        if self.is_forward_pressed {
            self.distance = (self.distance - move_delta).max(MIN_DISTANCE);
        }

        if self.is_backward_pressed {
            self.distance += move_delta;
        }

        if self.is_up_pressed {
            self.target.y += move_delta;
        }

        if self.is_down_pressed {
            self.target.y -= move_delta;
        }

        if self.is_rotate_left_pressed {
            self.yaw -= rotation;
        }

        if self.is_rotate_right_pressed {
            self.yaw += rotation;
        }

        if self.is_rotate_up_pressed {
            self.pitch = (self.pitch + rotation).min(MAX_PITCH);
        }

        if self.is_rotate_down_pressed {
            self.pitch = (self.pitch - rotation).max(-MAX_PITCH);
        }
    }

    pub fn resize(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn process_input(&mut self, input: &KeyboardInput) -> bool {
        let Some(keycode) = input.virtual_keycode else {
            return false;
        };
        let is_pressed = input.state == ElementState::Pressed;

        match keycode {
            VirtualKeyCode::W => {
                self.is_forward_pressed = is_pressed;
            }
            VirtualKeyCode::S => {
                self.is_backward_pressed = is_pressed;
            }
            VirtualKeyCode::A | VirtualKeyCode::Left => {
                self.is_rotate_left_pressed = is_pressed;
            }
            VirtualKeyCode::D | VirtualKeyCode::Right => {
                self.is_rotate_right_pressed = is_pressed;
            }
            VirtualKeyCode::Up => {
                self.is_rotate_up_pressed = is_pressed;
            }
            VirtualKeyCode::Down => {
                self.is_rotate_down_pressed = is_pressed;
            }
            VirtualKeyCode::Space => {
                self.is_up_pressed = is_pressed;
            }
            VirtualKeyCode::LControl => {
                self.is_down_pressed = is_pressed;
            }
            _ => return false,
        }

        true
    }

    /// Yaw around +Y, then pitch around +X. The camera looks down its local -Z.
    fn rotation(&self) -> Matrix3<f32> {
        Matrix3::from_angle_y(Rad(self.yaw)) * Matrix3::from_angle_x(Rad(-self.pitch))
    }

    pub fn orientation(&self) -> Quaternion<f32> {
        Quaternion::from(self.rotation())
    }

    pub fn position(&self) -> Vector3<f32> {
        self.target + self.rotation() * Vector3::new(0., 0., self.distance)
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.position()),
            Point3::from_vec(self.target),
            Vector3::unit_y(),
        )
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(self.fov), self.aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Rotation, Vector4};

    fn camera() -> Camera {
        Camera::new(&CameraSettings::default(), 16. / 9.)
    }

    #[test]
    fn position_is_distance_from_target() {
        let camera = camera();

        assert!(((camera.position() - camera.target).magnitude() - camera.distance).abs() < 1e-5);
    }

    #[test]
    fn orientation_looks_at_target() {
        let camera = camera();
        let forward = camera.orientation().rotate_vector(Vector3::new(0., 0., -1.));
        let to_target = (camera.target - camera.position()).normalize();

        assert!((forward - to_target).magnitude() < 1e-4);
    }

    #[test]
    fn target_projects_to_screen_center() {
        let camera = camera();
        let t = camera.target;
        let clip = camera.projection_matrix() * camera.view_matrix() * Vector4::new(t.x, t.y, t.z, 1.);
        let ndc = clip.truncate() / clip.w;

        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!((0. ..=1.).contains(&ndc.z));
    }

    #[test]
    fn keys_orbit_and_zoom() {
        let mut camera = camera();
        let start_yaw = camera.yaw;
        let start_distance = camera.distance;

        camera.is_rotate_right_pressed = true;
        camera.is_forward_pressed = true;
        camera.update(0.5);

        assert!(camera.yaw > start_yaw);
        assert!(camera.distance < start_distance);

        for _ in 0..100 {
            camera.update(0.5);
        }

        assert_eq!(camera.distance, MIN_DISTANCE);
    }
}
