use glam::{DMat4, DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Pinhole camera in normalized model units. Angles are radians.
///
/// Yaw turns the canonical forward vector (+Z, east) around the up axis,
/// positive towards north. Pitch then tilts around the resulting lateral
/// axis, positive looking down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: DVec3,
    pub yaw: f64,
    pub pitch: f64,

    pub fov_y: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,

            fov_y: 86.0_f64.to_radians(),
            aspect: 1280.0 / 720.0,
            near: 0.001,
            far: 10.0,
        }
    }
}

impl CameraPose {
    pub fn orientation(&self) -> DQuat {
        let yaw = DQuat::from_axis_angle(DVec3::Y, self.yaw);
        let lateral = DVec3::Y.cross(yaw * DVec3::Z).normalize();
        let pitch = DQuat::from_axis_angle(lateral, self.pitch);
        pitch * yaw
    }

    pub fn front(&self) -> DVec3 {
        (self.orientation() * DVec3::Z).normalize()
    }

    /// Camera-local up; stays well defined when looking straight down.
    pub fn up(&self) -> DVec3 {
        (self.orientation() * DVec3::Y).normalize()
    }

    pub fn target(&self, distance: f64) -> DVec3 {
        self.position + self.front() * distance
    }

    pub fn view_matrix(&self) -> DMat4 {
        DMat4::look_at_rh(self.position, self.position + self.front(), self.up())
    }

    pub fn projection_matrix(&self) -> DMat4 {
        DMat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> DMat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrustumPolicy {
    /// Reject vertices with NDC X, Y or Z outside [-1, 1].
    #[default]
    Symmetric,
    /// Reject NDC X outside [-aspect, aspect] or Z outside [-1, 1]; Y is not tested.
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex {
    pub ndc: DVec3,
    pub w: f64,
}

pub struct Projector {
    view_proj: DMat4,
    aspect: f64,
    policy: FrustumPolicy,
}

impl Projector {
    pub fn new(camera: &CameraPose, policy: FrustumPolicy) -> Self {
        Self {
            view_proj: camera.view_projection_matrix(),
            aspect: camera.aspect,
            policy,
        }
    }

    pub fn matrix(&self) -> DMat4 {
        self.view_proj
    }

    /// Perspective-divided position, or `None` for points on or behind the
    /// eye plane.
    pub fn project(&self, p: DVec3) -> Option<ClipVertex> {
        let clip = self.view_proj * p.extend(1.0);
        if clip.w <= f64::EPSILON {
            return None;
        }
        Some(ClipVertex {
            ndc: clip.truncate() / clip.w,
            w: clip.w,
        })
    }

    pub fn inside(&self, ndc: DVec3) -> bool {
        match self.policy {
            FrustumPolicy::Symmetric => ndc.abs().max_element() <= 1.0,
            FrustumPolicy::Reference => ndc.x.abs() <= self.aspect && ndc.z.abs() <= 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn scaled(&self, factor: u32) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Continuous raster position; row 0 is the top of the image.
    pub fn to_screen(&self, ndc: DVec3) -> DVec2 {
        DVec2::new(
            (ndc.x + 1.0) * 0.5 * self.width as f64,
            (1.0 - (ndc.y + 1.0) * 0.5) * self.height as f64,
        )
    }

    /// Nearest pixel to an NDC position, clamped into the viewport.
    pub fn to_pixel(&self, ndc: DVec3) -> (u32, u32) {
        let s = self.to_screen(ndc);
        let x = s.x.round().clamp(0.0, (self.width - 1) as f64);
        let y = s.y.round().clamp(0.0, (self.height - 1) as f64);
        (x as u32, y as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: DVec3, b: DVec3) -> bool {
        (a - b).abs().max_element() < 1e-9
    }

    #[test]
    fn canonical_forward_faces_east() {
        let cam = CameraPose::default();
        assert!(close(cam.front(), DVec3::Z));
        assert!(close(cam.up(), DVec3::Y));
    }

    #[test]
    fn yaw_then_pitch() {
        let cam = CameraPose {
            yaw: 90.0_f64.to_radians(),
            ..Default::default()
        };
        assert!(close(cam.front(), DVec3::X));

        let down = CameraPose {
            yaw: 90.0_f64.to_radians(),
            pitch: 90.0_f64.to_radians(),
            ..Default::default()
        };
        assert!(close(down.front(), DVec3::NEG_Y));
        assert!(close(down.up(), DVec3::X));
    }

    #[test]
    fn pitch_does_not_drag_yaw() {
        let cam = CameraPose {
            yaw: 30.0_f64.to_radians(),
            pitch: 20.0_f64.to_radians(),
            ..Default::default()
        };
        let f = cam.front();
        let heading = f.x.atan2(f.z);
        assert!((heading - 30.0_f64.to_radians()).abs() < 1e-9);
        assert!((f.y + 20.0_f64.to_radians().sin()).abs() < 1e-9);
    }

    #[test]
    fn look_at_target_projects_to_center() {
        let cam = CameraPose {
            position: DVec3::new(0.2, 0.5, -0.3),
            yaw: 0.7,
            pitch: 0.4,
            ..Default::default()
        };
        let projector = Projector::new(&cam, FrustumPolicy::Symmetric);
        let v = projector.project(cam.target(1.5)).unwrap();
        assert!(v.ndc.x.abs() < 1e-9 && v.ndc.y.abs() < 1e-9);
        assert!(v.ndc.z.abs() < 1.0);
    }

    #[test]
    fn points_behind_the_eye_are_dropped() {
        let cam = CameraPose::default();
        let projector = Projector::new(&cam, FrustumPolicy::Symmetric);
        assert!(projector.project(DVec3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn frustum_policies_differ_on_y() {
        let cam = CameraPose::default();
        let symmetric = Projector::new(&cam, FrustumPolicy::Symmetric);
        let reference = Projector::new(&cam, FrustumPolicy::Reference);
        let tall = DVec3::new(0.0, 1.5, 0.5);
        assert!(!symmetric.inside(tall));
        assert!(reference.inside(tall));

        let wide = DVec3::new(1.5, 0.0, 0.5);
        assert!(!symmetric.inside(wide));
        assert!(reference.inside(wide));
        assert!(!reference.inside(DVec3::new(1.9, 0.0, 0.5)));
        assert!(!reference.inside(DVec3::new(0.0, 0.0, 1.2)));
    }

    #[test]
    fn pixel_mapping_flips_and_clamps() {
        let vp = Viewport::new(1280, 720);
        assert_eq!(vp.to_pixel(DVec3::ZERO), (640, 360));
        assert_eq!(vp.to_pixel(DVec3::new(-1.0, 1.0, 0.0)), (0, 0));
        assert_eq!(vp.to_pixel(DVec3::new(1.0, -1.0, 0.0)), (1279, 719));
        assert_eq!(vp.to_pixel(DVec3::new(3.0, -4.0, 0.0)), (1279, 719));
    }
}
