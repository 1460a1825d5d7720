use nalgebra::{Matrix4, Perspective3, Point3, Rotation3, Unit, Vector3};

use crate::geometry::Bounds;

/// Z-up orbit camera around `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            position: Point3::new(-100.0, -100.0, 5.0),
            target: Point3::origin(),
            fov: 45.0,
            near: 0.8,
            far: 1000.0,
            max_distance: f32::INFINITY,
        }
    }
}

impl OrbitCamera {
    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }

    pub fn view_projection(&self, aspect: f32) -> Matrix4<f32> {
        let proj = Perspective3::new(aspect, self.fov.to_radians(), self.near, self.far);
        let view = Matrix4::look_at_rh(&self.position, &self.target, &Vector3::z());
        proj.as_matrix() * view
    }

    /// Rotate around the target: `yaw` about world Z, `pitch` about the camera's right axis.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let offset = self.position - self.target;
        let yawed = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw) * offset;
        let mut next = yawed;
        if let Some(axis) = Unit::try_new(yawed.cross(&Vector3::z()), 1e-6) {
            let pitched = Rotation3::from_axis_angle(&axis, pitch) * yawed;
            // stop short of the poles so `look_at` keeps a valid up vector
            if pitched.normalize().z.abs() < 0.999 {
                next = pitched;
            }
        }
        self.position = self.target + next;
    }

    /// Shift camera and target in the view plane. `dx`/`dy` are fractions of the viewport.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(&Vector3::z());
        let Some(right) = right.try_normalize(1e-6) else {
            return;
        };
        let up = right.cross(&forward);
        let scale = self.distance() * (self.fov.to_radians() * 0.5).tan() * 2.0;
        let shift = (-right * dx + up * dy) * scale;
        self.position += shift;
        self.target += shift;
    }

    /// Dolly towards (`factor` < 1) or away from (`factor` > 1) the target.
    pub fn dolly(&mut self, factor: f32) {
        let offset = self.position - self.target;
        let distance = (offset.norm() * factor).max(self.near * 2.0).min(self.max_distance);
        if let Some(dir) = offset.try_normalize(1e-9) {
            self.position = self.target + dir * distance;
        }
    }

    /// Frame `bounds`, keeping the current viewing direction.
    pub fn zoom_to_fit(&mut self, bounds: &Bounds, aspect: f32, fit_offset: f32) {
        if bounds.is_empty() {
            return;
        }
        let size = bounds.size().cast::<f32>();
        let center = bounds.center().cast::<f32>();

        let max_size = size.x.max(size.y).max(size.z);
        let fit_height = max_size / (2.0 * (std::f32::consts::PI * self.fov / 360.0).atan());
        let fit_width = fit_height / aspect;
        let distance = fit_offset * fit_height.max(fit_width);
        if !distance.is_finite() || !center.iter().all(|c| c.is_finite()) {
            log::warn!("not fitting camera to non-finite bounds");
            return;
        }
        if distance <= 0.0 {
            self.position += center - self.target;
            self.target = center;
            return;
        }

        let direction = (self.target - self.position)
            .try_normalize(1e-9)
            .filter(|d| d.iter().all(|c| c.is_finite()))
            .unwrap_or_else(|| Vector3::new(1.0, 1.0, -0.05).normalize())
            * distance;

        self.max_distance = distance * 10.0;
        self.target = center;
        self.near = distance / 100.0;
        self.far = distance * 100.0;
        self.position = self.target - direction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube(half: f64) -> Bounds {
        Bounds {
            min: Point3::new(10.0 - half, -half, -half),
            max: Point3::new(10.0 + half, half, half),
        }
    }

    #[test]
    fn zoom_to_fit_centres_on_bounds() {
        let mut cam = OrbitCamera::default();
        let before_dir = (cam.target - cam.position).normalize();
        cam.zoom_to_fit(&cube(5.0), 1.0, 1.2);

        assert_relative_eq!(cam.target, Point3::new(10.0, 0.0, 0.0), epsilon = 1e-5);
        let fit_height = 10.0 / (2.0 * (std::f32::consts::PI * 45.0 / 360.0).atan());
        let expected = 1.2 * fit_height;
        assert_relative_eq!(cam.distance(), expected, epsilon = 1e-3);
        assert_relative_eq!(cam.near, expected / 100.0, epsilon = 1e-5);
        assert_relative_eq!(cam.far, expected * 100.0, epsilon = 1e-1);
        assert_relative_eq!(cam.max_distance, expected * 10.0, epsilon = 1e-3);
        let after_dir = (cam.target - cam.position).normalize();
        assert_relative_eq!(before_dir, after_dir, epsilon = 1e-5);
    }

    #[test]
    fn narrow_viewport_backs_off_further() {
        let mut wide = OrbitCamera::default();
        let mut narrow = OrbitCamera::default();
        wide.zoom_to_fit(&cube(5.0), 2.0, 1.2);
        narrow.zoom_to_fit(&cube(5.0), 0.5, 1.2);
        assert!(narrow.distance() > wide.distance());
    }

    #[test]
    fn empty_bounds_leave_camera_alone() {
        let mut cam = OrbitCamera::default();
        cam.zoom_to_fit(&Bounds::empty(), 1.0, 1.2);
        assert_eq!(cam, OrbitCamera::default());
    }

    #[test]
    fn non_finite_bounds_leave_camera_alone() {
        let mut cam = OrbitCamera::default();
        let bad = Bounds { min: Point3::new(f64::NAN, 0.0, 0.0), max: Point3::new(1.0, 1.0, 1.0) };
        cam.zoom_to_fit(&bad, 1.0, 1.2);
        let inf = Bounds { min: Point3::new(0.0, 0.0, 0.0), max: Point3::new(f64::INFINITY, 1.0, 1.0) };
        cam.zoom_to_fit(&inf, 1.0, 1.2);
        assert_eq!(cam, OrbitCamera::default());
    }

    #[test]
    fn fit_recovers_from_a_broken_position() {
        let mut cam = OrbitCamera::default();
        cam.position = Point3::new(f32::NAN, f32::NAN, f32::NAN);
        cam.zoom_to_fit(&cube(5.0), 1.0, 1.2);
        assert!(cam.position.iter().all(|c| c.is_finite()));
        assert_relative_eq!(cam.target, Point3::new(10.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn orbit_keeps_distance() {
        let mut cam = OrbitCamera::default();
        let d = cam.distance();
        cam.orbit(0.3, 0.1);
        assert_relative_eq!(cam.distance(), d, epsilon = 1e-2);
    }

    #[test]
    fn dolly_respects_max_distance() {
        let mut cam = OrbitCamera::default();
        cam.max_distance = 50.0;
        cam.dolly(10.0);
        assert_relative_eq!(cam.distance(), 50.0, epsilon = 1e-3);
    }
}
