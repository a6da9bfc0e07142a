use glam::{Mat4, Vec3};

use crate::backend::MeshId;

/// Angular speeds applied to the model every tick, in radians per second.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RotationRates {
    pub x: f32,
    pub y: f32,
}

impl RotationRates {
    /// Rotation for one tick of `dt` seconds: X first, then Y.
    #[inline]
    pub fn increment(&self, dt: f32) -> Mat4 {
        Mat4::from_rotation_x(self.x * dt) * Mat4::from_rotation_y(self.y * dt)
    }
}

impl Default for RotationRates {
    fn default() -> Self {
        Self {
            x: std::f32::consts::PI,
            y: std::f32::consts::PI * 0.5,
        }
    }
}

/// Uploaded mesh plus its mutable world transform.
#[derive(Debug, Clone)]
pub struct Model {
    mesh: MeshId,
    transform: Mat4,
}

impl Model {
    pub fn new(mesh: MeshId, translation: Vec3) -> Self {
        Self {
            mesh,
            transform: Mat4::from_translation(translation),
        }
    }

    #[inline]
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Composes one rotation increment onto the current transform.
    ///
    /// The rotation accumulates across ticks; it is never reset.
    pub fn rotate(&mut self, rates: &RotationRates, dt: f32) {
        self.transform *= rates.increment(dt);
    }
}

/// Perspective projection for a `width / height` aspect ratio.
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_y, aspect, near, far)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Model {
        Model::new(MeshId(0), Vec3::new(0.0, 0.0, -3.0))
    }

    #[test]
    fn rotation_accumulates_in_tick_order() {
        let rates = RotationRates::default();
        let dts = [0.016f32, 0.020, 0.010, 0.033, 0.016];

        let mut m = model();
        let mut expected = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0));
        for dt in dts {
            m.rotate(&rates, dt);
            expected = expected * rates.increment(dt);
        }

        assert!(m.transform().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn rotation_is_not_reset_between_ticks() {
        let rates = RotationRates::default();
        let mut once = model();
        once.rotate(&rates, 0.1);

        let mut twice = model();
        twice.rotate(&rates, 0.1);
        twice.rotate(&rates, 0.1);

        assert!(!once.transform().abs_diff_eq(twice.transform(), 1e-5));
    }

    #[test]
    fn zero_dt_leaves_transform_unchanged() {
        let mut m = model();
        let before = m.transform();
        m.rotate(&RotationRates::default(), 0.0);
        assert!(m.transform().abs_diff_eq(before, 1e-6));
    }

    #[test]
    fn translation_survives_rotation() {
        let mut m = model();
        m.rotate(&RotationRates::default(), 0.25);
        let t = m.transform().w_axis;
        assert!((t.z + 3.0).abs() < 1e-5);
    }
}
