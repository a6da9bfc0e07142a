use glam::Vec3;

use crate::backend::Rgba;
use crate::model::RotationRates;
use crate::predicate::DutyCycle;

/// Scene parameters.
///
/// The defaults reproduce the reference scene: cyan with two instances while the
/// predicate is set, magenta with one instance otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub duty: DutyCycle,
    pub rotation: RotationRates,

    /// Clear color of the branch taken when the predicate is set.
    pub primary_color: Rgba,
    pub primary_instances: u32,
    /// Clear color of the inverted branch.
    pub alternate_color: Rgba,
    pub alternate_instances: u32,

    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,

    /// Initial model placement.
    pub model_translation: Vec3,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            duty: DutyCycle::DEFAULT,
            rotation: RotationRates::default(),
            primary_color: [0.0, 1.0, 1.0, 1.0],
            primary_instances: 2,
            alternate_color: [1.0, 0.0, 1.0, 1.0],
            alternate_instances: 1,
            fov_y: 90f32.to_radians(),
            near: 0.1,
            far: 100.0,
            model_translation: Vec3::new(0.0, 0.0, -3.0),
        }
    }
}
