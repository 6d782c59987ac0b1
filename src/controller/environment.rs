use crate::model::{EnvironmentMap, Scene, SunParameters};

/// Pushes a sun position into the sky, the water and the baked environment.
#[derive(Debug, Clone)]
pub struct EnvironmentUpdater {
    width: u32,
    height: u32,
    revision: u64,
}

impl EnvironmentUpdater {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, revision: 0 }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn apply(&mut self, sun: SunParameters, scene: &mut Scene) {
        let sun = sun.clamped();
        let direction = sun.direction();

        scene.sky.sun_position = direction;
        scene.water.sun_direction = direction.normalize();

        self.revision += 1;
        scene.environment = Some(EnvironmentMap::bake(&scene.sky, self.width, self.height, self.revision));

        tracing::debug!(
            "sun at elevation {:.1} azimuth {:.1}, environment revision {}",
            sun.elevation,
            sun.azimuth,
            self.revision
        );
    }
}
