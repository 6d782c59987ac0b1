use std::collections::VecDeque;
use std::time::Instant;

use crate::assets::{AssetPipeline, LoadEvent, ModelRole, Placement};
use crate::config::ViewerConfig;
use crate::controller::camera_controller::CameraController;
use crate::controller::environment::EnvironmentUpdater;
use crate::controller::input::{InputEvent, KeyBindings, MovementState};
use crate::model::{AnimationMixer, AnimationRegistry, Camera, NodeId, Pose, Scene, SunParameters, WaterMaterial};

/// Where a finished frame goes. The GPU renderer implements this; tests
/// record submissions instead.
pub trait FrameSink {
    type Error;

    fn resize(&mut self, width: u32, height: u32);

    fn submit(&mut self, scene: &Scene, camera: &Camera) -> Result<(), Self::Error>;
}

/// Wall-clock delta between consecutive ticks.
#[derive(Debug, Clone)]
pub struct Clock {
    last: Option<Instant>,
    max_delta: Option<f32>,
}

impl Clock {
    pub fn new(max_delta: Option<f32>) -> Self {
        Self { last: None, max_delta }
    }

    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Seconds since the previous tick; zero on the first one.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        match self.max_delta {
            Some(cap) => dt.min(cap),
            None => dt,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SubmarineTarget {
    node: NodeId,
    pose: Pose,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadCounts {
    pub loaded: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Owns everything the viewer mutates between frames.
pub struct FrameLoopContext {
    pub camera: Camera,
    pub camera_controller: CameraController,
    pub movement: MovementState,
    pub bindings: KeyBindings,
    pub scene: Scene,
    pub animations: AnimationRegistry,
    environment: EnvironmentUpdater,
    sun: SunParameters,
    submarine: Option<SubmarineTarget>,
    assets: AssetPipeline,
    events: VecDeque<InputEvent>,
    clock: Clock,
    frame_index: u64,
    loaded: usize,
    failed: usize,
}

impl FrameLoopContext {
    /// Build the initial state: camera placement, water, sky and the first environment bake.
    pub fn new(config: &ViewerConfig, assets: AssetPipeline) -> Self {
        let cam_cfg = &config.camera;
        let mut camera = Camera::new(config.window_width, config.window_height);
        camera.fov_y = cam_cfg.fov_y_deg.to_radians();
        camera.z_near = cam_cfg.z_near;
        camera.z_far = cam_cfg.z_far;
        camera.place_orbit(cam_cfg.target, cam_cfg.position, cam_cfg.max_distance);

        let mut scene = Scene::new(WaterMaterial::new(config.water_time_step));
        let mut environment = EnvironmentUpdater::new(config.environment_width, config.environment_height);
        let sun = SunParameters::default();
        environment.apply(sun, &mut scene);

        Self {
            camera,
            camera_controller: CameraController::new(cam_cfg.move_speed, cam_cfg.look_sensitivity),
            movement: MovementState::new(),
            bindings: KeyBindings::default(),
            scene,
            animations: AnimationRegistry::new(),
            environment,
            sun,
            submarine: None,
            assets,
            events: VecDeque::new(),
            clock: Clock::new(config.max_frame_delta),
            frame_index: 0,
            loaded: 0,
            failed: 0,
        }
    }

    pub fn issue_loads(&mut self, placements: impl IntoIterator<Item = Placement>) {
        for placement in placements {
            self.assets.issue(placement);
        }
    }

    pub fn assets_mut(&mut self) -> &mut AssetPipeline {
        &mut self.assets
    }

    pub fn push_event(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn sun(&self) -> SunParameters {
        self.sun
    }

    /// Current submarine pose, once the submarine is in the scene.
    pub fn submarine_pose(&self) -> Option<Pose> {
        self.submarine.map(|s| s.pose)
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn load_counts(&self) -> LoadCounts {
        LoadCounts {
            loaded: self.loaded,
            failed: self.failed,
            pending: self.assets.pending(),
        }
    }

    /// Run one frame using wall-clock time. Returns the delta that was used.
    pub fn frame<S: FrameSink>(&mut self, sink: &mut S) -> Result<f32, S::Error> {
        self.poll_assets();
        self.drain_events(sink);
        let dt = self.clock.tick();
        self.advance(dt, sink)?;
        Ok(dt)
    }

    /// Run one frame with an explicit delta.
    pub fn step<S: FrameSink>(&mut self, dt: f32, sink: &mut S) -> Result<(), S::Error> {
        self.poll_assets();
        self.drain_events(sink);
        self.advance(dt, sink)
    }

    fn advance<S: FrameSink>(&mut self, dt: f32, sink: &mut S) -> Result<(), S::Error> {
        self.camera_controller.apply_movement(&mut self.camera, &self.movement, dt);
        self.animations.update(dt, &mut self.scene);
        self.scene.water.advance_frame();

        sink.submit(&self.scene, &self.camera)?;
        self.frame_index += 1;
        Ok(())
    }

    fn poll_assets(&mut self) {
        for event in self.assets.poll() {
            self.apply_load_event(event);
        }
    }

    pub fn apply_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Loaded { placement, mut fragment } => {
                let clips = std::mem::take(&mut fragment.clips);
                let inserted = self.scene.insert_fragment(fragment, placement.transform());

                if !clips.is_empty() {
                    tracing::info!("{}: playing {} animation clips", placement.label, clips.len());
                    self.animations
                        .register(AnimationMixer::new(placement.label.clone(), clips, inserted.nodes));
                }
                if placement.role == ModelRole::Submarine {
                    self.submarine = Some(SubmarineTarget {
                        node: inserted.root,
                        pose: placement.pose(),
                    });
                }

                self.loaded += 1;
                tracing::info!("{} placed at {:?}", placement.label, placement.position);
            }
            LoadEvent::Failed { placement, error } => {
                self.failed += 1;
                tracing::warn!("failed to load {}: {error}", placement.label);
            }
        }
    }

    fn drain_events<S: FrameSink>(&mut self, sink: &mut S) {
        while let Some(event) = self.events.pop_front() {
            match event {
                InputEvent::KeyDown(key) => {
                    self.bindings.apply(&mut self.movement, key, true);
                }
                InputEvent::KeyUp(key) => {
                    self.bindings.apply(&mut self.movement, key, false);
                }
                InputEvent::Look { dx, dy } => self.camera_controller.apply_look(&mut self.camera, dx, dy),
                InputEvent::Resized { width, height } => {
                    if width == 0 || height == 0 {
                        continue;
                    }
                    self.camera.set_aspect(width, height);
                    sink.resize(width, height);
                }
                InputEvent::FocusLost => self.movement.clear(),
                InputEvent::SunChanged(sun) => {
                    self.sun = sun.clamped();
                    self.environment.apply(self.sun, &mut self.scene);
                }
                InputEvent::SubmarinePose(pose) => self.set_submarine_pose(pose),
            }
        }
    }

    fn set_submarine_pose(&mut self, pose: Pose) {
        let Some(target) = self.submarine.as_mut() else {
            tracing::debug!("submarine pose edited before the submarine loaded");
            return;
        };
        target.pose = pose;
        if let Some(node) = self.scene.node_mut(target.node) {
            pose.apply_to(&mut node.transform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use glam::Vec3;
    use winit::keyboard::KeyCode;

    use crate::assets::{default_manifest, AssetError, AssetRef, AssetSource};
    use crate::model::animation::{AnimationChannel, ChannelValues, Interpolation};
    use crate::model::camera::PITCH_LIMIT;
    use crate::model::mesh::{Mesh, Primitive};
    use crate::model::scene::{FragmentNode, SceneFragment, Transform};
    use crate::model::{AnimationClip, StaticObject};

    #[derive(Default)]
    struct RecordingSink {
        submitted: Vec<(Vec3, f32, usize)>,
        resizes: Vec<(u32, u32)>,
    }

    impl FrameSink for RecordingSink {
        type Error = std::convert::Infallible;

        fn resize(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }

        fn submit(&mut self, scene: &Scene, camera: &Camera) -> Result<(), Self::Error> {
            self.submitted.push((camera.eye, scene.water.time(), scene.fragment_count()));
            Ok(())
        }
    }

    /// Source that never gets called; tests drive loads through deferred handles.
    struct NoSource;

    impl AssetSource for NoSource {
        fn load(&self, _asset: &AssetRef) -> Result<SceneFragment, AssetError> {
            Err(AssetError::Cancelled)
        }
    }

    fn context() -> FrameLoopContext {
        let config = ViewerConfig {
            environment_width: 8,
            environment_height: 4,
            ..Default::default()
        };
        FrameLoopContext::new(&config, AssetPipeline::new(Arc::new(NoSource)))
    }

    fn fragment(name: &str, clips: Vec<AnimationClip>) -> SceneFragment {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        SceneFragment {
            name: name.into(),
            nodes: vec![FragmentNode {
                name: "body".into(),
                transform: Transform::IDENTITY,
                children: vec![],
                primitives: vec![0],
            }],
            primitives: vec![Primitive::new(Mesh::from_attributes(&positions, None, None, vec![0, 1, 2]), [1.0; 4])],
            clips,
        }
    }

    fn flap_clip() -> AnimationClip {
        AnimationClip::new(
            "flap",
            vec![AnimationChannel {
                target: 0,
                interpolation: Interpolation::Linear,
                times: vec![0.0, 1.0],
                values: ChannelValues::Translation(vec![Vec3::ZERO, Vec3::Y]),
            }],
        )
    }

    #[test]
    fn test_startup_camera_and_environment() {
        let ctx = context();
        let target = Vec3::new(0.0, 10.0, 8900.0);
        assert!((ctx.camera.eye.distance(target) - 200.0).abs() < 1e-2);
        assert!(ctx.scene.environment.is_some());
        assert_eq!(ctx.sun(), SunParameters::default());
        assert_eq!(ctx.scene.statics(), [StaticObject::Water, StaticObject::Sky]);
    }

    #[test]
    fn test_free_look_and_movement_are_not_bound_to_the_start_orbit() {
        let mut ctx = context();
        let mut sink = RecordingSink::default();
        let target = Vec3::new(0.0, 10.0, 8900.0);

        // walking straight at the target passes well inside 40 units
        ctx.push_event(InputEvent::KeyDown(KeyCode::KeyW));
        ctx.step(17.0, &mut sink).unwrap();
        assert!((ctx.camera.eye.distance(target) - 30.0).abs() < 1e-1);

        ctx.push_event(InputEvent::KeyUp(KeyCode::KeyW));
        let before = ctx.camera.forward();
        ctx.push_event(InputEvent::Look { dx: 0.0, dy: -10_000.0 });
        ctx.step(0.0, &mut sink).unwrap();
        assert_ne!(ctx.camera.forward(), before);
        assert_eq!(ctx.camera.pitch, PITCH_LIMIT);
    }

    #[test]
    fn test_held_key_distance_is_independent_of_frame_split() {
        let mut one = context();
        let mut many = context();
        let mut sink = RecordingSink::default();
        let start = one.camera.eye;
        let forward = one.camera.forward();

        one.push_event(InputEvent::KeyDown(KeyCode::KeyW));
        one.step(0.6, &mut sink).unwrap();

        many.push_event(InputEvent::KeyDown(KeyCode::KeyW));
        for dt in [0.1, 0.05, 0.2, 0.25] {
            many.step(dt, &mut sink).unwrap();
        }

        let expected = start + forward * 6.0;
        // far from the origin, so allow for f32 rounding
        assert!((one.camera.eye - expected).length() < 1e-2);
        assert!((many.camera.eye - expected).length() < 1e-2);
    }

    #[test]
    fn test_released_keys_stop_movement() {
        let mut ctx = context();
        let mut sink = RecordingSink::default();
        ctx.push_event(InputEvent::KeyDown(KeyCode::KeyA));
        ctx.push_event(InputEvent::KeyDown(KeyCode::KeyS));
        ctx.step(0.1, &mut sink).unwrap();

        ctx.push_event(InputEvent::KeyUp(KeyCode::KeyA));
        ctx.push_event(InputEvent::KeyUp(KeyCode::KeyS));
        let before = ctx.camera.eye;
        ctx.step(0.5, &mut sink).unwrap();
        assert_eq!(ctx.camera.eye, before);
    }

    #[test]
    fn test_focus_loss_releases_keys() {
        let mut ctx = context();
        let mut sink = RecordingSink::default();
        ctx.push_event(InputEvent::KeyDown(KeyCode::KeyD));
        ctx.push_event(InputEvent::FocusLost);
        let before = ctx.camera.eye;
        ctx.step(1.0, &mut sink).unwrap();
        assert_eq!(ctx.camera.eye, before);
    }

    #[test]
    fn test_water_time_counts_frames_not_seconds() {
        let mut ctx = context();
        let mut sink = RecordingSink::default();
        let initial = ctx.scene.water.time();
        for (i, dt) in [0.0, 3.0, 0.001, 0.5, 10.0].into_iter().cycle().take(120).enumerate() {
            ctx.step(dt, &mut sink).unwrap();
            let expected = initial + (i + 1) as f32 / 60.0;
            assert!((ctx.scene.water.time() - expected).abs() < 1e-5);
        }
        assert_eq!(ctx.frame_index(), 120);
    }

    #[test]
    fn test_frames_continue_with_failed_and_unresolved_loads() {
        let mut ctx = context();
        let mut sink = RecordingSink::default();
        let manifest = default_manifest();

        let mut handles: Vec<_> = manifest.into_iter().map(|p| ctx.assets_mut().defer(p)).collect();
        let never = handles.pop().unwrap(); // birds never resolve
        let dropped = handles.pop().unwrap(); // third island: sender dropped
        let failing = handles.pop().unwrap(); // second island: parse failure

        ctx.step(0.016, &mut sink).unwrap();
        assert_eq!(ctx.scene.fragment_count(), 0);

        failing.complete(Err(AssetError::MissingPositions("island".into())));
        drop(dropped);
        for handle in handles {
            handle.complete(Ok(fragment("model", vec![])));
        }
        for _ in 0..3 {
            ctx.step(0.016, &mut sink).unwrap();
        }

        assert_eq!(sink.submitted.len(), 4);
        assert_eq!(ctx.scene.fragment_count(), 2);
        assert_eq!(ctx.load_counts(), LoadCounts { loaded: 2, failed: 2, pending: 1 });
        assert_eq!(ctx.scene.statics(), [StaticObject::Water, StaticObject::Sky]);
        drop(never);
    }

    #[test]
    fn test_animated_model_registers_mixer() {
        let mut ctx = context();
        let mut sink = RecordingSink::default();
        let birds = default_manifest().pop().unwrap();
        ctx.assets_mut().defer(birds).complete(Ok(fragment("birds", vec![flap_clip()])));

        ctx.step(0.25, &mut sink).unwrap();
        assert_eq!(ctx.animations.len(), 1);
        let mixer = ctx.animations.iter().next().unwrap();
        assert!((mixer.time() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_submarine_pose_edits() {
        let mut ctx = context();
        let mut sink = RecordingSink::default();

        // edits before the model arrives are dropped
        ctx.push_event(InputEvent::SubmarinePose(Pose::default()));
        ctx.step(0.0, &mut sink).unwrap();
        assert_eq!(ctx.submarine_pose(), None);

        let sub = default_manifest().remove(0);
        ctx.assets_mut().defer(sub).complete(Ok(fragment("submarine", vec![])));
        ctx.step(0.0, &mut sink).unwrap();
        assert_eq!(ctx.submarine_pose().unwrap().position, Vec3::new(100.0, -150.0, 8500.0));

        let pose = Pose { position: Vec3::new(0.0, 0.0, 9000.0), rotation: Vec3::ZERO };
        ctx.push_event(InputEvent::SubmarinePose(pose));
        ctx.step(0.0, &mut sink).unwrap();
        assert_eq!(ctx.submarine_pose(), Some(pose));

        let root = ctx.scene.fragment_root("submarine").unwrap();
        let node = ctx.scene.node(root).unwrap();
        assert_eq!(node.transform.translation, pose.position);
        assert_eq!(node.transform.scale, Vec3::splat(3.0));
    }

    #[test]
    fn test_resize_and_sun_events() {
        let mut ctx = context();
        let mut sink = RecordingSink::default();
        let revision = ctx.scene.environment.as_ref().unwrap().revision;

        ctx.push_event(InputEvent::Resized { width: 0, height: 0 });
        ctx.push_event(InputEvent::Resized { width: 1000, height: 500 });
        ctx.push_event(InputEvent::SunChanged(SunParameters::new(30.0, 90.0)));
        ctx.step(0.0, &mut sink).unwrap();

        assert_eq!(sink.resizes, vec![(1000, 500)]);
        assert_eq!(ctx.camera.aspect, 2.0);
        assert_eq!(ctx.sun(), SunParameters::new(30.0, 90.0));
        assert_eq!(ctx.scene.environment.as_ref().unwrap().revision, revision + 1);
    }

    #[test]
    fn test_clock_deltas() {
        let start = Instant::now();
        let mut clock = Clock::new(None);
        assert_eq!(clock.tick_at(start), 0.0);
        assert!((clock.tick_at(start + Duration::from_millis(250)) - 0.25).abs() < 1e-6);

        // a long pause is preserved unless capped
        assert!((clock.tick_at(start + Duration::from_secs(10)) - 9.75).abs() < 1e-4);

        let mut capped = Clock::new(Some(0.1));
        capped.tick_at(start);
        assert_eq!(capped.tick_at(start + Duration::from_secs(3)), 0.1);
    }
}
