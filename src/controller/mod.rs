// CONTROLLER: Input, environment updates and the per-frame loop
pub mod camera_controller;
pub mod environment;
pub mod frame_loop;
pub mod input;

pub use camera_controller::CameraController;
pub use environment::EnvironmentUpdater;
pub use frame_loop::{Clock, FrameLoopContext, FrameSink, LoadCounts};
pub use input::{InputEvent, KeyBindings, Movement, MovementState};
