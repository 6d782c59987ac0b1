use std::f32::consts::TAU;

use egui::Context;
use glam::Vec3;

use crate::controller::{InputEvent, LoadCounts};
use crate::model::sun::{AZIMUTH_RANGE, ELEVATION_RANGE};
use crate::model::{Pose, SunParameters};

/// Values shown in the panels for one frame.
#[derive(Debug, Clone, Copy)]
pub struct UiSnapshot {
    pub sun: SunParameters,
    pub submarine: Option<Pose>,
    pub camera_eye: Vec3,
    pub loads: LoadCounts,
    pub dt: f32,
}

/// Build the panels and return egui output plus the edits made this frame.
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, snapshot: &UiSnapshot) -> (egui::FullOutput, Vec<InputEvent>) {
    let mut events = Vec::new();
    let output = egui_ctx.run(raw_input, |ctx| {
        if let Some(sun) = draw_sun_window(ctx, snapshot.sun) {
            events.push(InputEvent::SunChanged(sun));
        }
        if let Some(pose) = snapshot.submarine.and_then(|pose| draw_submarine_window(ctx, pose)) {
            events.push(InputEvent::SubmarinePose(pose));
        }
        draw_debug_window(ctx, snapshot);
    });
    (output, events)
}

fn draw_sun_window(ctx: &Context, sun: SunParameters) -> Option<SunParameters> {
    let mut edited = sun;
    let mut changed = false;
    egui::Window::new("Sun")
        .default_pos([8.0, 140.0])
        .show(ctx, |ui| {
            changed |= ui
                .add(egui::Slider::new(&mut edited.elevation, ELEVATION_RANGE).step_by(0.1).text("elevation"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut edited.azimuth, AZIMUTH_RANGE).step_by(0.1).text("azimuth"))
                .changed();
        });
    changed.then(|| edited.clamped())
}

fn draw_submarine_window(ctx: &Context, pose: Pose) -> Option<Pose> {
    let mut edited = pose;
    let mut changed = false;
    egui::Window::new("Submarine Position")
        .default_pos([8.0, 240.0])
        .show(ctx, |ui| {
            changed |= ui.add(egui::Slider::new(&mut edited.position.x, -1000.0..=1000.0).text("Move X")).changed();
            changed |= ui.add(egui::Slider::new(&mut edited.position.y, -1000.0..=1000.0).text("Move Y")).changed();
            changed |= ui.add(egui::Slider::new(&mut edited.position.z, -1000.0..=10000.0).text("Move Z")).changed();
            ui.separator();
            changed |= ui.add(egui::Slider::new(&mut edited.rotation.x, 0.0..=TAU).text("Rotate X")).changed();
            changed |= ui.add(egui::Slider::new(&mut edited.rotation.y, 0.0..=TAU).text("Rotate Y")).changed();
            changed |= ui.add(egui::Slider::new(&mut edited.rotation.z, 0.0..=TAU).text("Rotate Z")).changed();
        });
    changed.then_some(edited)
}

fn draw_debug_window(ctx: &Context, snapshot: &UiSnapshot) {
    let eye = snapshot.camera_eye;
    let loads = snapshot.loads;
    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {:.0}", if snapshot.dt > 0.0 { 1.0 / snapshot.dt } else { 0.0 })).small());
            ui.label(egui::RichText::new(format!("Pos: x: {:.0} y: {:.0} z: {:.0}", eye.x, eye.y, eye.z)).small());
            ui.label(
                egui::RichText::new(format!(
                    "Models: {} loaded, {} failed, {} pending",
                    loads.loaded, loads.failed, loads.pending
                ))
                .small(),
            );
            ui.separator();
            ui.label(egui::RichText::new("Controls:").small());
            ui.label(egui::RichText::new("WASD - Move").small());
            ui.label(egui::RichText::new("Left drag - Look").small());
        });
}
