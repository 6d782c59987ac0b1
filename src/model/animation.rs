use glam::{Quat, Vec3, Vec4};

use crate::model::scene::{NodeId, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    /// Keyframes are stored as `[in_tangent, value, out_tangent]` triplets.
    CubicSpline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

/// Keyframed track driving one property of one node.
#[derive(Debug, Clone)]
pub struct AnimationChannel {
    /// Node index inside the owning fragment.
    pub target: usize,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    pub values: ChannelValues,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampled {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

impl AnimationChannel {
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    pub fn sample(&self, t: f32) -> Option<Sampled> {
        let (k, u, dt) = self.locate(t)?;
        let interp = self.interpolation;
        Some(match &self.values {
            ChannelValues::Translation(v) => Sampled::Translation(sample_vec3(v, interp, k, u, dt)?),
            ChannelValues::Scale(v) => Sampled::Scale(sample_vec3(v, interp, k, u, dt)?),
            ChannelValues::Rotation(v) => Sampled::Rotation(sample_quat(v, interp, k, u, dt)?),
        })
    }

    /// Keyframe index, normalized position within the segment and segment length.
    fn locate(&self, t: f32) -> Option<(usize, f32, f32)> {
        let first = *self.times.first()?;
        let last = self.times.len() - 1;
        if t <= first || last == 0 {
            return Some((0, 0.0, 0.0));
        }
        if t >= self.times[last] {
            return Some((last, 0.0, 0.0));
        }
        let k = self.times.partition_point(|&x| x <= t).saturating_sub(1);
        let dt = self.times[k + 1] - self.times[k];
        let u = if dt > 0.0 { (t - self.times[k]) / dt } else { 0.0 };
        Some((k, u, dt))
    }
}

fn key<T: Copy>(values: &[T], interp: Interpolation, k: usize) -> Option<T> {
    match interp {
        Interpolation::CubicSpline => values.get(3 * k + 1).copied(),
        _ => values.get(k).copied(),
    }
}

fn hermite(p0: Vec4, m0: Vec4, p1: Vec4, m1: Vec4, u: f32) -> Vec4 {
    let u2 = u * u;
    let u3 = u2 * u;
    p0 * (2.0 * u3 - 3.0 * u2 + 1.0) + m0 * (u3 - 2.0 * u2 + u) + p1 * (-2.0 * u3 + 3.0 * u2) + m1 * (u3 - u2)
}

fn sample_vec3(values: &[Vec3], interp: Interpolation, k: usize, u: f32, dt: f32) -> Option<Vec3> {
    let a = key(values, interp, k)?;
    if u == 0.0 || interp == Interpolation::Step {
        return Some(a);
    }
    let b = key(values, interp, k + 1)?;
    Some(match interp {
        Interpolation::Linear => a.lerp(b, u),
        Interpolation::CubicSpline => {
            let out_tangent = *values.get(3 * k + 2)?;
            let in_tangent = *values.get(3 * (k + 1))?;
            hermite(a.extend(0.0), (out_tangent * dt).extend(0.0), b.extend(0.0), (in_tangent * dt).extend(0.0), u).truncate()
        }
        Interpolation::Step => a,
    })
}

fn sample_quat(values: &[Quat], interp: Interpolation, k: usize, u: f32, dt: f32) -> Option<Quat> {
    let a = key(values, interp, k)?;
    if u == 0.0 || interp == Interpolation::Step {
        return Some(a.normalize());
    }
    let b = key(values, interp, k + 1)?;
    Some(match interp {
        Interpolation::Linear => a.normalize().slerp(b.normalize(), u),
        Interpolation::CubicSpline => {
            let out_tangent = Vec4::from(*values.get(3 * k + 2)?);
            let in_tangent = Vec4::from(*values.get(3 * (k + 1))?);
            Quat::from_vec4(hermite(Vec4::from(a), out_tangent * dt, Vec4::from(b), in_tangent * dt, u)).normalize()
        }
        Interpolation::Step => a,
    })
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<AnimationChannel>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<AnimationChannel>) -> Self {
        let duration = channels.iter().map(AnimationChannel::end_time).fold(0.0, f32::max);
        Self { name: name.into(), duration, channels }
    }
}

/// Plays every clip of one model in a loop on a shared time base.
pub struct AnimationMixer {
    name: String,
    time: f32,
    clips: Vec<AnimationClip>,
    /// Scene node for each fragment node index used by the channels.
    bindings: Vec<NodeId>,
}

impl AnimationMixer {
    pub fn new(name: impl Into<String>, clips: Vec<AnimationClip>, bindings: Vec<NodeId>) -> Self {
        Self {
            name: name.into(),
            time: 0.0,
            clips,
            bindings,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        self.time += dt;
        for clip in &self.clips {
            let local = if clip.duration > 0.0 { self.time.rem_euclid(clip.duration) } else { 0.0 };
            for channel in &clip.channels {
                let Some(node) = self.bindings.get(channel.target).and_then(|&id| scene.node_mut(id)) else {
                    continue;
                };
                match channel.sample(local) {
                    Some(Sampled::Translation(t)) => node.transform.translation = t,
                    Some(Sampled::Rotation(r)) => node.transform.rotation = r,
                    Some(Sampled::Scale(s)) => node.transform.scale = s,
                    None => {}
                }
            }
        }
    }
}

/// Append-only list of mixers, all driven by the frame delta.
#[derive(Default)]
pub struct AnimationRegistry {
    mixers: Vec<AnimationMixer>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self { mixers: Vec::new() }
    }

    pub fn register(&mut self, mixer: AnimationMixer) {
        tracing::debug!("mixer {} registered with {} clips", mixer.name, mixer.clips.len());
        self.mixers.push(mixer);
    }

    pub fn len(&self) -> usize {
        self.mixers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mixers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimationMixer> {
        self.mixers.iter()
    }

    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        for mixer in &mut self.mixers {
            mixer.update(dt, scene);
        }
    }
}
