use std::f32::consts::PI;

use glam::Vec3;

// Preetham daylight model constants
const TOTAL_RAYLEIGH: Vec3 = Vec3::new(5.804_543e-6, 1.356_291_1e-5, 3.026_590_2e-5);
const MIE_CONST: Vec3 = Vec3::new(1.839_991_9e14, 2.779_802_4e14, 4.079_048e14);
const CUTOFF_ANGLE: f32 = 1.611_073_2;
const STEEPNESS: f32 = 1.5;
const EE: f32 = 1000.0;
const SUN_ANGULAR_DIAMETER_COS: f32 = 0.999_956_7;
const THREE_OVER_SIXTEEN_PI: f32 = 0.059_683_104;
const ONE_OVER_FOUR_PI: f32 = 0.079_577_47;
const RAYLEIGH_ZENITH_LENGTH: f32 = 8.4e3;
const MIE_ZENITH_LENGTH: f32 = 1.25e3;

/// Radiance values above this are clipped before they go into the
/// environment map so the sun disk cannot dominate the filtered result.
const MAX_BAKED_RADIANCE: f32 = 16.0;

/// Uniform state of the analytic sky dome.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyMaterial {
    pub sun_position: Vec3,
    pub turbidity: f32,
    pub rayleigh: f32,
    pub mie_coefficient: f32,
    pub mie_directional_g: f32,
}

impl Default for SkyMaterial {
    fn default() -> Self {
        Self {
            sun_position: Vec3::Y,
            turbidity: 10.0,
            rayleigh: 2.0,
            mie_coefficient: 0.005,
            mie_directional_g: 0.8,
        }
    }
}

impl SkyMaterial {
    /// Sky color seen along `direction` (need not be normalized).
    ///
    /// Mirrors `shaders/sky.wgsl` so baked lighting matches the drawn dome.
    pub fn radiance(&self, direction: Vec3) -> Vec3 {
        let up = Vec3::Y;
        let sun_dir = self.sun_position.normalize_or_zero();

        let sun_e = sun_intensity(sun_dir.dot(up));
        let sun_fade = 1.0 - (1.0 - (self.sun_position.y / 450_000.0).exp()).clamp(0.0, 1.0);
        let rayleigh_coefficient = self.rayleigh - (1.0 - sun_fade);
        let beta_r = TOTAL_RAYLEIGH * rayleigh_coefficient;
        let beta_m = total_mie(self.turbidity) * self.mie_coefficient;

        let direction = direction.normalize_or_zero();
        let zenith_angle = up.dot(direction).max(0.0).acos();
        let inverse = 1.0
            / (zenith_angle.cos()
                + 0.15 * (93.885 - zenith_angle * 180.0 / PI).powf(-1.253));
        let s_r = RAYLEIGH_ZENITH_LENGTH * inverse;
        let s_m = MIE_ZENITH_LENGTH * inverse;

        let fex = vexp(-(beta_r * s_r + beta_m * s_m));

        let cos_theta = direction.dot(sun_dir);
        let beta_r_theta = beta_r * rayleigh_phase(cos_theta * 0.5 + 0.5);
        let beta_m_theta = beta_m * hg_phase(cos_theta, self.mie_directional_g);

        let scatter = (beta_r_theta + beta_m_theta) / (beta_r + beta_m);
        let mut lin = vpow(sun_e * scatter * (Vec3::ONE - fex), 1.5);
        let horizon_mix = (1.0 - up.dot(sun_dir)).powf(5.0).clamp(0.0, 1.0);
        lin *= Vec3::ONE.lerp(vpow(sun_e * scatter * fex, 0.5), horizon_mix);

        let mut l0 = Vec3::splat(0.1) * fex;
        let sundisk = smoothstep(
            SUN_ANGULAR_DIAMETER_COS,
            SUN_ANGULAR_DIAMETER_COS + 0.00002,
            cos_theta,
        );
        l0 += sun_e * 19000.0 * fex * sundisk;

        let tex_color = (lin + l0) * 0.04 + Vec3::new(0.0, 0.0003, 0.00075);
        vpow(tex_color, 1.0 / (1.2 + 1.2 * sun_fade))
    }
}

/// Pre-filtered equirectangular radiance map baked from the sky.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<Vec3>,
    /// Cosine-weighted average radiance over the upper hemisphere.
    pub ambient: Vec3,
    /// Increases every bake so GPU copies know when to refresh.
    pub revision: u64,
}

impl EnvironmentMap {
    pub fn bake(sky: &SkyMaterial, width: u32, height: u32, revision: u64) -> Self {
        let width = width.max(4);
        let height = height.max(2);

        let mut raw = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let dir = texel_direction(x, y, width, height);
                let l = sky.radiance(dir);
                raw.push(sanitize(l));
            }
        }

        let texels = box_filter(&raw, width, height);
        let ambient = hemisphere_average(&texels, width, height);

        Self { width, height, texels, ambient, revision }
    }

    /// Nearest texel along `direction`.
    pub fn sample(&self, direction: Vec3) -> Vec3 {
        let d = direction.normalize_or_zero();
        let u = d.z.atan2(d.x) / (2.0 * PI) + 0.5;
        let v = d.y.clamp(-1.0, 1.0).acos() / PI;
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.texels[(y * self.width + x) as usize]
    }

    /// Texels as RGBA8, clamped into the displayable range.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.texels.len() * 4);
        for t in &self.texels {
            let c = t.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
            out.extend_from_slice(&[c.x as u8, c.y as u8, c.z as u8, 255]);
        }
        out
    }
}

/// World direction through the center of texel (x, y).
pub fn texel_direction(x: u32, y: u32, width: u32, height: u32) -> Vec3 {
    let u = (x as f32 + 0.5) / width as f32;
    let v = (y as f32 + 0.5) / height as f32;
    let phi = (u - 0.5) * 2.0 * PI;
    let theta = v * PI;
    Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
}

fn box_filter(src: &[Vec3], width: u32, height: u32) -> Vec<Vec3> {
    let (w, h) = (width as i64, height as i64);
    let mut out = Vec::with_capacity(src.len());
    for y in 0..h {
        for x in 0..w {
            let mut sum = Vec3::ZERO;
            let mut n = 0.0;
            for dy in -1..=1 {
                let sy = y + dy;
                if sy < 0 || sy >= h {
                    continue;
                }
                for dx in -1..=1 {
                    // longitude wraps around
                    let sx = (x + dx).rem_euclid(w);
                    sum += src[(sy * w + sx) as usize];
                    n += 1.0;
                }
            }
            out.push(sum / n);
        }
    }
    out
}

fn hemisphere_average(texels: &[Vec3], width: u32, height: u32) -> Vec3 {
    let mut sum = Vec3::ZERO;
    let mut weight = 0.0;
    for y in 0..height {
        let theta = (y as f32 + 0.5) / height as f32 * PI;
        let cos_theta = theta.cos();
        if cos_theta <= 0.0 {
            continue;
        }
        // texel solid angle is proportional to sin(theta)
        let w = cos_theta * theta.sin();
        for x in 0..width {
            sum += texels[(y * width + x) as usize] * w;
            weight += w;
        }
    }
    if weight > 0.0 { sum / weight } else { Vec3::ZERO }
}

fn sanitize(v: Vec3) -> Vec3 {
    let fix = |c: f32| if c.is_finite() { c.clamp(0.0, MAX_BAKED_RADIANCE) } else { 0.0 };
    Vec3::new(fix(v.x), fix(v.y), fix(v.z))
}

fn sun_intensity(zenith_angle_cos: f32) -> f32 {
    let zenith_angle_cos = zenith_angle_cos.clamp(-1.0, 1.0);
    EE * (1.0 - (-((CUTOFF_ANGLE - zenith_angle_cos.acos()) / STEEPNESS)).exp()).max(0.0)
}

fn total_mie(turbidity: f32) -> Vec3 {
    let c = (0.2 * turbidity) * 10e-18;
    0.434 * c * MIE_CONST
}

fn rayleigh_phase(cos_theta: f32) -> f32 {
    THREE_OVER_SIXTEEN_PI * (1.0 + cos_theta * cos_theta)
}

fn hg_phase(cos_theta: f32, g: f32) -> f32 {
    let g2 = g * g;
    let inverse = 1.0 / (1.0 - 2.0 * g * cos_theta + g2).powf(1.5);
    ONE_OVER_FOUR_PI * ((1.0 - g2) * inverse)
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn vexp(v: Vec3) -> Vec3 {
    Vec3::new(v.x.exp(), v.y.exp(), v.z.exp())
}

fn vpow(v: Vec3, p: f32) -> Vec3 {
    Vec3::new(v.x.powf(p), v.y.powf(p), v.z.powf(p))
}
