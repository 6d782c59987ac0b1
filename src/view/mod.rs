// VIEW: Rendering and graphics
pub mod gpu_init;
pub mod render;
pub mod uniforms;

pub use gpu_init::GpuContext;
pub use render::RenderState;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    IncompatibleSurface,

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
