use thiserror::Error;

pub type SketchResult<T> = Result<T, SketchError>;

#[derive(Debug, Error)]
pub enum SketchError {
    #[error("failed to create {label}: {message}")]
    ResourceCreation { label: String, message: String },

    #[error("no compatible graphics adapter found")]
    AdapterNotFound,

    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("{particles} particles need more than {max} workgroups")]
    DispatchTooLarge { particles: u32, max: u32 },

    #[error("skin has {joints} joints but {inverse_bind_matrices} inverse bind matrices")]
    SkinMismatch {
        joints: usize,
        inverse_bind_matrices: usize,
    },

    #[error("unknown shader snippet: {0}")]
    UnknownShader(String),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("particle read-back failed: {0}")]
    ReadBack(String),

    #[error("invalid config: {0}")]
    Config(String),
}
