mod shader;

pub use shader::*;
