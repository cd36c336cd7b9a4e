//! WebGPU rendering module
//!
//! Uses SDF (Signed Distance Fields) for all gameplay shapes in the fragment
//! shader, with a bloom post-process on the entity layer.

pub mod bloom;
pub mod frame;
pub mod sdf_pipeline;

pub use frame::FrameData;
pub use sdf_pipeline::SdfRenderState;
