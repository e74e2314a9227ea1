//! wgpu backend for [`ShaderDevice`](crate::device::ShaderDevice).
//!
//! - `context` owns the instance, device and the offscreen colour target.
//! - `pipeline` builds one render pipeline per linked program against a
//!   single bind group layout (parameter block plus palette).
//! - `uniforms` holds each program's parameter buffer, the shared palette
//!   buffer and the blocking readback helpers.
//! - `device` maps the shader/program object model onto the above.

mod context;
mod device;
mod pipeline;
mod uniforms;

pub use context::GpuPowerPreference;
pub use device::WgpuDevice;
