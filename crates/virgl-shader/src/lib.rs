//! TGSI-to-GLSL shader translation.
//!
//! The pipeline is two passes over one decoded token stream: a declaration
//! pass that builds the [`context::TranslationCtx`] symbol tables, then an
//! instruction pass that emits the `main()` body while accumulating
//! requirement flags. Declarations and the version/extension preamble are
//! emitted last, once every requirement has settled. [`convert_shader`] is
//! the entry point; [`create_passthrough_tcs`] synthesizes the
//! tessellation-control stage for guest pipelines that omit one.

pub mod config;
pub mod context;
mod decls;
pub mod formats;
mod glsl;
pub mod limits;
pub mod requirements;
pub mod sinfo;
pub mod strbuf;
pub mod translate;

pub use config::{
    CompareFunc, LayoutLocation, LogicOp, ShaderCfg, ShaderKey, SoEntry, StreamOutput,
};
pub use limits::CapacityError;
pub use sinfo::{patch_vertex_shader_interpolants, ArrayInfo, InterpInfo, ShaderInfo};
pub use strbuf::ShaderParts;
pub use translate::{convert_shader, create_passthrough_tcs};

use thiserror::Error;

/// Translation failure. No partial text regions are produced alongside
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// The token stream itself is malformed.
    #[error("decode: {0}")]
    Decode(#[from] virgl_tgsi::DecodeError),

    /// A fixed translation table overflowed; the input may be well-formed
    /// but is too large for this implementation's limits.
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// The stream uses a construct this translator has no pattern for.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A text buffer overflowed its error-tracking bounds (unbalanced
    /// blocks or allocation failure); the emitted text is not valid.
    #[error("output buffer overflow")]
    Overflow,
}
