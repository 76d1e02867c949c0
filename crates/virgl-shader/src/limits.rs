//! Fixed capacities of the translation tables.
//!
//! The token stream is guest-controlled, so every table that grows from
//! declarations has a hard ceiling; exceeding one is a [`CapacityError`],
//! never a silent truncation.

use thiserror::Error;

/// Declared input slots per stage.
pub const MAX_INPUTS: usize = 64;

/// Declared output slots per stage.
pub const MAX_OUTPUTS: usize = 64;

/// Declared system-value slots.
pub const MAX_SYSTEM_VALUES: usize = 32;

/// Sampler units; also bounds the coalesced sampler-array table.
pub const MAX_SAMPLERS: usize = 32;

/// Image units.
pub const MAX_IMAGES: usize = 32;

/// Shader-storage buffer bindings.
pub const MAX_SSBOS: usize = 32;

/// Uniform-buffer bindings, including the reserved flat-constant slot 0.
pub const MAX_UBOS: usize = 32;

/// Immediate constant vectors.
pub const MAX_IMMEDIATES: usize = 1024;

/// Contiguous temporary-register ranges.
pub const MAX_TEMP_RANGES: usize = 256;

/// Stream-output capture entries.
pub const MAX_SO_OUTPUTS: usize = 64;

/// Hardware atomic-counter buffer declarations.
pub const MAX_HW_ATOMICS: usize = 32;

/// User clip planes selectable through the clip-plane enable mask.
pub const MAX_CLIP_PLANES: usize = 8;

/// Lanes available to `gl_ClipDistance` plus `gl_CullDistance` combined.
pub const MAX_CLIP_CULL_LANES: u32 = 8;

/// Color attachments the fragment exit path may touch.
pub const MAX_DRAW_BUFFERS: usize = 8;

/// A fixed table overflowed. Distinct from a decode error so callers can
/// tell "bad input" from "shader too large for these limits".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{table} capacity of {limit} exceeded")]
pub struct CapacityError {
    pub table: &'static str,
    pub limit: usize,
}

impl CapacityError {
    pub fn new(table: &'static str, limit: usize) -> Self {
        Self { table, limit }
    }
}
