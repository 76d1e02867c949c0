//! Caller-supplied translation state: the per-host configuration and the
//! per-shader key describing cross-stage negotiated behavior.

use virgl_tgsi::Semantic;

use crate::limits::MAX_DRAW_BUFFERS;

/// Host capabilities fixed for the lifetime of a renderer.
#[derive(Debug, Clone)]
pub struct ShaderCfg {
    /// Target GLSL version (130/140/... or 300/310/320 for GLES).
    pub glsl_version: u32,
    pub use_gles: bool,
    pub max_draw_buffers: u32,
    /// Assign explicit attribute locations to vertex inputs.
    pub use_explicit_locations: bool,
    pub has_es31_compat: bool,
}

impl Default for ShaderCfg {
    fn default() -> Self {
        Self {
            glsl_version: 140,
            use_gles: false,
            max_draw_buffers: MAX_DRAW_BUFFERS as u32,
            use_explicit_locations: false,
            has_es31_compat: false,
        }
    }
}

/// Comparison function for alpha-test emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LEqual,
    Greater,
    NotEqual,
    GEqual,
    Always,
}

impl CompareFunc {
    /// GLSL operator whose *failure* causes the discard, or `None` when no
    /// comparison is emitted (NEVER discards everything, ALWAYS nothing).
    pub fn glsl_op(self) -> Option<&'static str> {
        match self {
            Self::Never | Self::Always => None,
            Self::Less => Some("<"),
            Self::Equal => Some("=="),
            Self::LEqual => Some("<="),
            Self::Greater => Some(">"),
            Self::NotEqual => Some("!="),
            Self::GEqual => Some(">="),
        }
    }
}

/// Framebuffer logic operation requested for emulation in the fragment
/// stage (hosts without native logic ops).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    Clear,
    Nor,
    AndInverted,
    CopyInverted,
    AndReverse,
    Invert,
    Xor,
    Nand,
    And,
    Equiv,
    Noop,
    OrInverted,
    Copy,
    OrReverse,
    Or,
    Set,
}

/// One transform-feedback capture entry, as negotiated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoEntry {
    pub register_index: u32,
    pub start_component: u32,
    pub num_components: u32,
    pub output_buffer: u32,
    pub dst_offset: u32,
    pub stream: u32,
}

/// Stream-output descriptor for the terminal vertex-family stage.
#[derive(Debug, Clone, Default)]
pub struct StreamOutput {
    pub entries: Vec<SoEntry>,
}

/// Location assignment exported by a stage for one Generic/Patch output,
/// consumed by the next stage to keep layouts consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutLocation {
    pub semantic: Semantic,
    pub sid: u32,
    pub location: u32,
}

/// Cross-shader negotiated state for one translation.
#[derive(Debug, Clone, Default)]
pub struct ShaderKey {
    pub flatshade: bool,
    pub color_two_side: bool,

    /// Alpha-test emulation; `None` disables the exit-path compare.
    pub alpha_test: Option<(CompareFunc, f32)>,

    /// Per-plane user clip enable mask; plane data is bound at draw time
    /// through the emitted `clipp` uniform.
    pub clip_plane_enable: u32,

    /// Logic-op emulation plus per-attachment component widths used to
    /// quantize the color before applying the op.
    pub logicop: Option<LogicOp>,
    pub surface_component_bits: [u8; MAX_DRAW_BUFFERS],

    /// Downstream/upstream stage presence; decides the per-vertex block
    /// shape and which stage applies the winsys correction.
    pub gs_present: bool,
    pub tcs_present: bool,
    pub tes_present: bool,

    /// Previous stage's exported state, for fragment-side consistency.
    pub prev_stage_num_clip_out: u32,
    pub prev_stage_num_cull_out: u32,
    pub prev_stage_generics: Vec<LayoutLocation>,
    pub prev_stage_patches: Vec<LayoutLocation>,

    /// Point-sprite coordinate replacement mask for fragment inputs.
    pub coord_replace: u32,

    /// The guest sent true array declarations (with array ids) rather than
    /// scalar ones for indirectly addressed IO.
    pub guest_sent_io_arrays: bool,

    /// Fragment exit-path rewrites.
    pub fs_swizzle_output_rgb_to_bgr: bool,
    pub cbufs_are_a8_bitmask: u32,
    pub fs_color0_writes_all_cbufs: bool,

    /// Apply the winsys Y-flip / prescale correction in this pipeline.
    pub winsys_adjust_y_emitted: bool,

    /// Stream output for the terminal vertex-family stage.
    pub stream_output: Option<StreamOutput>,

    /// Vertex count for a tessellation-control stage when the property is
    /// absent (passthrough synthesis).
    pub tcs_vertices_out: u32,
}

impl ShaderKey {
    pub fn clip_plane_count(&self) -> u32 {
        self.clip_plane_enable.count_ones()
    }

    /// The logic op to emulate, if any. COPY is the identity and needs no
    /// exit-path rewrite.
    pub fn logicop_emulated(&self) -> Option<LogicOp> {
        self.logicop.filter(|&op| op != LogicOp::Copy)
    }
}
