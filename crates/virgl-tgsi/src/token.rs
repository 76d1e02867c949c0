//! TGSI token-stream vocabulary: processors, register files, semantics,
//! opcodes, and the bit layouts of each 32-bit token word.
//!
//! The wire format is a flat sequence of little-endian 32-bit words. Every
//! record (declaration, immediate, instruction, property) starts with a word
//! whose low 4 bits carry the token type and whose `nr_tokens` field gives
//! the total record size in words, including the leading word itself.
//!
//! Bit-field packing is compiler- and endianness-dependent in C, so this
//! module exposes the layouts as explicit shift/mask accessors instead of
//! repr(C) structs.

/// Shader processor (stage) kinds, as carried in the second header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Processor {
    Fragment,
    Vertex,
    Geometry,
    TessCtrl,
    TessEval,
    Compute,
}

impl Processor {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Fragment,
            1 => Self::Vertex,
            2 => Self::Geometry,
            3 => Self::TessCtrl,
            4 => Self::TessEval,
            5 => Self::Compute,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Fragment => 0,
            Self::Vertex => 1,
            Self::Geometry => 2,
            Self::TessCtrl => 3,
            Self::TessEval => 4,
            Self::Compute => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Fragment => "frag",
            Self::Vertex => "vert",
            Self::Geometry => "geom",
            Self::TessCtrl => "tesc",
            Self::TessEval => "tese",
            Self::Compute => "comp",
        }
    }

    /// Vertex-family stages feed the rasterizer through `gl_Position`.
    pub fn is_vertex_family(self) -> bool {
        matches!(
            self,
            Self::Vertex | Self::Geometry | Self::TessCtrl | Self::TessEval
        )
    }
}

/// Top-level token record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Declaration,
    Immediate,
    Instruction,
    Property,
}

impl TokenKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Declaration,
            1 => Self::Immediate,
            2 => Self::Instruction,
            3 => Self::Property,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Declaration => 0,
            Self::Immediate => 1,
            Self::Instruction => 2,
            Self::Property => 3,
        }
    }
}

/// Register files an operand or declaration may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterFile {
    Null,
    Constant,
    Input,
    Output,
    Temporary,
    Sampler,
    Address,
    Immediate,
    Predicate,
    SystemValue,
    Image,
    SamplerView,
    Buffer,
    Memory,
    HwAtomic,
}

/// Number of register-file kinds; sizes per-file mask/count arrays.
pub const FILE_COUNT: usize = 15;

impl RegisterFile {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Null,
            1 => Self::Constant,
            2 => Self::Input,
            3 => Self::Output,
            4 => Self::Temporary,
            5 => Self::Sampler,
            6 => Self::Address,
            7 => Self::Immediate,
            8 => Self::Predicate,
            9 => Self::SystemValue,
            10 => Self::Image,
            11 => Self::SamplerView,
            12 => Self::Buffer,
            13 => Self::Memory,
            14 => Self::HwAtomic,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Null => 0,
            Self::Constant => 1,
            Self::Input => 2,
            Self::Output => 3,
            Self::Temporary => 4,
            Self::Sampler => 5,
            Self::Address => 6,
            Self::Immediate => 7,
            Self::Predicate => 8,
            Self::SystemValue => 9,
            Self::Image => 10,
            Self::SamplerView => 11,
            Self::Buffer => 12,
            Self::Memory => 13,
            Self::HwAtomic => 14,
        }
    }

    /// Stable index into per-file statistic arrays.
    pub fn index(self) -> usize {
        self.raw() as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Constant => "CONST",
            Self::Input => "IN",
            Self::Output => "OUT",
            Self::Temporary => "TEMP",
            Self::Sampler => "SAMP",
            Self::Address => "ADDR",
            Self::Immediate => "IMM",
            Self::Predicate => "PRED",
            Self::SystemValue => "SV",
            Self::Image => "IMAGE",
            Self::SamplerView => "SVIEW",
            Self::Buffer => "BUFFER",
            Self::Memory => "MEMORY",
            Self::HwAtomic => "HWATOMIC",
        }
    }
}

/// Semantic role of an IO register, independent of its register index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Color,
    BColor,
    Fog,
    PointSize,
    Generic,
    Normal,
    Face,
    EdgeFlag,
    PrimId,
    InstanceId,
    VertexId,
    Stencil,
    ClipDist,
    ClipVertex,
    GridSize,
    BlockId,
    BlockSize,
    ThreadId,
    TexCoord,
    PCoord,
    ViewportIndex,
    Layer,
    CullDist,
    SampleId,
    SamplePos,
    SampleMask,
    InvocationId,
    VertexIdNoBase,
    BaseVertex,
    Patch,
    TessCoord,
    TessOuter,
    TessInner,
    VerticesIn,
    HelperInvocation,
}

impl Semantic {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Position,
            1 => Self::Color,
            2 => Self::BColor,
            3 => Self::Fog,
            4 => Self::PointSize,
            5 => Self::Generic,
            6 => Self::Normal,
            7 => Self::Face,
            8 => Self::EdgeFlag,
            9 => Self::PrimId,
            10 => Self::InstanceId,
            11 => Self::VertexId,
            12 => Self::Stencil,
            13 => Self::ClipDist,
            14 => Self::ClipVertex,
            15 => Self::GridSize,
            16 => Self::BlockId,
            17 => Self::BlockSize,
            18 => Self::ThreadId,
            19 => Self::TexCoord,
            20 => Self::PCoord,
            21 => Self::ViewportIndex,
            22 => Self::Layer,
            23 => Self::CullDist,
            24 => Self::SampleId,
            25 => Self::SamplePos,
            26 => Self::SampleMask,
            27 => Self::InvocationId,
            28 => Self::VertexIdNoBase,
            29 => Self::BaseVertex,
            30 => Self::Patch,
            31 => Self::TessCoord,
            32 => Self::TessOuter,
            33 => Self::TessInner,
            34 => Self::VerticesIn,
            35 => Self::HelperInvocation,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Color => 1,
            Self::BColor => 2,
            Self::Fog => 3,
            Self::PointSize => 4,
            Self::Generic => 5,
            Self::Normal => 6,
            Self::Face => 7,
            Self::EdgeFlag => 8,
            Self::PrimId => 9,
            Self::InstanceId => 10,
            Self::VertexId => 11,
            Self::Stencil => 12,
            Self::ClipDist => 13,
            Self::ClipVertex => 14,
            Self::GridSize => 15,
            Self::BlockId => 16,
            Self::BlockSize => 17,
            Self::ThreadId => 18,
            Self::TexCoord => 19,
            Self::PCoord => 20,
            Self::ViewportIndex => 21,
            Self::Layer => 22,
            Self::CullDist => 23,
            Self::SampleId => 24,
            Self::SamplePos => 25,
            Self::SampleMask => 26,
            Self::InvocationId => 27,
            Self::VertexIdNoBase => 28,
            Self::BaseVertex => 29,
            Self::Patch => 30,
            Self::TessCoord => 31,
            Self::TessOuter => 32,
            Self::TessInner => 33,
            Self::VerticesIn => 34,
            Self::HelperInvocation => 35,
        }
    }
}

/// Interpolation mode of a fragment input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Constant,
    Linear,
    Perspective,
    /// Color inputs pick smooth or flat at link time depending on the
    /// flat-shade state.
    Color,
}

impl Interpolation {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Constant,
            1 => Self::Linear,
            2 => Self::Perspective,
            3 => Self::Color,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Constant => 0,
            Self::Linear => 1,
            Self::Perspective => 2,
            Self::Color => 3,
        }
    }
}

/// Where a fragment input is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolateLoc {
    #[default]
    Center,
    Centroid,
    Sample,
}

impl InterpolateLoc {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Center,
            1 => Self::Centroid,
            2 => Self::Sample,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Center => 0,
            Self::Centroid => 1,
            Self::Sample => 2,
        }
    }
}

/// Texture target of a sampler view, image, or texture instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Buffer,
    Tex1D,
    Tex2D,
    Tex3D,
    Cube,
    Rect,
    Shadow1D,
    Shadow2D,
    ShadowRect,
    Tex1DArray,
    Tex2DArray,
    Shadow1DArray,
    Shadow2DArray,
    ShadowCube,
    Tex2DMsaa,
    Tex2DArrayMsaa,
    CubeArray,
    ShadowCubeArray,
}

impl TextureTarget {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Buffer,
            1 => Self::Tex1D,
            2 => Self::Tex2D,
            3 => Self::Tex3D,
            4 => Self::Cube,
            5 => Self::Rect,
            6 => Self::Shadow1D,
            7 => Self::Shadow2D,
            8 => Self::ShadowRect,
            9 => Self::Tex1DArray,
            10 => Self::Tex2DArray,
            11 => Self::Shadow1DArray,
            12 => Self::Shadow2DArray,
            13 => Self::ShadowCube,
            14 => Self::Tex2DMsaa,
            15 => Self::Tex2DArrayMsaa,
            16 => Self::CubeArray,
            17 => Self::ShadowCubeArray,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Buffer => 0,
            Self::Tex1D => 1,
            Self::Tex2D => 2,
            Self::Tex3D => 3,
            Self::Cube => 4,
            Self::Rect => 5,
            Self::Shadow1D => 6,
            Self::Shadow2D => 7,
            Self::ShadowRect => 8,
            Self::Tex1DArray => 9,
            Self::Tex2DArray => 10,
            Self::Shadow1DArray => 11,
            Self::Shadow2DArray => 12,
            Self::ShadowCube => 13,
            Self::Tex2DMsaa => 14,
            Self::Tex2DArrayMsaa => 15,
            Self::CubeArray => 16,
            Self::ShadowCubeArray => 17,
        }
    }

    /// Depth-compare samplers take an extra comparison coordinate.
    pub fn is_shadow(self) -> bool {
        matches!(
            self,
            Self::Shadow1D
                | Self::Shadow2D
                | Self::ShadowRect
                | Self::Shadow1DArray
                | Self::Shadow2DArray
                | Self::ShadowCube
                | Self::ShadowCubeArray
        )
    }

    pub fn is_msaa(self) -> bool {
        matches!(self, Self::Tex2DMsaa | Self::Tex2DArrayMsaa)
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            Self::Tex1DArray
                | Self::Tex2DArray
                | Self::Shadow1DArray
                | Self::Shadow2DArray
                | Self::Tex2DArrayMsaa
                | Self::CubeArray
                | Self::ShadowCubeArray
        )
    }

    pub fn is_rect(self) -> bool {
        matches!(self, Self::Rect | Self::ShadowRect)
    }

    /// Number of coordinate lanes consumed when sampling this target,
    /// excluding any shadow comparison or array layer lane.
    pub fn coord_components(self) -> u32 {
        match self {
            Self::Buffer | Self::Tex1D | Self::Shadow1D => 1,
            Self::Tex2D
            | Self::Rect
            | Self::Shadow2D
            | Self::ShadowRect
            | Self::Tex1DArray
            | Self::Shadow1DArray
            | Self::Tex2DMsaa => 2,
            Self::Tex3D
            | Self::Cube
            | Self::ShadowCube
            | Self::Tex2DArray
            | Self::Shadow2DArray
            | Self::Tex2DArrayMsaa => 3,
            Self::CubeArray | Self::ShadowCubeArray => 4,
        }
    }
}

/// Per-component return type of a sampler view or image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnType {
    Unorm,
    Snorm,
    Sint,
    Uint,
    #[default]
    Float,
}

impl ReturnType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Unorm,
            1 => Self::Snorm,
            2 => Self::Sint,
            3 => Self::Uint,
            4 => Self::Float,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Unorm => 0,
            Self::Snorm => 1,
            Self::Sint => 2,
            Self::Uint => 3,
            Self::Float => 4,
        }
    }
}

/// Element type of an immediate constant vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateType {
    Float32,
    Uint32,
    Int32,
    /// Each double occupies two consecutive 32-bit data words.
    Float64,
}

impl ImmediateType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Float32,
            1 => Self::Uint32,
            2 => Self::Int32,
            3 => Self::Float64,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Float32 => 0,
            Self::Uint32 => 1,
            Self::Int32 => 2,
            Self::Float64 => 3,
        }
    }
}

/// Shader-level property names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    GsInputPrim,
    GsOutputPrim,
    GsMaxOutputVertices,
    FsCoordOrigin,
    FsCoordPixelCenter,
    FsColor0WritesAllCbufs,
    FsDepthLayout,
    VsProhibitUcps,
    GsInvocations,
    VsWindowSpacePosition,
    TcsVerticesOut,
    TesPrimMode,
    TesSpacing,
    TesVertexOrderCw,
    TesPointMode,
    NumClipDistEnabled,
    NumCullDistEnabled,
    FsEarlyDepthStencil,
    FsPostDepthCoverage,
    NextShader,
    CsFixedBlockWidth,
    CsFixedBlockHeight,
    CsFixedBlockDepth,
    MulZeroWins,
}

/// Number of property names; sizes the scanner's property table.
pub const PROPERTY_COUNT: usize = 24;

impl Property {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::GsInputPrim,
            1 => Self::GsOutputPrim,
            2 => Self::GsMaxOutputVertices,
            3 => Self::FsCoordOrigin,
            4 => Self::FsCoordPixelCenter,
            5 => Self::FsColor0WritesAllCbufs,
            6 => Self::FsDepthLayout,
            7 => Self::VsProhibitUcps,
            8 => Self::GsInvocations,
            9 => Self::VsWindowSpacePosition,
            10 => Self::TcsVerticesOut,
            11 => Self::TesPrimMode,
            12 => Self::TesSpacing,
            13 => Self::TesVertexOrderCw,
            14 => Self::TesPointMode,
            15 => Self::NumClipDistEnabled,
            16 => Self::NumCullDistEnabled,
            17 => Self::FsEarlyDepthStencil,
            18 => Self::FsPostDepthCoverage,
            19 => Self::NextShader,
            20 => Self::CsFixedBlockWidth,
            21 => Self::CsFixedBlockHeight,
            22 => Self::CsFixedBlockDepth,
            23 => Self::MulZeroWins,
            _ => return None,
        })
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::GsInputPrim => 0,
            Self::GsOutputPrim => 1,
            Self::GsMaxOutputVertices => 2,
            Self::FsCoordOrigin => 3,
            Self::FsCoordPixelCenter => 4,
            Self::FsColor0WritesAllCbufs => 5,
            Self::FsDepthLayout => 6,
            Self::VsProhibitUcps => 7,
            Self::GsInvocations => 8,
            Self::VsWindowSpacePosition => 9,
            Self::TcsVerticesOut => 10,
            Self::TesPrimMode => 11,
            Self::TesSpacing => 12,
            Self::TesVertexOrderCw => 13,
            Self::TesPointMode => 14,
            Self::NumClipDistEnabled => 15,
            Self::NumCullDistEnabled => 16,
            Self::FsEarlyDepthStencil => 17,
            Self::FsPostDepthCoverage => 18,
            Self::NextShader => 19,
            Self::CsFixedBlockWidth => 20,
            Self::CsFixedBlockHeight => 21,
            Self::CsFixedBlockDepth => 22,
            Self::MulZeroWins => 23,
        }
    }
}

/// One swizzle lane selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swizzle {
    X,
    Y,
    Z,
    W,
}

impl Swizzle {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x3 {
            0 => Self::X,
            1 => Self::Y,
            2 => Self::Z,
            _ => Self::W,
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
            Self::W => 3,
        }
    }

    pub fn lane(self) -> usize {
        self.raw() as usize
    }

    pub fn letter(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
            Self::Z => 'z',
            Self::W => 'w',
        }
    }
}

/// Memory access qualifier bits carried by LOAD/STORE instructions and
/// buffer declarations.
pub const MEMORY_COHERENT: u32 = 1 << 0;
pub const MEMORY_RESTRICT: u32 = 1 << 1;
pub const MEMORY_VOLATILE: u32 = 1 << 2;

/// Write-mask lane bits.
pub const WRITEMASK_X: u8 = 0x1;
pub const WRITEMASK_Y: u8 = 0x2;
pub const WRITEMASK_Z: u8 = 0x4;
pub const WRITEMASK_W: u8 = 0x8;
pub const WRITEMASK_XYZW: u8 = 0xF;

/// TGSI opcodes (the virglrenderer numbering, which keeps retired Mesa
/// opcodes as permanent gaps). Unknown values inside the gaps are preserved
/// so the scanner can still histogram partially supported streams; the code
/// generator rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Arl,
    Mov,
    Lit,
    Rcp,
    Rsq,
    Exp,
    Log,
    Mul,
    Add,
    Dp3,
    Dp4,
    Dst,
    Min,
    Max,
    Slt,
    Sge,
    Mad,
    Sub,
    Lrp,
    Fma,
    Sqrt,
    Frc,
    Flr,
    Round,
    Ex2,
    Lg2,
    Pow,
    Xpd,
    Abs,
    Dph,
    Cos,
    Ddx,
    Ddy,
    Kill,
    Pk2h,
    Pk2us,
    Pk4b,
    Pk4ub,
    Seq,
    Sgt,
    Sin,
    Sle,
    Sne,
    Tex,
    Txd,
    Txp,
    Up2h,
    Up2us,
    Up4b,
    Up4ub,
    Arr,
    Cal,
    Ret,
    Ssg,
    Cmp,
    Scs,
    Txb,
    FbFetch,
    Div,
    Dp2,
    Txl,
    Brk,
    If,
    Uif,
    Else,
    EndIf,
    DdxFine,
    DdyFine,
    Ceil,
    I2F,
    Not,
    Trunc,
    Shl,
    And,
    Or,
    Mod,
    Xor,
    Txf,
    Txq,
    Cont,
    Emit,
    EndPrim,
    BgnLoop,
    BgnSub,
    EndLoop,
    EndSub,
    Txqs,
    Resq,
    Nop,
    Fseq,
    Fsge,
    Fslt,
    Fsne,
    Membar,
    KillIf,
    End,
    Dfma,
    F2I,
    IDiv,
    IMax,
    IMin,
    INeg,
    ISge,
    IShr,
    ISlt,
    F2U,
    U2F,
    UAdd,
    UDiv,
    UMad,
    UMax,
    UMin,
    UMod,
    UMul,
    USeq,
    USge,
    UShr,
    USlt,
    USne,
    Switch,
    Case,
    Default,
    EndSwitch,
    Sample,
    SampleI,
    SampleIMs,
    SampleB,
    SampleC,
    SampleCLz,
    SampleD,
    SampleL,
    Gather4,
    SviewInfo,
    SamplePos,
    SampleInfo,
    Uarl,
    Ucmp,
    IAbs,
    ISsg,
    Load,
    Store,
    Barrier,
    AtomUAdd,
    AtomXchg,
    AtomCas,
    AtomAnd,
    AtomOr,
    AtomXor,
    AtomUMin,
    AtomUMax,
    AtomIMin,
    AtomIMax,
    Tex2,
    Txb2,
    Txl2,
    IMulHi,
    UMulHi,
    Tg4,
    Lodq,
    Ibfe,
    Ubfe,
    Bfi,
    Brev,
    Popc,
    Lsb,
    Imsb,
    Umsb,
    InterpCentroid,
    InterpSample,
    InterpOffset,
    F2D,
    D2F,
    DAbs,
    DNeg,
    DAdd,
    DMul,
    DMax,
    DMin,
    DSlt,
    DSge,
    DSeq,
    DSne,
    DRcp,
    DSqrt,
    DMad,
    DFrac,
    DLdExp,
    DFracExp,
    D2I,
    I2D,
    D2U,
    U2D,
    DRsq,
    DTrunc,
    DCeil,
    DFlr,
    DRound,
    DSsg,
    DDiv,
    Clock,
    I64Abs,
    I64Neg,
    I64Ssg,
    I64Slt,
    I64Sge,
    I64Min,
    I64Max,
    I64Shr,
    I64Div,
    I64Mod,
    F2I64,
    U2I64,
    I2I64,
    D2I64,
    I642F,
    I642D,
    U64Add,
    U64Mul,
    U64Seq,
    U64Sne,
    U64Slt,
    U64Sge,
    U64Min,
    U64Max,
    U64Shl,
    U64Shr,
    U64Div,
    U64Mod,
    F2U64,
    D2U64,
    U642F,
    U642D,
    Unknown(u8),
}

/// One past the highest assigned opcode number; sizes the scanner's
/// opcode histogram.
pub const OPCODE_LAST: usize = 257;

impl Opcode {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Arl,
            1 => Self::Mov,
            2 => Self::Lit,
            3 => Self::Rcp,
            4 => Self::Rsq,
            5 => Self::Exp,
            6 => Self::Log,
            7 => Self::Mul,
            8 => Self::Add,
            9 => Self::Dp3,
            10 => Self::Dp4,
            11 => Self::Dst,
            12 => Self::Min,
            13 => Self::Max,
            14 => Self::Slt,
            15 => Self::Sge,
            16 => Self::Mad,
            17 => Self::Sub,
            18 => Self::Lrp,
            19 => Self::Fma,
            20 => Self::Sqrt,
            24 => Self::Frc,
            26 => Self::Flr,
            27 => Self::Round,
            28 => Self::Ex2,
            29 => Self::Lg2,
            30 => Self::Pow,
            31 => Self::Xpd,
            33 => Self::Abs,
            35 => Self::Dph,
            36 => Self::Cos,
            37 => Self::Ddx,
            38 => Self::Ddy,
            39 => Self::Kill,
            40 => Self::Pk2h,
            41 => Self::Pk2us,
            42 => Self::Pk4b,
            43 => Self::Pk4ub,
            45 => Self::Seq,
            47 => Self::Sgt,
            48 => Self::Sin,
            49 => Self::Sle,
            50 => Self::Sne,
            52 => Self::Tex,
            53 => Self::Txd,
            54 => Self::Txp,
            55 => Self::Up2h,
            56 => Self::Up2us,
            57 => Self::Up4b,
            58 => Self::Up4ub,
            61 => Self::Arr,
            63 => Self::Cal,
            64 => Self::Ret,
            65 => Self::Ssg,
            66 => Self::Cmp,
            67 => Self::Scs,
            68 => Self::Txb,
            69 => Self::FbFetch,
            70 => Self::Div,
            71 => Self::Dp2,
            72 => Self::Txl,
            73 => Self::Brk,
            74 => Self::If,
            75 => Self::Uif,
            77 => Self::Else,
            78 => Self::EndIf,
            79 => Self::DdxFine,
            80 => Self::DdyFine,
            83 => Self::Ceil,
            84 => Self::I2F,
            85 => Self::Not,
            86 => Self::Trunc,
            87 => Self::Shl,
            89 => Self::And,
            90 => Self::Or,
            91 => Self::Mod,
            92 => Self::Xor,
            94 => Self::Txf,
            95 => Self::Txq,
            96 => Self::Cont,
            97 => Self::Emit,
            98 => Self::EndPrim,
            99 => Self::BgnLoop,
            100 => Self::BgnSub,
            101 => Self::EndLoop,
            102 => Self::EndSub,
            104 => Self::Txqs,
            105 => Self::Resq,
            107 => Self::Nop,
            108 => Self::Fseq,
            109 => Self::Fsge,
            110 => Self::Fslt,
            111 => Self::Fsne,
            112 => Self::Membar,
            116 => Self::KillIf,
            117 => Self::End,
            118 => Self::Dfma,
            119 => Self::F2I,
            120 => Self::IDiv,
            121 => Self::IMax,
            122 => Self::IMin,
            123 => Self::INeg,
            124 => Self::ISge,
            125 => Self::IShr,
            126 => Self::ISlt,
            127 => Self::F2U,
            128 => Self::U2F,
            129 => Self::UAdd,
            130 => Self::UDiv,
            131 => Self::UMad,
            132 => Self::UMax,
            133 => Self::UMin,
            134 => Self::UMod,
            135 => Self::UMul,
            136 => Self::USeq,
            137 => Self::USge,
            138 => Self::UShr,
            139 => Self::USlt,
            140 => Self::USne,
            141 => Self::Switch,
            142 => Self::Case,
            143 => Self::Default,
            144 => Self::EndSwitch,
            145 => Self::Sample,
            146 => Self::SampleI,
            147 => Self::SampleIMs,
            148 => Self::SampleB,
            149 => Self::SampleC,
            150 => Self::SampleCLz,
            151 => Self::SampleD,
            152 => Self::SampleL,
            153 => Self::Gather4,
            154 => Self::SviewInfo,
            155 => Self::SamplePos,
            156 => Self::SampleInfo,
            157 => Self::Uarl,
            158 => Self::Ucmp,
            159 => Self::IAbs,
            160 => Self::ISsg,
            161 => Self::Load,
            162 => Self::Store,
            166 => Self::Barrier,
            167 => Self::AtomUAdd,
            168 => Self::AtomXchg,
            169 => Self::AtomCas,
            170 => Self::AtomAnd,
            171 => Self::AtomOr,
            172 => Self::AtomXor,
            173 => Self::AtomUMin,
            174 => Self::AtomUMax,
            175 => Self::AtomIMin,
            176 => Self::AtomIMax,
            177 => Self::Tex2,
            178 => Self::Txb2,
            179 => Self::Txl2,
            180 => Self::IMulHi,
            181 => Self::UMulHi,
            182 => Self::Tg4,
            183 => Self::Lodq,
            184 => Self::Ibfe,
            185 => Self::Ubfe,
            186 => Self::Bfi,
            187 => Self::Brev,
            188 => Self::Popc,
            189 => Self::Lsb,
            190 => Self::Imsb,
            191 => Self::Umsb,
            192 => Self::InterpCentroid,
            193 => Self::InterpSample,
            194 => Self::InterpOffset,
            195 => Self::F2D,
            196 => Self::D2F,
            197 => Self::DAbs,
            198 => Self::DNeg,
            199 => Self::DAdd,
            200 => Self::DMul,
            201 => Self::DMax,
            202 => Self::DMin,
            203 => Self::DSlt,
            204 => Self::DSge,
            205 => Self::DSeq,
            206 => Self::DSne,
            207 => Self::DRcp,
            208 => Self::DSqrt,
            209 => Self::DMad,
            210 => Self::DFrac,
            211 => Self::DLdExp,
            212 => Self::DFracExp,
            213 => Self::D2I,
            214 => Self::I2D,
            215 => Self::D2U,
            216 => Self::U2D,
            217 => Self::DRsq,
            218 => Self::DTrunc,
            219 => Self::DCeil,
            220 => Self::DFlr,
            221 => Self::DRound,
            222 => Self::DSsg,
            223 => Self::DDiv,
            224 => Self::Clock,
            225 => Self::I64Abs,
            226 => Self::I64Neg,
            227 => Self::I64Ssg,
            228 => Self::I64Slt,
            229 => Self::I64Sge,
            230 => Self::I64Min,
            231 => Self::I64Max,
            232 => Self::I64Shr,
            233 => Self::I64Div,
            234 => Self::I64Mod,
            235 => Self::F2I64,
            236 => Self::U2I64,
            237 => Self::I2I64,
            238 => Self::D2I64,
            239 => Self::I642F,
            240 => Self::I642D,
            241 => Self::U64Add,
            242 => Self::U64Mul,
            243 => Self::U64Seq,
            244 => Self::U64Sne,
            245 => Self::U64Slt,
            246 => Self::U64Sge,
            247 => Self::U64Min,
            248 => Self::U64Max,
            249 => Self::U64Shl,
            250 => Self::U64Shr,
            251 => Self::U64Div,
            252 => Self::U64Mod,
            253 => Self::F2U64,
            254 => Self::D2U64,
            255 => Self::U642F,
            256 => Self::U642D,
            other => Self::Unknown(other as u8),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Arl => 0,
            Self::Mov => 1,
            Self::Lit => 2,
            Self::Rcp => 3,
            Self::Rsq => 4,
            Self::Exp => 5,
            Self::Log => 6,
            Self::Mul => 7,
            Self::Add => 8,
            Self::Dp3 => 9,
            Self::Dp4 => 10,
            Self::Dst => 11,
            Self::Min => 12,
            Self::Max => 13,
            Self::Slt => 14,
            Self::Sge => 15,
            Self::Mad => 16,
            Self::Sub => 17,
            Self::Lrp => 18,
            Self::Fma => 19,
            Self::Sqrt => 20,
            Self::Frc => 24,
            Self::Flr => 26,
            Self::Round => 27,
            Self::Ex2 => 28,
            Self::Lg2 => 29,
            Self::Pow => 30,
            Self::Xpd => 31,
            Self::Abs => 33,
            Self::Dph => 35,
            Self::Cos => 36,
            Self::Ddx => 37,
            Self::Ddy => 38,
            Self::Kill => 39,
            Self::Pk2h => 40,
            Self::Pk2us => 41,
            Self::Pk4b => 42,
            Self::Pk4ub => 43,
            Self::Seq => 45,
            Self::Sgt => 47,
            Self::Sin => 48,
            Self::Sle => 49,
            Self::Sne => 50,
            Self::Tex => 52,
            Self::Txd => 53,
            Self::Txp => 54,
            Self::Up2h => 55,
            Self::Up2us => 56,
            Self::Up4b => 57,
            Self::Up4ub => 58,
            Self::Arr => 61,
            Self::Cal => 63,
            Self::Ret => 64,
            Self::Ssg => 65,
            Self::Cmp => 66,
            Self::Scs => 67,
            Self::Txb => 68,
            Self::FbFetch => 69,
            Self::Div => 70,
            Self::Dp2 => 71,
            Self::Txl => 72,
            Self::Brk => 73,
            Self::If => 74,
            Self::Uif => 75,
            Self::Else => 77,
            Self::EndIf => 78,
            Self::DdxFine => 79,
            Self::DdyFine => 80,
            Self::Ceil => 83,
            Self::I2F => 84,
            Self::Not => 85,
            Self::Trunc => 86,
            Self::Shl => 87,
            Self::And => 89,
            Self::Or => 90,
            Self::Mod => 91,
            Self::Xor => 92,
            Self::Txf => 94,
            Self::Txq => 95,
            Self::Cont => 96,
            Self::Emit => 97,
            Self::EndPrim => 98,
            Self::BgnLoop => 99,
            Self::BgnSub => 100,
            Self::EndLoop => 101,
            Self::EndSub => 102,
            Self::Txqs => 104,
            Self::Resq => 105,
            Self::Nop => 107,
            Self::Fseq => 108,
            Self::Fsge => 109,
            Self::Fslt => 110,
            Self::Fsne => 111,
            Self::Membar => 112,
            Self::KillIf => 116,
            Self::End => 117,
            Self::Dfma => 118,
            Self::F2I => 119,
            Self::IDiv => 120,
            Self::IMax => 121,
            Self::IMin => 122,
            Self::INeg => 123,
            Self::ISge => 124,
            Self::IShr => 125,
            Self::ISlt => 126,
            Self::F2U => 127,
            Self::U2F => 128,
            Self::UAdd => 129,
            Self::UDiv => 130,
            Self::UMad => 131,
            Self::UMax => 132,
            Self::UMin => 133,
            Self::UMod => 134,
            Self::UMul => 135,
            Self::USeq => 136,
            Self::USge => 137,
            Self::UShr => 138,
            Self::USlt => 139,
            Self::USne => 140,
            Self::Switch => 141,
            Self::Case => 142,
            Self::Default => 143,
            Self::EndSwitch => 144,
            Self::Sample => 145,
            Self::SampleI => 146,
            Self::SampleIMs => 147,
            Self::SampleB => 148,
            Self::SampleC => 149,
            Self::SampleCLz => 150,
            Self::SampleD => 151,
            Self::SampleL => 152,
            Self::Gather4 => 153,
            Self::SviewInfo => 154,
            Self::SamplePos => 155,
            Self::SampleInfo => 156,
            Self::Uarl => 157,
            Self::Ucmp => 158,
            Self::IAbs => 159,
            Self::ISsg => 160,
            Self::Load => 161,
            Self::Store => 162,
            Self::Barrier => 166,
            Self::AtomUAdd => 167,
            Self::AtomXchg => 168,
            Self::AtomCas => 169,
            Self::AtomAnd => 170,
            Self::AtomOr => 171,
            Self::AtomXor => 172,
            Self::AtomUMin => 173,
            Self::AtomUMax => 174,
            Self::AtomIMin => 175,
            Self::AtomIMax => 176,
            Self::Tex2 => 177,
            Self::Txb2 => 178,
            Self::Txl2 => 179,
            Self::IMulHi => 180,
            Self::UMulHi => 181,
            Self::Tg4 => 182,
            Self::Lodq => 183,
            Self::Ibfe => 184,
            Self::Ubfe => 185,
            Self::Bfi => 186,
            Self::Brev => 187,
            Self::Popc => 188,
            Self::Lsb => 189,
            Self::Imsb => 190,
            Self::Umsb => 191,
            Self::InterpCentroid => 192,
            Self::InterpSample => 193,
            Self::InterpOffset => 194,
            Self::F2D => 195,
            Self::D2F => 196,
            Self::DAbs => 197,
            Self::DNeg => 198,
            Self::DAdd => 199,
            Self::DMul => 200,
            Self::DMax => 201,
            Self::DMin => 202,
            Self::DSlt => 203,
            Self::DSge => 204,
            Self::DSeq => 205,
            Self::DSne => 206,
            Self::DRcp => 207,
            Self::DSqrt => 208,
            Self::DMad => 209,
            Self::DFrac => 210,
            Self::DLdExp => 211,
            Self::DFracExp => 212,
            Self::D2I => 213,
            Self::I2D => 214,
            Self::D2U => 215,
            Self::U2D => 216,
            Self::DRsq => 217,
            Self::DTrunc => 218,
            Self::DCeil => 219,
            Self::DFlr => 220,
            Self::DRound => 221,
            Self::DSsg => 222,
            Self::DDiv => 223,
            Self::Clock => 224,
            Self::I64Abs => 225,
            Self::I64Neg => 226,
            Self::I64Ssg => 227,
            Self::I64Slt => 228,
            Self::I64Sge => 229,
            Self::I64Min => 230,
            Self::I64Max => 231,
            Self::I64Shr => 232,
            Self::I64Div => 233,
            Self::I64Mod => 234,
            Self::F2I64 => 235,
            Self::U2I64 => 236,
            Self::I2I64 => 237,
            Self::D2I64 => 238,
            Self::I642F => 239,
            Self::I642D => 240,
            Self::U64Add => 241,
            Self::U64Mul => 242,
            Self::U64Seq => 243,
            Self::U64Sne => 244,
            Self::U64Slt => 245,
            Self::U64Sge => 246,
            Self::U64Min => 247,
            Self::U64Max => 248,
            Self::U64Shl => 249,
            Self::U64Shr => 250,
            Self::U64Div => 251,
            Self::U64Mod => 252,
            Self::F2U64 => 253,
            Self::D2U64 => 254,
            Self::U642F => 255,
            Self::U642D => 256,
            Self::Unknown(raw) => raw as u32,
        }
    }

    /// Opcodes that open an indent-scoped block.
    pub fn opens_block(self) -> bool {
        matches!(self, Self::If | Self::Uif | Self::BgnLoop | Self::Switch)
    }

    /// Opcodes that close an indent-scoped block.
    pub fn closes_block(self) -> bool {
        matches!(self, Self::EndIf | Self::EndLoop | Self::EndSwitch)
    }

    /// Texture-sampling opcodes that carry a sampler operand.
    pub fn is_tex(self) -> bool {
        matches!(
            self,
            Self::Tex
                | Self::Txb
                | Self::Txl
                | Self::Txd
                | Self::Txf
                | Self::Txp
                | Self::Tex2
                | Self::Txb2
                | Self::Txl2
                | Self::Tg4
                | Self::Lodq
        )
    }

    /// Opcodes that operate on double-precision values.
    pub fn uses_doubles(self) -> bool {
        matches!(
            self,
            Self::F2D
                | Self::D2F
                | Self::DAbs
                | Self::DNeg
                | Self::DAdd
                | Self::DMul
                | Self::DMax
                | Self::DMin
                | Self::DSlt
                | Self::DSge
                | Self::DSeq
                | Self::DSne
                | Self::DRcp
                | Self::DSqrt
                | Self::DMad
                | Self::Dfma
                | Self::DFrac
                | Self::DLdExp
                | Self::DFracExp
                | Self::D2I
                | Self::I2D
                | Self::D2U
                | Self::U2D
                | Self::DRsq
                | Self::DTrunc
                | Self::DCeil
                | Self::DFlr
                | Self::DRound
                | Self::DSsg
                | Self::DDiv
        )
    }
}

// Header word 0.
const HEADER_SIZE_MASK: u32 = 0xFF;
const BODY_SIZE_SHIFT: u32 = 8;

// Header word 1.
const PROCESSOR_MASK: u32 = 0xF;

/// Accessors for the two-word stream header.
pub fn header_size(word: u32) -> u32 {
    word & HEADER_SIZE_MASK
}

pub fn body_size(word: u32) -> u32 {
    word >> BODY_SIZE_SHIFT
}

pub fn pack_header(header_size: u32, body_size: u32) -> u32 {
    (header_size & HEADER_SIZE_MASK) | (body_size << BODY_SIZE_SHIFT)
}

pub fn processor_raw(word: u32) -> u32 {
    word & PROCESSOR_MASK
}

pub fn pack_processor(processor: Processor) -> u32 {
    processor.raw()
}

/// Common to every record's leading word.
pub fn token_kind_raw(word: u32) -> u32 {
    word & 0xF
}

/// Declaration leading word: `nr_tokens` bits 4..12, file 12..16, usage
/// mask 16..20, then the optional-sub-record flag bits.
pub mod decl {
    pub fn nr_tokens(word: u32) -> u32 {
        (word >> 4) & 0xFF
    }

    pub fn file_raw(word: u32) -> u32 {
        (word >> 12) & 0xF
    }

    pub fn usage_mask(word: u32) -> u8 {
        ((word >> 16) & 0xF) as u8
    }

    pub fn has_dimension(word: u32) -> bool {
        (word >> 20) & 1 != 0
    }

    pub fn has_semantic(word: u32) -> bool {
        (word >> 21) & 1 != 0
    }

    pub fn has_interpolate(word: u32) -> bool {
        (word >> 22) & 1 != 0
    }

    pub fn invariant(word: u32) -> bool {
        (word >> 23) & 1 != 0
    }

    pub fn local(word: u32) -> bool {
        (word >> 24) & 1 != 0
    }

    pub fn has_array(word: u32) -> bool {
        (word >> 25) & 1 != 0
    }

    pub fn atomic(word: u32) -> bool {
        (word >> 26) & 1 != 0
    }

    pub fn mem_type(word: u32) -> u32 {
        (word >> 27) & 0x3
    }

    // Range word.
    pub fn range_first(word: u32) -> u32 {
        word & 0xFFFF
    }

    pub fn range_last(word: u32) -> u32 {
        word >> 16
    }

    // Dimension word.
    pub fn dim_index2d(word: u32) -> u32 {
        word & 0xFFFF
    }

    // Interp word.
    pub fn interpolate_raw(word: u32) -> u32 {
        word & 0xF
    }

    pub fn interpolate_loc_raw(word: u32) -> u32 {
        (word >> 4) & 0x3
    }

    // Semantic word.
    pub fn semantic_name_raw(word: u32) -> u32 {
        word & 0xFF
    }

    pub fn semantic_index(word: u32) -> u32 {
        (word >> 8) & 0xFFFF
    }

    pub fn semantic_streams(word: u32) -> u8 {
        (word >> 24) as u8
    }

    // Image word.
    pub fn image_resource_raw(word: u32) -> u32 {
        word & 0xFF
    }

    pub fn image_raw_access(word: u32) -> bool {
        (word >> 8) & 1 != 0
    }

    pub fn image_writable(word: u32) -> bool {
        (word >> 9) & 1 != 0
    }

    pub fn image_format(word: u32) -> u32 {
        (word >> 10) & 0x3FF
    }

    // Sampler-view word.
    pub fn sview_resource_raw(word: u32) -> u32 {
        word & 0xFF
    }

    pub fn sview_return_type_raw(word: u32, lane: usize) -> u32 {
        (word >> (8 + 6 * lane as u32)) & 0x3F
    }

    // Array word.
    pub fn array_id(word: u32) -> u32 {
        word & 0x3FF
    }
}

/// Immediate leading word: `nr_tokens` bits 4..18, data type 18..22.
pub mod imm {
    pub fn nr_tokens(word: u32) -> u32 {
        (word >> 4) & 0x3FFF
    }

    pub fn data_type_raw(word: u32) -> u32 {
        (word >> 18) & 0xF
    }
}

/// Instruction leading word: `nr_tokens` bits 4..13, opcode 13..21,
/// saturate 21, num dst 22..24, num src 24..28, label 28, texture 29,
/// memory 30, precise 31.
pub mod inst {
    pub fn nr_tokens(word: u32) -> u32 {
        (word >> 4) & 0x1FF
    }

    pub fn opcode_raw(word: u32) -> u32 {
        (word >> 13) & 0xFF
    }

    pub fn saturate(word: u32) -> bool {
        (word >> 21) & 1 != 0
    }

    pub fn num_dst(word: u32) -> u32 {
        (word >> 22) & 0x3
    }

    pub fn num_src(word: u32) -> u32 {
        (word >> 24) & 0xF
    }

    pub fn has_label(word: u32) -> bool {
        (word >> 28) & 1 != 0
    }

    pub fn has_texture(word: u32) -> bool {
        (word >> 29) & 1 != 0
    }

    pub fn has_memory(word: u32) -> bool {
        (word >> 30) & 1 != 0
    }

    pub fn precise(word: u32) -> bool {
        (word >> 31) & 1 != 0
    }

    // Label word.
    pub fn label(word: u32) -> u32 {
        word & 0xFF_FFFF
    }

    // Texture word.
    pub fn texture_target_raw(word: u32) -> u32 {
        word & 0xFF
    }

    pub fn texture_num_offsets(word: u32) -> u32 {
        (word >> 8) & 0xF
    }

    // Texture-offset word.
    pub fn offset_index(word: u32) -> i32 {
        (word & 0xFFFF) as u16 as i16 as i32
    }

    pub fn offset_file_raw(word: u32) -> u32 {
        (word >> 16) & 0xF
    }

    pub fn offset_swizzle_raw(word: u32, lane: usize) -> u32 {
        (word >> (20 + 2 * lane as u32)) & 0x3
    }

    // Memory word.
    pub fn memory_qualifier(word: u32) -> u32 {
        word & 0x7
    }

    pub fn memory_texture_raw(word: u32) -> u32 {
        (word >> 3) & 0xFF
    }

    pub fn memory_format(word: u32) -> u32 {
        (word >> 11) & 0x3FF
    }
}

/// Destination operand word: file 0..4, write mask 4..8, indirect 8,
/// dimension 9, signed index 10..26.
pub mod dst {
    pub fn file_raw(word: u32) -> u32 {
        word & 0xF
    }

    pub fn write_mask(word: u32) -> u8 {
        ((word >> 4) & 0xF) as u8
    }

    pub fn indirect(word: u32) -> bool {
        (word >> 8) & 1 != 0
    }

    pub fn dimension(word: u32) -> bool {
        (word >> 9) & 1 != 0
    }

    pub fn index(word: u32) -> i32 {
        // Sign-extend the 16-bit field.
        (((word >> 10) & 0xFFFF) as u16 as i16) as i32
    }
}

/// Source operand word: file 0..4, indirect 4, dimension 5, signed index
/// 6..22, swizzle lanes 22..30, absolute 30, negate 31.
pub mod src {
    pub fn file_raw(word: u32) -> u32 {
        word & 0xF
    }

    pub fn indirect(word: u32) -> bool {
        (word >> 4) & 1 != 0
    }

    pub fn dimension(word: u32) -> bool {
        (word >> 5) & 1 != 0
    }

    pub fn index(word: u32) -> i32 {
        (((word >> 6) & 0xFFFF) as u16 as i16) as i32
    }

    pub fn swizzle_raw(word: u32, lane: usize) -> u32 {
        (word >> (22 + 2 * lane as u32)) & 0x3
    }

    pub fn absolute(word: u32) -> bool {
        (word >> 30) & 1 != 0
    }

    pub fn negate(word: u32) -> bool {
        (word >> 31) & 1 != 0
    }
}

/// Indirect-addressing word: file 0..4, signed index 4..20, swizzle
/// 20..22, array id 22..32.
pub mod ind {
    pub fn file_raw(word: u32) -> u32 {
        word & 0xF
    }

    pub fn index(word: u32) -> i32 {
        (((word >> 4) & 0xFFFF) as u16 as i16) as i32
    }

    pub fn swizzle_raw(word: u32) -> u32 {
        (word >> 20) & 0x3
    }

    pub fn array_id(word: u32) -> u32 {
        (word >> 22) & 0x3FF
    }
}

/// Dimension word: indirect flag bit 0, nested-dimension flag bit 1,
/// signed index 16..32.
pub mod dim {
    pub fn indirect(word: u32) -> bool {
        word & 1 != 0
    }

    pub fn nested(word: u32) -> bool {
        (word >> 1) & 1 != 0
    }

    pub fn index(word: u32) -> i32 {
        ((word >> 16) as u16 as i16) as i32
    }
}

/// Property leading word: `nr_tokens` bits 4..12, property name 12..20.
pub mod prop {
    pub fn nr_tokens(word: u32) -> u32 {
        (word >> 4) & 0xFF
    }

    pub fn name_raw(word: u32) -> u32 {
        (word >> 12) & 0xFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_raw_round_trips() {
        for raw in 0..OPCODE_LAST as u32 {
            let op = Opcode::from_raw(raw);
            assert_eq!(op.raw(), raw, "opcode {raw} should round-trip");
        }
    }

    #[test]
    fn gaps_decode_as_unknown() {
        assert_eq!(Opcode::from_raw(21), Opcode::Unknown(21));
        assert_eq!(Opcode::from_raw(76), Opcode::Unknown(76));
        assert_eq!(Opcode::from_raw(113), Opcode::Unknown(113));
    }

    #[test]
    fn header_word_accessors() {
        let word = pack_header(2, 1234);
        assert_eq!(header_size(word), 2);
        assert_eq!(body_size(word), 1234);
    }

    #[test]
    fn src_index_is_sign_extended() {
        // index -1 in bits 6..22.
        let word = 0xFFFFu32 << 6;
        assert_eq!(src::index(word), -1);
    }

    #[test]
    fn shadow_targets_classified() {
        assert!(TextureTarget::Shadow2D.is_shadow());
        assert!(TextureTarget::ShadowCubeArray.is_shadow());
        assert!(!TextureTarget::Tex2D.is_shadow());
        assert!(TextureTarget::Tex2DMsaa.is_msaa());
        assert!(TextureTarget::Rect.is_rect());
    }
}
