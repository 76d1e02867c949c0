//! Semantic analysis state threaded through one translation.
//!
//! `TranslationCtx` ingests declaration, immediate, and property records in
//! program order and materializes the symbol tables the code generator
//! consults for every operand: IO slots, temporary ranges, sampler and
//! image units with their coalesced indirect arrays, constant buffers,
//! storage buffers, atomic counters, and the accumulated requirement flags.

use virgl_tgsi::decode::{FullDeclaration, FullImmediate, FullToken};
use virgl_tgsi::scan::ShaderScanInfo;
use virgl_tgsi::token::{
    Interpolation, InterpolateLoc, Processor, RegisterFile, ReturnType, Semantic, TextureTarget,
};

use crate::config::{ShaderCfg, ShaderKey, SoEntry};
use crate::limits::{
    CapacityError, MAX_HW_ATOMICS, MAX_IMAGES, MAX_IMMEDIATES, MAX_INPUTS, MAX_OUTPUTS,
    MAX_SAMPLERS, MAX_SO_OUTPUTS, MAX_SSBOS, MAX_SYSTEM_VALUES, MAX_TEMP_RANGES, MAX_UBOS,
};
use crate::requirements::ShaderReq;
use crate::TranslateError;

/// One declared input, output, or system value.
#[derive(Debug, Clone)]
pub struct IoSlot {
    pub name: Semantic,
    pub sid: u32,
    pub first: u32,
    pub last: u32,
    pub array_id: u32,
    pub usage_mask: u8,
    pub interpolation: Interpolation,
    pub location: InterpolateLoc,
    pub invariant: bool,
    /// Generated identifier, or the built-in name when predefined.
    pub glsl_name: String,
    /// Built-in: no declaration line is emitted for it.
    pub glsl_predefined_no_emit: bool,
    /// Singleton built-in: never subscripted by register offset.
    pub glsl_no_index: bool,
    /// Scalar-only value: destination writes ignore the write mask.
    pub override_no_wm: bool,
    /// Declared with an integer type (system values, ids, masks).
    pub is_int: bool,
    /// Explicit `layout(location = N)` from the overlap overlay or the
    /// previous stage's exported layout.
    pub layout_location: Option<u32>,
}

impl IoSlot {
    pub fn contains(&self, reg: u32) -> bool {
        self.first <= reg && reg <= self.last
    }

    /// First used lane; IO declared `xy` packs into a `vec2` starting here.
    pub fn swizzle_offset(&self) -> u32 {
        self.usage_mask.trailing_zeros().min(3)
    }

    pub fn num_components(&self) -> u32 {
        if self.usage_mask == 0 {
            return 4;
        }
        32 - u32::from(self.usage_mask).leading_zeros() - self.swizzle_offset()
    }

    pub fn array_len(&self) -> u32 {
        self.last - self.first + 1
    }
}

/// Contiguous temporary interval; determines the generated storage name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempRange {
    pub first: u32,
    pub last: u32,
    pub array_id: u32,
}

impl TempRange {
    pub fn contains(&self, reg: u32) -> bool {
        self.first <= reg && reg <= self.last
    }
}

/// One declared sampler unit (from its sampler-view declaration).
#[derive(Debug, Clone, Copy)]
pub struct SamplerSlot {
    pub target: TextureTarget,
    pub return_type: ReturnType,
    /// Forced multisample by the scan's instruction cross-reference.
    pub is_msaa: bool,
    /// Shadow samplers get the compare add/mask emulation uniforms.
    pub shadow: bool,
}

/// One declared image unit.
#[derive(Debug, Clone, Copy)]
pub struct ImageSlot {
    pub target: TextureTarget,
    pub writable: bool,
    pub format: u32,
}

/// A coalesced run of contiguous, compatible opaque units addressed
/// indirectly; emitted once as an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpaqueArray {
    pub first: u32,
    pub array_size: u32,
}

impl OpaqueArray {
    pub fn contains(&self, unit: u32) -> bool {
        self.first <= unit && unit < self.first + self.array_size
    }
}

/// A hardware atomic-counter range within one 2D-indexed buffer.
#[derive(Debug, Clone, Copy)]
pub struct HwAtomicRange {
    pub first: u32,
    pub last: u32,
    pub buffer_id: u32,
}

/// A synthesized coalesced IO range covering indirectly addressed
/// Generic or Patch slots when the guest sent only scalar declarations.
#[derive(Debug, Clone)]
pub struct IoRange {
    pub sid_start: u32,
    pub sid_end: u32,
    pub glsl_name: String,
    pub used: bool,
}

impl IoRange {
    pub fn array_len(&self) -> u32 {
        self.sid_end - self.sid_start + 1
    }
}

/// Per-entry stream-output decision.
#[derive(Debug, Clone)]
pub struct SoDecision {
    pub entry: SoEntry,
    /// The captured sub-range does not map onto a whole declared output,
    /// so the value is staged through a synthetic variable.
    pub need_temp: bool,
    pub glsl_name: String,
}

#[derive(Debug)]
pub struct TranslationCtx {
    pub prog: Processor,
    pub cfg: ShaderCfg,
    pub key: ShaderKey,
    pub scan: ShaderScanInfo,

    pub inputs: Vec<IoSlot>,
    pub outputs: Vec<IoSlot>,
    pub system_values: Vec<IoSlot>,

    pub temp_ranges: Vec<TempRange>,
    pub immediates: Vec<FullImmediate>,

    pub samplers: [Option<SamplerSlot>; MAX_SAMPLERS],
    pub sampler_arrays: Vec<OpaqueArray>,
    pub images: [Option<ImageSlot>; MAX_IMAGES],
    pub image_arrays: Vec<OpaqueArray>,

    pub ubo_used_mask: u32,
    pub ubo_sizes: [u32; MAX_UBOS],
    /// Flat constant file size (UBO slot 0 by convention).
    pub num_consts: u32,

    pub ssbo_used_mask: u32,
    pub ssbo_atomic_mask: u32,

    pub hw_atomics: Vec<HwAtomicRange>,

    pub num_address: u32,

    pub reqs: ShaderReq,

    /// Written clip/cull lanes (4 per declared register).
    pub num_clip_dist_out: u32,
    pub num_cull_dist_out: u32,
    /// Clip-distance lanes read as inputs (fragment side).
    pub num_in_clip_dist: u32,

    pub generic_input_range: Option<IoRange>,
    pub patch_input_range: Option<IoRange>,
    pub generic_output_range: Option<IoRange>,
    pub patch_output_range: Option<IoRange>,

    /// Dense renumbering of guest array ids, in declaration order.
    io_array_ids: Vec<(RegisterFile, u32)>,
    /// Next explicit location for the overlap overlay.
    next_location: u32,

    pub so_decisions: Vec<SoDecision>,

    /// Semantic ids of fragment color inputs routed through the
    /// front/back select temporaries.
    pub two_side_colors: Vec<u32>,

    pub shared_mem_bytes: u32,
}

impl TranslationCtx {
    pub fn new(
        cfg: &ShaderCfg,
        key: &ShaderKey,
        scan: ShaderScanInfo,
        req_local_mem: u32,
    ) -> Self {
        let mut reqs = ShaderReq::empty();
        match scan.processor {
            Processor::Geometry => reqs |= ShaderReq::GEOMETRY_SHADER | ShaderReq::INTS,
            Processor::TessCtrl | Processor::TessEval => {
                reqs |= ShaderReq::TESSELLATION | ShaderReq::INTS;
            }
            Processor::Compute => reqs |= ShaderReq::COMPUTE | ShaderReq::INTS,
            _ => {}
        }
        if scan.uses_doubles {
            reqs |= ShaderReq::FP64;
        }
        Self {
            prog: scan.processor,
            cfg: cfg.clone(),
            key: key.clone(),
            scan,
            inputs: Vec::new(),
            outputs: Vec::new(),
            system_values: Vec::new(),
            temp_ranges: Vec::new(),
            immediates: Vec::new(),
            samplers: [None; MAX_SAMPLERS],
            sampler_arrays: Vec::new(),
            images: [None; MAX_IMAGES],
            image_arrays: Vec::new(),
            ubo_used_mask: 0,
            ubo_sizes: [0; MAX_UBOS],
            num_consts: 0,
            ssbo_used_mask: 0,
            ssbo_atomic_mask: 0,
            hw_atomics: Vec::new(),
            num_address: 0,
            reqs,
            num_clip_dist_out: 0,
            num_cull_dist_out: 0,
            num_in_clip_dist: 0,
            generic_input_range: None,
            patch_input_range: None,
            generic_output_range: None,
            patch_output_range: None,
            io_array_ids: Vec::new(),
            next_location: 0,
            so_decisions: Vec::new(),
            two_side_colors: Vec::new(),
            shared_mem_bytes: req_local_mem,
        }
    }

    pub fn require(&mut self, req: ShaderReq) {
        self.reqs |= req;
    }

    /// Name prefix of this stage's inputs (the previous stage's outputs).
    pub fn input_prefix(&self) -> &'static str {
        match self.prog {
            Processor::Vertex => "in",
            Processor::Fragment => {
                if self.key.gs_present {
                    "gso"
                } else if self.key.tes_present {
                    "teo"
                } else {
                    "vso"
                }
            }
            Processor::Geometry => {
                if self.key.tes_present {
                    "teo"
                } else {
                    "vso"
                }
            }
            Processor::TessCtrl => "vso",
            Processor::TessEval => {
                if self.key.tcs_present {
                    "tco"
                } else {
                    "vso"
                }
            }
            Processor::Compute => "",
        }
    }

    pub fn output_prefix(&self) -> &'static str {
        match self.prog {
            Processor::Vertex => "vso",
            Processor::Fragment => "fsout",
            Processor::Geometry => "gso",
            Processor::TessCtrl => "tco",
            Processor::TessEval => "teo",
            Processor::Compute => "",
        }
    }

    /// Ingests one decoded record. Instructions only contribute to
    /// requirement flags during generation, so they are ignored here.
    pub fn ingest(&mut self, tok: &FullToken) -> Result<(), TranslateError> {
        match tok {
            FullToken::Declaration(decl) => self.ingest_declaration(decl),
            FullToken::Immediate(imm) => self.ingest_immediate(imm),
            FullToken::Property(_) | FullToken::Instruction(_) => Ok(()),
        }
    }

    fn ingest_immediate(&mut self, imm: &FullImmediate) -> Result<(), TranslateError> {
        if self.immediates.len() >= MAX_IMMEDIATES {
            return Err(CapacityError::new("immediates", MAX_IMMEDIATES).into());
        }
        self.immediates.push(*imm);
        Ok(())
    }

    fn ingest_declaration(&mut self, decl: &FullDeclaration) -> Result<(), TranslateError> {
        match decl.file {
            RegisterFile::Input => self.add_io(decl, true),
            RegisterFile::Output => self.add_io(decl, false),
            RegisterFile::SystemValue => self.add_system_value(decl),
            RegisterFile::Temporary => self.add_temp_range(decl),
            RegisterFile::Constant => self.add_constant(decl),
            RegisterFile::Sampler => Ok(()),
            RegisterFile::SamplerView => self.add_sampler_view(decl),
            RegisterFile::Image => self.add_image(decl),
            RegisterFile::Buffer => self.add_buffer(decl),
            RegisterFile::Memory => {
                // Shared memory size comes from the caller; the declaration
                // only proves the file is used.
                Ok(())
            }
            RegisterFile::HwAtomic => self.add_hw_atomic(decl),
            RegisterFile::Address => {
                self.num_address = self.num_address.max(decl.last + 1);
                Ok(())
            }
            RegisterFile::Null | RegisterFile::Immediate | RegisterFile::Predicate => Err(
                TranslateError::Unsupported(format!("declaration of {} file", decl.file.name())),
            ),
        }
    }

    /// Dense renumbering of guest-declared array ids; ids keep their
    /// relative order of first appearance.
    fn renumber_array_id(&mut self, file: RegisterFile, id: u32) -> u32 {
        if id == 0 {
            return 0;
        }
        if let Some(pos) = self
            .io_array_ids
            .iter()
            .position(|&(f, old)| f == file && old == id)
        {
            return pos as u32 + 1;
        }
        self.io_array_ids.push((file, id));
        self.io_array_ids.len() as u32
    }

    fn add_io(&mut self, decl: &FullDeclaration, is_input: bool) -> Result<(), TranslateError> {
        let semantic = decl
            .semantic
            .map(|s| (s.name, s.index))
            .unwrap_or((Semantic::Generic, decl.first));
        let array_id = self.renumber_array_id(decl.file, decl.array_id.unwrap_or(0));

        // Idempotence: a repeated identical declaration is a no-op.
        let slots = if is_input { &self.inputs } else { &self.outputs };
        if slots.iter().any(|s| {
            s.name == semantic.0
                && s.sid == semantic.1
                && s.first == decl.first
                && s.usage_mask == decl.usage_mask
                && s.array_id == array_id
        }) {
            return Ok(());
        }

        let mut slot = IoSlot {
            name: semantic.0,
            sid: semantic.1,
            first: decl.first,
            last: decl.last,
            array_id,
            usage_mask: decl.usage_mask,
            interpolation: decl
                .interp
                .map(|i| i.interpolation)
                .unwrap_or(Interpolation::Constant),
            location: decl.interp.map(|i| i.location).unwrap_or_default(),
            invariant: decl.invariant,
            glsl_name: String::new(),
            glsl_predefined_no_emit: false,
            glsl_no_index: false,
            override_no_wm: false,
            is_int: false,
            layout_location: None,
        };
        if is_input {
            self.name_input(&mut slot)?;
        } else {
            self.name_output(&mut slot)?;
        }
        self.assign_overlap_location(&mut slot, is_input);

        let (slots, limit, table) = if is_input {
            (&mut self.inputs, MAX_INPUTS, "inputs")
        } else {
            (&mut self.outputs, MAX_OUTPUTS, "outputs")
        };
        if slots.len() >= limit {
            return Err(CapacityError::new(table, limit).into());
        }
        slots.push(slot);

        if is_input && self.prog == Processor::Fragment && semantic.0 == Semantic::Color {
            self.expand_two_side_color(semantic.1, decl)?;
        }
        Ok(())
    }

    fn name_input(&mut self, slot: &mut IoSlot) -> Result<(), TranslateError> {
        let prefix = self.input_prefix();
        match (slot.name, self.prog) {
            (Semantic::Position, Processor::Fragment) => {
                slot.glsl_name = "gl_FragCoord".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
            }
            (Semantic::Position, _) if self.prog != Processor::Vertex => {
                // Per-vertex block position of the previous stage.
                slot.glsl_name = "gl_Position".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
            }
            (Semantic::Face, Processor::Fragment) => {
                slot.glsl_name = "gl_FrontFacing".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
            }
            (Semantic::PointSize, _) if self.prog != Processor::Vertex => {
                slot.glsl_name = "gl_PointSize".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                self.require(ShaderReq::PSIZE);
            }
            (Semantic::ClipDist, _) => {
                slot.glsl_name = "gl_ClipDistance".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                self.num_in_clip_dist += 4 * slot.array_len();
                self.require(ShaderReq::CLIP_DISTANCE);
            }
            (Semantic::PrimId, Processor::Geometry) => {
                slot.glsl_name = "gl_PrimitiveIDIn".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                slot.is_int = true;
                self.require(ShaderReq::INTS);
            }
            (Semantic::PrimId, Processor::Fragment) => {
                slot.glsl_name = "gl_PrimitiveID".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                slot.is_int = true;
                self.require(ShaderReq::INTS | ShaderReq::GEOMETRY_SHADER);
            }
            (Semantic::ViewportIndex, Processor::Fragment) => {
                slot.glsl_name = "gl_ViewportIndex".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                slot.is_int = true;
                self.require(ShaderReq::VIEWPORT_IDX);
            }
            (Semantic::Layer, Processor::Fragment) => {
                slot.glsl_name = "gl_Layer".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                slot.is_int = true;
                self.require(ShaderReq::LAYER);
            }
            (Semantic::Patch, _) => {
                slot.glsl_name = format!("patch{}", slot.sid);
            }
            (Semantic::Color, Processor::Fragment) => {
                slot.glsl_name = format!("{prefix}_c{}", slot.sid);
            }
            (Semantic::BColor, Processor::Fragment) => {
                slot.glsl_name = format!("{prefix}_bc{}", slot.sid);
            }
            (Semantic::Fog, p) if p != Processor::Vertex => {
                slot.glsl_name = format!("{prefix}_f{}", slot.sid);
                // Fog coordinates only ever use .x.
                slot.usage_mask = 0x1;
                slot.override_no_wm = true;
            }
            (Semantic::PCoord, Processor::Fragment) => {
                slot.glsl_name = "gl_PointCoord".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
            }
            (Semantic::TexCoord, p) if p != Processor::Vertex => {
                slot.glsl_name = format!("{prefix}_t{}", slot.sid);
            }
            _ if self.prog == Processor::Vertex => {
                slot.glsl_name = format!("in_{}", slot.first);
            }
            _ => {
                slot.glsl_name = format!("{prefix}_g{}", slot.sid);
            }
        }
        Ok(())
    }

    fn name_output(&mut self, slot: &mut IoSlot) -> Result<(), TranslateError> {
        let prefix = self.output_prefix();
        match (slot.name, self.prog) {
            (Semantic::Position, Processor::Fragment) => {
                slot.glsl_name = "gl_FragDepth".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
            }
            (Semantic::Position, _) => {
                slot.glsl_name = "gl_Position".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
            }
            (Semantic::PointSize, _) => {
                slot.glsl_name = "gl_PointSize".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                self.require(ShaderReq::PSIZE);
            }
            (Semantic::ClipDist, _) => {
                slot.glsl_name = "gl_ClipDistance".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                self.num_clip_dist_out += 4 * slot.array_len();
                self.require(ShaderReq::CLIP_DISTANCE);
            }
            (Semantic::CullDist, _) => {
                slot.glsl_name = "gl_CullDistance".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                self.num_cull_dist_out += 4 * slot.array_len();
                self.require(ShaderReq::CLIP_DISTANCE | ShaderReq::ES31_COMPAT);
            }
            (Semantic::ClipVertex, _) => {
                // Materialized as a plain temporary; clip distances are
                // derived from it on the exit path.
                slot.glsl_name = "clipv_tmp".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
            }
            (Semantic::Stencil, Processor::Fragment) => {
                slot.glsl_name = "gl_FragStencilRefARB".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                slot.is_int = true;
                self.require(ShaderReq::STENCIL_EXPORT | ShaderReq::INTS);
            }
            (Semantic::SampleMask, Processor::Fragment) => {
                slot.glsl_name = "gl_SampleMask[0]".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                slot.is_int = true;
                self.require(ShaderReq::INTS | ShaderReq::SAMPLE_SHADING);
            }
            (Semantic::Layer, _) => {
                slot.glsl_name = "gl_Layer".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                slot.is_int = true;
                self.require(ShaderReq::LAYER);
            }
            (Semantic::ViewportIndex, _) => {
                slot.glsl_name = "gl_ViewportIndex".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                slot.is_int = true;
                self.require(ShaderReq::VIEWPORT_IDX | ShaderReq::INTS);
            }
            (Semantic::PrimId, Processor::Geometry) => {
                slot.glsl_name = "gl_PrimitiveID".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
                slot.is_int = true;
                self.require(ShaderReq::INTS);
            }
            (Semantic::TessOuter, Processor::TessCtrl) => {
                slot.glsl_name = "gl_TessLevelOuter".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
            }
            (Semantic::TessInner, Processor::TessCtrl) => {
                slot.glsl_name = "gl_TessLevelInner".into();
                slot.glsl_predefined_no_emit = true;
                slot.glsl_no_index = true;
                slot.override_no_wm = true;
            }
            (Semantic::Patch, _) => {
                slot.glsl_name = format!("patch{}", slot.sid);
            }
            (Semantic::Color, Processor::Fragment) => {
                // With logic-op emulation the guest's writes land in a
                // staging global; the real attachment output is written on
                // the exit path.
                slot.glsl_name = if self.key.logicop_emulated().is_some() {
                    format!("fsout_tmp_c{}", slot.sid)
                } else {
                    format!("fsout_c{}", slot.sid)
                };
            }
            (Semantic::Color, _) => {
                slot.glsl_name = format!("{prefix}_c{}", slot.sid);
            }
            (Semantic::BColor, _) => {
                slot.glsl_name = format!("{prefix}_bc{}", slot.sid);
            }
            (Semantic::Fog, _) => {
                slot.glsl_name = format!("{prefix}_f{}", slot.sid);
                slot.usage_mask = 0x1;
                slot.override_no_wm = true;
            }
            (Semantic::TexCoord, _) => {
                slot.glsl_name = format!("{prefix}_t{}", slot.sid);
            }
            (Semantic::EdgeFlag, _) => {
                return Err(TranslateError::Unsupported(
                    "edge flag outputs".into(),
                ));
            }
            _ => {
                slot.glsl_name = format!("{prefix}_g{}", slot.sid);
            }
        }
        Ok(())
    }

    /// Explicit location assignment for Generic/Patch slots whose register
    /// ranges overlap with disjoint lane masks.
    fn assign_overlap_location(&mut self, slot: &mut IoSlot, is_input: bool) {
        if !matches!(slot.name, Semantic::Generic | Semantic::Patch) {
            return;
        }
        let peers = if is_input {
            &mut self.inputs
        } else {
            &mut self.outputs
        };
        let mut conflicted = false;
        let mut shared_location = None;
        for other in peers.iter_mut() {
            if other.name != slot.name {
                continue;
            }
            let overlaps = other.first <= slot.last && slot.first <= other.last;
            let disjoint_lanes = other.usage_mask & slot.usage_mask == 0;
            if !overlaps || !disjoint_lanes {
                continue;
            }
            conflicted = true;
            if other.layout_location.is_none() {
                other.layout_location = Some(self.next_location);
                self.next_location += 1;
            }
            if other.first == slot.first {
                shared_location = other.layout_location;
            }
        }
        if conflicted {
            slot.layout_location = Some(shared_location.unwrap_or_else(|| {
                let loc = self.next_location;
                self.next_location += 1;
                loc
            }));
            self.reqs |= ShaderReq::ENHANCED_LAYOUTS | ShaderReq::SEPARATE_SHADER_OBJECTS;
        }
    }

    /// Two-sided lighting: a fragment Color input also needs the back
    /// color at the same sid and, once, the front-facing built-in.
    fn expand_two_side_color(
        &mut self,
        sid: u32,
        decl: &FullDeclaration,
    ) -> Result<(), TranslateError> {
        if !self.key.color_two_side {
            return Ok(());
        }
        self.two_side_colors.push(sid);

        if !self
            .inputs
            .iter()
            .any(|s| s.name == Semantic::BColor && s.sid == sid)
        {
            if self.inputs.len() >= MAX_INPUTS {
                return Err(CapacityError::new("inputs", MAX_INPUTS).into());
            }
            self.inputs.push(IoSlot {
                name: Semantic::BColor,
                sid,
                first: decl.first,
                last: decl.last,
                array_id: 0,
                usage_mask: decl.usage_mask,
                interpolation: decl
                    .interp
                    .map(|i| i.interpolation)
                    .unwrap_or(Interpolation::Color),
                location: decl.interp.map(|i| i.location).unwrap_or_default(),
                invariant: false,
                glsl_name: format!("{}_bc{}", self.input_prefix(), sid),
                glsl_predefined_no_emit: false,
                glsl_no_index: false,
                override_no_wm: false,
                is_int: false,
                layout_location: None,
            });
        }

        if !self.inputs.iter().any(|s| s.name == Semantic::Face) {
            if self.inputs.len() >= MAX_INPUTS {
                return Err(CapacityError::new("inputs", MAX_INPUTS).into());
            }
            self.inputs.push(IoSlot {
                name: Semantic::Face,
                sid: 0,
                first: 0,
                last: 0,
                array_id: 0,
                usage_mask: 0x1,
                interpolation: Interpolation::Constant,
                location: InterpolateLoc::Center,
                invariant: false,
                glsl_name: "gl_FrontFacing".into(),
                glsl_predefined_no_emit: true,
                glsl_no_index: true,
                override_no_wm: true,
                is_int: false,
                layout_location: None,
            });
        }
        Ok(())
    }

    fn add_system_value(&mut self, decl: &FullDeclaration) -> Result<(), TranslateError> {
        let Some(sem) = decl.semantic else {
            return Err(TranslateError::Unsupported(
                "system value without a semantic".into(),
            ));
        };
        if self
            .system_values
            .iter()
            .any(|s| s.name == sem.name && s.first == decl.first)
        {
            return Ok(());
        }
        if self.system_values.len() >= MAX_SYSTEM_VALUES {
            return Err(CapacityError::new("system values", MAX_SYSTEM_VALUES).into());
        }

        let (name, is_int, req): (&str, bool, ShaderReq) = match sem.name {
            Semantic::InstanceId => (
                "gl_InstanceID",
                true,
                ShaderReq::INSTANCE_ID | ShaderReq::INTS,
            ),
            Semantic::VertexId => ("gl_VertexID", true, ShaderReq::INTS),
            Semantic::SampleId => ("gl_SampleID", true, ShaderReq::SAMPLE_SHADING | ShaderReq::INTS),
            Semantic::SamplePos => ("gl_SamplePosition", false, ShaderReq::SAMPLE_SHADING),
            Semantic::SampleMask => ("gl_SampleMaskIn[0]", true, ShaderReq::SAMPLE_SHADING | ShaderReq::INTS),
            Semantic::InvocationId => ("gl_InvocationID", true, ShaderReq::INTS | ShaderReq::GPU_SHADER5),
            Semantic::TessCoord => ("gl_TessCoord", false, ShaderReq::TESSELLATION),
            Semantic::VerticesIn => ("gl_PatchVerticesIn", true, ShaderReq::INTS | ShaderReq::TESSELLATION),
            Semantic::TessOuter => ("gl_TessLevelOuter", false, ShaderReq::TESSELLATION),
            Semantic::TessInner => ("gl_TessLevelInner", false, ShaderReq::TESSELLATION),
            Semantic::PrimId => ("gl_PrimitiveID", true, ShaderReq::INTS),
            Semantic::ThreadId => ("gl_LocalInvocationID", true, ShaderReq::COMPUTE),
            Semantic::BlockId => ("gl_WorkGroupID", true, ShaderReq::COMPUTE),
            Semantic::GridSize => ("gl_NumWorkGroups", true, ShaderReq::COMPUTE),
            Semantic::BlockSize => ("gl_WorkGroupSize", true, ShaderReq::COMPUTE),
            Semantic::HelperInvocation => ("gl_HelperInvocation", false, ShaderReq::ES31_COMPAT),
            other => {
                return Err(TranslateError::Unsupported(format!(
                    "system value semantic {other:?}"
                )));
            }
        };
        self.require(req);
        self.system_values.push(IoSlot {
            name: sem.name,
            sid: sem.index,
            first: decl.first,
            last: decl.last,
            array_id: 0,
            usage_mask: decl.usage_mask,
            interpolation: Interpolation::Constant,
            location: InterpolateLoc::Center,
            invariant: false,
            glsl_name: name.into(),
            glsl_predefined_no_emit: true,
            glsl_no_index: true,
            override_no_wm: true,
            is_int,
            layout_location: None,
        });
        Ok(())
    }

    fn add_temp_range(&mut self, decl: &FullDeclaration) -> Result<(), TranslateError> {
        let array_id = decl.array_id.unwrap_or(0);
        if self
            .temp_ranges
            .iter()
            .any(|r| r.first == decl.first && r.last == decl.last && r.array_id == array_id)
        {
            return Ok(());
        }
        if self
            .temp_ranges
            .iter()
            .any(|r| r.first <= decl.last && decl.first <= r.last)
        {
            return Err(TranslateError::Unsupported(
                "overlapping temporary ranges".into(),
            ));
        }
        if self.temp_ranges.len() >= MAX_TEMP_RANGES {
            return Err(CapacityError::new("temporary ranges", MAX_TEMP_RANGES).into());
        }
        self.temp_ranges.push(TempRange {
            first: decl.first,
            last: decl.last,
            array_id,
        });
        Ok(())
    }

    fn add_constant(&mut self, decl: &FullDeclaration) -> Result<(), TranslateError> {
        match decl.index2d {
            // Constants without a buffer index live in UBO slot 1 by the
            // base-1 convention; slot 0 is the flat constant array.
            None | Some(0) => {
                self.num_consts = self.num_consts.max(decl.last + 1);
                Ok(())
            }
            Some(buf) => {
                let buf = buf as usize;
                if buf >= MAX_UBOS {
                    return Err(CapacityError::new("uniform buffers", MAX_UBOS).into());
                }
                self.ubo_used_mask |= 1 << buf;
                self.ubo_sizes[buf] = self.ubo_sizes[buf].max(decl.last + 1);
                Ok(())
            }
        }
    }

    fn add_sampler_view(&mut self, decl: &FullDeclaration) -> Result<(), TranslateError> {
        for unit in decl.first..=decl.last {
            let unit = unit as usize;
            if unit >= MAX_SAMPLERS {
                return Err(CapacityError::new("samplers", MAX_SAMPLERS).into());
            }
            let sview = decl.sampler_view.ok_or_else(|| {
                TranslateError::Unsupported("sampler view without a type word".into())
            })?;
            let is_msaa = self.scan.is_msaa_sampler[unit.min(31)];
            let slot = SamplerSlot {
                target: sview.resource,
                return_type: sview.return_types[0],
                is_msaa,
                shadow: sview.resource.is_shadow(),
            };
            self.samplers[unit] = Some(slot);
            self.require_sampler_caps(&slot);
        }
        if self.scan.file_is_indirect(RegisterFile::Sampler)
            || self.scan.file_is_indirect(RegisterFile::SamplerView)
        {
            let samplers = self.samplers;
            let probe = decl.sampler_view.map(|s| (s.resource, s.return_types[0]));
            coalesce_opaque_array(
                &mut self.sampler_arrays,
                decl.first,
                decl.range_len(),
                |arr| {
                    let prev = samplers[(arr.first + arr.array_size - 1) as usize];
                    match (prev, probe) {
                        (Some(a), Some((target, ret))) => {
                            a.target == target && a.return_type == ret
                        }
                        _ => false,
                    }
                },
            );
            self.reqs |= ShaderReq::GPU_SHADER5;
        }
        Ok(())
    }

    fn require_sampler_caps(&mut self, slot: &SamplerSlot) {
        if slot.target.is_rect() {
            self.require(ShaderReq::SAMPLER_RECT);
        }
        if slot.is_msaa || slot.target.is_msaa() {
            self.require(ShaderReq::SAMPLER_MS | ShaderReq::INTS);
        }
        if matches!(
            slot.target,
            TextureTarget::CubeArray | TextureTarget::ShadowCubeArray
        ) {
            self.require(ShaderReq::CUBE_ARRAY);
        }
        if slot.target == TextureTarget::Buffer {
            self.require(ShaderReq::SAMPLER_BUF | ShaderReq::INTS);
        }
        if matches!(slot.return_type, ReturnType::Sint | ReturnType::Uint) {
            self.require(ShaderReq::INTS);
        }
    }

    fn add_image(&mut self, decl: &FullDeclaration) -> Result<(), TranslateError> {
        let image = decl
            .image
            .ok_or_else(|| TranslateError::Unsupported("image without a type word".into()))?;
        for unit in decl.first..=decl.last {
            let unit = unit as usize;
            if unit >= MAX_IMAGES {
                return Err(CapacityError::new("images", MAX_IMAGES).into());
            }
            self.images[unit] = Some(ImageSlot {
                target: image.resource,
                writable: image.writable,
                format: image.format,
            });
        }
        self.require(ShaderReq::IMAGE_LOAD_STORE | ShaderReq::INTS);
        if image.resource == TextureTarget::Buffer {
            self.require(ShaderReq::SAMPLER_BUF);
        }
        if self.scan.file_is_indirect(RegisterFile::Image) {
            let images = self.images;
            coalesce_opaque_array(
                &mut self.image_arrays,
                decl.first,
                decl.range_len(),
                |arr| match images[(arr.first + arr.array_size - 1) as usize] {
                    Some(prev) => prev.target == image.resource && prev.format == image.format,
                    None => false,
                },
            );
            self.reqs |= ShaderReq::GPU_SHADER5;
        }
        Ok(())
    }

    fn add_buffer(&mut self, decl: &FullDeclaration) -> Result<(), TranslateError> {
        for binding in decl.first..=decl.last {
            if binding as usize >= MAX_SSBOS {
                return Err(CapacityError::new("storage buffers", MAX_SSBOS).into());
            }
            self.ssbo_used_mask |= 1 << binding;
            if decl.atomic {
                self.ssbo_atomic_mask |= 1 << binding;
            }
        }
        self.require(ShaderReq::SSBO | ShaderReq::INTS);
        Ok(())
    }

    fn add_hw_atomic(&mut self, decl: &FullDeclaration) -> Result<(), TranslateError> {
        if self.hw_atomics.len() >= MAX_HW_ATOMICS {
            return Err(CapacityError::new("atomic counter buffers", MAX_HW_ATOMICS).into());
        }
        self.hw_atomics.push(HwAtomicRange {
            first: decl.first,
            last: decl.last,
            buffer_id: decl.index2d.unwrap_or(0),
        });
        self.require(ShaderReq::INTS);
        Ok(())
    }

    /// Synthesizes coalesced Generic/Patch ranges for indirectly addressed
    /// IO when the guest sent scalar declarations only. Individual slots in
    /// the affected class stop emitting; references are rewritten into the
    /// range array.
    pub fn setup_io_ranges(&mut self) {
        if self.key.guest_sent_io_arrays {
            return;
        }
        let in_indirect = self.scan.file_is_indirect(RegisterFile::Input);
        let out_indirect = self.scan.file_is_indirect(RegisterFile::Output);
        if in_indirect {
            let prefix = self.input_prefix();
            self.generic_input_range =
                synthesize_range(&mut self.inputs, Semantic::Generic, prefix, "g");
            self.patch_input_range =
                synthesize_range(&mut self.inputs, Semantic::Patch, "patch", "");
        }
        if out_indirect {
            let prefix = self.output_prefix();
            self.generic_output_range =
                synthesize_range(&mut self.outputs, Semantic::Generic, prefix, "g");
            self.patch_output_range =
                synthesize_range(&mut self.outputs, Semantic::Patch, "patch", "");
        }
        if self.generic_input_range.is_some()
            || self.patch_input_range.is_some()
            || self.generic_output_range.is_some()
            || self.patch_output_range.is_some()
        {
            self.reqs |= ShaderReq::GPU_SHADER5;
        }
    }

    /// Prepares the per-entry stream-output decisions.
    pub fn prepare_stream_output(&mut self) -> Result<(), TranslateError> {
        let Some(so) = self.key.stream_output.clone() else {
            return Ok(());
        };
        if so.entries.len() > MAX_SO_OUTPUTS {
            return Err(CapacityError::new("stream outputs", MAX_SO_OUTPUTS).into());
        }
        for (i, entry) in so.entries.iter().enumerate() {
            let slot = self
                .outputs
                .iter()
                .find(|s| s.contains(entry.register_index));
            let decision = match slot {
                Some(slot) => {
                    let whole = entry.start_component == 0
                        && entry.num_components == slot.num_components();
                    let builtin_lvalue = matches!(
                        slot.name,
                        Semantic::ClipDist | Semantic::Position | Semantic::ClipVertex
                    );
                    let need_temp = !whole || builtin_lvalue;
                    SoDecision {
                        entry: *entry,
                        need_temp,
                        glsl_name: if need_temp {
                            format!("tfout{i}")
                        } else {
                            slot.glsl_name.clone()
                        },
                    }
                }
                None => {
                    return Err(TranslateError::Unsupported(format!(
                        "stream output references undeclared output {}",
                        entry.register_index
                    )));
                }
            };
            self.so_decisions.push(decision);
        }
        Ok(())
    }

    // Lookup helpers used by operand resolution.

    pub fn find_input(&self, reg: u32) -> Option<&IoSlot> {
        self.inputs.iter().find(|s| s.contains(reg))
    }

    pub fn find_output(&self, reg: u32) -> Option<&IoSlot> {
        self.outputs.iter().find(|s| s.contains(reg))
    }

    pub fn find_system_value(&self, reg: u32) -> Option<&IoSlot> {
        self.system_values.iter().find(|s| s.contains(reg))
    }

    pub fn find_temp_range(&self, reg: u32) -> Option<&TempRange> {
        self.temp_ranges.iter().find(|r| r.contains(reg))
    }

    pub fn sampler_array_for(&self, unit: u32) -> Option<&OpaqueArray> {
        self.sampler_arrays.iter().find(|a| a.contains(unit))
    }

    pub fn image_array_for(&self, unit: u32) -> Option<&OpaqueArray> {
        self.image_arrays.iter().find(|a| a.contains(unit))
    }

    pub fn sampler_count(&self) -> usize {
        self.samplers.iter().filter(|s| s.is_some()).count()
    }
}

/// Merges a newly declared unit range into the previous descriptor when it
/// is contiguous and `compatible` says the element types match; otherwise
/// starts a new descriptor.
fn coalesce_opaque_array(
    arrays: &mut Vec<OpaqueArray>,
    first: u32,
    len: u32,
    compatible: impl Fn(&OpaqueArray) -> bool,
) {
    if let Some(last) = arrays.last_mut() {
        if last.first + last.array_size == first && compatible(last) {
            last.array_size += len;
            return;
        }
        if last.contains(first) {
            // Re-declaration inside an existing descriptor.
            return;
        }
    }
    arrays.push(OpaqueArray {
        first,
        array_size: len,
    });
}

/// Coalesces every slot of `class` into one range pseudo-slot spanning the
/// observed sid interval; the individual slots are muted.
fn synthesize_range(
    slots: &mut [IoSlot],
    class: Semantic,
    prefix: &str,
    infix: &str,
) -> Option<IoRange> {
    let mut sid_start = u32::MAX;
    let mut sid_end = 0;
    for slot in slots.iter().filter(|s| s.name == class) {
        sid_start = sid_start.min(slot.sid);
        sid_end = sid_end.max(slot.sid);
    }
    if sid_start == u32::MAX {
        return None;
    }
    for slot in slots.iter_mut().filter(|s| s.name == class) {
        slot.glsl_predefined_no_emit = true;
    }
    Some(IoRange {
        sid_start,
        sid_end,
        glsl_name: format!("{prefix}_{infix}{sid_start}"),
        used: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use virgl_tgsi::encode::{DeclSpec, StreamBuilder};
    use virgl_tgsi::scan::scan_shader;
    use virgl_tgsi::token::{Opcode, Semantic, WRITEMASK_XYZW};
    use virgl_tgsi::TokenStream;

    fn ctx_from(b: StreamBuilder, key: ShaderKey) -> Result<TranslationCtx, TranslateError> {
        let words = b.finish();
        let scan = scan_shader(&words)?;
        let cfg = ShaderCfg::default();
        let mut ctx = TranslationCtx::new(&cfg, &key, scan, 0);
        let mut ts = TokenStream::new(&words)?;
        while !ts.at_end() {
            let tok = ts.next()?;
            ctx.ingest(&tok)?;
        }
        Ok(ctx)
    }

    #[test]
    fn identical_declaration_is_idempotent() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl_io(RegisterFile::Output, 0, 0, Semantic::Position, 0);
        b.decl_io(RegisterFile::Output, 0, 0, Semantic::Position, 0);
        b.op_end();
        let ctx = ctx_from(b, ShaderKey::default()).unwrap();
        assert_eq!(ctx.outputs.len(), 1);
    }

    #[test]
    fn clip_dist_lanes_count_four_per_register() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl(
            DeclSpec::new(RegisterFile::Output, 1, 2)
                .semantic(Semantic::ClipDist, 0)
                .usage_mask(WRITEMASK_XYZW),
        );
        b.op_end();
        let ctx = ctx_from(b, ShaderKey::default()).unwrap();
        assert_eq!(ctx.num_clip_dist_out, 8);
        assert!(ctx.reqs.contains(ShaderReq::CLIP_DISTANCE));
    }

    #[test]
    fn two_sided_color_expands_to_three_slots() {
        let mut b = StreamBuilder::new(Processor::Fragment);
        b.decl_io(RegisterFile::Input, 0, 0, Semantic::Color, 0);
        b.op_end();
        let key = ShaderKey {
            color_two_side: true,
            ..Default::default()
        };
        let ctx = ctx_from(b, key).unwrap();
        assert_eq!(ctx.inputs.len(), 3);
        assert!(ctx.inputs.iter().any(|s| s.name == Semantic::Color));
        assert!(ctx.inputs.iter().any(|s| s.name == Semantic::BColor));
        assert!(ctx
            .inputs
            .iter()
            .any(|s| s.name == Semantic::Face && s.glsl_name == "gl_FrontFacing"));
    }

    #[test]
    fn face_is_synthesized_once() {
        let mut b = StreamBuilder::new(Processor::Fragment);
        b.decl_io(RegisterFile::Input, 0, 0, Semantic::Color, 0);
        b.decl_io(RegisterFile::Input, 1, 1, Semantic::Color, 1);
        b.op_end();
        let key = ShaderKey {
            color_two_side: true,
            ..Default::default()
        };
        let ctx = ctx_from(b, key).unwrap();
        let faces = ctx
            .inputs
            .iter()
            .filter(|s| s.name == Semantic::Face)
            .count();
        assert_eq!(faces, 1);
        assert_eq!(ctx.inputs.len(), 5);
    }

    #[test]
    fn output_capacity_overflow_is_reported() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        for i in 0..(MAX_OUTPUTS as u32 + 1) {
            b.decl_io(RegisterFile::Output, i, i, Semantic::Generic, i);
        }
        b.op_end();
        let err = ctx_from(b, ShaderKey::default()).unwrap_err();
        match err {
            TranslateError::Capacity(c) => assert_eq!(c.table, "outputs"),
            other => panic!("expected capacity error, got {other:?}"),
        }
    }

    #[test]
    fn overlapping_temp_ranges_are_rejected() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl_range(RegisterFile::Temporary, 0, 3);
        b.decl_range(RegisterFile::Temporary, 2, 5);
        b.op_end();
        assert!(ctx_from(b, ShaderKey::default()).is_err());
    }

    #[test]
    fn temp_lookup_finds_owning_range() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl_range(RegisterFile::Temporary, 0, 3);
        b.decl_range(RegisterFile::Temporary, 4, 7);
        b.op_end();
        let ctx = ctx_from(b, ShaderKey::default()).unwrap();
        assert_eq!(ctx.find_temp_range(5).unwrap().first, 4);
        assert!(ctx.find_temp_range(8).is_none());
    }

    #[test]
    fn sampler_views_coalesce_when_compatible() {
        use virgl_tgsi::encode::{DstSpec, IndSpec, InstSpec, SrcSpec};
        use virgl_tgsi::token::{ReturnType, TextureTarget};

        let mut b = StreamBuilder::new(Processor::Fragment);
        for i in 0..2 {
            b.decl(
                DeclSpec::new(RegisterFile::SamplerView, i * 2, i * 2 + 1)
                    .sview(TextureTarget::Tex2D, ReturnType::Float),
            );
        }
        b.decl_range(RegisterFile::Temporary, 0, 0);
        // Indirect sampler read forces the coalescing path.
        b.inst(
            InstSpec::new(Opcode::Tex)
                .texture(TextureTarget::Tex2D)
                .dst(DstSpec::new(RegisterFile::Temporary, 0))
                .src(SrcSpec::new(RegisterFile::Temporary, 0))
                .src(SrcSpec::new(RegisterFile::Sampler, 0).indirect(IndSpec::addr(0))),
        );
        b.op_end();
        let ctx = ctx_from(b, ShaderKey::default()).unwrap();
        assert_eq!(
            ctx.sampler_arrays,
            vec![OpaqueArray {
                first: 0,
                array_size: 4
            }]
        );
    }

    #[test]
    fn incompatible_sampler_views_stay_separate() {
        use virgl_tgsi::encode::{DstSpec, IndSpec, InstSpec, SrcSpec};
        use virgl_tgsi::token::{ReturnType, TextureTarget};

        let mut b = StreamBuilder::new(Processor::Fragment);
        b.decl(
            DeclSpec::new(RegisterFile::SamplerView, 0, 1)
                .sview(TextureTarget::Tex2D, ReturnType::Float),
        );
        b.decl(
            DeclSpec::new(RegisterFile::SamplerView, 2, 3)
                .sview(TextureTarget::Tex2D, ReturnType::Uint),
        );
        b.decl_range(RegisterFile::Temporary, 0, 0);
        b.inst(
            InstSpec::new(Opcode::Tex)
                .texture(TextureTarget::Tex2D)
                .dst(DstSpec::new(RegisterFile::Temporary, 0))
                .src(SrcSpec::new(RegisterFile::Temporary, 0))
                .src(SrcSpec::new(RegisterFile::Sampler, 0).indirect(IndSpec::addr(0))),
        );
        b.op_end();
        let ctx = ctx_from(b, ShaderKey::default()).unwrap();
        assert_eq!(ctx.sampler_arrays.len(), 2);
    }

    #[test]
    fn constants_follow_the_ubo_base_one_convention() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl(DeclSpec::new(RegisterFile::Constant, 0, 15));
        b.decl(DeclSpec::new(RegisterFile::Constant, 0, 7).dim2d(3));
        b.op_end();
        let ctx = ctx_from(b, ShaderKey::default()).unwrap();
        assert_eq!(ctx.num_consts, 16);
        assert_eq!(ctx.ubo_used_mask, 1 << 3);
        assert_eq!(ctx.ubo_sizes[3], 8);
    }

    #[test]
    fn overlapping_generics_get_distinct_locations() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl(
            DeclSpec::new(RegisterFile::Output, 2, 2)
                .semantic(Semantic::Generic, 3)
                .usage_mask(0b0011),
        );
        b.decl(
            DeclSpec::new(RegisterFile::Output, 2, 2)
                .semantic(Semantic::Generic, 4)
                .usage_mask(0b1100),
        );
        b.op_end();
        let ctx = ctx_from(b, ShaderKey::default()).unwrap();
        let a = ctx.outputs[0].layout_location.unwrap();
        let b2 = ctx.outputs[1].layout_location.unwrap();
        assert_eq!(a, b2, "identical first register shares one location");
        assert!(ctx.reqs.contains(ShaderReq::ENHANCED_LAYOUTS));
        assert!(ctx.reqs.contains(ShaderReq::SEPARATE_SHADER_OBJECTS));
    }
}
