//! Aggregate statistics pass over a token stream.
//!
//! One forward walk collecting everything later capability decisions need:
//! per-file usage masks and maxima, input semantics with accumulated read
//! masks, array declarations, an opcode histogram, control-flow depth,
//! indirect-addressing file masks and the MSAA-sampler cross-reference.

use crate::decode::{FullToken, TokenStream};
use crate::token::{
    Interpolation, Opcode, Processor, Property, RegisterFile, Semantic, FILE_COUNT, OPCODE_LAST,
    PROPERTY_COUNT,
};
use crate::DecodeError;

/// Register capacity the scanner tracks per IO file.
pub const SCAN_MAX_IO: usize = 64;

/// Constant-buffer slots tracked by the 2D constant statistics.
pub const SCAN_MAX_CONST_BUFFERS: usize = 32;

/// Sampler units tracked by the MSAA cross-reference.
pub const SCAN_MAX_SAMPLERS: usize = 32;

/// One guest-declared register array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDecl {
    pub file: RegisterFile,
    pub id: u32,
    pub first: u32,
    pub last: u32,
}

/// Everything the scan pass learns about one shader.
#[derive(Debug, Clone)]
pub struct ShaderScanInfo {
    pub processor: Processor,

    /// Bitmask of the first 32 declared indices, per file.
    pub file_mask: [u32; FILE_COUNT],
    /// Number of declared registers, per file.
    pub file_count: [u32; FILE_COUNT],
    /// Highest declared index per file, `-1` when the file is unused.
    pub file_max: [i32; FILE_COUNT],
    /// Highest declared index per 2D constant buffer, `-1` when unused.
    pub const_file_max: [i32; SCAN_MAX_CONST_BUFFERS],
    pub const_buffers_declared: u32,

    pub input_semantic: [Option<(Semantic, u32)>; SCAN_MAX_IO],
    pub input_interpolate: [Interpolation; SCAN_MAX_IO],
    /// Lanes of each input ever read by an instruction source.
    pub input_usage_mask: [u8; SCAN_MAX_IO],

    pub arrays: Vec<ArrayDecl>,

    pub opcode_count: [u32; OPCODE_LAST],
    pub num_instructions: u32,
    pub num_immediates: u32,
    pub max_depth: u32,

    /// Per-file bit set when any operand addresses the file indirectly.
    pub indirect_files: u32,
    pub indirect_files_read: u32,
    pub indirect_files_written: u32,
    /// Per-file bit set when a 2D dimension index is itself indirect.
    pub dim_indirect_files: u32,

    pub samplers_declared: u32,
    pub is_msaa_sampler: [bool; SCAN_MAX_SAMPLERS],

    pub properties: [Option<u32>; PROPERTY_COUNT],

    pub writes_position: bool,
    pub writes_psize: bool,
    pub writes_clipvertex: bool,
    pub num_written_clipdistance: u32,
    pub num_written_culldistance: u32,

    pub uses_doubles: bool,
}

impl ShaderScanInfo {
    fn new(processor: Processor) -> Self {
        Self {
            processor,
            file_mask: [0; FILE_COUNT],
            file_count: [0; FILE_COUNT],
            file_max: [-1; FILE_COUNT],
            const_file_max: [-1; SCAN_MAX_CONST_BUFFERS],
            const_buffers_declared: 0,
            input_semantic: [None; SCAN_MAX_IO],
            input_interpolate: [Interpolation::Constant; SCAN_MAX_IO],
            input_usage_mask: [0; SCAN_MAX_IO],
            arrays: Vec::new(),
            opcode_count: [0; OPCODE_LAST],
            num_instructions: 0,
            num_immediates: 0,
            max_depth: 0,
            indirect_files: 0,
            indirect_files_read: 0,
            indirect_files_written: 0,
            dim_indirect_files: 0,
            samplers_declared: 0,
            is_msaa_sampler: [false; SCAN_MAX_SAMPLERS],
            properties: [None; PROPERTY_COUNT],
            writes_position: false,
            writes_psize: false,
            writes_clipvertex: false,
            num_written_clipdistance: 0,
            num_written_culldistance: 0,
            uses_doubles: false,
        }
    }

    pub fn property(&self, name: Property) -> Option<u32> {
        self.properties[name.raw() as usize]
    }

    pub fn file_is_indirect(&self, file: RegisterFile) -> bool {
        self.indirect_files & (1 << file.index()) != 0
    }

    pub fn array_for(&self, file: RegisterFile, id: u32) -> Option<&ArrayDecl> {
        self.arrays.iter().find(|a| a.file == file && a.id == id)
    }

    fn record_range(&mut self, file: RegisterFile, first: u32, last: u32) {
        let fi = file.index();
        for reg in first..=last {
            if reg < 32 && self.file_mask[fi] & (1 << reg) != 0 {
                // Re-declaration; counted once.
                continue;
            }
            if reg < 32 {
                self.file_mask[fi] |= 1 << reg;
            }
            self.file_count[fi] += 1;
        }
        self.file_max[fi] = self.file_max[fi].max(last as i32);
    }
}

/// Input-primitive vertex counts for geometry retro-sizing.
fn vertices_per_input_prim(prim: u32) -> u32 {
    match prim {
        0 => 1,       // points
        1..=3 => 2,   // lines / line loop / line strip
        4..=6 => 3,   // triangles / strip / fan
        12 | 13 => 4, // lines adjacency
        14 | 15 => 6, // triangles adjacency
        _ => 0,
    }
}

/// Runs the scan pass over a complete token buffer.
pub fn scan_shader(words: &[u32]) -> Result<ShaderScanInfo, DecodeError> {
    let mut ts = TokenStream::new(words)?;
    let mut info = ShaderScanInfo::new(ts.processor());
    let mut depth: u32 = 0;

    while !ts.at_end() {
        match ts.next()? {
            FullToken::Declaration(decl) => scan_declaration(&mut info, &decl)?,
            FullToken::Immediate(_) => info.num_immediates += 1,
            FullToken::Instruction(inst) => {
                scan_instruction(&mut info, &inst, &mut depth);
            }
            FullToken::Property(prop) => {
                if let Some(name) = prop.name {
                    info.properties[name.raw() as usize] = Some(prop.value());
                    if name == Property::GsInputPrim && info.processor == Processor::Geometry {
                        retro_size_gs_inputs(&mut info, prop.value());
                    }
                }
            }
        }
    }
    Ok(info)
}

fn scan_declaration(
    info: &mut ShaderScanInfo,
    decl: &crate::decode::FullDeclaration,
) -> Result<(), DecodeError> {
    if decl.file == RegisterFile::Constant {
        // 2D constants track per-buffer maxima instead of the flat mask.
        if let Some(index2d) = decl.index2d {
            let buf = index2d as usize;
            if buf < SCAN_MAX_CONST_BUFFERS {
                info.const_buffers_declared |= 1 << buf;
                info.const_file_max[buf] = info.const_file_max[buf].max(decl.last as i32);
            }
            return Ok(());
        }
        info.const_buffers_declared |= 1;
        info.const_file_max[0] = info.const_file_max[0].max(decl.last as i32);
    }

    info.record_range(decl.file, decl.first, decl.last);

    if let Some(array_id) = decl.array_id {
        if array_id != 0 {
            info.arrays.push(ArrayDecl {
                file: decl.file,
                id: array_id,
                first: decl.first,
                last: decl.last,
            });
        }
    }

    match decl.file {
        RegisterFile::Input => {
            for reg in decl.first..=decl.last {
                let slot = reg as usize;
                if slot >= SCAN_MAX_IO {
                    break;
                }
                if let Some(sem) = decl.semantic {
                    // Register ranges share the semantic, with consecutive sids.
                    info.input_semantic[slot] = Some((sem.name, sem.index + (reg - decl.first)));
                }
                if let Some(interp) = decl.interp {
                    info.input_interpolate[slot] = interp.interpolation;
                }
            }
        }
        RegisterFile::Output => {
            if let Some(sem) = decl.semantic {
                match sem.name {
                    Semantic::Position => info.writes_position = true,
                    Semantic::PointSize => info.writes_psize = true,
                    Semantic::ClipVertex => info.writes_clipvertex = true,
                    Semantic::ClipDist => {
                        info.num_written_clipdistance += 4 * decl.range_len();
                    }
                    Semantic::CullDist => {
                        info.num_written_culldistance += 4 * decl.range_len();
                    }
                    _ => {}
                }
            }
        }
        RegisterFile::Sampler => {
            for reg in decl.first..=decl.last {
                if (reg as usize) < SCAN_MAX_SAMPLERS {
                    info.samplers_declared |= 1 << reg;
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn scan_instruction(
    info: &mut ShaderScanInfo,
    inst: &crate::decode::FullInstruction,
    depth: &mut u32,
) {
    info.num_instructions += 1;
    let raw = inst.opcode.raw() as usize;
    if raw < OPCODE_LAST {
        info.opcode_count[raw] += 1;
    }
    if inst.opcode.uses_doubles() {
        info.uses_doubles = true;
    }

    match inst.opcode {
        Opcode::If | Opcode::Uif | Opcode::BgnLoop => {
            *depth += 1;
            info.max_depth = info.max_depth.max(*depth);
        }
        Opcode::EndIf | Opcode::EndLoop => {
            *depth = depth.saturating_sub(1);
        }
        _ => {}
    }

    for dst in &inst.dsts {
        if dst.indirect.is_some() {
            let bit = 1 << dst.file.index();
            info.indirect_files |= bit;
            info.indirect_files_written |= bit;
        }
        if let Some(dim) = dst.dimension {
            if dim.indirect.is_some() {
                info.dim_indirect_files |= 1 << dst.file.index();
            }
        }
    }

    for src in &inst.srcs {
        if src.indirect.is_some() {
            let bit = 1 << src.file.index();
            info.indirect_files |= bit;
            info.indirect_files_read |= bit;
        }
        if let Some(dim) = src.dimension {
            if dim.indirect.is_some() {
                info.dim_indirect_files |= 1 << src.file.index();
            }
        }
        if src.file == RegisterFile::Input && src.indirect.is_none() {
            let slot = src.index as usize;
            if slot < SCAN_MAX_IO {
                info.input_usage_mask[slot] |= src.read_mask();
            }
        }
    }

    // MSAA targets force a multisample sampler type on the referenced unit.
    if let Some(tex) = &inst.texture {
        if tex.target.is_msaa() && inst.opcode.is_tex() {
            if let Some(sampler) = inst
                .srcs
                .iter()
                .rev()
                .find(|s| s.file == RegisterFile::Sampler)
            {
                let unit = sampler.index as usize;
                if unit < SCAN_MAX_SAMPLERS {
                    info.is_msaa_sampler[unit] = true;
                }
            }
        }
    }
}

fn retro_size_gs_inputs(info: &mut ShaderScanInfo, prim: u32) {
    let vertices = vertices_per_input_prim(prim);
    let fi = RegisterFile::Input.index();
    if vertices > info.file_count[fi] {
        info.file_count[fi] = vertices;
        info.file_max[fi] = info.file_max[fi].max(vertices as i32 - 1);
        for reg in 0..vertices.min(32) {
            info.file_mask[fi] |= 1 << reg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{DeclSpec, DstSpec, IndSpec, InstSpec, SrcSpec, StreamBuilder};
    use crate::token::{ReturnType, Swizzle, TextureTarget, WRITEMASK_XYZW};
    use pretty_assertions::assert_eq;

    fn scan(b: StreamBuilder) -> ShaderScanInfo {
        scan_shader(&b.finish()).unwrap()
    }

    #[test]
    fn usage_mask_is_union_of_swizzle_reads() {
        let mut b = StreamBuilder::new(Processor::Fragment);
        b.decl_io(RegisterFile::Input, 0, 0, Semantic::Generic, 0);
        b.decl_range(RegisterFile::Temporary, 0, 1);
        // Read .x then .zw: accumulated mask must be X|Z|W.
        b.inst(
            InstSpec::new(Opcode::Mov)
                .dst(DstSpec::new(RegisterFile::Temporary, 0))
                .src(SrcSpec::new(RegisterFile::Input, 0).scalar(Swizzle::X)),
        );
        b.inst(
            InstSpec::new(Opcode::Mov)
                .dst(DstSpec::new(RegisterFile::Temporary, 1))
                .src(SrcSpec::new(RegisterFile::Input, 0).swizzle(
                    Swizzle::Z,
                    Swizzle::W,
                    Swizzle::Z,
                    Swizzle::W,
                )),
        );
        b.op_end();
        let info = scan(b);
        assert_eq!(info.input_usage_mask[0], 0b1101);
    }

    #[test]
    fn control_flow_depth_is_tracked() {
        let mut b = StreamBuilder::new(Processor::Fragment);
        b.decl_range(RegisterFile::Temporary, 0, 0);
        let t0 = || SrcSpec::new(RegisterFile::Temporary, 0);
        b.inst(InstSpec::new(Opcode::If).src(t0()));
        b.inst(InstSpec::new(Opcode::BgnLoop));
        b.inst(InstSpec::new(Opcode::Uif).src(t0()));
        b.inst(InstSpec::new(Opcode::Brk));
        b.inst(InstSpec::new(Opcode::EndIf));
        b.inst(InstSpec::new(Opcode::EndLoop));
        b.inst(InstSpec::new(Opcode::EndIf));
        b.op_end();
        let info = scan(b);
        assert_eq!(info.max_depth, 3);
        assert_eq!(info.opcode_count[Opcode::Uif.raw() as usize], 1);
    }

    #[test]
    fn gs_inputs_are_sized_from_the_input_prim_property() {
        let mut b = StreamBuilder::new(Processor::Geometry);
        b.property(Property::GsInputPrim, 4); // triangles
        b.decl_io(RegisterFile::Input, 0, 0, Semantic::Position, 0);
        b.op_end();
        let info = scan(b);
        let fi = RegisterFile::Input.index();
        assert_eq!(info.file_count[fi], 3);
        assert_eq!(info.file_max[fi], 2);
        assert_eq!(info.file_mask[fi], 0b111);
    }

    #[test]
    fn msaa_sampler_is_cross_referenced() {
        let mut b = StreamBuilder::new(Processor::Fragment);
        b.decl_sampler(1, TextureTarget::Tex2DMsaa, ReturnType::Float);
        b.decl_range(RegisterFile::Temporary, 0, 0);
        b.inst(
            InstSpec::new(Opcode::Txf)
                .texture(TextureTarget::Tex2DMsaa)
                .dst(DstSpec::new(RegisterFile::Temporary, 0))
                .src(SrcSpec::new(RegisterFile::Temporary, 0))
                .src(SrcSpec::new(RegisterFile::Sampler, 1)),
        );
        b.op_end();
        let info = scan(b);
        assert!(info.is_msaa_sampler[1]);
        assert!(!info.is_msaa_sampler[0]);
        assert_eq!(info.samplers_declared, 0b10);
    }

    #[test]
    fn indirect_files_distinguish_read_and_write() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl_range(RegisterFile::Temporary, 0, 3);
        b.decl_range(RegisterFile::Address, 0, 0);
        b.inst(
            InstSpec::new(Opcode::Mov)
                .dst(DstSpec::new(RegisterFile::Temporary, 0).indirect(IndSpec::addr(0)))
                .src(SrcSpec::new(RegisterFile::Constant, 0)),
        );
        b.op_end();
        let info = scan(b);
        let bit = 1 << RegisterFile::Temporary.index();
        assert_eq!(info.indirect_files & bit, bit);
        assert_eq!(info.indirect_files_written & bit, bit);
        assert_eq!(info.indirect_files_read & bit, 0);
    }

    #[test]
    fn clipdist_lane_accounting() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl(
            DeclSpec::new(RegisterFile::Output, 1, 2)
                .semantic(Semantic::ClipDist, 0)
                .usage_mask(WRITEMASK_XYZW),
        );
        b.op_end();
        let info = scan(b);
        assert_eq!(info.num_written_clipdistance, 8);
    }

    #[test]
    fn const_buffers_track_per_buffer_maxima() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl(DeclSpec::new(RegisterFile::Constant, 0, 15));
        b.decl(DeclSpec::new(RegisterFile::Constant, 0, 7).dim2d(2));
        b.decl(DeclSpec::new(RegisterFile::Constant, 0, 11).dim2d(2));
        b.op_end();
        let info = scan(b);
        assert_eq!(info.const_file_max[0], 15);
        assert_eq!(info.const_file_max[2], 11);
        assert_eq!(info.const_buffers_declared, 0b101);
    }
}
