//! Programmatic token-stream construction.
//!
//! `StreamBuilder` assembles well-formed TGSI word buffers: each record's
//! `nr_tokens` field is filled in from the words actually emitted, and the
//! header's body size is computed at `finish`. Used throughout the test
//! suites.

use crate::token::{
    self, ImmediateType, Interpolation, InterpolateLoc, Opcode, Processor, Property, RegisterFile,
    ReturnType, Semantic, Swizzle, TextureTarget, TokenKind,
};

/// Indirect-addressing spec for an operand or dimension.
#[derive(Debug, Clone, Copy)]
pub struct IndSpec {
    pub file: RegisterFile,
    pub index: i32,
    pub swizzle: Swizzle,
    pub array_id: u32,
}

impl IndSpec {
    pub fn addr(index: i32) -> Self {
        Self {
            file: RegisterFile::Address,
            index,
            swizzle: Swizzle::X,
            array_id: 0,
        }
    }

    pub fn temp(index: i32) -> Self {
        Self {
            file: RegisterFile::Temporary,
            index,
            swizzle: Swizzle::X,
            array_id: 0,
        }
    }

    fn word(&self) -> u32 {
        self.file.raw()
            | (((self.index as u32) & 0xFFFF) << 4)
            | (self.swizzle.raw() << 20)
            | (self.array_id << 22)
    }
}

/// Dimension spec (2D constant index, per-vertex index).
#[derive(Debug, Clone, Copy)]
pub struct DimSpec {
    pub index: i32,
    pub indirect: Option<IndSpec>,
}

impl DimSpec {
    pub fn at(index: i32) -> Self {
        Self {
            index,
            indirect: None,
        }
    }

    pub fn indirect(ind: IndSpec) -> Self {
        Self {
            index: 0,
            indirect: Some(ind),
        }
    }

    fn word(&self) -> u32 {
        let mut w = ((self.index as u32) & 0xFFFF) << 16;
        if self.indirect.is_some() {
            w |= 1;
        }
        w
    }
}

/// Destination operand spec.
#[derive(Debug, Clone, Copy)]
pub struct DstSpec {
    pub file: RegisterFile,
    pub index: i32,
    pub write_mask: u8,
    pub indirect: Option<IndSpec>,
    pub dimension: Option<DimSpec>,
}

impl DstSpec {
    pub fn new(file: RegisterFile, index: i32) -> Self {
        Self {
            file,
            index,
            write_mask: token::WRITEMASK_XYZW,
            indirect: None,
            dimension: None,
        }
    }

    pub fn mask(mut self, write_mask: u8) -> Self {
        self.write_mask = write_mask;
        self
    }

    pub fn indirect(mut self, ind: IndSpec) -> Self {
        self.indirect = Some(ind);
        self
    }

    pub fn dim(mut self, dim: DimSpec) -> Self {
        self.dimension = Some(dim);
        self
    }

    fn word(&self) -> u32 {
        let mut w = self.file.raw()
            | ((self.write_mask as u32) << 4)
            | (((self.index as u32) & 0xFFFF) << 10);
        if self.indirect.is_some() {
            w |= 1 << 8;
        }
        if self.dimension.is_some() {
            w |= 1 << 9;
        }
        w
    }
}

/// Source operand spec, identity swizzle by default.
#[derive(Debug, Clone, Copy)]
pub struct SrcSpec {
    pub file: RegisterFile,
    pub index: i32,
    pub swizzle: [Swizzle; 4],
    pub negate: bool,
    pub absolute: bool,
    pub indirect: Option<IndSpec>,
    pub dimension: Option<DimSpec>,
}

impl SrcSpec {
    pub fn new(file: RegisterFile, index: i32) -> Self {
        Self {
            file,
            index,
            swizzle: [Swizzle::X, Swizzle::Y, Swizzle::Z, Swizzle::W],
            negate: false,
            absolute: false,
            indirect: None,
            dimension: None,
        }
    }

    pub fn swizzle(mut self, x: Swizzle, y: Swizzle, z: Swizzle, w: Swizzle) -> Self {
        self.swizzle = [x, y, z, w];
        self
    }

    /// Replicates one lane across the whole swizzle.
    pub fn scalar(mut self, lane: Swizzle) -> Self {
        self.swizzle = [lane; 4];
        self
    }

    pub fn negate(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn absolute(mut self) -> Self {
        self.absolute = true;
        self
    }

    pub fn indirect(mut self, ind: IndSpec) -> Self {
        self.indirect = Some(ind);
        self
    }

    pub fn dim(mut self, dim: DimSpec) -> Self {
        self.dimension = Some(dim);
        self
    }

    fn word(&self) -> u32 {
        let mut w = self.file.raw() | (((self.index as u32) & 0xFFFF) << 6);
        for (lane, sw) in self.swizzle.iter().enumerate() {
            w |= sw.raw() << (22 + 2 * lane as u32);
        }
        if self.indirect.is_some() {
            w |= 1 << 4;
        }
        if self.dimension.is_some() {
            w |= 1 << 5;
        }
        if self.absolute {
            w |= 1 << 30;
        }
        if self.negate {
            w |= 1 << 31;
        }
        w
    }
}

/// Declaration spec; only the sub-records with set fields are emitted.
#[derive(Debug, Clone, Copy)]
pub struct DeclSpec {
    pub file: RegisterFile,
    pub first: u32,
    pub last: u32,
    pub usage_mask: u8,
    pub index2d: Option<u32>,
    pub interp: Option<(Interpolation, InterpolateLoc)>,
    pub semantic: Option<(Semantic, u32)>,
    pub image: Option<(TextureTarget, bool, u32)>,
    pub sview: Option<(TextureTarget, ReturnType)>,
    pub array_id: Option<u32>,
    pub invariant: bool,
    pub local: bool,
    pub atomic: bool,
    pub mem_type: u32,
}

impl DeclSpec {
    pub fn new(file: RegisterFile, first: u32, last: u32) -> Self {
        Self {
            file,
            first,
            last,
            usage_mask: token::WRITEMASK_XYZW,
            index2d: None,
            interp: None,
            semantic: None,
            image: None,
            sview: None,
            array_id: None,
            invariant: false,
            local: false,
            atomic: false,
            mem_type: 0,
        }
    }

    pub fn usage_mask(mut self, mask: u8) -> Self {
        self.usage_mask = mask;
        self
    }

    pub fn semantic(mut self, name: Semantic, sid: u32) -> Self {
        self.semantic = Some((name, sid));
        self
    }

    pub fn interp(mut self, interpolation: Interpolation, location: InterpolateLoc) -> Self {
        self.interp = Some((interpolation, location));
        self
    }

    pub fn dim2d(mut self, index2d: u32) -> Self {
        self.index2d = Some(index2d);
        self
    }

    pub fn sview(mut self, target: TextureTarget, ret: ReturnType) -> Self {
        self.sview = Some((target, ret));
        self
    }

    pub fn image(mut self, target: TextureTarget, writable: bool, format: u32) -> Self {
        self.image = Some((target, writable, format));
        self
    }

    pub fn array(mut self, array_id: u32) -> Self {
        self.array_id = Some(array_id);
        self
    }

    pub fn atomic(mut self) -> Self {
        self.atomic = true;
        self
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }
}

/// Instruction spec.
#[derive(Debug, Clone)]
pub struct InstSpec {
    pub opcode: Opcode,
    pub saturate: bool,
    pub precise: bool,
    pub label: Option<u32>,
    pub texture: Option<TextureTarget>,
    pub tex_offsets: Vec<(RegisterFile, i32, [Swizzle; 3])>,
    pub memory: Option<(u32, u32, u32)>,
    pub dsts: Vec<DstSpec>,
    pub srcs: Vec<SrcSpec>,
}

impl InstSpec {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            saturate: false,
            precise: false,
            label: None,
            texture: None,
            tex_offsets: Vec::new(),
            memory: None,
            dsts: Vec::new(),
            srcs: Vec::new(),
        }
    }

    pub fn dst(mut self, dst: DstSpec) -> Self {
        self.dsts.push(dst);
        self
    }

    pub fn src(mut self, src: SrcSpec) -> Self {
        self.srcs.push(src);
        self
    }

    pub fn texture(mut self, target: TextureTarget) -> Self {
        self.texture = Some(target);
        self
    }

    pub fn tex_offset(mut self, file: RegisterFile, index: i32, swizzle: [Swizzle; 3]) -> Self {
        self.tex_offsets.push((file, index, swizzle));
        self
    }

    pub fn memory(mut self, qualifier: u32, texture_raw: u32, format: u32) -> Self {
        self.memory = Some((qualifier, texture_raw, format));
        self
    }

    pub fn saturate(mut self) -> Self {
        self.saturate = true;
        self
    }
}

/// Assembles a complete token stream.
#[derive(Debug, Clone)]
pub struct StreamBuilder {
    processor: Processor,
    body: Vec<u32>,
}

impl StreamBuilder {
    pub fn new(processor: Processor) -> Self {
        Self {
            processor,
            body: Vec::new(),
        }
    }

    /// Prepends the two-word header and returns the finished buffer.
    pub fn finish(self) -> Vec<u32> {
        let mut words = Vec::with_capacity(self.body.len() + 2);
        words.push(token::pack_header(2, self.body.len() as u32));
        words.push(self.processor.raw());
        words.extend_from_slice(&self.body);
        words
    }

    pub fn decl(&mut self, spec: DeclSpec) -> &mut Self {
        let start = self.body.len();
        let mut head = TokenKind::Declaration.raw()
            | (spec.file.raw() << 12)
            | ((spec.usage_mask as u32) << 16)
            | (spec.mem_type << 27);
        if spec.index2d.is_some() {
            head |= 1 << 20;
        }
        if spec.semantic.is_some() {
            head |= 1 << 21;
        }
        if spec.interp.is_some() {
            head |= 1 << 22;
        }
        if spec.invariant {
            head |= 1 << 23;
        }
        if spec.local {
            head |= 1 << 24;
        }
        if spec.array_id.is_some() {
            head |= 1 << 25;
        }
        if spec.atomic {
            head |= 1 << 26;
        }
        self.body.push(head);
        self.body.push(spec.first | (spec.last << 16));
        if let Some(index2d) = spec.index2d {
            self.body.push(index2d & 0xFFFF);
        }
        if let Some((interp, loc)) = spec.interp {
            self.body.push(interp.raw() | (loc.raw() << 4));
        }
        if let Some((name, sid)) = spec.semantic {
            self.body.push(name.raw() | (sid << 8));
        }
        if spec.file == RegisterFile::Image {
            let (target, writable, format) = spec
                .image
                .unwrap_or((TextureTarget::Tex2D, false, 0));
            let mut w = target.raw() | (format << 10);
            if writable {
                w |= 1 << 9;
            }
            self.body.push(w);
        }
        if spec.file == RegisterFile::SamplerView {
            let (target, ret) = spec.sview.unwrap_or((TextureTarget::Tex2D, ReturnType::Float));
            let mut w = target.raw();
            for lane in 0..4u32 {
                w |= ret.raw() << (8 + 6 * lane);
            }
            self.body.push(w);
        }
        if let Some(array_id) = spec.array_id {
            self.body.push(array_id & 0x3FF);
        }
        self.patch_nr_tokens(start, 4, 0xFF);
        self
    }

    pub fn imm_f32(&mut self, lanes: [f32; 4]) -> &mut Self {
        self.imm(ImmediateType::Float32, lanes.map(f32::to_bits))
    }

    pub fn imm_u32(&mut self, lanes: [u32; 4]) -> &mut Self {
        self.imm(ImmediateType::Uint32, lanes)
    }

    pub fn imm_i32(&mut self, lanes: [i32; 4]) -> &mut Self {
        self.imm(ImmediateType::Int32, lanes.map(|v| v as u32))
    }

    pub fn imm_f64(&mut self, lo: f64, hi: f64) -> &mut Self {
        let lo = lo.to_bits();
        let hi = hi.to_bits();
        self.imm(
            ImmediateType::Float64,
            [lo as u32, (lo >> 32) as u32, hi as u32, (hi >> 32) as u32],
        )
    }

    fn imm(&mut self, ty: ImmediateType, data: [u32; 4]) -> &mut Self {
        let start = self.body.len();
        self.body
            .push(TokenKind::Immediate.raw() | (ty.raw() << 18));
        self.body.extend_from_slice(&data);
        self.patch_nr_tokens(start, 4, 0x3FFF);
        self
    }

    pub fn property(&mut self, name: Property, value: u32) -> &mut Self {
        let start = self.body.len();
        self.body
            .push(TokenKind::Property.raw() | (name.raw() << 12));
        self.body.push(value);
        self.patch_nr_tokens(start, 4, 0xFF);
        self
    }

    pub fn inst(&mut self, spec: InstSpec) -> &mut Self {
        let start = self.body.len();
        let mut head = TokenKind::Instruction.raw()
            | (spec.opcode.raw() << 13)
            | ((spec.dsts.len() as u32) << 22)
            | ((spec.srcs.len() as u32) << 24);
        if spec.saturate {
            head |= 1 << 21;
        }
        if spec.label.is_some() {
            head |= 1 << 28;
        }
        if spec.texture.is_some() {
            head |= 1 << 29;
        }
        if spec.memory.is_some() {
            head |= 1 << 30;
        }
        if spec.precise {
            head |= 1 << 31;
        }
        self.body.push(head);

        if let Some(label) = spec.label {
            self.body.push(label & 0xFF_FFFF);
        }
        if let Some(target) = spec.texture {
            self.body
                .push(target.raw() | ((spec.tex_offsets.len() as u32) << 8));
            for (file, index, swz) in &spec.tex_offsets {
                let mut w = ((*index as u32) & 0xFFFF) | (file.raw() << 16);
                for (lane, sw) in swz.iter().enumerate() {
                    w |= sw.raw() << (20 + 2 * lane as u32);
                }
                self.body.push(w);
            }
        }
        if let Some((qualifier, texture_raw, format)) = spec.memory {
            self.body
                .push((qualifier & 0x7) | ((texture_raw & 0xFF) << 3) | (format << 11));
        }
        for dst in &spec.dsts {
            self.push_dst(dst);
        }
        for src in &spec.srcs {
            self.push_src(src);
        }
        self.patch_nr_tokens(start, 4, 0x1FF);
        self
    }

    fn push_dst(&mut self, dst: &DstSpec) {
        self.body.push(dst.word());
        if let Some(ind) = dst.indirect {
            self.body.push(ind.word());
        }
        if let Some(dim) = dst.dimension {
            self.body.push(dim.word());
            if let Some(ind) = dim.indirect {
                self.body.push(ind.word());
            }
        }
    }

    fn push_src(&mut self, src: &SrcSpec) {
        self.body.push(src.word());
        if let Some(ind) = src.indirect {
            self.body.push(ind.word());
        }
        if let Some(dim) = src.dimension {
            self.body.push(dim.word());
            if let Some(ind) = dim.indirect {
                self.body.push(ind.word());
            }
        }
    }

    fn patch_nr_tokens(&mut self, start: usize, shift: u32, mask: u32) {
        let nr = (self.body.len() - start) as u32;
        debug_assert!(nr <= mask, "record too large for its nr_tokens field");
        self.body[start] |= (nr & mask) << shift;
    }

    // Shorthand constructors for common records.

    /// IO declaration with a semantic, full usage mask, single register.
    pub fn decl_io(
        &mut self,
        file: RegisterFile,
        first: u32,
        last: u32,
        name: Semantic,
        sid: u32,
    ) -> &mut Self {
        self.decl(DeclSpec::new(file, first, last).semantic(name, sid))
    }

    /// Bare range declaration (temporaries, constants, address regs).
    pub fn decl_range(&mut self, file: RegisterFile, first: u32, last: u32) -> &mut Self {
        self.decl(DeclSpec::new(file, first, last))
    }

    /// Sampler plus matching sampler-view declaration for one unit.
    pub fn decl_sampler(
        &mut self,
        index: u32,
        target: TextureTarget,
        ret: ReturnType,
    ) -> &mut Self {
        self.decl_range(RegisterFile::Sampler, index, index);
        self.decl(DeclSpec::new(RegisterFile::SamplerView, index, index).sview(target, ret))
    }

    pub fn op_mov(&mut self, dst: (RegisterFile, i32, u8), src: (RegisterFile, i32)) -> &mut Self {
        self.inst(
            InstSpec::new(Opcode::Mov)
                .dst(DstSpec::new(dst.0, dst.1).mask(dst.2))
                .src(SrcSpec::new(src.0, src.1)),
        )
    }

    pub fn op_mov_src_indirect(
        &mut self,
        dst: (RegisterFile, i32, u8),
        src: (RegisterFile, i32),
        ind: (RegisterFile, i32),
    ) -> &mut Self {
        self.inst(
            InstSpec::new(Opcode::Mov)
                .dst(DstSpec::new(dst.0, dst.1).mask(dst.2))
                .src(SrcSpec::new(src.0, src.1).indirect(IndSpec {
                    file: ind.0,
                    index: ind.1,
                    swizzle: Swizzle::X,
                    array_id: 0,
                })),
        )
    }

    pub fn op0(&mut self, opcode: Opcode) -> &mut Self {
        self.inst(InstSpec::new(opcode))
    }

    pub fn op_end(&mut self) -> &mut Self {
        self.op0(Opcode::End)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nr_tokens_matches_emitted_words() {
        let mut b = StreamBuilder::new(Processor::Fragment);
        b.decl(
            DeclSpec::new(RegisterFile::Input, 0, 0)
                .semantic(Semantic::Generic, 0)
                .interp(Interpolation::Perspective, InterpolateLoc::Center),
        );
        let words = b.finish();
        // header(2) + decl head + range + interp + semantic.
        assert_eq!(words.len(), 6);
        assert_eq!(token::decl::nr_tokens(words[2]), 4);
        assert!(token::decl::has_interpolate(words[2]));
        assert!(token::decl::has_semantic(words[2]));
    }

    #[test]
    fn double_immediate_round_trips() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.imm_f64(1.5, -0.25);
        let words = b.finish();
        let mut ts = crate::decode::TokenStream::new(&words).unwrap();
        match ts.next().unwrap() {
            crate::decode::FullToken::Immediate(imm) => {
                assert_eq!(imm.data_type, ImmediateType::Float64);
                assert_eq!(imm.as_f64(0), 1.5);
                assert_eq!(imm.as_f64(1), -0.25);
            }
            other => panic!("expected immediate, got {other:?}"),
        }
    }

    #[test]
    fn texture_instruction_carries_offsets() {
        let mut b = StreamBuilder::new(Processor::Fragment);
        b.inst(
            InstSpec::new(Opcode::Txf)
                .texture(TextureTarget::Tex2D)
                .tex_offset(
                    RegisterFile::Immediate,
                    0,
                    [Swizzle::X, Swizzle::Y, Swizzle::Z],
                )
                .dst(DstSpec::new(RegisterFile::Temporary, 0))
                .src(SrcSpec::new(RegisterFile::Temporary, 1))
                .src(SrcSpec::new(RegisterFile::Sampler, 0)),
        );
        let words = b.finish();
        let mut ts = crate::decode::TokenStream::new(&words).unwrap();
        match ts.next().unwrap() {
            crate::decode::FullToken::Instruction(inst) => {
                let tex = inst.texture.expect("texture sub-record");
                assert_eq!(tex.target, TextureTarget::Tex2D);
                assert_eq!(tex.offsets.len(), 1);
                assert_eq!(tex.offsets[0].file, RegisterFile::Immediate);
            }
            other => panic!("expected instruction, got {other:?}"),
        }
    }
}
