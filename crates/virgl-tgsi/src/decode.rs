//! Cursor-based decoder for the TGSI token stream.
//!
//! The stream is untrusted: every read is bounds-checked against the sizes
//! declared in the two-word header, and every record's `nr_tokens` field is
//! checked against the number of words actually consumed. Any mismatch is a
//! hard [`DecodeError`]; the caller must discard the shader.

use crate::token::{
    self, ImmediateType, Interpolation, InterpolateLoc, Opcode, Processor, Property, RegisterFile,
    ReturnType, Semantic, Swizzle, TextureTarget, TokenKind,
};

/// Decode failure, carrying the word index at which it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub word: usize,
    pub message: String,
}

impl DecodeError {
    pub(crate) fn new(word: usize, message: impl Into<String>) -> Self {
        Self {
            word,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "decode error at word {}: {}", self.word, self.message)
    }
}

impl std::error::Error for DecodeError {}

/// Indirect-addressing qualifier attached to an operand or dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectAddr {
    pub file: RegisterFile,
    pub index: i32,
    pub swizzle: Swizzle,
    /// 0 when the reference is not into a guest-declared array.
    pub array_id: u32,
}

/// 2D dimension qualifier (constant-buffer index, per-vertex index, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub index: i32,
    pub indirect: Option<IndirectAddr>,
}

/// Destination operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DstOperand {
    pub file: RegisterFile,
    pub write_mask: u8,
    pub index: i32,
    pub indirect: Option<IndirectAddr>,
    pub dimension: Option<Dimension>,
}

/// Source operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrcOperand {
    pub file: RegisterFile,
    pub index: i32,
    pub swizzle: [Swizzle; 4],
    pub absolute: bool,
    pub negate: bool,
    pub indirect: Option<IndirectAddr>,
    pub dimension: Option<Dimension>,
}

impl SrcOperand {
    /// Write-mask-style bit set of the lanes this swizzle reads.
    pub fn read_mask(&self) -> u8 {
        self.swizzle
            .iter()
            .fold(0u8, |mask, sw| mask | (1 << sw.lane()))
    }
}

/// Interpolation sub-record of an input declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpInfo {
    pub interpolation: Interpolation,
    pub location: InterpolateLoc,
}

/// Semantic sub-record of an IO declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemanticInfo {
    pub name: Semantic,
    pub index: u32,
    pub streams: u8,
}

/// Image sub-record of an Image-file declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDecl {
    pub resource: TextureTarget,
    pub raw_access: bool,
    pub writable: bool,
    /// Pipe-format enum value; 0 means unspecified.
    pub format: u32,
}

/// Sampler-view sub-record of a SamplerView-file declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SviewDecl {
    pub resource: TextureTarget,
    pub return_types: [ReturnType; 4],
}

/// One fully decoded declaration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullDeclaration {
    pub file: RegisterFile,
    pub usage_mask: u8,
    pub first: u32,
    pub last: u32,
    pub index2d: Option<u32>,
    pub interp: Option<InterpInfo>,
    pub semantic: Option<SemanticInfo>,
    pub image: Option<ImageDecl>,
    pub sampler_view: Option<SviewDecl>,
    pub array_id: Option<u32>,
    pub invariant: bool,
    pub local: bool,
    pub atomic: bool,
    pub mem_type: u32,
}

impl FullDeclaration {
    pub fn range_len(&self) -> u32 {
        self.last - self.first + 1
    }
}

/// One fully decoded immediate record: up to one 4-lane vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullImmediate {
    pub data_type: ImmediateType,
    pub data: [u32; 4],
    pub len: usize,
}

impl FullImmediate {
    pub fn as_f32(&self, lane: usize) -> f32 {
        f32::from_bits(self.data[lane])
    }

    /// Reads lanes `2*pair` and `2*pair + 1` as one double.
    pub fn as_f64(&self, pair: usize) -> f64 {
        let lo = self.data[2 * pair] as u64;
        let hi = self.data[2 * pair + 1] as u64;
        f64::from_bits(lo | (hi << 32))
    }
}

/// Texture sub-record of an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub target: TextureTarget,
    pub offsets: Vec<TexOffset>,
}

/// One per-texel offset operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexOffset {
    pub file: RegisterFile,
    pub index: i32,
    pub swizzle: [Swizzle; 3],
}

/// Memory sub-record of a LOAD/STORE/atomic instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub qualifier: u32,
    pub texture_raw: u32,
    pub format: u32,
}

/// One fully decoded instruction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullInstruction {
    pub opcode: Opcode,
    pub saturate: bool,
    pub precise: bool,
    pub label: Option<u32>,
    pub texture: Option<TextureInfo>,
    pub memory: Option<MemoryInfo>,
    pub dsts: Vec<DstOperand>,
    pub srcs: Vec<SrcOperand>,
}

/// One fully decoded property record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullProperty {
    pub name_raw: u32,
    /// `None` when the name is outside the known table; callers may
    /// tolerate or reject as they see fit.
    pub name: Option<Property>,
    pub data: Vec<u32>,
}

impl FullProperty {
    pub fn value(&self) -> u32 {
        self.data.first().copied().unwrap_or(0)
    }
}

/// One decoded top-level record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FullToken {
    Declaration(FullDeclaration),
    Immediate(FullImmediate),
    Instruction(FullInstruction),
    Property(FullProperty),
}

/// Converts a little-endian byte buffer into the word stream the decoder
/// consumes. The length must be a multiple of four.
pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>, DecodeError> {
    if bytes.len() % 4 != 0 {
        return Err(DecodeError::new(
            bytes.len() / 4,
            format!("byte length {} is not a multiple of 4", bytes.len()),
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cursor over a validated token stream.
#[derive(Debug, Clone)]
pub struct TokenStream<'a> {
    words: &'a [u32],
    pos: usize,
    end: usize,
    processor: Processor,
}

impl<'a> TokenStream<'a> {
    /// Validates the two-word header and positions the cursor at the first
    /// body word.
    pub fn new(words: &'a [u32]) -> Result<Self, DecodeError> {
        if words.len() < 2 {
            return Err(DecodeError::new(0, "stream shorter than the 2-word header"));
        }
        let header_size = token::header_size(words[0]) as usize;
        if header_size < 2 {
            return Err(DecodeError::new(
                0,
                format!("header size {header_size} below minimum of 2"),
            ));
        }
        let body_size = token::body_size(words[0]) as usize;
        let end = header_size + body_size;
        if end > words.len() {
            return Err(DecodeError::new(
                0,
                format!(
                    "declared size {} exceeds buffer of {} words",
                    end,
                    words.len()
                ),
            ));
        }
        let proc_raw = token::processor_raw(words[1]);
        let processor = Processor::from_raw(proc_raw)
            .ok_or_else(|| DecodeError::new(1, format!("unknown processor kind {proc_raw}")))?;
        Ok(Self {
            words,
            pos: header_size,
            end,
            processor,
        })
    }

    pub fn processor(&self) -> Processor {
        self.processor
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    /// Current word index, for error reporting.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read(&mut self) -> Result<u32, DecodeError> {
        if self.pos >= self.end {
            return Err(DecodeError::new(
                self.pos,
                "read past the declared end of the token stream",
            ));
        }
        let word = self.words[self.pos];
        self.pos += 1;
        Ok(word)
    }

    /// Decodes the next top-level record.
    pub fn next(&mut self) -> Result<FullToken, DecodeError> {
        let start = self.pos;
        let head = self.read()?;
        let kind_raw = token::token_kind_raw(head);
        let kind = TokenKind::from_raw(kind_raw)
            .ok_or_else(|| DecodeError::new(start, format!("unknown token type {kind_raw}")))?;

        let (nr_tokens, tok) = match kind {
            TokenKind::Declaration => (
                token::decl::nr_tokens(head),
                FullToken::Declaration(self.decode_declaration(head, start)?),
            ),
            TokenKind::Immediate => (
                token::imm::nr_tokens(head),
                FullToken::Immediate(self.decode_immediate(head, start)?),
            ),
            TokenKind::Instruction => (
                token::inst::nr_tokens(head),
                FullToken::Instruction(self.decode_instruction(head, start)?),
            ),
            TokenKind::Property => (
                token::prop::nr_tokens(head),
                FullToken::Property(self.decode_property(head, start)?),
            ),
        };

        let consumed = (self.pos - start) as u32;
        if consumed != nr_tokens {
            return Err(DecodeError::new(
                start,
                format!("record declares {nr_tokens} words but {consumed} were consumed"),
            ));
        }
        Ok(tok)
    }

    fn decode_declaration(
        &mut self,
        head: u32,
        start: usize,
    ) -> Result<FullDeclaration, DecodeError> {
        use token::decl;

        let file_raw = decl::file_raw(head);
        let file = RegisterFile::from_raw(file_raw)
            .ok_or_else(|| DecodeError::new(start, format!("unknown register file {file_raw}")))?;

        let range = self.read()?;
        let first = decl::range_first(range);
        let last = decl::range_last(range);
        if last < first {
            return Err(DecodeError::new(
                start,
                format!("declaration range [{first}, {last}] is inverted"),
            ));
        }

        let index2d = if decl::has_dimension(head) {
            Some(decl::dim_index2d(self.read()?))
        } else {
            None
        };

        let interp = if decl::has_interpolate(head) {
            let word = self.read()?;
            let interp_raw = decl::interpolate_raw(word);
            let interpolation = Interpolation::from_raw(interp_raw).ok_or_else(|| {
                DecodeError::new(start, format!("unknown interpolation mode {interp_raw}"))
            })?;
            let loc_raw = decl::interpolate_loc_raw(word);
            let location = InterpolateLoc::from_raw(loc_raw).ok_or_else(|| {
                DecodeError::new(start, format!("unknown interpolation location {loc_raw}"))
            })?;
            Some(InterpInfo {
                interpolation,
                location,
            })
        } else {
            None
        };

        let semantic = if decl::has_semantic(head) {
            let word = self.read()?;
            let name_raw = decl::semantic_name_raw(word);
            let name = Semantic::from_raw(name_raw).ok_or_else(|| {
                DecodeError::new(start, format!("unknown semantic name {name_raw}"))
            })?;
            Some(SemanticInfo {
                name,
                index: decl::semantic_index(word),
                streams: decl::semantic_streams(word),
            })
        } else {
            None
        };

        let image = if file == RegisterFile::Image {
            let word = self.read()?;
            let res_raw = decl::image_resource_raw(word);
            let resource = TextureTarget::from_raw(res_raw).ok_or_else(|| {
                DecodeError::new(start, format!("unknown image resource target {res_raw}"))
            })?;
            Some(ImageDecl {
                resource,
                raw_access: decl::image_raw_access(word),
                writable: decl::image_writable(word),
                format: decl::image_format(word),
            })
        } else {
            None
        };

        let sampler_view = if file == RegisterFile::SamplerView {
            let word = self.read()?;
            let res_raw = decl::sview_resource_raw(word);
            let resource = TextureTarget::from_raw(res_raw).ok_or_else(|| {
                DecodeError::new(start, format!("unknown sampler view target {res_raw}"))
            })?;
            let mut return_types = [ReturnType::Float; 4];
            for (lane, rt) in return_types.iter_mut().enumerate() {
                let rt_raw = decl::sview_return_type_raw(word, lane);
                *rt = ReturnType::from_raw(rt_raw).ok_or_else(|| {
                    DecodeError::new(start, format!("unknown sampler return type {rt_raw}"))
                })?;
            }
            Some(SviewDecl {
                resource,
                return_types,
            })
        } else {
            None
        };

        let array_id = if decl::has_array(head) {
            Some(decl::array_id(self.read()?))
        } else {
            None
        };

        Ok(FullDeclaration {
            file,
            usage_mask: decl::usage_mask(head),
            first,
            last,
            index2d,
            interp,
            semantic,
            image,
            sampler_view,
            array_id,
            invariant: decl::invariant(head),
            local: decl::local(head),
            atomic: decl::atomic(head),
            mem_type: decl::mem_type(head),
        })
    }

    fn decode_immediate(&mut self, head: u32, start: usize) -> Result<FullImmediate, DecodeError> {
        use token::imm;

        let ty_raw = imm::data_type_raw(head);
        let data_type = ImmediateType::from_raw(ty_raw)
            .ok_or_else(|| DecodeError::new(start, format!("unknown immediate type {ty_raw}")))?;
        let nr = imm::nr_tokens(head);
        if nr < 1 || nr > 5 {
            return Err(DecodeError::new(
                start,
                format!("immediate record size {nr} outside 1..=5"),
            ));
        }
        let len = (nr - 1) as usize;
        let mut data = [0u32; 4];
        for slot in data.iter_mut().take(len) {
            *slot = self.read()?;
        }
        Ok(FullImmediate {
            data_type,
            data,
            len,
        })
    }

    fn decode_instruction(
        &mut self,
        head: u32,
        start: usize,
    ) -> Result<FullInstruction, DecodeError> {
        use token::inst;

        let opcode = Opcode::from_raw(inst::opcode_raw(head));

        let label = if inst::has_label(head) {
            Some(inst::label(self.read()?))
        } else {
            None
        };

        let texture = if inst::has_texture(head) {
            let word = self.read()?;
            let target_raw = inst::texture_target_raw(word);
            let target = TextureTarget::from_raw(target_raw).ok_or_else(|| {
                DecodeError::new(start, format!("unknown texture target {target_raw}"))
            })?;
            let num_offsets = inst::texture_num_offsets(word) as usize;
            let mut offsets = Vec::with_capacity(num_offsets);
            for _ in 0..num_offsets {
                let off = self.read()?;
                let file_raw = inst::offset_file_raw(off);
                let file = RegisterFile::from_raw(file_raw).ok_or_else(|| {
                    DecodeError::new(start, format!("unknown offset file {file_raw}"))
                })?;
                offsets.push(TexOffset {
                    file,
                    index: inst::offset_index(off),
                    swizzle: [
                        Swizzle::from_raw(inst::offset_swizzle_raw(off, 0)),
                        Swizzle::from_raw(inst::offset_swizzle_raw(off, 1)),
                        Swizzle::from_raw(inst::offset_swizzle_raw(off, 2)),
                    ],
                });
            }
            Some(TextureInfo { target, offsets })
        } else {
            None
        };

        let memory = if inst::has_memory(head) {
            let word = self.read()?;
            Some(MemoryInfo {
                qualifier: inst::memory_qualifier(word),
                texture_raw: inst::memory_texture_raw(word),
                format: inst::memory_format(word),
            })
        } else {
            None
        };

        let num_dst = inst::num_dst(head) as usize;
        let mut dsts = Vec::with_capacity(num_dst);
        for _ in 0..num_dst {
            dsts.push(self.decode_dst(start)?);
        }

        let num_src = inst::num_src(head) as usize;
        let mut srcs = Vec::with_capacity(num_src);
        for _ in 0..num_src {
            srcs.push(self.decode_src(start)?);
        }

        Ok(FullInstruction {
            opcode,
            saturate: inst::saturate(head),
            precise: inst::precise(head),
            label,
            texture,
            memory,
            dsts,
            srcs,
        })
    }

    fn decode_indirect(&mut self, start: usize) -> Result<IndirectAddr, DecodeError> {
        use token::ind;
        let word = self.read()?;
        let file_raw = ind::file_raw(word);
        let file = RegisterFile::from_raw(file_raw)
            .ok_or_else(|| DecodeError::new(start, format!("unknown indirect file {file_raw}")))?;
        Ok(IndirectAddr {
            file,
            index: ind::index(word),
            swizzle: Swizzle::from_raw(ind::swizzle_raw(word)),
            array_id: ind::array_id(word),
        })
    }

    fn decode_dimension(&mut self, start: usize) -> Result<Dimension, DecodeError> {
        use token::dim;
        let word = self.read()?;
        if dim::nested(word) {
            return Err(DecodeError::new(
                start,
                "second-level operand dimensions are not supported",
            ));
        }
        let indirect = if dim::indirect(word) {
            Some(self.decode_indirect(start)?)
        } else {
            None
        };
        Ok(Dimension {
            index: dim::index(word),
            indirect,
        })
    }

    fn decode_dst(&mut self, start: usize) -> Result<DstOperand, DecodeError> {
        use token::dst;
        let word = self.read()?;
        let file_raw = dst::file_raw(word);
        let file = RegisterFile::from_raw(file_raw).ok_or_else(|| {
            DecodeError::new(start, format!("unknown destination file {file_raw}"))
        })?;
        let indirect = if dst::indirect(word) {
            Some(self.decode_indirect(start)?)
        } else {
            None
        };
        let dimension = if dst::dimension(word) {
            Some(self.decode_dimension(start)?)
        } else {
            None
        };
        Ok(DstOperand {
            file,
            write_mask: dst::write_mask(word),
            index: dst::index(word),
            indirect,
            dimension,
        })
    }

    fn decode_src(&mut self, start: usize) -> Result<SrcOperand, DecodeError> {
        use token::src;
        let word = self.read()?;
        let file_raw = src::file_raw(word);
        let file = RegisterFile::from_raw(file_raw)
            .ok_or_else(|| DecodeError::new(start, format!("unknown source file {file_raw}")))?;
        let indirect = if src::indirect(word) {
            Some(self.decode_indirect(start)?)
        } else {
            None
        };
        let dimension = if src::dimension(word) {
            Some(self.decode_dimension(start)?)
        } else {
            None
        };
        Ok(SrcOperand {
            file,
            index: src::index(word),
            swizzle: [
                Swizzle::from_raw(src::swizzle_raw(word, 0)),
                Swizzle::from_raw(src::swizzle_raw(word, 1)),
                Swizzle::from_raw(src::swizzle_raw(word, 2)),
                Swizzle::from_raw(src::swizzle_raw(word, 3)),
            ],
            absolute: src::absolute(word),
            negate: src::negate(word),
            indirect,
            dimension,
        })
    }

    fn decode_property(&mut self, head: u32, _start: usize) -> Result<FullProperty, DecodeError> {
        use token::prop;
        let name_raw = prop::name_raw(head);
        let nr = prop::nr_tokens(head);
        let mut data = Vec::with_capacity(nr.saturating_sub(1) as usize);
        for _ in 1..nr {
            data.push(self.read()?);
        }
        Ok(FullProperty {
            name_raw,
            name: Property::from_raw(name_raw),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::StreamBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn header_size_below_minimum_is_rejected() {
        // header_size = 1 is below the 2-word minimum.
        let words = [token::pack_header(1, 0), 0];
        let err = TokenStream::new(&words).unwrap_err();
        assert_eq!(err.word, 0);
        assert!(err.message.contains("below minimum"));
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let words = [token::pack_header(2, 10), 0];
        let err = TokenStream::new(&words).unwrap_err();
        assert!(err.message.contains("exceeds buffer"));
    }

    #[test]
    fn unknown_processor_is_rejected() {
        let words = [token::pack_header(2, 0), 9];
        let err = TokenStream::new(&words).unwrap_err();
        assert_eq!(err.word, 1);
    }

    #[test]
    fn empty_body_decodes_to_nothing() {
        let words = StreamBuilder::new(Processor::Vertex).finish();
        let ts = TokenStream::new(&words).unwrap();
        assert_eq!(ts.processor(), Processor::Vertex);
        assert!(ts.at_end());
    }

    #[test]
    fn simple_mov_round_trips() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl_io(RegisterFile::Input, 0, 0, Semantic::Position, 0);
        b.decl_io(RegisterFile::Output, 0, 0, Semantic::Position, 0);
        b.op_mov(
            (RegisterFile::Output, 0, token::WRITEMASK_XYZW),
            (RegisterFile::Input, 0),
        );
        b.op_end();
        let words = b.finish();

        let mut ts = TokenStream::new(&words).unwrap();
        let mut count = 0;
        while !ts.at_end() {
            ts.next().unwrap();
            count += 1;
        }
        assert_eq!(count, 4);
        // The full walk must consume exactly header + body words.
        assert_eq!(ts.position(), words.len());
    }

    #[test]
    fn instruction_nr_tokens_mismatch_is_rejected() {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.op_end();
        let mut words = b.finish();
        // Corrupt the END instruction to claim one extra word.
        let last = words.len() - 1;
        let nr = token::inst::nr_tokens(words[last]);
        words[last] = (words[last] & !(0x1FF << 4)) | ((nr + 1) << 4);
        // Grow the body so the extra word is inside the declared size.
        words.push(0);
        words[0] = token::pack_header(2, (words.len() - 2) as u32);

        let mut ts = TokenStream::new(&words).unwrap();
        let err = ts.next().unwrap_err();
        assert!(err.message.contains("were consumed"), "{}", err.message);
    }

    #[test]
    fn immediate_lanes_decode_as_f32() {
        let mut b = StreamBuilder::new(Processor::Fragment);
        b.imm_f32([0.0, 1.0, 0.5, -2.0]);
        b.op_end();
        let words = b.finish();
        let mut ts = TokenStream::new(&words).unwrap();
        match ts.next().unwrap() {
            FullToken::Immediate(imm) => {
                assert_eq!(imm.data_type, ImmediateType::Float32);
                assert_eq!(imm.len, 4);
                assert_eq!(imm.as_f32(1), 1.0);
                assert_eq!(imm.as_f32(3), -2.0);
            }
            other => panic!("expected immediate, got {other:?}"),
        }
    }

    #[test]
    fn indirect_source_operand_decodes() {
        let mut b = StreamBuilder::new(Processor::Fragment);
        b.decl_range(RegisterFile::Temporary, 0, 3);
        b.op_mov_src_indirect(
            (RegisterFile::Temporary, 0, token::WRITEMASK_XYZW),
            (RegisterFile::Constant, 1),
            (RegisterFile::Address, 0),
        );
        b.op_end();
        let words = b.finish();
        let mut ts = TokenStream::new(&words).unwrap();
        ts.next().unwrap();
        match ts.next().unwrap() {
            FullToken::Instruction(inst) => {
                let ind = inst.srcs[0].indirect.expect("indirect qualifier");
                assert_eq!(ind.file, RegisterFile::Address);
                assert_eq!(ind.index, 0);
                assert_eq!(inst.srcs[0].index, 1);
            }
            other => panic!("expected instruction, got {other:?}"),
        }
    }

    #[test]
    fn negative_operand_index_survives() {
        // GS inputs can carry negative relative indices under indirection.
        let word = {
            let mut w = RegisterFile::Input.raw();
            w |= ((-2i32 as u32) & 0xFFFF) << 6;
            w |= 0b11100100 << 22; // identity swizzle
            w
        };
        assert_eq!(token::src::index(word), -2);
    }

    #[test]
    fn bytes_must_be_word_aligned() {
        assert!(words_from_bytes(&[1, 2, 3]).is_err());
        let words = words_from_bytes(&[0x02, 0, 0, 0, 1, 0, 0, 0]).unwrap();
        assert_eq!(words, vec![2, 1]);
    }
}
