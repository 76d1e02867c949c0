//! Whole-stream decode behavior over builder-assembled buffers.

use pretty_assertions::assert_eq;

use virgl_tgsi::decode::{FullToken, TokenStream};
use virgl_tgsi::encode::{DeclSpec, DstSpec, InstSpec, SrcSpec, StreamBuilder};
use virgl_tgsi::token::{
    self, Interpolation, InterpolateLoc, Opcode, Processor, Property, RegisterFile, Semantic,
};

fn decode_all(words: &[u32]) -> Vec<FullToken> {
    let mut ts = TokenStream::new(words).expect("header");
    let mut out = Vec::new();
    while !ts.at_end() {
        out.push(ts.next().expect("token"));
    }
    out
}

#[test]
fn full_decode_consumes_exactly_the_declared_words() {
    let mut b = StreamBuilder::new(Processor::Fragment);
    b.decl(
        DeclSpec::new(RegisterFile::Input, 0, 0)
            .semantic(Semantic::Generic, 0)
            .interp(Interpolation::Perspective, InterpolateLoc::Center),
    );
    b.decl_io(RegisterFile::Output, 0, 0, Semantic::Color, 0);
    b.decl_range(RegisterFile::Temporary, 0, 1);
    b.imm_f32([0.0, 0.5, 1.0, 2.0]);
    b.property(Property::FsColor0WritesAllCbufs, 0);
    b.inst(
        InstSpec::new(Opcode::Mad)
            .dst(DstSpec::new(RegisterFile::Temporary, 0))
            .src(SrcSpec::new(RegisterFile::Input, 0))
            .src(SrcSpec::new(RegisterFile::Immediate, 0))
            .src(SrcSpec::new(RegisterFile::Immediate, 0)),
    );
    b.op_mov(
        (RegisterFile::Output, 0, token::WRITEMASK_XYZW),
        (RegisterFile::Temporary, 0),
    );
    b.op_end();
    let words = b.finish();

    assert_eq!(
        words.len() as u32,
        token::header_size(words[0]) + token::body_size(words[0])
    );

    let mut ts = TokenStream::new(&words).expect("header");
    let mut count = 0;
    while !ts.at_end() {
        ts.next().expect("well-formed record");
        count += 1;
    }
    assert_eq!(ts.position(), words.len());
    assert_eq!(count, 8);
}

#[test]
fn record_kinds_survive_in_order() {
    let mut b = StreamBuilder::new(Processor::Vertex);
    b.decl_io(RegisterFile::Input, 0, 0, Semantic::Position, 0);
    b.imm_u32([1, 2, 3, 4]);
    b.op_end();
    let toks = decode_all(&b.finish());
    assert!(matches!(toks[0], FullToken::Declaration(_)));
    assert!(matches!(toks[1], FullToken::Immediate(_)));
    assert!(matches!(toks[2], FullToken::Instruction(_)));
}

#[test]
fn undersized_header_fails_before_any_token() {
    // header_size = 1 is below the two-word minimum.
    let words = [token::pack_header(1, 1), Processor::Vertex.raw(), 0];
    assert!(TokenStream::new(&words).is_err());
}

#[test]
fn instruction_subrecord_shortfall_is_a_decode_error() {
    let mut b = StreamBuilder::new(Processor::Vertex);
    b.decl_range(RegisterFile::Temporary, 0, 0);
    b.op_mov(
        (RegisterFile::Temporary, 0, token::WRITEMASK_XYZW),
        (RegisterFile::Temporary, 0),
    );
    let mut words = b.finish();
    // Drop the MOV's source word; its head still claims three tokens.
    words.truncate(words.len() - 1);
    words[0] = token::pack_header(2, (words.len() - 2) as u32);

    let mut ts = TokenStream::new(&words).expect("header");
    let mut result = Ok(());
    while !ts.at_end() {
        if let Err(e) = ts.next() {
            result = Err(e);
            break;
        }
    }
    assert!(result.is_err());
}
