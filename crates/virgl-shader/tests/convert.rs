//! End-to-end translation over builder-assembled token streams.

use virgl_shader::{
    convert_shader, create_passthrough_tcs, CompareFunc, LayoutLocation, LogicOp, ShaderCfg,
    ShaderKey, TranslateError,
};
use virgl_tgsi::encode::{DeclSpec, DstSpec, IndSpec, InstSpec, SrcSpec, StreamBuilder};
use virgl_tgsi::token::{
    Opcode, Processor, RegisterFile, ReturnType, Semantic, TextureTarget, WRITEMASK_XYZW,
};

fn convert(b: StreamBuilder, key: ShaderKey) -> (String, String, String, virgl_shader::ShaderInfo) {
    let cfg = ShaderCfg::default();
    let words = b.finish();
    let (parts, info) = convert_shader(&cfg, &key, &words, 0).expect("translation");
    (parts.ver_ext, parts.hdr, parts.main, info)
}

#[test]
fn position_passthrough_needs_no_extensions() {
    let mut b = StreamBuilder::new(Processor::Vertex);
    b.decl_io(RegisterFile::Input, 0, 0, Semantic::Position, 0);
    b.decl_io(RegisterFile::Output, 0, 0, Semantic::Position, 0);
    b.op_mov(
        (RegisterFile::Output, 0, WRITEMASK_XYZW),
        (RegisterFile::Input, 0),
    );
    b.op_end();
    let (ver, hdr, main, _) = convert(b, ShaderKey::default());
    assert_eq!(ver, "#version 140\n");
    assert!(!ver.contains("#extension"));
    assert!(hdr.contains("in vec4 in_0;"));
    assert!(main.contains("gl_Position = in_0;"));
}

#[test]
fn indirect_sampler_access_resolves_into_the_coalesced_array() {
    let mut b = StreamBuilder::new(Processor::Fragment);
    for i in 0..3 {
        b.decl(
            DeclSpec::new(RegisterFile::SamplerView, i, i)
                .sview(TextureTarget::Tex2D, ReturnType::Float),
        );
    }
    b.decl_range(RegisterFile::Address, 0, 0);
    b.decl_range(RegisterFile::Temporary, 0, 0);
    b.decl_io(RegisterFile::Output, 0, 0, Semantic::Color, 0);
    b.inst(
        InstSpec::new(Opcode::Tex)
            .texture(TextureTarget::Tex2D)
            .dst(DstSpec::new(RegisterFile::Temporary, 0))
            .src(SrcSpec::new(RegisterFile::Temporary, 0))
            .src(SrcSpec::new(RegisterFile::Sampler, 1).indirect(IndSpec::addr(0))),
    );
    b.op_mov(
        (RegisterFile::Output, 0, WRITEMASK_XYZW),
        (RegisterFile::Temporary, 0),
    );
    b.op_end();
    let (_, hdr, main, info) = convert(b, ShaderKey::default());
    assert!(hdr.contains("uniform sampler2D fssamp0[3];"));
    assert!(main.contains("fssamp0[addr0 + 1]"));
    assert_eq!(info.sampler_arrays.len(), 1);
    assert_eq!(info.sampler_arrays[0].first, 0);
    assert_eq!(info.sampler_arrays[0].size, 3);
}

#[test]
fn two_sided_color_reads_the_face_select() {
    let mut b = StreamBuilder::new(Processor::Fragment);
    b.decl_io(RegisterFile::Input, 0, 0, Semantic::Color, 0);
    b.decl_io(RegisterFile::Output, 0, 0, Semantic::Color, 0);
    b.op_mov(
        (RegisterFile::Output, 0, WRITEMASK_XYZW),
        (RegisterFile::Input, 0),
    );
    b.op_end();
    let key = ShaderKey {
        color_two_side: true,
        ..Default::default()
    };
    let (_, _, main, _) = convert(b, key);
    assert!(main.contains("vec4 realcolor0 = gl_FrontFacing ? vso_c0 : vso_bc0;"));
    assert!(main.contains("fsout_c0 = realcolor0;"));
}

#[test]
fn output_overflow_is_a_capacity_error() {
    let mut b = StreamBuilder::new(Processor::Vertex);
    for i in 0..(virgl_shader::limits::MAX_OUTPUTS as u32 + 1) {
        b.decl_io(RegisterFile::Output, i, i, Semantic::Generic, i);
    }
    b.op_end();
    let cfg = ShaderCfg::default();
    let err = convert_shader(&cfg, &ShaderKey::default(), &b.finish(), 0).unwrap_err();
    assert!(matches!(err, TranslateError::Capacity(_)));
}

#[test]
fn control_flow_blocks_balance_and_indentation_returns() {
    let mut b = StreamBuilder::new(Processor::Fragment);
    b.decl_io(RegisterFile::Input, 0, 0, Semantic::Generic, 0);
    b.decl_io(RegisterFile::Output, 0, 0, Semantic::Color, 0);
    b.decl_range(RegisterFile::Temporary, 0, 0);
    b.inst(
        InstSpec::new(Opcode::If)
            .src(SrcSpec::new(RegisterFile::Input, 0)),
    );
    b.op_mov(
        (RegisterFile::Temporary, 0, WRITEMASK_XYZW),
        (RegisterFile::Input, 0),
    );
    b.op0(Opcode::Else);
    b.op0(Opcode::BgnLoop);
    b.op0(Opcode::Brk);
    b.op0(Opcode::EndLoop);
    b.op0(Opcode::EndIf);
    b.op_mov(
        (RegisterFile::Output, 0, WRITEMASK_XYZW),
        (RegisterFile::Temporary, 0),
    );
    b.op_end();
    let (_, _, main, _) = convert(b, ShaderKey::default());
    let opens = main.matches('{').count();
    let closes = main.matches('}').count();
    assert_eq!(opens, closes);
    assert!(main.contains("do {"));
    assert!(main.contains("} while (true);"));
    // The final brace of main() is back at column zero.
    assert!(main.ends_with("}\n"));
}

#[test]
fn clip_distance_outputs_account_four_lanes_per_register() {
    let mut b = StreamBuilder::new(Processor::Vertex);
    b.decl_io(RegisterFile::Output, 0, 0, Semantic::Position, 0);
    b.decl(
        DeclSpec::new(RegisterFile::Output, 1, 2)
            .semantic(Semantic::ClipDist, 0)
            .usage_mask(WRITEMASK_XYZW),
    );
    b.imm_f32([0.25, 0.5, 0.75, 1.0]);
    b.op_mov(
        (RegisterFile::Output, 1, WRITEMASK_XYZW),
        (RegisterFile::Immediate, 0),
    );
    b.op_mov(
        (RegisterFile::Output, 2, WRITEMASK_XYZW),
        (RegisterFile::Immediate, 0),
    );
    b.op_end();
    let (_, hdr, main, info) = convert(b, ShaderKey::default());
    assert_eq!(info.num_clip_out, 8);
    assert!(hdr.contains("float clip_dist_temp[8];"));
    assert!(hdr.contains("out float gl_ClipDistance[8];"));
    // Lane 4 of the second register lands past the first register's four.
    assert!(main.contains("clip_dist_temp[4] = (vec4(0.25, 0.5, 0.75, 1.0)).x;"));
    assert!(main.contains("gl_ClipDistance[7] = clip_dist_temp[7];"));
}

#[test]
fn alpha_test_guards_the_fragment_exit() {
    let mut b = StreamBuilder::new(Processor::Fragment);
    b.decl_io(RegisterFile::Output, 0, 0, Semantic::Color, 0);
    b.imm_f32([1.0, 1.0, 1.0, 0.5]);
    b.op_mov(
        (RegisterFile::Output, 0, WRITEMASK_XYZW),
        (RegisterFile::Immediate, 0),
    );
    b.op_end();
    let key = ShaderKey {
        alpha_test: Some((CompareFunc::Greater, 0.25)),
        ..Default::default()
    };
    let (_, hdr, main, _) = convert(b, key);
    assert!(hdr.contains("uniform float alpha_ref_val;"));
    assert!(main.contains("if (!(fsout_c0.w > alpha_ref_val)) discard;"));
}

#[test]
fn logicop_emulation_stages_the_color_write() {
    let mut b = StreamBuilder::new(Processor::Fragment);
    b.decl_io(RegisterFile::Output, 0, 0, Semantic::Color, 0);
    b.imm_f32([0.0, 0.0, 0.0, 1.0]);
    b.op_mov(
        (RegisterFile::Output, 0, WRITEMASK_XYZW),
        (RegisterFile::Immediate, 0),
    );
    b.op_end();
    let key = ShaderKey {
        logicop: Some(LogicOp::Xor),
        ..Default::default()
    };
    let (_, hdr, main, _) = convert(b, key);
    // XOR reads the destination, so the attachment output is inout.
    assert!(hdr.contains("vec4 fsout_tmp_c0;"));
    assert!(hdr.contains("inout vec4 fsout_c0;"));
    assert!(main.contains("fsout_tmp_c0 = "));
    assert!(main.contains("ivec4(fsout_tmp_c0 * 255.0) ^ ivec4(fsout_c0 * 255.0)"));
}

#[test]
fn passthrough_tcs_forwards_position_and_generics() {
    let cfg = ShaderCfg::default();
    let key = ShaderKey {
        tcs_vertices_out: 3,
        prev_stage_generics: vec![LayoutLocation {
            semantic: Semantic::Generic,
            sid: 1,
            location: 0,
        }],
        ..Default::default()
    };
    let (parts, info) =
        create_passthrough_tcs(&cfg, &key, &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]).expect("synthesis");
    assert!(parts.hdr.contains("layout(vertices = 3) out;"));
    assert!(parts.hdr.contains("in vec4 vso_g1[];"));
    assert!(parts.hdr.contains("out vec4 tco_g1[];"));
    assert!(parts
        .main
        .contains("gl_out[gl_InvocationID].gl_Position = gl_in[gl_InvocationID].gl_Position;"));
    assert!(parts
        .main
        .contains("tco_g1[gl_InvocationID] = vso_g1[gl_InvocationID];"));
    assert!(parts.main.contains("gl_TessLevelOuter[3] = 1.0;"));
    assert!(parts.main.contains("gl_TessLevelInner[1] = 1.0;"));
    assert_eq!(info.generic_outputs.len(), 1);
}

#[test]
fn user_clip_planes_derive_distances_from_the_position() {
    let mut b = StreamBuilder::new(Processor::Vertex);
    b.decl_io(RegisterFile::Input, 0, 0, Semantic::Position, 0);
    b.decl_io(RegisterFile::Output, 0, 0, Semantic::Position, 0);
    b.op_mov(
        (RegisterFile::Output, 0, WRITEMASK_XYZW),
        (RegisterFile::Input, 0),
    );
    b.op_end();
    let key = ShaderKey {
        clip_plane_enable: 0b101,
        ..Default::default()
    };
    let (_, hdr, main, _) = convert(b, key);
    assert!(hdr.contains("uniform vec4 clipp[8];"));
    assert!(main.contains("gl_ClipDistance[0] = dot(gl_Position, clipp[0]);"));
    assert!(main.contains("gl_ClipDistance[1] = dot(gl_Position, clipp[2]);"));
}

#[test]
fn winsys_flip_lands_in_the_terminal_stage_only() {
    let build = || {
        let mut b = StreamBuilder::new(Processor::Vertex);
        b.decl_io(RegisterFile::Input, 0, 0, Semantic::Position, 0);
        b.decl_io(RegisterFile::Output, 0, 0, Semantic::Position, 0);
        b.op_mov(
            (RegisterFile::Output, 0, WRITEMASK_XYZW),
            (RegisterFile::Input, 0),
        );
        b.op_end();
        b
    };

    let key = ShaderKey {
        winsys_adjust_y_emitted: true,
        ..Default::default()
    };
    let (_, hdr, main, _) = convert(build(), key);
    assert!(hdr.contains("uniform float winsys_adjust_y;"));
    assert!(main.contains("gl_Position.y = gl_Position.y * winsys_adjust_y;"));

    // A geometry stage downstream takes over the correction.
    let key = ShaderKey {
        winsys_adjust_y_emitted: true,
        gs_present: true,
        ..Default::default()
    };
    let (_, hdr, main, _) = convert(build(), key);
    assert!(!hdr.contains("winsys_adjust_y"));
    assert!(!main.contains("winsys_adjust_y"));
}
