//! Top-level translation driver.
//!
//! One call takes a token buffer through the scan pass, the declaration
//! pass, the instruction pass, and declaration emission, and hands back
//! the three text regions plus the cross-stage descriptor. Any failure
//! along the way discards all in-progress text.

use tracing::debug;

use virgl_tgsi::{scan_shader, FullToken, Processor, TokenStream};

use crate::config::{ShaderCfg, ShaderKey};
use crate::context::TranslationCtx;
use crate::decls;
use crate::glsl::Generator;
use crate::requirements::{ExtensionTable, ShaderReq};
use crate::sinfo::ShaderInfo;
use crate::strbuf::{GlslBuf, ShaderParts};
use crate::TranslateError;

fn extension_table(cfg: &ShaderCfg) -> ExtensionTable {
    if cfg.use_gles {
        ExtensionTable::gles()
    } else {
        ExtensionTable::desktop()
    }
}

/// Translates one token stream into GLSL text regions plus the linking
/// descriptor.
///
/// `req_local_mem` is the caller-requested compute shared-memory size in
/// bytes, used when the stream itself declares none.
pub fn convert_shader(
    cfg: &ShaderCfg,
    key: &ShaderKey,
    words: &[u32],
    req_local_mem: u32,
) -> Result<(ShaderParts, ShaderInfo), TranslateError> {
    let scan = scan_shader(words)?;
    let prog = scan.processor;

    let mut tokens = Vec::new();
    let mut stream = TokenStream::new(words)?;
    while !stream.at_end() {
        tokens.push(stream.next()?);
    }

    let mut ctx = TranslationCtx::new(cfg, key, scan, req_local_mem);
    for tok in &tokens {
        ctx.ingest(tok)?;
    }
    ctx.setup_io_ranges();
    ctx.prepare_stream_output()?;

    let mut generator = Generator::new(&mut ctx);
    generator.begin_main();
    for tok in &tokens {
        if let FullToken::Instruction(inst) = tok {
            generator.emit_instruction(inst)?;
        }
    }
    generator.end_main();

    let shadow_units = generator.shadow_units().to_vec();
    let main = generator.main;

    let hdr = decls::emit_declarations(&mut ctx, &shadow_units)?;

    let table = extension_table(cfg);
    let version = table.select_version(ctx.reqs, cfg.glsl_version);
    let mut ver_ext = GlslBuf::new();
    table.emit_header(ctx.reqs, version, &mut ver_ext);

    if ver_ext.had_error() || hdr.had_error() || main.had_error() {
        return Err(TranslateError::Overflow);
    }

    let info = ShaderInfo::export(&ctx, version, &shadow_units);
    debug!(
        stage = ?prog,
        glsl_version = version,
        reqs = ?ctx.reqs,
        "translated shader"
    );

    Ok((
        ShaderParts {
            ver_ext: ver_ext.into_string(),
            hdr: hdr.into_string(),
            main: main.into_string(),
        },
        info,
    ))
}

/// Synthesizes a passthrough tessellation-control shader for pipelines
/// that bind a tess-eval stage without a guest TCS.
///
/// The shader forwards position and every Generic output of the vertex
/// stage unchanged and sets the literal tessellation factors the caller
/// captured from guest state (outer levels first, then inner).
pub fn create_passthrough_tcs(
    cfg: &ShaderCfg,
    key: &ShaderKey,
    tess_factors: &[f32; 6],
) -> Result<(ShaderParts, ShaderInfo), TranslateError> {
    let vertices = key.tcs_vertices_out.max(1);

    let mut hdr = GlslBuf::new();
    hdr.line(&format!("layout(vertices = {vertices}) out;"));
    for g in &key.prev_stage_generics {
        hdr.line(&format!("in vec4 vso_g{}[];", g.sid));
        hdr.line(&format!("out vec4 tco_g{}[];", g.sid));
    }

    let mut main = GlslBuf::new();
    main.line("void main(void)");
    main.line("{");
    main.indent();
    main.line("gl_out[gl_InvocationID].gl_Position = gl_in[gl_InvocationID].gl_Position;");
    for g in &key.prev_stage_generics {
        main.line(&format!(
            "tco_g{0}[gl_InvocationID] = vso_g{0}[gl_InvocationID];",
            g.sid
        ));
    }
    for (i, outer) in tess_factors[..4].iter().enumerate() {
        main.line(&format!("gl_TessLevelOuter[{i}] = {outer:?};"));
    }
    for (i, inner) in tess_factors[4..].iter().enumerate() {
        main.line(&format!("gl_TessLevelInner[{i}] = {inner:?};"));
    }
    main.outdent();
    main.line("}");

    let reqs = ShaderReq::TESSELLATION | ShaderReq::INTS;
    let table = extension_table(cfg);
    let version = table.select_version(reqs, cfg.glsl_version);
    let mut ver_ext = GlslBuf::new();
    table.emit_header(reqs, version, &mut ver_ext);

    if ver_ext.had_error() || hdr.had_error() || main.had_error() {
        return Err(TranslateError::Overflow);
    }

    let info = ShaderInfo {
        glsl_version: version,
        // The passthrough stage forwards the vertex stage's layout.
        generic_outputs: key.prev_stage_generics.clone(),
        ..Default::default()
    };
    debug!(stage = ?Processor::TessCtrl, glsl_version = version, "synthesized passthrough shader");

    Ok((
        ShaderParts {
            ver_ext: ver_ext.into_string(),
            hdr: hdr.into_string(),
            main: main.into_string(),
        },
        info,
    ))
}
