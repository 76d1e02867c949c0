//! Declaration-region emission.
//!
//! Runs after the instruction pass, when every table and requirement flag
//! has settled, so each qualifier is written exactly once. The only later
//! textual rewrite is the vertex-color interpolation splice applied when a
//! fragment shader is paired afterwards.

use virgl_tgsi::token::{
    Interpolation, InterpolateLoc, Processor, Property, ReturnType, Semantic, TextureTarget,
};

use crate::context::{IoSlot, SamplerSlot, TranslationCtx};
use crate::formats;
use crate::glsl::{coord_replaced, logicop_needs_dst, stage_prefix};
use crate::requirements::ShaderReq;
use crate::strbuf::{emit, GlslBuf};
use crate::TranslateError;

/// Emits the full declaration region for the analyzed shader.
pub(crate) fn emit_declarations(
    ctx: &mut TranslationCtx,
    shadow_units: &[u32],
) -> Result<GlslBuf, TranslateError> {
    let mut hdr = GlslBuf::with_capacity(2048);

    if ctx.cfg.use_gles {
        hdr.line("precision highp float;");
        hdr.line("precision highp int;");
    }

    emit_stage_layouts(ctx, &mut hdr);
    emit_inputs(ctx, &mut hdr)?;
    emit_outputs(ctx, &mut hdr)?;
    emit_clip_dist_storage(ctx, &mut hdr);
    emit_temps(ctx, &mut hdr);
    emit_constants(ctx, &mut hdr);
    emit_samplers(ctx, shadow_units, &mut hdr);
    emit_images(ctx, &mut hdr)?;
    emit_buffers(ctx, &mut hdr);
    emit_hw_atomics(ctx, &mut hdr);
    emit_key_uniforms(ctx, &mut hdr);
    emit_stream_outputs(ctx, &mut hdr);

    Ok(hdr)
}

/// The Y-flip correction belongs to the last stage before rasterization.
pub(crate) fn is_terminal_vertex_stage(ctx: &TranslationCtx) -> bool {
    match ctx.prog {
        Processor::Geometry => true,
        Processor::TessEval => !ctx.key.gs_present,
        Processor::Vertex => !ctx.key.gs_present && !ctx.key.tes_present,
        _ => false,
    }
}

fn gs_input_prim_name(prim: u32) -> &'static str {
    match prim {
        0 => "points",
        1..=3 => "lines",
        12 | 13 => "lines_adjacency",
        14 | 15 => "triangles_adjacency",
        _ => "triangles",
    }
}

fn gs_output_prim_name(prim: u32) -> &'static str {
    match prim {
        0 => "points",
        1..=3 => "line_strip",
        _ => "triangle_strip",
    }
}

fn emit_stage_layouts(ctx: &TranslationCtx, hdr: &mut GlslBuf) {
    match ctx.prog {
        Processor::Geometry => {
            let in_prim = ctx.scan.property(Property::GsInputPrim).unwrap_or(0);
            let out_prim = ctx.scan.property(Property::GsOutputPrim).unwrap_or(0);
            let max_verts = ctx
                .scan
                .property(Property::GsMaxOutputVertices)
                .unwrap_or(1);
            if let Some(invocations) = ctx.scan.property(Property::GsInvocations) {
                if invocations > 1 {
                    emit!(
                        hdr,
                        "layout({}, invocations = {invocations}) in;",
                        gs_input_prim_name(in_prim)
                    );
                } else {
                    emit!(hdr, "layout({}) in;", gs_input_prim_name(in_prim));
                }
            } else {
                emit!(hdr, "layout({}) in;", gs_input_prim_name(in_prim));
            }
            emit!(
                hdr,
                "layout({}, max_vertices = {max_verts}) out;",
                gs_output_prim_name(out_prim)
            );
        }
        Processor::TessCtrl => {
            let vertices = ctx
                .scan
                .property(Property::TcsVerticesOut)
                .filter(|&v| v != 0)
                .unwrap_or(ctx.key.tcs_vertices_out.max(1));
            emit!(hdr, "layout(vertices = {vertices}) out;");
        }
        Processor::TessEval => {
            let prim = match ctx.scan.property(Property::TesPrimMode).unwrap_or(4) {
                1 => "isolines",
                7 => "quads",
                _ => "triangles",
            };
            let spacing = match ctx.scan.property(Property::TesSpacing).unwrap_or(2) {
                0 => "fractional_odd_spacing",
                1 => "fractional_even_spacing",
                _ => "equal_spacing",
            };
            let order = if ctx.scan.property(Property::TesVertexOrderCw).unwrap_or(0) != 0 {
                "cw"
            } else {
                "ccw"
            };
            if ctx.scan.property(Property::TesPointMode).unwrap_or(0) != 0 {
                emit!(hdr, "layout({prim}, {spacing}, {order}, point_mode) in;");
            } else {
                emit!(hdr, "layout({prim}, {spacing}, {order}) in;");
            }
        }
        Processor::Compute => {
            let x = ctx.scan.property(Property::CsFixedBlockWidth).unwrap_or(1);
            let y = ctx.scan.property(Property::CsFixedBlockHeight).unwrap_or(1);
            let z = ctx.scan.property(Property::CsFixedBlockDepth).unwrap_or(1);
            emit!(
                hdr,
                "layout (local_size_x = {x}, local_size_y = {y}, local_size_z = {z}) in;"
            );
            if ctx.shared_mem_bytes > 0 {
                emit!(hdr, "shared uint values[{}];", ctx.shared_mem_bytes.div_ceil(4));
            }
        }
        Processor::Fragment => {
            if ctx.scan.property(Property::FsEarlyDepthStencil).unwrap_or(0) != 0 {
                hdr.line("layout(early_fragment_tests) in;");
            }
        }
        Processor::Vertex => {}
    }
}

/// Interpolation qualifier prefix for a fragment input.
fn interp_prefix(ctx: &TranslationCtx, slot: &IoSlot) -> String {
    let mut q = String::new();
    let interp = match slot.name {
        Semantic::Color | Semantic::BColor if ctx.key.flatshade => Interpolation::Constant,
        _ => slot.interpolation,
    };
    match interp {
        Interpolation::Constant => q.push_str("flat "),
        Interpolation::Linear => q.push_str("noperspective "),
        Interpolation::Perspective | Interpolation::Color => {}
    }
    match slot.location {
        InterpolateLoc::Centroid => q.push_str("centroid "),
        InterpolateLoc::Sample => q.push_str("sample "),
        InterpolateLoc::Center => {}
    }
    q
}

/// Array suffix for one IO variable: vertex dimension first, then the
/// element range.
fn io_array_suffix(ctx: &mut TranslationCtx, per_vertex: bool, elems: u32) -> String {
    match (per_vertex, elems > 1) {
        (false, false) => String::new(),
        (false, true) => format!("[{elems}]"),
        (true, false) => "[]".to_string(),
        (true, true) => {
            ctx.require(ShaderReq::ARRAYS_OF_ARRAYS);
            format!("[][{elems}]")
        }
    }
}

fn io_is_per_vertex(ctx: &TranslationCtx, slot_name: Semantic, is_input: bool) -> bool {
    if slot_name == Semantic::Patch {
        return false;
    }
    match (ctx.prog, is_input) {
        (Processor::Geometry, true) => true,
        (Processor::TessCtrl, _) => true,
        (Processor::TessEval, true) => true,
        _ => false,
    }
}

fn emit_inputs(ctx: &mut TranslationCtx, hdr: &mut GlslBuf) -> Result<(), TranslateError> {
    let slots = ctx.inputs.clone();
    for slot in &slots {
        if slot.glsl_predefined_no_emit || coord_replaced(ctx, slot) {
            continue;
        }
        let per_vertex = io_is_per_vertex(ctx, slot.name, true);
        let suffix = io_array_suffix(ctx, per_vertex, slot.array_len());
        let mut quals = String::new();
        if let Some(loc) = slot.layout_location {
            quals.push_str(&format!("layout(location = {loc}) "));
        } else if ctx.prog == Processor::Vertex && ctx.cfg.use_explicit_locations {
            quals.push_str(&format!("layout(location = {}) ", slot.first));
        }
        if ctx.prog == Processor::Fragment {
            quals.push_str(&interp_prefix(ctx, slot));
        }
        if slot.name == Semantic::Patch && ctx.prog != Processor::Vertex {
            quals.push_str("patch ");
        }
        emit!(hdr, "{quals}in vec4 {}{suffix};", slot.glsl_name);
    }
    if let Some(range) = ctx.generic_input_range.clone() {
        let per_vertex = io_is_per_vertex(ctx, Semantic::Generic, true);
        let suffix = io_array_suffix(ctx, per_vertex, range.array_len());
        let suffix = if per_vertex {
            suffix
        } else {
            format!("[{}]", range.array_len())
        };
        emit!(hdr, "in vec4 {}{suffix};", range.glsl_name);
    }
    if let Some(range) = ctx.patch_input_range.clone() {
        emit!(hdr, "patch in vec4 {}[{}];", range.glsl_name, range.array_len());
    }
    if ctx.prog == Processor::Fragment && ctx.num_in_clip_dist > 0 {
        emit!(hdr, "in float gl_ClipDistance[{}];", ctx.num_in_clip_dist.min(8));
    }
    Ok(())
}

fn emit_outputs(ctx: &mut TranslationCtx, hdr: &mut GlslBuf) -> Result<(), TranslateError> {
    let logicop = ctx.key.logicop_emulated();
    let slots = ctx.outputs.clone();
    for slot in &slots {
        if slot.name == Semantic::Color && ctx.prog == Processor::Fragment {
            // The staging global carries the guest's writes; the real
            // attachment output is declared separately under logic-op
            // emulation.
            if let Some(op) = logicop {
                emit!(hdr, "vec4 fsout_tmp_c{};", slot.sid);
                let io = if logicop_needs_dst(op) { "inout" } else { "out" };
                emit!(hdr, "{io} vec4 fsout_c{};", slot.sid);
            } else {
                emit!(hdr, "out vec4 {};", slot.glsl_name);
            }
            continue;
        }
        if slot.glsl_predefined_no_emit {
            continue;
        }
        let per_vertex = io_is_per_vertex(ctx, slot.name, false);
        let suffix = io_array_suffix(ctx, per_vertex, slot.array_len());
        let mut quals = String::new();
        if let Some(loc) = slot.layout_location {
            quals.push_str(&format!("layout(location = {loc}) "));
        }
        if slot.invariant {
            quals.push_str("invariant ");
        }
        if slot.name == Semantic::Patch {
            quals.push_str("patch ");
        }
        emit!(hdr, "{quals}out vec4 {}{suffix};", slot.glsl_name);
    }
    if let Some(range) = ctx.generic_output_range.clone() {
        let per_vertex = io_is_per_vertex(ctx, Semantic::Generic, false);
        let suffix = if per_vertex {
            io_array_suffix(ctx, true, range.array_len())
        } else {
            format!("[{}]", range.array_len())
        };
        emit!(hdr, "out vec4 {}{suffix};", range.glsl_name);
    }
    if let Some(range) = ctx.patch_output_range.clone() {
        emit!(hdr, "patch out vec4 {}[{}];", range.glsl_name, range.array_len());
    }
    // The clip vertex is staged through a global and folded into clip
    // distances on the exit path.
    if slots.iter().any(|s| s.name == Semantic::ClipVertex) {
        hdr.line("vec4 clipv_tmp;");
    }
    Ok(())
}

fn emit_clip_dist_storage(ctx: &mut TranslationCtx, hdr: &mut GlslBuf) {
    if ctx.prog == Processor::Fragment || ctx.prog == Processor::Compute {
        return;
    }
    let lanes = (ctx.num_clip_dist_out + ctx.num_cull_dist_out).min(8);
    let plane_count = ctx.key.clip_plane_count();
    if lanes > 0 {
        emit!(hdr, "float clip_dist_temp[{lanes}];");
        // Tess-control clip outputs stay per-vertex; only the other
        // vertex-family stages flush the staging array to the builtins.
        if ctx.prog != Processor::TessCtrl {
            let clip = ctx.num_clip_dist_out.min(8);
            if clip > 0 {
                emit!(hdr, "out float gl_ClipDistance[{clip}];");
            }
            let cull = ctx.num_cull_dist_out.min(8u32.saturating_sub(clip));
            if cull > 0 {
                emit!(hdr, "out float gl_CullDistance[{cull}];");
            }
        }
    } else if plane_count > 0 && ctx.prog == Processor::Vertex {
        emit!(hdr, "out float gl_ClipDistance[{plane_count}];");
    }
}

fn emit_temps(ctx: &TranslationCtx, hdr: &mut GlslBuf) {
    for range in &ctx.temp_ranges {
        if range.first == range.last && range.array_id == 0 {
            emit!(hdr, "vec4 temp{};", range.first);
        } else {
            emit!(
                hdr,
                "vec4 temp{}[{}];",
                range.first,
                range.last - range.first + 1
            );
        }
    }
    for i in 0..ctx.num_address {
        emit!(hdr, "int addr{i};");
    }
}

fn emit_constants(ctx: &TranslationCtx, hdr: &mut GlslBuf) {
    let sp = stage_prefix(ctx.prog);
    if ctx.num_consts > 0 {
        emit!(hdr, "uniform vec4 {sp}const0[{}];", ctx.num_consts);
    }
    for buf in 0..crate::limits::MAX_UBOS as u32 {
        if ctx.ubo_used_mask & (1 << buf) != 0 {
            emit!(
                hdr,
                "uniform {sp}ubo{buf} {{ vec4 {sp}ubo{buf}contents[{}]; }};",
                ctx.ubo_sizes[buf as usize]
            );
        }
    }
}

fn sampler_type_name(slot: &SamplerSlot, gles: bool) -> String {
    use TextureTarget::*;
    let prefix = match slot.return_type {
        ReturnType::Sint => "i",
        ReturnType::Uint => "u",
        _ => "",
    };
    let base = if slot.is_msaa {
        match slot.target {
            Tex2DArray | Tex2DArrayMsaa => "sampler2DMSArray",
            _ => "sampler2DMS",
        }
    } else {
        match slot.target {
            Buffer => "samplerBuffer",
            Tex1D => "sampler1D",
            Tex2D => "sampler2D",
            Tex3D => "sampler3D",
            Cube => "samplerCube",
            Rect => {
                if gles {
                    "sampler2D"
                } else {
                    "sampler2DRect"
                }
            }
            Shadow1D => "sampler1DShadow",
            Shadow2D => "sampler2DShadow",
            ShadowRect => {
                if gles {
                    "sampler2DShadow"
                } else {
                    "sampler2DRectShadow"
                }
            }
            Tex1DArray => "sampler1DArray",
            Tex2DArray => "sampler2DArray",
            Shadow1DArray => "sampler1DArrayShadow",
            Shadow2DArray => "sampler2DArrayShadow",
            ShadowCube => "samplerCubeShadow",
            Tex2DMsaa => "sampler2DMS",
            Tex2DArrayMsaa => "sampler2DMSArray",
            CubeArray => "samplerCubeArray",
            ShadowCubeArray => "samplerCubeArrayShadow",
        }
    };
    format!("{prefix}{base}")
}

fn emit_samplers(ctx: &TranslationCtx, shadow_units: &[u32], hdr: &mut GlslBuf) {
    let sp = stage_prefix(ctx.prog);
    let gles = ctx.cfg.use_gles;
    for arr in &ctx.sampler_arrays {
        if let Some(slot) = ctx.samplers[arr.first as usize] {
            emit!(
                hdr,
                "uniform {} {sp}samp{}[{}];",
                sampler_type_name(&slot, gles),
                arr.first,
                arr.array_size
            );
        }
    }
    for (unit, slot) in ctx.samplers.iter().enumerate() {
        let Some(slot) = slot else { continue };
        if ctx.sampler_array_for(unit as u32).is_some() {
            continue;
        }
        emit!(
            hdr,
            "uniform {} {sp}samp{unit};",
            sampler_type_name(slot, gles)
        );
    }
    for &unit in shadow_units {
        emit!(hdr, "uniform vec4 {sp}shadmask{unit};");
        emit!(hdr, "uniform vec4 {sp}shadadd{unit};");
    }
}

fn image_type_name(target: TextureTarget, class_prefix: &str, gles: bool) -> String {
    use TextureTarget::*;
    let base = match target {
        Buffer => "imageBuffer",
        Tex1D => "image1D",
        Tex2D => "image2D",
        Tex3D => "image3D",
        Cube => "imageCube",
        Rect => {
            if gles {
                "image2D"
            } else {
                "image2DRect"
            }
        }
        Tex1DArray => "image1DArray",
        Tex2DArray => "image2DArray",
        CubeArray => "imageCubeArray",
        Tex2DMsaa => "image2DMS",
        Tex2DArrayMsaa => "image2DMSArray",
        _ => "image2D",
    };
    format!("{class_prefix}{base}")
}

fn emit_images(ctx: &mut TranslationCtx, hdr: &mut GlslBuf) -> Result<(), TranslateError> {
    let sp = stage_prefix(ctx.prog);
    let gles = ctx.cfg.use_gles;
    let arrays = ctx.image_arrays.clone();
    let images = ctx.images;

    let mut one = |ctx: &mut TranslationCtx,
                   hdr: &mut GlslBuf,
                   unit: u32,
                   slot: crate::context::ImageSlot,
                   array: Option<u32>|
     -> Result<(), TranslateError> {
        let (layout, prefix) = if slot.format == 0 {
            if !slot.writable {
                return Err(TranslateError::Unsupported(
                    "readable image without a format".into(),
                ));
            }
            (String::new(), "")
        } else {
            let fmt = formats::lookup(slot.format).ok_or_else(|| {
                TranslateError::Unsupported(format!("image format code {}", slot.format))
            })?;
            if gles && formats::needs_nv_image_formats(slot.format) {
                ctx.require(ShaderReq::NV_IMAGE_FORMATS);
            }
            (
                format!("layout({}) ", fmt.glsl_name),
                match fmt.class {
                    formats::FormatClass::Float => "",
                    formats::FormatClass::Sint => "i",
                    formats::FormatClass::Uint => "u",
                },
            )
        };
        let access = if slot.format == 0 { "writeonly " } else { "" };
        let suffix = match array {
            Some(size) => format!("[{size}]"),
            None => String::new(),
        };
        emit!(
            hdr,
            "{layout}{access}uniform {} {sp}img{unit}{suffix};",
            image_type_name(slot.target, prefix, gles)
        );
        Ok(())
    };

    for arr in &arrays {
        if let Some(slot) = images[arr.first as usize] {
            one(ctx, hdr, arr.first, slot, Some(arr.array_size))?;
        }
    }
    for (unit, slot) in images.iter().enumerate() {
        let Some(slot) = slot else { continue };
        if ctx.image_array_for(unit as u32).is_some() {
            continue;
        }
        one(ctx, hdr, unit as u32, *slot, None)?;
    }
    Ok(())
}

fn emit_buffers(ctx: &TranslationCtx, hdr: &mut GlslBuf) {
    let sp = stage_prefix(ctx.prog);
    for binding in 0..crate::limits::MAX_SSBOS as u32 {
        if ctx.ssbo_used_mask & (1 << binding) != 0 {
            emit!(
                hdr,
                "layout (binding = {binding}, std430) buffer {sp}ssbo{binding} {{ uint {sp}ssbocontents{binding}[]; }};"
            );
        }
    }
}

fn emit_hw_atomics(ctx: &TranslationCtx, hdr: &mut GlslBuf) {
    for range in &ctx.hw_atomics {
        let binding = range.buffer_id;
        let offset = range.first * 4;
        if range.first == range.last {
            emit!(
                hdr,
                "layout (binding = {binding}, offset = {offset}) uniform atomic_uint ac{};",
                range.first
            );
        } else {
            emit!(
                hdr,
                "layout (binding = {binding}, offset = {offset}) uniform atomic_uint ac{}_arr[{}];",
                range.first,
                range.last - range.first + 1
            );
        }
    }
}

fn emit_key_uniforms(ctx: &TranslationCtx, hdr: &mut GlslBuf) {
    if ctx.prog == Processor::Fragment {
        if let Some((func, _)) = ctx.key.alpha_test {
            if func.glsl_op().is_some() {
                hdr.line("uniform float alpha_ref_val;");
            }
        }
    }
    if ctx.prog == Processor::Vertex && ctx.key.clip_plane_enable != 0 {
        emit!(hdr, "uniform vec4 clipp[{}];", crate::limits::MAX_CLIP_PLANES);
    }
    if ctx.key.winsys_adjust_y_emitted && is_terminal_vertex_stage(ctx) {
        hdr.line("uniform float winsys_adjust_y;");
    }
}

fn emit_stream_outputs(ctx: &TranslationCtx, hdr: &mut GlslBuf) {
    for d in &ctx.so_decisions {
        if d.need_temp {
            if d.entry.num_components == 1 {
                emit!(hdr, "out float {};", d.glsl_name);
            } else {
                emit!(hdr, "out vec{} {};", d.entry.num_components, d.glsl_name);
            }
        }
    }
}
