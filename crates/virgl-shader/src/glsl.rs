//! GLSL code generation.
//!
//! The generator walks the instruction stream a second time, resolving
//! every operand through the completed [`TranslationCtx`] and emitting one
//! statement group per instruction into the `main` buffer. Header and
//! version regions are produced afterwards from the accumulated state, so
//! no qualifier ever needs textual patching inside this stage.
//!
//! Registers are untyped 4-lane vectors stored as `vec4`; integer, unsigned
//! and double opcodes reinterpret lanes with the `*BitsTo*` and
//! `packDouble2x32` built-ins, the way the reference renderer emits them.

use virgl_tgsi::decode::{
    DstOperand, FullInstruction, IndirectAddr, SrcOperand, TexOffset,
};
use virgl_tgsi::token::{
    ImmediateType, Opcode, Processor, Property, RegisterFile, Semantic, TextureTarget,
    ReturnType,
};

use crate::config::{CompareFunc, LogicOp};
use crate::context::{IoSlot, TranslationCtx};
use crate::formats::{self, FormatClass};
use crate::requirements::ShaderReq;
use crate::strbuf::{emit, GlslBuf};
use crate::TranslateError;

const SWIZZLE_CHARS: [char; 4] = ['x', 'y', 'z', 'w'];

fn unsupported(what: impl Into<String>) -> TranslateError {
    TranslateError::Unsupported(what.into())
}

/// Short stage prefix used on uniform, sampler, and buffer names.
pub(crate) fn stage_prefix(prog: Processor) -> &'static str {
    match prog {
        Processor::Vertex => "vs",
        Processor::Fragment => "fs",
        Processor::Geometry => "gs",
        Processor::TessCtrl => "tc",
        Processor::TessEval => "te",
        Processor::Compute => "cs",
    }
}

fn mask_chars(mask: u8) -> String {
    (0..4)
        .filter(|l| mask & (1 << l) != 0)
        .map(|l| SWIZZLE_CHARS[l as usize])
        .collect()
}

/// Resolved destination, ready for assignment emission.
enum DstRef {
    Plain {
        lhs: String,
        mask: u8,
        /// Scalar built-in: assignment takes one lane, no mask suffix.
        no_wm: bool,
    },
    /// Staged clip/cull lanes; lane `l` of the value lands in
    /// `clip_dist_temp[base_lane + l]`.
    ClipDist { base_lane: u32, mask: u8 },
}

pub struct Generator<'a> {
    pub ctx: &'a mut TranslationCtx,
    pub main: GlslBuf,
    /// Shadow-sampler emulation uniforms discovered during emission.
    shadow_units: Vec<u32>,
}

impl<'a> Generator<'a> {
    pub fn new(ctx: &'a mut TranslationCtx) -> Self {
        Self {
            ctx,
            main: GlslBuf::with_capacity(4096),
            shadow_units: Vec::new(),
        }
    }

    fn sp(&self) -> &'static str {
        stage_prefix(self.ctx.prog)
    }

    fn op_used(&self, op: Opcode) -> bool {
        self.ctx.scan.opcode_count[op.raw() as usize] != 0
    }

    /// Opens `main()` and emits the per-invocation preamble.
    pub fn begin_main(&mut self) {
        self.main.line("void main(void)");
        self.main.line("{");
        self.main.indent();

        // Scratch variables for opcodes whose built-ins write through out
        // parameters or need a staged word address.
        if self.op_used(Opcode::IMulHi) {
            self.main.line("ivec4 mulhi_tmp; ivec4 mullo_tmp;");
        }
        if self.op_used(Opcode::UMulHi) {
            self.main.line("uvec4 umulhi_tmp; uvec4 umullo_tmp;");
        }
        if [
            Opcode::Load,
            Opcode::Store,
            Opcode::AtomUAdd,
            Opcode::AtomXchg,
            Opcode::AtomCas,
            Opcode::AtomAnd,
            Opcode::AtomOr,
            Opcode::AtomXor,
            Opcode::AtomUMin,
            Opcode::AtomUMax,
            Opcode::AtomIMin,
            Opcode::AtomIMax,
        ]
        .iter()
        .any(|&op| self.op_used(op))
        {
            self.main.line("uint mem_addr_tmp = 0u;");
        }

        let prefix = self.ctx.input_prefix();
        for sid in self.ctx.two_side_colors.clone() {
            emit!(
                self.main,
                "vec4 realcolor{sid} = gl_FrontFacing ? {prefix}_c{sid} : {prefix}_bc{sid};"
            );
        }
        if self.ctx.prog == Processor::Fragment && self.ctx.key.coord_replace != 0 {
            for slot in self.ctx.inputs.clone() {
                if coord_replaced(self.ctx, &slot) {
                    emit!(
                        self.main,
                        "vec4 {} = vec4(gl_PointCoord.x, gl_PointCoord.y, 0.0, 1.0);",
                        slot.glsl_name
                    );
                }
            }
        }
    }

    pub fn end_main(&mut self) {
        self.main.outdent();
        self.main.line("}");
    }

    // ---- operand resolution -------------------------------------------

    fn addr_expr(&self, ind: &IndirectAddr) -> Result<String, TranslateError> {
        match ind.file {
            RegisterFile::Address => Ok(format!("addr{}", ind.index)),
            RegisterFile::Temporary => {
                let base = self.temp_ref(ind.index as u32, None)?;
                Ok(format!(
                    "floatBitsToInt({base}.{})",
                    SWIZZLE_CHARS[ind.swizzle.lane()]
                ))
            }
            other => Err(unsupported(format!(
                "indirect addressing through {} file",
                other.name()
            ))),
        }
    }

    fn index_expr(
        &self,
        base_index: i32,
        rel_to: u32,
        indirect: Option<&IndirectAddr>,
    ) -> Result<String, TranslateError> {
        let off = base_index - rel_to as i32;
        match indirect {
            None => Ok(off.to_string()),
            Some(ind) => {
                let addr = self.addr_expr(ind)?;
                if off == 0 {
                    Ok(addr)
                } else {
                    Ok(format!("{addr} + {off}"))
                }
            }
        }
    }

    fn temp_ref(
        &self,
        reg: u32,
        indirect: Option<&IndirectAddr>,
    ) -> Result<String, TranslateError> {
        let range = self
            .ctx
            .find_temp_range(reg)
            .ok_or_else(|| unsupported(format!("undeclared temporary {reg}")))?;
        if range.first == range.last && range.array_id == 0 && indirect.is_none() {
            return Ok(format!("temp{}", range.first));
        }
        let idx = self.index_expr(reg as i32, range.first, indirect)?;
        Ok(format!("temp{}[{idx}]", range.first))
    }

    /// Vertex index expression for a per-vertex IO reference.
    fn dim_expr(
        &self,
        dim: Option<&virgl_tgsi::decode::Dimension>,
        default: &str,
    ) -> Result<String, TranslateError> {
        match dim {
            None => Ok(default.to_string()),
            Some(d) => match &d.indirect {
                None => Ok(d.index.to_string()),
                Some(ind) => {
                    let addr = self.addr_expr(ind)?;
                    if d.index == 0 {
                        Ok(addr)
                    } else {
                        Ok(format!("{addr} + {}", d.index))
                    }
                }
            },
        }
    }

    fn io_is_per_vertex(&self, slot: &IoSlot, is_input: bool) -> bool {
        if slot.name == Semantic::Patch {
            return false;
        }
        match (self.ctx.prog, is_input) {
            (Processor::Geometry, true) => true,
            (Processor::TessCtrl, _) => true,
            (Processor::TessEval, true) => true,
            _ => false,
        }
    }

    fn input_base_expr(
        &mut self,
        src: &SrcOperand,
        slot: &IoSlot,
    ) -> Result<String, TranslateError> {
        // Front-facing reads become the ±1.0 select.
        if slot.name == Semantic::Face {
            return Ok("vec4(gl_FrontFacing ? 1.0 : -1.0)".to_string());
        }
        if slot.name == Semantic::ClipDist {
            let base = 4 * (src.index as u32 - slot.first);
            let lanes: Vec<String> = (0..4)
                .map(|l| {
                    if base + l < self.ctx.num_in_clip_dist {
                        format!("gl_ClipDistance[{}]", base + l)
                    } else {
                        "0.0".to_string()
                    }
                })
                .collect();
            return Ok(format!("vec4({})", lanes.join(", ")));
        }
        if self.ctx.prog == Processor::Fragment
            && self.ctx.key.color_two_side
            && matches!(slot.name, Semantic::Color | Semantic::BColor)
        {
            return Ok(format!("realcolor{}", slot.sid));
        }

        let per_vertex = self.io_is_per_vertex(slot, true);
        let vertex = if per_vertex {
            Some(self.dim_expr(src.dimension.as_ref(), "0")?)
        } else {
            None
        };

        if slot.glsl_predefined_no_emit && slot.name == Semantic::Position {
            return Ok(match vertex {
                Some(v) => format!("gl_in[{v}].gl_Position"),
                None => slot.glsl_name.clone(),
            });
        }
        if slot.glsl_predefined_no_emit && slot.name == Semantic::PointSize {
            return Ok(match vertex {
                Some(v) => format!("vec4(gl_in[{v}].gl_PointSize)"),
                None => "vec4(gl_PointSize)".to_string(),
            });
        }

        // Coalesced range rewrite for indirectly addressed generics.
        let range = match slot.name {
            Semantic::Generic => self.ctx.generic_input_range.clone(),
            Semantic::Patch => self.ctx.patch_input_range.clone(),
            _ => None,
        };
        let (name, elem) = if let Some(range) = range {
            let idx = self.index_expr(
                (slot.sid + (src.index as u32 - slot.first)) as i32,
                range.sid_start,
                src.indirect.as_ref(),
            )?;
            (range.glsl_name.clone(), Some(idx))
        } else if slot.glsl_no_index {
            (slot.glsl_name.clone(), None)
        } else if slot.array_id != 0 || slot.first != slot.last || src.indirect.is_some() {
            let idx = self.index_expr(src.index, slot.first, src.indirect.as_ref())?;
            (slot.glsl_name.clone(), Some(idx))
        } else {
            (slot.glsl_name.clone(), None)
        };
        // Per-vertex blocks subscript on the vertex first.
        let mut base = name;
        if let Some(v) = vertex {
            base = format!("{base}[{v}]");
        }
        if let Some(idx) = elem {
            base = format!("{base}[{idx}]");
        }
        if slot.is_int {
            base = format!("intBitsToFloat(ivec4({base}))");
        }
        Ok(base)
    }

    fn sysval_expr(&self, slot: &IoSlot) -> String {
        let n = &slot.glsl_name;
        match slot.name {
            Semantic::TessCoord => format!("vec4({n}, 0.0)"),
            Semantic::SamplePos => format!("vec4({n}, 0.0, 0.0)"),
            Semantic::HelperInvocation => format!("vec4(float({n}))"),
            Semantic::TessOuter => format!(
                "vec4({n}[0], {n}[1], {n}[2], {n}[3])"
            ),
            Semantic::TessInner => format!("vec4({n}[0], {n}[1], 0.0, 0.0)"),
            Semantic::ThreadId | Semantic::BlockId | Semantic::GridSize | Semantic::BlockSize => {
                format!("uintBitsToFloat(uvec4({n}, 0u))")
            }
            _ if slot.is_int => format!("intBitsToFloat(ivec4({n}))"),
            _ => format!("vec4({n})"),
        }
    }

    fn const_expr(&mut self, src: &SrcOperand) -> Result<String, TranslateError> {
        let sp = self.sp();
        match src.dimension.as_ref().map(|d| d.index) {
            None | Some(0) => {
                // Flat constants; numbered uniform blocks start at 1.
                let idx = self.index_expr(src.index, 0, src.indirect.as_ref())?;
                Ok(format!("{sp}const0[{idx}]"))
            }
            Some(buf) => {
                let idx = self.index_expr(src.index, 0, src.indirect.as_ref())?;
                Ok(format!("{sp}ubo{buf}contents[{idx}]"))
            }
        }
    }

    fn imm_expr(&self, src: &SrcOperand) -> Result<String, TranslateError> {
        let imm = self
            .ctx
            .immediates
            .get(src.index as usize)
            .ok_or_else(|| unsupported(format!("undeclared immediate {}", src.index)))?;
        let lane = |l: usize| imm.data[src.swizzle[l].lane()];
        let expr = match imm.data_type {
            ImmediateType::Float32 => {
                let vals: Vec<String> = (0..4)
                    .map(|l| format_f32(f32::from_bits(lane(l))))
                    .collect();
                format!("vec4({})", vals.join(", "))
            }
            ImmediateType::Uint32 => {
                let vals: Vec<String> = (0..4).map(|l| format!("{}u", lane(l))).collect();
                format!("uintBitsToFloat(uvec4({}))", vals.join(", "))
            }
            ImmediateType::Int32 => {
                let vals: Vec<String> = (0..4).map(|l| format!("{}", lane(l) as i32)).collect();
                format!("intBitsToFloat(ivec4({}))", vals.join(", "))
            }
            ImmediateType::Float64 => {
                return Err(unsupported(
                    "double immediates outside double opcodes",
                ));
            }
        };
        Ok(apply_modifiers(expr, false, src.absolute, src.negate))
    }

    /// Integer literal value of an immediate lane, for `case` labels and
    /// texture-offset folding.
    fn imm_lane_i32(&self, index: i32, lane: usize) -> Result<i32, TranslateError> {
        let imm = self
            .ctx
            .immediates
            .get(index as usize)
            .ok_or_else(|| unsupported(format!("undeclared immediate {index}")))?;
        let raw = imm.data[lane];
        Ok(match imm.data_type {
            ImmediateType::Float32 => f32::from_bits(raw) as i32,
            _ => raw as i32,
        })
    }

    fn src_expr(&mut self, src: &SrcOperand) -> Result<String, TranslateError> {
        let identity = src
            .swizzle
            .iter()
            .enumerate()
            .all(|(l, s)| s.lane() == l);

        let base = match src.file {
            RegisterFile::Immediate => return self.imm_expr(src),
            RegisterFile::Temporary => self.temp_ref(src.index as u32, src.indirect.as_ref())?,
            RegisterFile::Input => {
                let slot = self
                    .ctx
                    .find_input(src.index as u32)
                    .cloned()
                    .ok_or_else(|| unsupported(format!("undeclared input {}", src.index)))?;
                self.input_base_expr(src, &slot)?
            }
            RegisterFile::Output => {
                // Reading back own outputs (tess-control).
                let slot = self
                    .ctx
                    .find_output(src.index as u32)
                    .cloned()
                    .ok_or_else(|| unsupported(format!("undeclared output {}", src.index)))?;
                let per_vertex = self.io_is_per_vertex(&slot, false);
                let mut base = slot.glsl_name.clone();
                if per_vertex {
                    let v = self.dim_expr(src.dimension.as_ref(), "gl_InvocationID")?;
                    base = if slot.name == Semantic::Position {
                        format!("gl_out[{v}].gl_Position")
                    } else {
                        format!("{base}[{v}]")
                    };
                }
                base
            }
            RegisterFile::SystemValue => {
                let slot = self
                    .ctx
                    .find_system_value(src.index as u32)
                    .cloned()
                    .ok_or_else(|| {
                        unsupported(format!("undeclared system value {}", src.index))
                    })?;
                self.sysval_expr(&slot)
            }
            RegisterFile::Constant => self.const_expr(src)?,
            RegisterFile::Address => format!("vec4(intBitsToFloat(addr{}))", src.index),
            other => {
                return Err(unsupported(format!(
                    "source operand in {} file",
                    other.name()
                )));
            }
        };

        let mut expr = base;
        if !identity {
            let chars: String = src.swizzle.iter().map(|s| SWIZZLE_CHARS[s.lane()]).collect();
            expr = format!("{expr}.{chars}");
        }
        Ok(apply_modifiers(expr, false, src.absolute, src.negate))
    }

    fn dst_ref(&mut self, dst: &DstOperand) -> Result<DstRef, TranslateError> {
        match dst.file {
            RegisterFile::Temporary => Ok(DstRef::Plain {
                lhs: self.temp_ref(dst.index as u32, dst.indirect.as_ref())?,
                mask: dst.write_mask,
                no_wm: false,
            }),
            RegisterFile::Address => Ok(DstRef::Plain {
                lhs: format!("addr{}", dst.index),
                mask: dst.write_mask,
                no_wm: true,
            }),
            RegisterFile::Output => {
                let slot = self
                    .ctx
                    .find_output(dst.index as u32)
                    .cloned()
                    .ok_or_else(|| unsupported(format!("undeclared output {}", dst.index)))?;
                if matches!(slot.name, Semantic::ClipDist | Semantic::CullDist) {
                    let clip_base = if slot.name == Semantic::CullDist {
                        self.ctx.num_clip_dist_out
                    } else {
                        0
                    };
                    return Ok(DstRef::ClipDist {
                        base_lane: clip_base + 4 * (dst.index as u32 - slot.first),
                        mask: dst.write_mask,
                    });
                }
                let per_vertex = self.io_is_per_vertex(&slot, false);
                let range = match slot.name {
                    Semantic::Generic => self.ctx.generic_output_range.clone(),
                    Semantic::Patch => self.ctx.patch_output_range.clone(),
                    _ => None,
                };
                let (name, elem) = if let Some(range) = range {
                    let idx = self.index_expr(
                        (slot.sid + (dst.index as u32 - slot.first)) as i32,
                        range.sid_start,
                        dst.indirect.as_ref(),
                    )?;
                    (range.glsl_name.clone(), Some(idx))
                } else if slot.glsl_no_index {
                    (slot.glsl_name.clone(), None)
                } else if slot.array_id != 0 || slot.first != slot.last || dst.indirect.is_some() {
                    let idx = self.index_expr(dst.index, slot.first, dst.indirect.as_ref())?;
                    (slot.glsl_name.clone(), Some(idx))
                } else {
                    (slot.glsl_name.clone(), None)
                };
                let mut lhs = name;
                if per_vertex {
                    let v = self.dim_expr(dst.dimension.as_ref(), "gl_InvocationID")?;
                    lhs = if slot.name == Semantic::Position {
                        format!("gl_out[{v}].gl_Position")
                    } else {
                        format!("{lhs}[{v}]")
                    };
                }
                if let Some(idx) = elem {
                    lhs = format!("{lhs}[{idx}]");
                }
                Ok(DstRef::Plain {
                    lhs,
                    mask: dst.write_mask,
                    no_wm: slot.override_no_wm,
                })
            }
            other => Err(unsupported(format!(
                "destination operand in {} file",
                other.name()
            ))),
        }
    }

    fn emit_assign(&mut self, dst: &DstRef, value: &str) {
        match dst {
            DstRef::Plain { lhs, mask, no_wm } => {
                if *no_wm {
                    let lane = mask.trailing_zeros().min(3) as usize;
                    emit!(self.main, "{lhs} = ({value}).{};", SWIZZLE_CHARS[lane]);
                } else if *mask == 0xF {
                    emit!(self.main, "{lhs} = {value};");
                } else {
                    let chars = mask_chars(*mask);
                    emit!(self.main, "{lhs}.{chars} = ({value}).{chars};");
                }
            }
            DstRef::ClipDist { base_lane, mask } => {
                for l in 0..4u32 {
                    if mask & (1 << l) != 0 {
                        emit!(
                            self.main,
                            "clip_dist_temp[{}] = ({value}).{};",
                            base_lane + l,
                            SWIZZLE_CHARS[l as usize]
                        );
                    }
                }
            }
        }
    }

    fn assign0(&mut self, inst: &FullInstruction, value: String) -> Result<(), TranslateError> {
        let value = if inst.saturate {
            format!("clamp({value}, 0.0, 1.0)")
        } else {
            value
        };
        let dst = self.dst_ref(&inst.dsts[0])?;
        self.emit_assign(&dst, &value);
        Ok(())
    }

    // ---- instruction emission -----------------------------------------

    pub fn emit_instruction(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        use Opcode::*;

        if inst.opcode.is_tex() {
            return self.translate_tex(inst);
        }
        if inst.opcode.uses_doubles() {
            return self.translate_double(inst);
        }

        macro_rules! s {
            ($i:expr) => {
                self.src_expr(&inst.srcs[$i])?
            };
        }

        match inst.opcode {
            Mov => {
                let v = s!(0);
                self.assign0(inst, v)?;
            }
            Add => {
                let v = format!("({} + {})", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Sub => {
                let v = format!("({} - {})", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Mul => {
                let v = format!("({} * {})", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Div => {
                let v = format!("({} / {})", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Mad => {
                let v = format!("(({} * {}) + {})", s!(0), s!(1), s!(2));
                self.assign0(inst, v)?;
            }
            Fma => {
                let v = format!("fma({}, {}, {})", s!(0), s!(1), s!(2));
                self.assign0(inst, v)?;
            }
            Min => {
                let v = format!("min({}, {})", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Max => {
                let v = format!("max({}, {})", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Frc => {
                let v = format!("fract({})", s!(0));
                self.assign0(inst, v)?;
            }
            Flr => {
                let v = format!("floor({})", s!(0));
                self.assign0(inst, v)?;
            }
            Ceil => {
                let v = format!("ceil({})", s!(0));
                self.assign0(inst, v)?;
            }
            Round => {
                let v = format!("round({})", s!(0));
                self.assign0(inst, v)?;
            }
            Trunc => {
                let v = format!("trunc({})", s!(0));
                self.assign0(inst, v)?;
            }
            Ssg => {
                let v = format!("sign({})", s!(0));
                self.assign0(inst, v)?;
            }
            Abs => {
                let v = format!("abs({})", s!(0));
                self.assign0(inst, v)?;
            }
            Rcp => {
                let v = format!("vec4(1.0 / ({}).x)", s!(0));
                self.assign0(inst, v)?;
            }
            Rsq => {
                let v = format!("vec4(inversesqrt(abs(({}).x)))", s!(0));
                self.assign0(inst, v)?;
            }
            Sqrt => {
                let v = format!("vec4(sqrt(({}).x))", s!(0));
                self.assign0(inst, v)?;
            }
            Ex2 => {
                let v = format!("vec4(exp2(({}).x))", s!(0));
                self.assign0(inst, v)?;
            }
            Lg2 => {
                let v = format!("vec4(log2(({}).x))", s!(0));
                self.assign0(inst, v)?;
            }
            Pow => {
                let v = format!("vec4(pow(({}).x, ({}).x))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Sin => {
                let v = format!("vec4(sin(({}).x))", s!(0));
                self.assign0(inst, v)?;
            }
            Cos => {
                let v = format!("vec4(cos(({}).x))", s!(0));
                self.assign0(inst, v)?;
            }
            Scs => {
                let a = s!(0);
                let v = format!("vec4(cos(({a}).x), sin(({a}).x), 0.0, 1.0)");
                self.assign0(inst, v)?;
            }
            Exp => {
                let a = s!(0);
                let v = format!(
                    "vec4(exp2(floor(({a}).x)), ({a}).x - floor(({a}).x), exp2(({a}).x), 1.0)"
                );
                self.assign0(inst, v)?;
            }
            Log => {
                let a = s!(0);
                let v = format!(
                    "vec4(floor(log2(abs(({a}).x))), abs(({a}).x) / exp2(floor(log2(abs(({a}).x)))), log2(abs(({a}).x)), 1.0)"
                );
                self.assign0(inst, v)?;
            }
            Lit => {
                let a = s!(0);
                let v = format!(
                    "vec4(1.0, max(({a}).x, 0.0), (({a}).x > 0.0) ? pow(clamp(({a}).y, 0.0, 1.0), clamp(({a}).w, -128.0, 128.0)) : 0.0, 1.0)"
                );
                self.assign0(inst, v)?;
            }
            Dp2 => {
                let v = format!("vec4(dot(({}).xy, ({}).xy))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Dp3 => {
                let v = format!("vec4(dot(({}).xyz, ({}).xyz))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Dp4 => {
                let v = format!("vec4(dot({}, {}))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Dph => {
                let v = format!("vec4(dot(vec4(({}).xyz, 1.0), {}))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Dst => {
                let a = s!(0);
                let b = s!(1);
                let v = format!("vec4(1.0, ({a}).y * ({b}).y, ({a}).z, ({b}).w)");
                self.assign0(inst, v)?;
            }
            Xpd => {
                let v = format!("vec4(cross(({}).xyz, ({}).xyz), 1.0)", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Lrp => {
                let v = format!("mix({}, {}, {})", s!(2), s!(1), s!(0));
                self.assign0(inst, v)?;
            }
            Cmp => {
                let v = format!(
                    "mix({}, {}, lessThan({}, vec4(0.0)))",
                    s!(2),
                    s!(1),
                    s!(0)
                );
                self.assign0(inst, v)?;
            }
            Slt => {
                let v = format!("vec4(lessThan({}, {}))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Sge => {
                let v = format!("vec4(greaterThanEqual({}, {}))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Seq => {
                let v = format!("vec4(equal({}, {}))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Sne => {
                let v = format!("vec4(notEqual({}, {}))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Sgt => {
                let v = format!("vec4(greaterThan({}, {}))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Sle => {
                let v = format!("vec4(lessThanEqual({}, {}))", s!(0), s!(1));
                self.assign0(inst, v)?;
            }
            Fseq => self.int_set(inst, "equal")?,
            Fsge => self.int_set(inst, "greaterThanEqual")?,
            Fslt => self.int_set(inst, "lessThan")?,
            Fsne => self.int_set(inst, "notEqual")?,
            Ddx => {
                let v = format!("dFdx({})", s!(0));
                self.assign0(inst, v)?;
            }
            Ddy => {
                let v = format!("dFdy({})", s!(0));
                self.assign0(inst, v)?;
            }
            DdxFine => {
                self.ctx.require(ShaderReq::DERIVATIVE_CONTROL);
                let v = format!("dFdxFine({})", s!(0));
                self.assign0(inst, v)?;
            }
            DdyFine => {
                self.ctx.require(ShaderReq::DERIVATIVE_CONTROL);
                let v = format!("dFdyFine({})", s!(0));
                self.assign0(inst, v)?;
            }
            Arl => {
                let v = s!(0);
                emit!(self.main, "addr{} = int(floor(({v}).x));", inst.dsts[0].index);
            }
            Arr => {
                let v = s!(0);
                emit!(self.main, "addr{} = int(round(({v}).x));", inst.dsts[0].index);
            }
            Uarl => {
                self.ctx.require(ShaderReq::INTS);
                let v = s!(0);
                emit!(self.main, "addr{} = floatBitsToInt(({v}).x);", inst.dsts[0].index);
            }
            Kill => self.main.line("discard;"),
            KillIf => {
                let v = s!(0);
                emit!(self.main, "if (any(lessThan({v}, vec4(0.0))))");
                self.main.indent();
                self.main.line("discard;");
                self.main.outdent();
            }
            Nop => {}
            Clock => {
                self.ctx.require(ShaderReq::SHADER_CLOCK | ShaderReq::INTS);
                let v = "uintBitsToFloat(clock2x32ARB().xyxy)".to_string();
                self.assign0(inst, v)?;
            }
            Membar => self.main.line("memoryBarrier();"),
            Barrier => self.main.line("barrier();"),

            // Integer / unsigned arithmetic.
            I2F => {
                self.ctx.require(ShaderReq::INTS);
                let v = format!("vec4(floatBitsToInt({}))", s!(0));
                self.assign0(inst, v)?;
            }
            U2F => {
                self.ctx.require(ShaderReq::INTS);
                let v = format!("vec4(floatBitsToUint({}))", s!(0));
                self.assign0(inst, v)?;
            }
            F2I => {
                self.ctx.require(ShaderReq::INTS);
                let v = format!("intBitsToFloat(ivec4({}))", s!(0));
                self.assign0(inst, v)?;
            }
            F2U => {
                self.ctx.require(ShaderReq::INTS);
                let v = format!("uintBitsToFloat(uvec4({}))", s!(0));
                self.assign0(inst, v)?;
            }
            Not => self.int_unary(inst, |a| format!("~{a}"))?,
            INeg => self.int_unary(inst, |a| format!("-{a}"))?,
            IAbs => self.int_unary(inst, |a| format!("abs({a})"))?,
            ISsg => self.int_unary(inst, |a| format!("sign({a})"))?,
            Brev => {
                self.ctx.require(ShaderReq::GPU_SHADER5);
                self.int_unary(inst, |a| format!("bitfieldReverse({a})"))?;
            }
            Popc => {
                self.ctx.require(ShaderReq::GPU_SHADER5);
                self.int_unary(inst, |a| format!("bitCount({a})"))?;
            }
            Lsb => {
                self.ctx.require(ShaderReq::GPU_SHADER5);
                self.int_unary(inst, |a| format!("findLSB({a})"))?;
            }
            Imsb | Umsb => {
                self.ctx.require(ShaderReq::GPU_SHADER5);
                self.int_unary(inst, |a| format!("findMSB({a})"))?;
            }
            Shl => self.int_binary(inst, "<<")?,
            IShr => self.int_binary(inst, ">>")?,
            And => self.int_binary(inst, "&")?,
            Or => self.int_binary(inst, "|")?,
            Xor => self.int_binary(inst, "^")?,
            Mod => self.int_binary(inst, "%")?,
            IDiv => self.int_binary(inst, "/")?,
            IMax => self.int_func(inst, "max")?,
            IMin => self.int_func(inst, "min")?,
            IMulHi => {
                self.ctx.require(ShaderReq::GPU_SHADER5);
                let (a, b) = (s!(0), s!(1));
                // imulExtended writes through out parameters.
                emit!(self.main, "imulExtended(floatBitsToInt({a}), floatBitsToInt({b}), mulhi_tmp, mullo_tmp);");
                self.assign0(inst, "intBitsToFloat(mulhi_tmp)".to_string())?;
            }
            UMulHi => {
                self.ctx.require(ShaderReq::GPU_SHADER5);
                let (a, b) = (s!(0), s!(1));
                emit!(self.main, "umulExtended(floatBitsToUint({a}), floatBitsToUint({b}), umulhi_tmp, umullo_tmp);");
                self.assign0(inst, "uintBitsToFloat(umulhi_tmp)".to_string())?;
            }
            ISge => self.int_cmp(inst, "greaterThanEqual", true)?,
            ISlt => self.int_cmp(inst, "lessThan", true)?,
            UAdd => self.uint_binary(inst, "+")?,
            UDiv => self.uint_binary(inst, "/")?,
            UMod => self.uint_binary(inst, "%")?,
            UMul => self.uint_binary(inst, "*")?,
            UShr => self.uint_binary(inst, ">>")?,
            UMax => self.uint_func(inst, "max")?,
            UMin => self.uint_func(inst, "min")?,
            UMad => {
                self.ctx.require(ShaderReq::INTS);
                let v = format!(
                    "uintBitsToFloat((floatBitsToUint({}) * floatBitsToUint({})) + floatBitsToUint({}))",
                    s!(0),
                    s!(1),
                    s!(2)
                );
                self.assign0(inst, v)?;
            }
            USeq => self.int_cmp(inst, "equal", false)?,
            USne => self.int_cmp(inst, "notEqual", false)?,
            USge => self.int_cmp(inst, "greaterThanEqual", false)?,
            USlt => self.int_cmp(inst, "lessThan", false)?,
            Ucmp => {
                self.ctx.require(ShaderReq::INTS);
                let v = format!(
                    "mix({}, {}, notEqual(floatBitsToUint({}), uvec4(0u)))",
                    s!(2),
                    s!(1),
                    s!(0)
                );
                self.assign0(inst, v)?;
            }
            Ibfe => {
                self.ctx.require(ShaderReq::GPU_SHADER5);
                let v = format!(
                    "intBitsToFloat(bitfieldExtract(floatBitsToInt({}), floatBitsToInt(({}).x), floatBitsToInt(({}).x)))",
                    s!(0),
                    s!(1),
                    s!(2)
                );
                self.assign0(inst, v)?;
            }
            Ubfe => {
                self.ctx.require(ShaderReq::GPU_SHADER5);
                let v = format!(
                    "uintBitsToFloat(bitfieldExtract(floatBitsToUint({}), floatBitsToInt(({}).x), floatBitsToInt(({}).x)))",
                    s!(0),
                    s!(1),
                    s!(2)
                );
                self.assign0(inst, v)?;
            }
            Bfi => {
                self.ctx.require(ShaderReq::GPU_SHADER5);
                let v = format!(
                    "uintBitsToFloat(bitfieldInsert(floatBitsToUint({}), floatBitsToUint({}), floatBitsToInt(({}).x), floatBitsToInt(({}).x)))",
                    s!(1),
                    s!(0),
                    s!(2),
                    s!(3)
                );
                self.assign0(inst, v)?;
            }
            Pk2h => {
                self.ctx.require(ShaderReq::INTS);
                let v = format!("uintBitsToFloat(uvec4(packHalf2x16(({}).xy)))", s!(0));
                self.assign0(inst, v)?;
            }
            Up2h => {
                self.ctx.require(ShaderReq::INTS);
                let v = format!(
                    "vec4(unpackHalf2x16(floatBitsToUint(({}).x)), 0.0, 0.0)",
                    s!(0)
                );
                self.assign0(inst, v)?;
            }

            // Control flow.
            If => {
                let v = s!(0);
                emit!(self.main, "if (({v}).x != 0.0) {{");
                self.main.indent();
            }
            Uif => {
                self.ctx.require(ShaderReq::INTS);
                let v = s!(0);
                emit!(self.main, "if (floatBitsToUint(({v}).x) != 0u) {{");
                self.main.indent();
            }
            Else => {
                self.main.outdent();
                self.main.line("} else {");
                self.main.indent();
            }
            EndIf | EndSwitch => {
                self.main.outdent();
                self.main.line("}");
            }
            BgnLoop => {
                self.main.line("do {");
                self.main.indent();
            }
            EndLoop => {
                self.main.outdent();
                self.main.line("} while (true);");
            }
            Brk => self.main.line("break;"),
            Cont => self.main.line("continue;"),
            Switch => {
                self.ctx.require(ShaderReq::INTS);
                let v = s!(0);
                emit!(self.main, "switch (floatBitsToInt(({v}).x)) {{");
                self.main.indent();
            }
            Case => {
                let src = &inst.srcs[0];
                if src.file != RegisterFile::Immediate {
                    return Err(unsupported("non-immediate case label"));
                }
                let label = self.imm_lane_i32(src.index, src.swizzle[0].lane())?;
                emit!(self.main, "case {label}:");
            }
            Default => self.main.line("default:"),

            Emit => {
                self.emit_vertex_exit_movs()?;
                match inst.srcs.first() {
                    Some(s) if s.file == RegisterFile::Immediate => {
                        let stream = self.imm_lane_i32(s.index, s.swizzle[0].lane())?;
                        if stream != 0 {
                            self.ctx.require(ShaderReq::GPU_SHADER5);
                            emit!(self.main, "EmitStreamVertex({stream});");
                        } else {
                            self.main.line("EmitVertex();");
                        }
                    }
                    _ => self.main.line("EmitVertex();"),
                }
            }
            EndPrim => self.main.line("EndPrimitive();"),

            End | Ret => {
                match self.ctx.prog {
                    Processor::Vertex | Processor::TessEval | Processor::TessCtrl => {
                        self.emit_vertex_exit_movs()?;
                    }
                    Processor::Fragment => self.emit_fragment_exit()?,
                    Processor::Geometry | Processor::Compute => {}
                }
                if inst.opcode == Ret {
                    self.main.line("return;");
                }
            }

            InterpCentroid | InterpSample | InterpOffset => self.translate_interp(inst)?,

            Txq | Txqs => self.translate_txq(inst)?,

            Load | Store | Resq | AtomUAdd | AtomXchg | AtomCas | AtomAnd | AtomOr | AtomXor
            | AtomUMin | AtomUMax | AtomIMin | AtomIMax => self.translate_mem(inst)?,

            FbFetch => {
                self.ctx.require(ShaderReq::FBFETCH);
                self.assign0(inst, "fsout_c0".to_string())?;
            }

            other => {
                return Err(unsupported(format!(
                    "opcode {other:?} ({})",
                    other.raw()
                )));
            }
        }
        Ok(())
    }

    fn int_unary(
        &mut self,
        inst: &FullInstruction,
        f: impl Fn(String) -> String,
    ) -> Result<(), TranslateError> {
        self.ctx.require(ShaderReq::INTS);
        let a = self.src_expr(&inst.srcs[0])?;
        let v = format!("intBitsToFloat({})", f(format!("floatBitsToInt({a})")));
        self.assign0(inst, v)
    }

    fn int_binary(&mut self, inst: &FullInstruction, op: &str) -> Result<(), TranslateError> {
        self.ctx.require(ShaderReq::INTS);
        let a = self.src_expr(&inst.srcs[0])?;
        let b = self.src_expr(&inst.srcs[1])?;
        let v = format!("intBitsToFloat(floatBitsToInt({a}) {op} floatBitsToInt({b}))");
        self.assign0(inst, v)
    }

    fn int_func(&mut self, inst: &FullInstruction, f: &str) -> Result<(), TranslateError> {
        self.ctx.require(ShaderReq::INTS);
        let a = self.src_expr(&inst.srcs[0])?;
        let b = self.src_expr(&inst.srcs[1])?;
        let v = format!("intBitsToFloat({f}(floatBitsToInt({a}), floatBitsToInt({b})))");
        self.assign0(inst, v)
    }

    fn uint_binary(&mut self, inst: &FullInstruction, op: &str) -> Result<(), TranslateError> {
        self.ctx.require(ShaderReq::INTS);
        let a = self.src_expr(&inst.srcs[0])?;
        let b = self.src_expr(&inst.srcs[1])?;
        let v = format!("uintBitsToFloat(floatBitsToUint({a}) {op} floatBitsToUint({b}))");
        self.assign0(inst, v)
    }

    fn uint_func(&mut self, inst: &FullInstruction, f: &str) -> Result<(), TranslateError> {
        self.ctx.require(ShaderReq::INTS);
        let a = self.src_expr(&inst.srcs[0])?;
        let b = self.src_expr(&inst.srcs[1])?;
        let v = format!("uintBitsToFloat({f}(floatBitsToUint({a}), floatBitsToUint({b})))");
        self.assign0(inst, v)
    }

    /// Integer set-on-compare over reinterpreted lanes: true lanes become
    /// the all-ones bit pattern.
    fn int_cmp(
        &mut self,
        inst: &FullInstruction,
        f: &str,
        signed: bool,
    ) -> Result<(), TranslateError> {
        self.ctx.require(ShaderReq::INTS);
        let a = self.src_expr(&inst.srcs[0])?;
        let b = self.src_expr(&inst.srcs[1])?;
        let cast = if signed {
            "floatBitsToInt"
        } else {
            "floatBitsToUint"
        };
        let v = format!(
            "uintBitsToFloat(uvec4({f}({cast}({a}), {cast}({b}))) * 0xffffffffu)"
        );
        self.assign0(inst, v)
    }

    /// Float compare producing an integer all-ones mask (FSEQ family).
    fn int_set(&mut self, inst: &FullInstruction, f: &str) -> Result<(), TranslateError> {
        self.ctx.require(ShaderReq::INTS);
        let a = self.src_expr(&inst.srcs[0])?;
        let b = self.src_expr(&inst.srcs[1])?;
        let v = format!("uintBitsToFloat(uvec4({f}({a}, {b})) * 0xffffffffu)");
        self.assign0(inst, v)
    }

    fn translate_interp(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        self.ctx.require(ShaderReq::GPU_SHADER5);
        let src = &inst.srcs[0];
        if src.file != RegisterFile::Input {
            return Err(unsupported("interpolation of a non-input operand"));
        }
        let slot = self
            .ctx
            .find_input(src.index as u32)
            .cloned()
            .ok_or_else(|| unsupported(format!("undeclared input {}", src.index)))?;
        let name = &slot.glsl_name;
        let call = match inst.opcode {
            Opcode::InterpCentroid => format!("interpolateAtCentroid({name})"),
            Opcode::InterpSample => {
                self.ctx.require(ShaderReq::SAMPLE_SHADING);
                let at = self.src_expr(&inst.srcs[1])?;
                format!("interpolateAtSample({name}, floatBitsToInt(({at}).x))")
            }
            Opcode::InterpOffset => {
                let off = self.src_expr(&inst.srcs[1])?;
                format!("interpolateAtOffset({name}, ({off}).xy)")
            }
            _ => unreachable!(),
        };
        let chars: String = src.swizzle.iter().map(|s| SWIZZLE_CHARS[s.lane()]).collect();
        self.assign0(inst, format!("({call}).{chars}"))
    }

    // ---- textures ------------------------------------------------------

    fn sampler_ref(&mut self, src: &SrcOperand) -> Result<(String, u32), TranslateError> {
        let unit = src.index as u32;
        if let Some(arr) = self.ctx.sampler_array_for(unit).copied() {
            let idx = self.index_expr(src.index, arr.first, src.indirect.as_ref())?;
            return Ok((format!("{}samp{}[{idx}]", self.sp(), arr.first), arr.first));
        }
        if src.indirect.is_some() {
            return Err(unsupported("indirect sampler outside a coalesced array"));
        }
        Ok((format!("{}samp{unit}", self.sp()), unit))
    }

    fn tex_offset_arg(
        &mut self,
        off: &TexOffset,
        dims: usize,
    ) -> Result<String, TranslateError> {
        let comps = match off.file {
            RegisterFile::Immediate => {
                let vals: Vec<String> = (0..dims)
                    .map(|l| {
                        self.imm_lane_i32(off.index, off.swizzle[l].lane())
                            .map(|v| v.to_string())
                    })
                    .collect::<Result<_, _>>()?;
                vals.join(", ")
            }
            RegisterFile::Temporary => {
                let base = self.temp_ref(off.index as u32, None)?;
                (0..dims)
                    .map(|l| {
                        format!(
                            "floatBitsToInt({base}.{})",
                            SWIZZLE_CHARS[off.swizzle[l].lane()]
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            }
            other => {
                return Err(unsupported(format!(
                    "texture offset from {} file",
                    other.name()
                )));
            }
        };
        if dims == 1 {
            Ok(format!("int({comps})"))
        } else {
            Ok(format!("ivec{dims}({comps})"))
        }
    }

    fn translate_tex(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        use Opcode::*;
        let tex = inst
            .texture
            .as_ref()
            .ok_or_else(|| unsupported("texture opcode without texture info"))?;
        let target = tex.target;

        let sampler_src = inst
            .srcs
            .iter()
            .rev()
            .find(|s| s.file == RegisterFile::Sampler)
            .cloned()
            .ok_or_else(|| unsupported("texture opcode without a sampler operand"))?;
        let (samp, unit) = self.sampler_ref(&sampler_src)?;
        let slot = self.ctx.samplers[unit as usize]
            .ok_or_else(|| unsupported(format!("undeclared sampler {unit}")))?;

        match inst.opcode {
            Tg4 => self.ctx.require(ShaderReq::TG4),
            Lodq => self.ctx.require(ShaderReq::LODQ),
            Txf => self.ctx.require(ShaderReq::INTS),
            _ => {}
        }
        if target.is_rect() && !self.ctx.cfg.use_gles {
            self.ctx.require(ShaderReq::SAMPLER_RECT);
        }

        let coord = self.src_expr(&inst.srcs[0])?;
        let dims = target.coord_components() as usize;
        let offset = match tex.offsets.first() {
            Some(off) if !matches!(target, TextureTarget::Cube | TextureTarget::ShadowCube) => {
                Some(self.tex_offset_arg(&off.clone(), dims.min(3))?)
            }
            _ => None,
        };

        // Rectangle targets on GLES sample a plain 2D texture with
        // manually normalized coordinates.
        let coord2 = if target.is_rect() && self.ctx.cfg.use_gles {
            format!("(({coord}).xy / vec2(textureSize({samp}, 0)))")
        } else {
            tex_coord_arg(target, &coord)
        };

        let call = match inst.opcode {
            Tex => match offset {
                Some(ref off) => format!("textureOffset({samp}, {coord2}, {off})"),
                None => format!("texture({samp}, {coord2})"),
            },
            Txp => {
                if matches!(
                    target,
                    TextureTarget::Tex1D
                        | TextureTarget::Tex2D
                        | TextureTarget::Tex3D
                        | TextureTarget::Rect
                        | TextureTarget::Shadow1D
                        | TextureTarget::Shadow2D
                        | TextureTarget::ShadowRect
                ) {
                    format!("textureProj({samp}, {coord})")
                } else {
                    // Projection is undefined for these targets; sample
                    // unprojected like the reference renderer.
                    format!("texture({samp}, {coord2})")
                }
            }
            Txb => format!("texture({samp}, {coord2}, ({coord}).w)"),
            Txl => format!("textureLod({samp}, {coord2}, ({coord}).w)"),
            Txb2 => {
                let b = self.src_expr(&inst.srcs[1])?;
                format!("texture({samp}, {coord2}, ({b}).x)")
            }
            Txl2 => {
                let l = self.src_expr(&inst.srcs[1])?;
                format!("textureLod({samp}, {coord2}, ({l}).x)")
            }
            Txd => {
                let dx = self.src_expr(&inst.srcs[1])?;
                let dy = self.src_expr(&inst.srcs[2])?;
                let g = grad_dims(target);
                format!(
                    "textureGrad({samp}, {coord2}, ({dx}).{g}, ({dy}).{g})"
                )
            }
            Txf => {
                let ic = format!("floatBitsToInt({coord})");
                if target.is_msaa() {
                    self.ctx.require(ShaderReq::SAMPLER_MS);
                    let fetch_dims = if target == TextureTarget::Tex2DMsaa { 2 } else { 3 };
                    format!(
                        "texelFetch({samp}, ivec{fetch_dims}(({ic}).{}), floatBitsToInt(({coord}).w))",
                        &"xyz"[..fetch_dims]
                    )
                } else if target == TextureTarget::Buffer {
                    format!("texelFetch({samp}, ({ic}).x)")
                } else if target.is_rect() {
                    // Rectangle fetches take no level argument.
                    format!("texelFetch({samp}, ({ic}).xy)")
                } else {
                    let f = fetch_shape(target);
                    match offset {
                        Some(ref off) => format!(
                            "texelFetchOffset({samp}, ({ic}).{f}, ({ic}).w, {off})"
                        ),
                        None => format!("texelFetch({samp}, ({ic}).{f}, ({ic}).w)"),
                    }
                }
            }
            Tex2 => {
                // Shadow cube arrays carry the comparison in the second
                // operand.
                let cmp = self.src_expr(&inst.srcs[1])?;
                format!("texture({samp}, {coord}, ({cmp}).x)")
            }
            Tg4 => match offset {
                Some(ref off) => format!("textureGatherOffset({samp}, {coord2}, {off})"),
                None => format!("textureGather({samp}, {coord2})"),
            },
            Lodq => format!("vec4(textureQueryLod({samp}, {coord2}), 0.0, 0.0)"),
            _ => return Err(unsupported(format!("texture opcode {:?}", inst.opcode))),
        };

        let mut value = match slot.return_type {
            ReturnType::Sint => {
                self.ctx.require(ShaderReq::INTS);
                format!("intBitsToFloat(ivec4({call}))")
            }
            ReturnType::Uint => {
                self.ctx.require(ShaderReq::INTS);
                format!("uintBitsToFloat(uvec4({call}))")
            }
            _ => format!("vec4({call})"),
        };
        if slot.shadow {
            if !self.shadow_units.contains(&unit) {
                self.shadow_units.push(unit);
            }
            let sp = self.sp();
            value = format!("(vec4({call}) * {sp}shadmask{unit} + {sp}shadadd{unit})");
        }
        self.assign0(inst, value)
    }

    /// TXQ/TXQS/RESQ-adjacent queries that consume a sampler.
    fn translate_txq(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        let sampler_src = inst
            .srcs
            .iter()
            .rev()
            .find(|s| s.file == RegisterFile::Sampler)
            .cloned()
            .ok_or_else(|| unsupported("query opcode without a sampler operand"))?;
        let (samp, unit) = self.sampler_ref(&sampler_src)?;
        let slot = self.ctx.samplers[unit as usize]
            .ok_or_else(|| unsupported(format!("undeclared sampler {unit}")))?;
        self.ctx.require(ShaderReq::INTS);
        match inst.opcode {
            Opcode::Txq => {
                let mask = inst.dsts[0].write_mask;
                if mask & 0x8 != 0 {
                    self.ctx.require(ShaderReq::TXQ_LEVELS);
                    let dst = self.dst_ref(&inst.dsts[0])?;
                    if let DstRef::Plain { lhs, .. } = &dst {
                        emit!(
                            self.main,
                            "{lhs}.w = intBitsToFloat(textureQueryLevels({samp}));"
                        );
                    }
                }
                if mask & 0x7 != 0 {
                    let call = if matches!(
                        slot.target,
                        TextureTarget::Buffer | TextureTarget::Rect | TextureTarget::ShadowRect
                    ) || slot.target.is_msaa()
                    {
                        format!("textureSize({samp})")
                    } else {
                        let lod = self.src_expr(&inst.srcs[0])?;
                        format!("textureSize({samp}, floatBitsToInt(({lod}).x))")
                    };
                    let pad = match size_components(slot.target) {
                        1 => ", 0, 0, 0",
                        2 => ", 0, 0",
                        _ => ", 0",
                    };
                    let v = format!("intBitsToFloat(ivec4({call}{pad}))");
                    let dst = self.dst_ref(&inst.dsts[0])?;
                    let masked = DstRef::Plain {
                        lhs: match dst {
                            DstRef::Plain { lhs, .. } => lhs,
                            DstRef::ClipDist { .. } => {
                                return Err(unsupported("size query into clip distance"))
                            }
                        },
                        mask: mask & 0x7,
                        no_wm: false,
                    };
                    self.emit_assign(&masked, &v);
                }
                Ok(())
            }
            Opcode::Txqs => {
                self.ctx.require(ShaderReq::TXQS);
                let v = format!("intBitsToFloat(ivec4(textureSamples({samp})))");
                self.assign0(inst, v)
            }
            other => Err(unsupported(format!("query opcode {other:?}"))),
        }
    }

    // ---- memory --------------------------------------------------------

    fn image_ref(
        &mut self,
        file_index: i32,
        indirect: Option<&IndirectAddr>,
    ) -> Result<(String, u32, Option<(u32, u32)>), TranslateError> {
        let unit = file_index as u32;
        if let Some(arr) = self.ctx.image_array_for(unit).copied() {
            // Dynamic indexing of image arrays is lowered to a switch; the
            // caller receives the array bounds.
            let name = format!("{}img{}", self.sp(), arr.first);
            return Ok((name, arr.first, Some((arr.first, arr.array_size))));
        }
        if indirect.is_some() {
            return Err(unsupported("indirect image outside a coalesced array"));
        }
        Ok((format!("{}img{unit}", self.sp()), unit, None))
    }

    fn image_coord(&self, target: TextureTarget, addr: &str) -> String {
        let ic = format!("floatBitsToInt({addr})");
        match target {
            TextureTarget::Buffer | TextureTarget::Tex1D => format!("({ic}).x"),
            TextureTarget::Tex2D
            | TextureTarget::Rect
            | TextureTarget::Tex1DArray
            | TextureTarget::Tex2DMsaa => format!("({ic}).xy"),
            _ => format!("({ic}).xyz"),
        }
    }

    fn image_value_cast(&self, class: FormatClass, value: &str) -> String {
        match class {
            FormatClass::Float => format!("({value})"),
            FormatClass::Sint => format!("floatBitsToInt({value})"),
            FormatClass::Uint => format!("floatBitsToUint({value})"),
        }
    }

    fn image_result_cast(&self, class: FormatClass, call: &str) -> String {
        match class {
            FormatClass::Float => format!("vec4({call})"),
            FormatClass::Sint => format!("intBitsToFloat(ivec4({call}))"),
            FormatClass::Uint => format!("uintBitsToFloat(uvec4({call}))"),
        }
    }

    fn translate_mem(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        use Opcode::*;
        match inst.opcode {
            Load => {
                let res = &inst.srcs[0];
                match res.file {
                    RegisterFile::Buffer | RegisterFile::Memory => self.mem_load(inst),
                    RegisterFile::Image => self.image_load(inst),
                    RegisterFile::HwAtomic => {
                        let name = self.hw_atomic_ref(res)?;
                        let v = format!("uintBitsToFloat(uvec4(atomicCounter({name})))");
                        self.assign0(inst, v)
                    }
                    other => Err(unsupported(format!("LOAD from {} file", other.name()))),
                }
            }
            Store => {
                let res = &inst.dsts[0];
                match res.file {
                    RegisterFile::Buffer | RegisterFile::Memory => self.mem_store(inst),
                    RegisterFile::Image => self.image_store(inst),
                    other => Err(unsupported(format!("STORE to {} file", other.name()))),
                }
            }
            Resq => {
                let res = &inst.srcs[0];
                match res.file {
                    RegisterFile::Buffer => {
                        let name = self.ssbo_contents_name(res.index as u32);
                        let v = format!(
                            "intBitsToFloat(ivec4(int(uint({name}.length()) << 2u)))"
                        );
                        self.assign0(inst, v)
                    }
                    RegisterFile::Image => {
                        self.ctx.require(ShaderReq::IMAGE_SIZE | ShaderReq::INTS);
                        let (img, _, arr) = self.image_ref(res.index, res.indirect.as_ref())?;
                        if arr.is_some() && res.indirect.is_some() {
                            return Err(unsupported("size query of an indirect image"));
                        }
                        let v = format!("intBitsToFloat(ivec4(imageSize({img}), 0, 0))");
                        self.assign0(inst, v)
                    }
                    other => Err(unsupported(format!("RESQ on {} file", other.name()))),
                }
            }
            _ => self.translate_atomic(inst),
        }
    }

    fn ssbo_contents_name(&self, binding: u32) -> String {
        format!("{}ssbocontents{binding}", self.sp())
    }

    fn mem_words_name(&self, res: &SrcOperand) -> Result<String, TranslateError> {
        match res.file {
            RegisterFile::Buffer => Ok(self.ssbo_contents_name(res.index as u32)),
            RegisterFile::Memory => Ok("values".to_string()),
            other => Err(unsupported(format!("memory access to {} file", other.name()))),
        }
    }

    fn mem_load(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        let name = self.mem_words_name(&inst.srcs[0])?;
        let addr = self.src_expr(&inst.srcs[1])?;
        emit!(
            self.main,
            "mem_addr_tmp = floatBitsToUint(({addr}).x) >> 2u;"
        );
        let lanes: Vec<String> = (0..4)
            .map(|l| {
                if l == 0 {
                    format!("{name}[mem_addr_tmp]")
                } else {
                    format!("{name}[mem_addr_tmp + {l}u]")
                }
            })
            .collect();
        let v = format!("uintBitsToFloat(uvec4({}))", lanes.join(", "));
        self.assign0(inst, v)
    }

    fn mem_store(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        let dst = &inst.dsts[0];
        let name = match dst.file {
            RegisterFile::Buffer => self.ssbo_contents_name(dst.index as u32),
            RegisterFile::Memory => "values".to_string(),
            other => return Err(unsupported(format!("STORE to {} file", other.name()))),
        };
        let addr = self.src_expr(&inst.srcs[0])?;
        let value = self.src_expr(&inst.srcs[1])?;
        emit!(
            self.main,
            "mem_addr_tmp = floatBitsToUint(({addr}).x) >> 2u;"
        );
        for l in 0..4u8 {
            if dst.write_mask & (1 << l) != 0 {
                let off = if l == 0 {
                    String::new()
                } else {
                    format!(" + {l}u")
                };
                emit!(
                    self.main,
                    "{name}[mem_addr_tmp{off}] = floatBitsToUint(({value}).{});",
                    SWIZZLE_CHARS[l as usize]
                );
            }
        }
        Ok(())
    }

    fn image_slot_for(&self, unit: u32) -> Result<crate::context::ImageSlot, TranslateError> {
        self.ctx.images[unit as usize]
            .ok_or_else(|| unsupported(format!("undeclared image {unit}")))
    }

    /// Emits `body(element)` once for a direct reference, or inside a
    /// per-element `switch` when the image is indirectly indexed.
    fn for_image_element(
        &mut self,
        res_index: i32,
        indirect: Option<&IndirectAddr>,
        body: impl Fn(&mut Self, &str) -> Result<(), TranslateError>,
    ) -> Result<(), TranslateError> {
        let (name, first, arr) = self.image_ref(res_index, indirect)?;
        match (arr, indirect) {
            (Some((arr_first, size)), Some(ind)) => {
                let idx = self.index_expr(res_index, arr_first, Some(ind))?;
                emit!(self.main, "switch ({idx}) {{");
                self.main.indent();
                for e in 0..size {
                    emit!(self.main, "case {e}:");
                    self.main.indent();
                    body(self, &format!("{name}[{e}]"))?;
                    self.main.line("break;");
                    self.main.outdent();
                }
                self.main.outdent();
                self.main.line("}");
                Ok(())
            }
            (Some((arr_first, _)), None) => {
                let e = res_index as u32 - arr_first;
                body(self, &format!("{name}[{e}]"))
            }
            (None, _) => {
                let _ = first;
                body(self, &name)
            }
        }
    }

    fn image_load(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        self.ctx.require(ShaderReq::IMAGE_LOAD_STORE | ShaderReq::INTS);
        let res = inst.srcs[0].clone();
        let unit = res.index as u32;
        let slot = self.image_slot_for(unit)?;
        let class = formats::lookup(slot.format)
            .map(|f| f.class)
            .unwrap_or(FormatClass::Float);
        let addr = self.src_expr(&inst.srcs[1])?;
        let coord = self.image_coord(slot.target, &addr);
        let dst = self.dst_ref(&inst.dsts[0])?;
        let result_cast = |g: &Self, call: &str| g.image_result_cast(class, call);
        self.for_image_element(res.index, res.indirect.as_ref(), |g, img| {
            let call = if slot.target.is_msaa() {
                format!(
                    "imageLoad({img}, {coord}, floatBitsToInt(({addr}).w))"
                )
            } else {
                format!("imageLoad({img}, {coord})")
            };
            let v = result_cast(g, &call);
            g.emit_assign(&dst, &v);
            Ok(())
        })
    }

    fn image_store(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        self.ctx.require(ShaderReq::IMAGE_LOAD_STORE | ShaderReq::INTS);
        let res = inst.dsts[0].clone();
        let unit = res.index as u32;
        let slot = self.image_slot_for(unit)?;
        let class = formats::lookup(slot.format)
            .map(|f| f.class)
            .unwrap_or(FormatClass::Float);
        let addr = self.src_expr(&inst.srcs[0])?;
        let value = self.src_expr(&inst.srcs[1])?;
        let coord = self.image_coord(slot.target, &addr);
        let value = self.image_value_cast(class, &value);
        self.for_image_element(res.index, res.indirect.as_ref(), |g, img| {
            emit!(g.main, "imageStore({img}, {coord}, {value});");
            Ok(())
        })
    }

    fn hw_atomic_ref(&mut self, res: &SrcOperand) -> Result<String, TranslateError> {
        let range = self
            .ctx
            .hw_atomics
            .iter()
            .find(|r| r.first <= res.index as u32 && res.index as u32 <= r.last)
            .copied()
            .ok_or_else(|| {
                unsupported(format!("undeclared atomic counter {}", res.index))
            })?;
        if range.first == range.last {
            Ok(format!("ac{}", range.first))
        } else {
            let idx = self.index_expr(res.index, range.first, res.indirect.as_ref())?;
            Ok(format!("ac{}_arr[{idx}]", range.first))
        }
    }

    fn translate_atomic(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        use Opcode::*;
        let res = inst.srcs[0].clone();

        if res.file == RegisterFile::HwAtomic {
            // Counters only support the increment/decrement forms.
            let name = self.hw_atomic_ref(&res)?;
            let val = &inst.srcs[2];
            if inst.opcode == AtomUAdd && val.file == RegisterFile::Immediate {
                let v = self.imm_lane_i32(val.index, val.swizzle[0].lane())?;
                let call = match v {
                    1 => format!("atomicCounterIncrement({name})"),
                    -1 => format!("atomicCounterDecrement({name})"),
                    _ => return Err(unsupported("atomic counter add of a non-unit value")),
                };
                return self.assign0(inst, format!("uintBitsToFloat(uvec4({call}))"));
            }
            return Err(unsupported(format!(
                "atomic opcode {:?} on a counter",
                inst.opcode
            )));
        }

        let (func, signed, extra_cas) = match inst.opcode {
            AtomUAdd => ("atomicAdd", false, false),
            AtomXchg => ("atomicExchange", false, false),
            AtomCas => ("atomicCompSwap", false, true),
            AtomAnd => ("atomicAnd", false, false),
            AtomOr => ("atomicOr", false, false),
            AtomXor => ("atomicXor", false, false),
            AtomUMin => ("atomicMin", false, false),
            AtomUMax => ("atomicMax", false, false),
            AtomIMin => ("atomicMin", true, false),
            AtomIMax => ("atomicMax", true, false),
            other => return Err(unsupported(format!("atomic opcode {other:?}"))),
        };
        let cast = if signed {
            "floatBitsToInt"
        } else {
            "floatBitsToUint"
        };
        let back = if signed {
            "intBitsToFloat(ivec4"
        } else {
            "uintBitsToFloat(uvec4"
        };
        let addr = self.src_expr(&inst.srcs[1])?;
        let value = self.src_expr(&inst.srcs[2])?;
        let cas_arg = if extra_cas {
            let v2 = self.src_expr(&inst.srcs[3])?;
            format!(", {cast}(({v2}).x)")
        } else {
            String::new()
        };

        match res.file {
            RegisterFile::Buffer | RegisterFile::Memory => {
                let name = self.mem_words_name(&res)?;
                emit!(
                    self.main,
                    "mem_addr_tmp = floatBitsToUint(({addr}).x) >> 2u;"
                );
                let call = format!(
                    "{func}({name}[mem_addr_tmp], {cast}(({value}).x){cas_arg})"
                );
                self.assign0(inst, format!("{back}({call}))"))
            }
            RegisterFile::Image => {
                self.ctx.require(ShaderReq::IMAGE_ATOMIC | ShaderReq::INTS);
                let unit = res.index as u32;
                let slot = self.image_slot_for(unit)?;
                let coord = self.image_coord(slot.target, &addr);
                let ifunc = format!("image{}", &func[1..]); // atomicAdd -> imageAtomicAdd
                let dst = self.dst_ref(&inst.dsts[0])?;
                self.for_image_element(res.index, res.indirect.as_ref(), |g, img| {
                    let call =
                        format!("{ifunc}({img}, {coord}, {cast}(({value}).x){cas_arg})");
                    let v = format!("{back}({call}))");
                    g.emit_assign(&dst, &v);
                    Ok(())
                })
            }
            other => Err(unsupported(format!("atomic on {} file", other.name()))),
        }
    }

    // ---- doubles -------------------------------------------------------

    /// Double operand for lane pair `p`: the two source lanes selected by
    /// the swizzle are packed into one `double`.
    fn dsrc(&mut self, src: &SrcOperand, p: usize) -> Result<String, TranslateError> {
        if src.file == RegisterFile::Immediate {
            let imm = self
                .ctx
                .immediates
                .get(src.index as usize)
                .ok_or_else(|| unsupported(format!("undeclared immediate {}", src.index)))?;
            if imm.data_type == ImmediateType::Float64 {
                let v = imm.as_f64(src.swizzle[2 * p].lane() / 2);
                return Ok(apply_modifiers(
                    format!("{}lf", format_f64(v)),
                    true,
                    src.absolute,
                    src.negate,
                ));
            }
        }
        let mut bare = *src;
        bare.absolute = false;
        bare.negate = false;
        bare.swizzle = [
            virgl_tgsi::token::Swizzle::X,
            virgl_tgsi::token::Swizzle::Y,
            virgl_tgsi::token::Swizzle::Z,
            virgl_tgsi::token::Swizzle::W,
        ];
        let base = self.src_expr(&bare)?;
        let c0 = SWIZZLE_CHARS[src.swizzle[2 * p].lane()];
        let c1 = SWIZZLE_CHARS[src.swizzle[2 * p + 1].lane()];
        let expr = format!("packDouble2x32(floatBitsToUint({base}).{c0}{c1})");
        Ok(apply_modifiers(expr, true, src.absolute, src.negate))
    }

    fn translate_double(&mut self, inst: &FullInstruction) -> Result<(), TranslateError> {
        use Opcode::*;
        self.ctx.require(ShaderReq::FP64);
        let mask = inst.dsts[0].write_mask;
        let dst = self.dst_ref(&inst.dsts[0])?;
        let lhs = match &dst {
            DstRef::Plain { lhs, .. } => lhs.clone(),
            DstRef::ClipDist { .. } => {
                return Err(unsupported("double write into clip distance"));
            }
        };

        // Pairs: xy = pair 0, zw = pair 1.
        for p in 0..2usize {
            let pair_mask = 0x3 << (2 * p);
            if mask & pair_mask == 0 {
                continue;
            }
            let d = |g: &mut Self, i: usize| g.dsrc(&inst.srcs[i], p);
            let value: String = match inst.opcode {
                F2D => {
                    let s = self.src_expr(&inst.srcs[0])?;
                    format!("double(({s}).{})", SWIZZLE_CHARS[p])
                }
                I2D => {
                    let s = self.src_expr(&inst.srcs[0])?;
                    format!("double(floatBitsToInt({s}).{})", SWIZZLE_CHARS[p])
                }
                U2D => {
                    let s = self.src_expr(&inst.srcs[0])?;
                    format!("double(floatBitsToUint({s}).{})", SWIZZLE_CHARS[p])
                }
                DAbs => format!("abs({})", d(self, 0)?),
                DNeg => format!("-{}", d(self, 0)?),
                DSqrt => format!("sqrt({})", d(self, 0)?),
                DRsq => format!("inversesqrt(abs({}))", d(self, 0)?),
                DRcp => format!("(1.0lf / {})", d(self, 0)?),
                DFrac => format!("fract({})", d(self, 0)?),
                DTrunc => format!("trunc({})", d(self, 0)?),
                DCeil => format!("ceil({})", d(self, 0)?),
                DFlr => format!("floor({})", d(self, 0)?),
                DRound => format!("round({})", d(self, 0)?),
                DSsg => format!("sign({})", d(self, 0)?),
                DAdd => format!("({} + {})", d(self, 0)?, d(self, 1)?),
                DMul => format!("({} * {})", d(self, 0)?, d(self, 1)?),
                DDiv => format!("({} / {})", d(self, 0)?, d(self, 1)?),
                DMax => format!("max({}, {})", d(self, 0)?, d(self, 1)?),
                DMin => format!("min({}, {})", d(self, 0)?, d(self, 1)?),
                DMad | Dfma => format!(
                    "fma({}, {}, {})",
                    d(self, 0)?,
                    d(self, 1)?,
                    d(self, 2)?
                ),
                DLdExp => {
                    let e = self.src_expr(&inst.srcs[1])?;
                    format!(
                        "ldexp({}, floatBitsToInt(({e}).{}))",
                        d(self, 0)?,
                        SWIZZLE_CHARS[2 * p]
                    )
                }
                D2F | D2I | D2U | DSlt | DSge | DSeq | DSne => {
                    // Single-lane results handled below.
                    String::new()
                }
                other => {
                    return Err(unsupported(format!("double opcode {other:?}")));
                }
            };

            match inst.opcode {
                D2F | D2I | D2U => {
                    let d0 = self.dsrc(&inst.srcs[0], p)?;
                    let conv = match inst.opcode {
                        D2F => format!("float({d0})"),
                        D2I => format!("intBitsToFloat(int({d0}))"),
                        _ => format!("uintBitsToFloat(uint({d0}))"),
                    };
                    // One float lane per source pair.
                    if mask & (1 << p) != 0 {
                        emit!(self.main, "{lhs}.{} = {conv};", SWIZZLE_CHARS[p]);
                    }
                }
                DSlt | DSge | DSeq | DSne => {
                    let a = self.dsrc(&inst.srcs[0], p)?;
                    let b = self.dsrc(&inst.srcs[1], p)?;
                    let op = match inst.opcode {
                        DSlt => "<",
                        DSge => ">=",
                        DSeq => "==",
                        _ => "!=",
                    };
                    let cmp = format!(
                        "uintBitsToFloat(({a} {op} {b}) ? 0xffffffffu : 0u)"
                    );
                    for l in 0..2usize {
                        let lane = 2 * p + l;
                        if mask & (1 << lane) != 0 {
                            emit!(self.main, "{lhs}.{} = {cmp};", SWIZZLE_CHARS[lane]);
                        }
                    }
                }
                _ => {
                    let pair = if p == 0 { "xy" } else { "zw" };
                    emit!(
                        self.main,
                        "{lhs}.{pair} = uintBitsToFloat(unpackDouble2x32({value}));"
                    );
                }
            }
        }
        Ok(())
    }

    // ---- exit paths ----------------------------------------------------

    /// Stream-output staging, clip-distance finalization, user clip
    /// planes, and the winsys correction, in that order.
    pub fn emit_vertex_exit_movs(&mut self) -> Result<(), TranslateError> {
        for d in self.ctx.so_decisions.clone() {
            if !d.need_temp {
                continue;
            }
            let slot = self
                .ctx
                .find_output(d.entry.register_index)
                .cloned()
                .ok_or_else(|| unsupported("stream output lost its slot"))?;
            let comps: Vec<String> = (0..d.entry.num_components)
                .map(|c| {
                    let lane = d.entry.start_component + c;
                    if matches!(slot.name, Semantic::ClipDist | Semantic::CullDist) {
                        let base = 4 * (d.entry.register_index - slot.first);
                        format!("clip_dist_temp[{}]", base + lane)
                    } else {
                        format!("{}.{}", slot.glsl_name, SWIZZLE_CHARS[lane as usize])
                    }
                })
                .collect();
            if comps.len() == 1 {
                emit!(self.main, "{} = {};", d.glsl_name, comps[0]);
            } else {
                emit!(
                    self.main,
                    "{} = vec{}({});",
                    d.glsl_name,
                    comps.len(),
                    comps.join(", ")
                );
            }
        }

        // Tess-control clip outputs stay per-vertex and are not finalized
        // here.
        if self.ctx.prog != Processor::TessCtrl {
            let num_clip = self.ctx.num_clip_dist_out.min(8);
            let num_cull = self
                .ctx
                .num_cull_dist_out
                .min(8u32.saturating_sub(num_clip));
            let enabled = self
                .ctx
                .scan
                .property(Property::NumClipDistEnabled)
                .unwrap_or(num_clip);
            for i in 0..num_clip.min(enabled) {
                emit!(
                    self.main,
                    "gl_ClipDistance[{i}] = clip_dist_temp[{i}];"
                );
            }
            for i in 0..num_cull {
                emit!(
                    self.main,
                    "gl_CullDistance[{i}] = clip_dist_temp[{}];",
                    num_clip + i
                );
            }
        }

        // User clip planes: distances from the clip vertex when the guest
        // wrote one, else from the position.
        if self.ctx.key.clip_plane_enable != 0 && self.ctx.prog == Processor::Vertex {
            let wrote_clipv = self
                .ctx
                .outputs
                .iter()
                .any(|s| s.name == Semantic::ClipVertex);
            let src = if wrote_clipv { "clipv_tmp" } else { "gl_Position" };
            let mut n = 0;
            for plane in 0..crate::limits::MAX_CLIP_PLANES as u32 {
                if self.ctx.key.clip_plane_enable & (1 << plane) != 0 {
                    emit!(
                        self.main,
                        "gl_ClipDistance[{n}] = dot({src}, clipp[{plane}]);"
                    );
                    n += 1;
                }
            }
            self.ctx.require(ShaderReq::CLIP_DISTANCE);
        }

        if self.ctx.key.winsys_adjust_y_emitted && self.is_terminal_vertex_stage() {
            self.main
                .line("gl_Position.y = gl_Position.y * winsys_adjust_y;");
        }
        Ok(())
    }

    fn is_terminal_vertex_stage(&self) -> bool {
        crate::decls::is_terminal_vertex_stage(self.ctx)
    }

    /// Name holding the guest's color result for attachment `sid`. Only
    /// differs from the attachment output under logic-op emulation.
    fn fs_shader_color(&self, sid: u32) -> String {
        if self.ctx.key.logicop_emulated().is_some() {
            format!("fsout_tmp_c{sid}")
        } else {
            format!("fsout_c{sid}")
        }
    }

    fn emit_fragment_exit(&mut self) -> Result<(), TranslateError> {
        if let Some((func, _ref_val)) = self.ctx.key.alpha_test {
            let c0 = self.fs_shader_color(0);
            match func {
                CompareFunc::Never => self.main.line("discard;"),
                CompareFunc::Always => {}
                _ => {
                    let op = func.glsl_op().unwrap_or("<");
                    emit!(self.main, "if (!({c0}.w {op} alpha_ref_val)) discard;");
                }
            }
        }

        let written: Vec<u32> = self
            .ctx
            .outputs
            .iter()
            .filter(|s| s.name == Semantic::Color)
            .map(|s| s.sid)
            .collect();

        if let Some(op) = self.ctx.key.logicop_emulated() {
            for &sid in &written {
                self.emit_logicop(op, sid);
            }
        }

        if self.ctx.key.fs_swizzle_output_rgb_to_bgr {
            for sid in &written {
                emit!(self.main, "fsout_c{sid} = fsout_c{sid}.zyxw;");
            }
        }
        for sid in &written {
            if self.ctx.key.cbufs_are_a8_bitmask & (1 << sid) != 0 {
                emit!(self.main, "fsout_c{sid}.x = fsout_c{sid}.w;");
            }
        }
        if self.ctx.key.fs_color0_writes_all_cbufs && written.contains(&0) {
            for i in 1..self.ctx.cfg.max_draw_buffers {
                emit!(self.main, "fsout_c{i} = fsout_c0;");
            }
        }
        Ok(())
    }

    /// Logic-op emulation over quantized color bits. Ops that read the
    /// destination fetch the attachment through the inout output.
    fn emit_logicop(&mut self, op: LogicOp, sid: u32) {
        use LogicOp::*;
        let bits = self.ctx.key.surface_component_bits[sid as usize].max(8) as u32;
        let scale = (1u32 << bits.min(31)) - 1;
        if logicop_needs_dst(op) {
            self.ctx.require(ShaderReq::FBFETCH);
        }
        let s = format!("ivec4(fsout_tmp_c{sid} * {scale}.0)");
        let d = format!("ivec4(fsout_c{sid} * {scale}.0)");
        let expr = match op {
            Clear => "vec4(0.0)".to_string(),
            Set => "vec4(1.0)".to_string(),
            Copy => format!("fsout_tmp_c{sid}"),
            Noop => return,
            CopyInverted => format!("vec4((~{s}) & {scale}) / {scale}.0"),
            Invert => format!("vec4((~{d}) & {scale}) / {scale}.0"),
            And => format!("vec4({s} & {d}) / {scale}.0"),
            Nand => format!("vec4((~({s} & {d})) & {scale}) / {scale}.0"),
            Or => format!("vec4({s} | {d}) / {scale}.0"),
            Nor => format!("vec4((~({s} | {d})) & {scale}) / {scale}.0"),
            Xor => format!("vec4(({s} ^ {d}) & {scale}) / {scale}.0"),
            Equiv => format!("vec4((~({s} ^ {d})) & {scale}) / {scale}.0"),
            AndReverse => format!("vec4({s} & (~{d} & {scale})) / {scale}.0"),
            AndInverted => format!("vec4((~{s} & {scale}) & {d}) / {scale}.0"),
            OrReverse => format!("vec4(({s} | (~{d} & {scale})) & {scale}) / {scale}.0"),
            OrInverted => format!("vec4(((~{s} & {scale}) | {d}) & {scale}) / {scale}.0"),
        };
        emit!(self.main, "fsout_c{sid} = {expr};");
    }

    pub fn shadow_units(&self) -> &[u32] {
        &self.shadow_units
    }
}

/// Whether a logic op reads the destination attachment.
pub(crate) fn logicop_needs_dst(op: LogicOp) -> bool {
    use LogicOp::*;
    !matches!(op, Clear | Set | Copy | CopyInverted | Noop)
}

pub(crate) fn coord_replaced(ctx: &TranslationCtx, slot: &IoSlot) -> bool {
    ctx.prog == Processor::Fragment
        && matches!(slot.name, Semantic::Generic | Semantic::TexCoord)
        && ctx.key.coord_replace & (1 << slot.sid) != 0
}

fn apply_modifiers(expr: String, _is_double: bool, absolute: bool, negate: bool) -> String {
    let mut e = expr;
    if absolute {
        e = format!("abs({e})");
    }
    if negate {
        e = format!("-({e})");
    }
    e
}

fn format_f32(v: f32) -> String {
    if v == f32::INFINITY {
        "uintBitsToFloat(0x7f800000u)".to_string()
    } else if v == f32::NEG_INFINITY {
        "uintBitsToFloat(0xff800000u)".to_string()
    } else if v.is_nan() {
        "uintBitsToFloat(0x7fc00000u)".to_string()
    } else {
        let mut s = format!("{v:?}");
        if !s.contains('.') && !s.contains('e') {
            s.push_str(".0");
        }
        s
    }
}

fn format_f64(v: f64) -> String {
    let mut s = format!("{v:?}");
    if !s.contains('.') && !s.contains('e') {
        s.push_str(".0");
    }
    s
}

/// Coordinate argument shapes per target for the non-fetch sampling calls.
fn tex_coord_arg(target: TextureTarget, coord: &str) -> String {
    use TextureTarget::*;
    match target {
        Buffer | Tex1D => format!("({coord}).x"),
        Tex2D | Rect | Tex1DArray | Tex2DMsaa => format!("({coord}).xy"),
        Tex3D | Cube | Tex2DArray | Tex2DArrayMsaa => format!("({coord}).xyz"),
        CubeArray => format!("({coord})"),
        Shadow1D => format!("vec3(({coord}).x, 0.0, ({coord}).z)"),
        Shadow2D | ShadowRect | Shadow1DArray => format!("({coord}).xyz"),
        Shadow2DArray | ShadowCube => format!("({coord})"),
        ShadowCubeArray => format!("({coord})"),
    }
}

/// Integer texel-coordinate shapes for TXF; the level rides in `.w`.
fn fetch_shape(target: TextureTarget) -> &'static str {
    use TextureTarget::*;
    match target {
        Tex1D | Shadow1D => "x",
        Tex2D | Shadow2D | Tex1DArray | Shadow1DArray => "xy",
        _ => "xyz",
    }
}

/// Scalar count of `textureSize` for a target, for result padding.
fn size_components(target: TextureTarget) -> u32 {
    use TextureTarget::*;
    match target {
        Buffer | Tex1D | Shadow1D => 1,
        Tex2D | Shadow2D | Rect | ShadowRect | Cube | ShadowCube | Tex1DArray
        | Shadow1DArray | Tex2DMsaa => 2,
        _ => 3,
    }
}

/// Gradient component shapes for TXD.
fn grad_dims(target: TextureTarget) -> &'static str {
    match target.coord_components() {
        1 => "x",
        2 => "xy",
        _ => "xyz",
    }
}
