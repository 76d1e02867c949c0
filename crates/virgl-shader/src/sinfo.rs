//! Cross-stage linking descriptor.
//!
//! A translation's context dies with the call; everything a later stage or
//! the binding layer needs survives here by value. The one post-hoc
//! rewrite is the vertex-color interpolation splice, applied once the
//! paired fragment stage's interpolation modes are known.

use virgl_tgsi::token::{Interpolation, InterpolateLoc, Property, Semantic};

use crate::config::LayoutLocation;
use crate::context::{OpaqueArray, TranslationCtx};

/// Interpolation mode of one fragment-stage input, keyed by semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpInfo {
    pub semantic: Semantic,
    pub sid: u32,
    pub interpolation: Interpolation,
    pub location: InterpolateLoc,
}

/// One coalesced sampler or image array: units `first..first + size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayInfo {
    pub first: u32,
    pub size: u32,
}

impl From<&OpaqueArray> for ArrayInfo {
    fn from(a: &OpaqueArray) -> Self {
        Self {
            first: a.first,
            size: a.array_size,
        }
    }
}

/// Everything the binding layer and downstream stages need from one
/// completed translation.
#[derive(Debug, Clone, Default)]
pub struct ShaderInfo {
    pub glsl_version: u32,

    pub samplers_used_mask: u32,
    pub images_used_mask: u32,
    pub ubo_used_mask: u32,
    pub ssbo_used_mask: u32,
    pub num_consts: u32,
    /// Sampler units with a shadow comparison target; each carries a
    /// swizzle-mask/add uniform pair.
    pub shadow_samp_mask: u32,

    pub sampler_arrays: Vec<ArrayInfo>,
    pub image_arrays: Vec<ArrayInfo>,

    /// Fragment-stage input interpolation, for the vertex-side splice.
    pub interps: Vec<InterpInfo>,

    /// Capture names for transform feedback, in entry order.
    pub so_names: Vec<String>,

    /// Location assignments this stage fixed for its Generic and Patch
    /// outputs; the next stage mirrors them on its inputs.
    pub generic_outputs: Vec<LayoutLocation>,
    pub patch_outputs: Vec<LayoutLocation>,

    pub num_clip_out: u32,
    pub num_cull_out: u32,
    pub num_in_clip: u32,

    /// The vertex stage emits window-space positions; the caller skips its
    /// viewport transform for this pipeline.
    pub window_space_position: bool,
}

impl ShaderInfo {
    /// Copies the exported subset out of a finished context.
    pub(crate) fn export(ctx: &TranslationCtx, glsl_version: u32, shadow_units: &[u32]) -> Self {
        let mut samplers_used_mask = 0u32;
        for (unit, slot) in ctx.samplers.iter().enumerate() {
            if slot.is_some() {
                samplers_used_mask |= 1 << unit;
            }
        }
        let mut images_used_mask = 0u32;
        for (unit, slot) in ctx.images.iter().enumerate() {
            if slot.is_some() {
                images_used_mask |= 1 << unit;
            }
        }
        let mut shadow_samp_mask = 0u32;
        for &unit in shadow_units {
            shadow_samp_mask |= 1 << unit;
        }

        let interps = ctx
            .inputs
            .iter()
            .map(|s| InterpInfo {
                semantic: s.name,
                sid: s.sid,
                interpolation: s.interpolation,
                location: s.location,
            })
            .collect();

        let mut generic_outputs = Vec::new();
        let mut patch_outputs = Vec::new();
        for slot in &ctx.outputs {
            let Some(location) = slot.layout_location else {
                continue;
            };
            let exported = LayoutLocation {
                semantic: slot.name,
                sid: slot.sid,
                location,
            };
            match slot.name {
                Semantic::Generic => generic_outputs.push(exported),
                Semantic::Patch => patch_outputs.push(exported),
                _ => {}
            }
        }

        Self {
            glsl_version,
            samplers_used_mask,
            images_used_mask,
            ubo_used_mask: ctx.ubo_used_mask,
            ssbo_used_mask: ctx.ssbo_used_mask,
            num_consts: ctx.num_consts,
            shadow_samp_mask,
            sampler_arrays: ctx.sampler_arrays.iter().map(ArrayInfo::from).collect(),
            image_arrays: ctx.image_arrays.iter().map(ArrayInfo::from).collect(),
            interps,
            so_names: ctx.so_decisions.iter().map(|d| d.glsl_name.clone()).collect(),
            generic_outputs,
            patch_outputs,
            num_clip_out: ctx.num_clip_dist_out,
            num_cull_out: ctx.num_cull_dist_out,
            num_in_clip: ctx.num_in_clip_dist,
            window_space_position: ctx
                .scan
                .property(Property::VsWindowSpacePosition)
                .unwrap_or(0)
                != 0,
        }
    }

    /// The coalesced array covering `unit`, if any.
    pub fn lookup_sampler_array(&self, unit: u32) -> Option<&ArrayInfo> {
        self.sampler_arrays
            .iter()
            .find(|a| unit >= a.first && unit < a.first + a.size)
    }
}

/// Rewrites a vertex stage's color output declarations to carry the
/// interpolation qualifiers the paired fragment stage actually declared.
///
/// Vertex translation emits its color outputs unqualified because the
/// fragment stage is translated independently and possibly later. Once
/// both exist, the fragment side's [`ShaderInfo`] names the modes and this
/// splice inserts the qualifier text in front of each matching
/// `out vec4 vso_c<sid>;` line of the vertex header region.
pub fn patch_vertex_shader_interpolants(vs_hdr: &str, fs_info: &ShaderInfo) -> String {
    let mut patched = vs_hdr.to_string();
    for interp in &fs_info.interps {
        if !matches!(interp.semantic, Semantic::Color | Semantic::BColor) {
            continue;
        }
        let qualifier = match interp.interpolation {
            Interpolation::Constant => "flat ",
            Interpolation::Linear => "noperspective ",
            Interpolation::Perspective | Interpolation::Color => continue,
        };
        let prefix = if interp.semantic == Semantic::Color {
            "c"
        } else {
            "bc"
        };
        let needle = format!("out vec4 vso_{prefix}{};", interp.sid);
        if let Some(pos) = patched.find(&needle) {
            patched.insert_str(pos, qualifier);
        }
    }
    patched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs_info_with(semantic: Semantic, sid: u32, interpolation: Interpolation) -> ShaderInfo {
        ShaderInfo {
            interps: vec![InterpInfo {
                semantic,
                sid,
                interpolation,
                location: InterpolateLoc::Center,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn splices_flat_qualifier_onto_color_output() {
        let hdr = "out vec4 vso_g0;\nout vec4 vso_c0;\n";
        let info = fs_info_with(Semantic::Color, 0, Interpolation::Constant);
        let patched = patch_vertex_shader_interpolants(hdr, &info);
        assert_eq!(patched, "out vec4 vso_g0;\nflat out vec4 vso_c0;\n");
    }

    #[test]
    fn perspective_colors_stay_unqualified() {
        let hdr = "out vec4 vso_c1;\n";
        let info = fs_info_with(Semantic::Color, 1, Interpolation::Perspective);
        assert_eq!(patch_vertex_shader_interpolants(hdr, &info), hdr);
    }

    #[test]
    fn back_colors_use_their_own_names() {
        let hdr = "out vec4 vso_c0;\nout vec4 vso_bc0;\n";
        let info = fs_info_with(Semantic::BColor, 0, Interpolation::Linear);
        let patched = patch_vertex_shader_interpolants(hdr, &info);
        assert_eq!(patched, "out vec4 vso_c0;\nnoperspective out vec4 vso_bc0;\n");
    }

    #[test]
    fn sampler_array_lookup_covers_the_range() {
        let info = ShaderInfo {
            sampler_arrays: vec![ArrayInfo { first: 2, size: 3 }],
            ..Default::default()
        };
        assert!(info.lookup_sampler_array(1).is_none());
        assert_eq!(info.lookup_sampler_array(2).unwrap().first, 2);
        assert_eq!(info.lookup_sampler_array(4).unwrap().first, 2);
        assert!(info.lookup_sampler_array(5).is_none());
    }
}
