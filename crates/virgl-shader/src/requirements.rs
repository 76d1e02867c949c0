//! Shader requirement flags and their mapping to GLSL versions and
//! extension pragmas.
//!
//! Flags accumulate monotonically while declarations and instructions are
//! analyzed; the header emitter consults them once. The literal extension
//! strings and version floors are configuration data per target profile,
//! not derived logic.

use bitflags::bitflags;

use crate::strbuf::GlslBuf;

bitflags! {
    /// Feature requirements accumulated during analysis and generation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ShaderReq: u64 {
        const SAMPLER_RECT        = 1 << 0;
        const CUBE_ARRAY          = 1 << 1;
        const INTS                = 1 << 2;
        const SAMPLER_MS          = 1 << 3;
        const INSTANCE_ID         = 1 << 4;
        const LODQ                = 1 << 5;
        const TXQ_LEVELS          = 1 << 6;
        const TG4                 = 1 << 7;
        const VIEWPORT_IDX        = 1 << 8;
        const STENCIL_EXPORT      = 1 << 9;
        const LAYER               = 1 << 10;
        const SAMPLE_SHADING      = 1 << 11;
        const GPU_SHADER5         = 1 << 12;
        const DERIVATIVE_CONTROL  = 1 << 13;
        const FP64                = 1 << 14;
        const IMAGE_LOAD_STORE    = 1 << 15;
        const ES31_COMPAT         = 1 << 16;
        const IMAGE_SIZE          = 1 << 17;
        const TXQS                = 1 << 18;
        const FBFETCH             = 1 << 19;
        const SHADER_CLOCK        = 1 << 20;
        const PSIZE               = 1 << 21;
        const IMAGE_ATOMIC        = 1 << 22;
        const CLIP_DISTANCE       = 1 << 23;
        const ENHANCED_LAYOUTS    = 1 << 24;
        const SEPARATE_SHADER_OBJECTS = 1 << 25;
        const ARRAYS_OF_ARRAYS    = 1 << 26;
        const SHADER_INTEGER_FUNC = 1 << 27;
        const SHADER_ATOMIC_FLOAT = 1 << 28;
        const NV_IMAGE_FORMATS    = 1 << 29;
        const CONSERVATIVE_DEPTH  = 1 << 30;
        const SAMPLER_BUF         = 1 << 31;
        const SSBO                = 1 << 32;
        const GEOMETRY_SHADER     = 1 << 33;
        const TESSELLATION        = 1 << 34;
        const COMPUTE             = 1 << 35;
    }
}

/// One profile table row: a triggered flag raises the version floor and,
/// when the chosen version stays below `core_in`, emits the pragma.
#[derive(Debug, Clone, Copy)]
struct ExtEntry {
    req: ShaderReq,
    ext: Option<&'static str>,
    min_version: u32,
    /// Version at which the feature is core and the pragma is unneeded.
    core_in: u32,
}

const fn entry(
    req: ShaderReq,
    ext: &'static str,
    min_version: u32,
    core_in: u32,
) -> ExtEntry {
    ExtEntry {
        req,
        ext: Some(ext),
        min_version,
        core_in,
    }
}

const fn version_only(req: ShaderReq, min_version: u32) -> ExtEntry {
    ExtEntry {
        req,
        ext: None,
        min_version,
        core_in: min_version,
    }
}

const DESKTOP_ENTRIES: &[ExtEntry] = &[
    version_only(ShaderReq::INTS, 130),
    version_only(ShaderReq::SAMPLER_RECT, 130),
    version_only(ShaderReq::SAMPLER_MS, 150),
    version_only(ShaderReq::GEOMETRY_SHADER, 150),
    version_only(ShaderReq::PSIZE, 130),
    version_only(ShaderReq::CLIP_DISTANCE, 130),
    version_only(ShaderReq::FBFETCH, 130),
    entry(ShaderReq::CUBE_ARRAY, "GL_ARB_texture_cube_map_array", 130, 400),
    entry(ShaderReq::INSTANCE_ID, "GL_ARB_draw_instanced", 130, 140),
    entry(ShaderReq::LODQ, "GL_ARB_texture_query_lod", 130, 400),
    entry(ShaderReq::TXQ_LEVELS, "GL_ARB_texture_query_levels", 130, 430),
    entry(ShaderReq::TG4, "GL_ARB_texture_gather", 130, 400),
    entry(ShaderReq::VIEWPORT_IDX, "GL_ARB_viewport_array", 130, 410),
    entry(ShaderReq::STENCIL_EXPORT, "GL_ARB_shader_stencil_export", 130, 460),
    entry(ShaderReq::LAYER, "GL_ARB_fragment_layer_viewport", 130, 430),
    entry(ShaderReq::SAMPLE_SHADING, "GL_ARB_sample_shading", 130, 400),
    entry(ShaderReq::GPU_SHADER5, "GL_ARB_gpu_shader5", 130, 400),
    entry(ShaderReq::DERIVATIVE_CONTROL, "GL_ARB_derivative_control", 130, 450),
    entry(ShaderReq::FP64, "GL_ARB_gpu_shader_fp64", 150, 400),
    entry(ShaderReq::IMAGE_LOAD_STORE, "GL_ARB_shader_image_load_store", 130, 420),
    entry(ShaderReq::ES31_COMPAT, "GL_ARB_ES3_1_compatibility", 130, 450),
    entry(ShaderReq::IMAGE_SIZE, "GL_ARB_shader_image_size", 130, 430),
    entry(ShaderReq::TXQS, "GL_ARB_shader_texture_image_samples", 130, 450),
    entry(ShaderReq::SHADER_CLOCK, "GL_ARB_shader_clock", 130, u32::MAX),
    entry(ShaderReq::ENHANCED_LAYOUTS, "GL_ARB_enhanced_layouts", 140, 440),
    entry(
        ShaderReq::SEPARATE_SHADER_OBJECTS,
        "GL_ARB_separate_shader_objects",
        140,
        410,
    ),
    entry(ShaderReq::ARRAYS_OF_ARRAYS, "GL_ARB_arrays_of_arrays", 130, 430),
    entry(
        ShaderReq::SHADER_INTEGER_FUNC,
        "GL_MESA_shader_integer_functions",
        130,
        u32::MAX,
    ),
    entry(
        ShaderReq::SHADER_ATOMIC_FLOAT,
        "GL_NV_shader_atomic_float",
        130,
        u32::MAX,
    ),
    entry(ShaderReq::CONSERVATIVE_DEPTH, "GL_ARB_conservative_depth", 130, 420),
    entry(ShaderReq::SSBO, "GL_ARB_shader_storage_buffer_object", 140, 430),
    entry(ShaderReq::IMAGE_ATOMIC, "GL_ARB_shader_image_load_store", 130, 420),
    entry(ShaderReq::TESSELLATION, "GL_ARB_tessellation_shader", 150, 400),
    entry(ShaderReq::COMPUTE, "GL_ARB_compute_shader", 140, 430),
];

const GLES_ENTRIES: &[ExtEntry] = &[
    version_only(ShaderReq::INTS, 300),
    version_only(ShaderReq::SAMPLER_MS, 310),
    version_only(ShaderReq::INSTANCE_ID, 300),
    version_only(ShaderReq::IMAGE_LOAD_STORE, 310),
    version_only(ShaderReq::IMAGE_SIZE, 310),
    version_only(ShaderReq::SSBO, 310),
    version_only(ShaderReq::COMPUTE, 310),
    version_only(ShaderReq::ENHANCED_LAYOUTS, 310),
    version_only(ShaderReq::SEPARATE_SHADER_OBJECTS, 310),
    version_only(ShaderReq::ARRAYS_OF_ARRAYS, 310),
    entry(ShaderReq::CUBE_ARRAY, "GL_OES_texture_cube_map_array", 310, u32::MAX),
    entry(ShaderReq::TG4, "GL_EXT_gpu_shader5", 310, 320),
    entry(ShaderReq::GPU_SHADER5, "GL_EXT_gpu_shader5", 310, 320),
    entry(ShaderReq::VIEWPORT_IDX, "GL_OES_viewport_array", 310, u32::MAX),
    entry(ShaderReq::SAMPLE_SHADING, "GL_OES_sample_variables", 310, 320),
    entry(ShaderReq::FBFETCH, "GL_EXT_shader_framebuffer_fetch", 300, u32::MAX),
    entry(ShaderReq::PSIZE, "GL_OES_geometry_point_size", 300, u32::MAX),
    entry(ShaderReq::IMAGE_ATOMIC, "GL_OES_shader_image_atomic", 310, u32::MAX),
    entry(ShaderReq::CLIP_DISTANCE, "GL_EXT_clip_cull_distance", 300, u32::MAX),
    entry(ShaderReq::SAMPLER_BUF, "GL_EXT_texture_buffer", 310, 320),
    entry(ShaderReq::NV_IMAGE_FORMATS, "GL_NV_image_formats", 310, u32::MAX),
    entry(
        ShaderReq::SHADER_INTEGER_FUNC,
        "GL_MESA_shader_integer_functions",
        310,
        u32::MAX,
    ),
    entry(ShaderReq::GEOMETRY_SHADER, "GL_EXT_geometry_shader", 310, 320),
    entry(ShaderReq::TESSELLATION, "GL_EXT_tessellation_shader", 310, 320),
    entry(ShaderReq::TXQS, "GL_ARB_shader_texture_image_samples", 310, u32::MAX),
];

/// Per-profile mapping from requirement flags to pragmas and versions.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionTable {
    gles: bool,
    base_version: u32,
    entries: &'static [ExtEntry],
}

impl ExtensionTable {
    pub fn desktop() -> Self {
        Self {
            gles: false,
            base_version: 130,
            entries: DESKTOP_ENTRIES,
        }
    }

    pub fn gles() -> Self {
        Self {
            gles: true,
            base_version: 300,
            entries: GLES_ENTRIES,
        }
    }

    pub fn is_gles(&self) -> bool {
        self.gles
    }

    /// Chooses the shader's version: the configured target raised by every
    /// triggered flag's floor.
    pub fn select_version(&self, reqs: ShaderReq, cfg_version: u32) -> u32 {
        let mut version = self.base_version.max(cfg_version);
        for e in self.entries {
            if reqs.contains(e.req) {
                version = version.max(e.min_version);
            }
        }
        version
    }

    /// Writes the `#version` pragma and the extension lines still needed at
    /// the chosen version.
    pub fn emit_header(&self, reqs: ShaderReq, version: u32, buf: &mut GlslBuf) {
        if self.gles {
            buf.line(&format!("#version {version} es"));
        } else {
            buf.line(&format!("#version {version}"));
        }
        let mut emitted: Vec<&'static str> = Vec::new();
        for e in self.entries {
            let Some(ext) = e.ext else { continue };
            if reqs.contains(e.req) && version < e.core_in && !emitted.contains(&ext) {
                emitted.push(ext);
                buf.line(&format!("#extension {ext} : require"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_shader_needs_no_extensions() {
        let table = ExtensionTable::desktop();
        let version = table.select_version(ShaderReq::empty(), 140);
        assert_eq!(version, 140);
        let mut buf = GlslBuf::new();
        table.emit_header(ShaderReq::empty(), version, &mut buf);
        assert_eq!(buf.as_str(), "#version 140\n");
    }

    #[test]
    fn fp64_raises_version_and_emits_pragma() {
        let table = ExtensionTable::desktop();
        let reqs = ShaderReq::FP64;
        let version = table.select_version(reqs, 140);
        assert_eq!(version, 150);
        let mut buf = GlslBuf::new();
        table.emit_header(reqs, version, &mut buf);
        assert!(buf.as_str().contains("GL_ARB_gpu_shader_fp64"));
    }

    #[test]
    fn core_features_drop_their_pragma() {
        let table = ExtensionTable::desktop();
        let reqs = ShaderReq::GPU_SHADER5;
        let mut buf = GlslBuf::new();
        table.emit_header(reqs, 430, &mut buf);
        assert!(!buf.as_str().contains("GL_ARB_gpu_shader5"));
    }

    #[test]
    fn gles_version_suffix() {
        let table = ExtensionTable::gles();
        let version = table.select_version(ShaderReq::SSBO, 300);
        assert_eq!(version, 310);
        let mut buf = GlslBuf::new();
        table.emit_header(ShaderReq::SSBO, version, &mut buf);
        assert!(buf.as_str().starts_with("#version 310 es\n"));
    }

    #[test]
    fn duplicate_extension_strings_emit_once() {
        let table = ExtensionTable::gles();
        let reqs = ShaderReq::TG4 | ShaderReq::GPU_SHADER5;
        let mut buf = GlslBuf::new();
        table.emit_header(reqs, 310, &mut buf);
        assert_eq!(buf.as_str().matches("GL_EXT_gpu_shader5").count(), 1);
    }
}
