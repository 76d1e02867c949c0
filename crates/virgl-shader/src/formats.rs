//! Image-unit format codes and their GLSL layout qualifier names.
//!
//! The declaration word carries a 10-bit format code. The table below is
//! the set of codes this translator accepts for typed image access; code 0
//! means "unspecified" and is only legal for write-only images. Each entry
//! also records the scalar class, which picks the `imageLoad`/`imageStore`
//! value reinterpretation and the `iimage`/`uimage` sampler-type prefix.

/// Scalar class of an image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    Float,
    Sint,
    Uint,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageFormat {
    pub code: u32,
    pub glsl_name: &'static str,
    pub class: FormatClass,
}

const FORMATS: &[ImageFormat] = &[
    ImageFormat { code: 1, glsl_name: "rgba32f", class: FormatClass::Float },
    ImageFormat { code: 2, glsl_name: "rgba16f", class: FormatClass::Float },
    ImageFormat { code: 3, glsl_name: "rg32f", class: FormatClass::Float },
    ImageFormat { code: 4, glsl_name: "rg16f", class: FormatClass::Float },
    ImageFormat { code: 5, glsl_name: "r11f_g11f_b10f", class: FormatClass::Float },
    ImageFormat { code: 6, glsl_name: "r32f", class: FormatClass::Float },
    ImageFormat { code: 7, glsl_name: "r16f", class: FormatClass::Float },
    ImageFormat { code: 8, glsl_name: "rgba16", class: FormatClass::Float },
    ImageFormat { code: 9, glsl_name: "rgb10_a2", class: FormatClass::Float },
    ImageFormat { code: 10, glsl_name: "rgba8", class: FormatClass::Float },
    ImageFormat { code: 11, glsl_name: "rg16", class: FormatClass::Float },
    ImageFormat { code: 12, glsl_name: "rg8", class: FormatClass::Float },
    ImageFormat { code: 13, glsl_name: "r16", class: FormatClass::Float },
    ImageFormat { code: 14, glsl_name: "r8", class: FormatClass::Float },
    ImageFormat { code: 15, glsl_name: "rgba16_snorm", class: FormatClass::Float },
    ImageFormat { code: 16, glsl_name: "rgba8_snorm", class: FormatClass::Float },
    ImageFormat { code: 17, glsl_name: "rg16_snorm", class: FormatClass::Float },
    ImageFormat { code: 18, glsl_name: "rg8_snorm", class: FormatClass::Float },
    ImageFormat { code: 19, glsl_name: "r16_snorm", class: FormatClass::Float },
    ImageFormat { code: 20, glsl_name: "r8_snorm", class: FormatClass::Float },
    ImageFormat { code: 21, glsl_name: "rgba32i", class: FormatClass::Sint },
    ImageFormat { code: 22, glsl_name: "rgba16i", class: FormatClass::Sint },
    ImageFormat { code: 23, glsl_name: "rgba8i", class: FormatClass::Sint },
    ImageFormat { code: 24, glsl_name: "rg32i", class: FormatClass::Sint },
    ImageFormat { code: 25, glsl_name: "rg16i", class: FormatClass::Sint },
    ImageFormat { code: 26, glsl_name: "rg8i", class: FormatClass::Sint },
    ImageFormat { code: 27, glsl_name: "r32i", class: FormatClass::Sint },
    ImageFormat { code: 28, glsl_name: "r16i", class: FormatClass::Sint },
    ImageFormat { code: 29, glsl_name: "r8i", class: FormatClass::Sint },
    ImageFormat { code: 30, glsl_name: "rgba32ui", class: FormatClass::Uint },
    ImageFormat { code: 31, glsl_name: "rgba16ui", class: FormatClass::Uint },
    ImageFormat { code: 32, glsl_name: "rgb10_a2ui", class: FormatClass::Uint },
    ImageFormat { code: 33, glsl_name: "rgba8ui", class: FormatClass::Uint },
    ImageFormat { code: 34, glsl_name: "rg32ui", class: FormatClass::Uint },
    ImageFormat { code: 35, glsl_name: "rg16ui", class: FormatClass::Uint },
    ImageFormat { code: 36, glsl_name: "rg8ui", class: FormatClass::Uint },
    ImageFormat { code: 37, glsl_name: "r32ui", class: FormatClass::Uint },
    ImageFormat { code: 38, glsl_name: "r16ui", class: FormatClass::Uint },
    ImageFormat { code: 39, glsl_name: "r8ui", class: FormatClass::Uint },
];

pub fn lookup(code: u32) -> Option<&'static ImageFormat> {
    FORMATS.iter().find(|f| f.code == code)
}

/// Formats outside the rgba8/16/32 family need the NV extension on GLES.
pub fn needs_nv_image_formats(code: u32) -> bool {
    !matches!(code, 0 | 1 | 6 | 10 | 16 | 21 | 27 | 30 | 33 | 37)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        for (i, a) in FORMATS.iter().enumerate() {
            for b in &FORMATS[i + 1..] {
                assert_ne!(a.code, b.code);
            }
        }
    }

    #[test]
    fn lookup_finds_known_codes() {
        assert_eq!(lookup(6).unwrap().glsl_name, "r32f");
        assert_eq!(lookup(37).unwrap().class, FormatClass::Uint);
        assert!(lookup(0).is_none());
    }
}
