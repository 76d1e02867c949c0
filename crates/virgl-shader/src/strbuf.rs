//! Growable text buffers for the three emitted shader regions.
//!
//! `GlslBuf` tracks an indent level for block-structured emission and a
//! sticky error flag: once set, further writes are dropped and the
//! translation entry point refuses to hand out the text. Unbalanced
//! indentation (an outdent below zero) also sets the flag, so a control-flow
//! bug cannot silently produce misnested output.

use std::fmt::{self, Write};

#[derive(Debug, Default)]
pub struct GlslBuf {
    text: String,
    indent: usize,
    error: bool,
}

impl GlslBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            indent: 0,
            error: false,
        }
    }

    pub fn had_error(&self) -> bool {
        self.error
    }

    pub fn set_error(&mut self) {
        self.error = true;
    }

    pub fn indent_level(&self) -> usize {
        self.indent
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn outdent(&mut self) {
        if self.indent == 0 {
            self.error = true;
            return;
        }
        self.indent -= 1;
    }

    /// Appends one line at the current indent level.
    pub fn line(&mut self, s: &str) {
        if self.error {
            return;
        }
        for _ in 0..self.indent {
            self.text.push_str("   ");
        }
        self.text.push_str(s);
        self.text.push('\n');
    }

    /// `line` for formatted content; used through the `emit!` macro.
    pub fn line_fmt(&mut self, args: fmt::Arguments<'_>) {
        if self.error {
            return;
        }
        for _ in 0..self.indent {
            self.text.push_str("   ");
        }
        if self.text.write_fmt(args).is_err() {
            self.error = true;
            return;
        }
        self.text.push('\n');
    }

    /// Appends raw text with no indent or newline.
    pub fn push_raw(&mut self, s: &str) {
        if self.error {
            return;
        }
        self.text.push_str(s);
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Writes one formatted line into a [`GlslBuf`].
macro_rules! emit {
    ($buf:expr, $($arg:tt)*) => {
        $buf.line_fmt(format_args!($($arg)*))
    };
}
pub(crate) use emit;

/// The three ordered regions whose concatenation is the complete shader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderParts {
    /// `#version` pragma and `#extension` lines.
    pub ver_ext: String,
    /// Declarations: IO, uniforms, samplers, blocks, temporaries.
    pub hdr: String,
    /// The `main()` body, braces included.
    pub main: String,
}

impl ShaderParts {
    pub fn to_glsl(&self) -> String {
        let mut out =
            String::with_capacity(self.ver_ext.len() + self.hdr.len() + self.main.len() + 1);
        out.push_str(&self.ver_ext);
        out.push_str(&self.hdr);
        out.push_str(&self.main);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_indented() {
        let mut buf = GlslBuf::new();
        buf.line("void main()");
        buf.line("{");
        buf.indent();
        emit!(buf, "x = {};", 3);
        buf.outdent();
        buf.line("}");
        assert_eq!(buf.as_str(), "void main()\n{\n   x = 3;\n}\n");
        assert!(!buf.had_error());
    }

    #[test]
    fn outdent_below_zero_is_sticky() {
        let mut buf = GlslBuf::new();
        buf.outdent();
        assert!(buf.had_error());
        buf.line("dropped");
        assert!(buf.as_str().is_empty());
    }
}
