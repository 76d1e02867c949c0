//! TGSI token-stream layer: wire vocabulary, record decoding, stream
//! construction, and the aggregate scan pass.
//!
//! The stream is a two-word header followed by declaration, immediate,
//! instruction, and property records, each a variable number of 32-bit
//! words. [`decode::TokenStream`] walks a buffer record by record;
//! [`scan::scan_shader`] runs the statistics pass the translator's
//! capability decisions depend on; [`encode::StreamBuilder`] assembles
//! streams programmatically.

pub mod decode;
pub mod encode;
pub mod scan;
pub mod token;

pub use decode::{DecodeError, FullToken, TokenStream};
pub use scan::{scan_shader, ShaderScanInfo};
pub use token::{Opcode, Processor, RegisterFile, Semantic};
