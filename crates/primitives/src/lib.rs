//! Core coordinate and text types shared by the lexer and the document model.

/// LSP interop: content changes and position conversions.
pub mod lsp;
/// Line/column positions and half-open ranges.
pub mod position;
/// Line-terminator handling and single-line text splicing.
pub mod text;

pub use lsp::TextChange;
pub use position::{Column, LineIdx, Position, Range};
pub use text::{TextError, byte_offset, changed_text, char_len, ends_with_line_break, line_terminator, split_lines, strip_terminator};
