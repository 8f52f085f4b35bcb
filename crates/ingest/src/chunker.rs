//! Fixed-size overlapping window chunker.
//!
//! Splits flat text into character windows of `size`, stepping by
//! `size - overlap`, so adjacent chunks share `overlap` characters. The
//! final chunk may be shorter than `size`. Offsets are in characters, not
//! bytes, so multi-byte text never splits inside a code point.

/// A bounded window of the source text, the unit of embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// 0-based position within the document.
    pub index: usize,
    /// The window text.
    pub text: String,
    /// Character offset of the window start in the source text.
    pub source_offset: usize,
}

/// Split `text` into overlapping windows.
///
/// Callers must guarantee `size > 0` and `overlap < size`; the geometry is
/// validated once at configuration time. Empty text yields no chunks.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Vec<TextChunk> {
    debug_assert!(size > 0 && overlap < size, "chunk geometry must be validated upstream");

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = size - overlap;
    let mut chunks = Vec::with_capacity(chars.len() / step + 1);
    let mut offset = 0;

    while offset < chars.len() {
        let end = (offset + size).min(chars.len());
        chunks.push(TextChunk {
            index: chunks.len(),
            text: chars[offset..end].iter().collect(),
            source_offset: offset,
        });
        offset += step;
    }

    chunks
}
