//! Stripping of structural decoration from a raw input line

/// Characters removed before tokenizing: the four bracket variants plus
/// space, tab, CR and LF.
const STRIPPED: [char; 8] = ['[', ']', '{', '}', ' ', '\t', '\r', '\n'];

/// Whether `c` is removed by [`sanitize`]
#[inline]
pub fn is_stripped(c: char) -> bool {
    STRIPPED.contains(&c)
}

/// Remove brackets and whitespace from `line`, leaving the comma-separated
/// numeric token stream.
///
/// Nesting is not validated; `[[1,2],[3]]` and `1,2,3` sanitize identically.
pub fn sanitize(line: &str) -> String {
    line.chars().filter(|&c| !is_stripped(c)).collect()
}
