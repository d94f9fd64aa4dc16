//! Name handling shared by the registry and the failure store.

/// Copy `text`, cut to at most `max_len` bytes on a char boundary.
pub(crate) fn bounded(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_owned();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_owned()
}

/// Name equality used for every lookup: ASCII case-insensitive.
#[inline]
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
