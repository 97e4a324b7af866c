//! Locale-aware string ordering for display fields
//!
//! Plain code point order puts every uppercase letter before every
//! lowercase one and places Cyrillic `Ё`/`ё` outside the alphabet. The
//! collation key folds case and slots `ё` right after `е`, so Latin and
//! Cyrillic names both sort the way a reader expects.

use std::cmp::Ordering;

/// Primary weight of a single character
fn weight(c: char) -> (u32, u8) {
    match c {
        // ё sorts between е and ж
        'ё' | 'Ё' => ('е' as u32, 1),
        _ => {
            let lower = c.to_lowercase().next().unwrap_or(c);
            (lower as u32, 0)
        }
    }
}

/// Compare two strings case-insensitively with Cyrillic-aware ordering.
/// Equal keys fall back to code point order so the result is total.
pub fn compare(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .map(weight)
        .cmp(b.chars().map(weight));
    primary.then_with(|| a.cmp(b))
}
