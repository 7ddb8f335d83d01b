// src/sheet/column.rs

//! Column index <-> letter conversion (bijective base-26).
//!
//! `1 -> "A"`, `26 -> "Z"`, `27 -> "AA"`, `52 -> "AZ"`, `703 -> "AAA"`.

/// Convert a 1-based column index into its letters. `0` yields `""`.
pub fn column_to_letter(column: usize) -> String {
    let mut column = column;
    let mut letters = Vec::new();

    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - rem - 1) / 26;
    }

    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_to_letter`]. Case-insensitive; `None` for anything
/// that is not a non-empty run of ASCII letters, or that overflows.
pub fn letter_to_column(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }

    letters.chars().try_fold(0usize, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}
