use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

const BASE32_ALPHABET: [char; 32] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M',
    'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    '2', '3', '4', '5', '6', '7',
];

pub fn u64_to_base32(mut num: u64) -> String {
    if num == 0 {
        return "A".to_string();
    }

    let mut result = String::new();

    while num > 0 {
        let remainder = (num % 32) as usize;
        result.push(BASE32_ALPHABET[remainder]);
        num /= 32;
    }

    result.chars().rev().collect()
}

/// Opaque template id derived from the template text.
pub fn content_id(content: &str) -> String {
    format!("tpl_{}", u64_to_base32(hash_value(&content)))
}

/// Turns a free-text label into a snake_case identifier.
///
/// Lowercases, turns whitespace runs into `_`, drops anything outside
/// `[a-z0-9_]`, collapses repeated underscores and trims them at both ends.
/// `"Batch Number"` becomes `batch_number`, `"≤10%"` becomes `10`.
pub fn to_snake_case(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut in_whitespace = false;

    for c in input.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                result.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        for lower in c.to_lowercase() {
            if lower.is_ascii_lowercase() || lower.is_ascii_digit() || lower == '_' {
                result.push(lower);
            }
        }
    }

    let mut collapsed = String::with_capacity(result.len());
    let mut prev_underscore = false;
    for c in result.chars() {
        if c == '_' {
            if !prev_underscore {
                collapsed.push(c);
            }
            prev_underscore = true;
        } else {
            collapsed.push(c);
            prev_underscore = false;
        }
    }

    collapsed.trim_matches('_').to_string()
}

/// `batch_number` -> `batch number`
pub fn spaced(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when `needle` occurs in `haystack` as a whole run of `_`-separated
/// segments. `contains_segment("e_coli_count", "coli")` holds,
/// `contains_segment("staphylococcus", "ph")` does not.
pub fn contains_segment(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!("_{}_", haystack).contains(&format!("_{}_", needle))
}

/// Byte offset `count` characters before `idx`, clamped at `floor`.
pub fn chars_back(text: &str, idx: usize, count: usize, floor: usize) -> usize {
    let mut start = idx;
    for (taken, (offset, _)) in text[floor..idx].char_indices().rev().enumerate() {
        if taken == count {
            break;
        }
        start = floor + offset;
    }
    start
}

/// Byte offset `count` characters after `idx`, clamped at `ceil`.
pub fn chars_forward(text: &str, idx: usize, count: usize, ceil: usize) -> usize {
    text[idx..ceil]
        .char_indices()
        .nth(count)
        .map(|(offset, _)| idx + offset)
        .unwrap_or(ceil)
}
