//! unpacker for the eval(function(p,a,c,k,e,d){...}) obfuscation most embed hosts wrap their
//! player setup in. the packed blob carries a payload of base-N tokens plus a dictionary, and
//! unpacking is a downward sweep substituting each dictionary word back over its token.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

const BASE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

static PACKED_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"eval\(function\(p,a,c,k,e,[dr]\)").expect("Packed marker pattern should compile")
});

static PACKED_ARGS_SINGLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\}\s*\(\s*'((?:[^'\\]|\\.)*)'\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*'((?:[^'\\]|\\.)*)'\.split\('\|'\)",
    )
    .expect("Packed args pattern should compile")
});

static PACKED_ARGS_DOUBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\}\s*\(\s*"((?:[^"\\]|\\.)*)"\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*"((?:[^"\\]|\\.)*)"\.split\('\|'\)"#,
    )
    .expect("Packed args pattern should compile")
});

pub fn is_packed(text: &str) -> bool {
    PACKED_MARKER.is_match(text)
}

/// unpack a packed script, `None` when the blob doesn't carry the expected argument shape.
/// both quote styles show up in the wild, the dictionary split stays single-quoted in either
pub fn unpack(packed: &str) -> Option<String> {
    packed.find("eval(function(")?;

    let caps = PACKED_ARGS_SINGLE
        .captures(packed)
        .or_else(|| PACKED_ARGS_DOUBLE.captures(packed))?;

    let payload = caps.get(1)?.as_str();
    let radix: usize = caps.get(2)?.as_str().parse().ok()?;
    let count: usize = caps.get(3)?.as_str().parse().ok()?;
    let dictionary: Vec<&str> = caps.get(4)?.as_str().split('|').collect();

    substitute(payload, radix, count, &dictionary)
}

fn substitute(payload: &str, radix: usize, count: usize, dictionary: &[&str]) -> Option<String> {
    if !(2..=BASE_ALPHABET.len()).contains(&radix) {
        return None;
    }

    let mut unpacked = payload.to_string();

    // count can run past the dictionary end, missing and empty slots keep their token
    for index in (0..count).rev() {
        let Some(word) = dictionary.get(index) else {
            continue;
        };
        if word.is_empty() {
            continue;
        }

        let token = encode_radix(index, radix);
        let matcher = Regex::new(&format!(r"\b{}\b", regex::escape(&token))).ok()?;
        unpacked = matcher.replace_all(&unpacked, NoExpand(word)).into_owned();
    }

    Some(unpacked)
}

fn encode_radix(mut value: usize, radix: usize) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE_ALPHABET[value % radix]);
        value /= radix;
    }
    digits.reverse();

    digits.iter().map(|&digit| digit as char).collect()
}
