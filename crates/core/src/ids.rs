//! Identifier and slug helpers.
//!
//! Content-service ids come in two shapes: dashed UUIDs
//! (`568ac4c0-64c3-4ef6-a6ad-0b8d77230681`) and the same 32 hex digits
//! without dashes. Everything in notiblog is keyed by the dash-less form.

use sha2::{Digest, Sha256};

/// Longest slug produced by [`urlify`].
const MAX_SLUG_LEN: usize = 128;

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Strip dashes and lowercase a content-service id.
pub fn normalize_id(id: &str) -> String {
    id.trim()
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// True if `id` is a normalized 32 hex digit id.
pub fn is_normalized_id(id: &str) -> bool {
    id.len() == 32 && id.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Re-insert dashes into a normalized id (8-4-4-4-12), as the REST API expects.
pub fn dashed_id(id: &str) -> String {
    let id = normalize_id(id);
    if id.len() != 32 {
        return id;
    }
    format!(
        "{}-{}-{}-{}-{}",
        &id[0..8],
        &id[8..12],
        &id[12..16],
        &id[16..20],
        &id[20..32]
    )
}

fn validate_char(c: char) -> Option<char> {
    match c {
        'a'..='z' | '0'..='9' | '-' | '_' | '.' => Some(c),
        ' ' => Some('-'),
        _ => None,
    }
}

fn char_can_repeat(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// Turn a title into a URL-safe slug.
///
/// Lowercases, keeps `[a-z0-9-_.]`, maps spaces to `-` and collapses runs of
/// the same separator. `"Hello, World!  Go"` becomes `"hello-world-go"`.
pub fn urlify(title: &str) -> String {
    let mut res = String::with_capacity(title.len());
    for c in title.trim().to_lowercase().chars() {
        let Some(c) = validate_char(c) else {
            continue;
        };
        if res.ends_with(c) && !char_can_repeat(c) {
            continue;
        }
        res.push(c);
    }
    // all chars are ascii so byte truncation is safe
    res.truncate(MAX_SLUG_LEN);
    res
}

/// Encode a legacy numeric article id in base 36 (`0-9a-z`).
pub fn encode_base36(mut n: u64) -> String {
    let mut buf = Vec::with_capacity(13);
    loop {
        buf.push(BASE36_CHARS[(n % 36) as usize]);
        if n < 36 {
            break;
        }
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

fn sha256_hex(data: &str, bytes: usize) -> String {
    Sha256::digest(data.as_bytes())
        .iter()
        .take(bytes)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Twelve hex digits of sha256, for names that have no ASCII slug.
pub fn short_hash(s: &str) -> String {
    sha256_hex(s, 6)
}

/// Query parameters that mark a pre-signed S3 URL.
const SIGNED_QUERY_MARKERS: &[&str] = &["x-amz-signature=", "x-amz-credential="];

/// `url` without the query string when it is a pre-signed S3 URL, whose
/// signature changes on every fetch.
fn stable_image_url(url: &str) -> &str {
    let Some((base, query)) = url.split_once('?') else {
        return url;
    };
    let query = query.to_lowercase();
    if SIGNED_QUERY_MARKERS.iter().any(|m| query.contains(m)) {
        base
    } else {
        url
    }
}

/// Cache key for a downloaded image: hex sha256 of the lowercased URL,
/// truncated. Signatures on pre-signed URLs are ignored.
pub fn image_key(url: &str) -> String {
    sha256_hex(&stable_image_url(url).to_lowercase(), 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_id() {
        assert_eq!(
            normalize_id("568AC4C0-64c3-4ef6-a6ad-0b8d77230681"),
            "568ac4c064c34ef6a6ad0b8d77230681"
        );
        assert_eq!(normalize_id("abc"), "abc");
    }

    #[test]
    fn test_is_normalized_id() {
        assert!(is_normalized_id("568ac4c064c34ef6a6ad0b8d77230681"));
        assert!(!is_normalized_id("568ac4c0-64c3-4ef6-a6ad-0b8d77230681"));
        assert!(!is_normalized_id("zzzac4c064c34ef6a6ad0b8d77230681"));
        assert!(!is_normalized_id(""));
    }

    #[test]
    fn test_dashed_id_round_trip() {
        let dashed = dashed_id("568ac4c064c34ef6a6ad0b8d77230681");
        assert_eq!(dashed, "568ac4c0-64c3-4ef6-a6ad-0b8d77230681");
        assert_eq!(normalize_id(&dashed), "568ac4c064c34ef6a6ad0b8d77230681");
    }

    #[test]
    fn test_urlify_basic() {
        assert_eq!(urlify("Hello, World!  Go"), "hello-world-go");
        assert_eq!(urlify("  Trim me  "), "trim-me");
        assert_eq!(urlify("a--b__c..d"), "a-b_c.d");
        assert_eq!(urlify("aabb 1122"), "aabb-1122");
    }

    #[test]
    fn test_urlify_drops_non_ascii() {
        assert_eq!(urlify("Zażółć gęślą"), "za-gl");
        assert_eq!(urlify("C++ & Rust"), "c-rust");
        assert_eq!(urlify("!!!"), "");
    }

    #[test]
    fn test_urlify_truncates() {
        let long = "x".repeat(300);
        assert_eq!(urlify(&long).len(), 128);
    }

    #[test]
    fn test_encode_base36() {
        assert_eq!(encode_base36(0), "0");
        assert_eq!(encode_base36(35), "z");
        assert_eq!(encode_base36(36), "10");
        assert_eq!(encode_base36(1295), "zz");
        assert_eq!(encode_base36(46656), "1000");
    }

    #[test]
    fn test_short_hash() {
        let h = short_hash("日本語");
        assert_eq!(h.len(), 12);
        assert_eq!(h, short_hash("日本語"));
        assert_ne!(h, short_hash("中文"));
    }

    #[test]
    fn test_image_key_is_case_insensitive() {
        let a = image_key("https://example.com/A.png");
        let b = image_key("https://EXAMPLE.com/a.PNG");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_ne!(a, image_key("https://example.com/b.png"));
    }

    #[test]
    fn test_image_key_ignores_s3_signature() {
        let base = "https://s3.us-west-2.amazonaws.com/secure.notion-static.com/abc/pic.png";
        let first = format!(
            "{}?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Credential=AKIA%2F20240101&X-Amz-Date=20240101T000000Z&X-Amz-Expires=3600&X-Amz-Signature=1111",
            base
        );
        let second = format!(
            "{}?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Credential=AKIA%2F20240102&X-Amz-Date=20240102T000000Z&X-Amz-Expires=3600&X-Amz-Signature=2222",
            base
        );
        assert_eq!(image_key(&first), image_key(&second));
        assert_eq!(image_key(&first), image_key(base));
        // ordinary query strings still distinguish images
        assert_ne!(
            image_key("https://example.com/chart.png?w=100"),
            image_key("https://example.com/chart.png?w=200")
        );
    }
}
