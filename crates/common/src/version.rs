//! The `lr_version` comparator used by the dispatcher to decide whether a
//! board's on-device runtime is new enough to receive the `Request` object
//! alongside a dispatched call.
//!
//! Versions are dotted triples of non-negative integers, except for the
//! literal sentinel `"freedom"`, which compares greater than any real
//! version. Anything else ill-formed is treated as older than any real
//! version.

use std::cmp::Ordering;

pub const FREEDOM: &str = "freedom";

/// The minimum `lr_version` at which the dispatcher includes the `Request`
/// object in the call payload.
pub const REQUEST_OBJECT_MIN_VERSION: &str = "0.4.9";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParsedVersion {
    Freedom,
    Parts([u64; 3]),
    /// Ill-formed: sorts below every real version.
    Unknown,
}

fn parse(v: &str) -> ParsedVersion {
    if v == FREEDOM {
        return ParsedVersion::Freedom;
    }

    let mut parts = [0u64; 3];
    for (i, raw) in v.split('.').enumerate().take(3) {
        match raw.parse::<u64>() {
            Ok(n) => parts[i] = n,
            Err(_) => return ParsedVersion::Unknown,
        }
    }
    // extra dotted parts beyond the first three are ignored.
    ParsedVersion::Parts(parts)
}

/// Compares two `lr_version` strings. `"freedom"` is greater than any real
/// version; ill-formed strings compare as older than any real version
/// (including each other, for which this returns `Equal`).
pub fn cmp(a: &str, b: &str) -> Ordering {
    use ParsedVersion::*;
    match (parse(a), parse(b)) {
        (Freedom, Freedom) => Ordering::Equal,
        (Freedom, _) => Ordering::Greater,
        (_, Freedom) => Ordering::Less,
        (Unknown, Unknown) => Ordering::Equal,
        (Unknown, _) => Ordering::Less,
        (_, Unknown) => Ordering::Greater,
        (Parts(a), Parts(b)) => a.cmp(&b),
    }
}

/// True if `version` is at least `min` under [`cmp`].
pub fn at_least(version: &str, min: &str) -> bool {
    cmp(version, min) != Ordering::Less
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn orders_patch_versions() {
        assert_eq!(cmp("0.4.9", "0.4.10"), Ordering::Less);
        assert_eq!(cmp("0.4.9", "0.4.9"), Ordering::Equal);
    }

    #[test]
    fn freedom_beats_everything() {
        assert_eq!(cmp(FREEDOM, "9.9.9"), Ordering::Greater);
        assert_eq!(cmp("9.9.9", FREEDOM), Ordering::Less);
        assert_eq!(cmp(FREEDOM, FREEDOM), Ordering::Equal);
    }

    #[test]
    fn ignores_extra_dotted_parts() {
        assert_eq!(cmp("1.2.3.4", "1.2.3"), Ordering::Equal);
    }

    #[test]
    fn ill_formed_versions_sort_lowest() {
        assert_eq!(cmp("not-a-version", "0.0.1"), Ordering::Less);
        assert_eq!(cmp("0.0.0", "not-a-version"), Ordering::Greater);
    }

    #[test]
    fn request_object_gate() {
        assert!(at_least("0.4.9", REQUEST_OBJECT_MIN_VERSION));
        assert!(at_least("0.5.0", REQUEST_OBJECT_MIN_VERSION));
        assert!(at_least(FREEDOM, REQUEST_OBJECT_MIN_VERSION));
        assert!(!at_least("0.4.8", REQUEST_OBJECT_MIN_VERSION));
    }
}
