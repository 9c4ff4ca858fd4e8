//! Cache key normalization.
//!
//! String keys are folded so that inputs differing only in case or
//! whitespace share one entry. Lat/long keys use a separate encoding that
//! contains `:`, which [`normalize`] never emits, so the two key spaces
//! cannot collide.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Key used for any lat/long pair with a zero coordinate.
///
/// This conflates the equator and prime meridian with "unset".
pub const LAT_LONG_SENTINEL_KEY: &str = "latlng:unset";

/// Everything but ASCII alphanumerics and `-_.~%` gets escaped.
const KEY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'%');

/// Normalize a raw lookup string into a cache key.
///
/// Removes all whitespace, lowercases, then percent-encodes every byte
/// outside `[a-z0-9-_.~%]` using lowercase hex. The output only contains
/// characters from that set, so the function is idempotent.
///
/// `%` passes through unescaped, so input that is already percent-encoded
/// shares a key with its decoded form: `"a%2Cb"` and `"a,b"` both become
/// `"a%2cb"`.
///
/// # Example
///
/// ```
/// use geocode::cache::normalize;
///
/// assert_eq!(normalize(" 2 Maxwell Ct, SF "), "2maxwellct%2csf");
/// assert_eq!(normalize(&normalize("Petaluma, CA")), normalize("Petaluma, CA"));
/// ```
pub fn normalize(raw: &str) -> String {
    let folded: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    utf8_percent_encode(&folded, KEY_SET)
        .to_string()
        .to_ascii_lowercase()
}

/// Build the cache key for a lat/long pair.
///
/// Coordinates are rendered with six decimals, `.` becomes `dot` and `-`
/// becomes `min`. Either coordinate being exactly zero yields
/// [`LAT_LONG_SENTINEL_KEY`].
///
/// # Example
///
/// ```
/// use geocode::cache::lat_long_key;
///
/// assert_eq!(lat_long_key(33.66, -117.83), "33dot660000:min117dot830000");
/// ```
pub fn lat_long_key(latitude: f64, longitude: f64) -> String {
    if latitude == 0.0 || longitude == 0.0 {
        return LAT_LONG_SENTINEL_KEY.to_string();
    }
    format!(
        "{}:{}",
        encode_coordinate(latitude),
        encode_coordinate(longitude)
    )
}

fn encode_coordinate(value: f64) -> String {
    format!("{:.6}", value)
        .replace('.', "dot")
        .replace('-', "min")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_whitespace_and_lowercases() {
        assert_eq!(normalize("  92612 "), "92612");
        assert_eq!(normalize("Mountain View"), "mountainview");
        assert_eq!(normalize("MOUNTAIN\tVIEW\n"), "mountainview");
    }

    #[test]
    fn normalize_is_case_and_space_insensitive() {
        let a = normalize("2001 Market St San Francisco CA 94114 US");
        let b = normalize("  2001 market st  san francisco ca 94114 us");
        assert_eq!(a, b);
    }

    #[test]
    fn normalize_percent_encodes_unsafe_bytes() {
        assert_eq!(normalize("a,b"), "a%2cb");
        assert_eq!(normalize("a/b#c"), "a%2fb%23c");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "2 Maxwell Ct, San Francisco",
            "Exchange Square",
            "São Paulo",
            "100% / Done?",
            "",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn normalize_uses_lowercase_hex() {
        assert_eq!(normalize("a|b"), "a%7cb");
        assert_eq!(normalize("a;b"), "a%3bb");
        assert_eq!(normalize("São"), "s%c3%a3o");
    }

    #[test]
    fn normalize_keeps_existing_escapes() {
        assert_eq!(normalize("a%2Cb"), "a%2cb");
        assert_eq!(normalize("a%2Cb"), normalize("a,b"));
        assert_eq!(normalize("100%"), "100%");
    }

    #[test]
    fn normalize_encodes_non_ascii() {
        let key = normalize("São");
        assert!(key.is_ascii());
        assert!(key.starts_with("s%"));
    }

    #[test]
    fn lat_long_key_replaces_dot_and_minus() {
        assert_eq!(lat_long_key(33.66, -117.83), "33dot660000:min117dot830000");
        assert_eq!(
            lat_long_key(-33.8688, 151.2093),
            "min33dot868800:151dot209300"
        );
    }

    #[test]
    fn lat_long_key_zero_is_sentinel() {
        assert_eq!(lat_long_key(0.0, 0.0), LAT_LONG_SENTINEL_KEY);
        assert_eq!(lat_long_key(0.0, 12.5), LAT_LONG_SENTINEL_KEY);
        assert_eq!(lat_long_key(12.5, 0.0), LAT_LONG_SENTINEL_KEY);
    }

    #[test]
    fn lat_long_key_never_collides_with_string_keys() {
        let key = lat_long_key(1.0, 2.0);
        assert!(key.contains(':'));
        assert!(!normalize("1dot000000:2dot000000").contains(':'));
    }
}
