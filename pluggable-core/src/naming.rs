//! Canonical plugin name <-> relative unit path conversion
//!
//! `Foo::FooBar` lives at `foo/foo_bar`. Conversion is best-effort: names and
//! paths that don't follow the capitalized-word convention convert without
//! error but may not round-trip.

/// Separator between segments of a canonical name
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Convert a canonical name to its relative path (no extension).
///
/// `Foo::FooBar` => `foo/foo_bar`
pub fn name_to_path(name: &str) -> String {
    name.split(NAMESPACE_SEPARATOR)
        .map(|segment| {
            words(segment)
                .iter()
                .map(|word| word.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join("_")
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Convert a relative path (no extension) to its canonical name.
///
/// `foo/foo_bar` => `Foo::FooBar`
pub fn path_to_name(path: &str) -> String {
    path.split('/')
        .map(|segment| segment.split('_').map(capitalize).collect::<String>())
        .collect::<Vec<_>>()
        .join(NAMESPACE_SEPARATOR)
}

/// Drop a leading load-order hint from a file stem.
///
/// `10_test` => `_test`, which converts to the same name as `test`.
pub fn strip_order_prefix(stem: &str) -> &str {
    stem.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// Identifier of the type a unit must export for `name`: its last segment.
pub fn type_identifier(name: &str) -> &str {
    name.rsplit(NAMESPACE_SEPARATOR).next().unwrap_or(name)
}

/// Words of a name segment: runs starting with an ASCII uppercase letter
/// followed by ASCII lowercase letters or digits. Anything else is dropped.
fn words(segment: &str) -> Vec<&str> {
    let bytes = segment.as_bytes();
    let mut words = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_uppercase() {
            i += 1;
            continue;
        }
        let start = i;
        i += 1;
        while i < bytes.len() && (bytes[i].is_ascii_lowercase() || bytes[i].is_ascii_digit()) {
            i += 1;
        }
        words.push(&segment[start..i]);
    }

    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
