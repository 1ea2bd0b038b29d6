//! Metric name normalization.
//!
//! ClickHouse reports identifiers such as `HTTPConnection`, `MarkCacheBytes` or
//! `jemalloc.arenas.all.pactive`. Prometheus wants `snake_case` with `_` as the only
//! separator, so `HTTPServer.Load` becomes `http_server_load`.

const SEPARATOR: char = '_';

/// Convert a ClickHouse identifier into a Prometheus metric name fragment.
///
/// A separator goes in front of an uppercase character that starts a new word: it is
/// followed by a lowercase character, or preceded by one. Runs of capitals stay
/// together (`HTTP`), everything is lower-cased and any character outside
/// `[a-zA-Z0-9_:]` (`.`, `-`, `/`, spaces, non-ASCII) becomes `_`.
///
/// The result is lowercase ASCII made of valid name characters only, so normalizing it
/// again returns it unchanged.
#[must_use]
pub fn normalize(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    let mut out = String::with_capacity(identifier.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars.get(i - 1).copied();
            let next = chars.get(i + 1).copied();

            let starts_word = next.is_some_and(char::is_lowercase)
                || prev.is_some_and(char::is_lowercase);

            // Never stack a separator on top of an existing one (`Foo.Bar`, `Foo_Bar`, `Foo-Bar`).
            let after_separator = prev.is_some_and(|p| !p.is_alphanumeric());

            if starts_word && !after_separator {
                out.push(SEPARATOR);
            }
        }

        out.extend(c.to_lowercase());
    }

    out.chars()
        .map(|c| if is_name_char(c) { c } else { SEPARATOR })
        .collect()
}

/// Characters Prometheus accepts in a metric name.
const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}
