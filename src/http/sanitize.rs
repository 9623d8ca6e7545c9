//! Removal of `Keep-Alive: timeout=N` header lines.
//!
//! This is cosmetic: framing never depends on the removed lines.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::bytes::{NoExpand, Regex};

static KEEP_ALIVE_TIMEOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)keep-alive: timeout=\d+\r\n").expect("keep-alive pattern is valid")
});

/// Strip every `Keep-Alive: timeout=<digits>\r\n` occurrence, case-insensitively.
///
/// Borrows `chunk` when nothing matched.
pub fn strip_keep_alive(chunk: &[u8]) -> Cow<'_, [u8]> {
    KEEP_ALIVE_TIMEOUT.replace_all(chunk, NoExpand(b""))
}
