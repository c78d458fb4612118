//! Shell quoting for values interpolated into generated scripts
//!
//! Versions, repository URLs, build options and package names all end up as
//! words on a bash command line. Anything outside a conservative set of
//! characters is single-quoted with the `shell-escape` crate so it stays one
//! argument and can never start a new command.

use shell_escape::escape;
use std::borrow::Cow;

/// Characters that never need quoting as part of a bash word
fn is_plain(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '=' | '/' | ',' | '.' | '+' | ':' | '@' | '%')
}

/// Quotes `token` as a single shell word
///
/// Plain tokens (paths, URLs, dotted versions) are returned unchanged, so
/// ordinary scripts read exactly as they would if written by hand.
pub fn quote(token: &str) -> Cow<'_, str> {
    if !token.is_empty() && token.chars().all(is_plain) {
        Cow::Borrowed(token)
    } else {
        escape(Cow::Borrowed(token))
    }
}
