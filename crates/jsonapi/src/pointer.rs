//! JSON Pointer (RFC 6901) formatting for error sources.
//!
//! Decode failures report where in the request document they happened, and
//! the errors document names that place with `source.pointer`.

use std::borrow::Cow;

/// Escapes one reference token.
///
/// `~` becomes `~0` and `/` becomes `~1`, in that order.
///
/// ```
/// use jsonapi::pointer::escape_token;
///
/// assert_eq!(escape_token("a/b"), "a~1b");
/// assert_eq!(escape_token("m~n"), "m~0n");
/// assert_eq!(escape_token("title"), "title");
/// ```
pub fn escape_token(token: &str) -> Cow<'_, str> {
    if !token.contains(['~', '/']) {
        return Cow::Borrowed(token);
    }
    Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
}

/// Formats reference tokens into a pointer string.
///
/// The root path formats as the empty string.
pub fn format_pointer<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push('/');
        out.push_str(&escape_token(token.as_ref()));
    }
    out
}

/// Pointer under construction, built leaf first while an error unwinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerBuf {
    tokens: Vec<String>,
}

impl PointerBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends tokens in front of the current path.
    pub fn prefix<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut head: Vec<String> = tokens.into_iter().map(Into::into).collect();
        head.append(&mut self.tokens);
        self.tokens = head;
        self
    }
}

impl std::fmt::Display for PointerBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_pointer(&self.tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_token() {
        assert_eq!(escape_token("foo"), "foo");
        assert_eq!(escape_token("a~b/c"), "a~0b~1c");
        assert_eq!(escape_token("~1"), "~01");
        assert_eq!(escape_token("//"), "~1~1");
    }

    #[test]
    fn test_format_pointer() {
        assert_eq!(format_pointer::<&str>(&[]), "");
        assert_eq!(format_pointer(&["data"]), "/data");
        assert_eq!(
            format_pointer(&["data", "attributes", "created/at"]),
            "/data/attributes/created~1at"
        );
        assert_eq!(format_pointer(&[""]), "/");
    }

    #[test]
    fn test_prefix_builds_leaf_first() {
        let ptr = PointerBuf::new()
            .prefix(["title"])
            .prefix(["attributes"])
            .prefix(["data", "3"]);
        assert_eq!(ptr.to_string(), "/data/3/attributes/title");
        assert_eq!(PointerBuf::new().to_string(), "");
    }
}
