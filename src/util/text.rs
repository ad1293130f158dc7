use std::borrow::Cow;

/// Returns true for characters XML 1.0 does not allow anywhere in a document.
///
/// Allowed: tab, LF, CR, U+0020..=U+D7FF, U+E000..=U+FFFD, U+10000 and up.
/// Rust `char`s never hold surrogates, so only the C0 controls and the two
/// non-characters at the top of the BMP need rejecting.
fn is_xml_forbidden(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}')
}

/// Removes characters that cannot appear in an XML 1.0 document.
///
/// Scraped pages and feed text occasionally carry stray control bytes. Left
/// in, they make the whole output document unparseable, so every piece of
/// text is passed through here before it is written.
///
/// # Examples
///
/// ```
/// use enrichfeed::util::strip_xml_invalid_chars;
///
/// assert_eq!(strip_xml_invalid_chars("a\u{1}b\tc"), "ab\tc");
/// assert_eq!(strip_xml_invalid_chars("plain"), "plain");
/// ```
pub fn strip_xml_invalid_chars(s: &str) -> Cow<'_, str> {
    // Fast path: nothing to strip
    if !s.chars().any(is_xml_forbidden) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.chars().filter(|&c| !is_xml_forbidden(c)).collect())
}
