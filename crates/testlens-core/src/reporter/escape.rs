//! Attribute value escaping for the reporting protocol.

/// Marker text standing in for `@`, which would otherwise open a new frame.
pub const AT_SIGN_ENTITY: &str = "&#x40;";

/// Escape a value for embedding between double quotes in a frame.
///
/// Produces valid JSON string content, except that `@` is written as
/// [`AT_SIGN_ENTITY`] so a frame payload never contains `@`.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '"' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\u{8}' => escaped.push_str("\\b"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\u{c}' => escaped.push_str("\\f"),
            '\r' => escaped.push_str("\\r"),
            '@' => escaped.push_str(AT_SIGN_ENTITY),
            c if c < ' ' => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Undo the `@` substitution on a value already decoded from JSON.
pub fn restore_at_signs(value: &str) -> String {
    value.replace(AT_SIGN_ENTITY, "@")
}
