//! Literal escaping and selector builders

use std::fmt::Write;

/// Escape a value for use inside a quoted selector literal.
///
/// Quotes become `&apos;`/`&quot;` so the literal can never terminate early;
/// `&`, `<` and `>` are escaped too so that [`unescape`] is an exact inverse.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape`]. Unknown entities are left as they are.
#[must_use]
pub fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let entity = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&apos;", '\''),
            ("&quot;", '"'),
        ]
        .into_iter()
        .find(|(name, _)| rest.starts_with(name));
        match entity {
            Some((name, c)) => {
                out.push(c);
                rest = &rest[name.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Build `tag[@k1='v1'][@k2='v2']...`.
pub fn attr_selector<'a, I>(tag: &str, pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut selector = tag.to_string();
    for (key, value) in pairs {
        push_attr_predicate(&mut selector, key, value);
    }
    selector
}

/// Append `[@key='value']` to a selector under construction.
pub fn push_attr_predicate(selector: &mut String, key: &str, value: &str) {
    // Writing to a String cannot fail
    let _ = write!(selector, "[@{key}='{}']", escape(value));
}
