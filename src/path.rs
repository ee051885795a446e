//! URL template substitution.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::types::PathParams;

/// Characters left unescaped in a URI component: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single URI component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Substitute `{name}` placeholders in a URL template.
///
/// Each placeholder with a matching parameter is replaced by the
/// percent-encoded value, at every occurrence. Placeholders without a
/// parameter are left in the result literally.
pub fn fill_path(template: &str, params: Option<&PathParams>) -> String {
    let Some(params) = params else {
        return template.to_string();
    };

    let mut path = template.to_string();
    for (name, value) in params {
        let placeholder = format!("{{{}}}", name);
        if path.contains(&placeholder) {
            path = path.replace(&placeholder, &encode_component(&value.to_string()));
        }
    }
    path
}

/// Names of placeholders still present in a URL.
pub fn unresolved_placeholders(url: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = url;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if !name.is_empty() && !name.contains('{') {
                    names.push(name);
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}
