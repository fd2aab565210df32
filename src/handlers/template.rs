//! `@name` placeholder substitution.

use crate::handlers::params::{ParamValue, Parameters};

/// How substituted values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Raw text (URLs, cache keys, outbound bodies).
    Raw,
    /// JSON literals: strings quoted and escaped (document queries).
    Json,
}

/// Replace every `@identifier` that names a parameter. The identifier is the
/// longest run of ASCII alphanumerics and `_`; unknown names stay as written.
pub fn substitute(template: &str, params: &Parameters, quoting: Quoting) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..len];

        match params.get(name).filter(|_| !name.is_empty()) {
            Some(value) => out.push_str(&render(value, quoting)),
            None => {
                out.push('@');
                out.push_str(name);
            }
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

fn render(value: &ParamValue, quoting: Quoting) -> String {
    match (quoting, value) {
        (Quoting::Raw, v) => v.to_text(),
        (Quoting::Json, ParamValue::Text(s)) => serde_json::Value::String(s.clone()).to_string(),
        (Quoting::Json, v) => v.to_json().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> Parameters {
        let mut p = Parameters::default();
        p.insert("id", ParamValue::Text("42".into()));
        p.insert("ident", ParamValue::Text("long".into()));
        p.insert("name", ParamValue::Text("O\"Neil".into()));
        p.insert("limit", ParamValue::Json(json!(5)));
        p
    }

    #[test]
    fn test_raw_substitution() {
        assert_eq!(
            substitute("http://svc/users/@ID/@ident?x=@missing", &params(), Quoting::Raw),
            "http://svc/users/42/long?x=@missing"
        );
    }

    #[test]
    fn test_json_quoting() {
        assert_eq!(
            substitute(r#"[{"$match":{"name":@name}},{"$limit":@limit}]"#, &params(), Quoting::Json),
            r#"[{"$match":{"name":"O\"Neil"}},{"$limit":5}]"#
        );
    }

    #[test]
    fn test_lone_at_sign() {
        assert_eq!(substitute("a@ b@", &params(), Quoting::Raw), "a@ b@");
    }
}
