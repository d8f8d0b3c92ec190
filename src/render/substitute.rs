//! `{{ expression }}` substitution in text runs and attribute values.

use crate::eval::{Env, EvalError, ExpressionEvaluator};

/// A piece of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// Source between `{{` and `}}`, untrimmed.
    Expr(&'a str),
}

/// Byte offset of the `}}` closing an expression that starts at the
/// beginning of `rest`. Braces inside the expression nest, and braces inside
/// string literals are ignored.
fn closing(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                b'}' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Split `text` into literal runs and `{{ }}` expressions. An unterminated
/// `{{` leaves the rest of the text literal.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let body = &rest[open + 2..];
        let Some(close) = closing(body) else {
            break;
        };
        if open > 0 {
            out.push(Segment::Literal(&rest[..open]));
        }
        out.push(Segment::Expr(&body[..close]));
        rest = &body[close + 2..];
    }
    if !rest.is_empty() {
        out.push(Segment::Literal(rest));
    }
    out
}

/// Whether `text` holds at least one complete `{{ }}` marker.
pub fn has_markers(text: &str) -> bool {
    segments(text).iter().any(|s| matches!(s, Segment::Expr(_)))
}

/// Replace every `{{ expr }}` in `text` with the evaluated value. `None`
/// renders empty, anything else like Python's `str()`.
pub fn substitute(
    text: &str,
    evaluator: &dyn ExpressionEvaluator,
    env: &Env,
) -> Result<String, EvalError> {
    if !text.contains("{{") {
        return Ok(text.to_owned());
    }
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Expr(source) => out.push_str(&evaluator.evaluate(source, env)?.to_text()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::eval::{SafeEval, Value};
    use crate::vars;

    #[test]
    fn splits_markers() {
        assert_eq!(
            segments("Hello {{ name }}!"),
            vec![
                Segment::Literal("Hello "),
                Segment::Expr(" name "),
                Segment::Literal("!"),
            ]
        );
        assert_eq!(segments("{{a}}{{b}}"), vec![Segment::Expr("a"), Segment::Expr("b")]);
        assert!(segments("").is_empty());
    }

    #[test]
    fn nested_braces_and_quotes() {
        assert_eq!(
            segments("{{ f\"{x}\" }}|{{ '}}' }}"),
            vec![
                Segment::Expr(" f\"{x}\" "),
                Segment::Literal("|"),
                Segment::Expr(" '}}' "),
            ]
        );
        assert_eq!(segments("{{ {'a': 1}['a'] }}"), vec![Segment::Expr(" {'a': 1}['a'] ")]);
    }

    #[test]
    fn unterminated_marker_is_literal() {
        assert_eq!(
            segments("a {{ b }} c {{ d"),
            vec![
                Segment::Literal("a "),
                Segment::Expr(" b "),
                Segment::Literal(" c {{ d"),
            ]
        );
        assert!(!has_markers("{{ open"));
        assert!(has_markers("x {{ y }}"));
    }

    #[test]
    fn substitutes_values() {
        let eval = SafeEval::new();
        let env = vars! { "value" => "World", "n" => 2, "missing" => Value::None };
        assert_eq!(
            substitute("Hello {{ value }} x{{ n * 3 }}{{ missing }}{{ nope }}", &eval, &env).unwrap(),
            "Hello World x6"
        );
        assert_eq!(substitute("plain", &eval, &env).unwrap(), "plain");
    }

    #[test]
    fn errors_propagate() {
        let eval = SafeEval::new();
        assert!(matches!(
            substitute("{{ 1 + }}", &eval, &Env::new()),
            Err(EvalError::Syntax { .. })
        ));
    }
}
