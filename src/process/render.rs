// Response renderer
//
// Turns a combined nREPL response into the bytes a terminal REPL would
// print, ending with the `<ns>=>` prompt. Also owns the session's current
// namespace, which the request builder reads to prefix every submission.

use std::fmt::Write as _;

use crate::config::constants::{INITIAL_NAMESPACE, PROMPT_MARKER};
use crate::errors::{BridgeError, Result};
use crate::nrepl::{CombinedResponse, Value};

#[derive(Debug, Clone)]
pub struct Renderer {
    namespace: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_namespace(INITIAL_NAMESPACE)
    }

    pub fn with_namespace(ns: impl Into<String>) -> Self {
        Self {
            namespace: ns.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Wrap user code so it always runs in the namespace the user sees.
    pub fn wrap_code(&self, expr: &str) -> String {
        format!("(do (ns {})\n{})", self.namespace, expr)
    }

    /// Render `response` as console bytes.
    ///
    /// Order: out, err, first value + newline, namespace update, prompt.
    pub fn render(&mut self, response: &CombinedResponse) -> Result<Vec<u8>> {
        let mut text = String::new();

        if let Some(out) = response.out() {
            text.push_str(decode(out, &text)?);
        }
        if let Some(err) = response.err() {
            text.push_str(decode(err, &text)?);
        }
        if let Some(first) = response.values().and_then(|values| values.first()) {
            match first {
                Value::Bytes(bytes) => text.push_str(decode(bytes, &text)?),
                Value::Int(n) => {
                    let _ = write!(text, "{}", n);
                }
                other => {
                    let _ = write!(text, "{:?}", other);
                }
            }
            text.push('\n');
        }
        if let Some(ns) = response.ns() {
            self.namespace = decode(ns, &text)?.to_string();
        }
        text.push_str(&self.namespace);
        text.push_str(PROMPT_MARKER);

        Ok(text.into_bytes())
    }
}

fn decode<'a>(bytes: &'a [u8], partial: &str) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|_| BridgeError::Encoding {
        partial: partial.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(pairs: Vec<(&str, Value)>) -> CombinedResponse {
        pairs.into_iter().collect()
    }

    fn values(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    fn render_str(renderer: &mut Renderer, resp: &CombinedResponse) -> String {
        String::from_utf8(renderer.render(resp).unwrap()).unwrap()
    }

    #[test]
    fn test_value_and_ns() {
        let mut r = Renderer::new();
        let resp = response(vec![("value", values(&["6"])), ("ns", "user".into())]);
        assert_eq!(render_str(&mut r, &resp), "6\nuser=>");
    }

    #[test]
    fn test_out_then_value() {
        let mut r = Renderer::new();
        let resp = response(vec![("out", "hi\n".into()), ("value", values(&["nil"]))]);
        assert_eq!(render_str(&mut r, &resp), "hi\nnil\nuser=>");
    }

    #[test]
    fn test_err_only() {
        let mut r = Renderer::new();
        let resp = response(vec![("err", "boom\n".into())]);
        assert_eq!(render_str(&mut r, &resp), "boom\nuser=>");
    }

    #[test]
    fn test_full_order() {
        let mut r = Renderer::new();
        let resp = response(vec![
            ("value", values(&["1", "2"])),
            ("err", "E".into()),
            ("out", "O".into()),
            ("ns", "a.b".into()),
        ]);
        assert_eq!(render_str(&mut r, &resp), "OE1\na.b=>");
    }

    #[test]
    fn test_ns_change_sticks() {
        let mut r = Renderer::new();
        let resp = response(vec![("ns", "my.ns".into()), ("value", values(&["nil"]))]);
        assert_eq!(render_str(&mut r, &resp), "nil\nmy.ns=>");
        assert_eq!(r.namespace(), "my.ns");

        // Later responses without ns keep the prompt
        let next = response(vec![("value", values(&["1"]))]);
        assert_eq!(render_str(&mut r, &next), "1\nmy.ns=>");
        assert_eq!(r.wrap_code("(+ 1 1)"), "(do (ns my.ns)\n(+ 1 1))");
    }

    #[test]
    fn test_always_ends_with_prompt() {
        let samples = vec![
            response(vec![]),
            response(vec![("out", "x".into())]),
            response(vec![("err", "y".into()), ("value", values(&["z"]))]),
            response(vec![("value", Value::List(vec![]))]),
            response(vec![("ns", "other".into())]),
            response(vec![("status", values(&["done"]))]),
        ];
        let mut r = Renderer::new();
        for resp in &samples {
            let text = render_str(&mut r, resp);
            let expected_suffix = format!("{}=>", r.namespace());
            assert!(text.ends_with(&expected_suffix), "{:?} lacks prompt", text);
        }
    }

    #[test]
    fn test_ns_tag_always_becomes_current() {
        for ns in ["user", "clojure.core", "a-b.c_d", "λ.ns"] {
            let mut r = Renderer::with_namespace("start");
            r.render(&response(vec![("ns", ns.into())])).unwrap();
            assert_eq!(r.namespace(), ns);
        }
    }

    #[test]
    fn test_integer_value() {
        let mut r = Renderer::new();
        let resp = response(vec![("value", Value::List(vec![Value::Int(42)]))]);
        assert_eq!(render_str(&mut r, &resp), "42\nuser=>");
    }

    #[test]
    fn test_invalid_utf8_reports_partial() {
        let mut r = Renderer::new();
        let resp = response(vec![
            ("out", "ok ".into()),
            ("err", Value::Bytes(vec![0xc3, 0x28])),
        ]);
        match r.render(&resp) {
            Err(BridgeError::Encoding { partial }) => assert_eq!(partial, "ok "),
            other => panic!("Expected encoding error, got {:?}", other),
        }
        // A failed render leaves the namespace alone
        assert_eq!(r.namespace(), "user");
    }
}
