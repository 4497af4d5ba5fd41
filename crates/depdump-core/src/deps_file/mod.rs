//! Static evaluation of gclient-style `DEPS` files.
//!
//! A DEPS file is written in a small declarative subset of Python:
//! assignments of literals, `Var('name')` lookups into the module's `vars`
//! dict, `Str(...)` conversions and string concatenation. This module reads
//! that subset as data, so loading a DEPS file never executes code.
//!
//! ```
//! use depdump_core::deps_file;
//!
//! let namespace = deps_file::evaluate(
//!     "vars = {'git': 'https://example.com'}\n\
//!      deps = {'src/foo': Var('git') + '/foo.git@abc123'}\n",
//! )
//! .unwrap();
//!
//! let deps = namespace.get("deps").unwrap().to_json().unwrap();
//! assert_eq!(deps["src/foo"], "https://example.com/foo.git@abc123");
//! ```

mod interpreter;
mod lexer;
mod value;

pub use value::DepsValue;

use std::fmt;
use thiserror::Error;

/// Whether a DEPS file failed to parse or failed while being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepsFileErrorKind {
    /// The source is not valid DEPS syntax.
    Syntax,
    /// The source parsed but an expression could not be evaluated.
    Runtime,
}

impl fmt::Display for DepsFileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepsFileErrorKind::Syntax => f.write_str("syntax error"),
            DepsFileErrorKind::Runtime => f.write_str("evaluation error"),
        }
    }
}

/// A positioned DEPS file failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at line {line}, column {column}: {message}")]
pub struct DepsFileError {
    /// Syntax or evaluation failure.
    pub kind: DepsFileErrorKind,
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
    /// Description of the failure.
    pub message: String,
}

impl DepsFileError {
    pub(crate) fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            kind: DepsFileErrorKind::Syntax,
            line,
            column,
            message: message.into(),
        }
    }

    pub(crate) fn runtime(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            kind: DepsFileErrorKind::Runtime,
            line,
            column,
            message: message.into(),
        }
    }
}

/// Top-level names bound by a DEPS file, in first-assignment order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    entries: Vec<(String, DepsValue)>,
}

impl Namespace {
    /// Value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&DepsValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Bound names in first-assignment order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no names are bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, value: DepsValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }
}

/// Evaluates DEPS source and returns the names it binds.
///
/// # Errors
/// Returns a [`DepsFileError`] with the line and column of the first syntax
/// or evaluation failure.
pub fn evaluate(source: &str) -> Result<Namespace, DepsFileError> {
    let tokens = lexer::Lexer::new(source).tokenize()?;
    interpreter::Interpreter::new(tokens).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HELPER_PREAMBLE: &str = "\
# Helper function to process strings
def Str(value):
  return str(value)

# Helper function to access variables
def Var(value):
  return vars[value]

";

    fn deps_json(source: &str) -> serde_json::Value {
        evaluate(source).unwrap().get("deps").unwrap().to_json().unwrap()
    }

    #[test]
    fn test_var_and_concatenation() {
        let source = r#"
vars = {
  'chromium_git': 'https://chromium.googlesource.com',
  'pdfium_revision': '6d0a3d5365d04967d67399617acc16bc7e7efe52',
}

deps = {
  'src/third_party/pdfium':
    Var('chromium_git') + '/pdfium.git' + '@' + Var('pdfium_revision'),
  'src/buildtools': {
    'url': Var('chromium_git') + '/buildtools.git@' + 'abc',
    'condition': 'checkout_linux',
  },
}
"#;
        assert_eq!(
            deps_json(source),
            json!({
                "src/third_party/pdfium": "https://chromium.googlesource.com/pdfium.git@6d0a3d5365d04967d67399617acc16bc7e7efe52",
                "src/buildtools": {
                    "url": "https://chromium.googlesource.com/buildtools.git@abc",
                    "condition": "checkout_linux",
                },
            })
        );
    }

    #[test]
    fn test_helper_preamble_is_accepted() {
        let source = format!(
            "{HELPER_PREAMBLE}vars = {{'rev': 42}}\ndeps = {{'a': Str(Var('rev'))}}\n"
        );
        assert_eq!(deps_json(&source), json!({"a": "42"}));
    }

    #[test]
    fn test_order_follows_source() {
        let namespace = evaluate("use_relative_paths = True\nvars = {}\ndeps = {'z': 1, 'a': 2, 'm': 3}\n").unwrap();
        let names: Vec<&str> = namespace.names().collect();
        assert_eq!(names, ["use_relative_paths", "vars", "deps"]);

        let deps = namespace.get("deps").unwrap().to_json().unwrap();
        let keys: Vec<&String> = deps.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_literals() {
        let source = "deps = {'list': [1, -2, 3.5,], 'tuple': (1,), 'empty': (), 'flags': [True, False, None], 'nested': {'k': ['v']}}";
        assert_eq!(
            deps_json(source),
            json!({
                "list": [1, -2, 3.5],
                "tuple": [1],
                "empty": [],
                "flags": [true, false, null],
                "nested": {"k": ["v"]},
            })
        );
    }

    #[test]
    fn test_names_refer_to_earlier_bindings() {
        let source = "base = {'a': 1}\nhosts = ['x'] + ['y']\ndeps = {'base': base, 'hosts': hosts, 'first': hosts[0]}\n";
        assert_eq!(
            deps_json(source),
            json!({"base": {"a": 1}, "hosts": ["x", "y"], "first": "x"})
        );
    }

    #[test]
    fn test_chained_assignment_and_rebinding() {
        let namespace = evaluate("a = b = 'x'\na = 'y'\n").unwrap();
        assert_eq!(namespace.get("a"), Some(&DepsValue::Str("y".into())));
        assert_eq!(namespace.get("b"), Some(&DepsValue::Str("x".into())));
        assert_eq!(namespace.names().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_duplicate_keys_keep_first_position() {
        assert_eq!(deps_json("deps = {'a': 1, 'b': 2, 'a': 3}"), json!({"a": 3, "b": 2}));
        let deps = deps_json("deps = {'a': 1, 'b': 2, 'a': 3}");
        let keys: Vec<&String> = deps.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn test_missing_var_is_runtime_error() {
        let err = evaluate("vars = {}\ndeps = {'a': Var('nope')}\n").unwrap_err();
        assert_eq!(err.kind, DepsFileErrorKind::Runtime);
        assert_eq!((err.line, err.column), (2, 14));
        assert!(err.message.contains("nope"));
    }

    #[test]
    fn test_var_without_vars_is_runtime_error() {
        let err = evaluate("deps = {'a': Var('x')}").unwrap_err();
        assert!(err.message.contains("'vars' is not defined"));
    }

    #[test]
    fn test_undefined_name() {
        let err = evaluate("deps = missing").unwrap_err();
        assert_eq!(err.kind, DepsFileErrorKind::Runtime);
        assert_eq!(err.to_string(), "evaluation error at line 1, column 8: name 'missing' is not defined");
    }

    #[test]
    fn test_unknown_function_call() {
        let err = evaluate("def Helper(x):\n  return x\ndeps = Helper(1)\n").unwrap_err();
        assert!(err.message.contains("cannot be evaluated"));

        let err = evaluate("deps = Other(1)").unwrap_err();
        assert!(err.message.contains("name 'Other' is not defined"));
    }

    #[test]
    fn test_type_errors() {
        let err = evaluate("deps = 'a' + 1").unwrap_err();
        assert!(err.message.contains("'str' and 'int'"));

        let err = evaluate("deps = {['a']: 1}").unwrap_err();
        assert!(err.message.contains("unhashable type: 'list'"));
    }

    #[test]
    fn test_unexpected_indent() {
        let err = evaluate("deps = {}\n  other = 1\n").unwrap_err();
        assert_eq!(err.kind, DepsFileErrorKind::Syntax);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unsupported_statements() {
        let err = evaluate("import os\n").unwrap_err();
        assert_eq!(err.kind, DepsFileErrorKind::Syntax);
        assert!(err.message.contains("'import'"));

        assert!(evaluate("a = 1; b = 2\n").is_err());
        assert!(evaluate("f(x=1)\n").is_err());
    }

    #[test]
    fn test_set_literal_evaluates_but_is_not_serializable() {
        let namespace = evaluate("allowed_hosts = {'a', 'b', 'a'}\ndeps = {}\n").unwrap();
        let hosts = namespace.get("allowed_hosts").unwrap();
        assert_eq!(
            hosts,
            &DepsValue::Set(vec![DepsValue::Str("a".into()), DepsValue::Str("b".into())])
        );
        assert!(hosts.to_json().is_err());
        assert_eq!(namespace.get("deps").unwrap().to_json().unwrap(), json!({}));
    }

    #[test]
    fn test_docstring_expression_is_discarded() {
        let namespace = evaluate("'''Module docstring.'''\ndeps = {}\n").unwrap();
        assert_eq!(namespace.len(), 1);
    }

    #[test]
    fn test_helper_bodies_with_arbitrary_syntax() {
        let source = "\
def Var(value):
  return vars.get(value)

def Str(value: str) -> str:
  return '%s' % value if value is not None else ''

def Lookup(*args, **kwargs):
  return {k: v for k, v in kwargs.items() if v | 0 > 1 and not k != 'x'}

vars = {'a': 'x'}
deps = {'k': 'v', 'a': Var('a')}
";
        let namespace = evaluate(source).unwrap();
        assert_eq!(namespace.names().collect::<Vec<_>>(), ["vars", "deps"]);
        assert_eq!(
            namespace.get("deps").unwrap().to_json().unwrap(),
            json!({"k": "v", "a": "x"})
        );
    }

    #[test]
    fn test_def_without_name_is_syntax_error() {
        let err = evaluate("def (x):\n  pass\n").unwrap_err();
        assert_eq!(err.kind, DepsFileErrorKind::Syntax);
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn test_numeric_keys_collapse_like_python() {
        let deps = deps_json("deps = {1: 'a', 'x': 0, True: 'b', 1.0: 'c'}");
        assert_eq!(deps, json!({"1": "c", "x": 0}));
        let keys: Vec<&String> = deps.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["1", "x"]);

        let namespace = evaluate("hosts = {1, True, 2}\n").unwrap();
        assert_eq!(
            namespace.get("hosts"),
            Some(&DepsValue::Set(vec![DepsValue::Int(1), DepsValue::Int(2)]))
        );

        let source = "vars = {1: 'one'}\ndeps = {'a': Var(True), 'b': vars[1.0]}\n";
        assert_eq!(deps_json(source), json!({"a": "one", "b": "one"}));
    }

    #[test]
    fn test_integers_outside_i64() {
        let deps = deps_json("deps = {'max': 18446744073709551615, 'min': -9223372036854775808}");
        assert_eq!(deps, json!({"max": u64::MAX, "min": i64::MIN}));

        let namespace = evaluate("deps = {'huge': 200000000000000000000000}").unwrap();
        let err = namespace.get("deps").unwrap().to_json().unwrap_err();
        assert!(err.contains("64 bits"));
    }

    #[test]
    fn test_empty_source_binds_nothing() {
        let namespace = evaluate("# only a comment\n\n").unwrap();
        assert!(namespace.is_empty());
        assert_eq!(namespace.len(), 0);
    }
}
