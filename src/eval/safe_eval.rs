//! Tree-walking interpreter over the closed expression subset.
//!
//! Only the node kinds matched in [`SafeEval::eval`] run. Everything else the
//! parser accepts (displays, lambdas, `**`, bitwise operators, ...) fails
//! with [`EvalError::UnsupportedSyntax`]. Calls are limited to the
//! evaluator's allow-list.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::ast::{BinOp, BoolOp, CmpOp, Expr, FStringPart, UnaryOp};
use super::builtins;
use super::parser::parse_expression;
use super::value::{Env, Num, Value};
use super::EvalError;
use crate::config::EvalLimits;

/// A function expressions may call by name.
pub type Callable = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// Upper bound on the size of a string or list built by `*` repetition.
const MAX_REPEAT_LEN: usize = 1 << 20;

// ---------------------------------------------------------------------------
// CompiledExpr
// ---------------------------------------------------------------------------

/// A parsed expression, reusable across environments.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    source: String,
    root: Expr,
}

impl CompiledExpr {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }
}

/// Input to [`SafeEval::execute`]: raw source or an already compiled expression.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Text(&'a str),
    Compiled(&'a CompiledExpr),
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Source::Text(text)
    }
}

impl<'a> From<&'a String> for Source<'a> {
    fn from(text: &'a String) -> Self {
        Source::Text(text)
    }
}

impl<'a> From<&'a CompiledExpr> for Source<'a> {
    fn from(expr: &'a CompiledExpr) -> Self {
        Source::Compiled(expr)
    }
}

// ---------------------------------------------------------------------------
// SafeEval
// ---------------------------------------------------------------------------

/// Restricted expression evaluator.
///
/// ```
/// use flare::eval::{SafeEval, Value};
/// use flare::vars;
///
/// let eval = SafeEval::new().allow("double", |args| {
///     Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
/// });
/// assert_eq!(eval.safe_eval("double(3)", &vars! {}).unwrap(), Value::Int(6));
/// ```
#[derive(Clone)]
pub struct SafeEval {
    callables: IndexMap<String, Callable>,
    limits: EvalLimits,
}

impl fmt::Debug for SafeEval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeEval")
            .field("callables", &self.callables.keys().collect::<Vec<_>>())
            .field("limits", &self.limits)
            .finish()
    }
}

impl Default for SafeEval {
    fn default() -> Self {
        Self::new()
    }
}

impl SafeEval {
    /// Evaluator allowing only the conversion builtins `str`, `int` and `float`.
    pub fn new() -> Self {
        Self {
            callables: builtins::defaults(),
            limits: EvalLimits::default(),
        }
    }

    /// Evaluator with no callables at all.
    pub fn empty() -> Self {
        Self {
            callables: IndexMap::new(),
            limits: EvalLimits::default(),
        }
    }

    /// Add (or replace) an allowed callable (builder).
    pub fn allow<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.callables.insert(name.into(), Arc::new(func));
        self
    }

    /// Add every callable of `callables`, replacing same-named ones (builder).
    pub fn with_callables(mut self, callables: impl IntoIterator<Item = (String, Callable)>) -> Self {
        self.callables.extend(callables);
        self
    }

    /// Set the compile-time limits (builder).
    pub fn with_limits(mut self, limits: EvalLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> EvalLimits {
        self.limits
    }

    /// Whether `name` may be called.
    pub fn is_allowed(&self, name: &str) -> bool {
        self.callables.contains_key(name)
    }

    /// Parse `source` into a reusable [`CompiledExpr`].
    pub fn compile(&self, source: &str) -> Result<CompiledExpr, EvalError> {
        if let Err((length, brackets)) = self.limits.check(source) {
            return Err(EvalError::LimitExceeded {
                length,
                max_length: self.limits.max_length,
                brackets,
                max_brackets: self.limits.max_brackets,
            });
        }
        let root = parse_expression(source.trim())?;
        let depth = root.depth();
        if depth > self.limits.max_depth {
            return Err(EvalError::TooDeep {
                depth,
                max_depth: self.limits.max_depth,
            });
        }
        Ok(CompiledExpr {
            source: source.to_owned(),
            root,
        })
    }

    /// Evaluate an expression against `env`, compiling it first if needed.
    pub fn execute<'a>(&self, expr: impl Into<Source<'a>>, env: &Env) -> Result<Value, EvalError> {
        match expr.into() {
            Source::Compiled(compiled) => self.eval(&compiled.root, env),
            Source::Text(text) => {
                let compiled = self.compile(text)?;
                self.eval(&compiled.root, env)
            }
        }
    }

    /// One-shot compile and execute.
    pub fn safe_eval(&self, source: &str, env: &Env) -> Result<Value, EvalError> {
        self.execute(source, env)
    }

    fn eval(&self, expr: &Expr, env: &Env) -> Result<Value, EvalError> {
        match expr {
            Expr::Constant(value) => Ok(value.clone()),
            Expr::FString(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        FStringPart::Literal(text) => out.push_str(text),
                        FStringPart::Expr(inner) => out.push_str(&self.eval(inner, env)?.to_string()),
                    }
                }
                Ok(Value::Str(out))
            }
            Expr::Name(name) => Ok(env.get(name).cloned().unwrap_or_default()),
            Expr::Subscript { value, index } => {
                let container = self.eval(value, env)?;
                let key = self.eval(index, env)?;
                Ok(container.get_item(&key))
            }
            Expr::Attribute { value, attr } => Ok(self.eval(value, env)?.get_attr(attr)),
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, env)?;
                unary(*op, operand)
            }
            Expr::Binary { op, left, right } => {
                if !matches!(op, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div) {
                    return Err(EvalError::UnsupportedSyntax(format!("operator '{}'", op.symbol())));
                }
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary(*op, &left, &right)
            }
            Expr::Compare { left, comparisons } => {
                let mut current = self.eval(left, env)?;
                for (op, right) in comparisons {
                    let right = self.eval(right, env)?;
                    if !compare(*op, &current, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    current = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::BoolOp { op, values } => {
                let mut last = Value::None;
                for value in values {
                    last = self.eval(value, env)?;
                    let decided = match op {
                        BoolOp::And => !last.is_truthy(),
                        BoolOp::Or => last.is_truthy(),
                    };
                    if decided {
                        break;
                    }
                }
                Ok(last)
            }
            Expr::IfExp { test, body, orelse } => {
                if self.eval(test, env)?.is_truthy() {
                    self.eval(body, env)
                } else {
                    self.eval(orelse, env)
                }
            }
            Expr::Call { func, args, keywords } => {
                let Expr::Name(name) = func.as_ref() else {
                    return Err(EvalError::UnsupportedSyntax("call of a non-name expression".into()));
                };
                let Some(callable) = self.callables.get(name) else {
                    return Err(EvalError::NameNotAllowed(name.clone()));
                };
                if !keywords.is_empty() {
                    return Err(EvalError::UnsupportedSyntax("keyword arguments".into()));
                }
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<Result<Vec<_>, _>>()?;
                callable(&args)
            }
            Expr::List(_) => Err(EvalError::UnsupportedSyntax("list display".into())),
            Expr::Tuple(_) => Err(EvalError::UnsupportedSyntax("tuple display".into())),
            Expr::Set(_) => Err(EvalError::UnsupportedSyntax("set display".into())),
            Expr::Dict(_) => Err(EvalError::UnsupportedSyntax("dict display".into())),
            Expr::Slice { .. } => Err(EvalError::UnsupportedSyntax("slice".into())),
            Expr::Lambda { .. } => Err(EvalError::UnsupportedSyntax("lambda".into())),
            Expr::NamedExpr { .. } => Err(EvalError::UnsupportedSyntax("assignment expression".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

fn bad_operand(op: &str, value: &Value) -> EvalError {
    EvalError::Type(format!("bad operand type for unary {op}: '{}'", value.type_name()))
}

fn unsupported_operands(op: BinOp, left: &Value, right: &Value) -> EvalError {
    EvalError::Type(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Neg => match operand.as_num() {
            Some(Num::Int(i)) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvalError::Overflow("unary -".into())),
            Some(Num::Float(f)) => Ok(Value::Float(-f)),
            None => Err(bad_operand("-", &operand)),
        },
        UnaryOp::Pos => match operand.as_num() {
            Some(Num::Int(i)) => Ok(Value::Int(i)),
            Some(Num::Float(f)) => Ok(Value::Float(f)),
            None => Err(bad_operand("+", &operand)),
        },
        UnaryOp::Invert => Err(EvalError::UnsupportedSyntax("operator '~'".into())),
    }
}

fn int_op(op: BinOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        _ => return Err(EvalError::UnsupportedSyntax(format!("operator '{}'", op.symbol()))),
    };
    result
        .map(Value::Int)
        .ok_or_else(|| EvalError::Overflow(format!("'{}'", op.symbol())))
}

fn repeat_count(count: i64, unit_len: usize) -> Result<usize, EvalError> {
    let count = usize::try_from(count.max(0)).unwrap_or(usize::MAX);
    match unit_len.checked_mul(count) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(count),
        _ => Err(EvalError::Overflow("sequence repetition".into())),
    }
}

fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (left.as_num(), right.as_num()) {
        return match (op, a, b) {
            (BinOp::Div, _, _) => {
                let divisor = b.as_f64();
                if divisor == 0.0 {
                    Err(EvalError::ZeroDivision)
                } else {
                    Ok(Value::Float(a.as_f64() / divisor))
                }
            }
            (_, Num::Int(x), Num::Int(y)) => int_op(op, x, y),
            (BinOp::Add, x, y) => Ok(Value::Float(x.as_f64() + y.as_f64())),
            (BinOp::Sub, x, y) => Ok(Value::Float(x.as_f64() - y.as_f64())),
            (BinOp::Mul, x, y) => Ok(Value::Float(x.as_f64() * y.as_f64())),
            _ => Err(unsupported_operands(op, left, right)),
        };
    }

    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.as_int().is_some() => {
            let count = repeat_count(n.as_int().unwrap_or(0), s.len())?;
            Ok(Value::Str(s.repeat(count)))
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items))
            if n.as_int().is_some() =>
        {
            let count = repeat_count(n.as_int().unwrap_or(0), items.len())?;
            let mut out = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                out.extend(items.iter().cloned());
            }
            Ok(Value::List(out))
        }
        _ => Err(unsupported_operands(op, left, right)),
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    use std::cmp::Ordering;

    let ordered = |accept: fn(Ordering) -> bool| -> Result<bool, EvalError> {
        Ok(left.py_cmp(right, op.symbol())?.is_some_and(accept))
    };
    match op {
        CmpOp::Eq => Ok(left.py_eq(right)),
        CmpOp::NotEq => Ok(!left.py_eq(right)),
        CmpOp::Lt => ordered(Ordering::is_lt),
        CmpOp::LtE => ordered(Ordering::is_le),
        CmpOp::Gt => ordered(Ordering::is_gt),
        CmpOp::GtE => ordered(Ordering::is_ge),
        CmpOp::In => right.contains(left),
        CmpOp::NotIn => right.contains(left).map(|found| !found),
        CmpOp::Is | CmpOp::IsNot => {
            Err(EvalError::UnsupportedSyntax(format!("operator '{}'", op.symbol())))
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vars;
    use pretty_assertions::assert_eq;

    fn eval(src: &str) -> Value {
        SafeEval::new().safe_eval(src, &Env::new()).unwrap()
    }

    fn eval_env(src: &str, env: &Env) -> Value {
        SafeEval::new().safe_eval(src, env).unwrap()
    }

    fn eval_err(src: &str) -> EvalError {
        SafeEval::new().safe_eval(src, &Env::new()).unwrap_err()
    }

    // ── Arithmetic ──────────────────────────────────────────────────

    #[test]
    fn integer_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(eval("10 - 4 - 3"), Value::Int(3));
        assert_eq!(eval("-5 + +2"), Value::Int(-3));
    }

    #[test]
    fn true_division_is_float() {
        assert_eq!(eval("7 / 2"), Value::Float(3.5));
        assert_eq!(eval("4 / 2"), Value::Float(2.0));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(eval_err("1 / 0"), EvalError::ZeroDivision);
        assert_eq!(eval_err("1 / 0.0"), EvalError::ZeroDivision);
    }

    #[test]
    fn mixed_numeric() {
        assert_eq!(eval("1 + 0.5"), Value::Float(1.5));
        assert_eq!(eval("True + 1"), Value::Int(2));
    }

    #[test]
    fn string_and_list_ops() {
        assert_eq!(eval("'ab' + 'cd'"), Value::from("abcd"));
        assert_eq!(eval("'ab' * 3"), Value::from("ababab"));
        assert_eq!(eval("2 * 'x'"), Value::from("xx"));
        assert_eq!(eval("'x' * -1"), Value::from(""));
        let env = vars! { "a" => vec![1], "b" => vec![2] };
        assert_eq!(eval_env("a + b", &env), Value::from(vec![1, 2]));
        assert_eq!(eval_env("a * 2", &env), Value::from(vec![1, 1]));
    }

    #[test]
    fn mismatched_operands_are_type_errors() {
        assert!(matches!(eval_err("1 + 'a'"), EvalError::Type(_)));
        assert!(matches!(eval_err("'a' - 'b'"), EvalError::Type(_)));
        assert!(matches!(eval_err("-'a'"), EvalError::Type(_)));
    }

    #[test]
    fn overflow_is_reported() {
        assert!(matches!(eval_err("9223372036854775807 + 1"), EvalError::Overflow(_)));
        assert!(matches!(eval_err("'x' * 100000000"), EvalError::Overflow(_)));
    }

    // ── Names and lookups ───────────────────────────────────────────

    #[test]
    fn missing_name_is_none() {
        assert_eq!(eval("nothing"), Value::None);
    }

    #[test]
    fn subscript_and_attribute_lookups() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"user": {"name": "Ada", "tags": ["a", "b"]}}"#).unwrap();
        let env = vars! { "data" => json };
        assert_eq!(eval_env("data['user']['name']", &env), Value::from("Ada"));
        assert_eq!(eval_env("data.user.name", &env), Value::from("Ada"));
        assert_eq!(eval_env("data.user.tags[-1]", &env), Value::from("b"));
        assert_eq!(eval_env("data.user.missing.deeper", &env), Value::None);
        assert_eq!(eval_env("data['nope'][3]", &env), Value::None);
    }

    // ── Comparisons and boolean logic ───────────────────────────────

    #[test]
    fn chained_comparison() {
        let env = vars! { "x" => 2 };
        assert_eq!(eval_env("1 < x < 3", &env), Value::Bool(true));
        assert_eq!(eval_env("1 < x < 2", &env), Value::Bool(false));
        // Short-circuits before the ill-typed second pair.
        assert_eq!(eval_env("3 < x < 'a'", &env), Value::Bool(false));
    }

    #[test]
    fn membership() {
        let env = vars! { "items" => vec!["a", "b"] };
        assert_eq!(eval_env("'a' in items", &env), Value::Bool(true));
        assert_eq!(eval_env("'c' not in items", &env), Value::Bool(true));
        assert_eq!(eval("'ell' in 'hello'"), Value::Bool(true));
    }

    #[test]
    fn ordering_type_error() {
        assert!(matches!(eval_err("1 < 'a'"), EvalError::Type(_)));
    }

    #[test]
    fn and_or_return_operands() {
        assert_eq!(eval("'' or 'default'"), Value::from("default"));
        assert_eq!(eval("'x' or 'default'"), Value::from("x"));
        assert_eq!(eval("0 and 'unused'"), Value::Int(0));
        assert_eq!(eval("1 and 'used'"), Value::from("used"));
        assert_eq!(eval("not 0"), Value::Bool(true));
    }

    #[test]
    fn and_short_circuits_errors() {
        assert_eq!(eval("0 and 1 / 0"), Value::Int(0));
        assert_eq!(eval("1 or undefined_call()"), Value::Int(1));
    }

    #[test]
    fn ternary() {
        assert_eq!(eval("'yes' if 1 > 0 else 'no'"), Value::from("yes"));
        assert_eq!(eval("'yes' if None else 'no'"), Value::from("no"));
    }

    #[test]
    fn fstring_evaluates_parts() {
        let env = vars! { "name" => "World", "n" => 2 };
        assert_eq!(eval_env("f'Hello {name}, {n + 1}!'", &env), Value::from("Hello World, 3!"));
    }

    // ── Calls and sandbox ───────────────────────────────────────────

    #[test]
    fn disallowed_call() {
        let err = SafeEval::empty()
            .execute("__import__('os')", &Env::new())
            .unwrap_err();
        assert_eq!(err, EvalError::NameNotAllowed("__import__".into()));
    }

    #[test]
    fn allowed_call() {
        let eval = SafeEval::empty().allow("double", |args: &[Value]| {
            Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
        });
        assert_eq!(eval.safe_eval("double(3)", &Env::new()).unwrap(), Value::Int(6));
    }

    #[test]
    fn default_builtins() {
        assert_eq!(eval("int('12') + 1"), Value::Int(13));
        assert_eq!(eval("str(1.0)"), Value::from("1.0"));
        assert_eq!(eval("float('2.5')"), Value::Float(2.5));
    }

    #[test]
    fn method_calls_are_unsupported() {
        let env = vars! { "s" => "abc" };
        let err = SafeEval::new().safe_eval("s.upper()", &env).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedSyntax(_)));
    }

    #[test]
    fn keyword_arguments_are_unsupported() {
        assert!(matches!(eval_err("int(x=1)"), EvalError::UnsupportedSyntax(_)));
    }

    #[test]
    fn unsupported_constructs() {
        for src in ["[1, 2]", "{'a': 1}", "(1, 2)", "2 ** 3", "7 % 2", "7 // 2", "1 | 2", "~1", "a is None", "lambda: 1", "s[1:2]"] {
            assert!(
                matches!(eval_err(src), EvalError::UnsupportedSyntax(_)),
                "{src} should be unsupported"
            );
        }
    }

    // ── Compile ─────────────────────────────────────────────────────

    #[test]
    fn syntax_errors_at_compile() {
        let eval = SafeEval::new();
        assert!(matches!(eval.compile("1 +"), Err(EvalError::Syntax { .. })));
        assert!(matches!(eval.compile("x = 1"), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn length_cap() {
        let source = "1".repeat(600);
        assert!(matches!(
            SafeEval::new().compile(&source),
            Err(EvalError::LimitExceeded { length: 600, .. })
        ));
    }

    #[test]
    fn bracket_cap() {
        let source = format!("{}1{}", "(".repeat(60), ")".repeat(60));
        assert!(matches!(
            SafeEval::new().compile(&source),
            Err(EvalError::LimitExceeded { brackets: 60, .. })
        ));
    }

    #[test]
    fn operator_chains_are_capped() {
        let eval = SafeEval::new();
        for op in ["-", "~", "not "] {
            let shallow = format!("{}1", op.repeat(99));
            assert!(eval.compile(&shallow).is_ok(), "{op}");
            let deep = format!("{}1", op.repeat(120));
            assert_eq!(
                eval.compile(&deep),
                Err(EvalError::TooDeep {
                    depth: 121,
                    max_depth: 100
                }),
                "{op}"
            );
        }
        assert!(matches!(
            eval.compile(&format!("{}1", "-".repeat(300))),
            Err(EvalError::TooDeep { depth: 301, .. })
        ));
        let minus = format!("{}1", "-".repeat(99));
        assert_eq!(eval.safe_eval(&minus, &Env::new()), Ok(Value::Int(-1)));
    }

    #[test]
    fn long_flat_chains_are_capped() {
        let eval = SafeEval::new();
        let short = vec!["1"; 50].join("+");
        assert_eq!(eval.safe_eval(&short, &Env::new()), Ok(Value::Int(50)));
        let long = vec!["1"; 200].join("+");
        assert!(matches!(eval.compile(&long), Err(EvalError::TooDeep { .. })));
        let nested = format!("{}1{}", "f(".repeat(20), ")".repeat(20));
        assert_eq!(eval.compile(&nested).map(|c| c.root().depth()), Ok(21));
    }

    #[test]
    fn custom_limits() {
        let eval = SafeEval::new().with_limits(EvalLimits {
            max_length: 5,
            ..EvalLimits::default()
        });
        assert!(eval.compile("1 + 2").is_err());
        assert!(eval.compile("1+2").is_ok());
    }

    #[test]
    fn compiled_is_reusable() {
        let eval = SafeEval::new();
        let compiled = eval.compile("a * 2").unwrap();
        assert_eq!(compiled.source(), "a * 2");
        assert_eq!(eval.execute(&compiled, &vars! { "a" => 2 }).unwrap(), Value::Int(4));
        assert_eq!(eval.execute(&compiled, &vars! { "a" => "x" }).unwrap(), Value::from("xx"));
    }
}
