//! Conversion builtins available to every evaluator: `str`, `int`, `float`.

use std::sync::Arc;

use indexmap::IndexMap;

use super::safe_eval::Callable;
use super::value::Value;
use super::EvalError;

/// The default allow-list.
pub fn defaults() -> IndexMap<String, Callable> {
    let mut map: IndexMap<String, Callable> = IndexMap::new();
    map.insert("str".into(), Arc::new(to_str));
    map.insert("int".into(), Arc::new(to_int));
    map.insert("float".into(), Arc::new(to_float));
    map
}

fn arity(name: &str, args: &[Value], max: usize) -> Result<(), EvalError> {
    if args.len() > max {
        return Err(EvalError::Call {
            name: name.into(),
            message: format!("expected at most {max} arguments, got {}", args.len()),
        });
    }
    Ok(())
}

/// `str(x)`
pub fn to_str(args: &[Value]) -> Result<Value, EvalError> {
    arity("str", args, 1)?;
    Ok(Value::Str(args.first().map(ToString::to_string).unwrap_or_default()))
}

/// `int(x)` / `int(s, base)`
pub fn to_int(args: &[Value]) -> Result<Value, EvalError> {
    arity("int", args, 2)?;
    let Some(arg) = args.first() else {
        return Ok(Value::Int(0));
    };
    if let Some(base) = args.get(1) {
        let Value::Str(text) = arg else {
            return Err(EvalError::Type("int() can't convert non-string with explicit base".into()));
        };
        let base = base
            .as_int()
            .and_then(|b| u32::try_from(b).ok())
            .filter(|b| (2..=36).contains(b))
            .ok_or_else(|| EvalError::Value("int() base must be >= 2 and <= 36".into()))?;
        return parse_int(text, base);
    }
    match arg {
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) => {
            if f.is_nan() {
                return Err(EvalError::Value("cannot convert float NaN to integer".into()));
            }
            let truncated = f.trunc();
            if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                return Err(EvalError::Overflow("int()".into()));
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Str(text) => parse_int(text, 10),
        other => Err(EvalError::Type(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn parse_int(text: &str, base: u32) -> Result<Value, EvalError> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    i64::from_str_radix(&cleaned, base)
        .map(Value::Int)
        .map_err(|_| {
            EvalError::Value(format!(
                "invalid literal for int() with base {base}: {}",
                Value::from(text).repr()
            ))
        })
}

/// `float(x)`
pub fn to_float(args: &[Value]) -> Result<Value, EvalError> {
    arity("float", args, 1)?;
    let Some(arg) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    match arg {
        Value::Bool(b) => Ok(Value::Float(f64::from(u8::from(*b)))),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(text) => {
            let trimmed = text.trim();
            let parsed = match trimmed.to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" | "+infinity" => Some(f64::INFINITY),
                "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                "nan" | "+nan" | "-nan" => Some(f64::NAN),
                _ => trimmed.parse::<f64>().ok(),
            };
            parsed.map(Value::Float).ok_or_else(|| {
                EvalError::Value(format!(
                    "could not convert string to float: {}",
                    Value::from(text.as_str()).repr()
                ))
            })
        }
        other => Err(EvalError::Type(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}
