//! Statement evaluation against an [`Environment`].

use super::ast::{Expr, Literal, Stmt, Target};
use super::parser;
use crate::error::EvalError;
use crate::namespace::packet;
use crate::namespace::{CallArgs, Environment, Packet, Value};

/// Parse and execute one line.
///
/// Returns the value of a bare expression statement, unless it is `None`.
pub fn execute_line(env: &mut Environment, line: &str) -> Result<Option<Value>, EvalError> {
    let stmt = parser::parse_statement(line)?;
    execute(env, &stmt)
}

/// Execute every line of `source`, stopping at the first failure.
///
/// Returns the number of statements executed.
pub fn run_script(env: &mut Environment, source: &str) -> Result<usize, EvalError> {
    let mut executed = 0;
    for (index, line) in source.lines().enumerate() {
        let stmt = parser::parse_statement(line).map_err(|e| at_line(index, e))?;
        if stmt == Stmt::Empty {
            continue;
        }
        execute(env, &stmt).map_err(|e| at_line(index, e))?;
        executed += 1;
    }
    Ok(executed)
}

fn at_line(index: usize, error: EvalError) -> EvalError {
    EvalError::Script {
        line: index + 1,
        source: Box::new(error),
    }
}

pub fn execute(env: &mut Environment, stmt: &Stmt) -> Result<Option<Value>, EvalError> {
    match stmt {
        Stmt::Empty => Ok(None),
        Stmt::Assign { target, value } => {
            let value = evaluate(env, value)?;
            match target {
                Target::Name(name) => {
                    env.session_mut().namespace_mut().insert(name.clone(), value);
                }
                Target::Attr { object, attr } => {
                    evaluate(env, object)?.set_attr(attr, value)?;
                }
            }
            Ok(None)
        }
        Stmt::Del(name) => match env.session_mut().namespace_mut().remove(name) {
            Some(_) => Ok(None),
            None => Err(EvalError::Name(name.clone())),
        },
        Stmt::Expr(expr) => match evaluate(env, expr)? {
            Value::None => Ok(None),
            value => Ok(Some(value)),
        },
    }
}

pub fn evaluate(env: &mut Environment, expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(literal(lit)),
        Expr::Name(name) => env
            .lookup(name)
            .ok_or_else(|| EvalError::Name(name.clone())),
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(env, item))
            .collect::<Result<_, _>>()
            .map(Value::List),
        Expr::Attr { object, attr } => evaluate(env, object)?.get_attr(attr),
        Expr::Call { func, args, kwargs } => {
            let func = evaluate(env, func)?;
            let mut call_args = CallArgs::default();
            for arg in args {
                call_args.positional.push(evaluate(env, arg)?);
            }
            for (name, arg) in kwargs {
                call_args.keywords.push((name.clone(), evaluate(env, arg)?));
            }
            call(env, &func, call_args)
        }
        Expr::Div(lower, upper) => {
            let lower = evaluate(env, lower)?;
            let upper = evaluate(env, upper)?;
            divide(&lower, &upper)
        }
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::None => Value::None,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(v) => Value::Int(*v),
        Literal::Float(v) => Value::Float(*v),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

fn divide(lower: &Value, upper: &Value) -> Result<Value, EvalError> {
    let as_float = |v: &Value| match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    };
    match (lower, upper) {
        (Value::Packet(l), Value::Packet(u)) => Ok(Value::Packet(packet::stack(l, u))),
        (Value::Packet(l), Value::Class(class)) => {
            let u = Packet::build(class, Vec::new())?;
            Ok(Value::Packet(packet::stack(l, &u)))
        }
        _ => match (as_float(lower), as_float(upper)) {
            (Some(_), Some(d)) if d == 0.0 => Err(EvalError::Runtime("division by zero".into())),
            (Some(n), Some(d)) => Ok(Value::Float(n / d)),
            _ => Err(EvalError::Type(format!(
                "unsupported operand type(s) for /: '{}' and '{}'",
                lower.type_name(),
                upper.type_name()
            ))),
        },
    }
}

/// Call `func` with `args`.
pub fn call(env: &mut Environment, func: &Value, args: CallArgs) -> Result<Value, EvalError> {
    match func {
        Value::Native(native) => (native.func)(env, args),
        Value::Class(class) => {
            if !args.positional.is_empty() {
                return Err(EvalError::Type(format!(
                    "{}() takes field values as keyword arguments",
                    class.name
                )));
            }
            Ok(Value::Packet(Packet::build(class, args.keywords)?))
        }
        Value::Method(method) => call_method(&method.receiver, &method.name, args),
        other => Err(EvalError::Type(format!(
            "'{}' object is not callable",
            other.type_name()
        ))),
    }
}

fn call_method(receiver: &Value, name: &str, args: CallArgs) -> Result<Value, EvalError> {
    match (receiver, name) {
        (Value::Packet(p), "show") => {
            print!("{}", packet::show(p));
            Ok(Value::None)
        }
        (Value::Packet(p), "summary") => Ok(Value::Str(packet::summary(p))),
        (Value::Packet(p), "copy") => Ok(Value::Packet(packet::deep_copy(p))),
        (Value::Str(s), "lower") => Ok(Value::Str(s.to_lowercase())),
        (Value::Str(s), "upper") => Ok(Value::Str(s.to_uppercase())),
        (Value::Str(s), "strip") => Ok(Value::Str(s.trim().to_string())),
        (Value::Str(s), "split") => {
            let parts: Vec<Value> = match args.opt_str(0, "sep")? {
                Some(sep) if !sep.is_empty() => s.split(sep.as_str()).map(Value::from).collect(),
                Some(_) => return Err(EvalError::Runtime("empty separator".into())),
                None => s.split_whitespace().map(Value::from).collect(),
            };
            Ok(Value::List(parts))
        }
        (Value::Str(s), "startswith") => Ok(Value::Bool(s.starts_with(&args.str(0, "prefix")?))),
        (Value::Str(s), "endswith") => Ok(Value::Bool(s.ends_with(&args.str(0, "suffix")?))),
        (Value::List(items), "count") => {
            let needle = required(&args, 0, "value")?;
            Ok(Value::Int(items.iter().filter(|v| *v == needle).count() as i64))
        }
        (Value::List(items), "index") => {
            let needle = required(&args, 0, "value")?;
            items
                .iter()
                .position(|v| v == needle)
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| EvalError::Runtime(format!("{} is not in list", needle)))
        }
        (Value::Dict(map), "get") => {
            let key = args.str(0, "key")?;
            Ok(map
                .get(&key)
                .cloned()
                .or_else(|| args.get(1, "default").cloned())
                .unwrap_or(Value::None))
        }
        (Value::Dict(map), "keys") => Ok(Value::List(
            map.keys().map(|k| Value::Str(k.clone())).collect(),
        )),
        (Value::Dict(map), "values") => Ok(Value::List(map.values().cloned().collect())),
        _ => Err(EvalError::attribute(receiver.type_name(), name)),
    }
}

fn required<'a>(args: &'a CallArgs, index: usize, name: &str) -> Result<&'a Value, EvalError> {
    args.get(index, name)
        .ok_or_else(|| EvalError::Type(format!("missing required argument '{}'", name)))
}

/// Evaluate a dotted path read-only, without calling anything.
pub fn resolve_dotted(env: &Environment, path: &str) -> Result<Value, EvalError> {
    env.globals()
        .resolve_path(path)
        .or_else(|_| env.session().namespace().resolve_path(path))
}
