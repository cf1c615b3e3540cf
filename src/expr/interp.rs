//! Evaluation of parsed expressions against a fixed set of bindings.

use super::literal::{display, to_literal};
use super::parser::{BinOp, CmpOp, Expr};
use super::{Env, Failure, TRIAL_MARKER};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Num::Int(i)),
                None => n.as_f64().map(Num::Float),
            },
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn invalid(message: impl Into<String>) -> Failure {
    Failure::Invalid(message.into())
}

fn float(f: f64) -> Result<Value, Failure> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| invalid(format!("non-finite result {}", f)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "None",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub fn eval(expr: &Expr, env: &Env<'_>) -> Result<Value, Failure> {
    match expr {
        Expr::Lit(value) => Ok(value.clone()),
        Expr::Name(name) => lookup(name, env),
        Expr::List(items) => Ok(Value::Array(
            items.iter().map(|e| eval(e, env)).collect::<Result<_, _>>()?,
        )),
        Expr::Dict(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                let key = match eval(key, env)? {
                    Value::String(s) => s,
                    other @ (Value::Number(_) | Value::Bool(_)) => display(&other),
                    other => return Err(invalid(format!("unusable dict key of type {}", type_name(&other)))),
                };
                map.insert(key, eval(value, env)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Neg(inner) => match Num::of(&eval(inner, env)?) {
            Some(Num::Int(i)) => i
                .checked_neg()
                .map(Value::from)
                .ok_or_else(|| invalid("integer overflow")),
            Some(Num::Float(f)) => float(-f),
            None => Err(invalid("bad operand for unary -")),
        },
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, env)?))),
        Expr::And(left, right) => {
            let left = eval(left, env)?;
            if truthy(&left) { eval(right, env) } else { Ok(left) }
        }
        Expr::Or(left, right) => {
            let left = eval(left, env)?;
            if truthy(&left) { Ok(left) } else { eval(right, env) }
        }
        Expr::IfElse {
            cond,
            then,
            otherwise,
        } => {
            if truthy(&eval(cond, env)?) {
                eval(then, env)
            } else {
                eval(otherwise, env)
            }
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, env)?;
            let right = eval(right, env)?;
            binary(*op, &left, &right)
        }
        Expr::Compare(first, rest) => {
            let mut left = eval(first, env)?;
            for (op, right) in rest {
                let right = eval(right, env)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        Expr::Index(target, index) => {
            let target = eval(target, env)?;
            let index = eval(index, env)?;
            subscript(&target, &index)
        }
        Expr::Call(name, args) => {
            let args = args.iter().map(|a| eval(a, env)).collect::<Result<Vec<_>, _>>()?;
            call(name, &args, env)
        }
    }
}

fn lookup(name: &str, env: &Env<'_>) -> Result<Value, Failure> {
    if let Some(value) = env.locals.and_then(|locals| locals.get(name)) {
        return Ok(value.clone());
    }
    if name == TRIAL_MARKER {
        return match env.trial {
            Some(trial) => Ok(trial.clone()),
            None => Err(Failure::Unbound(name.to_string())),
        };
    }
    match name {
        "uid" => Ok(Value::String(env.uid.to_string())),
        "pi" => float(std::f64::consts::PI),
        "e" => float(std::f64::consts::E),
        "tau" => float(std::f64::consts::TAU),
        _ if is_builtin(name) => Err(invalid(format!("builtin {} must be called", name))),
        _ => Err(Failure::Unbound(name.to_string())),
    }
}

fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, Failure> {
    // Sequence operators first.
    match (op, left, right) {
        (BinOp::Add, Value::String(a), Value::String(b)) => return Ok(Value::String(format!("{}{}", a, b))),
        (BinOp::Add, Value::Array(a), Value::Array(b)) => {
            return Ok(Value::Array(a.iter().chain(b).cloned().collect()));
        }
        (BinOp::Mul, Value::String(s), n) | (BinOp::Mul, n, Value::String(s)) if n.is_i64() || n.is_boolean() => {
            let times = repetitions(n, s.len())?;
            return Ok(Value::String(s.repeat(times)));
        }
        (BinOp::Mul, Value::Array(items), n) | (BinOp::Mul, n, Value::Array(items)) if n.is_i64() || n.is_boolean() => {
            let times = repetitions(n, items.len())?;
            let mut out = Vec::with_capacity(items.len() * times);
            for _ in 0..times {
                out.extend(items.iter().cloned());
            }
            return Ok(Value::Array(out));
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (Num::of(left), Num::of(right)) else {
        return Err(invalid(format!(
            "unsupported operand types for {:?}: {} and {}",
            op,
            type_name(left),
            type_name(right)
        )));
    };

    let overflow = || invalid("integer overflow");
    match (op, a, b) {
        (BinOp::Add, Num::Int(x), Num::Int(y)) => x.checked_add(y).map(Value::from).ok_or_else(overflow),
        (BinOp::Sub, Num::Int(x), Num::Int(y)) => x.checked_sub(y).map(Value::from).ok_or_else(overflow),
        (BinOp::Mul, Num::Int(x), Num::Int(y)) => x.checked_mul(y).map(Value::from).ok_or_else(overflow),
        (BinOp::Add, x, y) => float(x.as_f64() + y.as_f64()),
        (BinOp::Sub, x, y) => float(x.as_f64() - y.as_f64()),
        (BinOp::Mul, x, y) => float(x.as_f64() * y.as_f64()),
        (BinOp::Div | BinOp::FloorDiv | BinOp::Mod, _, y) if y.as_f64() == 0.0 => {
            Err(invalid("division by zero"))
        }
        (BinOp::Div, x, y) => float(x.as_f64() / y.as_f64()),
        (BinOp::FloorDiv, Num::Int(x), Num::Int(y)) => {
            let q = x.checked_div(y).ok_or_else(overflow)?;
            let floor = if x % y != 0 && ((x < 0) != (y < 0)) { q - 1 } else { q };
            Ok(Value::from(floor))
        }
        (BinOp::FloorDiv, x, y) => float((x.as_f64() / y.as_f64()).floor()),
        (BinOp::Mod, Num::Int(x), Num::Int(y)) => {
            let r = x.checked_rem(y).ok_or_else(overflow)?;
            Ok(Value::from(if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r }))
        }
        (BinOp::Mod, x, y) => {
            let (x, y) = (x.as_f64(), y.as_f64());
            float(x - y * (x / y).floor())
        }
        (BinOp::Pow, Num::Int(x), Num::Int(y)) if y >= 0 => u32::try_from(y)
            .ok()
            .and_then(|y| x.checked_pow(y))
            .map(Value::from)
            .ok_or_else(overflow),
        (BinOp::Pow, x, y) => float(x.as_f64().powf(y.as_f64())),
    }
}

/// Longest string (in bytes) or list a repetition may produce.
pub const MAX_REPEAT_LEN: usize = 1 << 20;

/// Repeat count for `seq * n`; zero for non-positive `n` or an empty sequence.
fn repetitions(n: &Value, len: usize) -> Result<usize, Failure> {
    let times = match Num::of(n) {
        Some(Num::Int(i)) if i > 0 => usize::try_from(i).unwrap_or(usize::MAX),
        _ => return Ok(0),
    };
    if len == 0 {
        return Ok(0);
    }
    match len.checked_mul(times) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(times),
        _ => Err(invalid("repetition too large")),
    }
}

/// Equality with numeric coercion (`1 == 1.0`).
fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_)) => {
            match (Num::of(left), Num::of(right)) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
                (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
                _ => false,
            }
        }
        (Value::Array(a), Value::Array(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equal(x, y)),
        _ => left == right,
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, Failure> {
    let wanted: &[Ordering] = match op {
        CmpOp::Eq => return Ok(equal(left, right)),
        CmpOp::Ne => return Ok(!equal(left, right)),
        CmpOp::Lt => &[Ordering::Less],
        CmpOp::Le => &[Ordering::Less, Ordering::Equal],
        CmpOp::Gt => &[Ordering::Greater],
        CmpOp::Ge => &[Ordering::Greater, Ordering::Equal],
    };
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => match (Num::of(left), Num::of(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => a.cmp(&b),
            (Some(a), Some(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .ok_or_else(|| invalid("incomparable numbers"))?,
            _ => {
                return Err(invalid(format!(
                    "cannot order {} and {}",
                    type_name(left),
                    type_name(right)
                )));
            }
        },
    };
    Ok(wanted.contains(&ordering))
}

fn subscript(target: &Value, index: &Value) -> Result<Value, Failure> {
    match target {
        Value::Object(map) => {
            let key = match index {
                Value::String(s) => s.clone(),
                other => display(other),
            };
            map.get(&key)
                .cloned()
                .ok_or_else(|| invalid(format!("key {:?} not found", key)))
        }
        Value::Array(items) => {
            let idx = position(index, items.len())?;
            Ok(items[idx].clone())
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = position(index, chars.len())?;
            Ok(Value::String(chars[idx].to_string()))
        }
        other => Err(invalid(format!("{} is not subscriptable", type_name(other)))),
    }
}

/// Sequence index; negative counts from the end.
fn position(index: &Value, len: usize) -> Result<usize, Failure> {
    let Some(Num::Int(i)) = Num::of(index) else {
        return Err(invalid(format!("indices must be integers, not {}", type_name(index))));
    };
    let resolved = if i < 0 { len as i64 + i } else { i };
    if resolved < 0 || resolved >= len as i64 {
        return Err(invalid(format!("index {} out of range", i)));
    }
    Ok(resolved as usize)
}

const BUILTINS: &[&str] = &[
    "pow", "sqrt", "exp", "log", "log2", "log10", "floor", "ceil", "fabs", "sin", "cos", "tan",
    "abs", "min", "max", "round", "len", "str", "int", "float", "bool", "sum",
];

fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

fn call(name: &str, args: &[Value], env: &Env<'_>) -> Result<Value, Failure> {
    if !is_builtin(name) {
        // Locals and the trial marker are data, never callable.
        return match lookup(name, env) {
            Err(Failure::Unbound(unbound)) => Err(Failure::Unbound(unbound)),
            _ => Err(invalid(format!("{} is not callable", name))),
        };
    }

    let arity = |n: usize| -> Result<(), Failure> {
        if args.len() == n {
            Ok(())
        } else {
            Err(invalid(format!("{}() takes {} argument(s), {} given", name, n, args.len())))
        }
    };
    let num = |idx: usize| -> Result<Num, Failure> {
        Num::of(&args[idx]).ok_or_else(|| {
            invalid(format!("{}() needs a number, got {}", name, type_name(&args[idx])))
        })
    };
    let unary_float = |f: fn(f64) -> f64| -> Result<Value, Failure> {
        arity(1)?;
        float(f(num(0)?.as_f64()))
    };

    match name {
        "pow" => {
            arity(2)?;
            float(num(0)?.as_f64().powf(num(1)?.as_f64()))
        }
        "sqrt" => {
            arity(1)?;
            let x = num(0)?.as_f64();
            if x < 0.0 {
                return Err(invalid("math domain error"));
            }
            float(x.sqrt())
        }
        "exp" => unary_float(f64::exp),
        "log" => {
            if args.len() == 2 {
                let (x, base) = (num(0)?.as_f64(), num(1)?.as_f64());
                if x <= 0.0 || base <= 0.0 {
                    return Err(invalid("math domain error"));
                }
                return float(x.ln() / base.ln());
            }
            arity(1)?;
            let x = num(0)?.as_f64();
            if x <= 0.0 {
                return Err(invalid("math domain error"));
            }
            float(x.ln())
        }
        "log2" | "log10" => {
            arity(1)?;
            let x = num(0)?.as_f64();
            if x <= 0.0 {
                return Err(invalid("math domain error"));
            }
            float(if name == "log2" { x.log2() } else { x.log10() })
        }
        "fabs" => unary_float(f64::abs),
        "sin" => unary_float(f64::sin),
        "cos" => unary_float(f64::cos),
        "tan" => unary_float(f64::tan),
        "floor" | "ceil" => {
            arity(1)?;
            match num(0)? {
                Num::Int(i) => Ok(Value::from(i)),
                Num::Float(f) => {
                    let rounded = if name == "floor" { f.floor() } else { f.ceil() };
                    to_int(rounded)
                }
            }
        }
        "abs" => {
            arity(1)?;
            match num(0)? {
                Num::Int(i) => i.checked_abs().map(Value::from).ok_or_else(|| invalid("integer overflow")),
                Num::Float(f) => float(f.abs()),
            }
        }
        "round" => {
            if args.len() == 2 {
                let digits = match num(1)? {
                    Num::Int(d) => d,
                    Num::Float(_) => return Err(invalid("round() digits must be an integer")),
                };
                return match num(0)? {
                    Num::Int(i) if digits >= 0 => Ok(Value::from(i)),
                    x => {
                        let scale = 10f64.powi(digits as i32);
                        float(round_half_even(x.as_f64() * scale) / scale)
                    }
                };
            }
            arity(1)?;
            match num(0)? {
                Num::Int(i) => Ok(Value::from(i)),
                Num::Float(f) => to_int(round_half_even(f)),
            }
        }
        "min" | "max" => {
            let items: Vec<Value> = match args {
                [Value::Array(items)] => items.clone(),
                [] => return Err(invalid(format!("{}() expects at least one argument", name))),
                many => many.to_vec(),
            };
            let mut best: Option<Value> = None;
            for item in items {
                best = Some(match best {
                    None => item,
                    Some(current) => {
                        let better = if name == "min" {
                            compare(CmpOp::Lt, &item, &current)?
                        } else {
                            compare(CmpOp::Gt, &item, &current)?
                        };
                        if better { item } else { current }
                    }
                });
            }
            best.ok_or_else(|| invalid(format!("{}() arg is an empty sequence", name)))
        }
        "sum" => {
            arity(1)?;
            let Value::Array(items) = &args[0] else {
                return Err(invalid("sum() needs a list"));
            };
            items
                .iter()
                .try_fold(Value::from(0), |acc, item| binary(BinOp::Add, &acc, item))
        }
        "len" => {
            arity(1)?;
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                other => return Err(invalid(format!("object of type {} has no len()", type_name(other)))),
            };
            Ok(Value::from(len as u64))
        }
        "str" => {
            arity(1)?;
            Ok(Value::String(display(&args[0])))
        }
        "int" => {
            arity(1)?;
            match &args[0] {
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| invalid(format!("invalid literal for int(): {}", to_literal(&args[0])))),
                _ => match num(0)? {
                    Num::Int(i) => Ok(Value::from(i)),
                    Num::Float(f) => to_int(f.trunc()),
                },
            }
        }
        "float" => {
            arity(1)?;
            match &args[0] {
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("could not convert string to float: {}", to_literal(&args[0]))))
                    .and_then(float),
                _ => float(num(0)?.as_f64()),
            }
        }
        "bool" => {
            arity(1)?;
            Ok(Value::Bool(truthy(&args[0])))
        }
        _ => Err(invalid(format!("{} is not callable", name))),
    }
}

fn to_int(f: f64) -> Result<Value, Failure> {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Ok(Value::from(f as i64))
    } else {
        Err(invalid(format!("cannot convert {} to integer", f)))
    }
}

/// Banker's rounding (half to even).
fn round_half_even(f: f64) -> f64 {
    let rounded = f.round();
    if (f - f.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - f.signum()
    } else {
        rounded
    }
}
