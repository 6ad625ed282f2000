use std::borrow::Cow;

use crate::{
    registry::{Command, CommandError, Value},
    tree::Kind,
};

const INT: Kind = Kind::Int;
const FLOAT: Kind = Kind::Float;
const STRING: Kind = Kind::String;

/// Largest string, in bytes, a command may build.
pub const MAX_STRING_LEN: usize = 1 << 26;

/// Built-in commands in load order.
pub fn builtins() -> Vec<Command> {
    vec![
        Command::new("add", &[INT, INT], INT, add_int),
        Command::new("add", &[FLOAT, FLOAT], FLOAT, add_float),
        Command::new("sub", &[INT, INT], INT, sub_int),
        Command::new("sub", &[FLOAT, FLOAT], FLOAT, sub_float),
        Command::new("mul", &[INT, INT], INT, mul_int),
        Command::new("mul", &[FLOAT, FLOAT], FLOAT, mul_float),
        Command::new("div", &[INT, INT], INT, div_int),
        Command::new("div", &[FLOAT, FLOAT], FLOAT, div_float),
        Command::new("neg", &[INT], INT, neg_int),
        Command::new("neg", &[FLOAT], FLOAT, neg_float),
        Command::new("abs", &[INT], INT, abs_int),
        Command::new("abs", &[FLOAT], FLOAT, abs_float),
        Command::new("inc", &[INT], INT, inc),
        Command::new("dec", &[INT], INT, dec),
        Command::new("doubleSum", &[INT, INT], INT, double_sum),
        Command::new("pow", &[INT, INT], INT, pow_int),
        Command::new("pow", &[FLOAT, FLOAT], FLOAT, pow_float),
        Command::new("sqrt", &[FLOAT], FLOAT, sqrt),
        Command::new("pi", &[], FLOAT, pi),
        Command::new("len", &[STRING], INT, len),
        Command::new("reverse", &[STRING], STRING, reverse),
        Command::new("upper", &[STRING], STRING, upper),
        Command::new("lower", &[STRING], STRING, lower),
        Command::new("concat", &[STRING, STRING], STRING, concat),
        Command::new("repeat", &[STRING, INT], STRING, repeat),
        Command::new("int_to_float", &[INT], FLOAT, int_to_float),
        Command::new("float_to_int", &[FLOAT], INT, float_to_int),
        Command::new("to_string", &[INT], STRING, int_to_string),
        Command::new("to_string", &[FLOAT], STRING, float_to_string),
        Command::new("parse_int", &[STRING], INT, parse_int),
        Command::new("parse_float", &[STRING], FLOAT, parse_float),
    ]
}

pub fn add_int<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(lhs), Value::Int(rhs)] => lhs
            .checked_add(*rhs)
            .map(Value::Int)
            .ok_or(CommandError::Overflow("add")),
        _ => Err(CommandError::arguments("add", &[INT, INT], input)),
    }
}

pub fn add_float<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Float(lhs), Value::Float(rhs)] => Ok(Value::Float(lhs + rhs)),
        _ => Err(CommandError::arguments("add", &[FLOAT, FLOAT], input)),
    }
}

pub fn sub_int<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(lhs), Value::Int(rhs)] => lhs
            .checked_sub(*rhs)
            .map(Value::Int)
            .ok_or(CommandError::Overflow("sub")),
        _ => Err(CommandError::arguments("sub", &[INT, INT], input)),
    }
}

pub fn sub_float<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Float(lhs), Value::Float(rhs)] => Ok(Value::Float(lhs - rhs)),
        _ => Err(CommandError::arguments("sub", &[FLOAT, FLOAT], input)),
    }
}

pub fn mul_int<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(lhs), Value::Int(rhs)] => lhs
            .checked_mul(*rhs)
            .map(Value::Int)
            .ok_or(CommandError::Overflow("mul")),
        _ => Err(CommandError::arguments("mul", &[INT, INT], input)),
    }
}

pub fn mul_float<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Float(lhs), Value::Float(rhs)] => Ok(Value::Float(lhs * rhs)),
        _ => Err(CommandError::arguments("mul", &[FLOAT, FLOAT], input)),
    }
}

pub fn div_int<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(_), Value::Int(0)] => Err(CommandError::DivisionByZero),
        [Value::Int(lhs), Value::Int(rhs)] => lhs
            .checked_div(*rhs)
            .map(Value::Int)
            .ok_or(CommandError::Overflow("div")),
        _ => Err(CommandError::arguments("div", &[INT, INT], input)),
    }
}

pub fn div_float<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Float(_), Value::Float(rhs)] if *rhs == 0.0 => Err(CommandError::DivisionByZero),
        [Value::Float(lhs), Value::Float(rhs)] => Ok(Value::Float(lhs / rhs)),
        _ => Err(CommandError::arguments("div", &[FLOAT, FLOAT], input)),
    }
}

pub fn neg_int<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(n)] => n
            .checked_neg()
            .map(Value::Int)
            .ok_or(CommandError::Overflow("neg")),
        _ => Err(CommandError::arguments("neg", &[INT], input)),
    }
}

pub fn neg_float<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Float(n)] => Ok(Value::Float(-n)),
        _ => Err(CommandError::arguments("neg", &[FLOAT], input)),
    }
}

pub fn abs_int<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(n)] => n
            .checked_abs()
            .map(Value::Int)
            .ok_or(CommandError::Overflow("abs")),
        _ => Err(CommandError::arguments("abs", &[INT], input)),
    }
}

pub fn abs_float<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Float(n)] => Ok(Value::Float(n.abs())),
        _ => Err(CommandError::arguments("abs", &[FLOAT], input)),
    }
}

pub fn inc<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(n)] => n
            .checked_add(1)
            .map(Value::Int)
            .ok_or(CommandError::Overflow("inc")),
        _ => Err(CommandError::arguments("inc", &[INT], input)),
    }
}

pub fn dec<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(n)] => n
            .checked_sub(1)
            .map(Value::Int)
            .ok_or(CommandError::Overflow("dec")),
        _ => Err(CommandError::arguments("dec", &[INT], input)),
    }
}

/// `2 * (a + b)`
pub fn double_sum<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(lhs), Value::Int(rhs)] => lhs
            .checked_add(*rhs)
            .and_then(|sum| sum.checked_mul(2))
            .map(Value::Int)
            .ok_or(CommandError::Overflow("doubleSum")),
        _ => Err(CommandError::arguments("doubleSum", &[INT, INT], input)),
    }
}

pub fn pow_int<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(_), Value::Int(exp)] if *exp < 0 => Err(CommandError::Invalid(format!(
            "negative exponent {exp} for an integer power"
        ))),
        [Value::Int(base), Value::Int(exp)] => u32::try_from(*exp)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
            .map(Value::Int)
            .ok_or(CommandError::Overflow("pow")),
        _ => Err(CommandError::arguments("pow", &[INT, INT], input)),
    }
}

pub fn pow_float<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Float(base), Value::Float(exp)] => Ok(Value::Float(base.powf(*exp))),
        _ => Err(CommandError::arguments("pow", &[FLOAT, FLOAT], input)),
    }
}

pub fn sqrt<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Float(n)] if *n < 0.0 => Err(CommandError::Invalid(format!(
            "square root of negative number {n}"
        ))),
        [Value::Float(n)] => Ok(Value::Float(n.sqrt())),
        _ => Err(CommandError::arguments("sqrt", &[FLOAT], input)),
    }
}

pub fn pi<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [] => Ok(Value::Float(std::f64::consts::PI)),
        _ => Err(CommandError::arguments("pi", &[], input)),
    }
}

pub fn len<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Str(s)] => i64::try_from(s.chars().count())
            .map(Value::Int)
            .map_err(|_| CommandError::Overflow("len")),
        _ => Err(CommandError::arguments("len", &[STRING], input)),
    }
}

pub fn reverse<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Str(s)] => Ok(Value::Str(Cow::Owned(s.chars().rev().collect()))),
        _ => Err(CommandError::arguments("reverse", &[STRING], input)),
    }
}

pub fn upper<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Str(s)] => Ok(Value::Str(Cow::Owned(s.to_uppercase()))),
        _ => Err(CommandError::arguments("upper", &[STRING], input)),
    }
}

pub fn lower<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Str(s)] => Ok(Value::Str(Cow::Owned(s.to_lowercase()))),
        _ => Err(CommandError::arguments("lower", &[STRING], input)),
    }
}

pub fn concat<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Str(lhs), Value::Str(rhs)] if lhs.len() + rhs.len() > MAX_STRING_LEN => {
            Err(CommandError::Overflow("concat"))
        }
        [Value::Str(lhs), Value::Str(rhs)] => Ok(Value::Str(Cow::Owned(format!("{lhs}{rhs}")))),
        _ => Err(CommandError::arguments("concat", &[STRING, STRING], input)),
    }
}

pub fn repeat<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Str(s), Value::Int(times)] => {
            let times = usize::try_from(*times).map_err(|_| {
                CommandError::Invalid(format!("cannot repeat a string {times} times"))
            })?;
            s.len()
                .checked_mul(times)
                .filter(|&total| total <= MAX_STRING_LEN)
                .ok_or(CommandError::Overflow("repeat"))?;
            Ok(Value::Str(Cow::Owned(s.repeat(times))))
        }
        _ => Err(CommandError::arguments("repeat", &[STRING, INT], input)),
    }
}

pub fn int_to_float<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Int(n)] => Ok(Value::Float(*n as f64)),
        _ => Err(CommandError::arguments("int_to_float", &[INT], input)),
    }
}

/// Truncates toward zero.
pub fn float_to_int<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Float(n)] => {
            let truncated = n.trunc();
            // i64::MAX is not representable as f64; 2^63 is the first value past it.
            if truncated >= -(2f64.powi(63)) && truncated < 2f64.powi(63) {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(CommandError::OutOfRange {
                    text: n.to_string(),
                    kind: INT,
                })
            }
        }
        _ => Err(CommandError::arguments("float_to_int", &[FLOAT], input)),
    }
}

pub fn int_to_string<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [value @ Value::Int(_)] => Ok(Value::Str(Cow::Owned(value.to_string()))),
        _ => Err(CommandError::arguments("to_string", &[INT], input)),
    }
}

pub fn float_to_string<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [value @ Value::Float(_)] => Ok(Value::Str(Cow::Owned(value.to_string()))),
        _ => Err(CommandError::arguments("to_string", &[FLOAT], input)),
    }
}

pub fn parse_int<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Str(s)] => s
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|e| CommandError::Invalid(format!("`{s}` is not an integer: {e}"))),
        _ => Err(CommandError::arguments("parse_int", &[STRING], input)),
    }
}

pub fn parse_float<'de>(input: &[Value<'de>]) -> Result<Value<'de>, CommandError> {
    match input {
        [Value::Str(s)] => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::Float(n)),
            Ok(n) => Err(CommandError::OutOfRange {
                text: n.to_string(),
                kind: FLOAT,
            }),
            Err(e) => Err(CommandError::Invalid(format!("`{s}` is not a float: {e}"))),
        },
        _ => Err(CommandError::arguments("parse_float", &[STRING], input)),
    }
}
