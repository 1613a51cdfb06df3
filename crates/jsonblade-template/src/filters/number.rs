//! Number filters.
//!
//! Every filter reads its input with [`to_number`]; a value without a numeric
//! reading falls back to a fixed result instead of failing.

use serde_json::Value;

use super::{arg, BuiltinFilter};
use crate::value::{number_value, to_display_string, to_number};

/// The number group.
pub const FILTERS: &[(&str, BuiltinFilter)] = &[
    ("round", round),
    ("ceil", ceil),
    ("floor", floor),
    ("abs", abs),
    ("currency", currency),
    ("percentage", percentage),
    ("add", add),
    ("subtract", subtract),
    ("multiply", multiply),
    ("divide", divide),
    ("min", min),
    ("max", max),
];

/// Numeric argument `index`, or `fallback` when it is missing, zero or not
/// a number.
fn number_arg(args: &[Value], index: usize, fallback: f64) -> f64 {
    let n = to_number(arg(args, index));
    if n == 0.0 || n.is_nan() {
        fallback
    } else {
        n
    }
}

/// Decimal-places argument, clamped to `0..=100`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn decimals_arg(args: &[Value]) -> usize {
    let n = number_arg(args, 0, 0.0);
    if n.is_finite() {
        n.trunc().clamp(0.0, 100.0) as usize
    } else {
        0
    }
}

/// Fixed-point formatting with ties rounded away from zero.
///
/// `format!` rounds exact ties to even (`2.5` to `2`); fixed-point output
/// here rounds them away from zero (`2.5` to `3`). Only values that sit
/// exactly on a tie are affected.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::float_cmp)]
pub fn to_fixed(n: f64, digits: usize) -> String {
    let formatted = format!("{n:.digits$}");
    if digits > 22 || !n.is_finite() {
        return formatted;
    }
    let scale = 10f64.powi(digits as i32);
    let scaled = n * scale;
    // A zero residual means the product above was not rounded.
    let exact = n.mul_add(scale, -scaled) == 0.0;
    if exact && scaled.fract().abs() == 0.5 {
        let away = scaled.trunc() + scaled.signum();
        return format!("{:.digits$}", away / scale);
    }
    formatted
}

/// Half-up rounding to four decimal places.
fn round4(n: f64) -> f64 {
    (n * 10_000.0 + 0.5).floor() / 10_000.0
}

/// `{{ price | round(2) }}`
pub fn round(value: &Value, args: &[Value]) -> Value {
    let n = to_number(value);
    if n.is_nan() {
        return Value::from(0);
    }
    let fixed = to_fixed(n, decimals_arg(args));
    number_value(fixed.parse::<f64>().unwrap_or(0.0))
}

fn unary(value: &Value, f: fn(f64) -> f64) -> Value {
    let n = to_number(value);
    if n.is_nan() {
        Value::from(0)
    } else {
        number_value(f(n))
    }
}

/// `{{ n | ceil }}`
pub fn ceil(value: &Value, _args: &[Value]) -> Value {
    unary(value, f64::ceil)
}

/// `{{ n | floor }}`
pub fn floor(value: &Value, _args: &[Value]) -> Value {
    unary(value, f64::floor)
}

/// `{{ n | abs }}`
pub fn abs(value: &Value, _args: &[Value]) -> Value {
    unary(value, f64::abs)
}

/// Formats an amount with two decimals, space-grouped thousands and a comma
/// decimal separator, followed by the currency symbol: `1 234,56 €`.
///
/// `EUR`, `USD` and `GBP` map to their symbols; any other code is printed
/// as given.
pub fn currency(value: &Value, args: &[Value]) -> Value {
    let code = super::truthy_arg(args, 0).map_or_else(|| "EUR".to_string(), to_display_string);
    let n = to_number(value);
    if n.is_nan() {
        return Value::String("0,00 €".to_string());
    }
    let symbol = match code.as_str() {
        "EUR" => "€",
        "USD" => "$",
        "GBP" => "£",
        other => other,
    };
    Value::String(format!("{} {symbol}", group_decimal(&to_fixed(n, 2))))
}

/// `-1234567.50` becomes `-1 234 567,50`.
fn group_decimal(fixed: &str) -> String {
    let (sign, unsigned) = fixed.strip_prefix('-').map_or(("", fixed), |rest| ("-", rest));
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped},{frac_part}")
    }
}

/// `{{ ratio | percentage(1) }}` turns `0.256` into `25.6%`.
pub fn percentage(value: &Value, args: &[Value]) -> Value {
    let n = to_number(value);
    if n.is_nan() {
        return Value::String("0%".to_string());
    }
    Value::String(format!("{}%", to_fixed(n * 100.0, decimals_arg(args))))
}

/// Sum rounded to four decimals. A non-numeric base yields the addend.
pub fn add(value: &Value, args: &[Value]) -> Value {
    let addend = number_arg(args, 0, 0.0);
    let n = to_number(value);
    if n.is_nan() {
        return number_value(addend);
    }
    number_value(round4(n + addend))
}

/// Difference. A non-numeric base yields the negated argument.
pub fn subtract(value: &Value, args: &[Value]) -> Value {
    let subtrahend = number_arg(args, 0, 0.0);
    let n = to_number(value);
    if n.is_nan() {
        return number_value(-subtrahend);
    }
    number_value(n - subtrahend)
}

/// Product rounded to four decimals. A missing or zero factor counts as 1;
/// a non-numeric base yields 0.
pub fn multiply(value: &Value, args: &[Value]) -> Value {
    let factor = number_arg(args, 0, 1.0);
    let n = to_number(value);
    if n.is_nan() {
        return Value::from(0);
    }
    number_value(round4(n * factor))
}

/// Quotient. Dividing by zero or dividing a non-numeric base yields 0; a
/// missing or non-numeric divisor counts as 1.
pub fn divide(value: &Value, args: &[Value]) -> Value {
    let divisor = args.first().map_or(f64::NAN, to_number);
    let divisor = if divisor.is_nan() { 1.0 } else { divisor };
    let n = to_number(value);
    if n.is_nan() || divisor == 0.0 {
        return Value::from(0);
    }
    number_value(n / divisor)
}

fn bound(value: &Value, args: &[Value], pick: fn(f64, f64) -> f64) -> Value {
    let other = args.first().map_or(f64::NAN, to_number);
    let n = to_number(value);
    if n.is_nan() {
        return number_value(if other.is_nan() { 0.0 } else { other });
    }
    if other.is_nan() {
        return number_value(n);
    }
    number_value(pick(n, other))
}

/// The smaller of the value and the argument.
pub fn min(value: &Value, args: &[Value]) -> Value {
    bound(value, args, f64::min)
}

/// The larger of the value and the argument.
pub fn max(value: &Value, args: &[Value]) -> Value {
    bound(value, args, f64::max)
}
