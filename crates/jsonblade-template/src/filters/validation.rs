//! Validation predicates, encodings and escaping.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde_json::Value;

use super::{arg, truthy_arg, BuiltinFilter};
use crate::value::{to_display_string, to_number};

/// The validation group.
pub const FILTERS: &[(&str, BuiltinFilter)] = &[
    ("isEmail", is_email),
    ("isURL", is_url),
    ("isUUID", is_uuid),
    ("isNumber", is_number),
    ("isInteger", is_integer),
    ("isPhoneNumber", is_phone_number),
    ("minLength", min_length),
    ("maxLength", max_length),
    ("matches", matches),
    ("base64Encode", base64_encode),
    ("base64Decode", base64_decode),
    ("escape", escape),
    ("unescape", unescape),
    ("urlEncode", url_encode),
    ("urlDecode", url_decode),
    ("md5", md5),
    ("sha256", sha256),
];

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("valid uuid pattern")
});
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+33|0)[1-9][0-9]{8}$").expect("valid phone pattern"));

/// Characters `urlEncode` leaves alone, besides ASCII alphanumerics.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Standard alphabet, padding optional, stray trailing bits tolerated.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

fn text(value: &Value) -> String {
    to_display_string(value)
}

/// `name@domain.tld`, without whitespace.
pub fn is_email(value: &Value, _args: &[Value]) -> Value {
    Value::Bool(EMAIL.is_match(&text(value)))
}

/// Absolute URL with a scheme.
pub fn is_url(value: &Value, _args: &[Value]) -> Value {
    Value::Bool(url::Url::parse(&text(value)).is_ok())
}

/// RFC 4122 UUID, versions 1 through 5.
pub fn is_uuid(value: &Value, _args: &[Value]) -> Value {
    Value::Bool(UUID.is_match(&text(value)))
}

/// Finite numeric reading.
pub fn is_number(value: &Value, _args: &[Value]) -> Value {
    Value::Bool(to_number(value).is_finite())
}

/// Finite numeric reading without a fractional part.
pub fn is_integer(value: &Value, _args: &[Value]) -> Value {
    let n = to_number(value);
    Value::Bool(n.is_finite() && n.fract() == 0.0)
}

/// French phone number (`+33` or `0` prefix), whitespace ignored.
pub fn is_phone_number(value: &Value, _args: &[Value]) -> Value {
    let compact: String = text(value).chars().filter(|c| !c.is_whitespace()).collect();
    Value::Bool(PHONE.is_match(&compact))
}

#[allow(clippy::cast_precision_loss)]
fn char_len(value: &Value) -> f64 {
    text(value).chars().count() as f64
}

/// At least `n` characters.
pub fn min_length(value: &Value, args: &[Value]) -> Value {
    let min = to_number(arg(args, 0));
    let min = if min.is_nan() { 0.0 } else { min };
    Value::Bool(char_len(value) >= min)
}

/// At most `n` characters. Without a limit every value passes.
pub fn max_length(value: &Value, args: &[Value]) -> Value {
    let max = to_number(arg(args, 0));
    let max = if max == 0.0 || max.is_nan() { f64::INFINITY } else { max };
    Value::Bool(char_len(value) <= max)
}

/// Regular-expression search. A missing or invalid pattern never matches.
pub fn matches(value: &Value, args: &[Value]) -> Value {
    let Some(pattern) = truthy_arg(args, 0).map(to_display_string) else {
        return Value::Bool(false);
    };
    Value::Bool(Regex::new(&pattern).is_ok_and(|re| re.is_match(&text(value))))
}

/// Base64 of the UTF-8 text.
pub fn base64_encode(value: &Value, _args: &[Value]) -> Value {
    Value::String(STANDARD.encode(text(value)))
}

/// Decodes base64, skipping characters outside the alphabet and accepting
/// the URL-safe variants. Undecodable input gives `""`.
pub fn base64_decode(value: &Value, _args: &[Value]) -> Value {
    let cleaned: String = text(value)
        .chars()
        .filter_map(|c| match c {
            '-' => Some('+'),
            '_' => Some('/'),
            c if c.is_ascii_alphanumeric() || c == '+' || c == '/' => Some(c),
            _ => None,
        })
        .collect();
    let decoded = LENIENT_BASE64
        .decode(cleaned)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    Value::String(decoded)
}

/// Escapes `& < > " '` as HTML entities.
pub fn escape(value: &Value, _args: &[Value]) -> Value {
    let escaped = text(value)
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;");
    Value::String(escaped)
}

/// Reverses [`escape`].
pub fn unescape(value: &Value, _args: &[Value]) -> Value {
    let unescaped = text(value)
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'");
    Value::String(unescaped)
}

/// Percent-encodes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub fn url_encode(value: &Value, _args: &[Value]) -> Value {
    Value::String(utf8_percent_encode(&text(value), URI_COMPONENT).to_string())
}

/// Percent-decodes the text. Malformed escapes or invalid UTF-8 leave the
/// input unchanged.
pub fn url_decode(value: &Value, _args: &[Value]) -> Value {
    let input = text(value);
    if !well_formed_escapes(&input) {
        return Value::String(input);
    }
    let decoded = percent_decode_str(&input)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| input.clone());
    Value::String(decoded)
}

fn well_formed_escapes(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3);
            if !hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Placeholder digest: `md5(<value>)`.
pub fn md5(value: &Value, _args: &[Value]) -> Value {
    Value::String(format!("md5({})", text(value)))
}

/// Placeholder digest: `sha256(<value>)`.
pub fn sha256(value: &Value, _args: &[Value]) -> Value {
    Value::String(format!("sha256({})", text(value)))
}
