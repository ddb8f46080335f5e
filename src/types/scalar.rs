//! Scalar decoding: atom literal text -> declared scalar type.
use std::fmt;

/// A decoded scalar, independent of its declared Rust type.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

/// Types an atom may be declared as.
pub trait ScalarType: Sized + Clone + Send + Sync + 'static {
    const TYPE_NAME: &'static str;
    fn decode(literal: &str) -> Result<Self, String>;
    fn into_scalar(self) -> Scalar;
    fn from_scalar(scalar: &Scalar) -> Option<Self>;
}

impl Scalar {
    /// Configuration-text literal that decodes back to this scalar.
    pub fn to_literal(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::UInt(u) => u.to_string(),
            Scalar::Float(f) if f.is_nan() => "nan".into(),
            Scalar::Float(f) if f.is_infinite() => {
                if *f > 0.0 { "infinity".into() } else { "-infinity".into() }
            }
            Scalar::Float(f) => format!("{f:?}"),
            Scalar::String(s) => quote(s),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATIONS
// ————————————————————————————————————————————————————————————————————————————

macro_rules! signed_scalar {
    ($($t:ty),*) => {$(
        impl ScalarType for $t {
            const TYPE_NAME: &'static str = stringify!($t);
            fn decode(literal: &str) -> Result<Self, String> {
                let wide = decode_integer(literal)?;
                <$t>::try_from(wide)
                    .map_err(|_| format!("{wide} is out of range for {}", stringify!($t)))
            }
            fn into_scalar(self) -> Scalar {
                Scalar::Int(self as i64)
            }
            fn from_scalar(scalar: &Scalar) -> Option<Self> {
                match *scalar {
                    Scalar::Int(v) => <$t>::try_from(v).ok(),
                    Scalar::UInt(v) => <$t>::try_from(v).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

macro_rules! unsigned_scalar {
    ($($t:ty),*) => {$(
        impl ScalarType for $t {
            const TYPE_NAME: &'static str = stringify!($t);
            fn decode(literal: &str) -> Result<Self, String> {
                let wide = decode_integer(literal)?;
                <$t>::try_from(wide)
                    .map_err(|_| format!("{wide} is out of range for {}", stringify!($t)))
            }
            fn into_scalar(self) -> Scalar {
                Scalar::UInt(self as u64)
            }
            fn from_scalar(scalar: &Scalar) -> Option<Self> {
                match *scalar {
                    Scalar::Int(v) => <$t>::try_from(v).ok(),
                    Scalar::UInt(v) => <$t>::try_from(v).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

signed_scalar!(i8, i16, i32, i64, isize);
unsigned_scalar!(u8, u16, u32, u64, usize);

impl ScalarType for f64 {
    const TYPE_NAME: &'static str = "f64";
    fn decode(literal: &str) -> Result<Self, String> {
        decode_float(literal)
    }
    fn into_scalar(self) -> Scalar {
        Scalar::Float(self)
    }
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match *scalar {
            Scalar::Float(v) => Some(v),
            Scalar::Int(v) => Some(v as f64),
            Scalar::UInt(v) => Some(v as f64),
            _ => None,
        }
    }
}

impl ScalarType for f32 {
    const TYPE_NAME: &'static str = "f32";
    fn decode(literal: &str) -> Result<Self, String> {
        let wide = decode_float(literal)?;
        let narrow = wide as f32;
        if wide.is_finite() && narrow.is_infinite() {
            return Err(format!("{wide} is out of range for f32"));
        }
        Ok(narrow)
    }
    fn into_scalar(self) -> Scalar {
        Scalar::Float(self as f64)
    }
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        f64::from_scalar(scalar).map(|v| v as f32)
    }
}

impl ScalarType for bool {
    const TYPE_NAME: &'static str = "bool";
    fn decode(literal: &str) -> Result<Self, String> {
        match literal.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(format!("'{other}' is not a boolean")),
        }
    }
    fn into_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match *scalar {
            Scalar::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl ScalarType for String {
    const TYPE_NAME: &'static str = "string";
    fn decode(literal: &str) -> Result<Self, String> {
        let text = literal.trim();
        if is_quoted(text) {
            Ok(unquote(text))
        } else if text == "nil" {
            Err("nil is not a string".into())
        } else {
            Ok(text.to_string())
        }
    }
    fn into_scalar(self) -> Scalar {
        Scalar::String(self)
    }
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Decimal, `0x` hexadecimal, or an integral floating literal (`1e3`).
fn decode_integer(literal: &str) -> Result<i128, String> {
    let text = literal.trim();
    let not_integer = || format!("'{text}' is not an integer");
    if is_quoted(text) {
        return Err(not_integer());
    }
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let hex = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"));
    let magnitude = match hex {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            i128::from_str_radix(hex, 16).ok()
        }
        Some(_) => return Err(not_integer()),
        None if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.parse::<i128>().ok()
        }
        None => None,
    };
    if let Some(m) = magnitude {
        return Ok(if negative { -m } else { m });
    }
    let f: f64 = text.parse().map_err(|_| not_integer())?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e38 {
        Ok(f as i128)
    } else {
        Err(not_integer())
    }
}

fn decode_float(literal: &str) -> Result<f64, String> {
    let text = literal.trim();
    if is_quoted(text) {
        return Err(format!("{text} is not a number"));
    }
    match text {
        "infinity" | "+infinity" => Ok(f64::INFINITY),
        "-infinity" => Ok(f64::NEG_INFINITY),
        _ => text.parse::<f64>().map_err(|_| format!("'{text}' is not a number")),
    }
}

pub(crate) fn is_quoted(text: &str) -> bool {
    text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\'')))
}

/// Strips quotes; double-quoted text also has its escapes resolved.
pub(crate) fn unquote(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    if text.starts_with('\'') {
        return inner.to_string();
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_respect_declared_width() {
        assert_eq!(u8::decode("255"), Ok(255));
        assert!(u8::decode("256").is_err());
        assert!(u32::decode("-1").is_err());
        assert_eq!(i32::decode("-17"), Ok(-17));
        assert_eq!(i64::decode("0x1F"), Ok(31));
        assert_eq!(i64::decode("-0x10"), Ok(-16));
        assert_eq!(u32::decode("1e3"), Ok(1000));
        assert_eq!(i16::decode("+5"), Ok(5));
        assert!(i32::decode("1.5").is_err());
        assert!(i32::decode("\"5\"").is_err());
        assert!(i32::decode("0x").is_err());
        assert!(i32::decode("Jenny").is_err());
        assert!(u64::decode("infinity").is_err());
    }

    #[test]
    fn floats_and_booleans() {
        assert_eq!(f64::decode("2.5e1"), Ok(25.0));
        assert_eq!(f64::decode("9"), Ok(9.0));
        assert_eq!(f64::decode("-infinity"), Ok(f64::NEG_INFINITY));
        assert!(f32::decode("1e300").is_err());
        assert!(f64::decode("'x'").is_err());
        assert_eq!(bool::decode("true"), Ok(true));
        assert!(bool::decode("yes").is_err());
    }

    #[test]
    fn strings_unquote_and_escape() {
        assert_eq!(String::decode("Beethoven").unwrap(), "Beethoven");
        assert_eq!(String::decode("\"a \\\"b\\\"\\n\"").unwrap(), "a \"b\"\n");
        assert_eq!(String::decode("'raw\\n'").unwrap(), "raw\\n");
        assert!(String::decode("nil").is_err());
        assert_eq!(String::decode("\"nil\"").unwrap(), "nil");
    }

    #[test]
    fn literals_decode_back() {
        let samples = [
            Scalar::Bool(false),
            Scalar::Int(-3),
            Scalar::UInt(9),
            Scalar::Float(9.0),
            Scalar::Float(1e-7),
            Scalar::Float(f64::INFINITY),
            Scalar::String("tab\there \"q\"".into()),
        ];
        assert_eq!(bool::decode(&samples[0].to_literal()), Ok(false));
        assert_eq!(i64::decode(&samples[1].to_literal()), Ok(-3));
        assert_eq!(u32::decode(&samples[2].to_literal()), Ok(9));
        assert_eq!(samples[3].to_literal(), "9.0");
        assert_eq!(f64::decode(&samples[4].to_literal()), Ok(1e-7));
        assert_eq!(f64::decode(&samples[5].to_literal()), Ok(f64::INFINITY));
        assert_eq!(
            String::decode(&samples[6].to_literal()).unwrap(),
            "tab\there \"q\""
        );
    }
}
