//! Node property values and the ordered property map.
//!
//! Props are the only mutable-looking part of a node: the reconciler diffs a
//! node's [`Props`] against the last snapshot it wrote to the native engine and
//! emits one set-property instruction per changed key.
//!
//! # Serialization
//!
//! [`canonical_json`] writes props exactly as a JavaScript host would
//! `JSON.stringify` them. Numbers use the ECMAScript Number-to-String form
//! (`0.000001`, `100000000000000000000`, `1e+21`), non-finite numbers become
//! `null`, and integer-like keys come first in ascending order. The result is
//! the identity basis of a node hash (see [`Node`](crate::Node)), so this
//! format must stay stable.
//!
//! The serde form of [`PropValue`] used on the wire writes integral numbers
//! that fit an `i64` without a fractional part. Other numbers may use a
//! different exponent spelling but parse to the same value.

use core::fmt;

use indexmap::IndexMap;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reserved prop key that overrides structural identity when it holds a string.
pub const KEY_PROP: &str = "key";

/// Integral numbers below this magnitude serialize as `i64` literals.
const I64_LITERAL_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Insertion-ordered mapping from prop name to value.
pub type Props = IndexMap<String, PropValue>;

/// A scalar (or list of scalars) stored under a node prop key.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PropValue {
    /// Absent or explicitly null value.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Numeric value. NaN never compares equal, so it is rewritten on every pass.
    Number(f64),
    /// String value.
    String(String),
    /// Ordered list of values, e.g. sequencer steps.
    List(Vec<PropValue>),
}

impl PropValue {
    /// Returns the numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` for values that are almost certainly authoring errors:
    /// null, NaN and infinities.
    ///
    /// Such values are still forwarded to the native engine, which may clamp or
    /// default them.
    pub fn is_suspicious(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Number(n) => !n.is_finite(),
            _ => false,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<unprintable>"),
        }
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for PropValue {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<usize> for PropValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<PropValue>> From<Vec<T>> for PropValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl Serialize for PropValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) if !n.is_finite() => serializer.serialize_unit(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < I64_LITERAL_LIMIT => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => items.serialize(serializer),
        }
    }
}

struct PropValueVisitor;

impl<'de> Visitor<'de> for PropValueVisitor {
    type Value = PropValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, a boolean, a number, a string, or a list of those")
    }

    fn visit_unit<E: de::Error>(self) -> Result<PropValue, E> {
        Ok(PropValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<PropValue, E> {
        Ok(PropValue::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<PropValue, E> {
        Ok(PropValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<PropValue, E> {
        Ok(PropValue::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<PropValue, E> {
        Ok(PropValue::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<PropValue, E> {
        Ok(PropValue::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<PropValue, E> {
        Ok(PropValue::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<PropValue, E> {
        Ok(PropValue::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PropValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(PropValue::List(items))
    }
}

impl<'de> Deserialize<'de> for PropValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PropValueVisitor)
    }
}

/// Serializes props into the canonical JSON string used as a hash identity basis.
///
/// Keys that are canonical array indices (`"0"`, `"7"`, `"42"`) are written
/// first in ascending numeric order, the remaining keys in insertion order.
pub fn canonical_json(props: &Props) -> String {
    let mut indexed: Vec<(u32, &String, &PropValue)> = Vec::new();
    let mut named: Vec<(&String, &PropValue)> = Vec::with_capacity(props.len());
    for (key, value) in props {
        match array_index(key) {
            Some(index) => indexed.push((index, key, value)),
            None => named.push((key, value)),
        }
    }
    indexed.sort_by_key(|(index, ..)| *index);

    let mut out = String::from("{");
    let entries = indexed.into_iter().map(|(_, k, v)| (k, v)).chain(named);
    for (i, (key, value)) in entries.enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_json_str(&mut out, key);
        out.push(':');
        write_canonical_value(&mut out, value);
    }
    out.push('}');
    out
}

/// Parses a property key that JavaScript treats as an array index.
fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse::<u32>().ok().filter(|&index| index != u32::MAX)
}

fn write_json_str(out: &mut String, s: &str) {
    // Serializing a str into a String cannot fail.
    out.push_str(&serde_json::to_string(s).unwrap_or_default());
}

fn write_canonical_value(out: &mut String, value: &PropValue) {
    match value {
        PropValue::Null => out.push_str("null"),
        PropValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        PropValue::Number(n) => write_js_number(out, *n),
        PropValue::String(s) => write_json_str(out, s),
        PropValue::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical_value(out, item);
            }
            out.push(']');
        }
    }
}

/// Writes `n` in ECMAScript Number-to-String form, or `null` if not finite.
fn write_js_number(out: &mut String, n: f64) {
    if !n.is_finite() {
        out.push_str("null");
        return;
    }
    if n == 0.0 {
        // Covers -0 as well.
        out.push('0');
        return;
    }
    if n < 0.0 {
        out.push('-');
    }

    // `{:e}` yields the shortest round-tripping digits, e.g. `2.5e-6`.
    let sci = format!("{:e}", n.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exp: i32 = exp.parse().unwrap_or(0);
    let k = digits.len() as i32;
    // Decimal point position: value = 0.digits * 10^point.
    let point = exp + 1;

    if k <= point && point <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat_n('0', (point - k) as usize));
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else if -6 < point && point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', (-point) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push(if point > 0 { '+' } else { '-' });
        out.push_str(&(point - 1).unsigned_abs().to_string());
    }
}

/// Merges `next` into the `prev` snapshot and returns the entries that changed.
///
/// A key is written when it is missing from `prev` or its value differs.
/// Keys present only in `prev` are left untouched. Suspicious values are
/// logged and still written.
pub(crate) fn merge_changed(prev: &mut Props, next: &Props) -> Vec<(String, PropValue)> {
    let mut changed = Vec::new();
    for (key, value) in next {
        if prev.get(key) == Some(value) {
            continue;
        }
        if value.is_suspicious() {
            tracing::warn!(
                key = %key,
                value = %value,
                "applying a potentially erroneous property value"
            );
        }
        prev.insert(key.clone(), value.clone());
        changed.push((key.clone(), value.clone()));
    }
    changed
}

/// Builds a [`Props`] map from `key => value` pairs.
///
/// ```rust
/// use signet_core::{props, PropValue};
///
/// let p = props! { "value" => 440.0, "name" => "freq" };
/// assert_eq!(p["value"], PropValue::Number(440.0));
/// ```
#[macro_export]
macro_rules! props {
    () => { $crate::Props::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Props::new();
        $( map.insert(::std::string::String::from($key), $crate::PropValue::from($value)); )+
        map
    }};
}
