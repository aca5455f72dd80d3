//! Canonical JSON encoding of request bodies.
//!
//! The canonical form is what gets signed and what goes on the wire:
//! - Object keys sorted by their UTF-8 bytes (or kept in insertion order
//!   with [`KeyOrder::Insertion`]); duplicate keys are rejected
//! - `,` and `:` separators, no whitespace anywhere
//! - Every character outside printable ASCII escaped as `\uXXXX`
//!   (surrogate pairs above the BMP)
//! - Integers in plain decimal, finite floats in shortest round-trip form
//! - No binary values, no NaN or infinities
//!
//! Signers in other languages reproduce it with any sorted-keys,
//! ASCII-only, compact-separator JSON writer.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::io;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Error as _, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A JSON number as it appeared in the body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// A request body value.
///
/// Objects are kept as ordered entry lists so that the builder's field order
/// survives until canonicalization decides what to do with it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Raw bytes have no canonical JSON form; encoding one fails.
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Ok(match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(number_from_json(&n)?),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::try_from).collect::<Result<_>>()?)
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| Ok((k, Value::try_from(v)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

/// Classify a number by its literal text. Integer literals must fit in
/// `i64` or `u64`; they are never widened to a float.
fn number_from_json(n: &serde_json::Number) -> Result<Number> {
    let text = n.to_string();
    if text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        return n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(Number::Float)
            .ok_or_else(|| Error::Encoding(format!("number out of range: {text}")));
    }
    if let Some(i) = n.as_i64() {
        Ok(Number::Int(i))
    } else if let Some(u) = n.as_u64() {
        Ok(Number::UInt(u))
    } else {
        Err(Error::Encoding(format!("integer out of range: {text}")))
    }
}

/// Convert any serializable body into a [`Value`], keeping field order.
pub fn to_value<T: Serialize + ?Sized>(body: &T) -> Result<Value> {
    let json = serde_json::to_value(body).map_err(|e| Error::Encoding(e.to_string()))?;
    Value::try_from(json)
}

/// Parse JSON bytes into a [`Value`], keeping key order as received.
///
/// Fails on repeated object keys and on integers that do not fit 64 bits.
pub fn from_json_bytes(bytes: &[u8]) -> Result<Value> {
    let encoding = |e: serde_json::Error| Error::Encoding(e.to_string());
    serde_json::from_slice::<UniqueKeys>(bytes).map_err(encoding)?;
    let json: serde_json::Value = serde_json::from_slice(bytes).map_err(encoding)?;
    Value::try_from(json)
}

/// Walks a JSON document and fails on the first object with a repeated key.
struct UniqueKeys;

impl<'de> Deserialize<'de> for UniqueKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(UniqueKeys)
    }
}

impl<'de> Visitor<'de> for UniqueKeys {
    type Value = UniqueKeys;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self, E> {
        Ok(self)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<Self, E> {
        Ok(self)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> std::result::Result<Self, E> {
        Ok(self)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> std::result::Result<Self, E> {
        Ok(self)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<Self, E> {
        Ok(self)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> std::result::Result<Self, E> {
        Ok(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self, A::Error> {
        while seq.next_element::<UniqueKeys>()?.is_some() {}
        Ok(self)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self, A::Error> {
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            map.next_value::<UniqueKeys>()?;
            if seen.contains(&key) {
                return Err(de::Error::custom(format!("duplicate object key: {key:?}")));
            }
            seen.insert(key);
        }
        Ok(self)
    }
}

/// How object keys are ordered in the canonical form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyOrder {
    /// Keys sorted by UTF-8 byte order.
    #[default]
    Sorted,
    /// Keys in the order the body was built.
    Insertion,
}

/// The exact bytes that are signed and transmitted.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CanonicalPayload(Vec<u8>);

impl CanonicalPayload {
    /// The canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The canonical bytes as text. Always ASCII.
    pub fn as_str(&self) -> &str {
        // Only ever written through `AsciiFormatter`.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CanonicalPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalPayload({})", self.as_str())
    }
}

impl fmt::Display for CanonicalPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies one fixed serialization rule to request bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Canonicalizer {
    key_order: KeyOrder,
}

impl Canonicalizer {
    pub fn new(key_order: KeyOrder) -> Self {
        Self { key_order }
    }

    pub fn key_order(&self) -> KeyOrder {
        self.key_order
    }

    /// Encode a body to its canonical bytes.
    pub fn canonicalize(&self, value: &Value) -> Result<CanonicalPayload> {
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
        Canonical { value, key_order: self.key_order }
            .serialize(&mut serializer)
            .map_err(|e| Error::Encoding(e.to_string()))?;
        Ok(CanonicalPayload(out))
    }

    /// Encode any serializable body to its canonical bytes.
    pub fn canonicalize_serialize<T: Serialize + ?Sized>(&self, body: &T) -> Result<CanonicalPayload> {
        self.canonicalize(&to_value(body)?)
    }

    /// Whether `bytes` already are the canonical encoding of the JSON they hold.
    pub fn is_canonical(&self, bytes: &[u8]) -> bool {
        from_json_bytes(bytes)
            .and_then(|value| self.canonicalize(&value))
            .is_ok_and(|canonical| canonical.as_bytes() == bytes)
    }
}

/// Encode a body with the default (sorted) canonical form.
pub fn canonicalize(value: &Value) -> Result<CanonicalPayload> {
    Canonicalizer::default().canonicalize(value)
}

/// A [`Value`] seen through the canonical rule: keys ordered and checked,
/// binary values and non-finite numbers refused.
struct Canonical<'a> {
    value: &'a Value,
    key_order: KeyOrder,
}

impl<'a> Canonical<'a> {
    fn nested(&self, value: &'a Value) -> Self {
        Self { value, key_order: self.key_order }
    }
}

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Int(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::UInt(u)) => serializer.serialize_u64(*u),
            Value::Number(Number::Float(f)) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Number(Number::Float(f)) => Err(S::Error::custom(format!("non-finite number: {f}"))),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(_) => Err(S::Error::custom(
                "binary values have no canonical JSON form; encode them as a string first",
            )),
            Value::Array(items) => serializer.collect_seq(items.iter().map(|item| self.nested(item))),
            Value::Object(entries) => {
                let mut seen = BTreeSet::new();
                for (key, _) in entries {
                    if !seen.insert(key.as_str()) {
                        return Err(S::Error::custom(format!("duplicate object key: {key:?}")));
                    }
                }

                let mut ordered: Vec<&(String, Value)> = entries.iter().collect();
                if self.key_order == KeyOrder::Sorted {
                    ordered.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));
                }

                let mut map = serializer.serialize_map(Some(ordered.len()))?;
                for (key, item) in ordered {
                    map.serialize_entry(key, &self.nested(item))?;
                }
                map.end()
            }
        }
    }
}

/// Compact output with every character outside printable ASCII escaped as
/// `\uXXXX` (lowercase, surrogate pairs above the BMP).
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let bytes = fragment.as_bytes();
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if matches!(c, ' '..='~') {
                continue;
            }
            writer.write_all(&bytes[start..i])?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(&bytes[start..])
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(format_float(value).as_bytes())
    }
}

/// Shortest round-trip float text: fixed notation for exponents in
/// `-4..16`, scientific (`1e+16`, `1.5e-07`) otherwise.
fn format_float(f: f64) -> String {
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let mut out = String::new();
    if f.is_sign_negative() {
        out.push('-');
    }

    if (-4..16).contains(&exp) {
        if exp >= 0 {
            let int_len = exp as usize + 1;
            if digits.len() > int_len {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            } else {
                out.push_str(&digits);
                out.extend(std::iter::repeat_n('0', int_len - digits.len()));
                out.push_str(".0");
            }
        } else {
            out.push_str("0.");
            out.extend(std::iter::repeat_n('0', (-exp - 1) as usize));
            out.push_str(&digits);
        }
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let sign = if exp < 0 { '-' } else { '+' };
        out.push_str(&format!("e{sign}{:02}", exp.abs()));
    }
    out
}

/// Helper: build an object from key-value pairs, in the given order.
/// The result is NOT yet canonical; call [`canonicalize`] for that.
pub fn json_map(entries: Vec<(&str, Value)>) -> Value {
    Value::Object(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// Helper: a text value.
pub fn json_text(s: &str) -> Value {
    Value::String(s.to_string())
}

/// Helper: an integer value.
pub fn json_int(n: i64) -> Value {
    Value::Number(Number::Int(n))
}
