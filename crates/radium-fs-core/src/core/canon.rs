// radium-fs-core/src/core/canon.rs
// ============================================================================
// Module: Radium-FS Canonical Serializer
// Description: Deterministic textual encoding of JSON-like values for hashing.
// Purpose: Guarantee two logically equal inputs hash identically.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The canonical serializer produces a byte-for-byte deterministic encoding
//! of any JSON-compatible value: object keys are sorted by Unicode code
//! point, `undefined`/absent values are dropped, non-finite floats collapse
//! to `null`, and the output carries no whitespace. It backs
//! [`crate::core::hashing::data_id`], the sole consumer of canonical bytes.
//!
//! Unlike RFC 8785 (JCS) — which the wider Decision Gate stack leans on via
//! `serde_jcs` for *finite* JSON — this module is a total function over the
//! whole `T: Serialize` universe, including values JCS has no opinion on
//! (`NaN`, `Infinity`, Rust's `Option::None`, skipped struct fields). Rather
//! than serialize to `serde_json::Value` first (which fails outright on a
//! non-finite float anywhere in the tree) this module implements
//! `serde::Serializer` directly, so a stray `NaN` three levels deep becomes
//! a `null` at that position instead of an error at the root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde::ser;

// ============================================================================
// SECTION: Canonical Value
// ============================================================================

/// A JSON-like value in canonical form.
///
/// Object keys are held in a [`BTreeMap`] so iteration order is always
/// lexicographic by Unicode code point, matching §4.1's sort rule without a
/// separate sort pass.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    /// `null`, or any value the encoding collapses to `null`.
    Null,
    /// A boolean literal.
    Bool(bool),
    /// A finite number. Non-finite floats never reach this variant.
    Number(CanonicalNumber),
    /// A UTF-8 string.
    String(String),
    /// An ordered sequence.
    Array(Vec<CanonicalValue>),
    /// A map with lexicographically sorted keys.
    Object(BTreeMap<String, CanonicalValue>),
}

/// A canonical numeric value, preserving integer vs. floating form.
///
/// Integers round-trip exactly; floats are rendered through Rust's shortest
/// round-trippable `f64` formatting, which is stable and deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanonicalNumber {
    /// A signed integer.
    Int(i64),
    /// An unsigned integer too large for `i64`.
    UInt(u64),
    /// A finite floating-point value.
    Float(f64),
}

impl fmt::Display for CanonicalNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => value.fmt(f),
            Self::UInt(value) => value.fmt(f),
            Self::Float(value) => value.fmt(f),
        }
    }
}

impl CanonicalValue {
    /// Writes the compact, deterministic JSON text form of this value.
    fn write_json(&self, out: &mut String) {
        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(true) => out.push_str("true"),
            Self::Bool(false) => out.push_str("false"),
            Self::Number(number) => out.push_str(&number.to_string()),
            Self::String(value) => write_json_string(value, out),
            Self::Array(items) => {
                out.push('[');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    item.write_json(out);
                }
                out.push(']');
            }
            Self::Object(entries) => {
                out.push('{');
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    write_json_string(key, out);
                    out.push(':');
                    value.write_json(out);
                }
                out.push('}');
            }
        }
    }

    /// Renders the compact canonical JSON text form of this value.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out);
        out
    }
}

/// Escapes and quotes a string per §4.1 (only `"` and `\` are escaped).
fn write_json_string(value: &str, out: &mut String) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out.push('"');
}

// ============================================================================
// SECTION: Canonicalization Entry Point
// ============================================================================

/// Converts any serializable value into its [`CanonicalValue`] form.
///
/// This never fails: unrepresentable values (non-finite floats, units,
/// skipped fields) become [`CanonicalValue::Null`] rather than propagating
/// an error, matching §4.1's "total function" guarantee.
pub fn to_canonical<T: Serialize + ?Sized>(value: &T) -> CanonicalValue {
    value.serialize(CanonicalSerializer).unwrap_or(CanonicalValue::Null)
}

/// Canonicalizes a value and renders its compact JSON text form.
#[must_use]
pub fn canonical_json_string<T: Serialize + ?Sized>(value: &T) -> String {
    to_canonical(value).to_json_string()
}

// ============================================================================
// SECTION: Serializer Implementation
// ============================================================================

/// `serde::Serializer` that targets [`CanonicalValue`] directly.
///
/// Infallible by construction: every `serialize_*` method returns `Ok`, even
/// for inputs §4.1 calls out as unrepresentable (`NaN`/`Infinity` -> `Null`,
/// `None`/unit -> `Null`).
struct CanonicalSerializer;

/// Error type required by the `Serializer` trait; never actually produced.
#[derive(Debug)]
struct Unreachable;

impl fmt::Display for Unreachable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("canonical serialization is infallible")
    }
}

impl std::error::Error for Unreachable {}

impl ser::Error for Unreachable {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Self
    }
}

impl ser::Serializer for CanonicalSerializer {
    type Ok = CanonicalValue;
    type Error = Unreachable;
    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = SeqBuilder;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = MapBuilder;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Number(CanonicalNumber::Int(v)))
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Number(CanonicalNumber::UInt(v)))
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        if v.is_finite() {
            Ok(CanonicalValue::Number(CanonicalNumber::Float(v)))
        } else {
            Ok(CanonicalValue::Null)
        }
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.serialize_str(&v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        let items = v.iter().map(|byte| CanonicalValue::Number(CanonicalNumber::UInt(u64::from(*byte)))).collect();
        Ok(CanonicalValue::Array(items))
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Self::Ok, Self::Error> {
        Ok(to_canonical(value))
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(to_canonical(value))
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        let mut entries = BTreeMap::new();
        entries.insert(variant.to_string(), to_canonical(value));
        Ok(CanonicalValue::Object(entries))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(SeqBuilder {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Ok(SeqBuilder {
            items: Vec::with_capacity(len),
        }
        .with_variant(variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(MapBuilder::new())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(MapBuilder::new())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(MapBuilder::new().with_variant(variant))
    }
}

/// Accumulates sequence/tuple elements for [`CanonicalSerializer`].
struct SeqBuilder {
    items: Vec<CanonicalValue>,
}

impl SeqBuilder {
    fn with_variant(self, variant: &'static str) -> Self {
        // Tuple variants are rare in this crate's value universe; wrapping
        // under the variant name keeps the encoding unambiguous without a
        // dedicated builder type.
        let wrapped = CanonicalValue::Array(self.items);
        let mut entries = BTreeMap::new();
        entries.insert(variant.to_string(), wrapped);
        Self {
            items: vec![CanonicalValue::Object(entries)],
        }
    }
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = CanonicalValue;
    type Error = Unreachable;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.items.push(to_canonical(value));
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(CanonicalValue::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = CanonicalValue;
    type Error = Unreachable;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = CanonicalValue;
    type Error = Unreachable;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleVariant for SeqBuilder {
    type Ok = CanonicalValue;
    type Error = Unreachable;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        // `with_variant` already collapsed `items` to a single wrapped
        // entry; new fields are serialized and appended inside that wrapper.
        if let Some(CanonicalValue::Object(entries)) = self.items.first_mut() {
            if let Some(CanonicalValue::Array(inner)) = entries.values_mut().next() {
                inner.push(to_canonical(value));
                return Ok(());
            }
        }
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.items.into_iter().next().ok_or(Unreachable)
    }
}

/// Accumulates map/struct entries for [`CanonicalSerializer`].
///
/// Keys land in a [`BTreeMap`], which both de-duplicates (last write wins,
/// matching `serde_json::Map`'s semantics) and sorts by Unicode code point
/// for free.
struct MapBuilder {
    entries: BTreeMap<String, CanonicalValue>,
    pending_key: Option<String>,
    variant: Option<&'static str>,
}

impl MapBuilder {
    fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            pending_key: None,
            variant: None,
        }
    }

    fn with_variant(mut self, variant: &'static str) -> Self {
        self.variant = Some(variant);
        self
    }

    fn finish(self) -> CanonicalValue {
        let object = CanonicalValue::Object(self.entries);
        match self.variant {
            Some(variant) => {
                let mut wrapper = BTreeMap::new();
                wrapper.insert(variant.to_string(), object);
                CanonicalValue::Object(wrapper)
            }
            None => object,
        }
    }
}

impl ser::SerializeMap for MapBuilder {
    type Ok = CanonicalValue;
    type Error = Unreachable;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Self::Error> {
        let key = match to_canonical(key) {
            CanonicalValue::String(key) => key,
            other => other.to_json_string(),
        };
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        if let Some(key) = self.pending_key.take() {
            self.entries.insert(key, to_canonical(value));
        }
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = CanonicalValue;
    type Error = Unreachable;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.entries.insert(key.to_string(), to_canonical(value));
        Ok(())
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<(), Self::Error> {
        // `undefined`-valued keys are omitted entirely (§4.1), not
        // serialized as `null` — skipping means never inserting the key.
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for MapBuilder {
    type Ok = CanonicalValue;
    type Error = Unreachable;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.entries.insert(key.to_string(), to_canonical(value));
        Ok(())
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.finish())
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde::Serialize;
    use serde_json::json;

    use super::*;

    #[test]
    fn object_key_order_is_insensitive() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        assert_eq!(canonical_json_string(&a), canonical_json_string(&b));
        assert_eq!(canonical_json_string(&a), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn non_finite_floats_collapse_to_null() {
        assert_eq!(canonical_json_string(&f64::NAN), "null");
        assert_eq!(canonical_json_string(&f64::INFINITY), "null");
        assert_eq!(canonical_json_string(&f64::NEG_INFINITY), "null");
    }

    #[test]
    fn nested_non_finite_float_does_not_poison_the_whole_value() {
        #[derive(Serialize)]
        struct Sample {
            ok: i32,
            bad: f64,
        }
        let sample = Sample {
            ok: 7,
            bad: f64::NAN,
        };
        assert_eq!(canonical_json_string(&sample), r#"{"bad":null,"ok":7}"#);
    }

    #[test]
    fn null_and_missing_and_unit_all_encode_as_null() {
        let none: Option<i32> = None;
        assert_eq!(canonical_json_string(&none), "null");
        assert_eq!(canonical_json_string(&()), "null");
        assert_eq!(canonical_json_string(&serde_json::Value::Null), "null");
    }

    #[test]
    fn strings_escape_only_quote_and_backslash() {
        let value = "a\"b\\c\nd";
        assert_eq!(canonical_json_string(&value), "\"a\\\"b\\\\c\nd\"");
    }

    #[test]
    fn arrays_preserve_index_order() {
        let value = json!([3, 1, 2]);
        assert_eq!(canonical_json_string(&value), "[3,1,2]");
    }

    #[test]
    fn compact_output_has_no_whitespace() {
        let value = json!({"a": [1, 2], "b": {"c": 3}});
        let text = canonical_json_string(&value);
        assert!(!text.contains(' '));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn skipped_struct_fields_are_omitted_not_nulled() {
        #[derive(Serialize)]
        struct Sample {
            kept: i32,
            #[serde(skip_serializing)]
            #[allow(dead_code, reason = "exercises serde's skip_serializing path")]
            dropped: i32,
        }
        let sample = Sample {
            kept: 1,
            dropped: 2,
        };
        assert_eq!(canonical_json_string(&sample), r#"{"kept":1}"#);
    }
}
