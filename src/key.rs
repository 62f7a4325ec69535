//! Cache key derivation.
//!
//! A [`CacheKey`] names one `(type, attribute, identity, arguments)`
//! combination in the external store:
//!
//! ```text
//! Order::total::<sha256>          instance-level attribute
//! Order::self::count::<sha256>    type-level attribute
//! ```
//!
//! The digest covers the canonical encoding of the argument tuple, or the
//! instance's identity token when the tuple is empty. Hashing keeps the key
//! short and free of characters taken verbatim from argument values.
//!
//! # Canonical argument encoding
//!
//! Arguments are serialized through serde into a JSON value and written
//! back out compactly, with object keys sorted, independent of the
//! `serde_json` map implementation in use. The material is prefixed with
//! [`ENCODING_VERSION`] so a future encoding change produces fresh keys
//! instead of silently reinterpreting old ones.
//!
//! JSON has no spelling for `NaN` or the infinities, so arguments
//! containing a non-finite float are rejected rather than encoded.

use std::fmt;

use serde::Serialize;
use serde::ser;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{CachetError, Result};

/// Version tag of the key material encoding.
pub const ENCODING_VERSION: &str = "v1";

/// Marker inserted after the subject of type-level attributes.
pub(crate) const TYPE_LEVEL_MARKER: &str = "self";

/// Whether an attribute is computed per instance or per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One value per instance (`<Type>::<attr>::...`).
    #[default]
    Instance,
    /// One value per type (`<Type>::self::<attr>::...`).
    Type,
}

/// Canonical encoding of a call's argument tuple.
///
/// The tuple is empty when it encodes to `null` (the unit tuple `()`) or
/// to an empty sequence. Anything else that encodes to `null` counts as
/// empty too: `None` for an `Option` argument type, and unit structs.
/// Such a call reads the memo slot and is keyed by identity. Wrap these
/// argument types in a 1-tuple (`(Option<T>,)`) to keep every value a
/// distinct, non-empty argument tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    value: Value,
}

impl Arguments {
    /// Encode an argument tuple.
    ///
    /// Fails with [`CachetError::Json`](crate::CachetError::Json) when the
    /// arguments contain `NaN` or an infinity.
    pub fn encode<A: Serialize + ?Sized>(args: &A) -> Result<Self> {
        args.serialize(FiniteFloats)?;
        Ok(Self {
            value: serde_json::to_value(args)?,
        })
    }

    /// The empty argument tuple.
    pub fn empty() -> Self {
        Self { value: Value::Null }
    }

    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Compact JSON text with sorted object keys.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        write_canonical(&self.value, &mut out);
        out
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Key under which one cached attribute value lives in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for one call.
    ///
    /// With a non-empty `arguments` tuple the identity token does not
    /// contribute to the digest; the argument encoding alone does.
    pub fn build(
        subject: &str,
        attribute: &str,
        scope: Scope,
        identity: &str,
        arguments: &Arguments,
    ) -> Self {
        let digest = if arguments.is_empty() {
            digest("id", identity)
        } else {
            digest("args", &arguments.canonical())
        };
        let key = match scope {
            Scope::Instance => format!("{subject}::{attribute}::{digest}"),
            Scope::Type => format!("{subject}::{TYPE_LEVEL_MARKER}::{attribute}::{digest}"),
        };
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// SHA-256 over `<version>\0<kind>\0<material>`, hex encoded.
///
/// `kind` separates identity material from argument material, so an
/// identity token can never produce the key of an argument tuple.
fn digest(kind: &str, material: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ENCODING_VERSION.as_bytes());
    hasher.update([0u8]);
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())
}

/// Full path of `T` as reported by [`std::any::type_name`], generic
/// arguments included.
///
/// `my_app::billing::Order` and `my_app::shipping::Order` stay distinct.
/// The exact text is up to the compiler; pin keys across toolchains with
/// an explicit subject.
pub fn type_path<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
}

/// Check a key subject: `::`-separated, no empty segment, and no
/// segment equal to the type-level marker.
pub(crate) fn check_subject(subject: &str) -> Result<()> {
    let malformed = subject
        .split("::")
        .any(|segment| segment.is_empty() || segment == TYPE_LEVEL_MARKER);
    if malformed {
        return Err(CachetError::Configuration(format!(
            "invalid key subject '{subject}': empty segment or reserved '{TYPE_LEVEL_MARKER}' segment"
        )));
    }
    Ok(())
}

// ============================================================================
// Non-finite float check
// ============================================================================

/// Serializer that produces nothing and fails on `NaN` or an infinity
/// anywhere in the value, map keys included.
#[derive(Clone, Copy)]
struct FiniteFloats;

type Checked = std::result::Result<(), serde_json::Error>;

fn check_finite(value: f64) -> Checked {
    if value.is_finite() {
        return Ok(());
    }
    Err(<serde_json::Error as ser::Error>::custom(format!(
        "argument contains non-finite float {value}, which has no canonical encoding"
    )))
}

impl ser::Serializer for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _v: bool) -> Checked {
        Ok(())
    }

    fn serialize_i8(self, _v: i8) -> Checked {
        Ok(())
    }

    fn serialize_i16(self, _v: i16) -> Checked {
        Ok(())
    }

    fn serialize_i32(self, _v: i32) -> Checked {
        Ok(())
    }

    fn serialize_i64(self, _v: i64) -> Checked {
        Ok(())
    }

    fn serialize_i128(self, _v: i128) -> Checked {
        Ok(())
    }

    fn serialize_u8(self, _v: u8) -> Checked {
        Ok(())
    }

    fn serialize_u16(self, _v: u16) -> Checked {
        Ok(())
    }

    fn serialize_u32(self, _v: u32) -> Checked {
        Ok(())
    }

    fn serialize_u64(self, _v: u64) -> Checked {
        Ok(())
    }

    fn serialize_u128(self, _v: u128) -> Checked {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Checked {
        check_finite(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Checked {
        check_finite(v)
    }

    fn serialize_char(self, _v: char) -> Checked {
        Ok(())
    }

    fn serialize_str(self, _v: &str) -> Checked {
        Ok(())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Checked {
        Ok(())
    }

    fn serialize_none(self) -> Checked {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Checked {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Checked {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Checked {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> std::result::Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> std::result::Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> std::result::Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self, serde_json::Error> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Checked {
        key.serialize(*self)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}
