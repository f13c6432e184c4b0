//! Non-finite float detection
//!
//! `serde_json` writes `NaN` and the infinities as `null`, which the decoder
//! then rejects for an `f64` field. The JSON strategy walks the message with
//! [`find_non_finite`] first and refuses such values up front.

use std::fmt;

use serde::Serialize;
use serde::ser::{self, Serializer};

/// First non-finite float in a value
#[derive(Debug, Clone, Copy)]
pub(crate) struct NonFinite {
    /// Top-level struct field holding the value
    pub field: Option<&'static str>,
    pub value: f64,
}

impl fmt::Display for NonFinite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "field {field}: non-finite float {} has no JSON form", self.value),
            None => write!(f, "non-finite float {} has no JSON form", self.value),
        }
    }
}

/// Walk `value` and report its first `NaN` or infinite float.
///
/// Errors raised by the value's own `Serialize` impl are not reported here;
/// the real encoder surfaces them.
pub(crate) fn find_non_finite<T: Serialize + ?Sized>(value: &T) -> Option<NonFinite> {
    let mut scanner = Scanner::default();
    match value.serialize(&mut scanner) {
        Err(Stop::NonFinite(value)) => Some(NonFinite {
            field: scanner.field,
            value,
        }),
        Ok(()) | Err(Stop::Custom) => None,
    }
}

#[derive(Debug)]
enum Stop {
    NonFinite(f64),
    Custom,
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite(value) => write!(f, "non-finite float {value}"),
            Self::Custom => f.write_str("serialize error"),
        }
    }
}

impl std::error::Error for Stop {}

impl ser::Error for Stop {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Self::Custom
    }
}

#[derive(Debug, Default)]
struct Scanner {
    depth: usize,
    field: Option<&'static str>,
}

impl Scanner {
    fn float(value: f64) -> Result<(), Stop> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(Stop::NonFinite(value))
        }
    }

    fn enter(&mut self) -> &mut Self {
        self.depth += 1;
        self
    }

    fn named_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Stop> {
        if self.depth == 1 {
            self.field = Some(key);
        }
        value.serialize(self)
    }
}

impl Serializer for &mut Scanner {
    type Ok = ();
    type Error = Stop;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _v: bool) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_i8(self, _v: i8) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_i16(self, _v: i16) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_i32(self, _v: i32) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_i64(self, _v: i64) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_i128(self, _v: i128) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_u8(self, _v: u8) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_u16(self, _v: u16) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_u32(self, _v: u32) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_u64(self, _v: u64) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_u128(self, _v: u128) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<(), Stop> {
        Scanner::float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<(), Stop> {
        Scanner::float(v)
    }

    fn serialize_char(self, _v: char) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_str(self, _v: &str) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_none(self) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), Stop> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), Stop> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(self, _name: &'static str, value: &T) -> Result<(), Stop> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), Stop> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, Stop> {
        Ok(self.enter())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, Stop> {
        Ok(self.enter())
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self, Stop> {
        Ok(self.enter())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, Stop> {
        Ok(self.enter())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, Stop> {
        Ok(self.enter())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, Stop> {
        Ok(self.enter())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, Stop> {
        Ok(self.enter())
    }
}

impl ser::SerializeSeq for &mut Scanner {
    type Ok = ();
    type Error = Stop;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Stop> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Stop> {
        self.depth -= 1;
        Ok(())
    }
}

impl ser::SerializeTuple for &mut Scanner {
    type Ok = ();
    type Error = Stop;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Stop> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Stop> {
        self.depth -= 1;
        Ok(())
    }
}

impl ser::SerializeTupleStruct for &mut Scanner {
    type Ok = ();
    type Error = Stop;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Stop> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Stop> {
        self.depth -= 1;
        Ok(())
    }
}

impl ser::SerializeTupleVariant for &mut Scanner {
    type Ok = ();
    type Error = Stop;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Stop> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Stop> {
        self.depth -= 1;
        Ok(())
    }
}

impl ser::SerializeMap for &mut Scanner {
    type Ok = ();
    type Error = Stop;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Stop> {
        key.serialize(&mut **self)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Stop> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Stop> {
        self.depth -= 1;
        Ok(())
    }
}

impl ser::SerializeStruct for &mut Scanner {
    type Ok = ();
    type Error = Stop;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Stop> {
        self.named_field(key, value)
    }

    fn end(self) -> Result<(), Stop> {
        self.depth -= 1;
        Ok(())
    }
}

impl ser::SerializeStructVariant for &mut Scanner {
    type Ok = ();
    type Error = Stop;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Stop> {
        self.named_field(key, value)
    }

    fn end(self) -> Result<(), Stop> {
        self.depth -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Inner {
        samples: Vec<f32>,
    }

    #[derive(Serialize)]
    struct Outer {
        label: String,
        total: f64,
        nested: Option<Inner>,
        tagged: BTreeMap<String, f64>,
    }

    fn outer() -> Outer {
        Outer {
            label: "station".to_owned(),
            total: 1.25,
            nested: Some(Inner { samples: vec![0.5, -2.0] }),
            tagged: BTreeMap::from([("a".to_owned(), 3.0)]),
        }
    }

    #[test]
    fn test_finite_values_pass() {
        assert!(find_non_finite(&outer()).is_none());
        assert!(find_non_finite(&(1u128, -5i128, "text", f64::MAX)).is_none());
    }

    #[test]
    fn test_reports_top_level_field() {
        let mut value = outer();
        value.total = f64::NEG_INFINITY;
        let found = find_non_finite(&value).unwrap();
        assert_eq!(found.field, Some("total"));
        assert!(found.value.is_infinite());
        assert_eq!(found.to_string(), "field total: non-finite float -inf has no JSON form");
    }

    #[test]
    fn test_nested_value_names_outer_field() {
        let mut value = outer();
        value.nested = Some(Inner { samples: vec![1.0, f32::NAN] });
        let found = find_non_finite(&value).unwrap();
        assert_eq!(found.field, Some("nested"));
        assert!(found.value.is_nan());

        let mut value = outer();
        value.tagged.insert("b".to_owned(), f64::INFINITY);
        assert_eq!(find_non_finite(&value).unwrap().field, Some("tagged"));
    }

    #[test]
    fn test_bare_float_has_no_field() {
        let found = find_non_finite(&f64::NAN).unwrap();
        assert_eq!(found.field, None);
        assert_eq!(found.to_string(), "non-finite float NaN has no JSON form");
    }
}
