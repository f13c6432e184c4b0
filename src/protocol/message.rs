//! Production message types
//!
//! A production message is a plain Rust struct whose field order is part of
//! its static definition. The [`message!`](crate::message) macro declares the
//! struct together with its [`ProductionMessage`] implementation:
//!
//! ```rust
//! use prodwire::{ProductionMessage, message};
//!
//! message! {
//!     /// A customer order
//!     pub struct Order in "shop" as Json {
//!         pub id: u64,
//!         #[column]
//!         pub amount: u64 = 100,
//!         pub note: Option<String>,
//!     }
//! }
//!
//! let order = Order::default();
//! assert_eq!(order.amount, 100);
//! assert_eq!(Order::qualified_name(), "shop.Order");
//! assert_eq!(order.to_string(), "Order(id=0, amount=100, note=null)");
//! ```
//!
//! Types declared with the macro derive `serde::Serialize` and
//! `serde::Deserialize`, so the declaring crate must depend on `serde`.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Encoding, FieldDescriptor, FieldSchema, Result};

/// A message type that can cross the host boundary.
///
/// Implementations are normally generated by [`message!`](crate::message);
/// the schema and qualified name are computed once per type and cached.
pub trait ProductionMessage:
    Serialize + DeserializeOwned + Default + Clone + fmt::Debug + Send + 'static
{
    /// Class name, without package
    const NAME: &'static str;

    /// Wire encoding used for this type
    const ENCODING: Encoding;

    /// Package the type belongs to
    fn package() -> &'static str;

    /// `package.ClassName`
    fn qualified_name() -> &'static str;

    /// Declared fields, in declaration order
    fn descriptors() -> &'static [FieldDescriptor];

    /// Cached field schema
    fn schema() -> Result<&'static FieldSchema>;

    /// Read one field as a dynamic value
    fn field(&self, name: &str) -> Result<Value>;

    /// Overwrite one field from a dynamic value
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    /// `(name, value)` pairs in schema order
    fn fields(&self) -> Result<Vec<(&'static str, Value)>> {
        Self::schema()?
            .all_fields()
            .iter()
            .map(|name| Ok((*name, self.field(name)?)))
            .collect()
    }
}

#[doc(hidden)]
pub fn display_fields<M: ProductionMessage>(message: &M, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}(", M::NAME)?;
    if let Ok(schema) = M::schema() {
        for (index, name) in schema.all_fields().iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match message.field(name) {
                Ok(value) => write!(f, "{name}={value}")?,
                Err(_) => write!(f, "{name}=?")?,
            }
        }
    }
    f.write_str(")")
}

/// Declare a production message type.
///
/// ```text
/// message! {
///     [attributes]
///     [vis] struct Name [in "package"] as Json|Binary {
///         [#[column]] [attributes] [vis] field: Type [= default],
///         ...
///     }
/// }
/// ```
///
/// Without `in "package"` the package is the last segment of the declaring
/// module path. Fields without an explicit default take `Default::default()`.
/// `#[column]` may sit anywhere among a field's attributes; every other
/// attribute, doc comments included, is kept on the generated field.
#[macro_export]
macro_rules! message {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(in $package:literal)? as $encoding:ident {
            $($body:tt)*
        }
    ) => {
        $crate::__message_fields! {
            @header [$(#[$meta])* $vis struct $name $(in $package)? as $encoding]
            @fields []
            @column false
            @attrs []
            @rest $($body)*
        }
    };
}

/// Splits a `message!` body into one normalized entry per field:
/// `(column) [attributes] vis name: Type [= default];`
#[doc(hidden)]
#[macro_export]
macro_rules! __message_fields {
    (
        @header [$($header:tt)*]
        @fields [$($fields:tt)*]
        @column $column:tt
        @attrs $attrs:tt
        @rest
    ) => {
        $crate::__message_impl! { $($header)* { $($fields)* } }
    };
    (
        @header $header:tt
        @fields $fields:tt
        @column $column:tt
        @attrs $attrs:tt
        @rest #[column] $($rest:tt)*
    ) => {
        $crate::__message_fields! {
            @header $header
            @fields $fields
            @column true
            @attrs $attrs
            @rest $($rest)*
        }
    };
    (
        @header $header:tt
        @fields $fields:tt
        @column $column:tt
        @attrs [$($attrs:tt)*]
        @rest #[$attr:meta] $($rest:tt)*
    ) => {
        $crate::__message_fields! {
            @header $header
            @fields $fields
            @column $column
            @attrs [$($attrs)* #[$attr]]
            @rest $($rest)*
        }
    };
    (
        @header $header:tt
        @fields [$($fields:tt)*]
        @column $column:tt
        @attrs [$($attrs:tt)*]
        @rest $field_vis:vis $field:ident : $ty:ty = $default:expr $(, $($rest:tt)*)?
    ) => {
        $crate::__message_fields! {
            @header $header
            @fields [$($fields)* ($column) [$($attrs)*] $field_vis $field : $ty = $default ;]
            @column false
            @attrs []
            @rest $($($rest)*)?
        }
    };
    (
        @header $header:tt
        @fields [$($fields:tt)*]
        @column $column:tt
        @attrs [$($attrs:tt)*]
        @rest $field_vis:vis $field:ident : $ty:ty $(, $($rest:tt)*)?
    ) => {
        $crate::__message_fields! {
            @header $header
            @fields [$($fields)* ($column) [$($attrs)*] $field_vis $field : $ty ;]
            @column false
            @attrs []
            @rest $($($rest)*)?
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __message_impl {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(in $package:literal)? as $encoding:ident {
            $(
                ($column:tt) [$(#[$attr:meta])*]
                $field_vis:vis $field:ident : $ty:ty $(= $default:expr)? ;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $( $(#[$attr])* $field_vis $field: $ty, )*
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                Self {
                    $( $field: $crate::__field_default!($ty $(, $default)?), )*
                }
            }
        }

        impl $crate::ProductionMessage for $name {
            const NAME: &'static str = ::core::stringify!($name);
            const ENCODING: $crate::Encoding = $crate::Encoding::$encoding;

            fn package() -> &'static str {
                $crate::__package!($($package)?)
            }

            fn qualified_name() -> &'static str {
                static QUALIFIED: ::std::sync::OnceLock<::std::string::String> =
                    ::std::sync::OnceLock::new();
                QUALIFIED
                    .get_or_init(|| {
                        ::std::format!(
                            "{}.{}",
                            <Self as $crate::ProductionMessage>::package(),
                            ::core::stringify!($name),
                        )
                    })
                    .as_str()
            }

            fn descriptors() -> &'static [$crate::FieldDescriptor] {
                const FIELDS: &[$crate::FieldDescriptor] = &[
                    $(
                        $crate::FieldDescriptor::new(
                            ::core::stringify!($field),
                            $column,
                        ),
                    )*
                ];
                FIELDS
            }

            fn schema() -> $crate::Result<&'static $crate::FieldSchema> {
                static SCHEMA: ::std::sync::OnceLock<
                    ::core::result::Result<$crate::FieldSchema, $crate::SchemaError>,
                > = ::std::sync::OnceLock::new();
                SCHEMA
                    .get_or_init(|| {
                        $crate::FieldSchema::extract(
                            ::core::stringify!($name),
                            <Self as $crate::ProductionMessage>::package(),
                            <Self as $crate::ProductionMessage>::descriptors(),
                        )
                    })
                    .as_ref()
                    .map_err(|err| $crate::Error::from(::core::clone::Clone::clone(err)))
            }

            fn field(&self, name: &str) -> $crate::Result<$crate::__private::Value> {
                $(
                    if name == ::core::stringify!($field) {
                        return $crate::__private::field_to_value(
                            <Self as $crate::ProductionMessage>::qualified_name(),
                            ::core::stringify!($field),
                            &self.$field,
                        );
                    }
                )*
                ::core::result::Result::Err($crate::Error::UnknownField {
                    type_name: <Self as $crate::ProductionMessage>::qualified_name(),
                    field: ::std::string::ToString::to_string(name),
                })
            }

            fn set_field(
                &mut self,
                name: &str,
                value: $crate::__private::Value,
            ) -> $crate::Result<()> {
                $(
                    if name == ::core::stringify!($field) {
                        self.$field = $crate::__private::field_from_value(
                            <Self as $crate::ProductionMessage>::qualified_name(),
                            ::core::stringify!($field),
                            value,
                        )?;
                        return ::core::result::Result::Ok(());
                    }
                )*
                ::core::result::Result::Err($crate::Error::UnknownField {
                    type_name: <Self as $crate::ProductionMessage>::qualified_name(),
                    field: ::std::string::ToString::to_string(name),
                })
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                $crate::__private::display_fields(self, f)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __field_default {
    ($ty:ty) => {
        <$ty as ::core::default::Default>::default()
    };
    ($ty:ty, $default:expr) => {{
        let value: $ty = $default;
        value
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __package {
    () => {
        $crate::__private::package_from_module(::core::module_path!())
    };
    ($package:literal) => {
        $package
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    crate::message! {
        struct Invoice in "billing" as Json {
            number: u32,
            #[column]
            total: i64 = 250,
            memo: String = "n/a".to_owned(),
            tags: Vec<String>,
        }
    }

    crate::message! {
        struct Receipt as Binary {
            #[column]
            code: u16,
        }
    }

    crate::message! {
        /// A station reading
        pub struct Reading in "telemetry" as Json {
            /// Station identifier
            #[column]
            pub station: String,
            #[column]
            /// Measured value
            #[serde(alias = "val")]
            pub value: f64 = 1.5,
            /// Whether the sensor flagged the value
            pub flagged: bool
        }
    }

    #[test]
    fn test_field_attributes_pass_through() {
        let schema = Reading::schema().unwrap();
        assert_eq!(schema.all_fields(), &["station", "value", "flagged"]);
        assert_eq!(schema.column_fields(), &["station", "value"]);
        assert!((Reading::default().value - 1.5).abs() < f64::EPSILON);

        let reading: Reading = Encoding::Json
            .decode(br#"{"station":"north","val":2.5,"flagged":true}"#)
            .unwrap();
        assert_eq!(reading.station, "north");
        assert!((reading.value - 2.5).abs() < f64::EPSILON);
        assert!(reading.flagged);
        assert_eq!(
            Encoding::Json.encode(&reading).unwrap(),
            r#"{"station":"north","value":2.5,"flagged":true}"#
        );
    }

    #[test]
    fn test_declared_defaults() {
        let invoice = Invoice::default();
        assert_eq!(invoice.number, 0);
        assert_eq!(invoice.total, 250);
        assert_eq!(invoice.memo, "n/a");
        assert!(invoice.tags.is_empty());
    }

    #[test]
    fn test_names_and_encoding() {
        assert_eq!(Invoice::NAME, "Invoice");
        assert_eq!(Invoice::qualified_name(), "billing.Invoice");
        assert_eq!(Invoice::ENCODING, Encoding::Json);
        // package falls back to the declaring module
        assert_eq!(Receipt::package(), "tests");
        assert_eq!(Receipt::qualified_name(), "tests.Receipt");
        assert_eq!(Receipt::ENCODING, Encoding::Binary);
    }

    #[test]
    fn test_schema_is_cached() {
        let first = Invoice::schema().unwrap();
        let second = Invoice::schema().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.all_fields(), &["number", "total", "memo", "tags"]);
        assert_eq!(first.column_fields(), &["total"]);
    }

    #[test]
    fn test_dynamic_field_access() {
        let mut invoice = Invoice::default();
        invoice.set_field("number", json!(42)).unwrap();
        invoice.set_field("tags", json!(["a", "b"])).unwrap();
        assert_eq!(invoice.number, 42);
        assert_eq!(invoice.field("tags").unwrap(), json!(["a", "b"]));

        let fields = invoice.fields().unwrap();
        let names: Vec<_> = fields.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["number", "total", "memo", "tags"]);
    }

    #[test]
    fn test_dynamic_field_errors() {
        let mut invoice = Invoice::default();
        assert!(matches!(
            invoice.field("missing"),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(
            invoice.set_field("number", json!("not a number")),
            Err(Error::FieldType { field: "number", .. })
        ));
        assert_eq!(invoice.number, 0);
    }

    #[test]
    fn test_display_in_schema_order() {
        let receipt = Receipt { code: 7 };
        assert_eq!(receipt.to_string(), "Receipt(code=7)");

        let invoice = Invoice {
            number: 1,
            ..Invoice::default()
        };
        assert_eq!(
            invoice.to_string(),
            "Invoice(number=1, total=250, memo=\"n/a\", tags=[])"
        );
    }
}
