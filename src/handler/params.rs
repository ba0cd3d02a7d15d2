//! Typed binding of path parameters.
//!
//! A destination type describes its fields once through the [`params!`]
//! macro. The generated table maps a lookup key (an explicit `=> "key"`
//! rename, otherwise the field name) to a setter, and is built on first use
//! and cached for the life of the process.
//!
//! ```
//! use tessera::params;
//!
//! #[derive(Default)]
//! struct AccountPath {
//!     name: String,
//!     user_id: u64,
//! }
//!
//! params!(AccountPath { name, user_id => "id" });
//! ```
//!
//! [`params!`]: crate::params

use thiserror::Error;

/// Failure while coercing a captured segment into a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("cannot convert '{value}' to {kind}")]
    Coerce { value: String, kind: &'static str },
}

/// Field types a path parameter can be coerced into.
pub trait FromParam: Sized {
    /// Kind name reported in coercion errors.
    const KIND: &'static str;

    fn from_param(raw: &str) -> Option<Self>;
}

impl FromParam for String {
    const KIND: &'static str = "string";

    fn from_param(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FromParam for bool {
    const KIND: &'static str = "bool";

    fn from_param(raw: &str) -> Option<Self> {
        match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
            _ => None,
        }
    }
}

macro_rules! parse_param {
    ($($ty:ty => $kind:literal),* $(,)?) => {
        $(
            impl FromParam for $ty {
                const KIND: &'static str = $kind;

                fn from_param(raw: &str) -> Option<Self> {
                    raw.parse().ok()
                }
            }
        )*
    };
}

parse_param! {
    i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64", i128 => "i128", isize => "isize",
    u8 => "u8", u16 => "u16", u32 => "u32", u64 => "u64", u128 => "u128", usize => "usize",
    f32 => "f32", f64 => "f64",
}

/// Coerce a raw segment into `T`, naming the value and target kind on failure.
pub fn coerce<T: FromParam>(raw: &str) -> Result<T, ParamError> {
    T::from_param(raw).ok_or_else(|| ParamError::Coerce {
        value: raw.to_string(),
        kind: T::KIND,
    })
}

/// One entry of a destination type's field table.
pub struct ParamField<T> {
    key: &'static str,
    assign: fn(&mut T, &str) -> Result<(), ParamError>,
}

impl<T> ParamField<T> {
    pub const fn new(key: &'static str, assign: fn(&mut T, &str) -> Result<(), ParamError>) -> Self {
        Self { key, assign }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }
}

/// A type whose fields can be filled from named path parameters.
pub trait Params: Sized + 'static {
    /// The cached field table.
    fn fields() -> &'static [ParamField<Self>];

    /// Assign every field that has a captured value. Fields without one keep
    /// their current value.
    fn bind(&mut self, params: &[(String, String)]) -> Result<(), ParamError> {
        for field in Self::fields() {
            if let Some((_, value)) = params.iter().find(|(name, _)| name == field.key) {
                (field.assign)(self, value)?;
            }
        }
        Ok(())
    }
}

/// Implement [`Params`] for a struct by listing the fields to bind.
///
/// Each field's type must implement [`FromParam`].
#[macro_export]
macro_rules! params {
    (@key $field:ident => $key:literal) => {
        $key
    };
    (@key $field:ident) => {
        ::std::stringify!($field)
    };
    ($ty:ty { $($field:ident $(=> $key:literal)?),* $(,)? }) => {
        impl $crate::handler::params::Params for $ty {
            fn fields() -> &'static [$crate::handler::params::ParamField<Self>] {
                static FIELDS: ::std::sync::OnceLock<
                    ::std::vec::Vec<$crate::handler::params::ParamField<$ty>>,
                > = ::std::sync::OnceLock::new();
                FIELDS.get_or_init(|| {
                    ::std::vec![
                        $(
                            $crate::handler::params::ParamField::new(
                                $crate::params!(@key $field $(=> $key)?),
                                |target: &mut $ty, raw: &str| {
                                    target.$field = $crate::handler::params::coerce(raw)?;
                                    ::std::result::Result::Ok(())
                                },
                            ),
                        )*
                    ]
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Target {
        name: String,
        age: u8,
        score: f32,
        active: bool,
        offset: i64,
    }

    crate::params!(Target { name, age => "years", score, active, offset });

    fn captured(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_binds_by_field_name_and_rename() {
        let mut target = Target::default();
        target
            .bind(&captured(&[("name", "Ann Lee"), ("years", "42"), ("score", "1.5"), ("active", "T"), ("offset", "-7")]))
            .unwrap();
        assert_eq!(
            target,
            Target {
                name: "Ann Lee".into(),
                age: 42,
                score: 1.5,
                active: true,
                offset: -7,
            }
        );
    }

    #[test]
    fn test_missing_fields_untouched() {
        let mut target = Target {
            name: "kept".into(),
            age: 9,
            ..Default::default()
        };
        // "age" is only reachable through its rename.
        target.bind(&captured(&[("age", "200")])).unwrap();
        assert_eq!(target.name, "kept");
        assert_eq!(target.age, 9);
    }

    #[test]
    fn test_coercion_failure_names_value_and_kind() {
        let mut target = Target::default();
        let err = target.bind(&captured(&[("years", "300")])).unwrap_err();
        assert_eq!(
            err,
            ParamError::Coerce {
                value: "300".into(),
                kind: "u8"
            }
        );
        assert_eq!(err.to_string(), "cannot convert '300' to u8");
    }

    #[test]
    fn test_bool_forms() {
        for raw in ["1", "t", "TRUE", "True"] {
            assert_eq!(coerce::<bool>(raw), Ok(true));
        }
        for raw in ["0", "f", "FALSE", "False"] {
            assert_eq!(coerce::<bool>(raw), Ok(false));
        }
        assert!(coerce::<bool>("yes").is_err());
    }

    #[test]
    fn test_field_table_is_cached() {
        let first = Target::fields().as_ptr();
        let second = Target::fields().as_ptr();
        assert_eq!(first, second);
        let keys: Vec<_> = Target::fields().iter().map(ParamField::key).collect();
        assert_eq!(keys, ["name", "years", "score", "active", "offset"]);
    }
}
