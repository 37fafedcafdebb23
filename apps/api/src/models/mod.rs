// Row types for every table, plus the TEXT-backed enums stored in their columns.

use thiserror::Error;

/// Raised when a TEXT column or request value names no known variant.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares an enum persisted as lowercase TEXT.
///
/// Generates serde (de)serialization, `as_str`, `Display`, `FromStr` and the sqlx
/// `Type`/`Encode`/`Decode` impls so the enum binds and decodes like a `String`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::models::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<$name>()?)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub(crate) use text_enum;

pub mod application;
pub mod candidate;
pub mod client;
pub mod interview;
pub mod requirement;
pub mod user;

#[cfg(test)]
mod tests {
    use crate::models::requirement::{EmploymentMode, Priority, RequirementStatus};

    #[test]
    fn test_text_enum_round_trips_through_str() {
        for status in RequirementStatus::ALL {
            assert_eq!(status.as_str().parse::<RequirementStatus>(), Ok(*status));
        }
        assert_eq!(EmploymentMode::Contract.to_string(), "contract");
    }

    #[test]
    fn test_text_enum_rejects_unknown_value() {
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert_eq!(err.kind, "Priority");
        assert_eq!(err.to_string(), "unknown Priority 'urgent'");
    }

    #[test]
    fn test_text_enum_serde_uses_snake_case_text() {
        let json = serde_json::to_string(&RequirementStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: RequirementStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(parsed, RequirementStatus::OnHold);
    }
}
