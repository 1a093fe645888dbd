//! Account input parameters and their mapping to stored fields.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::constants::DEFAULT_CONFIRMED;
use crate::error::{DomainError, DomainResult};
use crate::password::Password;

/// Raw account parameters as received from a caller.
///
/// Every field is optional; [`format_params`] decides which fallback a
/// missing field gets.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserParams {
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub confirmed: Option<bool>,
    pub confirmation_code: Option<String>,
    /// Outer None = key absent, `Some(None)` = explicit null
    #[serde(default, deserialize_with = "deserialize_space")]
    pub available_space: Option<Option<i64>>,
    /// Role ids to assign
    pub roles: Option<Vec<Uuid>>,
    /// Permission names to grant; replaces the whole override map
    pub permissions: Option<Vec<String>>,
}

impl UserParams {
    /// Parameters carrying only an email address.
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }
}

/// Which write path the parameters are formatted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Create,
    Update,
}

/// Login credentials, only written when an account is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password_hash: Option<String>,
}

/// Column values produced by [`format_params`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFields {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: String,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub confirmed: bool,
    pub confirmation_code: Option<String>,
    /// None = leave the stored quota untouched
    pub available_space: Option<Option<i64>>,
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

/// Everything needed to insert a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub credentials: Credentials,
    pub fields: UserFields,
    pub access_token: String,
}

/// Map caller parameters onto stored fields.
///
/// Absent fields fall back to fixed defaults (`language` to
/// `default_language`, `confirmed` to true, the rest to null), so an update
/// overwrites every profile field. `available_space` is only carried when
/// the key was present. Email and password are only read on
/// [`FormatKind::Create`]; the password is hashed here.
pub fn format_params(
    params: &UserParams,
    kind: FormatKind,
    default_language: &str,
) -> DomainResult<UserFields> {
    let credentials = match kind {
        FormatKind::Create => {
            params.validate()?;

            let email = params
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .ok_or_else(|| DomainError::validation("email is required"))?
                .to_string();

            let password_hash = match params.password.as_deref().filter(|p| !p.is_empty()) {
                Some(plain) => Some(Password::new(plain)?.into_string()),
                None => None,
            };

            Some(Credentials {
                email,
                password_hash,
            })
        }
        FormatKind::Update => None,
    };

    Ok(UserFields {
        username: params.username.clone(),
        first_name: params.first_name.clone(),
        last_name: params.last_name.clone(),
        language: params
            .language
            .clone()
            .unwrap_or_else(|| default_language.to_string()),
        country: params.country.clone(),
        timezone: params.timezone.clone(),
        confirmed: params.confirmed.unwrap_or(DEFAULT_CONFIRMED),
        confirmation_code: params.confirmation_code.clone(),
        available_space: params.available_space,
        credentials,
    })
}

/// Accepts integers, floats (truncated), numeric strings and null.
fn deserialize_space<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    cast_space(&value)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

fn cast_space(value: &Value) -> Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| format!("available_space out of range: {}", n)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                .map(Some)
                .map_err(|_| format!("available_space must be numeric, got {:?}", s))
        }
        Value::Bool(b) => Ok(Some(i64::from(*b))),
        other => Err(format!("available_space must be numeric, got {}", other)),
    }
}
