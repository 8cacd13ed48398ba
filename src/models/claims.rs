//! Token claims.
//!
//! Claims are a free-form JSON object so that custom claims builders can
//! add whatever they need. Two keys are reserved and always written by the
//! token service: [`EXP_KEY`] and [`ORIG_IAT_KEY`].

use serde_json::{Map, Value};

use crate::error::AppError;

/// Claims map embedded in every token.
pub type MapClaims = Map<String, Value>;

/// Expiry, unix seconds.
pub const EXP_KEY: &str = "exp";

/// Time of issuance or last refresh, unix seconds.
pub const ORIG_IAT_KEY: &str = "orig_iat";

/// Verified claims of the current request.
///
/// Inserted into request extensions by the token middleware so handlers
/// can extract them with `Extension<TokenClaims>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims(pub MapClaims);

/// Read a unix-seconds claim, accepting integers and floats.
///
/// # Errors
///
/// `MalformedToken` if the claim is absent or not a number.
pub fn timestamp(claims: &MapClaims, key: &str) -> Result<i64, AppError> {
    let value = claims.get(key).ok_or(match key {
        EXP_KEY => AppError::MalformedToken("missing exp field"),
        ORIG_IAT_KEY => AppError::MalformedToken("missing orig_iat field"),
        _ => AppError::MalformedToken("missing timestamp field"),
    })?;

    value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs as i64))
        .ok_or(match key {
            EXP_KEY => AppError::MalformedToken("exp must be a number"),
            _ => AppError::MalformedToken("timestamp claim must be a number"),
        })
}
