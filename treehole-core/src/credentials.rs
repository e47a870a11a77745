// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolve the identity of a caller from request headers.
//!
//! Requests reach this service through a gateway which authenticates the caller and forwards the
//! numeric user id in the [`PROXY_USER_HEADER`]. In addition every request carries the caller's
//! access token, either in the `Authorization` header or in the [`ACCESS_COOKIE`]. The token is a
//! three-part, dot-separated JWT whose payload holds the claims of the caller.
//!
//! The token signature is _not_ verified here, the gateway is trusted to only forward requests
//! with valid tokens.
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine, alphabet};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::user::UserId;

/// Header set by the gateway, holding the numeric id of the authenticated user.
pub const PROXY_USER_HEADER: &str = "X-Consumer-Username";

/// Header holding the access token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Cookie holding the access token when no `Authorization` header was sent.
pub const ACCESS_COOKIE: &str = "access";

const BEARER_SCHEME: &str = "Bearer ";

// JWT segments are encoded without padding, but some issuers pad them anyway. Both the URL-safe
// alphabet used by the JWT standard and the standard alphabet are accepted.
const PADDING_INDIFFERENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const URL_SAFE_PAYLOAD: GeneralPurpose =
    GeneralPurpose::new(&alphabet::URL_SAFE, PADDING_INDIFFERENT);

const STANDARD_PAYLOAD: GeneralPurpose =
    GeneralPurpose::new(&alphabet::STANDARD, PADDING_INDIFFERENT);

/// Read access to the headers and cookies of an incoming request.
pub trait RequestHeaders {
    /// Returns the value of a header, matched case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;

    /// Returns the value of a cookie.
    fn cookie(&self, name: &str) -> Option<&str>;
}

/// Claims carried in the payload of an access token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub id: Option<UserId>,

    #[serde(default)]
    pub is_admin: bool,

    #[serde(default)]
    pub nickname: Option<String>,

    #[serde(default)]
    pub joined_time: Option<String>,
}

impl Claims {
    /// Decodes the claims from the payload segment of a token.
    ///
    /// An optional leading `Bearer ` scheme is ignored.
    pub fn from_token(token: &str) -> Result<Self, CredentialError> {
        let token = token.strip_prefix(BEARER_SCHEME).unwrap_or(token).trim();

        let segments: Vec<&str> = token.splitn(3, '.').collect();
        if segments.len() < 3 {
            return Err(CredentialError::MalformedToken(segments.len()));
        }

        // The middle segment is the payload.
        let payload = URL_SAFE_PAYLOAD
            .decode(segments[1])
            .or_else(|_| STANDARD_PAYLOAD.decode(segments[1]))
            .map_err(CredentialError::InvalidPayloadEncoding)?;

        serde_json::from_slice(&payload).map_err(CredentialError::InvalidClaims)
    }
}

/// Identity of the caller of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: UserId,

    pub claims: Claims,
}

impl Credentials {
    /// Resolves the caller from the gateway header and the access token.
    ///
    /// The user id forwarded by the gateway is authoritative, a differing id in the token claims
    /// is ignored.
    pub fn from_headers<H: RequestHeaders>(headers: &H) -> Result<Self, CredentialError> {
        let user_id = user_id_from_headers(headers)?;
        let claims = Claims::from_token(access_token(headers)?)?;

        if let Some(claimed_id) = claims.id
            && claimed_id != user_id
        {
            debug!(user_id, claimed_id, "token claims a different user id than the gateway");
        }

        Ok(Self { user_id, claims })
    }

    pub fn is_admin(&self) -> bool {
        self.claims.is_admin
    }
}

/// Parses the user id the gateway forwarded for this request.
pub fn user_id_from_headers<H: RequestHeaders>(headers: &H) -> Result<UserId, CredentialError> {
    let value = headers
        .header(PROXY_USER_HEADER)
        .ok_or(CredentialError::MissingProxyHeader)?;

    value
        .trim()
        .parse()
        .map_err(|_| CredentialError::InvalidProxyHeader(value.to_string()))
}

/// Returns the access token from the `Authorization` header, falling back to the access cookie.
pub fn access_token<H: RequestHeaders>(headers: &H) -> Result<&str, CredentialError> {
    headers
        .header(AUTHORIZATION_HEADER)
        .filter(|value| !value.is_empty())
        .or_else(|| headers.cookie(ACCESS_COOKIE))
        .filter(|value| !value.is_empty())
        .ok_or(CredentialError::MissingToken)
}

/// The caller could not be authenticated.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("missing 'X-Consumer-Username' header")]
    MissingProxyHeader,

    #[error("'X-Consumer-Username' header is not a numeric user id: {0}")]
    InvalidProxyHeader(String),

    #[error("bearer token required")]
    MissingToken,

    #[error("jwt token required, found {0} segment(s) instead of 3")]
    MalformedToken(usize),

    #[error("could not decode token payload: {0}")]
    InvalidPayloadEncoding(base64::DecodeError),

    #[error("could not parse token claims: {0}")]
    InvalidClaims(serde_json::Error),
}
