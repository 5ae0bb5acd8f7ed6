use http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterCommand;
use crate::user::errors::AuthError;
use crate::user::errors::EmailError;
use crate::user::errors::ErrorKind;

pub const LOGIN: &str = "login";
pub const REGISTER_USER: &str = "register_user";
pub const VERIFY_USER: &str = "verify_user";

/// Inbound request as it arrives on the bus.
///
/// `id` correlates the reply with the request; `reply_to` overrides the
/// default reply topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: String,
    pub pattern: Pattern,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub cmd: String,
}

/// Reply sent back for every request that carried a correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: String,
    pub response: Option<Value>,
    pub err: Option<RpcError>,
    #[serde(rename = "isDisposed")]
    pub is_disposed: bool,
}

impl ResponseEnvelope {
    pub fn new(id: String, outcome: Result<Value, RpcError>) -> Self {
        let (response, err) = match outcome {
            Ok(value) => (Some(value), None),
            Err(error) => (None, Some(error)),
        };

        Self {
            id,
            response,
            err,
            is_disposed: true,
        }
    }
}

/// Transport-level error: a status code plus a caller-safe message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub status: u16,
    pub message: String,
}

impl RpcError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn unknown_pattern() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "There is no matching message handler defined in the remote service.",
        )
    }

    pub fn timed_out() -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, "Request timed out")
    }
}

impl From<AuthError> for RpcError {
    fn from(err: AuthError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => RpcError::new(StatusCode::NOT_FOUND, err.to_string()),
            ErrorKind::Unauthorized => RpcError::new(StatusCode::UNAUTHORIZED, err.to_string()),
            ErrorKind::Conflict => RpcError::new(StatusCode::CONFLICT, err.to_string()),
            // Infrastructure detail stays in the logs
            ErrorKind::Internal => RpcError::internal(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseRequestError {
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

impl From<ParseRequestError> for RpcError {
    fn from(err: ParseRequestError) -> Self {
        RpcError::bad_request(err.to_string())
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, ParseRequestError> {
    if value.trim().is_empty() {
        Err(ParseRequestError::Empty(field))
    } else {
        Ok(value)
    }
}

/// Payload of a `login` request
#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

impl LoginRequest {
    pub fn try_into_command(self) -> Result<LoginCommand, ParseRequestError> {
        let email = EmailAddress::new(self.email)?;
        let password = non_empty("password", self.password)?;
        Ok(LoginCommand::new(email, password))
    }
}

/// Payload of a `register_user` request
#[derive(Deserialize)]
pub struct RegisterUserRequest {
    name: String,
    email: String,
    password: String,
}

impl RegisterUserRequest {
    pub fn try_into_command(self) -> Result<RegisterCommand, ParseRequestError> {
        let name = non_empty("name", self.name)?;
        let email = EmailAddress::new(self.email)?;
        let password = non_empty("password", self.password)?;
        Ok(RegisterCommand::new(name, email, password))
    }
}

/// Payload of a `verify_user` request
#[derive(Deserialize)]
pub struct VerifyUserRequest {
    token: String,
}

impl VerifyUserRequest {
    pub fn try_into_token(self) -> Result<String, ParseRequestError> {
        non_empty("token", self.token)
    }
}

/// Deserialize a request payload into its typed form.
pub fn parse_payload<T: for<'de> Deserialize<'de>>(data: Value) -> Result<T, ParseRequestError> {
    Ok(serde_json::from_value(data)?)
}
