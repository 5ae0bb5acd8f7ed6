use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::errors::MessageProcessingError;
use super::messages::parse_payload;
use super::messages::LoginRequest;
use super::messages::RegisterUserRequest;
use super::messages::RequestEnvelope;
use super::messages::ResponseEnvelope;
use super::messages::RpcError;
use super::messages::VerifyUserRequest;
use super::messages::LOGIN;
use super::messages::REGISTER_USER;
use super::messages::VERIFY_USER;
use crate::domain::user::ports::AuthServicePort;
use crate::user::errors::AuthError;
use crate::user::errors::ErrorKind;

/// Reply produced for one request, with the topic it was asked to go to.
#[derive(Debug, Clone)]
pub struct Reply {
    pub reply_to: Option<String>,
    pub envelope: ResponseEnvelope,
}

/// Decodes bus requests, runs them against the auth service under a
/// deadline and builds the reply envelope. Knows nothing about Kafka.
pub struct MessageDispatcher<S: AuthServicePort> {
    service: Arc<S>,
    request_timeout: Duration,
}

impl<S: AuthServicePort> MessageDispatcher<S> {
    pub fn new(service: Arc<S>, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }

    /// Handle one raw request.
    ///
    /// # Errors
    /// Only when the envelope itself cannot be decoded; without a correlation
    /// id there is nobody to reply to. Every other failure becomes an error reply.
    pub async fn dispatch(&self, payload: &[u8]) -> Result<Reply, MessageProcessingError> {
        let json_string = std::str::from_utf8(payload)?;
        let request = serde_json::from_str::<RequestEnvelope>(json_string)?;

        tracing::debug!(
            correlation_id = %request.id,
            cmd = %request.pattern.cmd,
            "Received request"
        );

        let outcome = match tokio::time::timeout(
            self.request_timeout,
            self.handle(&request.pattern.cmd, request.data),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    correlation_id = %request.id,
                    cmd = %request.pattern.cmd,
                    timeout = ?self.request_timeout,
                    "Request deadline exceeded"
                );
                Err(RpcError::timed_out())
            }
        };

        if let Err(error) = &outcome {
            tracing::debug!(
                correlation_id = %request.id,
                status = error.status,
                message = %error.message,
                "Request rejected"
            );
        }

        Ok(Reply {
            reply_to: request.reply_to,
            envelope: ResponseEnvelope::new(request.id, outcome),
        })
    }

    async fn handle(&self, cmd: &str, data: Value) -> Result<Value, RpcError> {
        match cmd {
            LOGIN => {
                let command = parse_payload::<LoginRequest>(data)?.try_into_command()?;
                let outcome = self.service.login(command).await.map_err(service_error)?;
                to_response(&outcome)
            }
            REGISTER_USER => {
                let command = parse_payload::<RegisterUserRequest>(data)?.try_into_command()?;
                let user = self.service.register(command).await.map_err(service_error)?;
                to_response(&user)
            }
            VERIFY_USER => {
                let token = parse_payload::<VerifyUserRequest>(data)?.try_into_token()?;
                let user = self.service.verify(&token).await.map_err(service_error)?;
                to_response(&user)
            }
            other => {
                tracing::warn!(cmd = %other, "No handler for request pattern");
                Err(RpcError::unknown_pattern())
            }
        }
    }
}

fn service_error(err: AuthError) -> RpcError {
    if err.kind() == ErrorKind::Internal {
        tracing::error!(error = %err, "Request failed with internal error");
    }
    RpcError::from(err)
}

fn to_response<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize response");
        RpcError::internal()
    })
}
