//! Media-token provider port.
//!
//! Joining a media session requires an access token scoped to the channel
//! name. Resolving one is the caller's first step when sending an invitation;
//! a provider failure aborts the send before anything reaches the transport.

use async_trait::async_trait;
use thiserror::Error;

/// Role requested for a media token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRole {
    Publisher,
    Subscriber,
}

/// An opaque media access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaToken {
    pub token: String,
}

#[derive(Debug, Error)]
#[error("token provider failure: {reason}")]
pub struct TokenError {
    pub reason: String,
}

/// External collaborator that mints media-session tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self, channel_name: &str, role: TokenRole) -> Result<MediaToken, TokenError>;
}

/// Provider returning one fixed token. Useful in tests and for backends
/// where the socket connection itself carries the media authorization.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(
        &self,
        _channel_name: &str,
        _role: TokenRole,
    ) -> Result<MediaToken, TokenError> {
        Ok(MediaToken {
            token: self.token.clone(),
        })
    }
}
