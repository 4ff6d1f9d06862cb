//! Callback message validation.
//!
//! A message is acted on only when every check passes, in this order:
//! payload is an object, origin is trusted, `type` belongs to the platform,
//! state/nonce match the pending flow. Anything else is ignored and logged
//! at debug level only.

use siteconnect_core::{
    state_prefix, MessageKind, OAuthMessage, PendingAuthFlow, PlatformDescriptor,
    TrustedOriginSet, WindowMessage,
};
use tracing::debug;

/// Why a message was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotAnObject,
    UntrustedOrigin,
    ForeignType,
    CorrelationMismatch,
}

/// A message that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMessage {
    pub kind: MessageKind,
    pub message: OAuthMessage,
}

pub fn validate_message(
    event: &WindowMessage,
    trusted: &TrustedOriginSet,
    descriptor: &PlatformDescriptor,
    flow: &PendingAuthFlow,
) -> Result<AcceptedMessage, Rejection> {
    let message = OAuthMessage::from_data(&event.data).ok_or(Rejection::NotAnObject)?;

    if !trusted.contains(&event.origin) {
        debug!(
            "[OAuth] Ignoring {} message from untrusted origin {}",
            descriptor.id, event.origin
        );
        return Err(Rejection::UntrustedOrigin);
    }

    let kind = descriptor
        .classify(&message.message_type)
        .ok_or(Rejection::ForeignType)?;

    if !flow.matches_correlation(message.state.as_deref(), message.nonce.as_deref()) {
        debug!(
            "[OAuth] Ignoring {} from {}: correlation mismatch (state={:?}, pending={})",
            message.message_type,
            event.origin,
            message.state.as_deref().map(state_prefix),
            flow.state_prefix()
        );
        return Err(Rejection::CorrelationMismatch);
    }

    Ok(AcceptedMessage { kind, message })
}
