//! Discovery result codes
//!
//! Every failure of a discovery round is an explicit variant; nothing panics
//! across the conversation boundary.

use doip_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DiscoveryError {
    /// Request failed the parameter validation hook.
    #[error("invalid request parameters")]
    InvalidParameters,

    /// The broadcast send failed; the correlation store was not touched.
    #[error("vehicle identification request could not be transmitted")]
    TransmitFailed(#[source] TransportError),

    /// No announcement arrived within the caller's collection window.
    #[error("no vehicle identification response received")]
    NoResponseReceived,

    /// `send_vehicle_identification_request` was called before a transport
    /// was registered with the conversation.
    #[error("no discovery transport registered")]
    TransportNotRegistered,
}
