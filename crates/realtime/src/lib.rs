mod client;
mod wire;

pub use client::{
    ChannelClient, ChannelConfig, ChannelState, DEFAULT_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_DELAY, DEFAULT_REQUEST_TIMEOUT,
};
pub use wire::{
    EV_ACTIVITY_UPDATE, EV_ACTIVITY_UPDATED, EV_AUTHENTICATE, EV_COURSE_COMPLETE,
    EV_COURSE_ENROLL, EV_DASHBOARD_REFRESH, EV_TOKEN_UPDATE, EV_TOKEN_UPDATED, Frame, ServerEvent,
};

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Precondition failure: the operation requires a live connection and
    /// never emits a frame without one.
    #[error("channel not connected")]
    NotConnected,
    /// Neither the success nor the error response arrived before the
    /// request deadline.
    #[error("request timed out")]
    Timeout,
    /// The server answered with an explicit error frame.
    #[error("{message}")]
    Rejected { message: String },
    /// The channel was torn down while the request was in flight.
    #[error("channel closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
