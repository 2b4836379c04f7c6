//! Wire protocol: JSON text frames of `{event, request_id?, data}`.
//!
//! Request/response operations carry an explicit correlation id; the
//! server echoes it on the matching `:success` or `:error` frame.
//! Everything else is a plain server push.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use skillswap_core::BalanceUpdate;

pub const EV_AUTHENTICATE: &str = "authenticate";
pub const EV_TOKEN_UPDATED: &str = "token:updated";
pub const EV_ACTIVITY_UPDATED: &str = "activity:updated";
pub const EV_DASHBOARD_REFRESH: &str = "dashboard:refresh";
pub const EV_COURSE_ENROLL: &str = "course:enroll";
pub const EV_COURSE_COMPLETE: &str = "course:complete";
pub const EV_TOKEN_UPDATE: &str = "token:update";
pub const EV_ACTIVITY_UPDATE: &str = "activity:update";

pub const SUCCESS_SUFFIX: &str = ":success";
pub const ERROR_SUFFIX: &str = ":error";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn push(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            request_id: None,
            data,
        }
    }

    pub fn request(event: impl Into<String>, request_id: u64, data: Value) -> Self {
        Self {
            event: event.into(),
            request_id: Some(request_id),
            data,
        }
    }

    pub fn is_response(&self) -> bool {
        self.request_id.is_some()
            && (self.event.ends_with(SUCCESS_SUFFIX) || self.event.ends_with(ERROR_SUFFIX))
    }

    pub fn is_error_response(&self) -> bool {
        self.event.ends_with(ERROR_SUFFIX)
    }

    /// Server-supplied message on an error frame, with a generic fallback.
    pub fn error_message(&self) -> String {
        self.data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request rejected")
            .to_string()
    }
}

/// Raw payload of a `token:updated` push before it is narrowed to a
/// [`BalanceUpdate`].
#[derive(Debug, Deserialize)]
struct BalancePayload {
    tokens: Option<i64>,
    delta: Option<i64>,
}

/// Server pushes the engine reacts to. Responses to in-flight requests are
/// routed separately by correlation id and never show up here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    TokenUpdated(BalanceUpdate),
    ActivityUpdated,
    DashboardRefresh,
    /// Domain collection change (`lecture:new`, `session:deleted`, ...);
    /// consumers treat these as an opaque refresh nudge.
    DomainChanged { event: String },
}

impl ServerEvent {
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        match frame.event.as_str() {
            EV_TOKEN_UPDATED => {
                let payload: BalancePayload =
                    serde_json::from_value(frame.data.clone()).ok()?;
                BalanceUpdate::from_wire(payload.tokens, payload.delta).map(Self::TokenUpdated)
            }
            EV_ACTIVITY_UPDATED => Some(Self::ActivityUpdated),
            EV_DASHBOARD_REFRESH => Some(Self::DashboardRefresh),
            event
                if event.ends_with(":new")
                    || event.ends_with(":updated")
                    || event.ends_with(":deleted") =>
            {
                Some(Self::DomainChanged {
                    event: event.to_string(),
                })
            }
            _ => None,
        }
    }
}
