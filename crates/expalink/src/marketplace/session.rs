use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use super::domain::{ConsumerId, ProfessionalId};
use super::error::MarketplaceError;

pub const CONSUMER_ID_HEADER: &str = "x-consumer-id";
pub const CONSUMER_EMAIL_HEADER: &str = "x-consumer-email";
pub const ADMIN_HEADER: &str = "x-admin";

/// Authenticated caller, supplied by the identity provider in front of the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub consumer_id: ConsumerId,
    pub email: String,
    pub is_admin: bool,
}

impl Session {
    pub fn consumer(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            consumer_id: ConsumerId(id.into()),
            email: email.into(),
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::consumer(id, email)
        }
    }

    /// Reads the session headers; `None` for anonymous requests.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let id = header_value(headers, CONSUMER_ID_HEADER)?;
        let email = header_value(headers, CONSUMER_EMAIL_HEADER).unwrap_or_default();
        let is_admin = header_value(headers, ADMIN_HEADER)
            .is_some_and(|value| matches!(value.as_str(), "1" | "true" | "yes"));
        Some(Self {
            consumer_id: ConsumerId(id),
            email,
            is_admin,
        })
    }

    pub fn owns(&self, professional: &ProfessionalId) -> bool {
        self.consumer_id.owns(professional)
    }

    pub fn require_owner(&self, professional: &ProfessionalId) -> Result<(), MarketplaceError> {
        if self.owns(professional) {
            Ok(())
        } else {
            Err(MarketplaceError::unauthorized(
                "only the profile owner may do this",
            ))
        }
    }

    pub fn require_admin(&self) -> Result<(), MarketplaceError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(MarketplaceError::unauthorized("administrator access required"))
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
