//! Request extractor for the optional session principal.

use crate::AppState;
use axum::{async_trait, extract::FromRequestParts, http::header::COOKIE, http::request::Parts};
use koderstore_core::Principal;
use std::convert::Infallible;

/// The principal carried by a valid session cookie, if any.
///
/// Never rejects: a missing or bad cookie yields `Session(None)` and the storage service decides
/// whether that is acceptable.
#[derive(Debug, Clone)]
pub struct Session(pub Option<Principal>);

impl Session {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|header| state.sessions.principal_from_cookie_header(header));
        Ok(Session(principal))
    }
}
