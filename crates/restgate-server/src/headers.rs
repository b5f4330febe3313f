//! Caller context carried in request headers.
//!
//! Identity headers are set by the upstream authenticator and trusted as-is.

use axum::http::HeaderMap;
use restgate_compiler::RequestHeaders;
use restgate_core::{LockMap, SessionClaims};
use restgate_policy::GovernanceContext;
use std::net::SocketAddr;

use crate::error::ApiError;

pub const PROJECT_ID: &str = "x-project-id";
pub const CALLER_ROLE: &str = "x-caller-role";
pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const COLUMN_LOCKS: &str = "x-column-locks";
pub const CLAIM_SUB: &str = "x-claim-sub";
pub const CLAIM_ROLE: &str = "x-claim-role";
pub const CLAIM_EMAIL: &str = "x-claim-email";

/// `Accept` media type asking for a single JSON object.
pub const SINGULAR_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

const ANONYMOUS_ROLE: &str = "anon";

/// Everything the gateway knows about the caller of one request.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub project_id: String,
    pub claims: SessionClaims,
    /// Role used for column governance.
    pub caller_role: String,
    pub source_ip: Option<String>,
    pub locks: LockMap,
    /// The caller asked for a single object instead of an array.
    pub singular: bool,
}

impl CallerContext {
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Result<Self, ApiError> {
        let project_id = header(headers, PROJECT_ID)
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingProjectId)?
            .to_string();

        let claim_role = header(headers, CLAIM_ROLE).unwrap_or(ANONYMOUS_ROLE);
        let claims = SessionClaims::new(
            header(headers, CLAIM_SUB).unwrap_or_default(),
            claim_role,
            header(headers, CLAIM_EMAIL).unwrap_or_default(),
        );
        let caller_role = header(headers, CALLER_ROLE)
            .unwrap_or(claim_role)
            .to_string();

        Ok(Self {
            project_id,
            claims,
            caller_role,
            source_ip: source_ip(headers, peer),
            locks: column_locks(headers),
            singular: header(headers, "accept")
                .is_some_and(|accept| accept.contains(SINGULAR_MEDIA_TYPE)),
        })
    }

    pub fn governance(&self) -> GovernanceContext {
        let ctx = GovernanceContext::new(self.locks.clone(), &self.caller_role)
            .project(&self.project_id);
        match &self.source_ip {
            Some(ip) => ctx.source_ip(ip),
            None => ctx,
        }
    }
}

/// The compiler-facing headers (`Range`, `Prefer`, profiles).
pub fn rest_headers(headers: &HeaderMap) -> RequestHeaders {
    RequestHeaders::from_pairs(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    )
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// First hop of `x-forwarded-for`, else the connection's address.
fn source_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header(headers, FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn column_locks(headers: &HeaderMap) -> LockMap {
    let Some(raw) = header(headers, COLUMN_LOCKS) else {
        return LockMap::new();
    };
    LockMap::from_json_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring malformed x-column-locks header");
        LockMap::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use restgate_core::LockLevel;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_project_id_required() {
        let err = CallerContext::from_headers(&headers(&[]), None).unwrap_err();
        assert!(matches!(err, ApiError::MissingProjectId));

        let err =
            CallerContext::from_headers(&headers(&[(PROJECT_ID, "  ")]), None).unwrap_err();
        assert!(matches!(err, ApiError::MissingProjectId));
    }

    #[test]
    fn test_caller_from_headers() {
        let caller = CallerContext::from_headers(
            &headers(&[
                (PROJECT_ID, "proj_1"),
                (CLAIM_SUB, "u1"),
                (CLAIM_ROLE, "authenticated"),
                (CLAIM_EMAIL, "a@b.com"),
                (FORWARDED_FOR, "203.0.113.9, 10.0.0.1"),
                (COLUMN_LOCKS, r#"{"owner_id":"insert_only"}"#),
                ("accept", "application/vnd.pgrst.object+json"),
            ]),
            None,
        )
        .unwrap();

        assert_eq!(caller.project_id, "proj_1");
        assert_eq!(caller.claims, SessionClaims::new("u1", "authenticated", "a@b.com"));
        assert_eq!(caller.caller_role, "authenticated");
        assert_eq!(caller.source_ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(caller.locks.level("owner_id"), LockLevel::InsertOnly);
        assert!(caller.singular);
    }

    #[test]
    fn test_defaults_and_peer_address() {
        let peer: SocketAddr = "192.0.2.4:51000".parse().unwrap();
        let caller = CallerContext::from_headers(
            &headers(&[(PROJECT_ID, "p"), (CALLER_ROLE, "service_role")]),
            Some(peer),
        )
        .unwrap();

        assert_eq!(caller.claims.role, "anon");
        assert_eq!(caller.caller_role, "service_role");
        assert_eq!(caller.source_ip.as_deref(), Some("192.0.2.4"));
        assert!(!caller.singular);
    }

    #[test]
    fn test_malformed_locks_are_ignored() {
        let caller = CallerContext::from_headers(
            &headers(&[(PROJECT_ID, "p"), (COLUMN_LOCKS, "{not json")]),
            None,
        )
        .unwrap();
        assert!(caller.locks.is_empty());
    }

    #[test]
    fn test_rest_headers() {
        let rest = rest_headers(&headers(&[
            ("range", "0-9"),
            ("prefer", "count=exact"),
            ("content-profile", "api"),
        ]));
        assert_eq!(rest.range.as_deref(), Some("0-9"));
        assert!(rest.prefer.count_exact);
        assert_eq!(rest.content_profile.as_deref(), Some("api"));
    }
}
