use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use std::future::Future;

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

/// Caller role as attached by the upstream gateway. OWNER has read-only
/// visibility and may never cause a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Staff,
    Manager,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "STAFF",
            Role::Manager => "MANAGER",
            Role::Owner => "OWNER",
        }
    }

    fn parse(raw: &str) -> Option<Role> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("STAFF") {
            Some(Role::Staff)
        } else if raw.eq_ignore_ascii_case("MANAGER") {
            Some(Role::Manager)
        } else if raw.eq_ignore_ascii_case("OWNER") {
            Some(Role::Owner)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified caller identity. The gateway authenticates every request and
/// forwards who is calling in `X-Actor-Id` / `X-Actor-Role`; this service
/// only decides what that caller may do.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
}

fn extract_actor(headers: &HeaderMap) -> Result<Actor, String> {
    let id_raw = headers
        .get(ACTOR_ID_HEADER)
        .ok_or_else(|| format!("missing {} header (no gateway in front?)", ACTOR_ID_HEADER))?
        .to_str()
        .map_err(|_| format!("{} header is not valid ASCII", ACTOR_ID_HEADER))?;

    let id: i32 = id_raw
        .trim()
        .parse()
        .map_err(|_| format!("{} must be a numeric user id, got {:?}", ACTOR_ID_HEADER, id_raw))?;

    let role_raw = headers
        .get(ACTOR_ROLE_HEADER)
        .ok_or_else(|| format!("missing {} header (no gateway in front?)", ACTOR_ROLE_HEADER))?
        .to_str()
        .map_err(|_| format!("{} header is not valid ASCII", ACTOR_ROLE_HEADER))?;

    let role = Role::parse(role_raw).ok_or_else(|| {
        format!(
            "{} must be one of STAFF, MANAGER, OWNER, got {:?}",
            ACTOR_ROLE_HEADER, role_raw
        )
    })?;

    Ok(Actor { id, role })
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let actor = extract_actor(&parts.headers);

        async move {
            actor.map_err(|msg| {
                tracing::warn!(error = %msg, "Rejected request with missing or malformed identity");
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg })))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: &str, role: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(ACTOR_ID_HEADER, HeaderValue::from_str(id).unwrap());
        map.insert(ACTOR_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        map
    }

    #[test]
    fn extracts_actor_from_gateway_headers() {
        let actor = extract_actor(&headers("42", "STAFF")).unwrap();
        assert_eq!(actor.id, 42);
        assert_eq!(actor.role, Role::Staff);
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(extract_actor(&headers("1", "manager")).unwrap().role, Role::Manager);
        assert_eq!(extract_actor(&headers("1", "Owner")).unwrap().role, Role::Owner);
    }

    #[test]
    fn missing_or_malformed_headers_are_rejected() {
        assert!(extract_actor(&HeaderMap::new()).is_err());
        assert!(extract_actor(&headers("forty-two", "STAFF")).is_err());
        assert!(extract_actor(&headers("7", "SUPERVISOR")).is_err());
    }
}
