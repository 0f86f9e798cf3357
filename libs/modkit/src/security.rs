//! Per-request caller identity and the bearer/role middleware.
//!
//! ```rust,ignore
//! let staff = Router::new()
//!     .route("/api/queues/call-next", post(call_next))
//!     .guard(verifier.clone(), &[Role::Staff]);
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::problem::{self, ProblemResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Staff => "staff",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "staff" => Ok(Role::Staff),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated caller, attached to request extensions by [`authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityCtx {
    pub user_id: Uuid,
    pub role: Role,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    Expired,
}

/// Turns a bearer token into a [`SecurityCtx`]. Implemented by the identity module
/// and published through the client hub.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<SecurityCtx, AuthError>;
}

fn bearer_token(parts: &axum::http::HeaderMap) -> Option<&str> {
    let raw = parts.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// 401 unless the request carries a valid bearer token.
pub async fn authenticate(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return problem::unauthorized(AuthError::MissingToken.to_string()).into_response();
    };

    match verifier.verify(token) {
        Ok(ctx) => {
            tracing::Span::current().record("user_id", tracing::field::display(ctx.user_id));
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(reason = %e, "bearer token rejected");
            problem::unauthorized(e.to_string()).into_response()
        }
    }
}

/// 403 unless the authenticated role is one of `allowed`; must run after [`authenticate`].
pub async fn authorize(
    State(allowed): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Response {
    let Some(ctx) = req.extensions().get::<SecurityCtx>() else {
        return problem::unauthorized(AuthError::MissingToken.to_string()).into_response();
    };
    if !allowed.contains(&ctx.role) {
        return problem::forbidden(format!(
            "Access denied: {} role cannot access this resource",
            ctx.role
        ))
        .into_response();
    }
    next.run(req).await
}

impl<S> FromRequestParts<S> for SecurityCtx
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityCtx>()
            .cloned()
            .ok_or_else(|| problem::unauthorized(AuthError::MissingToken.to_string()))
    }
}

/// Route-layer helpers. Layers added later run first, so `require_auth` goes last.
pub trait RouterSecurityExt: Sized {
    fn require_auth(self, verifier: Arc<dyn TokenVerifier>) -> Self;
    fn require_roles(self, roles: &'static [Role]) -> Self;

    /// Authentication plus a role gate, in the right order.
    fn guard(self, verifier: Arc<dyn TokenVerifier>, roles: &'static [Role]) -> Self {
        self.require_roles(roles).require_auth(verifier)
    }
}

impl<S> RouterSecurityExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn require_auth(self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(verifier, authenticate))
    }

    fn require_roles(self, roles: &'static [Role]) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(roles, authorize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get};
    use tower::ServiceExt;

    struct StaticVerifier;

    impl TokenVerifier for StaticVerifier {
        fn verify(&self, token: &str) -> Result<SecurityCtx, AuthError> {
            let role = match token {
                "patient-token" => Role::Patient,
                "staff-token" => Role::Staff,
                "old-token" => return Err(AuthError::Expired),
                _ => return Err(AuthError::InvalidToken),
            };
            Ok(SecurityCtx {
                user_id: Uuid::nil(),
                role,
                name: "Ana Lima".into(),
            })
        }
    }

    async fn whoami(ctx: SecurityCtx) -> String {
        format!("{}:{}", ctx.role, ctx.name)
    }

    fn app() -> Router {
        let verifier: Arc<dyn TokenVerifier> = Arc::new(StaticVerifier);
        let any = Router::new()
            .route("/me", get(whoami))
            .require_auth(verifier.clone());
        let staff = Router::new()
            .route("/staff", get(whoami))
            .guard(verifier, &[Role::Staff]);
        any.merge(staff)
    }

    async fn call(path: &str, auth: Option<&str>) -> (StatusCode, String) {
        let mut req = Request::builder().uri(path);
        if let Some(a) = auth {
            req = req.header(header::AUTHORIZATION, a);
        }
        let resp = app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let (status, body) = call("/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("No token provided"));
    }

    #[tokio::test]
    async fn invalid_and_expired_tokens_are_401() {
        let (status, _) = call("/me", Some("Bearer garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call("/me", Some("Bearer old-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Token expired"));

        let (status, _) = call("/me", Some("Basic patient-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let (status, body) = call("/me", Some("bearer patient-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "patient:Ana Lima");
    }

    #[tokio::test]
    async fn role_gate_rejects_other_roles_with_403() {
        let (status, body) = call("/staff", Some("Bearer patient-token")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("patient role"));

        let (status, _) = call("/staff", Some("Bearer staff-token")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call("/staff", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
