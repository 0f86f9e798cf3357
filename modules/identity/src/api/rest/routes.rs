use std::sync::Arc;

use axum::{Extension, Router};
use modkit::api::{Missing, OpenApiRegistry, OperationBuilder};
use modkit::{RouterSecurityExt, TokenVerifier};

use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;

pub fn register_routes(
    router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
    verifier: Arc<dyn TokenVerifier>,
) -> anyhow::Result<Router> {
    let mut public = Router::new();

    public = OperationBuilder::<Missing, Missing, ()>::post("/api/auth/register")
        .operation_id("identity.register")
        .summary("Register a patient or staff account")
        .tag("auth")
        .json_request::<dto::RegisterReq>(openapi, "Account details")
        .handler(handlers::register)
        .json_response_with_schema::<dto::AuthDto>(openapi, 201, "Registered; token issued")
        .problem_response(openapi, 400, "Validation failed")
        .problem_response(openapi, 409, "Email already registered")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(public, openapi);

    public = OperationBuilder::<Missing, Missing, ()>::post("/api/auth/login")
        .operation_id("identity.login")
        .summary("Log in with email or phone")
        .tag("auth")
        .json_request::<dto::LoginReq>(openapi, "Credentials")
        .handler(handlers::login)
        .json_response_with_schema::<dto::AuthDto>(openapi, 200, "Token issued")
        .problem_response(openapi, 400, "Validation failed")
        .problem_response(openapi, 401, "Invalid credentials")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(public, openapi);

    public = OperationBuilder::<Missing, Missing, ()>::post("/api/auth/forgot-password")
        .operation_id("identity.forgot_password")
        .summary("Request a password reset link")
        .description("Answers the same way whether or not the account exists.")
        .tag("auth")
        .json_request::<dto::ForgotPasswordReq>(openapi, "Account email")
        .handler(handlers::forgot_password)
        .json_response(200, "Reset link sent if the account exists")
        .problem_response(openapi, 400, "Validation failed")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(public, openapi);

    public = OperationBuilder::<Missing, Missing, ()>::post("/api/auth/reset-password")
        .operation_id("identity.reset_password")
        .summary("Set a new password with a reset token")
        .tag("auth")
        .json_request::<dto::ResetPasswordReq>(openapi, "Reset token and new password")
        .handler(handlers::reset_password)
        .json_response(200, "Password changed")
        .problem_response(openapi, 400, "Invalid or expired reset token")
        .problem_response(openapi, 500, "Internal Server Error")
        .register(public, openapi);

    let mut authed = Router::new();
    authed = OperationBuilder::<Missing, Missing, ()>::get("/api/auth/me")
        .operation_id("identity.me")
        .summary("Current user profile")
        .tag("auth")
        .bearer_auth()
        .handler(handlers::me)
        .json_response_with_schema::<dto::UserDto>(openapi, 200, "Profile")
        .auth_errors(openapi)
        .problem_response(openapi, 404, "User no longer exists")
        .register(authed, openapi);
    let authed = authed.require_auth(verifier);

    Ok(router.merge(public.merge(authed).layer(Extension(service))))
}
