use std::sync::Arc;

use axum::{response::Response, Extension};
use modkit::api::response::{created_json, ok_json, ok_message};
use modkit::api::{ProblemResponse, ValidatedJson};
use modkit::SecurityCtx;
use tracing::info;

use crate::api::rest::dto::{
    AuthDto, ForgotPasswordReq, LoginReq, RegisterReq, ResetPasswordReq, UserDto,
};
use crate::api::rest::error::map_domain_error;
use crate::domain::service::Service;

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, we've sent a password reset link.";

pub async fn register(
    Extension(svc): Extension<Arc<Service>>,
    ValidatedJson(req): ValidatedJson<RegisterReq>,
) -> Result<Response, ProblemResponse> {
    let session = svc
        .register(req.into())
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(created_json(
        "User registered successfully",
        AuthDto::from(session),
    ))
}

pub async fn login(
    Extension(svc): Extension<Arc<Service>>,
    ValidatedJson(req): ValidatedJson<LoginReq>,
) -> Result<Response, ProblemResponse> {
    let session = svc
        .login(&req.email_or_phone, &req.password)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_message("Login successful", AuthDto::from(session)))
}

pub async fn forgot_password(
    Extension(svc): Extension<Arc<Service>>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordReq>,
) -> Result<Response, ProblemResponse> {
    svc.forgot_password(&req.email)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_message(FORGOT_PASSWORD_MESSAGE, serde_json::Value::Null))
}

pub async fn reset_password(
    Extension(svc): Extension<Arc<Service>>,
    ValidatedJson(req): ValidatedJson<ResetPasswordReq>,
) -> Result<Response, ProblemResponse> {
    svc.reset_password(&req.token, &req.password)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_message(
        "Password reset successfully",
        serde_json::Value::Null,
    ))
}

pub async fn me(
    Extension(svc): Extension<Arc<Service>>,
    ctx: SecurityCtx,
) -> Result<Response, ProblemResponse> {
    info!(user_id = %ctx.user_id, "profile requested");
    let profile = svc
        .get_profile(ctx.user_id)
        .await
        .map_err(|e| map_domain_error(&e))?;
    Ok(ok_json(UserDto::from(profile)))
}
