use chrono::{DateTime, Utc};
use modkit::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::contract::model::UserProfile;
use crate::domain::model::{AuthSession, NewRegistration};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthDto {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReq {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[validate(length(min = 10, max = 20, message = "Phone number must be 10 to 20 characters"))]
    pub phone: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Role,
    #[validate(length(max = 200))]
    pub hospital_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginReq {
    #[validate(length(min = 3, message = "Email or phone is required"))]
    pub email_or_phone: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordReq {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordReq {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl From<UserProfile> for UserDto {
    fn from(p: UserProfile) -> Self {
        Self {
            id: p.id,
            first_name: p.first_name,
            last_name: p.last_name,
            email: p.email,
            phone: p.phone,
            role: p.role,
            hospital_name: p.hospital_name,
            created_at: p.created_at,
        }
    }
}

impl From<AuthSession> for AuthDto {
    fn from(s: AuthSession) -> Self {
        Self {
            token: s.token,
            user: s.user.into(),
        }
    }
}

impl From<RegisterReq> for NewRegistration {
    fn from(req: RegisterReq) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            password: req.password,
            role: req.role,
            hospital_name: req.hospital_name,
        }
    }
}
