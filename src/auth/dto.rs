use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::users::model::PublicUser;
use crate::validation::{check_password, normalize_email, normalize_full_name};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl SignupRequest {
    pub fn validate(self) -> Result<Self, AppError> {
        check_password(&self.password)?;
        Ok(Self {
            email: normalize_email(&self.email)?,
            full_name: normalize_full_name(&self.full_name, 1)?,
            password: self.password,
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Self, AppError> {
        if self.password.is_empty() {
            return Err(AppError::bad_request("Password is required"));
        }
        Ok(Self {
            email: normalize_email(&self.email)?,
            password: self.password,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: PublicUser,
    pub message: &'static str,
}

/// Body of a successful login; the tokens travel as cookies.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
