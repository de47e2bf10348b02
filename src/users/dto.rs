use serde::{Deserialize, Serialize};

use super::model::{Role, UserPatch};
use crate::error::AppError;
use crate::validation::{normalize_email, normalize_full_name};

/// PATCH /users/me
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    pub fn into_patch(self) -> Result<UserPatch, AppError> {
        let patch = UserPatch {
            full_name: self
                .full_name
                .map(|n| normalize_full_name(&n, 2))
                .transpose()?,
            email: self.email.map(|e| normalize_email(&e)).transpose()?,
            ..Default::default()
        };
        if patch.is_empty() {
            return Err(AppError::bad_request("Nothing to update"));
        }
        Ok(patch)
    }
}

/// PATCH /users/:id (admin)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn into_patch(self) -> Result<UserPatch, AppError> {
        let patch = UserPatch {
            full_name: self
                .full_name
                .map(|n| normalize_full_name(&n, 2))
                .transpose()?,
            email: self.email.map(|e| normalize_email(&e)).transpose()?,
            role: self.role,
            is_active: self.is_active,
        };
        if patch.is_empty() {
            return Err(AppError::bad_request("Nothing to update"));
        }
        Ok(patch)
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}
