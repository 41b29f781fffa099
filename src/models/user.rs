use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::utils::validation::{Validate, ValidationErrors, check_password};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

impl Validate for User {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("username", &self.username);
        errors.require_email("email", &self.email);
        errors.into_result()
    }
}

impl_resource!(User, "users", validated);

#[derive(Debug, Clone, Serialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("username", &self.username);
        errors.require("password", &self.password);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordForm {
    pub old_password: String,
    pub new_password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

impl Validate for ChangePasswordForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("old_password", &self.old_password);
        check_password(&mut errors, "new_password", &self.new_password);
        if self.new_password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match.");
        }
        if !self.old_password.is_empty() && self.old_password == self.new_password {
            errors.add("new_password", "Must differ from the current password.");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetConfirm {
    pub uid: String,
    pub token: String,
    pub new_password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

impl Validate for PasswordResetConfirm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("uid", &self.uid);
        errors.require("token", &self.token);
        check_password(&mut errors, "new_password", &self.new_password);
        if self.new_password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match.");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_password_mismatch() {
        let form = ChangePasswordForm {
            old_password: "Old!pass1".to_string(),
            new_password: "N3w!password".to_string(),
            confirm_password: "N3w!passwrd".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("confirm_password"));
        assert!(!errors.has("new_password"));
    }

    #[test]
    fn test_confirm_password_not_serialized() {
        let form = ChangePasswordForm {
            old_password: "a".to_string(),
            new_password: "b".to_string(),
            confirm_password: "b".to_string(),
        };
        let json = serde_json::to_value(&form).unwrap();
        assert!(json.get("confirm_password").is_none());
    }
}
