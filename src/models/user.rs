//! User accounts and the login exchange.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role, in the API's wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Employee,
    Courier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Courier => "courier",
        }
    }

    /// Display name used in tables and the whoami banner.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Employee => "Employee",
            Role::Courier => "Courier",
        }
    }

    /// Staff roles share the back-office screens.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Employee)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "admin" => Ok(Role::Admin),
            "employee" => Ok(Role::Employee),
            "courier" => Ok(Role::Courier),
            other => Err(format!(
                "unknown role '{other}' (expected admin, employee or courier)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Body for `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub phone: String,
}

/// Body for `PUT /users/:id`.
///
/// `password` is omitted entirely when the caller does not want to change it;
/// the server keeps the existing credential in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub phone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_form_is_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Courier).unwrap(), "\"courier\"");
        let parsed: Role = serde_json::from_str("\"employee\"").unwrap();
        assert_eq!(parsed, Role::Employee);
    }

    #[test]
    fn test_role_from_str_rejects_unknown() {
        assert!(Role::from_str("manager").is_err());
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
    }

    #[test]
    fn test_update_request_omits_unchanged_password() {
        let req = UpdateUserRequest {
            username: "samir".into(),
            password: None,
            full_name: "Samir K".into(),
            role: Role::Courier,
            phone: String::new(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["role"], "courier");
    }

    #[test]
    fn test_update_request_carries_new_password() {
        let req = UpdateUserRequest {
            username: "samir".into(),
            password: Some("s3cret".into()),
            full_name: "Samir K".into(),
            role: Role::Courier,
            phone: "07701234567".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["password"], "s3cret");
    }

    #[test]
    fn test_user_defaults_active_when_flag_missing() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 3,
            "username": "huda",
            "full_name": "Huda A",
            "role": "admin"
        }))
        .unwrap();
        assert!(user.is_active);
        assert!(user.phone.is_none());
    }
}
