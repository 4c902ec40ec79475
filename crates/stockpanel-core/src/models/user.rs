//! Accounts, sign-in payloads and the profile kept in session storage.

use serde::{Deserialize, Serialize};

use super::validation::{email, required, FormError};

/// Minimum password length accepted on registration and account creation.
pub const MIN_PASSWORD_LEN: usize = 6;

/// The signed-in user's profile as stored beside the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Signed in")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
}

/// Users list page. This endpoint reports paging as `meta` rather than the
/// `pagination` block the other lists use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub data: Vec<User>,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default = "one")]
    pub page: u32,
    #[serde(default = "one")]
    pub pages: u32,
    #[serde(default)]
    pub total: Option<u64>,
}

fn one() -> u32 {
    1
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            page: 1,
            pages: 1,
            total: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email_input: &str, password: &str) -> Result<Self, FormError> {
        let email = email(email_input)?;
        if password.is_empty() {
            return Err(FormError::Required("Password"));
        }
        Ok(Self {
            email,
            password: password.to_string(),
        })
    }
}

/// `data` of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: UserProfile,
    #[serde(default)]
    pub message: Option<String>,
    /// Absolute expiry in epoch milliseconds, when the backend sends one.
    #[serde(default, alias = "expiresAt")]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(full_name: &str, email_input: &str, password: &str) -> Result<Self, FormError> {
        let full_name = required("Full name", full_name)?;
        let email = email(email_input)?;
        let password = new_password(password)?;
        Ok(Self {
            full_name,
            email,
            password,
        })
    }
}

/// Account created by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn new(full_name: &str, email_input: &str, password: &str) -> Result<Self, FormError> {
        let Registration {
            full_name,
            email,
            password,
        } = Registration::new(full_name, email_input, password)?;
        Ok(Self {
            full_name,
            email,
            password,
        })
    }
}

/// Edit of an existing account. The password is only sent when the
/// operator typed a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn new(full_name: &str, email_input: &str, password: &str) -> Result<Self, FormError> {
        let full_name = required("Full name", full_name)?;
        let email = email(email_input)?;
        let password = if password.trim().is_empty() {
            None
        } else {
            Some(new_password(password)?)
        };
        Ok(Self {
            full_name,
            email,
            password,
        })
    }
}

fn new_password(password: &str) -> Result<String, FormError> {
    if password.is_empty() {
        return Err(FormError::Required("Password"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FormError::TooShort(MIN_PASSWORD_LEN));
    }
    Ok(password.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_request_validation() {
        assert_eq!(LoginRequest::new("", "x").unwrap_err(), FormError::Required("Email"));
        assert_eq!(LoginRequest::new("nope", "x").unwrap_err(), FormError::InvalidEmail);
        assert_eq!(
            LoginRequest::new("a@b.co", "").unwrap_err(),
            FormError::Required("Password")
        );
        let req = LoginRequest::new(" a@b.co ", "pw").unwrap();
        assert_eq!(req.email, "a@b.co");
    }

    #[test]
    fn test_registration_password_length() {
        assert_eq!(
            Registration::new("Jane", "jane@shop.lk", "12345").unwrap_err(),
            FormError::TooShort(6)
        );
        assert_eq!(
            Registration::new("", "jane@shop.lk", "123456").unwrap_err(),
            FormError::Required("Full name")
        );
        assert!(Registration::new("Jane", "jane@shop.lk", "123456").is_ok());
    }

    #[test]
    fn test_user_update_skips_blank_password() {
        let update = UserUpdate::new("Jane", "jane@shop.lk", "   ").unwrap();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"full_name": "Jane", "email": "jane@shop.lk"})
        );

        let update = UserUpdate::new("Jane", "jane@shop.lk", "secret1").unwrap();
        assert_eq!(update.password.as_deref(), Some("secret1"));
    }

    #[test]
    fn test_user_page_parse() {
        let page: UserPage = serde_json::from_value(json!({
            "data": [{"id": 1, "full_name": "Jane", "email": "j@x.io", "createdAt": "2024-01-02T03:04:05Z"}],
            "meta": {"page": 1, "pages": 3}
        }))
        .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.meta.pages, 3);
        assert_eq!(page.data[0].created_at.as_deref(), Some("2024-01-02T03:04:05Z"));
    }

    #[test]
    fn test_login_response_and_profile() {
        let resp: LoginResponse = serde_json::from_value(json!({
            "token": "a.b.c",
            "user": {"id": 4, "full_name": "Admin", "role": "admin"},
            "message": "Welcome"
        }))
        .unwrap();
        assert!(resp.user.is_admin());
        assert_eq!(resp.user.display_name(), "Admin");
        assert_eq!(resp.expires_at, None);
        assert_eq!(UserProfile::default().display_name(), "Signed in");
    }
}
