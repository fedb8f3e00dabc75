use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::User;

/// Request body for user registration.
///
/// Fields are optional here so the shape pass can say which one is missing.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub msisdn: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub msisdn: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub msisdn: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            msisdn: u.msisdn,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_never_carries_the_hash() {
        let user = User {
            id: 7,
            name: "Test User".into(),
            msisdn: "+8801712345678".into(),
            password_hash: "$argon2id$secret".into(),
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };

        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["msisdn"], "+8801712345678");
        assert_eq!(json["is_active"], true);
        assert!(json["created_at"].is_string());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let req: RegisterRequest = serde_json::from_str(r#"{"msisdn":"01712345678"}"#).unwrap();
        assert!(req.name.is_none());
        assert_eq!(req.msisdn.as_deref(), Some("01712345678"));
        assert!(req.password.is_none());
    }
}
