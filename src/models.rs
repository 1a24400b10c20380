use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Identity fields shared by every user shape (the `UserBase` shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Identity {
    pub user_id: Uuid,
    #[validate(email(message = "value is not a valid email address"))]
    pub email: String,
}

/// Public profile fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Profile {
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 8, max = 64))]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(from = "LoginBody")]
pub struct UserLogin {
    #[serde(flatten)]
    #[validate(nested)]
    pub identity: Identity,
    #[serde(flatten)]
    #[validate(nested)]
    pub credentials: Credentials,
}

/// A user as returned by the API. Never carries a password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(from = "UserBody")]
pub struct User {
    #[serde(flatten)]
    #[validate(nested)]
    pub identity: Identity,
    #[serde(flatten)]
    #[validate(nested)]
    pub profile: Profile,
}

/// Signup payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(from = "RegisterBody")]
pub struct UserRegister {
    #[serde(flatten)]
    #[validate(nested)]
    pub identity: Identity,
    #[serde(flatten)]
    #[validate(nested)]
    pub profile: Profile,
    #[serde(flatten)]
    #[validate(nested)]
    pub credentials: Credentials,
}

impl UserRegister {
    /// Splits the payload into the public user and its password.
    pub fn into_parts(self) -> (User, Credentials) {
        let user = User {
            identity: self.identity,
            profile: self.profile,
        };
        (user, self.credentials)
    }
}

// Flat wire forms of the composed shapes. Deserializing through these instead
// of `#[serde(flatten)]` keeps the failing field in serde's error path.

#[derive(Deserialize)]
pub struct LoginBody {
    user_id: Uuid,
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct UserBody {
    user_id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    #[serde(default)]
    birth_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct RegisterBody {
    user_id: Uuid,
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    #[serde(default)]
    birth_date: Option<NaiveDate>,
}

impl From<LoginBody> for UserLogin {
    fn from(body: LoginBody) -> Self {
        UserLogin {
            identity: Identity {
                user_id: body.user_id,
                email: body.email,
            },
            credentials: Credentials {
                password: body.password,
            },
        }
    }
}

impl From<UserBody> for User {
    fn from(body: UserBody) -> Self {
        User {
            identity: Identity {
                user_id: body.user_id,
                email: body.email,
            },
            profile: Profile {
                first_name: body.first_name,
                last_name: body.last_name,
                birth_date: body.birth_date,
            },
        }
    }
}

impl From<RegisterBody> for UserRegister {
    fn from(body: RegisterBody) -> Self {
        UserRegister {
            identity: Identity {
                user_id: body.user_id,
                email: body.email,
            },
            profile: Profile {
                first_name: body.first_name,
                last_name: body.last_name,
                birth_date: body.birth_date,
            },
            credentials: Credentials {
                password: body.password,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Tweet {
    pub tweet_id: Uuid,
    #[validate(length(min = 1, max = 256))]
    pub content: String,
    // Evaluated for each deserialized tweet that omits it.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[validate(nested)]
    pub author: User,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registration() -> serde_json::Value {
        json!({
            "user_id": "11111111-1111-1111-1111-111111111111",
            "email": "a@example.com",
            "password": "longenough",
            "first_name": "Ann",
            "last_name": "Lee",
            "birth_date": "2000-01-01"
        })
    }

    #[test]
    fn flat_registration_deserializes_into_groups() {
        let reg: UserRegister = serde_json::from_value(registration()).unwrap();
        assert_eq!(reg.identity.email, "a@example.com");
        assert_eq!(reg.profile.first_name, "Ann");
        assert_eq!(
            reg.profile.birth_date,
            NaiveDate::from_ymd_opt(2000, 1, 1)
        );
        assert_eq!(reg.credentials.password, "longenough");
        assert!(reg.validate().is_ok());
    }

    #[test]
    fn birth_date_is_optional() {
        let mut body = registration();
        body.as_object_mut().unwrap().remove("birth_date");
        let reg: UserRegister = serde_json::from_value(body).unwrap();
        assert_eq!(reg.profile.birth_date, None);
    }

    #[test]
    fn user_serializes_flat_without_password() {
        let reg: UserRegister = serde_json::from_value(registration()).unwrap();
        let (user, _) = reg.into_parts();
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(
            value,
            json!({
                "user_id": "11111111-1111-1111-1111-111111111111",
                "email": "a@example.com",
                "first_name": "Ann",
                "last_name": "Lee",
                "birth_date": "2000-01-01"
            })
        );
    }

    #[test]
    fn short_password_is_rejected() {
        let mut body = registration();
        body["password"] = json!("abcd");
        let reg: UserRegister = serde_json::from_value(body).unwrap();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn password_upper_bound_is_inclusive() {
        let mut body = registration();
        body["password"] = json!("p".repeat(64));
        let reg: UserRegister = serde_json::from_value(body.clone()).unwrap();
        assert!(reg.validate().is_ok());

        body["password"] = json!("p".repeat(65));
        let reg: UserRegister = serde_json::from_value(body).unwrap();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn names_are_counted_in_characters() {
        let mut body = registration();
        body["first_name"] = json!("é".repeat(50));
        let reg: UserRegister = serde_json::from_value(body).unwrap();
        assert!(reg.validate().is_ok());
    }

    #[test]
    fn empty_last_name_and_bad_email_are_rejected() {
        let mut body = registration();
        body["last_name"] = json!("");
        let reg: UserRegister = serde_json::from_value(body).unwrap();
        assert!(reg.validate().is_err());

        let mut body = registration();
        body["email"] = json!("not-an-email");
        let reg: UserRegister = serde_json::from_value(body).unwrap();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn login_requires_password_bounds() {
        let login: UserLogin = serde_json::from_value(json!({
            "user_id": "11111111-1111-1111-1111-111111111111",
            "email": "a@example.com",
            "password": "short"
        }))
        .unwrap();
        assert!(login.validate().is_err());
    }

    #[test]
    fn tweet_timestamps_default_per_instance() {
        let body = json!({
            "tweet_id": "22222222-2222-2222-2222-222222222222",
            "content": "hello",
            "author": {
                "user_id": "11111111-1111-1111-1111-111111111111",
                "email": "a@example.com",
                "first_name": "Ann",
                "last_name": "Lee"
            }
        });
        let first: Tweet = serde_json::from_value(body.clone()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second: Tweet = serde_json::from_value(body).unwrap();
        assert!(second.created_at > first.created_at);
        assert_eq!(first.updated_at, None);
        assert!(first.validate().is_ok());
    }

    #[test]
    fn tweet_content_and_author_are_validated() {
        let tweet: Tweet = serde_json::from_value(json!({
            "tweet_id": "22222222-2222-2222-2222-222222222222",
            "content": "x".repeat(257),
            "author": {
                "user_id": "11111111-1111-1111-1111-111111111111",
                "email": "a@example.com",
                "first_name": "",
                "last_name": "Lee"
            }
        }))
        .unwrap();
        let errors = tweet.validate().unwrap_err();
        assert!(errors.errors().contains_key("content"));
        assert!(errors.errors().contains_key("author"));
    }
}
