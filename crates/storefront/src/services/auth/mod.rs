//! Authentication service.
//!
//! Validates login and registration forms locally, exchanges them for a
//! bearer token and keeps the token and display avatar in the
//! [`CredentialStore`].

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use crate::api::{
    ApiError, AuthResponse, AvatarFile, LoginRequest, RedseamClient, RegisterRequest, User,
};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::store::CredentialStore;

/// Accounts are restricted to `@redberry.ge` addresses.
static LOGIN_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{3,}@redberry\.ge$").expect("Invalid regex"));

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 3;

/// Minimum username length.
const MIN_USERNAME_LENGTH: usize = 3;

/// Largest accepted avatar upload.
pub const MAX_AVATAR_BYTES: usize = 1024 * 1024;

/// Accepted avatar MIME types.
pub const AVATAR_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

// =============================================================================
// Forms
// =============================================================================

/// Login form input.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

impl LoginForm {
    /// Check the form before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns the first failing field as an `AuthError`.
    pub fn validate(&self) -> Result<(), AuthError> {
        validate_email(&self.email)?;
        validate_password(self.password.expose_secret())
    }
}

/// Registration form input.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub password: SecretString,
    pub password_confirmation: SecretString,
    pub avatar: Option<AvatarFile>,
}

impl RegistrationForm {
    /// Check the form before anything is sent.
    ///
    /// Fields are checked in form order: email, username, password,
    /// confirmation, avatar.
    ///
    /// # Errors
    ///
    /// Returns the first failing field as an `AuthError`.
    pub fn validate(&self) -> Result<(), AuthError> {
        validate_email(&self.email)?;
        if self.username.trim().chars().count() < MIN_USERNAME_LENGTH {
            return Err(AuthError::InvalidUsername);
        }
        validate_password(self.password.expose_secret())?;
        if self.password.expose_secret() != self.password_confirmation.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }
        if let Some(avatar) = &self.avatar {
            validate_avatar(avatar)?;
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    if LOGIN_EMAIL.is_match(email.trim()) {
        Ok(())
    } else {
        Err(AuthError::InvalidEmail)
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidPassword);
    }
    Ok(())
}

/// Check an avatar's type and size.
///
/// # Errors
///
/// Returns `UnsupportedAvatarType` or `AvatarTooLarge`.
pub fn validate_avatar(avatar: &AvatarFile) -> Result<(), AuthError> {
    let mime = avatar.mime.trim().to_ascii_lowercase();
    if !AVATAR_MIME_TYPES.contains(&mime.as_str()) {
        return Err(AuthError::UnsupportedAvatarType);
    }
    if avatar.bytes.len() > MAX_AVATAR_BYTES {
        return Err(AuthError::AvatarTooLarge);
    }
    Ok(())
}

// =============================================================================
// AuthService
// =============================================================================

/// Authentication service.
///
/// Borrows the API client and the credential store for the duration of one
/// operation.
pub struct AuthService<'a> {
    client: &'a RedseamClient,
    credentials: &'a CredentialStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(client: &'a RedseamClient, credentials: &'a CredentialStore) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Log in and store the bearer token.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request is sent,
    /// `AuthError::InvalidCredentials` if the server refuses the pair, or the
    /// underlying API or storage error.
    #[instrument(skip_all, fields(email = %form.email))]
    pub async fn login(&self, form: &LoginForm) -> Result<Option<User>, AuthError> {
        form.validate()?;

        let request = LoginRequest {
            email: form.email.trim(),
            password: form.password.expose_secret(),
        };
        let response = self
            .client
            .login(&request)
            .await
            .map_err(|e| match e {
                ApiError::Unauthenticated
                | ApiError::NotFound(_)
                | ApiError::Rejected {
                    status: 400..=499, ..
                } => AuthError::InvalidCredentials,
                other => AuthError::Api(other),
            })?;

        self.store_session(response).await
    }

    /// Create an account and store the bearer token.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request is sent,
    /// `EmailTaken` / `UsernameTaken` when the server reports a conflict on
    /// that field, or the underlying API or storage error.
    #[instrument(skip_all, fields(email = %form.email, username = %form.username))]
    pub async fn register(&self, form: &RegistrationForm) -> Result<Option<User>, AuthError> {
        form.validate()?;

        let request = RegisterRequest {
            email: form.email.trim(),
            username: form.username.trim(),
            password: form.password.expose_secret(),
            password_confirmation: form.password_confirmation.expose_secret(),
            avatar: form.avatar.as_ref(),
        };
        let response = self
            .client
            .register(&request)
            .await
            .map_err(registration_error)?;

        self.store_session(response).await
    }

    /// Forget the token and the avatar and drop cached catalogue responses.
    ///
    /// # Errors
    ///
    /// Returns an error if either tier cannot be written.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.credentials.clear_token().await?;
        self.credentials.clear_avatar().await?;
        self.client.invalidate_all().await;
        clear_sentry_user();
        info!("Logged out");
        Ok(())
    }

    async fn store_session(&self, response: AuthResponse) -> Result<Option<User>, AuthError> {
        self.credentials
            .set_token(&SecretString::from(response.token))
            .await?;

        if let Some(user) = &response.user {
            if let Some(photo) = user.profile_photo.as_deref() {
                self.credentials.set_avatar(photo).await?;
            }
            set_sentry_user(&user.id, Some(&user.email));
            info!(user_id = %user.id, "Signed in");
        } else {
            info!("Signed in");
        }

        Ok(response.user)
    }
}

/// Map a registration failure to the field the server complained about.
fn registration_error(err: ApiError) -> AuthError {
    let ApiError::Rejected { body, .. } = &err else {
        return AuthError::Api(err);
    };
    let Ok(payload) = serde_json::from_str::<serde_json::Value>(body) else {
        return AuthError::Api(err);
    };

    let fields = payload.get("errors").unwrap_or(&payload);
    if fields.get("email").is_some() {
        AuthError::EmailTaken
    } else if fields.get("username").is_some() {
        AuthError::UsernameTaken
    } else {
        AuthError::Api(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ApiConfig;
    use crate::store::MemoryStore;

    fn registration() -> RegistrationForm {
        RegistrationForm {
            email: "nika@redberry.ge".to_string(),
            username: "nika".to_string(),
            password: SecretString::from("secret"),
            password_confirmation: SecretString::from("secret"),
            avatar: None,
        }
    }

    fn avatar(mime: &str, len: usize) -> AvatarFile {
        AvatarFile {
            file_name: "me.png".to_string(),
            mime: mime.to_string(),
            bytes: vec![0; len],
        }
    }

    #[test]
    fn test_login_email_must_be_redberry() {
        for email in ["ab@redberry.ge", "nika@gmail.com", "ni.ka@redberry.ge", "nika@redberry.gee"] {
            let form = LoginForm {
                email: email.to_string(),
                password: SecretString::from("secret"),
            };
            assert!(matches!(form.validate(), Err(AuthError::InvalidEmail)), "{email}");
        }

        let form = LoginForm {
            email: "nika@redberry.ge".to_string(),
            password: SecretString::from("abc"),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_login_password_length() {
        let form = LoginForm {
            email: "nika@redberry.ge".to_string(),
            password: SecretString::from("ab"),
        };
        assert!(matches!(form.validate(), Err(AuthError::InvalidPassword)));
    }

    #[test]
    fn test_registration_field_order() {
        let mut form = registration();
        form.username = "ab".to_string();
        form.password = SecretString::from("x");
        assert!(matches!(form.validate(), Err(AuthError::InvalidUsername)));

        let mut form = registration();
        form.password_confirmation = SecretString::from("secreT");
        assert!(matches!(form.validate(), Err(AuthError::PasswordMismatch)));

        assert!(registration().validate().is_ok());
    }

    #[test]
    fn test_avatar_rules() {
        assert!(validate_avatar(&avatar("image/png", 1024)).is_ok());
        assert!(validate_avatar(&avatar("IMAGE/WEBP", MAX_AVATAR_BYTES)).is_ok());
        assert!(matches!(
            validate_avatar(&avatar("image/svg+xml", 10)),
            Err(AuthError::UnsupportedAvatarType)
        ));
        assert!(matches!(
            validate_avatar(&avatar("image/jpeg", MAX_AVATAR_BYTES + 1)),
            Err(AuthError::AvatarTooLarge)
        ));

        let mut form = registration();
        form.avatar = Some(avatar("application/pdf", 10));
        assert!(matches!(form.validate(), Err(AuthError::UnsupportedAvatarType)));
    }

    #[tokio::test]
    async fn test_logout_clears_credentials() {
        let client = RedseamClient::new(&ApiConfig::default()).unwrap();
        let credentials = CredentialStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            chrono::Duration::hours(1),
        );
        credentials
            .set_token(&SecretString::from("token"))
            .await
            .unwrap();
        assert!(credentials.set_avatar("https://cdn/me.png").await.unwrap());

        AuthService::new(&client, &credentials).logout().await.unwrap();

        assert!(credentials.token().await.unwrap().is_none());
        assert_eq!(credentials.avatar().await.unwrap(), None);
    }

    #[test]
    fn test_registration_conflicts() {
        let err = registration_error(ApiError::Rejected {
            status: 422,
            body: r#"{"message":"taken","errors":{"email":["The email has already been taken."]}}"#
                .to_string(),
        });
        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(err.to_string(), "This email is already registered");

        let err = registration_error(ApiError::Rejected {
            status: 422,
            body: r#"{"username":["The username has already been taken."]}"#.to_string(),
        });
        assert!(matches!(err, AuthError::UsernameTaken));

        let err = registration_error(ApiError::Rejected {
            status: 500,
            body: "Server Error".to_string(),
        });
        assert!(matches!(err, AuthError::Api(ApiError::Rejected { status: 500, .. })));
    }
}
