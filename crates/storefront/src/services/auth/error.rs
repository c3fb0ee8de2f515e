//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;
use crate::store::StoreError;

/// Errors that can occur during login and registration.
///
/// The display strings of the validation variants are shown to the user
/// as-is.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email is not a `@redberry.ge` address with a 3+ character local part.
    #[error("Email must be at least 3 characters followed by @redberry.ge")]
    InvalidEmail,

    /// Username too short.
    #[error("Username must be at least 3 characters long")]
    InvalidUsername,

    /// Password too short.
    #[error("Password must be at least 3 characters long")]
    InvalidPassword,

    /// Password confirmation differs from the password.
    #[error("Password confirmation does not match the password")]
    PasswordMismatch,

    /// Avatar is not one of the accepted image types.
    #[error("Please upload an image file (jpg, png, gif, or webp)")]
    UnsupportedAvatarType,

    /// Avatar exceeds the upload limit.
    #[error("Image size must be less than 1MB")]
    AvatarTooLarge,

    /// The server refused the email/password pair.
    #[error("Email or password is incorrect.")]
    InvalidCredentials,

    /// Registration conflict on the email address.
    #[error("This email is already registered")]
    EmailTaken,

    /// Registration conflict on the username.
    #[error("This username is already taken")]
    UsernameTaken,

    /// Any other API failure.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The token or avatar could not be stored.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
