//! `login`, `register` and `logout`.

use std::path::{Path, PathBuf};

use redseam_storefront::api::{AvatarFile, User};
use redseam_storefront::services::auth::{AuthService, LoginForm, RegistrationForm};
use secrecy::SecretString;

use super::{CliError, Context};

#[allow(clippy::print_stdout)]
pub async fn login(ctx: &Context, email: String, password: String) -> Result<(), CliError> {
    let form = LoginForm {
        email,
        password: SecretString::from(password),
    };
    let user = AuthService::new(&ctx.client, &ctx.credentials)
        .login(&form)
        .await?;

    println!("Logged in as {}", display_name(user.as_ref(), &form.email));
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn register(
    ctx: &Context,
    email: String,
    username: String,
    password: String,
    confirm: Option<String>,
    avatar: Option<PathBuf>,
) -> Result<(), CliError> {
    let avatar = match avatar {
        Some(path) => Some(read_avatar(&path).await?),
        None => None,
    };
    let password_confirmation = SecretString::from(confirm.unwrap_or_else(|| password.clone()));
    let form = RegistrationForm {
        email,
        username,
        password: SecretString::from(password),
        password_confirmation,
        avatar,
    };
    let user = AuthService::new(&ctx.client, &ctx.credentials)
        .register(&form)
        .await?;

    println!(
        "Registered and logged in as {}",
        display_name(user.as_ref(), &form.username)
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn logout(ctx: &Context) -> Result<(), CliError> {
    AuthService::new(&ctx.client, &ctx.credentials)
        .logout()
        .await?;
    println!("Logged out");
    Ok(())
}

fn display_name<'a>(user: Option<&'a User>, fallback: &'a str) -> &'a str {
    user.and_then(|u| u.username.as_deref())
        .or_else(|| user.map(|u| u.email.as_str()))
        .unwrap_or(fallback)
}

async fn read_avatar(path: &Path) -> Result<AvatarFile, CliError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "avatar".to_string(), |n| n.to_string_lossy().into_owned());

    Ok(AvatarFile {
        file_name,
        mime: mime_for(path).to_string(),
        bytes,
    })
}

/// MIME type guessed from the file extension.
fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
