//! User role management.
//!
//! ```bash
//! # Give an existing account admin rights
//! cartline-cli admin promote -e admin@example.com
//!
//! # Take them away again
//! cartline-cli admin promote -e admin@example.com -r customer
//! ```
//!
//! The account must already exist (register through the API first).

use std::sync::Arc;

use cartline_core::UserRole;
use cartline_server::services::AuthService;

use super::{CliError, repositories};

/// Set the role of the user with this email.
///
/// # Errors
///
/// Returns `AuthError::UserNotFound` (wrapped) when no account has the email.
pub async fn promote(email: &str, role: UserRole) -> Result<(), CliError> {
    let repos = repositories().await?;
    let auth = AuthService::new(Arc::clone(&repos.users));

    let user = auth.set_role(email, role).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "Role updated");

    repos.close().await;
    Ok(())
}
