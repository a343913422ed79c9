//! User account commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use cloudbox_core::config::AppConfig;
use cloudbox_core::error::AppError;
use cloudbox_core::types::UserId;
use cloudbox_entity::user::User;

use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create an account
    Register {
        /// Username
        username: String,
    },
    /// Check a username and password
    Login {
        /// Username
        username: String,
    },
    /// Show an account by id
    Show {
        /// User ID
        id: UserId,
    },
    /// Mark an account deleted
    Delete {
        /// User ID
        id: UserId,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    /// User ID
    id: String,
    /// Username
    username: String,
    /// Status
    status: String,
    /// Created at
    created_at: String,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username.clone(),
            status: u.status.as_str().to_string(),
            created_at: u.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let users = super::user_service(config).await?;

    match &args.command {
        UserCommand::Register { username } => {
            let password = dialoguer::Password::new()
                .with_prompt("Password")
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()
                .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

            let user = users.register(username, &password).await?;
            output::print_item(&UserRow::from(&user), format);
        }
        UserCommand::Login { username } => {
            let password = dialoguer::Password::new()
                .with_prompt("Password")
                .interact()
                .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

            let user = users.login(username, &password).await?;
            output::print_success(&format!("Credentials accepted for '{}'", user.username));
        }
        UserCommand::Show { id } => {
            let user = users.get_user(*id).await?;
            output::print_item(&UserRow::from(&user), format);
        }
        UserCommand::Delete { id, force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete user {id}?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let user = users.delete_user(*id).await?;
            output::print_success(&format!("User '{}' deleted", user.username));
        }
    }

    Ok(())
}
