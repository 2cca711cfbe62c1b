//! Out-of-band user administration.
//!
//! There is no registration endpoint; staff accounts are created and
//! managed with this tool against the server's database file.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use parish_schedule_server::user::{
    NewUser, PasswordCredentials, UserAuthCredentialsStore, UserStore,
};
use parish_schedule_server::SqliteStore;

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite schedule database file.
    pub db_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a user.
    AddUser {
        username: String,
        email: String,
        full_name: String,
    },

    /// Sets or replaces the password of a user.
    SetPassword { username: String, password: String },

    /// Verifies the password of a user. Makes no persistent change and
    /// creates no token, it just compares the password hash.
    CheckPassword { username: String, password: String },

    /// Deletes a user along with their assignments, notes and tokens.
    DeleteUser { username: String },

    /// Shows all users.
    ListUsers,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    if !cli_args.db_path.exists() {
        bail!("Database file {:?} does not exist", cli_args.db_path);
    }
    let store = SqliteStore::open(&cli_args.db_path)?;

    match cli_args.command {
        Command::AddUser {
            username,
            email,
            full_name,
        } => {
            let user_id = store.create_user(&NewUser {
                username: username.clone(),
                email,
                full_name,
            })?;
            println!("Created user {} with id {}", username, user_id);
        }
        Command::SetPassword { username, password } => {
            let user = store
                .get_user_by_username(&username)?
                .with_context(|| format!("No user named {}", username))?;
            let credentials = PasswordCredentials::from_plaintext(user.id, &password)?;
            store.set_password_credentials(&credentials)?;
            println!("Password set for {}", username);
        }
        Command::CheckPassword { username, password } => {
            let credentials = store
                .get_password_credentials(&username)?
                .with_context(|| format!("No password set for {}", username))?;
            let ok = credentials
                .hasher
                .verify(password.as_str(), credentials.hash.as_str())?;
            println!("{}", if ok { "Password matches" } else { "Password does NOT match" });
        }
        Command::DeleteUser { username } => {
            let user = store
                .get_user_by_username(&username)?
                .with_context(|| format!("No user named {}", username))?;
            store.delete_user(user.id)?;
            println!("Deleted user {}", username);
        }
        Command::ListUsers => {
            for user in store.list_users()? {
                println!(
                    "{}\t{}\t{}\t{}",
                    user.id, user.username, user.email, user.full_name
                );
            }
        }
    }

    Ok(())
}
