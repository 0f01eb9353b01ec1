use clap::Subcommand;
use serde_json::json;
use std::io::BufRead;
use std::sync::Arc;

use crate::cli::config::open_session;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::models::principal::RegisterProfile;
use crate::notify::NotificationLog;
use crate::session::{SessionError, SessionStatus};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (read from stdin if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Register new client account")]
    Register {
        #[arg(help = "First name")]
        first_name: String,
        #[arg(help = "Last name")]
        last_name: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (read from stdin if not provided)")]
        password: Option<String>,
        #[arg(long, help = "Phone number")]
        phone: Option<String>,
    },

    #[command(about = "Logout and forget the stored credential")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,
}

fn resolve_password(password: Option<String>) -> anyhow::Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let log = NotificationLog::new();
    let session = open_session(Arc::new(log.clone())).await?;
    // Anything raised while restoring the stored session
    print_notifications(&log.drain());

    match cmd {
        AuthCommands::Login { email, password } => {
            let password = resolve_password(password)?;
            match session.login(&email, &password).await {
                Ok(principal) => output_success(
                    &output_format,
                    &format!("Logged in as {} ({})", principal.name, principal.role()),
                    Some(json!({ "user": principal })),
                ),
                Err(e) => output_error(&output_format, &e.message(), Some(e.error_code())),
            }
        }
        AuthCommands::Register { first_name, last_name, email, password, phone } => {
            let profile = RegisterProfile {
                first_name,
                last_name,
                email,
                password: resolve_password(password)?,
                phone,
                ..Default::default()
            };
            match session.register(&profile).await {
                Ok(principal) => output_success(
                    &output_format,
                    &format!("Registered {}", principal.email),
                    Some(json!({ "user": principal })),
                ),
                Err(e) => {
                    output_error(&output_format, &e.message(), Some(e.error_code()))?;
                    if let Some(SessionError::Fields { fields, .. }) = session.last_error() {
                        for (field, message) in fields {
                            eprintln!("  {}: {}", field, message);
                        }
                    }
                    Ok(())
                }
            }
        }
        AuthCommands::Logout => {
            session.logout();
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let snapshot = session.snapshot();
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&snapshot)?);
                    Ok(())
                }
                OutputFormat::Text => {
                    match (snapshot.status, snapshot.principal) {
                        (SessionStatus::Authenticated, Some(p)) => {
                            println!("Logged in as {} <{}>", p.name, p.email);
                            println!("Role: {}", p.role());
                        }
                        _ => println!("Not logged in"),
                    }
                    Ok(())
                }
            }
        }
    }
}
