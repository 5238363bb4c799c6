//! Sign-in, sign-up and sign-out.

use clap::Args;
use pantrack_core::AuthClient;
use std::io::{self, Write};

use crate::config::Config;
use crate::session::SessionStore;

/// Email and password, prompted for when not given
#[derive(Args)]
pub struct CredentialArgs {
    /// Account email
    #[arg(long, short)]
    pub email: Option<String>,

    /// Account password (read from PANTRACK_PASSWORD or prompted if omitted)
    #[arg(long, env = "PANTRACK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl CredentialArgs {
    fn resolve(&self) -> io::Result<(String, String)> {
        let email = match &self.email {
            Some(email) => email.trim().to_string(),
            None => prompt("Email")?,
        };
        let password = match &self.password {
            Some(password) => password.clone(),
            None => prompt("Password")?,
        };

        if email.is_empty() || password.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Email and password cannot be empty",
            ));
        }
        Ok((email, password))
    }
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn auth_client(config: &Config) -> Result<AuthClient, Box<dyn std::error::Error>> {
    let (url, anon_key) = config.backend()?;
    Ok(AuthClient::new(url.to_string(), anon_key.to_string()))
}

/// Signs in and stores the session.
pub async fn login(
    config: &Config,
    args: &CredentialArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = auth_client(config)?;
    let (email, password) = args.resolve()?;

    let session = client.sign_in_with_password(&email, &password).await?;
    SessionStore::new(config.session_path()).save(&session)?;

    println!(
        "Logged in as {}",
        session.email.as_deref().unwrap_or(&session.user_id)
    );
    if let Some(expires_at) = session.expires_at {
        println!(
            "Session valid until {}",
            expires_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Creates an account, storing the session when the backend returns one.
pub async fn signup(
    config: &Config,
    args: &CredentialArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = auth_client(config)?;
    let (email, password) = args.resolve()?;

    match client.sign_up(&email, &password).await? {
        Some(session) => {
            SessionStore::new(config.session_path()).save(&session)?;
            println!("Account created. Logged in as {}", email);
        }
        None => {
            println!(
                "Account created. Check {} for a confirmation link, then run 'pantrack login'.",
                email
            );
        }
    }
    Ok(())
}

/// Removes the stored session.
pub fn logout(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if SessionStore::new(config.session_path()).clear()? {
        println!("Logged out.");
    } else {
        println!("Already logged out.");
    }
    Ok(())
}
