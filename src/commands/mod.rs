mod auth;
mod config_cmd;
mod item;
mod recipe;
mod watch;

pub use auth::{login, logout, signup, CredentialArgs};
pub use config_cmd::ConfigCommand;
pub use item::{print_tags, ItemCommand};
pub use recipe::RecipeCommand;
pub use watch::watch;

use clap::ValueEnum;
use pantrack_core::{RestClient, Session, SyncStore};
use std::io::{self, Write};

use crate::config::Config;
use crate::session::SessionStore;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a data command needs: the session and a loaded store.
pub struct Connection {
    pub session: Session,
    pub store: SyncStore<RestClient>,
}

/// Loads the session and fetches the user's tables. A table that fails to
/// load is left empty.
pub async fn connect(config: &Config) -> Result<Connection, Box<dyn std::error::Error>> {
    let session = SessionStore::new(config.session_path()).require()?;
    let (url, anon_key) = config.backend()?;
    tracing::debug!(user_id = %session.user_id, url, "Connecting");

    let client = RestClient::new(
        url.to_string(),
        anon_key.to_string(),
        session.access_token.clone(),
    );
    // failed tables stay empty; initialize has already logged them
    let (store, failures) = SyncStore::initialize(client, session.user_id.clone()).await;
    if !failures.is_empty() {
        tracing::debug!(failed = failures.len(), "Continuing with partial state");
    }

    Ok(Connection { session, store })
}

/// Asks a yes/no question on stdin; anything but "y" is a no.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Truncates `text` to `width` characters for table output.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Milk", 30), "Milk");
        assert_eq!(
            truncate("A very long pantry item name indeed", 10),
            "A very ..."
        );
    }
}
