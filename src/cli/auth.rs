//! Session commands: login, logout, whoami.

use super::LoginArgs;
use crate::api::ApiClient;
use crate::config::Settings;
use crate::session::{Session, SessionStore};
use anyhow::{Context, Result};
use std::io::Write;

pub(crate) async fn cmd_login(
    settings: &Settings,
    store: &SessionStore,
    args: &LoginArgs,
) -> Result<()> {
    let password = match &args.password {
        Some(password) => password.clone(),
        None => prompt_password(&args.username)?,
    };

    let client = ApiClient::new(&settings.api_url, None, settings.timeout)?;
    let response = client.login(&args.username, &password).await?;

    store.save(&Session {
        token: response.token,
        user: response.user.clone(),
    })?;

    println!(
        "[OK] Signed in as {} ({})",
        response.user.full_name,
        response.user.role.label()
    );
    Ok(())
}

pub(crate) fn cmd_logout(store: &SessionStore) -> Result<()> {
    store.clear()?;
    println!("[OK] Signed out.");
    Ok(())
}

/// Reports the stored session without a server round-trip; whether the
/// token still works is only known once a command uses it.
pub(crate) fn cmd_whoami(settings: &Settings, store: &SessionStore) -> Result<()> {
    match store.load()? {
        Some(session) => {
            let user = &session.user;
            println!("Signed in as:  {} ({})", user.full_name, user.role.label());
            println!("Username:      {}", user.username);
            println!("User ID:       {}", user.id);
            println!("API:           {}", settings.api_url);
            println!("Session file:  {}", store.path().display());
        }
        None => {
            println!("Not signed in. Run `tawseel login <username>` first.");
            println!("API: {}", settings.api_url);
        }
    }
    Ok(())
}

fn prompt_password(username: &str) -> Result<String> {
    print!("Password for {}: ", username);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("no password given");
    }
    Ok(password)
}
