//! User administration commands. Gated to admins as a whole; the server
//! checks again on every call.

use super::{output, Ctx, UsersCommands};
use crate::access::{self, Capability};
use crate::models::{CreateUserRequest, Role, UpdateUserRequest};
use anyhow::{Context, Result};

pub(crate) async fn run(ctx: &Ctx, command: &UsersCommands) -> Result<()> {
    access::ensure(ctx.role(), Capability::ManageUsers)?;
    match command {
        UsersCommands::List => cmd_list(ctx).await,
        UsersCommands::Create {
            username,
            password,
            full_name,
            role,
            phone,
        } => cmd_create(ctx, username, password, full_name, *role, phone.as_deref()).await,
        UsersCommands::Update {
            id,
            username,
            password,
            full_name,
            role,
            phone,
        } => {
            cmd_update(
                ctx,
                *id,
                username.as_deref(),
                password.as_deref(),
                full_name.as_deref(),
                *role,
                phone.as_deref(),
            )
            .await
        }
        UsersCommands::Delete { id, yes } => cmd_delete(ctx, *id, *yes).await,
    }
}

async fn cmd_list(ctx: &Ctx) -> Result<()> {
    let users = ctx.client.list_users(None).await?;
    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!();
    println!(
        "{:<5}  {:<16}  {:<24}  {:<10}  {:<14}  {:<8}",
        "ID", "USERNAME", "FULL NAME", "ROLE", "PHONE", "ACTIVE"
    );
    println!("{}", "-".repeat(87));
    for user in &users {
        println!(
            "{:<5}  {:<16}  {:<24}  {:<10}  {:<14}  {:<8}",
            user.id,
            output::truncate(&user.username, 16),
            output::truncate(&user.full_name, 24),
            user.role.label(),
            user.phone.as_deref().unwrap_or("-"),
            if user.is_active { "yes" } else { "no" }
        );
    }
    println!();
    Ok(())
}

async fn cmd_create(
    ctx: &Ctx,
    username: &str,
    password: &str,
    full_name: &str,
    role: Role,
    phone: Option<&str>,
) -> Result<()> {
    let request = CreateUserRequest {
        username: username.to_string(),
        password: password.to_string(),
        full_name: full_name.to_string(),
        role,
        phone: phone.unwrap_or("").to_string(),
    };
    ctx.client.create_user(&request).await?;
    println!("[OK] User {} created with role {}.", username, role.label());
    Ok(())
}

/// Flags override the stored account field by field; the password goes on
/// the wire only when a new one was given.
async fn cmd_update(
    ctx: &Ctx,
    id: i64,
    username: Option<&str>,
    password: Option<&str>,
    full_name: Option<&str>,
    role: Option<Role>,
    phone: Option<&str>,
) -> Result<()> {
    let users = ctx.client.list_users(None).await?;
    let current = users
        .iter()
        .find(|user| user.id == id)
        .with_context(|| format!("No user with ID {}", id))?;

    let request = UpdateUserRequest {
        username: username
            .map(str::to_string)
            .unwrap_or_else(|| current.username.clone()),
        password: password.map(str::to_string),
        full_name: full_name
            .map(str::to_string)
            .unwrap_or_else(|| current.full_name.clone()),
        role: role.unwrap_or(current.role),
        phone: phone
            .map(str::to_string)
            .or_else(|| current.phone.clone())
            .unwrap_or_default(),
    };
    ctx.client.update_user(id, &request).await?;
    println!("[OK] User {} updated.", request.username);
    Ok(())
}

async fn cmd_delete(ctx: &Ctx, id: i64, yes: bool) -> Result<()> {
    let users = ctx.client.list_users(None).await?;
    let user = users
        .iter()
        .find(|user| user.id == id)
        .with_context(|| format!("No user with ID {}", id))?;

    if !user.is_active {
        println!("User {} is already deactivated.", user.username);
        return Ok(());
    }

    if !yes {
        let prompt = format!("Deactivate user {} ({})?", user.username, user.full_name);
        if !output::confirm(&prompt)? {
            println!("Aborted.");
            return Ok(());
        }
    }

    ctx.client.delete_user(id).await?;
    println!(
        "[OK] User {} deactivated. Their name stays on past orders.",
        user.username
    );
    Ok(())
}
