//! CLI command implementations

use anyhow::{bail, Result};
use dialoguer::{Input, Password};
use std::fs;
use std::sync::Arc;

use crate::auth::{
    decode_claims, AuthContext, GuardDecision, HttpAuthApi, RecordingNavigator, Role, RouteGuard,
    SessionState, SessionStore,
};
use crate::cli::{error, info, print_claims, print_user_table, success, warn, OutputFormat};
use crate::client::ApiClient;
use crate::config::{self, Config};

/// Initialize a new quizdesk.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = std::path::Path::new(config::loader::CONFIG_FILENAME);

    if config_path.exists() {
        warn("quizdesk.toml already exists");
        return Ok(());
    }

    let content = config::loader::default_config_content();
    fs::write(config_path, content)?;

    success("Created quizdesk.toml");
    info("Set api.base_url and run 'quizdesk login' to sign in");

    Ok(())
}

/// Sign in, prompting for whatever credentials were not given
pub async fn login(config: &Config, email: Option<String>, password: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::<String>::new().with_prompt("Email").interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let (ctx, navigator) = auth_context(config);
    info(&format!("Signing in as {}", email));

    match ctx.sign_in(&email, &password).await {
        Ok(user) => {
            success(&format!("Signed in as {}", user.display_name()));
            print_user_table(&user);
            if let Some(route) = navigator.last() {
                info(&format!("Home: {}", route));
            }
            Ok(())
        }
        Err(e) => {
            error(&format!("Failed to sign in: {}", e));
            Err(e.into())
        }
    }
}

/// Sign out
pub async fn logout(config: &Config) -> Result<()> {
    let (ctx, _) = auth_context(config);
    ctx.sign_out().await;
    success("Signed out");
    Ok(())
}

/// Show the signed-in user
pub async fn whoami(config: &Config, format: OutputFormat) -> Result<()> {
    let (ctx, _) = auth_context(config);

    let user = match ctx.hydrate().await {
        SessionState::Active(user) => user,
        SessionState::Expired => {
            warn("Your session has expired. Run 'quizdesk login' to sign in again");
            return Ok(());
        }
        SessionState::Absent => {
            info("Not signed in");
            return Ok(());
        }
    };

    match format {
        OutputFormat::Table => print_user_table(&user),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&user)?),
    }

    Ok(())
}

/// Run the route guard for a route
pub async fn open(config: &Config, route: &str, allow: Vec<Role>) -> Result<()> {
    let (ctx, _) = auth_context(config);
    ctx.hydrate().await;

    match guard_for(allow).check(&ctx).await {
        GuardDecision::Authorized => {
            success(&format!("Authorized for {}", route));
            Ok(())
        }
        GuardDecision::Unauthorized { redirect_to, reason } => {
            warn(&format!("Redirected to {} ({:?})", redirect_to, reason));
            bail!("access to {} denied", route)
        }
        GuardDecision::Hydrating => bail!("session not loaded"),
    }
}

/// Decode a token's claims
pub async fn decode(token: &str, format: OutputFormat) -> Result<()> {
    match decode_claims(token) {
        Some(claims) => {
            match format {
                OutputFormat::Table => print_claims(&claims, chrono::Utc::now().timestamp()),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&claims)?),
                OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&claims)?),
            }
            Ok(())
        }
        None => {
            error("Token could not be decoded");
            bail!("undecodable token")
        }
    }
}

/// Fetch a backend resource behind the route guard
pub async fn fetch(config: &Config, path: &str, allow: Vec<Role>) -> Result<()> {
    let (ctx, _) = auth_context(config);
    ctx.hydrate().await;

    if let GuardDecision::Unauthorized { redirect_to, reason } =
        guard_for(allow).check(&ctx).await
    {
        warn(&format!("Redirected to {} ({:?})", redirect_to, reason));
        bail!("access to {} denied", path);
    }

    let client = ApiClient::new(config.api.clone(), ctx.store().clone());
    match client.get::<serde_json::Value>(path).await {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Err(e) => {
            error(&format!("Failed to fetch {}: {}", path, e));
            Err(e.into())
        }
    }
}

fn auth_context(config: &Config) -> (AuthContext, Arc<RecordingNavigator>) {
    let store = SessionStore::file(&config.session.path);
    let api = Arc::new(HttpAuthApi::new(&config.api));
    let navigator = Arc::new(RecordingNavigator::new());
    (AuthContext::new(store, api, navigator.clone()), navigator)
}

fn guard_for(allow: Vec<Role>) -> RouteGuard {
    if allow.is_empty() {
        RouteGuard::authenticated()
    } else {
        RouteGuard::roles(allow)
    }
}
