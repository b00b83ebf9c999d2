use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cv_service::{AddCredentialRequest, ListQuery, VaultError, VaultService};
use cv_store::{Credential, Store};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

mod config;
mod crypto;

use crate::crypto::Sealer;

#[derive(Parser, Debug)]
#[command(name = "cv-cli", author, version, about = "Credential Vault CLI", long_about = None)]
struct Cli {
    /// Path to the vault database
    #[arg(long, env = "CV_DB_PATH")]
    db: Option<PathBuf>,

    /// Account that owns the vault entries
    #[arg(long, env = "CV_OWNER")]
    owner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a credential
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Precomputed password strength score
        #[arg(long, default_value_t = 0)]
        strength: i64,
    },
    /// List credentials, one page at a time
    List {
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        limit: Option<String>,
        /// Case-insensitive search on the website name
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one credential
    Get {
        id: String,
        /// Decrypt username and password
        #[arg(long)]
        reveal: bool,
    },
    /// Change some fields of a credential
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        strength: Option<i64>,
    },
    /// Delete one credential
    Delete { id: String },
    /// Delete several credentials
    DeleteMany { ids: Vec<String> },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RevealedCredential<'a> {
    id: &'a str,
    website_name: &'a str,
    url: &'a str,
    username: &'a str,
    password: &'a str,
    password_strength: i64,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries JSON only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config::DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<VaultError>() {
                Some(vault_err) => eprintln!(
                    "{}",
                    serde_json::to_string(&vault_err.body()).unwrap_or_else(|_| vault_err.to_string())
                ),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let db_path = config::db_path(cli.db)?;
    config::ensure_parent(&db_path)?;
    debug!("[cli] using database {}", db_path.display());

    let store = Store::open(&db_path).await?;
    let service = VaultService::new(Arc::new(store.clone()));
    let owner = cli.owner.as_str();

    let result = execute(&service, owner, cli.command).await;
    store.close().await;
    print_json(&result?)
}

async fn execute(service: &VaultService, owner: &str, command: Commands) -> Result<Value> {
    match command {
        Commands::Add {
            name,
            url,
            username,
            password,
            strength,
        } => {
            let sealer = Sealer::from_env()?;
            let username = sealer.seal(&username)?;
            let password = sealer.seal(&password)?;
            let id = service
                .add(
                    owner,
                    AddCredentialRequest {
                        website_name: name,
                        website_url: url,
                        username: username.cipher,
                        password: password.cipher,
                        username_iv: username.iv,
                        password_iv: password.iv,
                        password_strength: strength,
                    },
                )
                .await?;
            Ok(json!({ "id": id }))
        }
        Commands::List {
            page,
            limit,
            search,
        } => {
            let page = service
                .list(owner, &ListQuery { page, limit, search })
                .await?;
            Ok(serde_json::to_value(page)?)
        }
        Commands::Get { id, reveal } => {
            let cred = service.get_one(owner, &id).await?;
            if reveal {
                reveal_credential(&cred)
            } else {
                Ok(serde_json::to_value(cred)?)
            }
        }
        Commands::Edit {
            id,
            name,
            url,
            username,
            password,
            strength,
        } => {
            let fields = edit_fields(name, url, username, password, strength)?;
            let cred = service.edit(owner, &id, Value::Object(fields)).await?;
            Ok(serde_json::to_value(cred)?)
        }
        Commands::Delete { id } => {
            let deleted = service.delete_one(owner, &id).await?;
            Ok(json!({ "deleted": deleted }))
        }
        Commands::DeleteMany { ids } => {
            let deleted = service.delete_many(owner, &ids).await?;
            Ok(json!({ "deleted": deleted }))
        }
    }
}

/// Build the JSON field map the service expects, sealing any new secrets.
fn edit_fields(
    name: Option<String>,
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    strength: Option<i64>,
) -> Result<Map<String, Value>> {
    let mut fields = Map::new();
    if let Some(name) = name {
        fields.insert("websiteName".into(), name.into());
    }
    if let Some(url) = url {
        fields.insert("websiteUrl".into(), url.into());
    }
    if username.is_some() || password.is_some() {
        let sealer = Sealer::from_env()?;
        if let Some(username) = username {
            let pair = sealer.seal(&username)?;
            fields.insert("username".into(), pair.cipher.into());
            fields.insert("usernameIv".into(), pair.iv.into());
        }
        if let Some(password) = password {
            let pair = sealer.seal(&password)?;
            fields.insert("password".into(), pair.cipher.into());
            fields.insert("passwordIv".into(), pair.iv.into());
        }
    }
    if let Some(strength) = strength {
        fields.insert("passwordStrength".into(), strength.into());
    }
    Ok(fields)
}

fn reveal_credential(cred: &Credential) -> Result<Value> {
    let sealer = Sealer::from_env()?;
    let username = sealer.open(&cred.username)?;
    let password = sealer.open(&cred.password)?;
    Ok(serde_json::to_value(RevealedCredential {
        id: &cred.id,
        website_name: &cred.website_name,
        url: &cred.url,
        username: &username,
        password: &password,
        password_strength: cred.password_strength,
    })?)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
