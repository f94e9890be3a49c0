//! mailnorm - Fetch and delete mail from the command line

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use mailnorm::config::{EwsCredentials, SecretSource, Settings, StaticSecrets};
use mailnorm::domain::{Email, EmailFolder, EmailService, FolderType, RetrievalRequest};
use mailnorm::providers::email::{GmailAdapter, GraphAdapter, MailAdapter};
use mailnorm::services::RetrievalService;
use mailnorm::storage::KeychainAccess;

/// Command-line options for mailnorm.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Read secrets from MAILNORM_* environment variables instead of the keychain.
    #[arg(long, global = true)]
    env_secrets: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve one batch and print it as JSON.
    Fetch {
        /// gmail, outlook or owa
        #[arg(long)]
        service: EmailService,

        /// Messages to skip.
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Messages to return. Defaults to the configured batch size.
        #[arg(long)]
        count: Option<usize>,

        /// Inbox, Sent, Drafts, Spam, Trash or Custom.
        #[arg(long, default_value = "Inbox")]
        folder: FolderType,

        /// Provider-native folder id or label.
        #[arg(long)]
        folder_id: Option<String>,
    },
    /// Delete one message by id.
    Delete {
        #[arg(long)]
        service: EmailService,

        #[arg(long)]
        id: String,
    },
    /// Manage provider secrets in the OS keychain.
    Secrets(SecretsArgs),
}

#[derive(Args, Debug)]
struct SecretsArgs {
    #[command(subcommand)]
    action: SecretsAction,
}

#[derive(Subcommand, Debug)]
enum SecretsAction {
    /// Store a secret, e.g. `googleRefreshToken`.
    Set {
        #[arg(long)]
        name: String,

        /// Secret value. Read from the first line of stdin when omitted.
        #[arg(long)]
        value: Option<String>,
    },
    /// Remove a stored secret.
    Remove {
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load().context("load settings")?;
    let keychain = KeychainAccess::with_service(settings.keychain_service.clone());
    let secrets: Box<dyn SecretSource> = if cli.env_secrets {
        Box::new(StaticSecrets::from_env())
    } else {
        Box::new(keychain.clone())
    };

    match cli.command {
        Command::Fetch {
            service,
            start,
            count,
            folder,
            folder_id,
        } => {
            let folder = match folder_id {
                Some(handle) => EmailFolder::new(folder.to_string(), folder, service, Some(handle))?,
                None => EmailFolder::standard(folder, service)?,
            };
            let request = RetrievalRequest::new(start, count.unwrap_or(settings.retrieval.batch_size))
                .with_folder(folder);

            let retrieval = RetrievalService::new().with_deadline(settings.timeout());
            retrieval
                .register_adapter(connect(service, &settings, secrets.as_ref()).await?)
                .await;

            let result = retrieval.fetch_batch(service, &request).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Delete { service, id } => {
            let retrieval = RetrievalService::new();
            retrieval
                .register_adapter(connect(service, &settings, secrets.as_ref()).await?)
                .await;

            let outcome = retrieval.delete_by_id(&Email::with_id(service, id)).await;
            println!("{}", outcome);
            if !outcome.is_deleted() {
                std::process::exit(1);
            }
        }
        Command::Secrets(args) => manage_secrets(&keychain, args.action).await?,
    }

    Ok(())
}

async fn manage_secrets(keychain: &KeychainAccess, action: SecretsAction) -> Result<()> {
    match action {
        SecretsAction::Set { name, value } => {
            let value = match value {
                Some(value) => value,
                None => read_stdin_line().context("read secret from stdin")?,
            };
            let stored = keychain
                .store(&name, &value)
                .await
                .with_context(|| format!("store secret {}", name))?;
            tracing::info!(secret = stored, service = keychain.service_name(), "Stored secret");
        }
        SecretsAction::Remove { name } => {
            keychain
                .delete(&name)
                .await
                .with_context(|| format!("remove secret {}", name))?;
            tracing::info!(secret = %name, service = keychain.service_name(), "Removed secret");
        }
    }
    Ok(())
}

fn read_stdin_line() -> std::io::Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn connect(
    service: EmailService,
    settings: &Settings,
    secrets: &dyn SecretSource,
) -> Result<Arc<dyn MailAdapter>> {
    let options = settings.adapter_options(service);
    let adapter: Arc<dyn MailAdapter> = match service {
        EmailService::Gmail => {
            Arc::new(GmailAdapter::connect(secrets, options, settings.timeout()).await?)
        }
        EmailService::Outlook => {
            Arc::new(GraphAdapter::connect(secrets, options, settings.timeout()).await?)
        }
        EmailService::Owa => {
            let credentials = EwsCredentials::from_secrets(secrets).await?;
            bail!(
                "no EWS transport is bundled; implement EwsPort for {}",
                credentials.endpoint
            );
        }
    };
    Ok(adapter)
}
