use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use keygate_authenticator::{
    Authenticator, AuthenticatorConfig, ExtensionItem, HostContext, ResponseItem,
    ValidationFailurePolicy, host::PropertyListItem,
};
use keygate_credentials::{AlwaysConfirm, AlwaysDeny, MemoryKeyStore, UserPresence};
use serde_json::Value;
use tokio::io::AsyncReadExt;

#[derive(Debug, Parser)]
#[command(name = "keygate")]
#[command(bin_name = "keygate")]
#[command(
    about = "Feed register/sign requests through the authenticator",
    long_about = "Each request is a JSON mapping {type, keyHandle, toSign}. All requests \
                  share one in-memory key store, so a register followed by a sign for the \
                  same handle works. Response items are printed to stdout as JSON."
)]
pub struct KeygateCli {
    /// JSON config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Decline every confirmation prompt instead of approving it.
    #[arg(long)]
    pub deny: bool,

    /// Complete malformed requests with no response items.
    #[arg(long)]
    pub silent_validation: bool,

    /// Request files; `-` reads one request from stdin.
    #[arg(required = true)]
    pub requests: Vec<PathBuf>,
}

impl KeygateCli {
    /// The config file (if any) with command-line overrides applied.
    pub fn config(&self) -> Result<AuthenticatorConfig> {
        let mut config = match &self.config {
            Some(path) => AuthenticatorConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => AuthenticatorConfig::default(),
        };
        if self.silent_validation {
            config.validation_failures = ValidationFailurePolicy::Silent;
        }
        Ok(config)
    }

    /// The confirmation gate selected on the command line.
    pub fn presence(&self) -> Arc<dyn UserPresence> {
        if self.deny {
            Arc::new(AlwaysDeny)
        } else {
            Arc::new(AlwaysConfirm)
        }
    }

    /// Run every request in order against one in-memory key store, writing
    /// one line of JSON response items per request to `out`.
    pub async fn run(&self, out: &mut impl Write) -> Result<()> {
        let store = MemoryKeyStore::new(self.presence());
        let authenticator = Authenticator::with_self_signed(store, self.config()?);

        for path in &self.requests {
            let message = read_request(path).await?;
            let item =
                ExtensionItem::new().with_attachment(PropertyListItem::preprocessed(message));
            tracing::debug!(request = %path.display(), "submitting request");

            let (context, pending) = HostContext::new(vec![item]);
            authenticator.begin_request(context).await;
            let response = pending.wait().await?;

            writeln!(out, "{}", serde_json::to_string(&render(&response))?)?;
        }

        Ok(())
    }
}

/// Read one request mapping from `path`, or stdin for `-`.
pub async fn read_request(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("reading request from stdin")?;
        text
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading request from {}", path.display()))?
    };

    serde_json::from_str(&text).with_context(|| format!("parsing request {}", path.display()))
}

/// Response items as printed: one array of attachment contents per item.
pub fn render(items: &[ResponseItem]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| {
                Value::Array(
                    item.attachments
                        .iter()
                        .map(PropertyListItem::item)
                        .cloned()
                        .collect(),
                )
            })
            .collect(),
    )
}
