//! CryptoChat command-line client
//!
//! End-to-end encrypted messaging through an untrusted relay.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use cryptochat_core::{AccountId, LocalStore, NewAccount, SledBlobStore};
use cryptochat_protocol::{ChatClient, ConversationEntry, SyncEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::CliConfig;

/// CryptoChat CLI arguments
#[derive(Parser, Debug)]
#[command(name = "cryptochat")]
#[command(about = "End-to-end encrypted chat over an untrusted relay")]
struct Args {
    /// Config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Relay URL, overriding the config file
    #[arg(long)]
    relay_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an identity key unless one exists
    Keygen,
    /// Import a PEM private key from a file
    ImportKey {
        /// PKCS#8 PEM file
        file: PathBuf,
    },
    /// Register the profile on the relay
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        /// Phone number
        #[arg(long)]
        phone: Option<String>,
        /// Email address
        #[arg(long)]
        email: Option<String>,
    },
    /// Show the profile and key fingerprint
    Whoami,
    /// List contacts with their latest message
    Contacts,
    /// Look up an account and add it as a contact
    AddContact {
        /// Account id
        id: AccountId,
    },
    /// Remove a contact and its messages
    RemoveContact {
        /// Account id
        id: AccountId,
    },
    /// Send a message
    Send {
        /// Recipient account id
        id: AccountId,
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Fetch and show the conversation with a contact
    Read {
        /// Contact account id
        id: AccountId,
    },
    /// Delete the conversation with a contact
    Clear {
        /// Contact account id
        id: AccountId,
    },
    /// Print new messages as they arrive
    Watch,
    /// Erase the local identity, contacts and messages
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

fn init_logging(config: &CliConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {}", e))
}

fn print_entry(client: &ChatClient, entry: &ConversationEntry) {
    let who = if entry.outgoing {
        "me".to_string()
    } else {
        client
            .store()
            .contact(entry.message.sender_id)
            .map(|c| c.name)
            .unwrap_or_else(|| entry.message.sender_id.to_string())
    };
    match &entry.text {
        Ok(text) => println!("{}: {}", who, text),
        Err(e) => println!("{}: <unreadable: {}>", who, e),
    }
}

async fn watch(client: &ChatClient) -> anyhow::Result<()> {
    let mut events = client.subscribe();
    client.start_sync();
    info!("Watching for messages, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(SyncEvent::NewMessages { messages }) => {
                    for message in &messages {
                        match client.open(message) {
                            Ok(entry) => print_entry(client, &entry),
                            Err(e) => warn!(error = %e, "Could not open message"),
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Missed sync events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    client.stop_sync();
    Ok(())
}

async fn run(client: &ChatClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Keygen => {
            let public_key = client.ensure_identity()?;
            println!("{}", public_key.to_pem()?);
            println!("Fingerprint: {}", public_key.fingerprint());
        }
        Command::ImportKey { file } => {
            let pem = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let public_key = client.import_private_key(&pem)?;
            println!("Imported key {}", public_key.fingerprint());
        }
        Command::Register { name, phone, email } => {
            client.ensure_identity()?;
            let form = NewAccount { name, phone, email };
            let account = client.register(form).await?;
            println!(
                "Registered {} with id {}",
                account.name,
                account.require_id()?
            );
        }
        Command::Whoami => {
            match client.profile() {
                Some(profile) => {
                    let id = profile.id.map(|id| id.to_string()).unwrap_or_default();
                    println!("{} (id {})", profile.name, id);
                    if let Some(phone) = profile.phone {
                        println!("Phone: {}", phone);
                    }
                    if let Some(email) = profile.email {
                        println!("Email: {}", email);
                    }
                }
                None => println!("Not registered"),
            }
            match client.public_key() {
                Some(key) => println!("Fingerprint: {}", key.fingerprint()),
                None => println!("No identity key"),
            }
        }
        Command::Contacts => {
            for summary in client.conversations()? {
                let id = summary.contact.id.map(|id| id.to_string()).unwrap_or_default();
                let preview = match &summary.last {
                    Some(ConversationEntry { text: Ok(text), .. }) => text.clone(),
                    Some(ConversationEntry { text: Err(_), .. }) => "<unreadable>".to_string(),
                    None => String::new(),
                };
                println!(
                    "{}\t{}\t{} messages\t{}",
                    id, summary.contact.name, summary.message_count, preview
                );
            }
        }
        Command::AddContact { id } => {
            let contact = client.add_contact(id).await?;
            println!("Added {} ({})", contact.name, id);
        }
        Command::RemoveContact { id } => {
            let removed = client.remove_contact(id)?;
            println!("Removed contact {} and {} messages", id, removed);
        }
        Command::Send { id, text } => {
            let message = client.send_message(id, &text.join(" ")).await?;
            match message.message_id {
                Some(message_id) => println!("Sent message {}", message_id),
                None => println!("Sent"),
            }
        }
        Command::Read { id } => {
            if let Err(e) = client.refresh().await {
                warn!(error = %e, "Could not fetch new messages");
            }
            for entry in client.conversation(id)? {
                print_entry(client, &entry);
            }
        }
        Command::Clear { id } => {
            let removed = client.clear_conversation(id)?;
            println!("Deleted {} messages", removed);
        }
        Command::Watch => watch(client).await?,
        Command::Reset { yes } => {
            if !yes {
                bail!("reset erases the local identity; pass --yes to confirm");
            }
            client.reset()?;
            println!("Local state erased");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(CliConfig::default_path);
    let mut config = CliConfig::load_or_default(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    if let Some(url) = args.relay_url {
        config.client.relay_url = url;
    }

    init_logging(&config)?;
    debug!(config = %config_path.display(), relay = %config.client.relay_url, "Starting");

    std::fs::create_dir_all(&config.storage_path)
        .with_context(|| format!("creating {}", config.storage_path.display()))?;
    let blobs = SledBlobStore::open(&config.storage_path)
        .with_context(|| format!("opening {}", config.storage_path.display()))?;
    let store = Arc::new(LocalStore::new(Arc::new(blobs)));
    store.load().context("loading local state")?;

    let client = ChatClient::connect(config.client.clone(), store)?;
    run(&client, args.command).await
}
