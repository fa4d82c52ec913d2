#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for reading an IMAP or POP3 mailbox as JSON records

use anyhow::Context;
use clap::{Parser, Subcommand};
use mailbox_extract::{
    ConfigStore, DEFAULT_CONFIG_FILE, Folder, MailConfig, RawMessage, Store, sign_in,
    to_json, to_json_pretty,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailbox-cli")]
#[command(about = "Extract messages from an IMAP or POP3 mailbox")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Properties file with the mail.* settings
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the configured host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Override the configured user
    #[arg(long, global = true)]
    user: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List available folders
    Folders,

    /// Show message counts for a folder
    Status {
        /// Folder to inspect (defaults to mail.imap.folder)
        #[arg(long)]
        folder: Option<String>,
    },

    /// Extract unread messages and mark them seen
    Unread {
        /// Folder to read (defaults to mail.imap.folder)
        #[arg(long, conflicts_with = "pick")]
        folder: Option<String>,

        /// Choose the folder interactively
        #[arg(long)]
        pick: bool,
    },

    /// Show unread messages without marking them
    Peek {
        #[arg(long)]
        folder: Option<String>,
    },

    /// Extract every message without changing flags
    All {
        #[arg(long)]
        folder: Option<String>,
    },

    /// Copy subject and body of every message
    Copy {
        /// Folder to copy from (defaults to INBOX)
        #[arg(long)]
        folder: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = ConfigStore::load(&args.config)
        .with_context(|| format!("Cannot load {}", args.config.display()))?;
    let config = settings.snapshot();

    let password = std::env::var("MAIL_PASSWORD").context("MAIL_PASSWORD is not set")?;
    let mut store = connect(&config, &args, &password).await?;

    let result = run(&mut store, &mut settings, &config, &args).await;
    store.logout().await;
    result
}

async fn connect(config: &MailConfig, args: &Args, password: &str) -> anyhow::Result<Store> {
    let protocol = config.protocol()?;
    let host = args
        .host
        .as_deref()
        .or_else(|| config.host(protocol))
        .with_context(|| format!("No host: pass --host or set mail.{}.host", protocol.family()))?;
    let user = args
        .user
        .as_deref()
        .or_else(|| config.user(protocol))
        .with_context(|| format!("No user: pass --user or set mail.{}.user", protocol.family()))?;

    Ok(sign_in(config, host, user, password).await?)
}

async fn run(
    store: &mut Store,
    settings: &mut ConfigStore,
    config: &MailConfig,
    args: &Args,
) -> anyhow::Result<()> {
    match &args.command {
        Command::Folders => cmd_folders(store, args).await,
        Command::Status { folder } => {
            cmd_status(store, args, &folder_or_default(folder.as_deref(), config)).await
        }
        Command::Unread { pick: true, .. } => {
            let mut input = std::io::BufReader::new(std::io::stdin());
            let mut output = std::io::stderr();
            let chosen = mailbox_extract::select_folder_interactive(
                store,
                settings,
                &mut input,
                &mut output,
            )
            .await?;
            cmd_unread(store, args, &chosen).await
        }
        Command::Unread { folder, .. } => {
            cmd_unread(store, args, &folder_or_default(folder.as_deref(), config)).await
        }
        Command::Peek { folder } => {
            let messages = store.peek_unread(&folder_or_default(folder.as_deref(), config)).await?;
            print_messages(args, messages)
        }
        Command::All { folder } => {
            let messages = store.all_messages(&folder_or_default(folder.as_deref(), config)).await?;
            print_messages(args, messages)
        }
        Command::Copy { folder } => {
            let folder = folder.as_deref().map_or(Folder::Inbox, Folder::from);
            let records = store.copy_records(&folder).await?;
            if args.json {
                println!("{}", to_json_pretty(&records)?);
            } else {
                for record in &records {
                    println!("{}", record.subject);
                }
                println!("\n{} message(s)", records.len());
            }
            Ok(())
        }
    }
}

/// The folder named on the command line, else the configured one.
fn folder_or_default(folder: Option<&str>, config: &MailConfig) -> Folder {
    folder.map_or_else(|| config.folder(), Folder::from)
}

async fn cmd_folders(store: &mut Store, args: &Args) -> anyhow::Result<()> {
    let folders = store.list_folders().await?;

    if args.json {
        let names: Vec<&str> = folders.iter().map(Folder::as_str).collect();
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for folder in &folders {
            println!("{folder}");
        }
    }

    Ok(())
}

async fn cmd_status(store: &mut Store, args: &Args, folder: &Folder) -> anyhow::Result<()> {
    let status = store.folder_status(folder).await?;

    if args.json {
        let value = serde_json::json!({
            "folder": folder.as_str(),
            "messages": status.exists,
            "recent": status.recent,
            "first_unseen": status.first_unseen,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Folder:   {folder}");
        println!("Messages: {}", status.exists);
        println!("Recent:   {}", status.recent);
        if let Some(seq) = status.first_unseen {
            println!("Unseen:   from message {seq}");
        }
    }

    Ok(())
}

async fn cmd_unread(store: &mut Store, args: &Args, folder: &Folder) -> anyhow::Result<()> {
    let records = store.unread_records(folder).await?;

    if args.json {
        println!("{}", to_json_pretty(&records)?);
    } else {
        println!("{}", to_json(&records)?);
    }

    Ok(())
}

fn print_messages(args: &Args, messages: Vec<RawMessage>) -> anyhow::Result<()> {
    if args.json {
        let records: Vec<_> = messages.into_iter().map(RawMessage::into_record).collect();
        println!("{}", to_json_pretty(&records)?);
    } else {
        print_message_table(&messages);
    }
    Ok(())
}

fn print_message_table(messages: &[RawMessage]) {
    if messages.is_empty() {
        println!("No messages found.");
        return;
    }

    let header = format!("{:<12} {:<30} {}", "Ref", "From", "Subject");
    println!("{header}");
    println!("{}", "-".repeat(80));

    for message in messages {
        println!(
            "{:<12} {:<30} {}",
            message.reference.to_string(),
            truncate(message.header("From").unwrap_or("-"), 28),
            truncate(message.subject().unwrap_or("(no subject)"), 40),
        );
    }

    println!("\n{} message(s)", messages.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
