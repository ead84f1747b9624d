//! Operator CLI for gridlock stores.
//!
//! Drives every table, lock and workflow operation against a running
//! grid server. Settings come from an optional TOML file, then
//! `GRIDLOCK_*` environment variables, then command-line flags.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, LockAction, StoreLayout};
use gridlock_core::backend::HttpBackend;
use gridlock_core::config::GridConfig;
use gridlock_core::library::{Library, NewAccount, NewDocument};
use gridlock_core::{GridBackend, Identity, Session, Snapshot, StoreId};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let backend = Arc::new(HttpBackend::from_config(&config)?);
    let library = Library::from_config(backend.clone(), &config);
    let session = session(&config)?;
    let client = library.client();

    match cli.command {
        Commands::CreateStore => {
            backend.create_store(&session.store)?;
            println!("Created store {}", session.store);
        }
        Commands::Provision { layout, reset } => {
            let provisioner = library.provisioner();
            let report = match layout {
                StoreLayout::User => provisioner.setup_user_store(&session, reset)?,
                StoreLayout::Directory => provisioner.setup_directory(&session, reset)?,
            };
            println!("created: {}", report.created.join(", "));
            println!("reset:   {}", report.reset.join(", "));
            println!("skipped: {}", report.skipped.join(", "));
            if let Some(removed) = &report.removed_default {
                println!("removed default table {}", removed);
            }
            for (table, e) in &report.failed {
                eprintln!("failed:  {}: {}", table, e);
            }
            if !report.is_complete() {
                anyhow::bail!("{} tables failed to provision", report.failed.len());
            }
        }
        Commands::Fetch { table } => {
            let snapshot = client.try_fetch(&session, &table.schema())?;
            print_snapshot(&snapshot);
        }
        Commands::Insert { table, values } => {
            client.insert(&session, &table.schema(), &values)?;
            println!("Inserted 1 record into {}", table);
        }
        Commands::Update {
            table,
            column,
            value,
            by,
            keys,
        } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let report =
                client.update_matching(&session, &table.schema(), &by, &keys, &column, &value)?;
            println!("Updated positions {:?}", report.applied);
            for (position, e) in &report.failed {
                eprintln!("position {} failed: {}", position, e);
            }
        }
        Commands::Delete { table, by, keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let report = client.delete_matching(&session, &table.schema(), &by, &keys)?;
            println!("Deleted positions {:?}", report.deleted);
        }
        Commands::Lock { action } => run_lock(&library, &session, action)?,
        Commands::AddTag { name } => {
            let tag = library.add_tag(&session, &name)?;
            println!("{}\t{}", tag.tag_id, tag.tag);
        }
        Commands::DeleteTags { names } => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let removal = library.delete_tags(&session, &names)?;
            println!(
                "Removed {} tags, retagged {} documents",
                removal.tags_removed,
                removal.retagged.applied.len()
            );
        }
        Commands::Retag { changes } => {
            let changes: Vec<(&str, &str)> = changes
                .iter()
                .map(|(file, tag)| (file.as_str(), tag.as_str()))
                .collect();
            let report = library.retag_documents(&session, &changes)?;
            println!("Retagged {} documents", report.updated.applied.len());
            for file_id in &report.missing {
                eprintln!("no document with id {}", file_id);
            }
        }
        Commands::RecordDoc {
            file_name,
            summary,
            tag,
        } => {
            let recorded = library.record_documents(
                &session,
                &[NewDocument {
                    file_name,
                    summary,
                    tag,
                }],
            )?;
            for doc in recorded {
                println!("{}\t{}", doc.file_id, doc.file_name);
            }
        }
        Commands::DeleteDocs { file_ids } => {
            let file_ids: Vec<&str> = file_ids.iter().map(String::as_str).collect();
            let removed = library.delete_documents(&session, &file_ids)?;
            println!("Deleted {} documents", removed);
        }
        Commands::Chat {
            file_id,
            role,
            content,
            model,
        } => {
            let message =
                library.append_chat(&session, &file_id, role, &content, model.as_deref())?;
            println!("{}\t{}\t{}", message.time, message.role, message.model);
        }
        Commands::History { file_id } => {
            for message in library.chat_history(&session, &file_id)? {
                println!("[{}] {}: {}", message.time, message.role, message.content);
            }
        }
        Commands::Register {
            username,
            user_id,
            email,
            password_hash,
            database_url,
        } => {
            let registration = library.register_account(
                &session,
                NewAccount {
                    username,
                    user_id,
                    email,
                    password_hash,
                    database_url,
                },
            )?;
            println!(
                "Registered {} with store {}",
                registration.account.user_id, registration.account.database_url
            );
            if !registration.provision.is_complete() {
                eprintln!(
                    "warning: {} user tables failed to provision",
                    registration.provision.failed.len()
                );
            }
        }
        Commands::Deregister { user_id } => {
            if library.deregister_account(&session, &user_id)? {
                println!("Removed account {}", user_id);
            } else {
                println!("No account {}", user_id);
            }
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<GridConfig> {
    let mut config = match &cli.config {
        Some(path) => GridConfig::from_file(path)?,
        None => GridConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    if let Some(store) = &cli.store {
        config.store = Some(store.clone());
    }
    if let Some(identity) = &cli.identity {
        config.identity = Some(identity.clone());
    }
    Ok(config)
}

fn session(config: &GridConfig) -> anyhow::Result<Session> {
    let store = config
        .store
        .as_deref()
        .context("No store given; pass --store or set GRIDLOCK_STORE")?;
    let identity = config
        .identity
        .as_deref()
        .context("No identity given; pass --identity or set GRIDLOCK_IDENTITY")?;
    Ok(Session::new(StoreId::parse(store)?, Identity::new(identity)?))
}

fn run_lock(library: &Library, session: &Session, action: LockAction) -> anyhow::Result<()> {
    let locks = library.client().locks();
    match action {
        LockAction::Acquire { table } => {
            let acquired = locks.acquire(session, &table.schema())?;
            println!("{:?} hold on {} for {}", acquired, table, session.identity);
        }
        LockAction::Release { table } => {
            locks.release(session, &table.schema())?;
            println!("Released {}", table);
        }
        LockAction::Status { table } => {
            println!("{}: {}", table, locks.status(session, &table.schema())?);
        }
        LockAction::Reset { table } => {
            let previous = locks.reset(session, &table.schema())?;
            println!("Reset {} (was {})", table, previous);
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    let rows: Vec<serde_json::Value> = snapshot
        .records
        .iter()
        .enumerate()
        .map(|(position, record)| {
            let mut row = serde_json::Map::new();
            row.insert("position".to_string(), position.into());
            for (column, value) in record.columns().zip(record.values()) {
                row.insert(column.to_string(), value.into());
            }
            serde_json::Value::Object(row)
        })
        .collect();
    match serde_json::to_string_pretty(&rows) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render {}: {}", snapshot.table, e),
    }
}
