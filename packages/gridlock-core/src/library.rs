//! Multi-step edits of a user's document library.
//!
//! Every locked workflow follows the same sequence: acquire the table lock,
//! fetch a fresh snapshot, compute positions from it, mutate, release.
//! Positions computed from a snapshot fetched before the lock was taken are
//! never used.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::backend::GridBackend;
use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::provision::{ProvisionReport, Provisioner};
use crate::schema::TableKind;
use crate::session::{Identity, Session, StoreId};
use crate::table::{
    AccountRecord, ChatRecord, ChatRole, DocumentRecord, TableClient, TagRecord,
    UpdateReport,
};

/// Tag every user has and nobody can delete.
pub const DEFAULT_TAG: &str = "default";

/// Model column value for messages written by the user.
pub const NO_MODEL: &str = "-";

const ID_LEN: usize = 8;

/// Random alphanumeric id of the standard length.
pub fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Random id that is not in `taken`.
pub fn unique_id(taken: &HashSet<String>) -> String {
    loop {
        let id = random_id();
        if !taken.contains(&id) {
            return id;
        }
    }
}

/// Timestamp format for documents and registrations, e.g. `09:05AM on March 04, 2025`.
pub fn long_time(at: NaiveDateTime) -> String {
    at.format("%I:%M%p on %B %d, %Y").to_string()
}

/// Timestamp format for chat messages, e.g. `04/03/2025, 09:05:00`.
pub fn chat_time(at: NaiveDateTime) -> String {
    at.format("%d/%m/%Y, %H:%M:%S").to_string()
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// A document to record; id, time and length are filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub file_name: String,
    pub summary: String,
    pub tag: String,
}

/// An account to register; the registration time is filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub user_id: String,
    pub email: String,
    pub password_hash: String,
    /// Share link or id of the user's empty data store
    pub database_url: String,
}

/// Outcome of `delete_tags`.
#[derive(Debug)]
pub struct TagRemoval {
    pub tags_removed: usize,
    /// Documents moved to the default tag
    pub retagged: UpdateReport,
}

/// Outcome of `retag_documents`.
#[derive(Debug)]
pub struct RetagReport {
    pub updated: UpdateReport,
    /// Requested file ids with no matching document
    pub missing: Vec<String>,
}

/// Outcome of `register_account`.
#[derive(Debug)]
pub struct Registration {
    pub account: AccountRecord,
    pub provision: ProvisionReport,
    /// Set when the default tag had to be created
    pub default_tag: Option<TagRecord>,
}

/// Workflows over a user data store and the account directory.
#[derive(Debug, Clone)]
pub struct Library {
    client: TableClient,
    provisioner: Provisioner,
}

impl Library {
    pub fn new(client: TableClient, provisioner: Provisioner) -> Self {
        Self {
            client,
            provisioner,
        }
    }

    pub fn from_config(backend: Arc<dyn GridBackend>, config: &GridConfig) -> Self {
        Self::new(
            TableClient::from_config(backend.clone(), config),
            Provisioner::from_config(backend, config),
        )
    }

    pub fn client(&self) -> &TableClient {
        &self.client
    }

    pub fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    pub fn tags(&self, session: &Session) -> Result<Vec<TagRecord>> {
        self.client
            .try_fetch(session, &TableKind::Tags.schema())?
            .typed()
    }

    pub fn documents(&self, session: &Session) -> Result<Vec<DocumentRecord>> {
        self.client
            .try_fetch(session, &TableKind::Documents.schema())?
            .typed()
    }

    /// Messages about one document in the order they were written.
    pub fn chat_history(&self, session: &Session, file_id: &str) -> Result<Vec<ChatRecord>> {
        let chats: Vec<ChatRecord> = self
            .client
            .try_fetch(session, &TableKind::ChatLog.schema())?
            .typed()?;
        Ok(chats.into_iter().filter(|c| c.file_id == file_id).collect())
    }

    /// Creates a tag unless one with the same name exists.
    pub fn add_tag(&self, session: &Session, name: &str) -> Result<TagRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GridError::InvalidArgument("tag name is empty".to_string()));
        }
        let schema = TableKind::Tags.schema();
        self.client.locks().with_lock(session, &schema, || {
            let snapshot = self.client.try_fetch(session, &schema)?;
            if snapshot.column_values("_tag").contains(&name) {
                return Err(GridError::DuplicateRecord {
                    table: schema.name.clone(),
                    key: name.to_string(),
                });
            }
            let taken: HashSet<String> = snapshot
                .column_values("_tagId")
                .into_iter()
                .map(str::to_string)
                .collect();
            let tag = TagRecord {
                tag_id: unique_id(&taken),
                tag: name.to_string(),
            };
            self.client.insert_typed(session, &tag)?;
            tracing::info!("Added tag '{}' to {}", tag.tag, session.store);
            Ok(tag)
        })
    }

    /// Deletes tags and moves their documents to the default tag.
    ///
    /// Holds the tags lock and then the documents lock for the whole edit.
    /// Locks are always taken in that order.
    pub fn delete_tags(&self, session: &Session, names: &[&str]) -> Result<TagRemoval> {
        if names.contains(&DEFAULT_TAG) {
            return Err(GridError::InvalidArgument(format!(
                "tag '{}' cannot be deleted",
                DEFAULT_TAG
            )));
        }
        let tags = TableKind::Tags.schema();
        let docs = TableKind::Documents.schema();
        let locks = self.client.locks();

        locks.with_lock(session, &tags, || {
            locks.with_lock(session, &docs, || {
                let tag_snapshot = self.client.try_fetch(session, &tags)?;
                let doc_snapshot = self.client.try_fetch(session, &docs)?;

                let tag_positions = tag_snapshot.positions_matching("_tag", names);
                let doc_positions = doc_snapshot.positions_matching("_tag", names);

                let removed = self.client.delete(session, &tags, &tag_positions)?;
                let values = vec![DEFAULT_TAG.to_string(); doc_positions.len()];
                let retagged = self
                    .client
                    .update(session, &docs, &doc_positions, "_tag", &values)?;

                tracing::info!(
                    "Deleted {} tags from {}, retagged {} documents",
                    removed.deleted.len(),
                    session.store,
                    retagged.applied.len()
                );
                Ok(TagRemoval {
                    tags_removed: removed.deleted.len(),
                    retagged,
                })
            })
        })
    }

    /// Sets the tag of each `(file_id, tag)` pair on every matching document.
    pub fn retag_documents(&self, session: &Session, changes: &[(&str, &str)]) -> Result<RetagReport> {
        let docs = TableKind::Documents.schema();
        self.client.locks().with_lock(session, &docs, || {
            let snapshot = self.client.try_fetch(session, &docs)?;
            let mut positions = Vec::with_capacity(changes.len());
            let mut values = Vec::with_capacity(changes.len());
            let mut missing = Vec::new();
            for (file_id, tag) in changes {
                let matches = snapshot.positions_matching("_fileId", &[*file_id]);
                if matches.is_empty() {
                    missing.push(file_id.to_string());
                    continue;
                }
                // duplicate ids from racing inserts are all retagged
                values.extend(std::iter::repeat(tag.to_string()).take(matches.len()));
                positions.extend(matches);
            }
            if !missing.is_empty() {
                tracing::warn!("Retag skipped unknown documents: {:?}", missing);
            }
            let updated = self
                .client
                .update(session, &docs, &positions, "_tag", &values)?;
            Ok(RetagReport { updated, missing })
        })
    }

    /// Deletes documents by file id; returns how many were removed.
    pub fn delete_documents(&self, session: &Session, file_ids: &[&str]) -> Result<usize> {
        let docs = TableKind::Documents.schema();
        self.client.locks().with_lock(session, &docs, || {
            let snapshot = self.client.try_fetch(session, &docs)?;
            let positions = snapshot.positions_matching("_fileId", file_ids);
            let report = self.client.delete(session, &docs, &positions)?;
            Ok(report.deleted.len())
        })
    }

    /// Records a batch of new documents under the documents lock.
    ///
    /// File ids are `<identity>-<random id>`, unique within the table.
    pub fn record_documents(&self, session: &Session, new_docs: &[NewDocument]) -> Result<Vec<DocumentRecord>> {
        let docs = TableKind::Documents.schema();
        self.client.locks().with_lock(session, &docs, || {
            let snapshot = self.client.try_fetch(session, &docs)?;
            let mut taken: HashSet<String> = snapshot
                .column_values("_fileId")
                .into_iter()
                .map(str::to_string)
                .collect();
            let generated_time = long_time(now());

            let mut recorded = Vec::with_capacity(new_docs.len());
            for doc in new_docs {
                let file_id = loop {
                    let candidate = format!("{}-{}", session.identity, random_id());
                    if !taken.contains(&candidate) {
                        break candidate;
                    }
                };
                taken.insert(file_id.clone());
                let record = DocumentRecord {
                    file_id,
                    file_name: doc.file_name.clone(),
                    summary: doc.summary.clone(),
                    generated_time: generated_time.clone(),
                    length: doc.summary.chars().count(),
                    tag: doc.tag.clone(),
                };
                if let Err(e) = self.client.insert_typed(session, &record) {
                    return Err(GridError::BatchInterrupted {
                        table: docs.name.clone(),
                        completed: recorded.len(),
                        source: Box::new(e),
                    });
                }
                recorded.push(record);
            }
            tracing::info!("Recorded {} documents in {}", recorded.len(), session.store);
            Ok(recorded)
        })
    }

    /// Appends one chat message. Takes no lock.
    pub fn append_chat(
        &self,
        session: &Session,
        file_id: &str,
        role: ChatRole,
        content: &str,
        model: Option<&str>,
    ) -> Result<ChatRecord> {
        let message = ChatRecord {
            file_id: file_id.to_string(),
            role,
            content: content.to_string(),
            model: model.unwrap_or(NO_MODEL).to_string(),
            time: chat_time(now()),
        };
        self.client.insert_typed(session, &message)?;
        Ok(message)
    }

    /// Looks up an account by user id or email.
    pub fn find_account(&self, directory: &Session, login: &str) -> Result<Option<AccountRecord>> {
        let accounts: Vec<AccountRecord> = self
            .client
            .try_fetch(directory, &TableKind::Account.schema())?
            .typed()?;
        Ok(accounts
            .into_iter()
            .find(|a| a.user_id == login || a.email == login))
    }

    /// Adds an account to the directory and prepares its data store.
    ///
    /// User id, email and data store must all be unused. The user store gets
    /// its tables and a default tag.
    pub fn register_account(&self, directory: &Session, account: NewAccount) -> Result<Registration> {
        for (field, value) in [
            ("username", &account.username),
            ("user id", &account.user_id),
            ("email", &account.email),
            ("password hash", &account.password_hash),
        ] {
            if value.trim().is_empty() {
                return Err(GridError::InvalidArgument(format!("{} is empty", field)));
            }
        }
        let user_store = StoreId::parse(&account.database_url)?;
        let user_identity = Identity::new(account.user_id.clone())?;
        let schema = TableKind::Account.schema();

        let record = self.client.locks().with_lock(directory, &schema, || {
            let snapshot = self.client.try_fetch(directory, &schema)?;
            for (column, value) in [
                ("_userId", &account.user_id),
                ("_email", &account.email),
                ("_dbURL", &account.database_url),
            ] {
                if snapshot.column_values(column).contains(&value.as_str()) {
                    return Err(GridError::DuplicateRecord {
                        table: schema.name.clone(),
                        key: value.clone(),
                    });
                }
            }
            let record = AccountRecord {
                username: account.username.clone(),
                user_id: account.user_id.clone(),
                email: account.email.clone(),
                password_hash: account.password_hash.clone(),
                register_time: long_time(now()),
                database_url: account.database_url.clone(),
            };
            self.client.insert_typed(directory, &record)?;
            Ok(record)
        })?;
        tracing::info!("Registered account {}", record.user_id);

        let user = Session::new(user_store, user_identity);
        let provision = self.provisioner.setup_user_store(&user, false)?;
        let default_tag = if self.tags(&user)?.iter().any(|t| t.tag == DEFAULT_TAG) {
            None
        } else {
            Some(self.add_tag(&user, DEFAULT_TAG)?)
        };

        Ok(Registration {
            account: record,
            provision,
            default_tag,
        })
    }

    /// Removes an account from the directory. The user's store is kept.
    ///
    /// Returns false when no account has that user id.
    pub fn deregister_account(&self, directory: &Session, user_id: &str) -> Result<bool> {
        let schema = TableKind::Account.schema();
        self.client.locks().with_lock(directory, &schema, || {
            let snapshot = self.client.try_fetch(directory, &schema)?;
            let positions = snapshot.positions_matching("_userId", &[user_id]);
            if positions.is_empty() {
                return Ok(false);
            }
            self.client.delete(directory, &schema, &positions)?;
            tracing::info!("Deregistered account {}", user_id);
            Ok(true)
        })
    }
}
