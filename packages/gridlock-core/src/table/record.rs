//! Untyped records and the typed per-table views built on them.

use std::fmt;
use std::str::FromStr;

use crate::error::{GridError, Result};
use crate::schema::TableKind;

/// One row as an ordered column-to-text mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Pairs `header` with `values`, padding missing cells with empty text.
    pub fn from_row(header: &[String], values: &[String]) -> Self {
        let fields = header
            .iter()
            .enumerate()
            .map(|(i, column)| (column.clone(), values.get(i).cloned().unwrap_or_default()))
            .collect();
        Self { fields }
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    /// Values reordered to match `columns`; absent columns become empty text.
    pub fn values_for(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .map(|c| self.get(c).unwrap_or_default().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Typed view over the records of one built-in table.
pub trait TableRecord: Sized {
    const KIND: TableKind;

    /// Validates and converts an untyped record.
    fn from_record(record: &Record) -> Result<Self>;

    /// Text values in schema column order.
    fn to_values(&self) -> Vec<String>;
}

fn text(record: &Record, kind: TableKind, column: &str) -> Result<String> {
    record
        .get(column)
        .map(str::to_string)
        .ok_or_else(|| GridError::InvalidRecord {
            table: kind.table_name().to_string(),
            reason: format!("missing column '{}'", column),
        })
}

/// Row of `user_docs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub file_id: String,
    pub file_name: String,
    pub summary: String,
    pub generated_time: String,
    /// Summary length in characters
    pub length: usize,
    pub tag: String,
}

impl TableRecord for DocumentRecord {
    const KIND: TableKind = TableKind::Documents;

    fn from_record(record: &Record) -> Result<Self> {
        let raw_length = text(record, Self::KIND, "_length")?;
        let length = if raw_length.trim().is_empty() {
            0
        } else {
            raw_length
                .trim()
                .parse()
                .map_err(|_| GridError::InvalidRecord {
                    table: Self::KIND.table_name().to_string(),
                    reason: format!("'_length' is not a number: '{}'", raw_length),
                })?
        };
        Ok(Self {
            file_id: text(record, Self::KIND, "_fileId")?,
            file_name: text(record, Self::KIND, "_fileName")?,
            summary: text(record, Self::KIND, "_summary")?,
            generated_time: text(record, Self::KIND, "_generatedTime")?,
            length,
            tag: text(record, Self::KIND, "_tag")?,
        })
    }

    fn to_values(&self) -> Vec<String> {
        vec![
            self.file_id.clone(),
            self.file_name.clone(),
            self.summary.clone(),
            self.generated_time.clone(),
            self.length.to_string(),
            self.tag.clone(),
        ]
    }
}

/// Row of `user_tags`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub tag_id: String,
    pub tag: String,
}

impl TableRecord for TagRecord {
    const KIND: TableKind = TableKind::Tags;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            tag_id: text(record, Self::KIND, "_tagId")?,
            tag: text(record, Self::KIND, "_tag")?,
        })
    }

    fn to_values(&self) -> Vec<String> {
        vec![self.tag_id.clone(), self.tag.clone()]
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => f.write_str("user"),
            ChatRole::Assistant => f.write_str("assistant"),
        }
    }
}

impl FromStr for ChatRole {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            other => Err(GridError::InvalidRecord {
                table: TableKind::ChatLog.table_name().to_string(),
                reason: format!("unknown role '{}'", other),
            }),
        }
    }
}

/// Row of `user_chats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub file_id: String,
    pub role: ChatRole,
    pub content: String,
    /// Model key, `-` for user messages
    pub model: String,
    pub time: String,
}

impl TableRecord for ChatRecord {
    const KIND: TableKind = TableKind::ChatLog;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            file_id: text(record, Self::KIND, "_fileId")?,
            role: text(record, Self::KIND, "_role")?.parse()?,
            content: text(record, Self::KIND, "_content")?,
            model: text(record, Self::KIND, "_model")?,
            time: text(record, Self::KIND, "_time")?,
        })
    }

    fn to_values(&self) -> Vec<String> {
        vec![
            self.file_id.clone(),
            self.role.to_string(),
            self.content.clone(),
            self.model.clone(),
            self.time.clone(),
        ]
    }
}

/// Row of `user_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub username: String,
    pub user_id: String,
    pub email: String,
    /// Output of the external credential hasher; never a plain password
    pub password_hash: String,
    pub register_time: String,
    /// Share link of the user's data store
    pub database_url: String,
}

impl TableRecord for AccountRecord {
    const KIND: TableKind = TableKind::Account;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            username: text(record, Self::KIND, "_username")?,
            user_id: text(record, Self::KIND, "_userId")?,
            email: text(record, Self::KIND, "_email")?,
            password_hash: text(record, Self::KIND, "_password")?,
            register_time: text(record, Self::KIND, "_registerTime")?,
            database_url: text(record, Self::KIND, "_dbURL")?,
        })
    }

    fn to_values(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.user_id.clone(),
            self.email.clone(),
            self.password_hash.clone(),
            self.register_time.clone(),
            self.database_url.clone(),
        ]
    }
}
