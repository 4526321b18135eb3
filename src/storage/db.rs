use redb::{Database as RedbDatabase, ReadTransaction, ReadableTable, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use chrono::{DateTime, Utc};

use super::models::{TokenRecord, UserRecord};
use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Redb(#[from] redb::Error),
    #[error("Database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
}

#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("prismd-auth.redb");
        let db = RedbDatabase::create(db_path)?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            // Create tables if they don't exist
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(TOKENS)?;
            let _ = write_txn.open_table(TOKEN_IDS)?;
            let _ = write_txn.open_table(USER_TOKENS)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    // ========================================================================
    // User operations
    // ========================================================================

    /// Store a user record, replacing any prior credential material
    pub fn put_user(&self, user: &UserRecord) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            let data = bincode::serialize(user)?;
            table.insert(user.user.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a user record by username
    pub fn get_user(&self, user: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(user)? {
            Some(data) => {
                let record: UserRecord = bincode::deserialize(data.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    // ========================================================================
    // Token operations
    // ========================================================================

    /// Store a token record
    pub fn put_token(&self, token: &TokenRecord) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(TOKENS)?;
            let data = bincode::serialize(token)?;
            table.insert(token.id.as_str(), data.as_slice())?;

            // Update token_ids index
            let mut secret_index = write_txn.open_table(TOKEN_IDS)?;
            secret_index.insert(token.token.as_str(), token.id.as_str())?;

            // Update user_tokens index
            let mut user_index = write_txn.open_table(USER_TOKENS)?;
            let mut token_ids: Vec<String> = user_index
                .get(token.user.as_str())?
                .map(|v| bincode::deserialize(v.value()).unwrap_or_default())
                .unwrap_or_default();

            if !token_ids.contains(&token.id) {
                token_ids.push(token.id.clone());
                let index_data = bincode::serialize(&token_ids)?;
                user_index.insert(token.user.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a token record by ID
    pub fn get_token(&self, token_id: &str) -> Result<Option<TokenRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(TOKENS)?;

        match table.get(token_id)? {
            Some(data) => {
                let record: TokenRecord = bincode::deserialize(data.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Get a token record by its secret value
    pub fn get_token_by_secret(&self, secret: &str) -> Result<Option<TokenRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let secret_index = read_txn.open_table(TOKEN_IDS)?;

        let token_id: String = match secret_index.get(secret)? {
            Some(id) => id.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(TOKENS)?;
        match table.get(token_id.as_str())? {
            Some(data) => {
                let record: TokenRecord = bincode::deserialize(data.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Delete a token record by ID
    pub fn delete_token(&self, token_id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        // First, get the record for index cleanup
        let record: Option<TokenRecord> = {
            let table = write_txn.open_table(TOKENS)?;
            let result = table.get(token_id)?;
            match result {
                Some(data) => Some(bincode::deserialize(data.value())?),
                None => None,
            }
        };

        let deleted = match record {
            Some(record) => {
                // Remove from tokens table
                {
                    let mut table = write_txn.open_table(TOKENS)?;
                    table.remove(token_id)?;
                }

                // Update token_ids index
                {
                    let mut secret_index = write_txn.open_table(TOKEN_IDS)?;
                    secret_index.remove(record.token.as_str())?;
                }

                // Update user_tokens index
                let token_ids: Option<Vec<String>> = {
                    let user_index = write_txn.open_table(USER_TOKENS)?;
                    let result = user_index.get(record.user.as_str())?;
                    match result {
                        Some(data) => Some(bincode::deserialize(data.value())?),
                        None => None,
                    }
                };

                if let Some(mut ids) = token_ids {
                    ids.retain(|id| id != token_id);
                    let mut user_index = write_txn.open_table(USER_TOKENS)?;
                    if ids.is_empty() {
                        user_index.remove(record.user.as_str())?;
                    } else {
                        let new_index_data = bincode::serialize(&ids)?;
                        user_index.insert(record.user.as_str(), new_index_data.as_slice())?;
                    }
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Get all tokens owned by a user
    pub fn get_tokens_by_user(&self, user: &str) -> Result<Vec<TokenRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let user_index = read_txn.open_table(USER_TOKENS)?;
        let tokens_table = read_txn.open_table(TOKENS)?;

        let token_ids: Vec<String> = match user_index.get(user)? {
            Some(data) => bincode::deserialize(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut tokens = Vec::new();
        for token_id in token_ids {
            if let Some(data) = tokens_table.get(token_id.as_str())? {
                let record: TokenRecord = bincode::deserialize(data.value())?;
                tokens.push(record);
            }
        }

        Ok(tokens)
    }

    /// Get all token records
    pub fn get_all_tokens(&self) -> Result<Vec<TokenRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(TOKENS)?;

        let mut tokens = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let record: TokenRecord = bincode::deserialize(value.value())?;
            tokens.push(record);
        }

        Ok(tokens)
    }

    /// Update a token's last_use timestamp
    pub fn touch_token(&self, token_id: &str, now: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let record: Option<TokenRecord> = {
            let table = write_txn.open_table(TOKENS)?;
            let result = table.get(token_id)?;
            match result {
                Some(data) => Some(bincode::deserialize(data.value())?),
                None => None,
            }
        };

        let touched = match record {
            Some(mut record) => {
                record.last_use = now;
                let mut table = write_txn.open_table(TOKENS)?;
                let data = bincode::serialize(&record)?;
                table.insert(token_id, data.as_slice())?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(touched)
    }

    // ========================================================================
    // Meta operations
    // ========================================================================

    /// Get the persisted installation identifier
    pub fn get_installation_id(&self) -> Result<Option<String>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(META)?;

        match table.get("installation_id")? {
            Some(data) => {
                let id: String = bincode::deserialize(data.value())?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Persist the installation identifier
    pub fn put_installation_id(&self, id: &str) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(META)?;
            let data = bincode::serialize(&id.to_string())?;
            table.insert("installation_id", data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
