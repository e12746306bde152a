//! # MySQL Archive Table
//!
//! ## Tables
//!
//! - `archive_cursor` - single row holding the archived height
//! - `block_info_N` - block rows, `shard_size` heights per table
//! - `block_index` - block hash to height
//! - `tx_index` - transaction id to height
//!
//! ## Locking
//!
//! Writers serialize on a MySQL named lock. Named locks belong to a session,
//! so the lock is taken and released on one dedicated pooled connection.

use super::{ArchiveTable, BlockRow};
use crate::config::{database_name, SqlArchiveConfig};
use crate::domain::{shard_index, shard_table, ArchiveError, WriteAction};
use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::{MySql, Row};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const CURSOR_TABLE: &str = "archive_cursor";
const BLOCK_INDEX_TABLE: &str = "block_index";
const TX_INDEX_TABLE: &str = "tx_index";

const MAX_CONNECTIONS: u32 = 5;

pub struct MySqlArchiveTable {
    pool: MySqlPool,
    shard_size: u64,
    lock_name: String,
    lock_conn: tokio::sync::Mutex<Option<PoolConnection<MySql>>>,
    shards: Mutex<HashSet<u64>>,
}

impl MySqlArchiveTable {
    /// Connect, creating the chain database and fixed tables if missing.
    pub async fn connect(config: &SqlArchiveConfig, chain_id: &str) -> Result<Self, ArchiveError> {
        if config.kind != "mysql" {
            return Err(ArchiveError::Config(format!(
                "unsupported archive type {:?}",
                config.kind
            )));
        }
        let url = config
            .mysql_url(chain_id)
            .ok_or_else(|| ArchiveError::Config("archive.dest is malformed".to_string()))?;

        if let Some(server) = config.server_url() {
            let admin = MySqlPoolOptions::new()
                .max_connections(1)
                .connect(&server)
                .await?;
            sqlx::query(&format!(
                "CREATE DATABASE IF NOT EXISTS `{}`",
                database_name(chain_id)
            ))
            .execute(&admin)
            .await?;
            admin.close().await;
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(&url)
            .await?;
        let table = Self {
            pool,
            shard_size: config.shard_size.max(1),
            lock_name: format!(
                "lc04_{}",
                &hex::encode(shared_crypto::sha256(chain_id.as_bytes()))[..32]
            ),
            lock_conn: tokio::sync::Mutex::new(None),
            shards: Mutex::new(HashSet::new()),
        };
        table.create_fixed_tables().await?;
        info!("[lc-04] Connected SQL archive for chain {}", chain_id);
        Ok(table)
    }

    async fn create_fixed_tables(&self) -> Result<(), ArchiveError> {
        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 id TINYINT PRIMARY KEY, \
                 archived_height BIGINT UNSIGNED NOT NULL)",
                CURSOR_TABLE
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 block_hash VARCHAR(128) PRIMARY KEY, \
                 height BIGINT UNSIGNED NOT NULL)",
                BLOCK_INDEX_TABLE
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 tx_id VARCHAR(128) PRIMARY KEY, \
                 height BIGINT UNSIGNED NOT NULL)",
                TX_INDEX_TABLE
            ),
        ];
        for statement in &statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Shard table for `height`, created on first use.
    async fn shard(&self, height: u64) -> Result<String, ArchiveError> {
        let index = shard_index(height, self.shard_size);
        let table = shard_table(height, self.shard_size);
        if self.shards.lock().contains(&index) {
            return Ok(table);
        }
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             height BIGINT UNSIGNED PRIMARY KEY, \
             block_hash VARCHAR(128) NOT NULL, \
             payload LONGBLOB NOT NULL, \
             hmac CHAR(64) NOT NULL, \
             is_archived TINYINT(1) NOT NULL DEFAULT 0)",
            table
        ))
        .execute(&self.pool)
        .await?;
        debug!("[lc-04] Shard table {} ready", table);
        self.shards.lock().insert(index);
        Ok(table)
    }
}

#[async_trait]
impl ArchiveTable for MySqlArchiveTable {
    async fn lock(&self) -> Result<bool, ArchiveError> {
        let mut held = self.lock_conn.lock().await;
        if held.is_some() {
            return Ok(false);
        }
        let mut conn = self.pool.acquire().await?;
        let acquired: Option<i64> = sqlx::query_scalar("SELECT GET_LOCK(?, 0)")
            .bind(&self.lock_name)
            .fetch_one(&mut *conn)
            .await?;
        if acquired == Some(1) {
            *held = Some(conn);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn unlock(&self) -> Result<(), ArchiveError> {
        let mut held = self.lock_conn.lock().await;
        if let Some(mut conn) = held.take() {
            let released: Option<i64> = sqlx::query_scalar("SELECT RELEASE_LOCK(?)")
                .bind(&self.lock_name)
                .fetch_one(&mut *conn)
                .await?;
            if released != Some(1) {
                warn!("[lc-04] Archive lock {} was not held", self.lock_name);
            }
        }
        Ok(())
    }

    async fn is_locked(&self) -> Result<bool, ArchiveError> {
        let free: Option<i64> = sqlx::query_scalar("SELECT IS_FREE_LOCK(?)")
            .bind(&self.lock_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(free == Some(0))
    }

    async fn cursor(&self) -> Result<Option<u64>, ArchiveError> {
        let height: Option<u64> = sqlx::query_scalar(&format!(
            "SELECT archived_height FROM {} WHERE id = 1",
            CURSOR_TABLE
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(height)
    }

    async fn row_state(&self, height: u64) -> Result<Option<bool>, ArchiveError> {
        let table = self.shard(height).await?;
        let archived: Option<bool> = sqlx::query_scalar(&format!(
            "SELECT is_archived FROM {} WHERE height = ?",
            table
        ))
        .bind(height)
        .fetch_optional(&self.pool)
        .await?;
        Ok(archived)
    }

    async fn apply(&self, row: &BlockRow, action: WriteAction) -> Result<(), ArchiveError> {
        let table = self.shard(row.height).await?;
        match action {
            WriteAction::Skip => Ok(()),
            WriteAction::MarkArchived => {
                sqlx::query(&format!(
                    "UPDATE {} SET is_archived = 1 WHERE height = ?",
                    table
                ))
                .bind(row.height)
                .execute(&self.pool)
                .await?;
                Ok(())
            }
            WriteAction::Insert => {
                let mut tx = self.pool.begin().await?;
                sqlx::query(&format!(
                    "INSERT INTO {} (height, block_hash, payload, hmac, is_archived) \
                     VALUES (?, ?, ?, ?, 1)",
                    table
                ))
                .bind(row.height)
                .bind(&row.block_hash)
                .bind(&row.payload)
                .bind(&row.hmac)
                .execute(&mut *tx)
                .await?;
                sqlx::query(&format!(
                    "INSERT IGNORE INTO {} (block_hash, height) VALUES (?, ?)",
                    BLOCK_INDEX_TABLE
                ))
                .bind(&row.block_hash)
                .bind(row.height)
                .execute(&mut *tx)
                .await?;
                for tx_id in &row.tx_ids {
                    sqlx::query(&format!(
                        "INSERT IGNORE INTO {} (tx_id, height) VALUES (?, ?)",
                        TX_INDEX_TABLE
                    ))
                    .bind(tx_id)
                    .bind(row.height)
                    .execute(&mut *tx)
                    .await?;
                }
                sqlx::query(&format!(
                    "INSERT INTO {} (id, archived_height) VALUES (1, ?) \
                     ON DUPLICATE KEY UPDATE \
                     archived_height = GREATEST(archived_height, VALUES(archived_height))",
                    CURSOR_TABLE
                ))
                .bind(row.height)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
                Ok(())
            }
        }
    }

    /// `tx_ids` is left empty; the index tables answer id lookups.
    async fn read(&self, height: u64) -> Result<Option<BlockRow>, ArchiveError> {
        let table = self.shard(height).await?;
        let row = sqlx::query(&format!(
            "SELECT height, block_hash, payload, hmac, is_archived FROM {} WHERE height = ?",
            table
        ))
        .bind(height)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(BlockRow {
            height: row.try_get("height")?,
            block_hash: row.try_get("block_hash")?,
            tx_ids: Vec::new(),
            payload: row.try_get("payload")?,
            hmac: row.try_get("hmac")?,
            archived: row.try_get("is_archived")?,
        }))
    }

    async fn height_by_hash(&self, block_hash: &str) -> Result<Option<u64>, ArchiveError> {
        let height: Option<u64> = sqlx::query_scalar(&format!(
            "SELECT height FROM {} WHERE block_hash = ?",
            BLOCK_INDEX_TABLE
        ))
        .bind(block_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(height)
    }

    async fn height_by_tx_id(&self, tx_id: &str) -> Result<Option<u64>, ArchiveError> {
        let height: Option<u64> = sqlx::query_scalar(&format!(
            "SELECT height FROM {} WHERE tx_id = ?",
            TX_INDEX_TABLE
        ))
        .bind(tx_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(height)
    }

    async fn close(&self) -> Result<(), ArchiveError> {
        self.unlock().await?;
        self.pool.close().await;
        Ok(())
    }
}
