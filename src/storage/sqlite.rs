use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    Pool, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteRow},
};
use sqlx::Row;
use teloxide::types::ChatId;

use crate::storage::{CatalogStorage, Price, Product, StorageError, StorageResult};

/// SQLite-backed [`CatalogStorage`].
pub struct SqliteCatalogStorage {
    pool: Pool<Sqlite>,
}

fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::DbError(e.to_string())
}

impl SqliteCatalogStorage {
    /// Open (creating if missing) the database at `database_url` and ensure
    /// the schema is in place.
    pub async fn new(database_url: &str) -> StorageResult<Self> {
        tracing::debug!("Connecting to SQLite database: {database_url}");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(db_err)?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.map_err(db_err)?;

        let storage = Self { pool };
        storage.ensure_schema().await?;
        tracing::debug!("SQLite schema ensured");

        Ok(storage)
    }

    /// Create tables, backfill columns added by later schema revisions, and
    /// create indexes. Safe to run repeatedly against an already-initialized
    /// database.
    pub(crate) async fn ensure_schema(&self) -> StorageResult<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                price REAL,
                url TEXT,
                code TEXT,
                createdAt TEXT,
                updatedAt TEXT,
                last_checked TEXT
            )",
            "CREATE TABLE IF NOT EXISTS subscribers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER UNIQUE
            )",
            "CREATE TABLE IF NOT EXISTS user_keywords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER,
                keyword TEXT,
                FOREIGN KEY(chat_id) REFERENCES subscribers(chat_id)
            )",
        ];
        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await.map_err(db_err)?;
        }

        // Databases created by earlier revisions predate these columns.
        self.add_column_if_missing("products", "code", "TEXT").await?;
        self.add_column_if_missing("products", "createdAt", "TEXT").await?;
        self.add_column_if_missing("products", "updatedAt", "TEXT").await?;
        self.add_column_if_missing("products", "last_checked", "TEXT").await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_products_code ON products(code)",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_user_keywords_chat_keyword \
             ON user_keywords(chat_id, keyword)",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn add_column_if_missing(
        &self,
        table: &str,
        column: &str,
        column_type: &str,
    ) -> StorageResult<()> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?",
        )
        .bind(table)
        .bind(column)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        if count == 0 {
            tracing::info!("Adding '{column}' column to '{table}' table");
            sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {column_type}"))
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }

        Ok(())
    }
}

fn product_from_row(row: &SqliteRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        name: row.try_get("name")?,
        price: Price { value: row.try_get("price")?, currency: String::new() },
        url: row.try_get("url")?,
        code: row.try_get("code")?,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

#[async_trait]
impl CatalogStorage for SqliteCatalogStorage {
    async fn insert_new_product(
        &self,
        code: &str,
        name: &str,
        price: f64,
        url: &str,
    ) -> StorageResult<()> {
        tracing::debug!("Inserting new product {code}: {name}");

        sqlx::query(
            "INSERT OR IGNORE INTO products (name, price, url, code, createdAt) \
             VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)",
        )
        .bind(name)
        .bind(price)
        .bind(url)
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn update_product_price(&self, code: &str, new_price: f64) -> StorageResult<()> {
        tracing::debug!("Updating price for product {code} to {new_price}");

        sqlx::query(
            "UPDATE products SET price = ?, updatedAt = CURRENT_TIMESTAMP WHERE code = ?",
        )
        .bind(new_price)
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_product_price(&self, code: &str) -> StorageResult<Option<f64>> {
        sqlx::query_scalar("SELECT price FROM products WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn list_products(&self) -> StorageResult<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT name, price, url, code, createdAt, updatedAt FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(|row| product_from_row(row).map_err(db_err)).collect()
    }

    async fn list_distinct_keywords(&self) -> StorageResult<Vec<String>> {
        sqlx::query_scalar("SELECT DISTINCT keyword FROM user_keywords")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn add_subscriber(&self, chat_id: ChatId) -> StorageResult<()> {
        tracing::debug!("Adding subscriber {chat_id}");

        sqlx::query("INSERT OR IGNORE INTO subscribers (chat_id) VALUES (?)")
            .bind(chat_id.0)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn subscribers_of_keyword(&self, keyword: &str) -> StorageResult<Vec<ChatId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT chat_id FROM user_keywords WHERE keyword = ?")
                .bind(keyword)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(ids.into_iter().map(ChatId).collect())
    }

    async fn add_keyword_subscription(
        &self,
        chat_id: ChatId,
        keyword: &str,
    ) -> StorageResult<bool> {
        tracing::debug!("Subscribing chat {chat_id} to keyword '{keyword}'");

        let result =
            sqlx::query("INSERT OR IGNORE INTO user_keywords (chat_id, keyword) VALUES (?, ?)")
                .bind(chat_id.0)
                .bind(keyword)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_keyword_subscription(
        &self,
        chat_id: ChatId,
        keyword: &str,
    ) -> StorageResult<bool> {
        tracing::debug!("Unsubscribing chat {chat_id} from keyword '{keyword}'");

        let result =
            sqlx::query("DELETE FROM user_keywords WHERE chat_id = ? AND keyword = ?")
                .bind(chat_id.0)
                .bind(keyword)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_keywords_for(&self, chat_id: ChatId) -> StorageResult<Vec<String>> {
        sqlx::query_scalar("SELECT keyword FROM user_keywords WHERE chat_id = ?")
            .bind(chat_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn count_distinct_keywords(&self) -> StorageResult<i64> {
        sqlx::query_scalar("SELECT COUNT(DISTINCT keyword) FROM user_keywords")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn count_products(&self) -> StorageResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn search_products_by_name(&self, substring: &str) -> StorageResult<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT name, price, url, code, createdAt, updatedAt FROM products \
             WHERE name LIKE ? ORDER BY id",
        )
        .bind(format!("%{substring}%"))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(|row| product_from_row(row).map_err(db_err)).collect()
    }

    async fn search_keywords(&self, substring: &str) -> StorageResult<Vec<String>> {
        sqlx::query_scalar("SELECT DISTINCT keyword FROM user_keywords WHERE keyword LIKE ?")
            .bind(format!("%{substring}%"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }
}
