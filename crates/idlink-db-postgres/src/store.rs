//! PostgreSQL implementation of the ContactStore trait.

use async_trait::async_trait;
use sqlx_postgres::PgPool;

use idlink_core::{Contact, ContactId, NewContact};
use idlink_storage::{ContactStore, ContactTx, StorageError};

use crate::config::PostgresConfig;
use crate::migrations;
use crate::pool;
use crate::queries;
use crate::transaction::PostgresTx;

/// PostgreSQL contact store backend.
#[derive(Debug, Clone)]
pub struct PostgresContactStore {
    pool: PgPool,
}

impl PostgresContactStore {
    /// Creates a new `PostgresContactStore` with the given configuration.
    ///
    /// This will:
    /// 1. Create a connection pool and probe it
    /// 2. Run migrations (if configured)
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created, the
    /// probe query fails, or migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Creates a new `PostgresContactStore` from an existing connection pool.
    ///
    /// Migrations are not run automatically when using this constructor.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ContactStore for PostgresContactStore {
    async fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<Contact>, StorageError> {
        if email.is_none() && phone.is_none() {
            return Err(StorageError::invalid_contact(
                "lookup requires at least one of email or phone number",
            ));
        }
        queries::find_by_email_or_phone(&self.pool, email, phone).await
    }

    async fn find_by_ids(&self, ids: &[ContactId]) -> Result<Vec<Contact>, StorageError> {
        queries::find_by_ids(&self.pool, ids).await
    }

    async fn group_members(&self, primary_id: ContactId) -> Result<Vec<Contact>, StorageError> {
        queries::group_members(&self.pool, primary_id).await
    }

    async fn create(&self, new: &NewContact) -> Result<Contact, StorageError> {
        queries::insert(&self.pool, new).await
    }

    async fn begin(&self) -> Result<Box<dyn ContactTx>, StorageError> {
        let tx = self.pool.begin().await.map_err(|e| {
            StorageError::transaction_error(format!("Failed to begin transaction: {e}"))
        })?;
        Ok(Box::new(PostgresTx::new(tx)))
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
