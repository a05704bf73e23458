//! Application state - shared across all handlers.

use std::sync::Arc;

use miniblog_core::domain::User;
use miniblog_core::ports::{
    BaseRepository, Cache, CommentRepository, PasswordService, PostRepository, UserRepository,
};
use miniblog_infra::InMemoryCache;
use miniblog_infra::database::{DatabaseConfig, MemoryStore};

#[cfg(feature = "postgres")]
use miniblog_infra::database::{
    DatabaseConnections, PostgresCommentRepository, PostgresPostRepository,
    PostgresUserRepository,
};

use crate::config::AdminAccount;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn Cache>,
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl AppState {
    /// State backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        let store = MemoryStore::new();
        Self {
            cache: Arc::new(InMemoryCache::new()),
            users: Arc::new(store.users()),
            posts: Arc::new(store.posts()),
            comments: Arc::new(store.comments()),
        }
    }

    /// Build the application state with appropriate implementations.
    pub async fn new(db_config: Option<&DatabaseConfig>) -> anyhow::Result<Self> {
        let Some(config) = db_config else {
            tracing::warn!("DATABASE_URL not set. Running with the in-memory store.");
            return Ok(Self::in_memory());
        };

        #[cfg(feature = "postgres")]
        {
            let connections = DatabaseConnections::init(config).await?;
            let db = connections.main;

            tracing::info!("Application state initialized (postgres)");

            Ok(Self {
                cache: Arc::new(InMemoryCache::new()),
                users: Arc::new(PostgresUserRepository::new(db.clone())),
                posts: Arc::new(PostgresPostRepository::new(db.clone())),
                comments: Arc::new(PostgresCommentRepository::new(db)),
            })
        }

        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                url_configured = !config.url.is_empty(),
                "Built without the postgres feature. Ignoring DATABASE_URL and using the in-memory store."
            );
            Ok(Self::in_memory())
        }
    }

    /// Create the configured staff account unless the username is taken.
    pub async fn ensure_admin(
        &self,
        account: &AdminAccount,
        passwords: &dyn PasswordService,
    ) -> anyhow::Result<()> {
        if self.users.find_by_username(&account.username).await?.is_some() {
            tracing::debug!(username = %account.username, "Admin account already present");
            return Ok(());
        }

        let hash = passwords.hash(&account.password)?;
        let admin = User::new(account.username.clone(), account.email.clone(), hash).with_staff();
        let admin = self.users.create(admin).await?;

        tracing::info!(user_id = %admin.id, username = %admin.username, "Admin account created");
        Ok(())
    }
}
