use std::sync::Arc;

use wedflex_hosted::HostedClient;

use crate::auth::jwt::JwtConfig;
use crate::auth::mailer::{Mailer, Outbox, SmtpMailer};
use crate::config::{BackendConfig, ServerConfig};
use crate::drafts::DraftStore;
use crate::services::identity::{
    CredentialLedger, HostedIdentity, IdentityProvider, LocalIdentity, MemoryLedger, PgLedger,
};
use crate::services::object_storage::{HostedStorage, LocalStorage, ObjectStorage};
use crate::services::offer_store::{HostedOfferStore, MemoryOfferStore, OfferStore, PgOfferStore};

/// Errors that stop the service from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Config(String),
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// The single identity provider every extractor resolves through.
    pub identity: Arc<dyn IdentityProvider>,
    pub offers: Arc<dyn OfferStore>,
    pub storage: Arc<dyn ObjectStorage>,
    /// In-progress offer wizards.
    pub drafts: Arc<DraftStore>,
    /// Sign-in links recorded instead of emailed when SMTP is not configured.
    pub outbox: Option<Arc<Outbox>>,
}

impl AppState {
    /// Build every collaborator for the configured backend.
    ///
    /// Postgres mode connects, checks and migrates the database before
    /// returning.
    pub async fn initialise(config: ServerConfig) -> Result<Self, StartupError> {
        let drafts = Arc::new(DraftStore::new());

        let state = match &config.backend {
            BackendConfig::Memory => {
                let (mailer, outbox) = build_mailer(&config);
                let ledger: Arc<dyn CredentialLedger> = Arc::new(MemoryLedger::new());
                Self {
                    identity: Arc::new(LocalIdentity::new(ledger, mailer, require_jwt(&config)?)),
                    offers: Arc::new(MemoryOfferStore::new()),
                    storage: local_storage(&config),
                    drafts,
                    outbox,
                    config: Arc::new(config),
                }
            }
            BackendConfig::Postgres { database_url } => {
                let pool = wedflex_db::create_pool(database_url).await?;
                tracing::info!("Database connection pool created");

                wedflex_db::health_check(&pool).await?;
                wedflex_db::run_migrations(&pool).await?;
                tracing::info!("Database migrations applied");

                let (mailer, outbox) = build_mailer(&config);
                let ledger: Arc<dyn CredentialLedger> = Arc::new(PgLedger::new(pool.clone()));
                Self {
                    identity: Arc::new(LocalIdentity::new(ledger, mailer, require_jwt(&config)?)),
                    offers: Arc::new(PgOfferStore::new(pool)),
                    storage: local_storage(&config),
                    drafts,
                    outbox,
                    config: Arc::new(config),
                }
            }
            BackendConfig::Hosted { url, anon_key } => {
                let client = HostedClient::new(url.as_str(), anon_key);
                tracing::info!(backend_url = %client.base_url(), "Hosted backend client created");
                Self {
                    identity: Arc::new(HostedIdentity::new(client.clone())),
                    offers: Arc::new(HostedOfferStore::new(client.clone())),
                    storage: Arc::new(HostedStorage::new(client)),
                    drafts,
                    outbox: None,
                    config: Arc::new(config),
                }
            }
        };

        tracing::info!(
            backend = state.config.backend.mode(),
            identity = state.identity.name(),
            offers = state.offers.name(),
            "Collaborators initialised"
        );
        Ok(state)
    }
}

fn require_jwt(config: &ServerConfig) -> Result<JwtConfig, StartupError> {
    config
        .jwt
        .clone()
        .ok_or_else(|| StartupError::Config("JWT_SECRET must be set".into()))
}

/// SMTP when configured, otherwise an outbox the caller can inspect.
fn build_mailer(config: &ServerConfig) -> (Arc<dyn Mailer>, Option<Arc<Outbox>>) {
    match &config.email {
        Some(email) => {
            tracing::info!(smtp_host = %email.smtp_host, "SMTP delivery enabled");
            let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(email.clone()));
            (mailer, None)
        }
        None => {
            tracing::warn!("SMTP_HOST not set; sign-in links go to the outbox");
            let outbox = Arc::new(Outbox::new());
            let mailer: Arc<dyn Mailer> = outbox.clone();
            (mailer, Some(outbox))
        }
    }
}

fn local_storage(config: &ServerConfig) -> Arc<dyn ObjectStorage> {
    Arc::new(LocalStorage::new(
        config.upload_dir.clone(),
        config.public_origin.clone(),
    ))
}
