use crate::accounts;
use crate::config::{AppConfig, StorageKind};
use crate::db::Database;
use crate::storage::{DurableBlobStore, FsBlobStore, MemoryBlobStore, BROWSER_IMAGE_KEY, DB_FILE_NAME};
use crate::submissions::remote::RemoteClient;
use crate::submissions::service::SubmissionService;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub submissions: SubmissionService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (store, image_key): (Arc<dyn DurableBlobStore>, &str) = match config.storage {
            StorageKind::File => (Arc::new(FsBlobStore::new(config.data_dir.clone())), DB_FILE_NAME),
            StorageKind::Memory => (Arc::new(MemoryBlobStore::new()), BROWSER_IMAGE_KEY),
        };

        let db = Database::new(store, image_key);
        // A failed restore leaves the service up with reads degraded to
        // empty; writes will refuse until the schema exists.
        if let Err(e) = db.initialize().await {
            error!(error = %e, "database initialization failed, continuing without stored state");
        }
        if db.is_ready() {
            accounts::repo::bootstrap_owner(&db).await?;
        }

        let remote = match &config.remote_api_url {
            Some(url) => {
                let client = RemoteClient::new(url, config.http_timeout)?;
                if client.health().await {
                    info!(%url, "remote submissions api reachable");
                } else {
                    warn!(%url, "remote submissions api not responding, operations will fall back to local storage");
                }
                Some(client)
            }
            None => None,
        };

        let submissions = SubmissionService::new(db.clone(), remote);

        Ok(Self {
            db,
            submissions,
            config,
        })
    }

    #[cfg(test)]
    pub async fn fake() -> Self {
        use std::time::Duration;

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            data_dir: "data".into(),
            storage: StorageKind::Memory,
            remote_api_url: None,
            http_timeout: Duration::from_secs(2),
        });

        let db = Database::new(Arc::new(MemoryBlobStore::new()), BROWSER_IMAGE_KEY);
        db.initialize().await.expect("in-memory init");
        accounts::repo::bootstrap_owner(&db)
            .await
            .expect("owner bootstrap");

        let submissions = SubmissionService::new(db.clone(), None);
        Self {
            db,
            submissions,
            config,
        }
    }
}
