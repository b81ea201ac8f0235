use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    config::{Config, load_config_from_file, save_config_to_file},
    task::TaskService,
};
use tokio::sync::RwLock;
use utils::assets::{config_path, ensure_asset_dir};

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<RwLock<Config>>,
    db: DBService,
    tasks: TaskService,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        ensure_asset_dir()?;
        let config = Self::load_runtime_config().await?;
        let db = DBService::new(&config.database_file).await?;

        Ok(Self::from_parts(config, db))
    }

    fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn tasks(&self) -> &TaskService {
        &self.tasks
    }
}

impl LocalDeployment {
    /// Assembles a deployment around an already opened database.
    pub fn from_parts(config: Config, db: DBService) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            db,
            tasks: TaskService::new(),
        }
    }

    // Rewrites the file so a first run leaves a complete, normalized config behind.
    async fn load_runtime_config() -> Result<Config, DeploymentError> {
        let path = config_path();
        let config = load_config_from_file(&path).await;
        save_config_to_file(&config, &path).await?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config.normalized())
    }
}

#[cfg(test)]
mod tests {
    use db::models::task::CreateTask;
    use utils::assets::ASSET_DIR_ENV;

    use super::*;

    #[tokio::test]
    async fn new_creates_config_and_database_in_asset_dir() {
        let temp = tempfile::tempdir().unwrap();
        let assets = temp.path().join("assets");

        // SAFETY: the only test in this crate, so nothing reads the env concurrently.
        unsafe {
            std::env::set_var(ASSET_DIR_ENV, &assets);
            std::env::remove_var(db::DATABASE_URL_ENV);
        }

        let deployment = LocalDeployment::new().await.unwrap();
        let task = deployment
            .tasks()
            .create_task(&deployment.db().pool, CreateTask::from_title("first"))
            .await
            .unwrap();

        assert_eq!(task.title, "first");
        assert!(assets.join("config.json").is_file());
        assert!(assets.join("db.sqlite").is_file());
        assert_eq!(deployment.config().read().await.database_file, "db.sqlite");

        unsafe {
            std::env::remove_var(ASSET_DIR_ENV);
        }
    }
}
