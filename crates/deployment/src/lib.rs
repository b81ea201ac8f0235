use std::sync::Arc;

use async_trait::async_trait;
use db::{DBService, DbErr};
use services::services::{
    config::{Config, ConfigError},
    task::TaskService,
};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything a request handler needs, bundled so the HTTP layer stays
/// agnostic of how the pieces were built.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Arc<RwLock<Config>>;

    fn db(&self) -> &DBService;

    fn tasks(&self) -> &TaskService;
}
