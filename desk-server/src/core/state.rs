use std::path::PathBuf;
use std::sync::Arc;

use crate::core::Config;
use crate::stays::StayManager;

/// Engine state: configuration plus the command engine singleton.
///
/// Cloning is shallow; every clone routes commands through the same
/// manager and the same database.
#[derive(Clone, Debug)]
pub struct EngineState {
    /// Engine configuration (immutable after startup).
    pub config: Config,
    /// Stay lifecycle and billing engine.
    pub manager: Arc<StayManager>,
}

impl EngineState {
    /// Initialize the engine from configuration.
    ///
    /// 1. Ensure the working directory exists
    /// 2. Open the database and start the manager
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        std::fs::create_dir_all(config.log_dir())?;

        let manager = StayManager::new(
            config.db_path(),
            config.policy,
            config.request_timeout_ms,
        )?;

        Ok(Self {
            config: config.clone(),
            manager: Arc::new(manager),
        })
    }

    /// Working directory holding the database and logs.
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }

    /// Shared handle to the stay engine.
    pub fn manager(&self) -> Arc<StayManager> {
        self.manager.clone()
    }
}
