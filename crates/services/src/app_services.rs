use std::sync::Arc;

use storage::repository::{ProgressRepository, ProgressRow, Storage};

use crate::Clock;
use crate::config::ServicesConfig;
use crate::error::AppServicesError;
use crate::generation::GenerationClient;
use crate::library_service::LibraryService;
use crate::practice::{ChannelProgressSink, ProgressWriter};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    config: ServicesConfig,
    progress: Arc<dyn ProgressRepository>,
    library: Arc<LibraryService>,
    generation: Arc<GenerationClient>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: ServicesConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(storage, clock, config))
    }

    #[must_use]
    pub fn in_memory(clock: Clock, config: ServicesConfig) -> Self {
        Self::with_storage(Storage::in_memory(), clock, config)
    }

    #[must_use]
    pub fn with_storage(storage: Storage, clock: Clock, config: ServicesConfig) -> Self {
        let library = Arc::new(LibraryService::new(clock, Arc::clone(&storage.tracks)));
        let generation = Arc::new(GenerationClient::new(&config.settings));
        Self {
            clock,
            config,
            progress: storage.progress,
            library,
            generation,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn config(&self) -> &ServicesConfig {
        &self.config
    }

    #[must_use]
    pub fn library(&self) -> Arc<LibraryService> {
        Arc::clone(&self.library)
    }

    #[must_use]
    pub fn generation(&self) -> Arc<GenerationClient> {
        Arc::clone(&self.generation)
    }

    /// A sink for practice sessions and the writer task that drains it.
    #[must_use]
    pub fn progress_writer(&self) -> (ChannelProgressSink, ProgressWriter) {
        let remote = self
            .generation
            .enabled()
            .then(|| GenerationClient::clone(&self.generation));
        ProgressWriter::channel(Arc::clone(&self.progress), remote)
    }

    /// Most recently practiced sessions first.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if repository access fails.
    pub async fn recent_progress(&self, limit: u32) -> Result<Vec<ProgressRow>, AppServicesError> {
        Ok(self.progress.list_progress(limit).await?)
    }
}
