#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod generation;
pub mod library_service;
pub mod practice;

pub use memo_core::Clock;

pub use app_services::AppServices;
pub use config::ServicesConfig;
pub use error::{
    AppServicesError, ConfigError, GenerationError, LibraryError, PersistenceError, PracticeError,
};
pub use generation::GenerationClient;
pub use library_service::LibraryService;
pub use practice::{PracticePhase, PracticeSession, PracticeSnapshot};
