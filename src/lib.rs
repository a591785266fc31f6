pub mod config;
pub mod ecs;
pub mod error;
pub mod telemetry;

pub use config::{Config, LoggingConfig, StoreConfig};
pub use ecs::{Component, Entity, EntityBuilder, EntityId, Record, Structural, Tag};
pub use error::{ConfigError, EcsError, Result};
