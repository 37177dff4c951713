//! Domain Layer
//!
//! Ports the service depends on and the events it emits.
//!
//! - **Ports** (`ports.rs`) - persistence and audit abstractions
//! - **Events** (`events.rs`) - audit records of reconfigurations, transfers
//!   and layout commits
//!
//! # Usage
//!
//! ```ignore
//! use binspace::domain::{DomainEvent, EventPublisher, ZoneRepository};
//!
//! async fn restore<R: ZoneRepository>(repo: &R, zone: &ZoneId) -> Result<()> {
//!     if let Some(snapshot) = repo.load_zone(zone).await? {
//!         // ...
//!     }
//!     Ok(())
//! }
//! ```

pub mod events;
pub mod ports;

pub use events::DomainEvent;
pub use ports::{EventPublisher, ZoneId, ZoneRepository, ZoneSnapshot};
