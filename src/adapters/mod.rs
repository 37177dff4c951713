//! Infrastructure Adapters
//!
//! Adapter implementations for the domain ports.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │          ZoneRepository        │       EventPublisher      │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ FileZoneRepository │ InMemoryZoneRepository                │ │
//! │  │ LoggingEventPublisher │ InMemoryEventCollector │ Composite │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use binspace::adapters::{FileZoneRepository, LoggingEventPublisher};
//! use binspace::service::{ServiceConfig, ZoneService};
//!
//! let service = ZoneService::new(
//!     ServiceConfig::default(),
//!     Arc::new(FileZoneRepository::new("./state")),
//!     Arc::new(LoggingEventPublisher::info_level()),
//! );
//! ```

mod event_publisher;
mod repository;

pub use event_publisher::{CompositeEventPublisher, InMemoryEventCollector, LoggingEventPublisher};
pub use repository::{FileZoneRepository, InMemoryZoneRepository};
