//! # comtrack-db: Database Layer for ComTrack
//!
//! SQLite storage for entity types, entities and their monthly commission
//! transactions, plus the aggregation queries behind every dashboard figure.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ComTrack Data Flow                               │
//! │                                                                         │
//! │  AnalyticsService (apps/api)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   comtrack-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │ EntityTypeRepo     │  │ (embedded) │  │   │
//! │  │   │               │    │ EntityRepo         │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ TransactionRepo    │  │ 001_init   │  │   │
//! │  │   │               │    │ AnalyticsRepo      │  │            │  │   │
//! │  │   │               │    │  └ PeriodSumQuery  │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use comtrack_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./comtrack.db")).await?;
//! let partners = db.entities().list_with_type().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, DbLocation};

pub use repository::analytics::{AnalyticsRepository, PeriodSumQuery, PeriodSums};
pub use repository::entity::EntityRepository;
pub use repository::entity_type::EntityTypeRepository;
pub use repository::transaction::TransactionRepository;
