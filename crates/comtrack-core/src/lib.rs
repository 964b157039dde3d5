//! # comtrack-core: Pure Domain Logic for ComTrack
//!
//! Commission amounts, financial-year-aware period boundaries and the
//! period-over-period statistics built on top of them. Nothing in this
//! crate touches a database, the network or the wall clock: the reference
//! date is always passed in.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ComTrack Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    /api/performance, /api/analytics/*, stats cache             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ comtrack-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │  period   │  │   stats   │  │ validation│  │   │
//! │  │   │   Money   │  │ DateRange │  │ pct_change│  │   rules   │  │   │
//! │  │   │  (paise)  │  │ Windows   │  │ PeriodSts │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    comtrack-db (Database Layer)                 │   │
//! │  │        SQLite, migrations, repositories, conditional sums       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Fixed-point `Money` in paise (no floating point sums)
//! - [`period`] - Month / quarter / financial-year boundaries
//! - [`stats`] - Percentage change and result assembly
//! - [`types`] - Domain records and read models
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use comtrack_core::period::{PeriodKind, PeriodWindows};
//!
//! let reference = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
//! let windows = PeriodWindows::for_date(PeriodKind::Year, reference);
//!
//! // March belongs to the financial year that started the previous April
//! assert_eq!(windows.current.start, NaiveDate::from_ymd_opt(2023, 4, 1).unwrap());
//! assert_eq!(windows.current.end, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod period;
pub mod stats;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use period::{DateRange, PeriodKind, PeriodWindows};
pub use stats::{pct_change, CommissionOverview, PeriodStats, PeriodTotals, TypeBreakdown};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Calendar month in which the financial year starts (April).
pub const FINANCIAL_YEAR_START_MONTH: u32 = 4;

/// Earliest and latest year accepted for reference dates and months.
/// Period windows reach a year back, so this keeps them inside chrono's range.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// Maximum length of an entity or entity type name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Number of rows returned by the "recent transactions" queries.
pub const RECENT_TRANSACTION_LIMIT: u32 = 10;

/// Number of partners shown in the top-partners ranking.
pub const TOP_PARTNER_LIMIT: u32 = 5;

/// Number of months covered by the monthly commission trend.
pub const TREND_MONTHS: u32 = 12;
