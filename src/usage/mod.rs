//! Token-usage quota panel: data refresh and derived display values.
//!
//! # Architecture
//!
//! ```text
//! PipelineOrchestrator ──usage trigger (watch<u64>)──▶ UsageMonitor::run()
//!                                                         │ refresh()
//!                                                         ▼
//!                                  SharedUsage (Arc<Mutex<UsageState>>)
//!                                                         │
//!                               egui update() ◀───────────┘  UsageDisplay::from_snapshot
//! ```
//!
//! Failures are logged and otherwise swallowed: the panel keeps showing the
//! last good snapshot.

pub mod display;
pub mod monitor;

pub use display::{remaining_today, usage_percent, UsageBand, UsageDisplay};
pub use monitor::{new_shared_usage, SharedUsage, UsageMonitor, UsageState};
