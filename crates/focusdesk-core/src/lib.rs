//! # Focusdesk Core Library
//!
//! Core logic for the Focusdesk focus timer: a per-user Pomodoro clock that
//! alternates focus and break phases, credits finished focus phases to a
//! daily goal and running statistics, and persists everything through a
//! pluggable store. The `focusdesk` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: a tick-driven state machine with no thread of its own
//! - **Stats**: daily goal and productivity aggregation, idempotent per phase
//! - **Tracker**: one user's clock, goal and stats, turning commands into
//!   ordered units of work
//! - **Runtime**: tokio driver ticking at 1 Hz with a serialized store writer
//! - **Storage**: `SessionStore` trait with SQLite and in-memory backends,
//!   plus TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionClock`]: countdown and phase state machine
//! - [`FocusTracker`]: clock plus goal/stats bookkeeping
//! - [`ClockDriver`]: live ticking and write-behind persistence
//! - [`Database`]: SQLite store
//! - [`Config`]: application configuration

pub mod display;
pub mod error;
pub mod events;
pub mod runtime;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;
pub mod tracker;

pub use error::{ConfigError, CoreError, PersistenceError, Result, ValidationError};
pub use events::{Event, PhaseNotifier};
pub use runtime::ClockDriver;
pub use stats::{DailyGoal, ProductivityStats};
pub use storage::{Config, Database, MemoryStore, SessionStore, TaskStore, UnitOfWork, Write};
pub use task::{Task, TaskStatus};
pub use timer::{ClockState, FocusSession, Phase, SessionClock, TickOutcome, TimerSettings};
pub use tracker::{FocusTracker, TrackerOptions, Transition};
