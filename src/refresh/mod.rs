//! Refresh coordination.
//!
//! Keeps exactly one logical "current" snapshot in effect for the selected
//! `(symbol, expiry)` key while snapshots are replaced on a fixed cadence.
//!
//! ## Structure
//!
//! ```text
//! CoordinatorHandle ──commands──► RefreshCoordinator (one tokio task)
//!        ▲                            │  ├── interval timer
//!        │ watch<ChainStatus>         │  ├── RefreshState (state machine)
//!        └────────────────────────────┘  └── ChainSource::fetch (spawned)
//!                                     │
//!                                 EventBus ──► subscribers
//! ```
//!
//! ## Components
//!
//! - [`RefreshState`]: synchronous Idle/Fetching/Ready/Failed machine
//! - [`ChainSource`]: async collaborator supplying snapshots
//! - [`RefreshCoordinator`] / [`CoordinatorHandle`]: tokio driver and client
//! - [`EventBus`]: typed publish/subscribe for chain and cross-page signals

mod coordinator;
mod events;
mod source;
mod state;

pub use coordinator::{CoordinatorHandle, RefreshCoordinator};
pub use events::{ChainEvent, EventBus};
pub use source::ChainSource;
pub use state::{ChainStatus, Completion, FetchTicket, RefreshPhase, RefreshState, RefreshTrigger};
