//! # Stagewire
//! Deterministic, constraint-ordered notification dispatch and replicated
//! hierarchical state machines for networked simulations.
//!
//! The crate has two coupled halves:
//! * the `dispatch` half discovers typed listeners within a containment scope
//!   and invokes them in an order computed from declarative constraints
//!   (run-first / run-last / run-before / run-after), with per-listener
//!   failure isolation;
//! * the `state` half drives a tree of states through enter/update/leave
//!   lifecycles on a single authoritative host, publishing change events that
//!   follower mirrors reduce into a read-only view.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod clock;
mod dispatch;
mod ordering;
mod state;
mod types;

pub use clock::{SimDuration, SimTime};
pub use dispatch::{
    dispatcher::{Dispatcher, DispatcherConfig, TransitionCommand, UnrankedPolicy},
    error::{DispatchReport, ListenerError, ListenerFault},
    listener::{Listener, ListenerKind, OrderingConstraints},
    payload::{Payload, PayloadKind},
    rank_cache::RankCache,
    registry::Scope,
};
pub use ordering::{constraint::ConstraintSet, error::SolveError, solver::solve};
pub use state::{
    error::MachineError,
    graph::{StateGraph, StateGraphBuilder, StateId},
    machine::{MachineConfig, StateMachine, StateSyncEvent},
    mirror::StateMirror,
    node::{EnterState, LeaveState, StateHook, UpdateState},
};
pub use types::Rank;
