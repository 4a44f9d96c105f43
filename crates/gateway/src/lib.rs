//! The gateway crate: HTTP surface (C6), realtime channel (C5), and process
//! bootstrap. Wires the rest of the workspace's crates behind an `AppState`
//! and an axum router, grounded in the teacher's
//! `crates/gateway/src/{main.rs,state.rs,api/*}`.

pub mod api;
pub mod realtime;
pub mod state;

pub use state::AppState;
