//! Personal background agent that samples whether you are active, keeps the
//! signal in a local SQLite store, and turns it into a small RPG-style status:
//! level, experience and six work-related attributes. A CLI talks to the
//! long-running daemon over a unix socket; neither touches storage directly.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod notify;
pub mod rpc;
pub mod scoring;
pub mod storage;
pub mod utils;
