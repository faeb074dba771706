//! Client-side entity sync for the school attendance dashboard: a local cache
//! of classes and students kept consistent with an authoritative remote store.

pub mod config;
pub mod dashboard;
pub mod db;
pub mod ids;
pub mod ipc;
pub mod logging;
pub mod model;
pub mod remote;
pub mod resolve;
pub mod search;
pub mod stats;
pub mod store;
pub mod sync;
