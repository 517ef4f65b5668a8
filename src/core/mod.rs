//! Shared primitives: rendezvous, staging, store, configuration and the
//! ambient plumbing around them.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod rendezvous;
pub mod schemas;
pub mod shutdown;
pub mod staging;
pub mod store;
pub mod time;
pub mod worker;
