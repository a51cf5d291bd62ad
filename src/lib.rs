//! Simplify: Stack Deployments with a Local Output Ledger
//!
//! Deploys infrastructure stacks one unit at a time, resolves each unit's
//! template parameters from earlier units' recorded outputs, and keeps those
//! outputs in a per-environment ledger file. Destroying units removes them
//! from the ledger only once the remote deletion is confirmed.

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod hooks;
pub mod ledger;
pub mod logging;
pub mod parameters;
pub mod provider;
pub mod reconcile;
pub mod resolver;
pub mod template;
pub mod unit;
