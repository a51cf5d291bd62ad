//! Integration tests for the simplify deployment engine

mod cleanup_flow;
mod config_integration;
mod deploy_flow;
mod ledger_store;
mod test_utils;
