//! Integration tests for batch document generation

mod batch_scenarios;
mod config_integration;
mod request_tracking;
mod test_utils;
