//! Admin utilities for a FIWARE Orion Context Broker.
//!
//! The heart of the crate is [`data_mgmt::BatchPacker`], which splits an
//! ordered list of entities into `op/update` requests that each stay under a
//! byte budget, and [`interfaces::FiwareClient`], which talks to Orion.

pub mod config;
pub mod constants;
pub mod data_mgmt;
pub mod helpers;
pub mod interfaces;
