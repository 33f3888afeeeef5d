//! Service plumbing shared by Shopdesk services: env config, tracing,
//! request ids, health probes and serde helpers.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
