//! Auth types shared across Shopdesk services.
//!
//! Provides access-token validation, cookie builders, and the `Identity` extractor.

pub mod cookie;
pub mod identity;
pub mod token;
