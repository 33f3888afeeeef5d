//! sea-orm entities owned by the auth service.

pub mod outbox_events;
pub mod sessions;
pub mod tenants;
pub mod users;
