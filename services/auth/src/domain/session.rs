use uuid::Uuid;

use crate::domain::types::Session;

/// Short device label derived from a user-agent. First match wins.
pub fn device_label(user_agent: Option<&str>) -> String {
    let Some(ua) = user_agent.filter(|ua| !ua.trim().is_empty()) else {
        return "Unknown device".to_owned();
    };
    let label = if ua.contains("Postman") {
        "Postman"
    } else if ua.contains("Tablet") || ua.contains("iPad") {
        "Tablet"
    } else if ua.contains("Mobile") || ua.contains("Android") || ua.contains("iPhone") {
        "Mobile"
    } else if ua.contains("Windows") {
        "Windows PC"
    } else if ua.contains("Macintosh") || ua.contains("Mac OS") {
        "Mac"
    } else if ua.contains("Linux") {
        "Linux PC"
    } else {
        "Desktop"
    };
    label.to_owned()
}

/// Order sessions by creation, oldest first. Ties on the timestamp fall back
/// to the id, which is a UUIDv7 and so sorts by creation as well.
pub fn sort_oldest_first(sessions: &mut [Session]) {
    sessions.sort_by_key(|s| (s.created_at, s.id));
}

/// Sessions to deactivate before inserting one more, so at most `cap` stay
/// active. `active` must be ordered by creation, oldest first.
pub fn sessions_to_evict(active: &[Session], cap: usize) -> Vec<Uuid> {
    let cap = cap.max(1);
    if active.len() < cap {
        return Vec::new();
    }
    let excess = active.len() - cap + 1;
    active.iter().take(excess).map(|s| s.id).collect()
}
