//! Typed helpers for the PropDesk resources
//!
//! Thin wrappers over the generic verbs of [`ApiClient`](super::ApiClient):
//! they pick the endpoint, encode the body and decode the reply. Caching,
//! invalidation, retries and the refresh protocol all come from the verbs.

pub mod auth;
pub mod bookings;
pub mod housekeeping;
pub mod maintenance;
pub mod properties;
pub mod users;

/// `{base}/{id}` with the id percent-encoded
pub(crate) fn resource_path(base: &str, id: &str) -> String {
    format!("{base}/{}", urlencoding::encode(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_percent_encoded() {
        assert_eq!(resource_path("/properties", "p1"), "/properties/p1");
        assert_eq!(resource_path("/users", "a b/c"), "/users/a%20b%2Fc");
    }
}
