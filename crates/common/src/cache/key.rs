//! Cache key construction

use url::form_urlencoded;

/// Build a cache key from an endpoint and its query parameters
///
/// Parameters are sorted by name (then value) so two calls with the same
/// parameter set map to the same key regardless of insertion order.
pub fn cache_key<I, K, V>(endpoint: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect();
    if pairs.is_empty() {
        return endpoint.to_string();
    }
    pairs.sort();

    let mut query = form_urlencoded::Serializer::new(String::new());
    for (k, v) in &pairs {
        query.append_pair(k, v);
    }
    format!("{endpoint}?{}", query.finish())
}

/// Coarse resource family of an endpoint: its first path segment
///
/// `/properties/42?x=1` -> `properties`. Returns an empty string for `/`.
pub fn resource_family(endpoint: &str) -> &str {
    let path = endpoint.split(['?', '#']).next().unwrap_or_default();
    path.trim_start_matches('/').split('/').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_sorted() {
        let a = cache_key("/properties", [("minPrice", "100"), ("location", "Aspen")]);
        let b = cache_key("/properties", [("location", "Aspen"), ("minPrice", "100")]);
        assert_eq!(a, b);
        assert_eq!(a, "/properties?location=Aspen&minPrice=100");
    }

    #[test]
    fn no_params_is_bare_endpoint() {
        assert_eq!(cache_key("/auth/me", Vec::<(String, String)>::new()), "/auth/me");
    }

    #[test]
    fn values_are_encoded() {
        let key = cache_key("/properties", [("location", "Miami Beach")]);
        assert_eq!(key, "/properties?location=Miami+Beach");
    }

    #[test]
    fn family_is_first_segment() {
        assert_eq!(resource_family("/properties"), "properties");
        assert_eq!(resource_family("/properties/42"), "properties");
        assert_eq!(resource_family("bookings/7/status"), "bookings");
        assert_eq!(resource_family("/maintenance?status=pending"), "maintenance");
        assert_eq!(resource_family("/"), "");
    }
}
