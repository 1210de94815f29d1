//! Immutable per-request snapshot consumed by every pipeline stage.

use http::Method;

/// Requested action, named after the conventional REST handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Index,
    Show,
    Create,
    Update,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Index => "index",
            Action::Show => "show",
            Action::Create => "create",
            Action::Update => "update",
        }
    }
}

/// Ordered, duplicate-key-free query parameters.
///
/// Supply order is preserved: sort directives apply in the order the client
/// sent them, so this cannot be a plain map.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter; an existing key is overwritten in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (k, v) in pairs {
            params.insert(k, v);
        }
        params
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-request snapshot of everything the pipeline needs: query parameters,
/// HTTP method, action and the optional record id from the route or body.
///
/// Created once at request entry and never mutated. The principal travels
/// separately as `Option<&dyn Principal>` so the context stays `'static`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    action: Action,
    query: QueryParams,
    record_id: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: Method, action: Action, query: QueryParams) -> Self {
        Self {
            method,
            action,
            query,
            record_id: None,
        }
    }

    /// Attach the record id taken from the route or body parameters.
    #[must_use]
    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// Sorting only applies to reads.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.method == Method::GET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_preserve_supply_order() {
        let params =
            QueryParams::from_pairs([("b_sort", "asc"), ("a_sort", "desc"), ("page", "2")]);
        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b_sort", "a_sort", "page"]);
    }

    #[test]
    fn duplicate_key_overwrites_in_place() {
        let mut params = QueryParams::new();
        params.insert("page", "1");
        params.insert("per_page", "5");
        params.insert("page", "3");
        assert_eq!(params.get("page"), Some("3"));
        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["page", "per_page"]);
    }

    #[test]
    fn only_get_is_a_read() {
        let ctx = RequestContext::new(Method::GET, Action::Index, QueryParams::new());
        assert!(ctx.is_read());
        let ctx = RequestContext::new(Method::POST, Action::Create, QueryParams::new());
        assert!(!ctx.is_read());
    }
}
