//! Pipeline configuration, injected explicitly at construction time.
//!
//! Process-wide defaults are supplied once at startup and treated as
//! immutable for the lifetime of the process.

#[derive(Debug, Clone)]
pub struct ScopeConfig {
    /// Page used when the `page` parameter is absent.
    pub default_page: u64,
    /// Page size used when the `per_page` parameter is absent.
    pub default_per_page: u64,
    /// Ceiling on the requested `per_page`; exceeding it is a validation error.
    pub max_per_page: u64,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_per_page: 12,
            max_per_page: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ScopeConfig::default();
        assert_eq!(cfg.default_page, 1);
        assert_eq!(cfg.default_per_page, 12);
        assert_eq!(cfg.max_per_page, 100);
    }
}
