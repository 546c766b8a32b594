//! Route composition
//!
//! ```text
//! [corsProxy + base without scheme | base] + prefix
//!     + "/" + endpoint(type)      (appendBlockType)
//!     + routeSuffix               (schema)
//!     + "/" + pathId              (root request only)
//!     + "?" + query
//! ```

use crate::config::ForgeConfig;
use forge_schema::SchemaRegistry;

/// Builds request URLs from config and schema metadata
#[derive(Debug, Clone, Copy)]
pub struct RouteComposer<'a> {
    config: &'a ForgeConfig,
    registry: &'a SchemaRegistry,
}

impl<'a> RouteComposer<'a> {
    /// Create composer
    #[inline]
    #[must_use]
    pub fn new(config: &'a ForgeConfig, registry: &'a SchemaRegistry) -> Self {
        Self { config, registry }
    }

    /// Base URL, behind the CORS proxy when one is set
    #[must_use]
    pub fn base(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.cors_proxy.as_deref().filter(|p| !p.is_empty()) {
            Some(proxy) => {
                let bare = base
                    .strip_prefix("https://")
                    .or_else(|| base.strip_prefix("http://"))
                    .unwrap_or(base);
                format!("{proxy}{bare}")
            }
            None => base.to_string(),
        }
    }

    /// Route for a request of `type_name` under `prefix`, without query
    #[must_use]
    pub fn route(&self, type_name: &str, prefix: &str, with_path_id: bool) -> String {
        let mut route = self.base();
        route.push_str(prefix);

        if self.config.append_block_type {
            route.push('/');
            route.push_str(self.registry.resolve_endpoint(type_name));
        }
        if let Some(suffix) = self.registry.route_suffix(type_name) {
            route.push_str(suffix);
        }
        if with_path_id {
            if let Some(id) = self.config.path_id.as_deref().filter(|id| !id.is_empty()) {
                route.push('/');
                route.push_str(id);
            }
        }
        route
    }

    /// Route with the configured query parameters appended
    #[must_use]
    pub fn compose(&self, type_name: &str, prefix: &str, with_path_id: bool) -> String {
        self.with_query(self.route(type_name, prefix, with_path_id))
    }

    /// Append configured query parameters, skipping empty keys or values
    #[must_use]
    pub fn with_query(&self, mut route: String) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        for (key, value) in &self.config.query_params {
            if !key.is_empty() && !value.is_empty() {
                query.append_pair(key, value);
                any = true;
            }
        }
        if any {
            route.push(if route.contains('?') { '&' } else { '?' });
            route.push_str(&query.finish());
        }
        route
    }

    /// Prefix for parent-first route-id children of a created parent
    #[must_use]
    pub fn child_prefix(&self, prefix: &str, parent_type: &str, parent_id: &str) -> String {
        format!(
            "{prefix}/{}/{parent_id}",
            self.registry.resolve_endpoint(parent_type)
        )
    }
}

/// Resource type named by a GET route
///
/// The first segment after `tenant_route` when the route starts with it,
/// else the last non-numeric segment, else `object`.
#[must_use]
pub fn infer_resource_type(route: &str, tenant_route: &str) -> String {
    let path = route.split(&['?', '#'][..]).next().unwrap_or(route);

    if !tenant_route.is_empty() {
        if let Some(rest) = path.strip_prefix(tenant_route) {
            return rest
                .split('/')
                .find(|s| !s.is_empty())
                .map_or_else(|| "object".to_string(), str::to_string);
        }
    }

    path.rsplit('/')
        .find(|s| !s.is_empty() && !s.chars().all(|c| c.is_ascii_digit()))
        .map_or_else(|| "object".to_string(), str::to_string)
}
