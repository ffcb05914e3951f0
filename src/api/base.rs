//! API base resolution and URL derivation.

use url::Url;

/// Base used when nothing else resolves.
pub const DEFAULT_API_BASE: &str = "https://api.yourdomain.com";

/// Environment variable holding a runtime base override.
const API_BASE_ENV: &str = "NETSTUDIO_API_BASE";

/// Port the dashboard dev server runs on; seeing it in the origin implies
/// the API lives on the same host.
const DEV_UI_PORT: u16 = 3000;
/// Port the API dev server runs on.
const DEV_API_PORT: u16 = 8080;

/// Resolve the API base, in priority order: the explicit configured
/// override, the `NETSTUDIO_API_BASE` environment variable, the dev-server
/// heuristic applied to `origin` (UI served from port 3000 means the API is
/// the same host on port 8080), and finally the hardcoded default.
pub fn resolve_api_base(explicit: Option<&str>, origin: Option<&str>) -> String {
    if let Some(base) = non_empty(explicit) {
        return base;
    }
    if let Some(base) = non_empty(std::env::var(API_BASE_ENV).ok().as_deref()) {
        return base;
    }
    if let Some(base) = dev_heuristic(origin) {
        return base;
    }
    DEFAULT_API_BASE.to_string()
}

/// Derive the websocket base from an HTTP base by scheme upgrade
/// (`http` → `ws`, `https` → `wss`). Other schemes pass through unchanged.
pub fn websocket_base(base: &str) -> String {
    let lower = base.to_ascii_lowercase();
    if lower.starts_with("https:") {
        format!("wss:{}", &base["https:".len()..])
    } else if lower.starts_with("http:") {
        format!("ws:{}", &base["http:".len()..])
    } else {
        base.to_string()
    }
}

/// Join a base and a leading-slash path without introducing double slashes.
pub fn join_path(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn dev_heuristic(origin: Option<&str>) -> Option<String> {
    let origin = Url::parse(origin?).ok()?;
    if origin.port() != Some(DEV_UI_PORT) {
        return None;
    }
    let host = origin.host_str()?;
    Some(format!("{}://{}:{}", origin.scheme(), host, DEV_API_PORT))
}
