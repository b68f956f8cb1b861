/// Accepts `host:port`, `http://host:port/` or `https://host:port` and
/// returns a base URL with a scheme and no trailing slash.
pub fn address_str(addr: &str) -> String {
    let trimmed = addr.trim().trim_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// KV paths are relative to `/v1/kv/`; a leading slash would double it.
pub(crate) fn kv_path(key: &str) -> String {
    format!("/v1/kv/{}", key.trim_start_matches('/'))
}
