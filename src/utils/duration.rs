use std::time::Duration;

/// Renders a duration the way the agent parses it: whole seconds as `10s`,
/// everything else in milliseconds.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{millis}ms")
    }
}

/// Blocking-query `wait` parameter, always in milliseconds (`9000ms`).
pub(crate) fn wait_param(d: Duration) -> String {
    format!("{}ms", d.as_millis())
}
