/// Builds the relay endpoint for the page's location. `protocol` is the
/// `location.protocol` value, e.g. `"https:"`.
pub fn websocket_url(protocol: &str, host: &str, session_id: Option<&str>) -> String {
    let scheme = if protocol == "https:" { "wss" } else { "ws" };
    match session_id {
        Some(session_id) => format!("{scheme}://{host}/ws/{session_id}"),
        None => format!("{scheme}://{host}/ws"),
    }
}

/// Session id from a `/s/<id>` page path.
pub fn session_id_from_path(path: &str) -> Option<String> {
    let mut parts = path.trim_matches('/').split('/');
    if parts.next()? != "s" {
        return None;
    }
    let session_id = parts.next()?;
    if session_id.is_empty() {
        None
    } else {
        Some(session_id.to_string())
    }
}
