//! Socket path resolution: compiled-in default, overridden by
//! `BBUS_SOCKPATH`, overridden again by a per-process setter, which wins
//! over both.

use std::sync::{Mutex, OnceLock};

fn process_override() -> &'static Mutex<Option<String>> {
    static OVERRIDE: OnceLock<Mutex<Option<String>>> = OnceLock::new();
    OVERRIDE.get_or_init(|| Mutex::new(None))
}

/// Set the socket path this process's clients connect to, overriding both
/// the compiled-in default and `BBUS_SOCKPATH`. Pass `None` to clear the
/// override and fall back to the environment/default again.
pub fn set_sockpath(path: Option<String>) {
    let mut guard = process_override().lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    *guard = path;
}

/// Resolve the socket path to connect to: the per-process override, then
/// `BBUS_SOCKPATH`, then [`busybus_transport::DEFAULT_SOCKPATH`].
#[must_use]
pub fn resolve() -> String {
    let guard = process_override().lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(path) = guard.as_ref() {
        return path.clone();
    }
    drop(guard);

    std::env::var("BBUS_SOCKPATH").unwrap_or_else(|_| busybus_transport::DEFAULT_SOCKPATH.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setter_overrides_default() {
        set_sockpath(Some("/tmp/custom.sock".to_owned()));
        assert_eq!(resolve(), "/tmp/custom.sock");
        set_sockpath(None);
    }

    #[test]
    fn clearing_override_falls_back() {
        set_sockpath(Some("/tmp/custom2.sock".to_owned()));
        set_sockpath(None);
        assert_ne!(resolve(), "/tmp/custom2.sock");
    }
}
