//! The daemon's built-in local method table.
//!
//! A provider's SRVREG descriptor is the only way to add routes at runtime;
//! this module is just the fixed set the daemon registers on startup, before
//! accepting any connections.

use crate::router::Router;

/// Register every built-in local method. Called once, before the main loop
/// starts accepting connections.
pub fn register_builtins(router: &mut Router) -> Result<(), busybus_core::RegistryError> {
    router.register_local("bbus.bbusd.echo", busybus_core::echo)
}
