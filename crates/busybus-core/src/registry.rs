//! Method registry: a tree of services keyed by dotted path.
//!
//! Leaves are either a local function or a weak reference to a provider
//! session, identified only by an opaque `SessionId` the router controls —
//! this crate never dereferences a provider, it only remembers which
//! session published a method so the router can route to it or remove its
//! entries on disconnect.

use std::collections::HashMap;

use busybus_proto::Object;

use crate::error::RegistryError;

/// Opaque handle the router uses to identify a session. The registry treats
/// this as inert data; it never owns or dereferences the session behind it.
pub type SessionId = u64;

/// A local method: takes the caller's argument object, returns a reply
/// object or a method error.
pub type LocalFn = fn(&mut Object) -> Result<Object, String>;

/// One registered method.
#[derive(Debug, Clone)]
pub enum MethodEntry {
    /// Implemented in-process.
    Local(LocalFn),
    /// Published by a provider session; `leaf` is the provider's own name
    /// for the method, forwarded verbatim as SRVCALL's meta.
    Remote {
        /// The session that published this method.
        provider: SessionId,
        /// Leaf method name, as given in the SRVREG descriptor.
        leaf: String,
    },
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<String, Node>,
    methods: HashMap<String, MethodEntry>,
}

/// The dotted-path method tree.
#[derive(Debug, Default)]
pub struct Registry {
    root: Node,
}

fn split_path(path: &str) -> Result<(Vec<&str>, &str), RegistryError> {
    let Some(idx) = path.rfind('.') else {
        return Err(RegistryError::NoLeafComponent { path: path.to_owned() });
    };
    let (prefix, leaf) = (&path[..idx], &path[idx + 1..]);
    Ok((prefix.split('.').collect(), leaf))
}

impl Registry {
    /// A registry with no methods.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` at `path`. Fails if `path` has no `.` (no leaf
    /// component to forward on SRVCALL, so top-level registration is
    /// rejected outright), if the path conflicts with an existing service
    /// node, or if a method is already registered there.
    pub fn insert(&mut self, path: &str, entry: MethodEntry) -> Result<(), RegistryError> {
        let (components, leaf) = split_path(path)?;

        let mut node = &mut self.root;
        for component in components {
            if node.methods.contains_key(component) {
                return Err(RegistryError::PathConflict { path: path.to_owned() });
            }
            node = node.children.entry(component.to_owned()).or_default();
        }

        if node.children.contains_key(leaf) {
            return Err(RegistryError::PathConflict { path: path.to_owned() });
        }
        if node.methods.contains_key(leaf) {
            return Err(RegistryError::AlreadyRegistered { path: path.to_owned() });
        }

        node.methods.insert(leaf.to_owned(), entry);
        Ok(())
    }

    /// Look up a method by its full dotted path.
    pub fn lookup(&self, path: &str) -> Result<&MethodEntry, RegistryError> {
        let (components, leaf) = split_path(path)?;

        let mut node = &self.root;
        for component in components {
            match node.children.get(component) {
                Some(child) => node = child,
                None => return Err(RegistryError::NoMethod { path: path.to_owned() }),
            }
        }

        node.methods.get(leaf).ok_or_else(|| RegistryError::NoMethod { path: path.to_owned() })
    }

    /// Remove every remote entry whose target is `provider`. Returns the
    /// number of entries removed. Called when a provider session closes.
    pub fn remove_by_provider(&mut self, provider: SessionId) -> usize {
        Self::remove_by_provider_in(&mut self.root, provider)
    }

    fn remove_by_provider_in(node: &mut Node, provider: SessionId) -> usize {
        let before = node.methods.len();
        node.methods.retain(|_, entry| !matches!(entry, MethodEntry::Remote { provider: p, .. } if *p == provider));
        let mut removed = before - node.methods.len();
        for child in node.children.values_mut() {
            removed += Self::remove_by_provider_in(child, provider);
        }
        removed
    }

    /// Remove a single method by its exact path (used by SRVUNREG).
    /// Returns whether anything was removed.
    pub fn remove_path(&mut self, path: &str) -> Result<bool, RegistryError> {
        let (components, leaf) = split_path(path)?;

        let mut node = &mut self.root;
        for component in components {
            match node.children.get_mut(component) {
                Some(child) => node = child,
                None => return Ok(false),
            }
        }
        Ok(node.methods.remove(leaf).is_some())
    }

    /// All fully-dotted paths currently registered, for control's
    /// enumerate-methods.
    #[must_use]
    pub fn enumerate(&self) -> Vec<String> {
        let mut out = Vec::new();
        Self::enumerate_in(&self.root, String::new(), &mut out);
        out.sort();
        out
    }

    fn enumerate_in(node: &Node, prefix: String, out: &mut Vec<String>) {
        for leaf in node.methods.keys() {
            out.push(if prefix.is_empty() { leaf.clone() } else { format!("{prefix}.{leaf}") });
        }
        for (component, child) in &node.children {
            let child_prefix =
                if prefix.is_empty() { component.clone() } else { format!("{prefix}.{component}") };
            Self::enumerate_in(child, child_prefix, out);
        }
    }
}

/// Normalize a SRVREG descriptor `"<service-path>,<method-name>,<arg-descr>,
/// <ret-descr>"` to the fully dotted path `bbus.<service-path>.<method-name>`
/// and the parsed descriptors.
pub fn parse_srvreg_descriptor(descriptor: &str) -> Result<RegDescriptor<'_>, RegistryError> {
    let mut parts = descriptor.splitn(4, ',');
    let (Some(service_path), Some(method_name), Some(arg_descr), Some(ret_descr)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(RegistryError::InvalidDescriptor(descriptor.to_owned()));
    };

    Ok(RegDescriptor {
        full_path: format!("bbus.{service_path}.{method_name}"),
        method_name,
        arg_descr,
        ret_descr,
    })
}

/// A parsed SRVREG registration descriptor.
#[derive(Debug, Clone)]
pub struct RegDescriptor<'a> {
    /// Normalized `bbus.<service-path>.<method-name>` path.
    pub full_path: String,
    /// Leaf method name, as published by the provider.
    pub method_name: &'a str,
    /// Argument object description string.
    pub arg_descr: &'a str,
    /// Return object description string.
    pub ret_descr: &'a str,
}

/// A built-in local method: echoes its argument object back unchanged.
/// Registered at `bbus.bbusd.echo` by the daemon's startup method table
/// (used by end-to-end scenario S1).
pub fn echo(object: &mut Object) -> Result<Object, String> {
    object.rewind();
    Ok(Object::frombuf(object.rawdata()))
}

#[cfg(test)]
mod tests {
    use busybus_proto::Value;

    use super::*;

    #[test]
    fn insert_and_lookup_round_trip() {
        let mut registry = Registry::new();
        registry.insert("bbus.foo.bar", MethodEntry::Local(echo)).unwrap();
        assert!(matches!(registry.lookup("bbus.foo.bar"), Ok(MethodEntry::Local(_))));
    }

    #[test]
    fn duplicate_insert_fails() {
        let mut registry = Registry::new();
        registry.insert("bbus.foo.bar", MethodEntry::Local(echo)).unwrap();
        let result = registry.insert("bbus.foo.bar", MethodEntry::Local(echo));
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered { .. })));
    }

    #[test]
    fn lookup_miss_reports_no_method() {
        let registry = Registry::new();
        assert!(matches!(registry.lookup("bbus.foo.bar"), Err(RegistryError::NoMethod { .. })));
    }

    #[test]
    fn top_level_registration_rejected() {
        let mut registry = Registry::new();
        let result = registry.insert("bbusd", MethodEntry::Local(echo));
        assert!(matches!(result, Err(RegistryError::NoLeafComponent { .. })));
    }

    #[test]
    fn remove_by_provider_clears_only_its_entries() {
        let mut registry = Registry::new();
        registry
            .insert("bbus.foo.bar", MethodEntry::Remote { provider: 1, leaf: "bar".to_owned() })
            .unwrap();
        registry
            .insert("bbus.foo.baz", MethodEntry::Remote { provider: 2, leaf: "baz".to_owned() })
            .unwrap();

        let removed = registry.remove_by_provider(1);
        assert_eq!(removed, 1);
        assert!(matches!(registry.lookup("bbus.foo.bar"), Err(RegistryError::NoMethod { .. })));
        assert!(matches!(registry.lookup("bbus.foo.baz"), Ok(MethodEntry::Remote { .. })));
    }

    #[test]
    fn srvunreg_removes_exact_path() {
        let mut registry = Registry::new();
        registry
            .insert("bbus.foo.bar", MethodEntry::Remote { provider: 1, leaf: "bar".to_owned() })
            .unwrap();
        assert!(registry.remove_path("bbus.foo.bar").unwrap());
        assert!(matches!(registry.lookup("bbus.foo.bar"), Err(RegistryError::NoMethod { .. })));
    }

    #[test]
    fn parses_srvreg_descriptor() {
        let descr = parse_srvreg_descriptor("foo,bar,s,s").unwrap();
        assert_eq!(descr.full_path, "bbus.foo.bar");
        assert_eq!(descr.method_name, "bar");
        assert_eq!(descr.arg_descr, "s");
        assert_eq!(descr.ret_descr, "s");
    }

    #[test]
    fn enumerate_lists_all_registered_paths() {
        let mut registry = Registry::new();
        registry.insert("bbus.foo.bar", MethodEntry::Local(echo)).unwrap();
        registry.insert("bbus.foo.baz", MethodEntry::Local(echo)).unwrap();
        assert_eq!(registry.enumerate(), vec!["bbus.foo.bar".to_owned(), "bbus.foo.baz".to_owned()]);
    }

    #[test]
    fn echo_returns_input_unchanged() {
        let mut object = Object::build("s", &[Value::S(b"hello".to_vec())]).unwrap();
        let mut reply = echo(&mut object).unwrap();
        assert_eq!(reply.parse("s").unwrap(), vec![Value::S(b"hello".to_vec())]);
    }
}
