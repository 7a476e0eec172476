//! Resource identity helpers shared by the tree builder and the factories.
//!
//! A `Kind` is the group/version/resource triple of a resource type written
//! the way the dashboard spells it everywhere else, e.g. `v1/secrets` or
//! `apps/v1/deployments`.  Core resources have no group and some pseudo kinds
//! (like `containers`) have neither group nor version.

use std::fmt;

use serde::{Serialize, Serializer};
use ustr::{ustr, Ustr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kind(Ustr);

impl Kind {
    pub fn new(gvr: &str) -> Self {
        Kind(ustr(gvr.trim_matches('/')))
    }

    pub fn pods() -> Self {
        Kind::new("v1/pods")
    }

    pub fn containers() -> Self {
        Kind::new("containers")
    }

    pub fn secrets() -> Self {
        Kind::new("v1/secrets")
    }

    pub fn config_maps() -> Self {
        Kind::new("v1/configmaps")
    }

    pub fn service_accounts() -> Self {
        Kind::new("v1/serviceaccounts")
    }

    pub fn persistent_volume_claims() -> Self {
        Kind::new("v1/persistentvolumeclaims")
    }

    pub fn as_str(&self) -> &'static str {
        self.0.as_str()
    }

    fn parts(&self) -> (&'static str, &'static str, &'static str) {
        let tokens: Vec<&'static str> = self.0.as_str().split('/').collect();
        match tokens.as_slice() {
            [g, v, r] => (*g, *v, *r),
            [v, r] => ("", *v, *r),
            [r] => ("", "", *r),
            // More segments than a GVR can hold; keep the tail as resource.
            _ => ("", "", tokens.last().copied().unwrap_or_default()),
        }
    }

    pub fn group(&self) -> &'static str {
        self.parts().0
    }

    pub fn version(&self) -> &'static str {
        self.parts().1
    }

    pub fn resource(&self) -> &'static str {
        self.parts().2
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for Kind {
    fn from(gvr: &str) -> Self {
        Kind::new(gvr)
    }
}

impl Serialize for Kind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

/// Fully qualified name of a resource: `ns/name`, or `name` for cluster
/// scoped resources.
pub fn fqn(ns: &str, name: &str) -> String {
    if ns.is_empty() {
        return name.to_string();
    }
    format!("{}/{}", ns, name)
}

/// Inverse of `fqn`, splitting at the last `/`.
pub fn namespaced(fqn: &str) -> (&str, &str) {
    match fqn.rfind('/') {
        Some(idx) => (fqn[..idx].trim_matches('/'), &fqn[idx + 1..]),
        None => ("", fqn),
    }
}
