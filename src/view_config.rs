//! Registry of custom view settings, keyed by kind and namespace pattern.
//!
//! Keys are either a bare kind (`v1/pods`) or `kind@pattern` where the
//! pattern is a regular expression tested against the whole `kind@namespace`
//! string being looked up.  Lookups always prefer an exact key; after that
//! the pattern keys of the kind are tried in key order and the first match
//! wins.
//!
//! Views are replaced wholesale on every load by swapping in a new snapshot,
//! so a concurrent lookup sees either the old views or the new ones.
//! Listeners outlive loads and are re-notified after each one.

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    sync::{Arc, Mutex, PoisonError},
};

use arc_swap::ArcSwap;
use itertools::Itertools;
use regex::Regex;

use crate::file_format::{
    config::{NotifyPolicy, XrayConfig},
    views::{parse_views, validate_views, ViewSetting},
    LoadError,
};

/// Something rendering a kind that wants to know its column settings.
pub trait ViewConfigListener: Send + Sync {
    /// The settings applicable to this listener changed; `None` means fall
    /// back to the default columns and sort.
    fn view_settings_changed(&self, setting: Option<&ViewSetting>);

    /// The namespace currently being viewed, empty for all namespaces.
    fn namespace(&self) -> String;
}

/// Lookup key for a kind viewed in a namespace.
pub fn view_key(kind: &str, ns: &str) -> String {
    if ns.is_empty() {
        return kind.to_string();
    }
    format!("{}@{}", kind, ns)
}

/// Split a view key into its kind and namespace pattern.  Keys with more
/// than one `@` have no usable pattern.
fn split_key(key: &str) -> (&str, Option<&str>) {
    let mut tokens = key.split('@');
    let kind = tokens.next().unwrap_or_default();
    match (tokens.next(), tokens.next()) {
        (Some(pattern), None) => (kind, Some(pattern)),
        _ => (kind, None),
    }
}

fn is_pattern(ns: &str) -> bool {
    ns.chars().any(|c| r".+*?()|[]{}^$\".contains(c))
}

/// One immutable generation of the views with their patterns compiled.
#[derive(Debug, Default)]
struct ViewSnapshot {
    views: BTreeMap<String, ViewSetting>,
    patterns: BTreeMap<String, Regex>,
}

impl ViewSnapshot {
    fn compile(views: BTreeMap<String, ViewSetting>) -> Self {
        let mut patterns = BTreeMap::new();
        for key in views.keys() {
            let pattern = match split_key(key) {
                (_, Some(pattern)) => pattern,
                _ => continue,
            };
            match Regex::new(pattern) {
                Ok(rx) => {
                    patterns.insert(key.clone(), rx);
                }
                Err(err) => {
                    warn!(key = %key, err = %err, "Invalid namespace pattern in view key");
                }
            }
        }
        ViewSnapshot { views, patterns }
    }

    /// Exact key first, then pattern keys in key order.  Only pattern keys
    /// whose kind part (the text before `@`) equals `kind` exactly are
    /// tried, so `v1/podsx@.*` never applies to `v1/pods`.
    fn lookup(&self, kind: &str, ns: &str) -> Option<&ViewSetting> {
        let target = view_key(kind, ns);
        if let Some(vs) = self.views.get(&target) {
            return Some(vs);
        }
        let found = self
            .matching_patterns(kind, &target)
            .next()
            .and_then(|key| self.views.get(key));
        found
    }

    fn matching_patterns<'a>(
        &'a self,
        kind: &'a str,
        target: &'a str,
    ) -> impl Iterator<Item = &'a String> + 'a {
        self.patterns
            .iter()
            .filter(move |(key, _)| split_key(key).0 == kind)
            .filter(move |(_, rx)| rx.is_match(target))
            .map(|(key, _)| key)
    }

    /// Pairs of pattern keys of one kind where the first, in key order, also
    /// matches the text of the second's pattern, so some namespaces the
    /// second was written for are likely to land on the first instead.
    /// Literal namespaces are skipped since their exact key always wins.
    fn ambiguities(&self) -> Vec<(String, String)> {
        let mut found = vec![];
        for (shadowed, _) in &self.patterns {
            let (kind, ns) = match split_key(shadowed) {
                (kind, Some(ns)) if is_pattern(ns) => (kind, ns),
                _ => continue,
            };
            let target = view_key(kind, ns);
            for (key, rx) in &self.patterns {
                if key == shadowed || split_key(key).0 != kind || !rx.is_match(&target) {
                    continue;
                }
                let pair = if key < shadowed {
                    (key.clone(), shadowed.clone())
                } else {
                    (shadowed.clone(), key.clone())
                };
                if !found.contains(&pair) {
                    found.push(pair);
                }
            }
        }
        found.sort();
        found
    }
}

/// Custom view settings plus the listeners interested in them.
pub struct CustomView {
    snapshot: ArcSwap<ViewSnapshot>,
    listeners: Mutex<BTreeMap<String, Arc<dyn ViewConfigListener>>>,
    policy: NotifyPolicy,
}

impl Default for CustomView {
    fn default() -> Self {
        CustomView::new()
    }
}

impl CustomView {
    pub fn new() -> Self {
        CustomView::with_policy(NotifyPolicy::default())
    }

    pub fn with_policy(policy: NotifyPolicy) -> Self {
        CustomView {
            snapshot: ArcSwap::from_pointee(ViewSnapshot::default()),
            listeners: Mutex::new(BTreeMap::new()),
            policy,
        }
    }

    /// Build a registry per the config, loading its views document if one is
    /// named.
    pub fn from_config(config: &XrayConfig) -> Result<Self, LoadError> {
        let cv = CustomView::with_policy(config.listener_notify);
        if let Some(path) = &config.views_path {
            cv.load(path)?;
        }
        Ok(cv)
    }

    /// Replace the views with the contents of `path`, then notify every
    /// listener.
    ///
    /// A missing file leaves everything as it was.  Schema problems are only
    /// logged; the document is applied regardless.
    pub fn load(&self, path: &str) -> Result<(), LoadError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                trace!(path, "no custom views file");
                return Ok(());
            }
            Err(source) => {
                return Err(LoadError::Read {
                    path: path.to_string(),
                    source,
                })
            }
        };

        let (doc, typed) = parse_views(&raw).map_err(|err| LoadError::Parse {
            path: path.to_string(),
            message: err.to_string(),
        })?;

        let issues = validate_views(&doc);
        if !issues.is_empty() {
            warn!(
                path,
                err = %issues.iter().join("; "),
                "Validation failed. Please update your config and restart!"
            );
        }

        let snapshot = ViewSnapshot::compile(typed.into_views());
        for (first, second) in snapshot.ambiguities() {
            warn!(path, first = %first, second = %second, "Overlapping view keys, first in key order wins");
        }
        self.snapshot.store(Arc::new(snapshot));
        self.fire_config_changed();

        Ok(())
    }

    /// Drop all views.  Listeners are kept and not notified.
    pub fn reset(&self) {
        self.snapshot.store(Arc::new(ViewSnapshot::default()));
    }

    pub fn views(&self) -> BTreeMap<String, ViewSetting> {
        self.snapshot.load().views.clone()
    }

    /// The setting applying to `kind` viewed in `ns`, if any.  An exact
    /// `kind` or `kind@ns` key wins; otherwise the first `kind@pattern` key,
    /// in key order, whose pattern matches `kind@ns`.  The kind part of a
    /// pattern key must equal `kind` exactly; a longer kind sharing the
    /// prefix does not count.
    pub fn view_setting(&self, kind: &str, ns: &str) -> Option<ViewSetting> {
        self.snapshot.load().lookup(kind, ns).cloned()
    }

    /// Register the listener for `kind`, replacing any previous one, and
    /// notify per the registry's policy.
    pub fn add_listener(&self, kind: &str, listener: Arc<dyn ViewConfigListener>) {
        self.lock_listeners()
            .insert(kind.to_string(), listener.clone());

        match self.policy {
            NotifyPolicy::Broadcast => self.fire_config_changed(),
            NotifyPolicy::Newcomer => {
                let snapshot = self.snapshot.load_full();
                notify(&snapshot, kind, listener.as_ref());
            }
        }
    }

    pub fn remove_listener(&self, kind: &str) -> Option<Arc<dyn ViewConfigListener>> {
        self.lock_listeners().remove(kind)
    }

    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    fn lock_listeners(
        &self,
    ) -> std::sync::MutexGuard<'_, BTreeMap<String, Arc<dyn ViewConfigListener>>> {
        // A listener panicking mid-insert cannot leave the map inconsistent.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire_config_changed(&self) {
        // Listeners are called without the lock held so they may re-register.
        let listeners: Vec<(String, Arc<dyn ViewConfigListener>)> = self
            .lock_listeners()
            .iter()
            .map(|(kind, l)| (kind.clone(), l.clone()))
            .collect();
        let snapshot = self.snapshot.load_full();

        for (kind, listener) in listeners {
            notify(&snapshot, &kind, listener.as_ref());
        }
    }
}

fn notify(snapshot: &ViewSnapshot, kind: &str, listener: &dyn ViewConfigListener) {
    match snapshot.lookup(kind, &listener.namespace()) {
        None => listener.view_settings_changed(None),
        Some(vs) => {
            debug!(kind, "Reloading custom view settings");
            listener.view_settings_changed(Some(vs));
        }
    }
}
