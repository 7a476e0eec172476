use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;
use itertools::Itertools;
use serde_json::Value;

use crate::kinds::Kind;

pub type Result<T> = std::result::Result<T, FactoryError>;

// JSON decode errors are sticky data problems.
impl From<serde_json::Error> for FactoryError {
    fn from(err: serde_json::Error) -> FactoryError {
        FactoryError::StickyProblem(ErrorDetails {
            layer: ErrorLayer::DataLayer,
            message: err.to_string(),
        })
    }
}

/// Express whether the error seems to be happening in the store or the data.
#[derive(Debug)]
pub enum ErrorLayer {
    /// The request itself is malformed, like an unparseable label selector.
    /// A lookup that simply finds nothing is not an error at all and should
    /// come back as `Ok(None)`.
    BadInput,
    /// The backing store failed to answer, e.g. it could not be read or the
    /// cluster API timed out.
    StoreLayer,
    /// The store answered but what it holds could not be understood.
    DataLayer,
    /// We're not sure which of the above it was.
    UnknownLayer,
}

/// FactoryError payload describing what went wrong for investigation
/// purposes.
#[derive(Debug)]
pub struct ErrorDetails {
    pub layer: ErrorLayer,
    /// Stringified version of the lower level error.
    pub message: String,
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.layer, self.message)
    }
}

/// Does a retry make sense or not?
///
/// Nothing in the tree builder retries; a failed lookup is simply treated as
/// a missing reference.  The distinction is kept for callers that poll.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// An error that will persist for this snapshot of the cluster.
    #[error("sticky problem: {0}")]
    StickyProblem(ErrorDetails),
    /// An error that might go away if retried later, like an API timeout.
    #[error("transient problem: {0}")]
    TransientProblem(ErrorDetails),
    #[error("unsupported")]
    Unsupported,
}

/// Label filter applied to a factory lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LabelSelector {
    /// Unrestricted; every object matches.
    #[default]
    Everything,
    /// Every listed label must be present with exactly this value.
    MatchLabels(BTreeMap<String, String>),
}

impl LabelSelector {
    pub fn everything() -> Self {
        LabelSelector::Everything
    }

    /// Parse the `key=value,key2=value2` form.  An empty string selects
    /// everything.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(LabelSelector::Everything);
        }

        let mut labels = BTreeMap::new();
        for term in raw.split(',') {
            let (key, value) = match term.split_once('=') {
                Some((k, v)) if !k.trim().is_empty() => (k.trim(), v.trim()),
                _ => {
                    return Err(FactoryError::StickyProblem(ErrorDetails {
                        layer: ErrorLayer::BadInput,
                        message: format!("invalid label selector term {:?}", term),
                    }));
                }
            };
            labels.insert(key.to_string(), value.to_string());
        }

        Ok(LabelSelector::MatchLabels(labels))
    }

    /// Check an object's `metadata.labels` against the selector.
    pub fn matches(&self, object: &Value) -> bool {
        match self {
            LabelSelector::Everything => true,
            LabelSelector::MatchLabels(wanted) => {
                let labels = object.pointer("/metadata/labels");
                wanted.iter().all(|(k, v)| {
                    labels
                        .and_then(|l| l.get(k))
                        .and_then(Value::as_str)
                        .map_or(false, |have| have == v)
                })
            }
        }
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelSelector::Everything => Ok(()),
            LabelSelector::MatchLabels(labels) => write!(
                f,
                "{}",
                labels.iter().map(|(k, v)| format!("{}={}", k, v)).join(",")
            ),
        }
    }
}

/// Read access to live cluster state.
///
/// The tree builder only ever needs this single lookup.  Implementations are
/// shared between every renderer of a traversal so they must tolerate
/// concurrent queries, and any of them may block on network I/O for as long
/// as it likes; callers never hold a tree lock while awaiting one.
///
/// ## Cache semantics
///
/// `skip_cache` asks for a fresh answer.  Implementations without a cache
/// simply ignore it.
#[async_trait]
pub trait Factory {
    /// Fetch the object of the given kind whose fully qualified name is `id`.
    ///
    /// Returns `Ok(None)` when there is no such object, or when it exists but
    /// does not match `selector`.
    async fn get(
        &self,
        kind: Kind,
        id: &str,
        skip_cache: bool,
        selector: &LabelSelector,
    ) -> Result<Option<Value>>;
}
