//! The custom views document: per kind (and optionally per namespace pattern)
//! column and sort overrides.
//!
//! ```yaml
//! views:
//!   v1/pods:
//!     columns: [NAME, STATUS, AGE]
//!     sortColumn: AGE:desc
//!   v1/pods@kube-.*:
//!     columns: [NAME, NODE]
//! ```

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

lazy_static! {
    static ref SORT_COLUMN_RE: Regex = Regex::new(r"^[^:]+:(asc|desc)$").unwrap();
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("no sort column specified")]
    NoSortColumn,
    #[error("invalid sort column spec: {0:?}. must be col-name:asc|desc")]
    InvalidSortColumn(String),
}

/// Column and sort overrides for one view key.
///
/// Equality is element-wise on the columns (order matters) plus the sort
/// column, which is what the derived `PartialEq` gives; `Option` comparisons
/// then treat "no setting" as distinct from a blank one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSetting {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default, rename = "sortColumn")]
    pub sort_column: String,
}

impl ViewSetting {
    pub fn has_cols(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.columns.is_empty() && self.sort_column.is_empty()
    }

    /// The sort column name and whether it sorts ascending.
    pub fn sort_col(&self) -> Result<(String, bool), ViewError> {
        if self.sort_column.is_empty() {
            return Err(ViewError::NoSortColumn);
        }
        let mut tokens = self.sort_column.split(':');
        match (tokens.next(), tokens.next()) {
            (Some(name), Some(dir)) => Ok((name.to_string(), dir == "asc")),
            _ => Err(ViewError::InvalidSortColumn(self.sort_column.clone())),
        }
    }
}

/// A missing setting is as blank as an empty one.
pub fn is_blank_setting(vs: Option<&ViewSetting>) -> bool {
    vs.map_or(true, ViewSetting::is_blank)
}

/// Deserialized form of the whole document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ViewsFile {
    #[serde(default)]
    views: Option<BTreeMap<String, ViewSetting>>,
}

impl ViewsFile {
    pub fn into_views(self) -> BTreeMap<String, ViewSetting> {
        self.views.unwrap_or_default()
    }
}

/// Parse the raw document, returning both the generic YAML value (for
/// schema checks) and the typed form.  An empty document has no views.
///
/// The typed form is read straight from the text so plain scalars such as
/// `1` still land in string fields; the schema check reports them.
pub fn parse_views(raw: &str) -> Result<(Value, ViewsFile), serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok((Value::Null, ViewsFile::default()));
    }
    let doc: Value = serde_yaml::from_str(raw)?;
    let typed: ViewsFile = serde_yaml::from_str(raw)?;
    Ok((doc, typed))
}

/// Check a parsed document against the views schema, returning one message
/// per problem found.  An empty list means the document is valid.
pub fn validate_views(doc: &Value) -> Vec<String> {
    let mut issues = vec![];

    let top = match doc {
        Value::Mapping(top) => top,
        Value::Null => return issues,
        _ => {
            issues.push("document must be a mapping".to_string());
            return issues;
        }
    };

    for key in top.keys() {
        if key.as_str() != Some("views") {
            issues.push(format!("unknown top-level key {}", describe_key(key)));
        }
    }

    match top.get("views") {
        None => issues.push("missing required key `views`".to_string()),
        Some(Value::Mapping(views)) => {
            for (name, view) in views {
                match name.as_str() {
                    Some(name) => validate_view(name, view, &mut issues),
                    None => issues.push(format!("view key {} must be a string", describe_key(name))),
                }
            }
        }
        Some(_) => issues.push("`views` must be a mapping".to_string()),
    }

    issues
}

fn validate_view(name: &str, view: &Value, issues: &mut Vec<String>) {
    let view = match view {
        Value::Mapping(view) => view,
        _ => {
            issues.push(format!("views.{} must be a mapping", name));
            return;
        }
    };

    for key in view.keys() {
        match key.as_str() {
            Some("columns") | Some("sortColumn") => {}
            _ => issues.push(format!("views.{}: unknown key {}", name, describe_key(key))),
        }
    }

    match view.get("columns") {
        None => issues.push(format!("views.{}.columns is required", name)),
        Some(Value::Sequence(cols)) => {
            if cols.iter().any(|c| !c.is_string()) {
                issues.push(format!("views.{}.columns must only hold strings", name));
            }
        }
        Some(_) => issues.push(format!("views.{}.columns must be a list of strings", name)),
    }

    match view.get("sortColumn") {
        None => {}
        Some(Value::String(sc)) if SORT_COLUMN_RE.is_match(sc) => {}
        Some(Value::String(sc)) => issues.push(format!(
            "views.{}.sortColumn {:?} must look like <column>:asc|desc",
            name, sc
        )),
        Some(_) => issues.push(format!("views.{}.sortColumn must be a string", name)),
    }
}

fn describe_key(key: &Value) -> String {
    match key {
        Value::String(s) => format!("{:?}", s),
        other => format!("{:?}", other),
    }
}
