mod common;

use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use tempfile::NamedTempFile;

use xray::{
    file_format::{config::NotifyPolicy, config::XrayConfig, views::ViewSetting, LoadError},
    view_config::{CustomView, ViewConfigListener},
};

use common::capture_warnings;

/// Remembers every setting it was handed.
struct Recorder {
    ns: String,
    seen: Mutex<Vec<Option<ViewSetting>>>,
}

impl Recorder {
    fn new(ns: &str) -> Arc<Recorder> {
        Arc::new(Recorder {
            ns: ns.to_string(),
            seen: Mutex::new(vec![]),
        })
    }

    fn seen(&self) -> Vec<Option<ViewSetting>> {
        self.seen.lock().unwrap().clone()
    }
}

impl ViewConfigListener for Recorder {
    fn view_settings_changed(&self, setting: Option<&ViewSetting>) {
        self.seen.lock().unwrap().push(setting.cloned());
    }

    fn namespace(&self) -> String {
        self.ns.clone()
    }
}

fn views_file(raw: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(raw.as_bytes()).unwrap();
    file
}

fn path(file: &NamedTempFile) -> &str {
    file.path().to_str().unwrap()
}

fn cols(cols: &[&str], sort: &str) -> ViewSetting {
    ViewSetting {
        columns: cols.iter().map(|c| c.to_string()).collect(),
        sort_column: sort.to_string(),
    }
}

const VIEWS: &str = r#"
views:
  v1/pods:
    columns: [NAME, STATUS]
    sortColumn: NAME:asc
  v1/pods@kube-.*:
    columns: [NAME, NODE]
  v1/pods@kube-system:
    columns: [NAME, IP]
"#;

#[test]
fn missing_file_changes_nothing() {
    let file = views_file(VIEWS);
    let cv = CustomView::new();
    cv.load(path(&file)).unwrap();
    let before = cv.views();

    let recorder = Recorder::new("");
    cv.add_listener("v1/pods", recorder.clone());
    let notified = recorder.seen().len();

    cv.load("/definitely/not/here/views.yaml").unwrap();
    assert_eq!(cv.views(), before);
    assert_eq!(recorder.seen().len(), notified);
}

#[test]
fn lookups_prefer_exact_keys() {
    let file = views_file(VIEWS);
    let cv = CustomView::new();
    cv.load(path(&file)).unwrap();

    assert_eq!(
        cv.view_setting("v1/pods", ""),
        Some(cols(&["NAME", "STATUS"], "NAME:asc"))
    );
    assert_eq!(
        cv.view_setting("v1/pods", "kube-system"),
        Some(cols(&["NAME", "IP"], ""))
    );
    assert_eq!(
        cv.view_setting("v1/pods", "kube-public"),
        Some(cols(&["NAME", "NODE"], ""))
    );
    assert_eq!(cv.view_setting("v1/pods", "default"), None);
    assert_eq!(cv.view_setting("v1/services", ""), None);
}

#[test]
fn schema_problems_warn_but_apply() {
    let (warnings, _guard) = capture_warnings();
    let file = views_file(
        r#"
views:
  v1/pods:
    columns: [NAME]
    sortColumn: NAME
    wat: 1
"#,
    );
    let cv = CustomView::new();
    cv.load(path(&file)).unwrap();

    assert_eq!(cv.view_setting("v1/pods", ""), Some(cols(&["NAME"], "NAME")));
    assert_eq!(
        warnings.count_of("Validation failed. Please update your config and restart!"),
        1
    );
}

#[test]
fn non_string_scalars_warn_but_apply() {
    let (warnings, _guard) = capture_warnings();
    let file = views_file("views:\n  v1/pods:\n    columns: [NAME, 1]\n    sortColumn: 5\n");
    let cv = CustomView::new();
    cv.load(path(&file)).unwrap();

    assert_eq!(cv.view_setting("v1/pods", ""), Some(cols(&["NAME", "1"], "5")));
    assert_eq!(
        warnings.count_of("Validation failed. Please update your config and restart!"),
        1
    );
}

#[test]
fn overlapping_patterns_are_called_out() {
    let (warnings, _guard) = capture_warnings();
    let file = views_file(
        r#"
views:
  v1/pods@kube-.*:
    columns: [A]
  v1/pods@kube-sys.*:
    columns: [B]
"#,
    );
    let cv = CustomView::new();
    cv.load(path(&file)).unwrap();

    assert_eq!(
        warnings.count_of("Overlapping view keys, first in key order wins"),
        1
    );
    assert_eq!(cv.view_setting("v1/pods", "kube-system"), Some(cols(&["A"], "")));
}

#[test]
fn unreadable_documents_are_errors() {
    let file = views_file("views:\n  v1/pods:\n    columns: 12\n");
    let cv = CustomView::new();
    let err = cv.load(path(&file)).unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }));
    assert_eq!(err.path(), path(&file));
    assert!(cv.views().is_empty());

    let dir = tempfile::tempdir().unwrap();
    let err = cv.load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, LoadError::Read { .. }));
}

#[test]
fn broadcast_renotifies_everyone() {
    let file = views_file(VIEWS);
    let cv = CustomView::new();
    cv.load(path(&file)).unwrap();

    let all = Recorder::new("");
    let kube = Recorder::new("kube-public");
    cv.add_listener("v1/pods", all.clone());
    cv.add_listener("v1/pods@kube", kube.clone());

    assert_eq!(all.seen().len(), 2);
    assert_eq!(
        all.seen()[1],
        Some(cols(&["NAME", "STATUS"], "NAME:asc"))
    );
    assert_eq!(kube.seen(), vec![None]);

    // Reloads reach every listener.
    cv.load(path(&file)).unwrap();
    assert_eq!(all.seen().len(), 3);
    assert_eq!(kube.seen().len(), 2);

    // Removal is silent.
    assert!(cv.remove_listener("v1/pods").is_some());
    assert_eq!(cv.listener_count(), 1);
    cv.load(path(&file)).unwrap();
    assert_eq!(all.seen().len(), 3);
    assert_eq!(kube.seen().len(), 3);
}

#[test]
fn newcomer_policy_only_tells_the_new_listener() {
    let file = views_file(VIEWS);
    let cv = CustomView::with_policy(NotifyPolicy::Newcomer);
    cv.load(path(&file)).unwrap();

    let first = Recorder::new("kube-system");
    let second = Recorder::new("default");
    cv.add_listener("v1/pods", first.clone());
    cv.add_listener("v1/services", second.clone());

    assert_eq!(first.seen(), vec![Some(cols(&["NAME", "IP"], ""))]);
    assert_eq!(second.seen(), vec![None]);
}

#[test]
fn reset_clears_views_quietly() {
    let file = views_file(VIEWS);
    let cv = CustomView::new();
    cv.load(path(&file)).unwrap();
    let recorder = Recorder::new("");
    cv.add_listener("v1/pods", recorder.clone());

    cv.reset();
    assert!(cv.views().is_empty());
    assert_eq!(recorder.seen().len(), 1);
    assert_eq!(cv.view_setting("v1/pods", ""), None);
}

#[test]
fn built_from_config() {
    let file = views_file(VIEWS);
    let config = XrayConfig {
        views_path: Some(path(&file).to_string()),
        render_timeout_ms: None,
        listener_notify: NotifyPolicy::Newcomer,
    };
    let cv = CustomView::from_config(&config).unwrap();
    assert_eq!(cv.views().len(), 3);

    let none = CustomView::from_config(&XrayConfig::default()).unwrap();
    assert!(none.views().is_empty());
}
