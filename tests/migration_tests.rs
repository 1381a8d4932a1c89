//! End-to-end migration tests on template files

use jsf2_migrate::executor::{migrated_path, FileOutcome};
use jsf2_migrate::finding::Severity;
use jsf2_migrate::overrides::{OverrideIndex, TemplateIndex};
use jsf2_migrate::rules::{self, builtin_rules};
use jsf2_migrate::walker;
use jsf2_migrate::{Executor, ExecutorOptions, FixAction, NamespaceCatalog, Rule, RuleKind};
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

const LEGACY_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ui:composition xmlns:ui="http://java.sun.com/jsf/facelets" xmlns:a4j="https://ajax4jsf.dev.java.net/ajax" xmlns:rich="http://richfaces.org/rich"><rich:modalPanel id="panel"><a4j:commandButton reRender="a,b" ajaxSingle="true" limitToList="true"/></rich:modalPanel></ui:composition>
"#;

fn write_template(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn migrating(format: bool) -> ExecutorOptions {
    ExecutorOptions {
        migrate: true,
        format,
        ..Default::default()
    }
}

#[test]
fn test_custom_rule_replaces_attribute() {
    const X_TO_Y: Rule = Rule {
        id: "x-to-y",
        kind: RuleKind::Pattern {
            pattern: "//@x",
            fix: Some(FixAction::ReplaceAttribute {
                name: "y",
                value: "@self",
            }),
        },
        severity: Severity::Warning,
        message_key: "x-to-y",
        auto_fixable: true,
    };
    let table = [X_TO_Y];

    let dir = tempdir().unwrap();
    let path = write_template(&dir, "t.xhtml", r#"<div><span x="true">text</span></div>"#);
    write_template(&dir, "notes.txt", r#"<span x="true"/>"#);

    let files = walker::collect_templates(dir.path(), "xhtml");
    assert_eq!(files, vec![path.clone()]);

    let executor = Executor::new(&table, NamespaceCatalog::builtin(), migrating(false));
    let batch = executor.run(&files);

    assert_eq!(batch.files_processed(), 1);
    assert_eq!(batch.files[0].len(), 1);
    assert_eq!(batch.files[0].count("x-to-y"), 1);

    let migrated = fs::read_to_string(migrated_path(&path, ".migrated")).unwrap();
    assert!(migrated.contains(r#"<span y="@self">text</span>"#));
    assert!(!migrated.contains(" x="));
}

#[test]
fn test_legacy_template_is_migrated() {
    let dir = tempdir().unwrap();
    let path = write_template(&dir, "view.xhtml", LEGACY_TEMPLATE);

    let executor = Executor::new(builtin_rules(), NamespaceCatalog::builtin(), migrating(false));
    let outcome = executor.process_file(&path);
    assert!(outcome.is_success());

    let report = outcome.report();
    assert_eq!(report.count("namespace-mismatch"), 1);
    assert_eq!(report.count("namespace-drift"), 1);
    assert_eq!(report.count("a4j-rerender"), 1);
    assert_eq!(report.count("a4j-ajax-single"), 1);
    assert_eq!(report.count("a4j-limit-to-list"), 1);
    assert_eq!(report.count("rich-modal-panel"), 1);
    assert!(report.get("a4j-form").is_none());

    let migrated = fs::read_to_string(path.with_file_name("view.xhtml.migrated")).unwrap();
    assert!(migrated.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(migrated.contains(r#"xmlns:a4j="http://richfaces.org/a4j""#));
    assert!(migrated.contains(r#"<rich:popupPanel id="panel">"#));
    assert!(migrated.contains(r#"render="a b""#));
    assert!(migrated.contains(r#"execute="@this""#));
    assert!(migrated.contains(r#"limitRender="true""#));
    assert!(!migrated.contains("reRender"));
    assert!(!migrated.contains("ajaxSingle"));
    assert!(!migrated.contains("modalPanel"));

    // Without format the original is left alone
    assert_eq!(fs::read_to_string(&path).unwrap(), LEGACY_TEMPLATE);
}

#[test]
fn test_stale_declaration_below_root_is_migrated() {
    let dir = tempdir().unwrap();
    let path = write_template(
        &dir,
        "nested.xhtml",
        r#"<ui:composition xmlns:ui="http://java.sun.com/jsf/facelets"><div xmlns:a4j="https://ajax4jsf.dev.java.net/ajax"><a4j:form/></div></ui:composition>"#,
    );

    let executor = Executor::new(builtin_rules(), NamespaceCatalog::builtin(), migrating(false));
    let outcome = executor.process_file(&path);
    assert!(outcome.is_success());

    let report = outcome.report();
    assert_eq!(report.count("a4j-form"), 1);
    assert_eq!(report.count("namespace-drift"), 1);

    let migrated = fs::read_to_string(migrated_path(&path, ".migrated")).unwrap();
    assert!(migrated.contains(r#"xmlns:a4j="http://richfaces.org/a4j""#));
    assert!(!migrated.contains("ajax4jsf"));
}

#[test]
fn test_format_rewrites_original_without_fixes() {
    let dir = tempdir().unwrap();
    let path = write_template(&dir, "view.xhtml", LEGACY_TEMPLATE);

    let executor = Executor::new(builtin_rules(), NamespaceCatalog::builtin(), migrating(true));
    assert!(executor.process_file(&path).is_success());

    let original = fs::read_to_string(&path).unwrap();
    assert_ne!(original, LEGACY_TEMPLATE);
    assert!(original.contains("\n  <rich:modalPanel id=\"panel\">\n"));
    assert!(original.contains(r#"reRender="a,b""#));
    assert!(original.contains(r#"xmlns:a4j="https://ajax4jsf.dev.java.net/ajax""#));

    let migrated = fs::read_to_string(migrated_path(&path, ".migrated")).unwrap();
    assert!(migrated.contains("\n  <rich:popupPanel id=\"panel\">\n"));
}

#[test]
fn test_detection_only_writes_nothing() {
    let dir = tempdir().unwrap();
    let path = write_template(&dir, "view.xhtml", LEGACY_TEMPLATE);

    let executor = Executor::new(
        builtin_rules(),
        NamespaceCatalog::builtin(),
        ExecutorOptions::default(),
    );
    let batch = executor.run(&[path.clone()]);

    assert_eq!(batch.files_with_findings(), 1);
    assert!(!migrated_path(&path, ".migrated").exists());
    assert_eq!(fs::read_to_string(&path).unwrap(), LEGACY_TEMPLATE);
}

#[test]
fn test_clean_template_gets_no_migrated_copy() {
    let dir = tempdir().unwrap();
    let path = write_template(
        &dir,
        "clean.xhtml",
        r#"<ui:composition xmlns:ui="http://java.sun.com/jsf/facelets" xmlns:a4j="http://richfaces.org/a4j"><a4j:commandLink render="a b"/></ui:composition>"#,
    );

    let executor = Executor::new(builtin_rules(), NamespaceCatalog::builtin(), migrating(false));
    let batch = executor.run(&[path.clone()]);

    assert!(batch.files[0].is_empty());
    assert_eq!(batch.exit_code(), 0);
    assert!(!migrated_path(&path, ".migrated").exists());
}

#[test]
fn test_unreadable_template_does_not_stop_the_batch() {
    let dir = tempdir().unwrap();
    let broken = write_template(&dir, "a.xhtml", "<div><span></div>");
    let legacy = write_template(&dir, "b.xhtml", LEGACY_TEMPLATE);

    let executor = Executor::new(builtin_rules(), NamespaceCatalog::builtin(), migrating(false));

    let outcome = executor.process_file(&broken);
    assert!(matches!(outcome, FileOutcome::DocumentUnreadable(_)));
    assert!(!migrated_path(&broken, ".migrated").exists());

    let batch = executor.run(&[broken, legacy.clone()]);
    assert_eq!(batch.files_processed(), 2);
    assert_eq!(batch.files[0].count("document-unreadable"), 1);
    assert_eq!(batch.files[1].count("a4j-rerender"), 1);
    assert!(migrated_path(&legacy, ".migrated").exists());
    assert_eq!(batch.exit_code(), 2);
}

#[test]
fn test_platform_template_overrides() {
    let dir = tempdir().unwrap();
    let current = write_template(&dir, "nuxeo.war/incl/tabs.xhtml", "<div/>");
    let removed = write_template(&dir, "nuxeo.war/incl/old.xhtml", "<div/>");
    let own = write_template(&dir, "nuxeo.war/mine/tabs.xhtml", "<div/>");

    let overrides = OverrideIndex::new(
        TemplateIndex::from_lines("# shipped\nnuxeo.war/incl/tabs.xhtml\n"),
        TemplateIndex::from_lines("nuxeo.war\\incl\\old.xhtml\n"),
    );
    let executor = Executor::new(
        builtin_rules(),
        NamespaceCatalog::builtin(),
        ExecutorOptions::default(),
    )
    .with_overrides(overrides);

    let batch = executor.run(&[current, removed, own]);

    let finding = batch.files[0].get(rules::TEMPLATE_OVERRIDE.id).unwrap();
    assert_eq!(finding.parameters, vec!["nuxeo.war/incl/tabs.xhtml"]);
    assert_eq!(finding.severity, Severity::Warning);

    let finding = batch.files[1]
        .get(rules::TEMPLATE_OVERRIDE_REMOVED.id)
        .unwrap();
    assert_eq!(finding.severity, Severity::Error);

    assert!(batch.files[2].is_empty());
}

#[test]
fn test_file_name_override_mode() {
    let dir = tempdir().unwrap();
    let own = write_template(&dir, "elsewhere/tabs.xhtml", "<div/>");

    let executor = Executor::new(
        builtin_rules(),
        NamespaceCatalog::builtin(),
        ExecutorOptions {
            complete_path: false,
            ..Default::default()
        },
    )
    .with_overrides(OverrideIndex::new(
        TemplateIndex::from_lines("nuxeo.war/incl/tabs.xhtml"),
        TemplateIndex::default(),
    ));

    let batch = executor.run(&[own]);
    assert_eq!(batch.files[0].count("template-override"), 1);
}
