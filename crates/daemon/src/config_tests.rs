// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use roboppi_core::WorkerKind;
use std::time::Duration;

const FULL: &str = r#"
state_dir: /var/lib/roboppi
webhook_addr: 127.0.0.1:9944
max_history: 25
core:
  argv: [roboppid, core]
triggers:
  - id: nightly
    source: { kind: cron, expr: "0 2 * * *" }
    workflow: ./workflows/nightly.yaml
    workspace: /srv/repo
    evaluate:
      worker: CUSTOM
      instructions: "git fetch --quiet && test -n \"$(git log HEAD..origin/main --oneline)\""
    cooldown: 10m
    env: { CI: "1" }
  - id: on-push
    source: { kind: webhook, path: push }
    workflow: ./workflows/ci.yaml
    workspace: /srv/repo
    analyzer:
      worker: CLAUDE_CODE
      instructions: "Summarize the run."
      outputs: [notes.md]
  - id: watcher
    source: { kind: fswatch, path: /srv/repo/src, patterns: ["**/*.rs"] }
    workflow: ./workflows/lint.yaml
    workspace: /srv/repo
  - id: every-hour
    source: { kind: interval, every: 1h }
    workflow: ./workflows/sweep.yaml
    workspace: /srv/repo
  - id: manual
    source: { kind: command }
    workflow: ./workflows/manual.yaml
    workspace: /srv/repo
    enabled: false
"#;

fn parse(yaml: &str) -> DaemonConfig {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn parses_all_source_kinds() {
    let config = parse(FULL);
    assert_eq!(config.triggers.len(), 5);
    assert!(matches!(config.triggers[0].source, SourceConfig::Cron { .. }));
    assert!(matches!(config.triggers[1].source, SourceConfig::Webhook { .. }));
    assert!(matches!(config.triggers[2].source, SourceConfig::Fswatch { .. }));
    assert!(matches!(config.triggers[3].source, SourceConfig::Interval { .. }));
    assert!(matches!(config.triggers[4].source, SourceConfig::Command {}));
}

#[test]
fn trigger_fields_parse() {
    let config = parse(FULL);
    let nightly = &config.triggers[0];
    assert!(nightly.enabled);
    assert_eq!(nightly.cooldown, Some(Duration::from_secs(600)));
    assert_eq!(nightly.env.get("CI").map(String::as_str), Some("1"));
    let evaluate = nightly.evaluate.as_ref().unwrap();
    assert_eq!(evaluate.worker, WorkerKind::Custom);

    let on_push = &config.triggers[1];
    let analyzer = on_push.analyzer.as_ref().unwrap();
    assert_eq!(analyzer.worker, WorkerKind::ClaudeCode);
    assert_eq!(analyzer.outputs, vec!["notes.md"]);

    assert!(!config.triggers[4].enabled);
}

#[test]
fn top_level_fields_parse() {
    let config = parse(FULL);
    assert_eq!(config.max_history, Some(25));
    assert_eq!(config.webhook_addr.as_deref(), Some("127.0.0.1:9944"));
    assert_eq!(config.core.argv, vec!["roboppid", "core"]);
}

#[test]
fn empty_config_is_valid() {
    let config = parse("{}");
    assert!(config.triggers.is_empty());
    assert!(config.core.argv.is_empty());
}

#[test]
fn duplicate_trigger_ids_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        r#"
triggers:
  - id: dup
    source: { kind: command }
    workflow: a.yaml
    workspace: /tmp
  - id: dup
    source: { kind: command }
    workflow: b.yaml
    workspace: /tmp
"#,
    )
    .unwrap();
    assert!(matches!(DaemonConfig::load(&path), Err(ConfigError::DuplicateTrigger(_))));
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(serde_yaml::from_str::<DaemonConfig>("bogus: true").is_err());
}

#[test]
fn bad_duration_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        r#"
triggers:
  - id: t
    source: { kind: interval, every: 5d }
    workflow: a.yaml
    workspace: /tmp
"#,
    )
    .unwrap();
    assert!(matches!(DaemonConfig::load(&path), Err(ConfigError::Yaml { .. })));
}
