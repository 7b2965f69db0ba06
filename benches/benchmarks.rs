//! Benchmarks for commit-hooks.

#![allow(missing_docs)]
#![allow(let_underscore_drop)]

use commit_hooks::config::CommitMsgConfig;
use commit_hooks::manifest::{lint, validate, Manifest};
use commit_hooks::CommitMessage;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_message_formatting(c: &mut Criterion) {
    let config = CommitMsgConfig::default();
    let formatter =
        CommitMessage::new(&config, Some("feat/ABC-123/my_feat")).expect("create formatter");

    c.bench_function("format_from_branch", |b| {
        b.iter(|| formatter.format(black_box("my message here\n\nbody text\n")));
    });

    c.bench_function("format_with_type_prefix", |b| {
        b.iter(|| formatter.format(black_box("fix: my message here")));
    });
}

fn benchmark_config_parsing(c: &mut Criterion) {
    let toml_content = r#"
[commit_msg]
types = ["fix", "feat", "chore"]
skip_prefixes = ["skip"]

[manifest]
resolve_timeout = "30s"
"#;

    c.bench_function("config_parsing", |b| {
        b.iter(|| {
            let result: commit_hooks::Config =
                toml::from_str(black_box(toml_content)).expect("parse config");
            black_box(result)
        });
    });
}

fn benchmark_manifest(c: &mut Criterion) {
    let document = Manifest::default_document();

    c.bench_function("manifest_parsing", |b| {
        b.iter(|| Manifest::parse(black_box(document)).expect("parse manifest"));
    });

    let manifest = Manifest::default();
    c.bench_function("manifest_check", |b| {
        b.iter(|| {
            let mut report = validate::validate(black_box(&manifest));
            report.merge(lint::lint(&manifest));
            black_box(report)
        });
    });
}

criterion_group!(
    benches,
    benchmark_message_formatting,
    benchmark_config_parsing,
    benchmark_manifest
);
criterion_main!(benches);
