use criterion::{black_box, criterion_group, criterion_main, Criterion};

use std::path::Path;

use gradebook_core::parser::{parse_draft_str, validate_draft};

fn bench_parse_draft(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_draft");

    let small = r#"
exams = [5.0]

[evaluation]
student = "Ana"
subject = "Math"
policy = "tasks+exam"
task_weight_fraction = 0.4

[[tasks]]
title = "Homework 1"
score = 8.0
"#;

    let large = {
        let mut s = String::from(
            "exams = [5.0, 7.5, 9.0]\n\n[evaluation]\nsubject = \"Math\"\npolicy = \"tasks-only\"\n",
        );
        for i in 0..200 {
            s.push_str(&format!(
                "\n[[tasks]]\ntitle = \"Task {i}\"\nscore = {}.0\nweight = {}.0\n",
                i % 10,
                i % 3 + 1
            ));
        }
        s
    };

    let path = Path::new("bench.toml");

    group.bench_function("small", |b| {
        b.iter(|| parse_draft_str(black_box(small), path))
    });
    group.bench_function("200_tasks", |b| {
        b.iter(|| parse_draft_str(black_box(&large), path))
    });

    let parsed = parse_draft_str(&large, path).unwrap();
    group.bench_function("validate_200_tasks", |b| {
        b.iter(|| validate_draft(black_box(&parsed)))
    });

    group.finish();
}

criterion_group!(benches, bench_parse_draft);
criterion_main!(benches);
