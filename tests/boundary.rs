//! Architectural boundary check: every query built in `src/db` must bind
//! values through `sqlx`'s parameter placeholders, never interpolate a
//! caller-controlled string directly into the query text.

use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if let Ok(read_dir) = fs::read_dir(&dir) {
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
                    files.push(path);
                }
            }
        }
    }
    files
}

#[test]
fn db_layer_never_formats_query_arguments_into_sql_text() {
    let db_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src").join("db");
    let mut offenders = Vec::new();

    for file in collect_rs_files(&db_root) {
        let source = fs::read_to_string(&file).unwrap();
        for (lineno, line) in source.lines().enumerate() {
            let trimmed = line.trim_start();
            // A `format!`/`push_str` feeding straight into `sqlx::query(...)` or
            // `QueryBuilder::push(...)` (as opposed to `push_bind`) would let a
            // caller-controlled string reach the query text unparameterized.
            if (trimmed.starts_with("sqlx::query(") || trimmed.contains(".push(format!"))
                && line.contains("format!")
            {
                offenders.push(format!("{}:{}: {}", file.display(), lineno + 1, trimmed));
            }
        }
    }

    assert!(
        offenders.is_empty(),
        "found query text built with format! instead of a bound parameter: {offenders:#?}"
    );
}

#[test]
fn cache_key_builders_namespace_every_key() {
    let cache_mod = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("cache")
        .join("mod.rs");
    let source = fs::read_to_string(&cache_mod).unwrap();
    assert!(
        source.contains("fn namespaced"),
        "cache layer must funnel every key through a namespacing helper"
    );
}
