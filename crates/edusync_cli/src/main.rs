//! Cache inspection CLI.
//!
//! # Responsibility
//! - Verify `edusync_core` linkage (`version`).
//! - List, print and clear entries of a SQLite cache file.
//!
//! # Invariants
//! - Exit code is non-zero on any usage or cache error.
//! - Output is plain text, one item per line.

use edusync_core::{core_version, ping, KeyValueStore, SqliteKeyValueStore};
use std::process::ExitCode;

const USAGE: &str = "usage: edusync <version | keys <db> | show <db> <key> | clear <db> <key>>";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<Vec<String>, String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["version"] => Ok(vec![
            format!("edusync_core ping={}", ping()),
            format!("edusync_core version={}", core_version()),
        ]),
        ["keys", db] => open(db)?.keys().map_err(|err| err.to_string()),
        ["show", db, key] => match open(db)?.read(key).map_err(|err| err.to_string())? {
            Some(payload) => Ok(vec![pretty(&payload)]),
            None => Err(format!("no cache entry `{key}`")),
        },
        ["clear", db, key] => {
            let removed = open(db)?.remove(key).map_err(|err| err.to_string())?;
            Ok(vec![format!("removed={removed} key={key}")])
        }
        _ => Err(USAGE.to_string()),
    }
}

fn open(db: &str) -> Result<SqliteKeyValueStore, String> {
    SqliteKeyValueStore::open(db, None).map_err(|err| format!("cannot open cache `{db}`: {err}"))
}

/// Structured records are JSON; legacy single-field values are printed as is.
fn pretty(payload: &str) -> String {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .filter(|value| value.is_object() || value.is_array())
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| payload.to_string())
}

#[cfg(test)]
mod tests {
    use super::{pretty, run};
    use edusync_core::{KeyValueStore, SqliteKeyValueStore};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn version_prints_ping_and_version() {
        let lines = run(&args(&["version"])).unwrap();
        assert_eq!(lines[0], "edusync_core ping=pong");
    }

    #[test]
    fn keys_show_and_clear_operate_on_the_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let db = path.to_str().unwrap();
        let store = SqliteKeyValueStore::open(&path, None).unwrap();
        store.write("memo_text_u1", "Grade essays").unwrap();
        drop(store);

        assert_eq!(run(&args(&["keys", db])).unwrap(), vec!["memo_text_u1"]);
        assert_eq!(
            run(&args(&["show", db, "memo_text_u1"])).unwrap(),
            vec!["Grade essays"]
        );
        assert_eq!(
            run(&args(&["clear", db, "memo_text_u1"])).unwrap(),
            vec!["removed=true key=memo_text_u1"]
        );
        assert!(run(&args(&["show", db, "memo_text_u1"])).is_err());
    }

    #[test]
    fn unknown_command_prints_usage() {
        let err = run(&args(&["sync"])).unwrap_err();
        assert!(err.starts_with("usage:"));
    }

    #[test]
    fn pretty_leaves_plain_text_alone() {
        assert_eq!(pretty("rust, sql"), "rust, sql");
        assert!(pretty(r#"{"a":1}"#).contains('\n'));
    }
}
