// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::observability::messages::cache::L2Corrupt;
use crate::observability::messages::StructuredLog;
use crate::tree::Value;

#[derive(Serialize, Deserialize)]
struct Record {
    key: String,
    value: Value,
}

/// On-disk cache tier backed by an append-only JSON-lines log. Reads
/// rebuild an in-memory index by replaying the log once at startup;
/// writes append a new record rather than rewriting the file. A
/// truncated final line (a write that was interrupted mid-flush) is
/// dropped rather than failing the whole load.
pub struct L2Cache {
    path: PathBuf,
    index: Mutex<HashMap<String, Value>>,
    file: Mutex<File>,
}

impl L2Cache {
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).read(true).open(&path)?;
        let index = Mutex::new(Self::replay(&path)?);
        Ok(L2Cache { path, index, file: Mutex::new(file) })
    }

    fn replay(path: &PathBuf) -> std::io::Result<HashMap<String, Value>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e),
        };
        let reader = BufReader::new(file);
        let mut index = HashMap::new();
        let mut recovered = 0usize;
        let mut corrupt = 0usize;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(&line) {
                Ok(record) => {
                    index.insert(record.key, record.value);
                    recovered += 1;
                }
                Err(_) => corrupt += 1,
            }
        }
        if corrupt > 0 {
            L2Corrupt {
                path: &path.display().to_string(),
                recovered_entries: recovered,
            }
            .log();
        }
        Ok(index)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.index.lock().get(key).cloned()
    }

    pub fn put(&self, key: String, value: Value) -> std::io::Result<()> {
        let record = Record { key: key.clone(), value: value.clone() };
        let line = serde_json::to_string(&record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        {
            let mut file = self.file.lock();
            writeln!(file, "{line}")?;
            file.flush()?;
        }
        self.index.lock().insert(key, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.lock().is_empty()
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = L2Cache::open(dir.path().join("cache.jsonl")).unwrap();
        cache.put("ex:1".to_string(), Value::String("hi".into())).unwrap();
        assert_eq!(cache.get("ex:1"), Some(Value::String("hi".into())));
    }

    #[test]
    fn reopening_replays_prior_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.jsonl");
        {
            let cache = L2Cache::open(path.clone()).unwrap();
            cache.put("ex:1".to_string(), Value::Int(7)).unwrap();
        }
        let reopened = L2Cache::open(path).unwrap();
        assert_eq!(reopened.get("ex:1"), Some(Value::Int(7)));
    }

    #[test]
    fn truncated_trailing_line_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.jsonl");
        {
            let cache = L2Cache::open(path.clone()).unwrap();
            cache.put("ex:1".to_string(), Value::Int(1)).unwrap();
        }
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{\"key\":\"ex:2\",\"valu").unwrap();
        }
        let reopened = L2Cache::open(path).unwrap();
        assert_eq!(reopened.get("ex:1"), Some(Value::Int(1)));
        assert_eq!(reopened.get("ex:2"), None);
    }
}
