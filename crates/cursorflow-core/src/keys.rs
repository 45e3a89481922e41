// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! Coordinator key naming (spec §3) and the canonical serialization of `T`
//! (spec §9, open question 1). Every place `T` crosses into a list element
//! or a key suffix goes through `encode`/`decode` here so a live-task list
//! entry and its shadow key are always derived from the identical string.

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

pub fn cursor(name: &str) -> String {
    format!("indexer:{name}")
}

pub fn cursor_lock(name: &str) -> String {
    format!("indexer:{name}:current")
}

pub fn concurrency_list(name: &str) -> String {
    format!("indexer:{name}:concurrency")
}

pub fn shadow(name: &str, encoded_start: &str) -> String {
    format!("indexer:{name}:concurrency:shadow:{encoded_start}")
}

pub fn failed_list(name: &str) -> String {
    format!("indexer:{name}:failed")
}

pub fn epoch(name: &str) -> String {
    format!("indexer:{name}:epoch")
}

/// Canonical encoder for `T`: a single JSON-serialize, used uniformly as
/// list elements and as shadow-key suffixes so `cleanup` can always match a
/// live-list entry to its shadow.
pub fn encode<T: Serialize>(indexer: &str, value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::coordinator(indexer, anyhow::anyhow!("failed to encode cursor value: {e}")))
}

pub fn decode<T: DeserializeOwned>(indexer: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| Error::coordinator(indexer, anyhow::anyhow!("failed to decode cursor value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_indexer_name() {
        assert_eq!(cursor("orders"), "indexer:orders");
        assert_eq!(cursor_lock("orders"), "indexer:orders:current");
        assert_eq!(concurrency_list("orders"), "indexer:orders:concurrency");
        assert_eq!(failed_list("orders"), "indexer:orders:failed");
        assert_eq!(epoch("orders"), "indexer:orders:epoch");
    }

    #[test]
    fn encoding_is_single_pass_and_matches_for_shadow_and_list() {
        let encoded = encode("orders", &20u64).unwrap();
        assert_eq!(encoded, "20");
        assert_eq!(shadow("orders", &encoded), "indexer:orders:concurrency:shadow:20");
        let decoded: u64 = decode("orders", &encoded).unwrap();
        assert_eq!(decoded, 20);
    }
}
