//! Memo aggregate: one free-form scratch note per owner.

use crate::model::aggregate::{merge_field, Aggregate, AggregateKind, OwnerScoped};
use crate::model::identifier::AggregateId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub id: AggregateId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub last_modified_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoPatch {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl Aggregate for Memo {
    type Patch = MemoPatch;

    const KIND: AggregateKind = AggregateKind::Memo;
    const OWNER_KEYED: bool = true;

    fn id(&self) -> &AggregateId {
        &self.id
    }

    fn set_id(&mut self, id: AggregateId) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: MemoPatch) {
        merge_field(&mut self.title, patch.title);
        merge_field(&mut self.body, patch.body);
    }

    fn last_modified_at(&self) -> i64 {
        self.last_modified_at
    }

    fn set_last_modified_at(&mut self, at_ms: i64) {
        self.last_modified_at = at_ms;
    }
}

impl OwnerScoped for Memo {
    const LEGACY_FIELDS: &'static [&'static str] = &["memo_title", "memo_text"];

    fn defaults(owner_id: &str) -> Self {
        Self {
            id: AggregateId::durable(owner_id),
            title: String::new(),
            body: String::new(),
            last_modified_at: 0,
        }
    }

    fn from_legacy(owner_id: &str, fields: &BTreeMap<String, String>) -> Self {
        let mut memo = Self::defaults(owner_id);
        merge_field(&mut memo.title, fields.get("memo_title").cloned());
        merge_field(&mut memo.body, fields.get("memo_text").cloned());
        memo
    }
}
