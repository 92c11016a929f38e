use std::collections::HashMap;

use chrono::Utc;
use sha1::{Digest, Sha1};
use tracing::debug;
use url::Url;

use crate::detect::field_model::FieldCandidate;
use crate::plan::plan_model::{FillPlan, SiteMemory, SiteMemoryMapping};

/// Fingerprint of a form's shape: role and name/id of every candidate,
/// in scan order.
pub fn structure_hash(candidates: &[FieldCandidate]) -> String {
    let mut hasher = Sha1::new();
    for candidate in candidates {
        hasher.update(candidate.role.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(candidate.hints.name_or_id.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Site identity of a page: host plus any non-default port, the way a
/// browser reports `location.host`. Hostless URLs have no site.
pub fn host_from_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str().filter(|h| !h.is_empty())?;
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Confirmed mappings per host, kept for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct SiteMemoryStore {
    sites: HashMap<String, SiteMemory>,
}

impl SiteMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, host: &str) -> Option<&SiteMemory> {
        self.sites.get(host)
    }

    pub fn insert(&mut self, memory: SiteMemory) {
        self.sites.insert(memory.host.clone(), memory);
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Remember confident, mapped entries of an applied plan. Entries for
    /// the same element replace older mappings.
    pub fn remember(
        &mut self,
        host: &str,
        candidates: &[FieldCandidate],
        plan: &FillPlan,
        min_confidence: f64,
    ) {
        let now = Utc::now();
        let hash = structure_hash(candidates);

        let memory = self
            .sites
            .entry(host.to_string())
            .or_insert_with(|| SiteMemory {
                host: host.to_string(),
                structure_hash: hash.clone(),
                last_used: now,
                mappings: vec![],
            });

        if memory.structure_hash != hash {
            debug!(host, "form structure changed, dropping old mappings");
            memory.mappings.clear();
            memory.structure_hash = hash;
        }
        memory.last_used = now;

        for entry in plan {
            if entry.target_key.is_unknown() || entry.confidence < min_confidence {
                continue;
            }
            memory.mappings.retain(|m| m.el_key != entry.el_key);
            memory.mappings.push(SiteMemoryMapping {
                el_key: entry.el_key.clone(),
                target_key: entry.target_key.as_str().to_string(),
                confidence: entry.confidence,
                last_confirmed: now,
            });
        }
    }
}
