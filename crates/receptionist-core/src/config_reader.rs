//! Traced configuration reads (spec.md §6.9).
//!
//! Every config access made through [`AwConfigReader`] is recorded with its
//! path, the value returned, and whether a caller-supplied default had to be
//! substituted — so a turn's audit record (`receptionist-audit`) can explain
//! exactly which tenant settings shaped the reply.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::config::Company;
use crate::error::{CoreError, Result};

/// One recorded config access.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigAccessRecord {
    pub path: String,
    pub value: Value,
    pub used_default: bool,
}

/// Read-only, per-turn traced view over a tenant's [`Company`] config.
///
/// Construct once per turn from the (cached) `Company` and discard at the
/// end of the turn — the access log is meant to be drained into that turn's
/// audit record, not accumulated across turns.
pub struct AwConfigReader {
    root: Value,
    log: Mutex<Vec<ConfigAccessRecord>>,
}

impl AwConfigReader {
    pub fn new(company: &Company) -> Result<Self> {
        let root = serde_json::to_value(company).map_err(CoreError::Serialization)?;
        Ok(Self {
            root,
            log: Mutex::new(Vec::new()),
        })
    }

    /// Look up a dot-separated path (e.g. `"frontDeskBehavior.escalation.enabled"`,
    /// written against the serde field names — this crate serializes with
    /// `snake_case` field names, so paths use `snake_case` too). Returns
    /// `default` and records `used_default = true` when any segment is
    /// missing or the wrong shape.
    pub fn get(&self, path: &str, default: Value) -> Value {
        let found = self.traverse(path);
        let (value, used_default) = match found {
            Some(v) => (v.clone(), false),
            None => (default, true),
        };
        self.record(path, &value, used_default);
        value
    }

    pub fn get_string(&self, path: &str, default: &str) -> String {
        self.get(path, Value::String(default.to_string()))
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        self.get(path, Value::Bool(default))
            .as_bool()
            .unwrap_or(default)
    }

    pub fn get_array(&self, path: &str) -> Vec<Value> {
        self.get(path, Value::Array(Vec::new()))
            .as_array()
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_object(&self, path: &str) -> serde_json::Map<String, Value> {
        self.get(path, Value::Object(serde_json::Map::new()))
            .as_object()
            .cloned()
            .unwrap_or_default()
    }

    /// Drain and return every access recorded so far (used by the turn
    /// orchestrator to attach `config_access` entries to the audit record).
    pub fn drain_log(&self) -> Vec<ConfigAccessRecord> {
        let mut log = self.log.lock().expect("config access log poisoned");
        std::mem::take(&mut *log)
    }

    fn traverse(&self, path: &str) -> Option<&Value> {
        let mut cur = &self.root;
        for segment in path.split('.') {
            cur = cur.get(segment)?;
        }
        Some(cur)
    }

    fn record(&self, path: &str, value: &Value, used_default: bool) {
        trace!(path, used_default, "config read");
        let mut log = self.log.lock().expect("config access log poisoned");
        log.push(ConfigAccessRecord {
            path: path.to_string(),
            value: value.clone(),
            used_default,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrontDeskBehavior;

    fn sample_company() -> Company {
        Company {
            company_id: "c1".into(),
            name: "Acme HVAC".into(),
            trade: "hvac".into(),
            service_areas: vec!["Fort Myers".into()],
            front_desk_behavior: FrontDeskBehavior {
                booking_slots: Vec::new(),
                conversation_stages: Default::default(),
                detection_triggers: Default::default(),
                discovery_consent: Default::default(),
                name_spelling_variants: Default::default(),
                fast_path_booking: Default::default(),
                booking_outcome: Default::default(),
                escalation: Default::default(),
                loop_prevention: Default::default(),
                access_flow: Default::default(),
                caller_vocabulary: Default::default(),
                filler_words: Default::default(),
                name_stop_words: Vec::new(),
                common_first_names: Vec::new(),
                stt_protected_words: Vec::new(),
                booking_abort_phrases: Vec::new(),
                silence_prompts: Vec::new(),
                silence_transfer_after: 3,
            },
            calendar_config: Default::default(),
            sms_config: Default::default(),
        }
    }

    #[test]
    fn known_path_reads_value_without_default() {
        let company = sample_company();
        let reader = AwConfigReader::new(&company).unwrap();
        let name = reader.get_string("name", "fallback");
        assert_eq!(name, "Acme HVAC");
        let log = reader.drain_log();
        assert_eq!(log.len(), 1);
        assert!(!log[0].used_default);
    }

    #[test]
    fn missing_path_falls_back_and_is_flagged() {
        let company = sample_company();
        let reader = AwConfigReader::new(&company).unwrap();
        let v = reader.get_string("front_desk_behavior.nonexistent_field", "safe-default");
        assert_eq!(v, "safe-default");
        let log = reader.drain_log();
        assert!(log[0].used_default);
    }
}
