//! Hook names and the payload the host delivers with them.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::EVIDENCE_CREATE_HOOK;

/// `object_type` tag carried by evidence records in a hook payload.
pub const EVIDENCE_OBJECT_TYPE: &str = "case_received_file";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookName {
    /// Evidence record committed to the database.
    OnPostloadEvidenceCreate,
    /// Any hook this module does not act on.
    Other(String),
}

impl HookName {
    pub fn as_str(&self) -> &str {
        match self {
            HookName::OnPostloadEvidenceCreate => EVIDENCE_CREATE_HOOK,
            HookName::Other(name) => name,
        }
    }
}

impl FromStr for HookName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            EVIDENCE_CREATE_HOOK => HookName::OnPostloadEvidenceCreate,
            other => HookName::Other(other.to_string()),
        })
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence record (`CaseReceivedFile` in the host).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: i64,
    #[serde(default)]
    pub case_id: Option<i64>,
    /// SHA-256 of the evidence content.
    #[serde(default)]
    pub file_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Evidence {
    /// Hash with surrounding whitespace removed; `None` when absent or blank.
    pub fn hash(&self) -> Option<&str> {
        self.file_hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }

    /// Case id, treating the host's `0` placeholder as absent.
    pub fn case(&self) -> Option<i64> {
        self.case_id.filter(|id| *id != 0)
    }
}

/// One object of a hook payload.
///
/// Every variant keeps the object exactly as the host sent it so the payload
/// can be handed back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum HookObject {
    Evidence { evidence: Evidence, raw: Value },
    /// Tagged as evidence but not readable as one.
    Malformed { raw: Value, error: String },
    Other(Value),
}

impl HookObject {
    pub fn as_evidence(&self) -> Option<&Evidence> {
        match self {
            HookObject::Evidence { evidence, .. } => Some(evidence),
            HookObject::Malformed { .. } | HookObject::Other(_) => None,
        }
    }

    /// True for objects carrying the evidence `object_type`, readable or not.
    pub fn is_evidence_record(&self) -> bool {
        !matches!(self, HookObject::Other(_))
    }

    pub fn raw(&self) -> &Value {
        match self {
            HookObject::Evidence { raw, .. } | HookObject::Malformed { raw, .. } => raw,
            HookObject::Other(raw) => raw,
        }
    }

    /// Classify one object. Never fails: unreadable evidence is kept as
    /// [`HookObject::Malformed`].
    pub fn from_value(raw: Value) -> Self {
        let is_evidence = raw
            .get("object_type")
            .and_then(Value::as_str)
            .is_some_and(|t| t == EVIDENCE_OBJECT_TYPE);
        if !is_evidence {
            return HookObject::Other(raw);
        }
        match Evidence::deserialize(&raw) {
            Ok(evidence) => HookObject::Evidence { evidence, raw },
            Err(err) => HookObject::Malformed {
                raw,
                error: err.to_string(),
            },
        }
    }
}

impl From<Evidence> for HookObject {
    fn from(evidence: Evidence) -> Self {
        let mut raw = json!({
            "object_type": EVIDENCE_OBJECT_TYPE,
            "id": evidence.id,
            "case_id": evidence.case_id,
            "file_hash": evidence.file_hash,
        });
        if let (Some(filename), Value::Object(map)) = (&evidence.filename, &mut raw) {
            map.insert("filename".to_string(), Value::String(filename.clone()));
        }
        HookObject::Evidence { evidence, raw }
    }
}

impl<'de> Deserialize<'de> for HookObject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(HookObject::from_value)
    }
}

impl Serialize for HookObject {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.raw().serialize(serializer)
    }
}

/// Hook data: the host sends either one object or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HookPayload {
    Many(Vec<HookObject>),
    Single(HookObject),
}

impl<'de> Deserialize<'de> for HookPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => {
                HookPayload::Many(items.into_iter().map(HookObject::from_value).collect())
            }
            other => HookPayload::Single(HookObject::from_value(other)),
        })
    }
}

impl HookPayload {
    pub fn objects(&self) -> &[HookObject] {
        match self {
            HookPayload::Many(objects) => objects,
            HookPayload::Single(object) => std::slice::from_ref(object),
        }
    }

    /// Readable evidence records contained in the payload, in order.
    pub fn evidences(&self) -> Vec<&Evidence> {
        self.objects()
            .iter()
            .filter_map(HookObject::as_evidence)
            .collect()
    }
}

impl From<Vec<Evidence>> for HookPayload {
    fn from(evidences: Vec<Evidence>) -> Self {
        HookPayload::Many(evidences.into_iter().map(HookObject::from).collect())
    }
}
