//! Backend response shapes for the QR check-in endpoints
//!
//! The backend returns a handful of loosely typed bodies. Each is modelled as
//! a struct with lenient defaults plus an `extra` bag, and
//! [`ResponseVariant::classify`] picks the variant from the body's shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/* -------------------------------------------------------------------------- */
/* Participant & Team */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantInfo {
    pub id: i64,
    pub f_name: String,
    pub l_name: String,
    pub email: String,
    pub phone: String,
    pub age: Option<u32>,
    pub institution: String,
    pub institution_id: String,
    pub address: String,
    pub payment_verified: bool,
    pub segment_list: Vec<String>,
    pub comp_list: Vec<String>,
    pub gift_list: Vec<String>,
    pub entry_status: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParticipantInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.f_name, self.l_name).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMember {
    pub id: i64,
    pub f_name: String,
    pub l_name: String,
    pub email: String,
    pub phone: String,
    pub age: Option<u32>,
    pub institution: String,
    pub institution_id: String,
    pub is_leader: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamInfo {
    pub id: i64,
    pub team_name: String,
    pub payment_verified: bool,
    pub comp_list: Vec<String>,
    pub gift_list: Vec<String>,
    pub entry_status: bool,
    pub members: Vec<TeamMember>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TeamInfo {
    pub fn leader(&self) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.is_leader)
    }
}

/* -------------------------------------------------------------------------- */
/* Generic, Entry & Gifts */
/* -------------------------------------------------------------------------- */

/// Result of a `/api/<page>/[<segment>/]<qr>/` access check
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericCheck {
    pub allowed: bool,
    pub name: Option<String>,
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of `POST /api/recordentry/<qr>/`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryResult {
    pub success: bool,
    pub error: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Remaining gift counts keyed by gift name (`tshirt`, `breakfast`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GiftInventory {
    pub counts: BTreeMap<String, i64>,
}

impl GiftInventory {
    pub fn count(&self, gift: &str) -> Option<i64> {
        self.counts.get(gift).copied()
    }

    /// Gifts with at least one unit left
    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.counts.iter().filter(|(_, n)| **n > 0).map(|(name, _)| name.as_str())
    }
}

/* -------------------------------------------------------------------------- */
/* Classification */
/* -------------------------------------------------------------------------- */

/// Classified backend response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum ResponseVariant {
    Participant(ParticipantInfo),
    Team(TeamInfo),
    Generic(GenericCheck),
    Gifts(GiftInventory),
    Entry(EntryResult),
    Unrecognized(Value),
}

impl ResponseVariant {
    /// Pick a variant from the body's shape.
    ///
    /// `participant` key, then `team`, `allowed`, `success`; an object whose
    /// values are all integers is a gift inventory. Bodies that match a key
    /// but fail to deserialize fall through to `Unrecognized`.
    pub fn classify(body: Value) -> Self {
        let Value::Object(map) = &body else {
            return Self::Unrecognized(body);
        };

        if let Some(participant) = map.get("participant") {
            if let Ok(info) = serde_json::from_value(participant.clone()) {
                return Self::Participant(info);
            }
        } else if let Some(team) = map.get("team") {
            if let Ok(info) = serde_json::from_value(team.clone()) {
                return Self::Team(info);
            }
        } else if map.contains_key("allowed") {
            if let Ok(check) = serde_json::from_value(body.clone()) {
                return Self::Generic(check);
            }
        } else if map.contains_key("success") {
            if let Ok(entry) = serde_json::from_value(body.clone()) {
                return Self::Entry(entry);
            }
        } else if !map.is_empty() && map.values().all(|v| v.is_i64()) {
            if let Ok(gifts) = serde_json::from_value(body.clone()) {
                return Self::Gifts(gifts);
            }
        }

        Self::Unrecognized(body)
    }

    /// Human-readable error carried by the body, if any
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Generic(check) => check.error.clone(),
            Self::Entry(entry) => entry.error.as_ref().map(|errors| errors.join(", ")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_classify_participant() {
        let body = json!({
            "participant": {
                "id": 12,
                "f_name": "Ada",
                "l_name": "Lovelace",
                "email": "ada@example.org",
                "payment_verified": true,
                "segment_list": ["robotics"],
                "entry_status": false,
                "shirt_size": "M"
            }
        });
        let ResponseVariant::Participant(info) = ResponseVariant::classify(body) else {
            panic!("expected participant");
        };
        assert_eq!(info.full_name(), "Ada Lovelace");
        assert_eq!(info.segment_list, vec!["robotics"]);
        assert_eq!(info.extra.get("shirt_size"), Some(&json!("M")));
    }

    #[test]
    fn test_classify_team_with_leader() {
        let body = json!({
            "team": {
                "id": 3,
                "team_name": "Byte Club",
                "members": [
                    {"id": 1, "f_name": "A", "is_leader": false},
                    {"id": 2, "f_name": "B", "is_leader": true}
                ]
            }
        });
        let ResponseVariant::Team(team) = ResponseVariant::classify(body) else {
            panic!("expected team");
        };
        assert_eq!(team.leader().map(|m| m.id), Some(2));
    }

    #[test]
    fn test_classify_generic_entry_and_gifts() {
        let generic = ResponseVariant::classify(json!({"allowed": false, "error": "already in"}));
        assert_eq!(generic.error_message().as_deref(), Some("already in"));
        assert!(matches!(generic, ResponseVariant::Generic(_)));

        let entry = ResponseVariant::classify(json!({"success": false, "error": ["paid?", "qr?"]}));
        assert_eq!(entry.error_message().as_deref(), Some("paid?, qr?"));

        let gifts = ResponseVariant::classify(json!({"tshirt": 1, "breakfast": 0, "snacks": 2}));
        let ResponseVariant::Gifts(inventory) = gifts else {
            panic!("expected gifts");
        };
        assert_eq!(inventory.count("breakfast"), Some(0));
        assert_eq!(inventory.available().collect::<Vec<_>>(), vec!["snacks", "tshirt"]);
    }

    #[test]
    fn test_classify_unrecognized() {
        assert!(matches!(ResponseVariant::classify(json!([1, 2])), ResponseVariant::Unrecognized(_)));
        assert!(matches!(ResponseVariant::classify(json!({})), ResponseVariant::Unrecognized(_)));
        assert!(matches!(
            ResponseVariant::classify(json!({"detail": "Not found."})),
            ResponseVariant::Unrecognized(_)
        ));
    }
}
