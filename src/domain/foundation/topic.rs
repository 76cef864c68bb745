//! Typed notification topics and entity references.
//!
//! A topic is the address of a notification channel. Keeping the entity
//! kind in the type (rather than embedding raw ids in strings) prevents
//! collisions between, say, a tender and a workflow that share an id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{BidId, OrgId, TenderId, ValidationError, WorkflowId};

/// Kind tag for an entity a workflow can be linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tender,
    Bid,
    Emd,
    Contract,
    Vendor,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Tender => "tender",
            EntityKind::Bid => "bid",
            EntityKind::Emd => "emd",
            EntityKind::Contract => "contract",
            EntityKind::Vendor => "vendor",
        };
        write!(f, "{}", s)
    }
}

/// Reference to an external entity by kind and id.
///
/// Workflows hold one of these for the entity they approve; they never
/// mutate the referent directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    /// Creates an entity reference.
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    /// Reference to a tender.
    pub fn tender(id: TenderId) -> Self {
        Self::new(EntityKind::Tender, *id.as_uuid())
    }

    /// Reference to a bid.
    pub fn bid(id: BidId) -> Self {
        Self::new(EntityKind::Bid, *id.as_uuid())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Addressable notification channel.
///
/// Serialized as `kind:uuid` (or the bare word `broadcast`), which is
/// also the wire form used in subscribe requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// All events concerning one tender (bids, EMDs, approvals).
    Tender(TenderId),
    /// Events for a single bid.
    Bid(BidId),
    /// Events for a single workflow instance.
    Workflow(WorkflowId),
    /// Organization-wide channel (escalations, supervisory signals).
    Org(OrgId),
    /// Platform-wide announcements.
    Broadcast,
}

impl Topic {
    /// Topic carrying events for a linked entity, if that kind has a
    /// live channel. EMDs, contracts, and vendors are observed through
    /// their tender/org channels instead.
    pub fn for_entity(entity: &EntityRef) -> Option<Topic> {
        match entity.kind {
            EntityKind::Tender => Some(Topic::Tender(TenderId::from_uuid(entity.id))),
            EntityKind::Bid => Some(Topic::Bid(BidId::from_uuid(entity.id))),
            EntityKind::Emd | EntityKind::Contract | EntityKind::Vendor => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Tender(id) => write!(f, "tender:{}", id),
            Topic::Bid(id) => write!(f, "bid:{}", id),
            Topic::Workflow(id) => write!(f, "workflow:{}", id),
            Topic::Org(id) => write!(f, "org:{}", id),
            Topic::Broadcast => write!(f, "broadcast"),
        }
    }
}

impl FromStr for Topic {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "broadcast" {
            return Ok(Topic::Broadcast);
        }
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ValidationError::invalid_format("topic", format!("'{}'", s)))?;
        let parse_uuid = |raw: &str| {
            Uuid::parse_str(raw)
                .map_err(|_| ValidationError::invalid_format("topic", format!("bad id in '{}'", s)))
        };
        match kind {
            "tender" => Ok(Topic::Tender(TenderId::from_uuid(parse_uuid(id)?))),
            "bid" => Ok(Topic::Bid(BidId::from_uuid(parse_uuid(id)?))),
            "workflow" => Ok(Topic::Workflow(WorkflowId::from_uuid(parse_uuid(id)?))),
            "org" => Ok(Topic::Org(OrgId::from_uuid(parse_uuid(id)?))),
            _ => Err(ValidationError::invalid_format(
                "topic",
                format!("unknown kind '{}'", kind),
            )),
        }
    }
}

impl Serialize for Topic {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_display_round_trips() {
        let topics = [
            Topic::Tender(TenderId::new()),
            Topic::Bid(BidId::new()),
            Topic::Workflow(WorkflowId::new()),
            Topic::Org(OrgId::new()),
            Topic::Broadcast,
        ];
        for topic in topics {
            let parsed: Topic = topic.to_string().parse().unwrap();
            assert_eq!(topic, parsed);
        }
    }

    #[test]
    fn same_uuid_different_kinds_are_distinct_topics() {
        let raw = Uuid::new_v4();
        let tender = Topic::Tender(TenderId::from_uuid(raw));
        let workflow = Topic::Workflow(WorkflowId::from_uuid(raw));
        assert_ne!(tender, workflow);
        assert_ne!(tender.to_string(), workflow.to_string());
    }

    #[test]
    fn parse_rejects_malformed_topics() {
        assert!("".parse::<Topic>().is_err());
        assert!("tender".parse::<Topic>().is_err());
        assert!("tender:not-a-uuid".parse::<Topic>().is_err());
        assert!(format!("ship:{}", Uuid::new_v4()).parse::<Topic>().is_err());
    }

    #[test]
    fn for_entity_maps_addressable_kinds() {
        let tender_id = TenderId::new();
        let topic = Topic::for_entity(&EntityRef::tender(tender_id)).unwrap();
        assert_eq!(topic, Topic::Tender(tender_id));

        let emd_ref = EntityRef::new(EntityKind::Emd, Uuid::new_v4());
        assert!(Topic::for_entity(&emd_ref).is_none());
    }

    #[test]
    fn topic_serializes_as_string() {
        let id = OrgId::new();
        let json = serde_json::to_string(&Topic::Org(id)).unwrap();
        assert_eq!(json, format!("\"org:{}\"", id));
        let back: Topic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Topic::Org(id));
    }
}
