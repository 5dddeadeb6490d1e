//! On-disk record format: one JSON object per line, tagged by
//! `op`. `kg-store` appends these; `kg-store::replay` folds them into
//! [`crate::model::Node`]/[`crate::model::NodeMeta`].

use crate::model::BulletKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single line of `node.jsonl`: an operation against a bullet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BulletRecord {
    Add {
        id: String,
        text: String,
        kind: BulletKind,
        ts: DateTime<Utc>,
    },
    Update {
        id: String,
        text: String,
        ts: DateTime<Utc>,
    },
    Delete {
        id: String,
        ts: DateTime<Utc>,
    },
    /// Forward-compatibility: an op this binary doesn't know about yet.
    /// Preserved verbatim on rewrite (never happens — logs are append-only),
    /// ignored for the live view.
    #[serde(other)]
    Unknown,
}

impl BulletRecord {
    /// The bullet id this record targets, if any (absent for `Unknown`).
    pub fn bullet_id(&self) -> Option<&str> {
        match self {
            BulletRecord::Add { id, .. } => Some(id),
            BulletRecord::Update { id, .. } => Some(id),
            BulletRecord::Delete { id, .. } => Some(id),
            BulletRecord::Unknown => None,
        }
    }

    pub fn ts(&self) -> Option<DateTime<Utc>> {
        match self {
            BulletRecord::Add { ts, .. } => Some(*ts),
            BulletRecord::Update { ts, .. } => Some(*ts),
            BulletRecord::Delete { ts, .. } => Some(*ts),
            BulletRecord::Unknown => None,
        }
    }
}

/// A single line of `meta.jsonl`: a vote or a review marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MetaRecord {
    Vote {
        target_id: String,
        sign: VoteSign,
        ts: DateTime<Utc>,
    },
    Reviewed {
        ts: DateTime<Utc>,
    },
    #[serde(other)]
    Unknown,
}

/// `+1` or `-1`, serialized as the bare integer spec.md §6 specifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum VoteSign {
    Harmful = -1,
    Useful = 1,
}

// serde_repr isn't in the dependency set the teacher's stack already pulls
// in; a two-variant enum is simple enough to hand-roll the same contract
// without adding a crate for it.
mod vote_sign_serde {
    use super::VoteSign;
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for VoteSign {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            (*self as i8).serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for VoteSign {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let raw = i8::deserialize(deserializer)?;
            match raw {
                1 => Ok(VoteSign::Useful),
                -1 => Ok(VoteSign::Harmful),
                other => Err(D::Error::custom(format!("invalid vote sign {other}"))),
            }
        }
    }
}
