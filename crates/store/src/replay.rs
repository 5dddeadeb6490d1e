//! Folding a node's record logs into the live [`Node`]/[`NodeMeta`] view
//!.

use crate::log::read_lines;
use crate::paths::{meta_log_path, node_log_path};
use kg_core::{Bullet, BulletRecord, MetaRecord, Node, NodeMeta, VoteTally};
use std::collections::HashMap;
use std::path::Path;

/// Replay `<root>/nodes/<slug>/node.jsonl` and `meta.jsonl` into a [`Node`].
/// Unparseable lines are logged and skipped, never fatal.
pub fn replay_node(root: &Path, slug: &str) -> std::io::Result<Node> {
    let mut order: Vec<String> = Vec::new();
    let mut bullets: HashMap<String, Bullet> = HashMap::new();

    for line in read_lines(&node_log_path(root, slug))? {
        let record: BulletRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(slug, %line, error = %e, "skipping unparseable bullet record");
                continue;
            }
        };
        match record {
            BulletRecord::Add { id, text, kind, ts } => {
                if !bullets.contains_key(&id) {
                    order.push(id.clone());
                }
                bullets.insert(
                    id.clone(),
                    Bullet {
                        id,
                        slug: slug.to_string(),
                        text,
                        kind,
                        created_at: ts,
                        updated_at: ts,
                        tombstoned: false,
                    },
                );
            }
            BulletRecord::Update { id, text, ts } => {
                if let Some(b) = bullets.get_mut(&id) {
                    b.text = text;
                    b.updated_at = ts;
                }
            }
            BulletRecord::Delete { id, ts } => {
                if let Some(b) = bullets.get_mut(&id) {
                    b.tombstoned = true;
                    b.updated_at = ts;
                }
            }
            // Unknown ops are preserved on disk but ignored for the live view
            //.
            BulletRecord::Unknown => {}
        }
    }

    let bullet_list = order
        .into_iter()
        .filter_map(|id| bullets.remove(&id))
        .collect();

    let meta = replay_meta(root, slug)?;

    Ok(Node {
        slug: slug.to_string(),
        bullets: bullet_list,
        meta,
    })
}

/// Replay `meta.jsonl` into a [`NodeMeta`]. `served_budget` is intentionally
/// left at zero here: it is not reconstructable from the meta log (only the
/// `reviewed` record's *timestamp* is), it's accrued and persisted
/// separately by `kg-index::budget` and merged in by callers that need the
/// full counter.
pub fn replay_meta(root: &Path, slug: &str) -> std::io::Result<NodeMeta> {
    let mut meta = NodeMeta::default();

    for line in read_lines(&meta_log_path(root, slug))? {
        let record: MetaRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(slug, %line, error = %e, "skipping unparseable meta record");
                continue;
            }
        };
        match record {
            MetaRecord::Vote {
                target_id,
                sign,
                ts: _,
            } => {
                let tally = meta.votes.entry(target_id).or_insert_with(VoteTally::default);
                match sign {
                    kg_core::VoteSign::Useful => tally.useful += 1,
                    kg_core::VoteSign::Harmful => tally.harmful += 1,
                }
            }
            MetaRecord::Reviewed { ts } => {
                meta.cleared_at = Some(ts);
            }
            MetaRecord::Unknown => {}
        }
    }

    Ok(meta)
}
