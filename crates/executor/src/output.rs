//! Responses to [`crate::command::Command`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHitOut {
    pub bullet_id: String,
    pub slug: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatus {
    pub slug: String,
    pub live_bullet_count: usize,
    pub served_budget: u64,
    pub flagged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub nodes: Vec<NodeStatus>,
    pub calibration_due: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Output {
    Context { text: String, partial: bool },
    Search { hits: Vec<SearchHitOut> },
    Show { text: String },
    BulletAdded { bullet_id: String },
    Status(StatusReport),
    Ok,
}
