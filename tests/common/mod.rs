//! Shared helpers for the root-level black-box test suites.
//!
//! Every test here drives the system through [`kg::Executor::dispatch`]
//! only — no crate internals — the same surface `kg-cli` sits on.

#![allow(dead_code)]

use kg::{BulletKind, Command, Executor, Output};
use tempfile::TempDir;

/// A fresh project on disk plus the `Executor` opened against it.
pub struct TestProject {
    pub dir: TempDir,
    pub executor: Executor,
}

impl TestProject {
    /// Open a project with an all-defaults `kg.toml` (on-device embeddings,
    /// no reranker — fully offline and deterministic).
    pub fn new() -> TestProject {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::open(dir.path()).unwrap();
        TestProject { dir, executor }
    }

    /// Open a project with a `kg.toml` written up front, e.g. to set a low
    /// `review.budget_threshold` for a fast flagging test.
    pub fn with_config(toml: &str) -> TestProject {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kg.toml"), toml).unwrap();
        let executor = Executor::open(dir.path()).unwrap();
        TestProject { dir, executor }
    }

    pub fn add(&self, slug: &str, text: &str) -> String {
        match self
            .executor
            .dispatch(Command::AddBullet { slug: slug.to_string(), text: text.to_string(), kind: None })
            .unwrap()
        {
            Output::BulletAdded { bullet_id } => bullet_id,
            other => panic!("expected BulletAdded, got {other:?}"),
        }
    }

    pub fn add_kind(&self, slug: &str, text: &str, kind: BulletKind) -> String {
        match self
            .executor
            .dispatch(Command::AddBullet { slug: slug.to_string(), text: text.to_string(), kind: Some(kind) })
            .unwrap()
        {
            Output::BulletAdded { bullet_id } => bullet_id,
            other => panic!("expected BulletAdded, got {other:?}"),
        }
    }

    pub fn search(&self, query: &str) -> Vec<kg::SearchHitOut> {
        match self.executor.dispatch(Command::Search { query: query.to_string(), limit: None }).unwrap() {
            Output::Search { hits } => hits,
            other => panic!("expected Search, got {other:?}"),
        }
    }

    pub fn context(&self, query: &str, session_id: Option<&str>) -> String {
        match self
            .executor
            .dispatch(Command::Context {
                query: query.to_string(),
                session_id: session_id.map(str::to_string),
                rerank_query: None,
                k: None,
                char_budget: None,
            })
            .unwrap()
        {
            Output::Context { text, .. } => text,
            other => panic!("expected Context, got {other:?}"),
        }
    }

    pub fn show(&self, slug: &str) -> String {
        match self.executor.dispatch(Command::Show { slug: slug.to_string() }).unwrap() {
            Output::Show { text } => text,
            other => panic!("expected Show, got {other:?}"),
        }
    }

    pub fn status(&self) -> kg::StatusReport {
        match self.executor.dispatch(Command::Status).unwrap() {
            Output::Status(report) => report,
            other => panic!("expected Status, got {other:?}"),
        }
    }

    pub fn node_status(&self, slug: &str) -> Option<kg::NodeStatus> {
        self.status().nodes.into_iter().find(|n| n.slug == slug)
    }

    pub fn mark_reviewed(&self, slug: &str) {
        self.executor.dispatch(Command::MarkReviewed { slug: slug.to_string() }).unwrap();
    }
}
