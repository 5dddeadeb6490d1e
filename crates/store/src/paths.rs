//! Directory layout.

use std::path::{Path, PathBuf};

pub fn nodes_dir(root: &Path) -> PathBuf {
    root.join("nodes")
}

pub fn node_dir(root: &Path, slug: &str) -> PathBuf {
    nodes_dir(root).join(slug)
}

pub fn node_log_path(root: &Path, slug: &str) -> PathBuf {
    node_dir(root, slug).join("node.jsonl")
}

pub fn meta_log_path(root: &Path, slug: &str) -> PathBuf {
    node_dir(root, slug).join("meta.jsonl")
}

pub fn index_dir(root: &Path) -> PathBuf {
    root.join("index")
}

pub fn derived_store_path(root: &Path) -> PathBuf {
    index_dir(root).join("graph.db")
}
