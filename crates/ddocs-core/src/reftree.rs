//! Tree of live reference handles mirroring a document's data.

use std::collections::BTreeMap;

use crate::document::Document;
use crate::error::CodecError;
use crate::list::List;

/// A node in a [`RefTree`].
#[derive(Clone, Debug)]
pub enum RefNode {
    List(List),
    Document(Document),
    /// Intermediate object on the way to deeper references.
    Branch(RefTree),
}

/// Reference handles keyed the same way as the document data they came from.
///
/// Only positions recorded as references hold leaves; every other node is a
/// [`RefNode::Branch`] created on the way down.
#[derive(Clone, Debug, Default)]
pub struct RefTree {
    nodes: BTreeMap<String, RefNode>,
}

impl RefTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Place `node` at a dotted path, creating branches as needed.
    pub(crate) fn insert(&mut self, path: &str, node: RefNode) -> Result<(), CodecError> {
        if path.is_empty() {
            return Err(CodecError::EmptyPath);
        }
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(CodecError::EmptyPath);
        };

        let mut nodes = &mut self.nodes;
        for segment in parents {
            let entry = nodes
                .entry(segment.to_string())
                .or_insert_with(|| RefNode::Branch(RefTree::new()));
            nodes = match entry {
                RefNode::Branch(tree) => &mut tree.nodes,
                _ => {
                    return Err(CodecError::PathConflict {
                        path: path.to_string(),
                    })
                }
            };
        }
        nodes.insert(last.to_string(), node);
        Ok(())
    }

    /// Node at a dotted path.
    pub fn get(&self, path: &str) -> Option<&RefNode> {
        let mut segments = path.split('.');
        let mut node = self.nodes.get(segments.next()?)?;
        for segment in segments {
            match node {
                RefNode::Branch(tree) => node = tree.nodes.get(segment)?,
                _ => return None,
            }
        }
        Some(node)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut RefNode> {
        let mut segments = path.split('.');
        let mut node = self.nodes.get_mut(segments.next()?)?;
        for segment in segments {
            match node {
                RefNode::Branch(tree) => node = tree.nodes.get_mut(segment)?,
                _ => return None,
            }
        }
        Some(node)
    }

    /// List handle at a dotted path.
    pub fn list(&self, path: &str) -> Option<&List> {
        match self.get(path)? {
            RefNode::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn list_mut(&mut self, path: &str) -> Option<&mut List> {
        match self.get_mut(path)? {
            RefNode::List(list) => Some(list),
            _ => None,
        }
    }

    /// Document handle at a dotted path.
    pub fn document(&self, path: &str) -> Option<&Document> {
        match self.get(path)? {
            RefNode::Document(document) => Some(document),
            _ => None,
        }
    }

    pub fn document_mut(&mut self, path: &str) -> Option<&mut Document> {
        match self.get_mut(path)? {
            RefNode::Document(document) => Some(document),
            _ => None,
        }
    }

    /// Dotted paths of every leaf, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out.sort();
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (key, node) in &self.nodes {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match node {
                RefNode::Branch(tree) => tree.collect_paths(&path, out),
                _ => out.push(path),
            }
        }
    }
}
