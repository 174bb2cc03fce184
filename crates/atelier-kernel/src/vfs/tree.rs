//! Folder/file tree derived from a flat file list.
//!
//! The tree is a view. It is rebuilt from `Workspace::files()` on every call
//! and never stored, so it cannot drift from the file list.

use std::collections::BTreeMap;

use serde::Serialize;

use super::path::normalize;
use super::workspace::File;

/// A node in the derived tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileNode {
    File {
        name: String,
        path: String,
    },
    Folder {
        name: String,
        path: String,
        children: Vec<FileNode>,
    },
}

impl FileNode {
    /// Last path segment.
    pub fn name(&self) -> &str {
        match self {
            FileNode::File { name, .. } | FileNode::Folder { name, .. } => name,
        }
    }

    /// Full path from the workspace root.
    pub fn path(&self) -> &str {
        match self {
            FileNode::File { path, .. } | FileNode::Folder { path, .. } => path,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, FileNode::Folder { .. })
    }

    /// Children of a folder; empty for files.
    pub fn children(&self) -> &[FileNode] {
        match self {
            FileNode::Folder { children, .. } => children,
            FileNode::File { .. } => &[],
        }
    }

    /// Number of file leaves at or below this node.
    pub fn file_count(&self) -> usize {
        match self {
            FileNode::File { .. } => 1,
            FileNode::Folder { children, .. } => children.iter().map(FileNode::file_count).sum(),
        }
    }
}

#[derive(Default)]
struct Dir {
    folders: BTreeMap<String, Dir>,
    files: BTreeMap<String, String>,
}

/// Group flat paths into nested folders.
///
/// Within each folder, subfolders come first, then files; both groups are in
/// lexical order by name.
pub fn build_file_tree(files: &[File]) -> Vec<FileNode> {
    let mut root = Dir::default();

    for file in files {
        let Some(path) = normalize(&file.path) else {
            continue;
        };
        let mut segments: Vec<&str> = path.split('/').collect();
        let Some(leaf) = segments.pop() else {
            continue;
        };

        let mut dir = &mut root;
        for segment in segments {
            dir = dir.folders.entry(segment.to_string()).or_default();
        }
        dir.files.insert(leaf.to_string(), path.clone());
    }

    into_nodes(root, "")
}

fn into_nodes(dir: Dir, prefix: &str) -> Vec<FileNode> {
    let mut nodes = Vec::with_capacity(dir.folders.len() + dir.files.len());

    for (name, sub) in dir.folders {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let children = into_nodes(sub, &path);
        nodes.push(FileNode::Folder {
            name,
            path,
            children,
        });
    }

    for (name, path) in dir.files {
        nodes.push(FileNode::File { name, path });
    }

    nodes
}

/// Render a tree as indented text, one node per line.
pub fn render_tree(nodes: &[FileNode]) -> String {
    fn walk(nodes: &[FileNode], depth: usize, out: &mut String) {
        for node in nodes {
            out.push_str(&"  ".repeat(depth));
            out.push_str(node.name());
            if node.is_folder() {
                out.push('/');
            }
            out.push('\n');
            walk(node.children(), depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(nodes, 0, &mut out);
    out
}
