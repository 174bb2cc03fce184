//! Virtual filesystem for atelier workspaces.
//!
//! A workspace is a flat, ordered list of text files keyed by path. The folder
//! hierarchy is encoded in the paths and derived on demand:
//!
//! ```text
//! files (stored)                  tree (derived)
//! ─────────────────               ─────────────────
//! src/App.tsx          ──▶        src/
//! src/components/Nav.tsx            components/
//! README.md                           Nav.tsx
//!                                   App.tsx
//!                                 README.md
//! ```
//!
//! All mutators are total: writes upsert, missing deletes are no-ops and
//! colliding renames are dropped.

mod path;
mod tree;
mod workspace;

pub use path::{file_name, normalize};
pub use tree::{build_file_tree, render_tree, FileNode};
pub use workspace::{File, Workspace};
