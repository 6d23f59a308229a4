//! Tools module for the code assistant
//!
//! File handling used by the commands: path validation, reading and writing
//! target files, snapshots, diffs and the AI-driven code modifier.

pub mod code_edit;
pub mod file_ops;
pub mod file_utils;

pub use code_edit::{apply, CodeModifier, Modification};
pub use file_ops::{colorize_diff, generate_diff, restore_snapshots, snapshot};
pub use file_utils::{PathError, PathValidator};
