//! Domain models for rolemine.
//!
//! - `RoleDocument` / `RoleRevision` / `TaskFile` / `Task` / `Block`: the
//!   typed document tree consumed by the extractor
//! - `ActionOccurrence`: one action invocation flattened out of that tree
//! - `MineError` / `MalformedDocument`: the domain error taxonomy

pub mod error;
pub mod occurrence;
pub mod role;

pub use error::{MalformedDocument, MineError, MineResult};
pub use occurrence::ActionOccurrence;
pub use role::{Block, Guard, RoleDocument, RoleRevision, Task, TaskFile, HEAD_REVISION};
