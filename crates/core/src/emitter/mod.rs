//! Hierarchical publish/subscribe.
//!
//! - [`path`]: name and namespace validation, dotted paths
//! - [`matcher`]: listener matching rules
//! - [`payload`]: type-erased event data with an optional JSON snapshot
//! - [`meta`]: metadata attached to every delivered event
//! - [`emitter`]: the emitter tree itself

#[allow(clippy::module_inception)]
pub mod emitter;
pub mod matcher;
pub mod meta;
pub mod path;
pub mod payload;

pub use emitter::{Callback, ChildOptions, CleanupFn, Emitter, EmitterOptions};
pub use matcher::Matcher;
pub use meta::{Creator, EventMeta};
pub use path::{assert_valid_name, assert_valid_namespace, build_path, is_dotted_path, PathError};
pub use payload::Payload;
