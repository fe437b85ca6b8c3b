//! Vendor adapters for Otto workers.
//!
//! An adapter knows how to turn a prompt and a session reference into the
//! command line of its vendor CLI. Process management and output capture
//! live in `otto-runtime`; adapters only build commands.
//!
//! # Example
//!
//! ```
//! use otto_adapters::{AdapterRegistry, SessionRef};
//!
//! let registry = AdapterRegistry::new();
//! let adapter = registry.get("codex").unwrap();
//!
//! let (command, args) = adapter.launch_command("fix the build", &SessionRef::None);
//! assert_eq!(command, "codex");
//! assert_eq!(args, vec!["exec", "--json", "fix the build"]);
//! ```

pub mod claude;
pub mod codex;
pub mod registry;
pub mod traits;

pub use claude::ClaudeAdapter;
pub use codex::CodexAdapter;
pub use registry::AdapterRegistry;
pub use traits::{AdapterInfo, AgentAdapter, SessionRef};
