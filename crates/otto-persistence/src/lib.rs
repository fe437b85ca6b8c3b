//! Persistence layer for Otto.
//!
//! All state lives in one embedded LMDB environment. LMDB allows a single
//! write transaction at a time, so concurrent writers (several agent
//! processes sharing one state directory) are serialized by the store itself
//! and every operation here is atomic per call.
//!
//! # Example
//!
//! ```no_run
//! use otto_persistence::Store;
//! use otto_models::{Agent, Message, MessageFilter, MessageType};
//!
//! let store = Store::open("/home/user/.otto/db", 1024).unwrap();
//!
//! // Register an agent
//! let agent = Agent::new("authbackend", "claude", "auth backend");
//! store.agents().create_agent(&agent).unwrap();
//!
//! // Post and query messages
//! let msg = Message::builder("authbackend", MessageType::Say, "started").build();
//! store.messages().create_message(&msg).unwrap();
//! let unread = store
//!     .messages()
//!     .list_messages(&MessageFilter::new().unread_by("orchestrator"))
//!     .unwrap();
//! ```

pub mod agent_store;
pub mod error;
pub mod ids;
pub mod log_store;
pub mod message_store;
pub mod store;
pub mod task_store;

pub use agent_store::AgentRegistry;
pub use error::{PersistenceError, Result};
pub use ids::IdentifierGenerator;
pub use log_store::LogStore;
pub use message_store::MessageStore;
pub use store::Store;
pub use task_store::TaskStore;
