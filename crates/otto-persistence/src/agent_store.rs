//! Agent records and lifecycle transitions.

use heed::RwTxn;
use otto_models::{Agent, AgentStatus, Message};

use crate::error::{PersistenceError, Result};
use crate::message_store::insert_message;
use crate::store::{decode, encode, Store};

const KIND: &str = "agent";

/// Separates the agent ID from the sequence in log keys.
pub(crate) const KEY_SEPARATOR: char = '/';

/// Durable agent registry.
///
/// Agents are never deleted; every record stays as history of a spawn.
pub struct AgentRegistry<'s> {
    store: &'s Store,
}

impl<'s> AgentRegistry<'s> {
    pub(crate) fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Inserts a new agent.
    ///
    /// # Errors
    /// Returns `InvalidData` for an empty ID or one containing `/`, and
    /// `Duplicate` if an agent with the same ID exists.
    pub fn create_agent(&self, agent: &Agent) -> Result<()> {
        if agent.id.is_empty() || agent.id.contains(KEY_SEPARATOR) {
            return Err(PersistenceError::InvalidData(format!(
                "invalid agent id {:?}",
                agent.id
            )));
        }

        let mut wtxn = self.store.write_txn()?;
        let db = self.store.dbs.agents;

        if db.get(&wtxn, &agent.id)?.is_some() {
            return Err(PersistenceError::duplicate(KIND, &agent.id));
        }
        db.put(&mut wtxn, &agent.id, &encode(agent)?)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Loads an agent by ID.
    pub fn get_agent(&self, id: &str) -> Result<Agent> {
        let rtxn = self.store.read_txn()?;
        match self.store.dbs.agents.get(&rtxn, id)? {
            Some(bytes) => decode(bytes),
            None => Err(PersistenceError::not_found(KIND, id)),
        }
    }

    /// Returns true if an agent with this ID exists.
    pub fn exists(&self, id: &str) -> Result<bool> {
        let rtxn = self.store.read_txn()?;
        Ok(self.store.dbs.agents.get(&rtxn, id)?.is_some())
    }

    /// Lists all agents, oldest first.
    pub fn list_agents(&self) -> Result<Vec<Agent>> {
        let rtxn = self.store.read_txn()?;
        let mut agents = Vec::new();
        for item in self.store.dbs.agents.iter(&rtxn)? {
            let (_, bytes) = item?;
            agents.push(decode::<Agent>(bytes)?);
        }
        agents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(agents)
    }

    /// Moves an agent to `status`.
    ///
    /// Re-applying the current status is a no-op. Returns the previous status.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown agent and `InvalidTransition` when
    /// the lifecycle does not allow the move.
    pub fn update_status(&self, id: &str, status: AgentStatus) -> Result<AgentStatus> {
        let mut wtxn = self.store.write_txn()?;
        let previous = self.transition(&mut wtxn, id, status)?;
        wtxn.commit()?;
        Ok(previous)
    }

    /// Moves an agent to `status` and stores `message` in one transaction.
    ///
    /// Either both writes land or neither does, so a rejected transition
    /// never leaves the message behind.
    pub fn update_status_with_message(
        &self,
        id: &str,
        status: AgentStatus,
        message: &Message,
    ) -> Result<AgentStatus> {
        let mut wtxn = self.store.write_txn()?;
        let previous = self.transition(&mut wtxn, id, status)?;
        insert_message(self.store, &mut wtxn, message)?;
        wtxn.commit()?;
        Ok(previous)
    }

    fn transition(&self, wtxn: &mut RwTxn<'_>, id: &str, status: AgentStatus) -> Result<AgentStatus> {
        let db = self.store.dbs.agents;

        let mut agent: Agent = match db.get(wtxn, id)? {
            Some(bytes) => decode(bytes)?,
            None => return Err(PersistenceError::not_found(KIND, id)),
        };

        let previous = agent.status;
        if !previous.can_transition_to(status) {
            return Err(PersistenceError::InvalidTransition {
                id: id.to_string(),
                from: previous,
                to: status,
            });
        }
        if previous != status {
            agent.status = status;
            db.put(wtxn, id, &encode(&agent)?)?;
        }
        Ok(previous)
    }

    /// Replaces the placeholder session identifier.
    ///
    /// Only the first reported value is kept. Returns true if `session_id`
    /// was adopted, false if a confirmed value was already present.
    pub fn update_session_id(&self, id: &str, session_id: &str) -> Result<bool> {
        let mut wtxn = self.store.write_txn()?;
        let db = self.store.dbs.agents;

        let mut agent: Agent = match db.get(&wtxn, id)? {
            Some(bytes) => decode(bytes)?,
            None => return Err(PersistenceError::not_found(KIND, id)),
        };

        if !agent.has_placeholder_session() {
            return Ok(false);
        }

        agent.session_id = Some(session_id.to_string());
        agent.session_confirmed = true;
        db.put(&mut wtxn, id, &encode(&agent)?)?;
        wtxn.commit()?;
        Ok(true)
    }
}
