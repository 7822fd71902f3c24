//! Advisory in-flight gate.
//!
//! Stops a second flow for the same key from starting while the first is running. The
//! relay still resolves real races; this only avoids duplicate wallet prompts.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::orchestrator::error::{FlowError, FlowResult};

#[derive(Debug, Default)]
pub struct InFlight {
    active: DashMap<String, &'static str>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for `flow`; the claim is released when the ticket drops.
    pub fn acquire(&self, key: String, flow: &'static str) -> FlowResult<FlightTicket<'_>> {
        match self.active.entry(key.clone()) {
            Entry::Occupied(held) => {
                tracing::debug!(key = %key, held_by = *held.get(), flow, "Flow already in flight");
                Err(FlowError::InFlight(key))
            }
            Entry::Vacant(slot) => {
                slot.insert(flow);
                Ok(FlightTicket { owner: self, key })
            }
        }
    }
}

/// Held for the duration of a flow.
#[derive(Debug)]
pub struct FlightTicket<'a> {
    owner: &'a InFlight,
    key: String,
}

impl Drop for FlightTicket<'_> {
    fn drop(&mut self) {
        self.owner.active.remove(&self.key);
    }
}
