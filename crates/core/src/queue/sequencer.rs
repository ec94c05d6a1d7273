//! Per-service ticket numbering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::ServiceType;

/// Hands out ticket numbers, one independent sequence per service type.
///
/// Persisted as a map from service type to the last issued number.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TicketSequencer {
    last_issued: BTreeMap<ServiceType, u32>,
}

impl TicketSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next number for `service_type`, starting at 1.
    pub fn next_number(&mut self, service_type: ServiceType) -> u32 {
        let last = self.last_issued.entry(service_type).or_insert(0);
        *last = last.wrapping_add(1);
        *last
    }

    /// The most recently issued number for `service_type` (0 if none).
    pub fn last_issued(&self, service_type: ServiceType) -> u32 {
        self.last_issued.get(&service_type).copied().unwrap_or(0)
    }

    /// Zero every sequence.
    pub fn reset(&mut self) {
        self.last_issued.clear();
    }
}
