//! Registry entries

use std::fmt;
use std::net::SocketAddr;
use std::num::NonZeroU32;

use crate::channel::RoutingPlan;
use crate::timing::Tick;

/// How a subscriber is recognised across control messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    /// The group/broadcast destination, configured at start-up
    Default,
    /// Stable id chosen by the client
    Id(NonZeroU32),
    /// Anonymous client, keyed by its source address
    Address(SocketAddr),
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdentity::Default => write!(f, "default"),
            ClientIdentity::Id(id) => write!(f, "id {:#010x}", id.get()),
            ClientIdentity::Address(addr) => write!(f, "addr {}", addr),
        }
    }
}

/// One destination of the fan-out
#[derive(Debug, Clone)]
pub struct ClientEntry {
    pub identity: ClientIdentity,
    pub address: SocketAddr,
    /// Subscribe mask the plan was built from (0 for the default entry)
    pub mask: u32,
    pub plan: RoutingPlan,
    /// `None` for the default entry, which never expires
    pub expires_at: Option<Tick>,
}

impl ClientEntry {
    pub(crate) fn default_entry(address: SocketAddr, plan: RoutingPlan) -> Self {
        Self {
            identity: ClientIdentity::Default,
            address,
            mask: 0,
            plan,
            expires_at: None,
        }
    }

    pub(crate) fn subscriber(
        identity: ClientIdentity,
        address: SocketAddr,
        mask: u32,
        source_channels: usize,
        expires_at: Tick,
    ) -> Self {
        Self {
            identity,
            address,
            mask,
            plan: RoutingPlan::from_mask(mask, source_channels),
            expires_at: Some(expires_at),
        }
    }

    pub fn is_default(&self) -> bool {
        self.identity == ClientIdentity::Default
    }

    pub fn is_expired(&self, now: Tick) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn output_channels(&self) -> usize {
        self.plan.output_channels()
    }
}
