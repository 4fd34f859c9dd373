//! Replica Transport
//!
//! The RPC seam between the leader side and follower replicas. The
//! simulated transport keeps followers in-process and injects a
//! per-link propagation delay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::follower::Follower;
use super::protocol::{ReplicaRequest, ReplicaResponse};
use crate::config::FollowerConfig;
use crate::error::{Error, Result};
use crate::store::HybridClock;

/// Delivers replication requests to followers
#[async_trait::async_trait]
pub trait ReplicaTransport: Send + Sync {
    /// Number of followers reachable through this transport
    fn follower_count(&self) -> usize;

    /// Send a request to the follower with the given 1-based ordinal
    async fn send(&self, ordinal: usize, request: ReplicaRequest) -> Result<ReplicaResponse>;
}

/// One simulated leader→follower link
pub struct SimulatedLink {
    follower: Arc<Follower>,
    delay: Duration,
    reachable: AtomicBool,
}

impl SimulatedLink {
    /// Link to `follower` with a fixed propagation delay
    pub fn new(follower: Arc<Follower>, delay: Duration) -> Self {
        Self {
            follower,
            delay,
            reachable: AtomicBool::new(true),
        }
    }

    /// Propagation delay applied to replicated writes
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// In-process transport with delay injection
pub struct SimulatedTransport {
    links: Vec<SimulatedLink>,
}

impl SimulatedTransport {
    /// Create from links in ordinal order
    pub fn new(links: Vec<SimulatedLink>) -> Self {
        Self { links }
    }

    /// Create one empty follower per delay, sharing `clock`
    pub fn with_delays(delays: &[Duration], clock: Arc<HybridClock>) -> Self {
        let links = delays
            .iter()
            .enumerate()
            .map(|(i, delay)| {
                let ordinal = i + 1;
                let follower = Follower::new(ordinal, format!("follower-{}", ordinal), Arc::clone(&clock));
                SimulatedLink::new(Arc::new(follower), *delay)
            })
            .collect();
        Self::new(links)
    }

    /// Create followers from configuration, sharing `clock`
    pub fn from_config(followers: &[FollowerConfig], clock: Arc<HybridClock>) -> Self {
        let links = followers
            .iter()
            .enumerate()
            .map(|(i, cfg)| {
                let ordinal = i + 1;
                let name = cfg
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("follower-{}", ordinal));
                let follower = Follower::new(ordinal, name, Arc::clone(&clock));
                SimulatedLink::new(Arc::new(follower), Duration::from_millis(cfg.delay_ms))
            })
            .collect();
        Self::new(links)
    }

    /// Direct access to a follower, bypassing the link
    pub fn follower(&self, ordinal: usize) -> Option<&Arc<Follower>> {
        self.link(ordinal).ok().map(|link| &link.follower)
    }

    /// Cut or restore the link to a follower
    pub fn set_reachable(&self, ordinal: usize, reachable: bool) -> Result<()> {
        self.link(ordinal)?.reachable.store(reachable, Ordering::SeqCst);
        Ok(())
    }

    fn link(&self, ordinal: usize) -> Result<&SimulatedLink> {
        ordinal
            .checked_sub(1)
            .and_then(|i| self.links.get(i))
            .ok_or_else(|| Error::InvalidReplica(format!("no follower with ordinal {}", ordinal)))
    }
}

#[async_trait::async_trait]
impl ReplicaTransport for SimulatedTransport {
    fn follower_count(&self) -> usize {
        self.links.len()
    }

    async fn send(&self, ordinal: usize, request: ReplicaRequest) -> Result<ReplicaResponse> {
        let link = self.link(ordinal)?;

        if matches!(request, ReplicaRequest::Replicate { .. }) && !link.delay.is_zero() {
            tokio::time::sleep(link.delay).await;
        }

        if !link.reachable.load(Ordering::SeqCst) {
            return Err(Error::Network(format!(
                "follower {} unreachable for key={}",
                ordinal,
                request.key()
            )));
        }

        Ok(link.follower.handle(request).await)
    }
}
