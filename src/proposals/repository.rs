//! Role-filtered, in-memory view of relay proposals.
//!
//! # Responsibilities
//! - Fetch the full proposal collection and filter it for the caller's role
//! - Keep the previous view when a fetch fails, and report the failure
//! - Drop responses that arrive after a newer refresh was applied
//! - Never let a proposal observed `Ready` revert to `Pending`
//!
//! # Design Decisions
//! - The view is replaced wholesale through `ArcSwap`; readers never see a partial update
//! - No local write path: the relay is the only source of proposal state

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashSet;
use serde::Serialize;

use crate::observability::{abbreviate, metrics};
use crate::proposals::types::{Proposal, ProposalStatus};
use crate::relay::{RelayClient, RelayResult};
use crate::session::Role;

/// Outcome of the most recent refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RepositoryStatus {
    /// Never refreshed, or cleared.
    Idle,
    Fresh { count: usize },
    /// Last fetch failed; the view holds the previous data.
    Failed { error: String },
}

#[derive(Debug)]
struct View {
    proposals: Arc<Vec<Proposal>>,
    status: RepositoryStatus,
    generation: u64,
}

impl View {
    fn empty(generation: u64) -> Self {
        Self {
            proposals: Arc::new(Vec::new()),
            status: RepositoryStatus::Idle,
            generation,
        }
    }
}

/// Keep only what `role` may see. Relay order is preserved.
pub fn filter_for_role(proposals: &[Proposal], identity: &str, role: Role) -> Vec<Proposal> {
    match role {
        Role::Admin => proposals.to_vec(),
        Role::Signer => proposals
            .iter()
            .filter(|p| p.owner == identity)
            .cloned()
            .collect(),
    }
}

/// Proposal Repository.
pub struct ProposalRepository {
    relay: Arc<dyn RelayClient>,
    view: ArcSwap<View>,
    next_generation: AtomicU64,
    /// Ids ever observed `Ready`. Survives `clear()`, so it spans sessions.
    ready_ids: DashSet<String>,
}

impl ProposalRepository {
    pub fn new(relay: Arc<dyn RelayClient>) -> Self {
        Self {
            relay,
            view: ArcSwap::from_pointee(View::empty(0)),
            next_generation: AtomicU64::new(1),
            ready_ids: DashSet::new(),
        }
    }

    /// Current filtered view.
    pub fn proposals(&self) -> Arc<Vec<Proposal>> {
        self.view.load().proposals.clone()
    }

    /// Look up a proposal in the current view.
    pub fn get(&self, id: &str) -> Option<Proposal> {
        self.view.load().proposals.iter().find(|p| p.id == id).cloned()
    }

    pub fn status(&self) -> RepositoryStatus {
        self.view.load().status.clone()
    }

    /// Empty the view. Refreshes already in flight are discarded when they land.
    /// The set of ids seen `Ready` is kept.
    pub fn clear(&self) {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        self.view.store(Arc::new(View::empty(generation)));
        metrics::record_cached_proposals(0);
    }

    /// Fetch from the relay and rebuild the view for `identity` acting as `role`.
    ///
    /// Returns the freshly filtered list even when a newer refresh has already been applied
    /// and this one is discarded.
    pub async fn refresh(&self, identity: &str, role: Role) -> RelayResult<Arc<Vec<Proposal>>> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);

        match self.relay.list_proposals().await {
            Ok(mut all) => {
                self.enforce_monotonic(&mut all);
                let filtered = Arc::new(filter_for_role(&all, identity, role));
                let count = filtered.len();

                let applied = self.apply(generation, |_| View {
                    proposals: filtered.clone(),
                    status: RepositoryStatus::Fresh { count },
                    generation,
                });
                if applied {
                    metrics::record_cached_proposals(count);
                    tracing::debug!(
                        identity = %abbreviate(identity),
                        role = %role,
                        total = all.len(),
                        visible = count,
                        "Proposals refreshed"
                    );
                } else {
                    tracing::debug!(generation, "Discarding superseded proposal refresh");
                }
                Ok(filtered)
            }
            Err(e) => {
                let error = e.to_string();
                let applied = self.apply(generation, |current| View {
                    proposals: current.proposals.clone(),
                    status: RepositoryStatus::Failed {
                        error: error.clone(),
                    },
                    generation,
                });
                if applied {
                    tracing::warn!(error = %e, "Proposal refresh failed, keeping previous view");
                }
                Err(e)
            }
        }
    }

    /// Swap in a new view unless a newer one is already installed.
    fn apply<F>(&self, generation: u64, build: F) -> bool
    where
        F: Fn(&View) -> View,
    {
        let mut applied = false;
        self.view.rcu(|current| {
            if current.generation > generation {
                applied = false;
                Arc::clone(current)
            } else {
                applied = true;
                Arc::new(build(&**current))
            }
        });
        applied
    }

    fn enforce_monotonic(&self, proposals: &mut [Proposal]) {
        for p in proposals.iter_mut() {
            match p.status {
                ProposalStatus::Ready => {
                    self.ready_ids.insert(p.id.clone());
                }
                ProposalStatus::Pending if self.ready_ids.contains(&p.id) => {
                    tracing::warn!(
                        proposal_id = %p.id,
                        "Relay reported a finalized proposal as pending; keeping it ready"
                    );
                    p.status = ProposalStatus::Ready;
                }
                ProposalStatus::Pending => {}
            }
        }
    }
}

impl std::fmt::Debug for ProposalRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.view.load();
        f.debug_struct("ProposalRepository")
            .field("count", &view.proposals.len())
            .field("status", &view.status)
            .field("generation", &view.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposals::types::SignatureRecord;
    use crate::relay::RelayError;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;

    fn proposal(id: &str, owner: &str, status: ProposalStatus) -> Proposal {
        Proposal {
            id: id.into(),
            owner: owner.into(),
            required_signatures: 2,
            insurance_enabled: false,
            signatures: Vec::<SignatureRecord>::new(),
            status,
        }
    }

    /// Relay that serves scripted `list_proposals` responses in order.
    struct ScriptedRelay {
        responses: Mutex<Vec<(Duration, RelayResult<Vec<Proposal>>)>>,
    }

    impl ScriptedRelay {
        fn new(responses: Vec<(Duration, RelayResult<Vec<Proposal>>)>) -> Arc<Self> {
            let mut responses = responses;
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
            })
        }
    }

    #[async_trait]
    impl RelayClient for ScriptedRelay {
        async fn list_proposals(&self) -> RelayResult<Vec<Proposal>> {
            let next = self.responses.lock().unwrap().pop();
            let (delay, result) = next.unwrap_or((Duration::ZERO, Ok(Vec::new())));
            tokio::time::sleep(delay).await;
            result
        }
        async fn build_unsigned_transaction(&self, _f: &str, _p: Value) -> RelayResult<String> {
            unreachable!()
        }
        async fn build_withdrawal(&self, _id: &str) -> RelayResult<String> {
            unreachable!()
        }
        async fn submit_approval_signature(&self, _id: &str, _s: &str, _sig: &str) -> RelayResult<()> {
            unreachable!()
        }
        async fn submit_signed_transaction(&self, _p: &str) -> RelayResult<String> {
            unreachable!()
        }
    }

    #[test]
    fn test_filter_for_role() {
        let all = vec![
            proposal("p1", "GA", ProposalStatus::Pending),
            proposal("p2", "GB", ProposalStatus::Pending),
            proposal("p3", "GA", ProposalStatus::Ready),
        ];
        let ids = |v: Vec<Proposal>| v.into_iter().map(|p| p.id).collect::<Vec<_>>();

        assert_eq!(ids(filter_for_role(&all, "GA", Role::Signer)), vec!["p1", "p3"]);
        assert_eq!(ids(filter_for_role(&all, "GZ", Role::Signer)), Vec::<String>::new());
        assert_eq!(ids(filter_for_role(&all, "GZ", Role::Admin)), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_view() {
        let relay = ScriptedRelay::new(vec![
            (Duration::ZERO, Ok(vec![proposal("p1", "GA", ProposalStatus::Pending)])),
            (Duration::ZERO, Err(RelayError::Network("down".into()))),
        ]);
        let repo = ProposalRepository::new(relay);
        assert_eq!(repo.status(), RepositoryStatus::Idle);

        repo.refresh("GA", Role::Signer).await.unwrap();
        assert_eq!(repo.status(), RepositoryStatus::Fresh { count: 1 });

        assert!(repo.refresh("GA", Role::Signer).await.is_err());
        assert_eq!(repo.proposals().len(), 1);
        assert!(matches!(repo.status(), RepositoryStatus::Failed { .. }));
        assert!(repo.get("p1").is_some());
    }

    #[tokio::test]
    async fn test_ready_never_reverts() {
        let relay = ScriptedRelay::new(vec![
            (Duration::ZERO, Ok(vec![proposal("p1", "GA", ProposalStatus::Ready)])),
            (Duration::ZERO, Ok(vec![proposal("p1", "GA", ProposalStatus::Pending)])),
        ]);
        let repo = ProposalRepository::new(relay);
        repo.refresh("GA", Role::Admin).await.unwrap();
        repo.refresh("GA", Role::Admin).await.unwrap();
        assert_eq!(repo.get("p1").unwrap().status, ProposalStatus::Ready);
    }

    #[tokio::test]
    async fn test_ready_survives_clear() {
        let relay = ScriptedRelay::new(vec![
            (Duration::ZERO, Ok(vec![proposal("p1", "GA", ProposalStatus::Ready)])),
            (Duration::ZERO, Ok(vec![proposal("p1", "GA", ProposalStatus::Pending)])),
        ]);
        let repo = ProposalRepository::new(relay);
        repo.refresh("GA", Role::Signer).await.unwrap();
        repo.clear();
        repo.refresh("GA", Role::Signer).await.unwrap();
        assert_eq!(repo.get("p1").unwrap().status, ProposalStatus::Ready);
    }

    #[tokio::test]
    async fn test_stale_refresh_is_discarded() {
        // First refresh is slow and older; second is fast and newer.
        let relay = ScriptedRelay::new(vec![
            (
                Duration::from_millis(100),
                Ok(vec![proposal("old", "GA", ProposalStatus::Pending)]),
            ),
            (Duration::ZERO, Ok(vec![proposal("new", "GA", ProposalStatus::Pending)])),
        ]);
        let repo = Arc::new(ProposalRepository::new(relay));

        let slow = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.refresh("GA", Role::Admin).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        repo.refresh("GA", Role::Admin).await.unwrap();
        slow.await.unwrap().unwrap();

        let ids: Vec<String> = repo.proposals().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_refresh() {
        let relay = ScriptedRelay::new(vec![(
            Duration::from_millis(50),
            Ok(vec![proposal("p1", "GA", ProposalStatus::Pending)]),
        )]);
        let repo = Arc::new(ProposalRepository::new(relay));
        let pending = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.refresh("GA", Role::Admin).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        repo.clear();
        pending.await.unwrap().unwrap();

        assert!(repo.proposals().is_empty());
        assert_eq!(repo.status(), RepositoryStatus::Idle);
    }
}
