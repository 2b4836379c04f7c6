//! Token ledger reconciliation.
//!
//! Turns observed balance changes on the authenticated user into per-day
//! earned/used flows. The ledger itself is pure state; the sync engine
//! records the returned flows into the activity log store, so there is
//! exactly one reconciliation point in the process.

use skillswap_core::{BalanceUpdate, TokenFlow, split_delta};

#[derive(Debug, Default)]
pub struct TokenLedger {
    baseline: Option<i64>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<i64> {
        self.baseline
    }

    /// Reconcile an observed absolute balance against the baseline. The
    /// first observation after construction or `reset` sets the baseline
    /// silently; every observation advances it.
    pub fn observe(&mut self, tokens: i64) -> TokenFlow {
        let flow = match self.baseline {
            None => TokenFlow::Unchanged,
            Some(base) => split_delta(tokens - base),
        };
        self.baseline = Some(tokens);
        flow
    }

    /// Reconcile a pushed balance update. Carried deltas are split into a
    /// flow here and the baseline advances to the resulting absolute
    /// balance, so the follow-up `observe` of the patched user sees a zero
    /// diff instead of counting the same change twice. A `Set`-only push
    /// leaves the baseline alone and defers to the diff path.
    ///
    /// Returns the new absolute balance when it can be determined, so the
    /// caller can patch the session user.
    pub fn apply_push(
        &mut self,
        update: BalanceUpdate,
        current: Option<i64>,
    ) -> (Option<i64>, TokenFlow) {
        match update {
            BalanceUpdate::Set { tokens } => (Some(tokens), TokenFlow::Unchanged),
            BalanceUpdate::SetWithDelta { tokens, delta } => {
                self.baseline = Some(tokens);
                (Some(tokens), split_delta(delta))
            }
            BalanceUpdate::Delta { delta } => {
                let balance = current.map(|tokens| tokens + delta);
                self.baseline = balance.or_else(|| self.baseline.map(|base| base + delta));
                (balance, split_delta(delta))
            }
        }
    }

    /// Called on identity change (login as someone else, logout). Never
    /// called on reconnect.
    pub fn reset(&mut self) {
        self.baseline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_sets_baseline_silently() {
        let mut ledger = TokenLedger::new();
        assert_eq!(ledger.observe(100), TokenFlow::Unchanged);
        assert_eq!(ledger.baseline(), Some(100));
    }

    #[test]
    fn consecutive_observations_split_into_flows() {
        let mut ledger = TokenLedger::new();
        ledger.observe(100);
        assert_eq!(ledger.observe(130), TokenFlow::Earned(30));
        assert_eq!(ledger.observe(125), TokenFlow::Spent(5));
        assert_eq!(ledger.observe(125), TokenFlow::Unchanged);
        assert_eq!(ledger.baseline(), Some(125));
    }

    #[test]
    fn reset_makes_the_next_observation_silent_again() {
        let mut ledger = TokenLedger::new();
        ledger.observe(100);
        ledger.reset();
        assert_eq!(ledger.observe(999), TokenFlow::Unchanged);
    }

    #[test]
    fn pushed_delta_advances_baseline_past_the_patch() {
        let mut ledger = TokenLedger::new();
        ledger.observe(100);

        let (balance, flow) = ledger.apply_push(
            BalanceUpdate::SetWithDelta {
                tokens: 130,
                delta: 30,
            },
            Some(100),
        );
        assert_eq!(balance, Some(130));
        assert_eq!(flow, TokenFlow::Earned(30));

        // The patched user comes back through the diff path; no double count.
        assert_eq!(ledger.observe(130), TokenFlow::Unchanged);
    }

    #[test]
    fn delta_only_push_resolves_against_the_current_balance() {
        let mut ledger = TokenLedger::new();
        ledger.observe(100);

        let (balance, flow) = ledger.apply_push(BalanceUpdate::Delta { delta: -15 }, Some(100));
        assert_eq!(balance, Some(85));
        assert_eq!(flow, TokenFlow::Spent(15));
        assert_eq!(ledger.observe(85), TokenFlow::Unchanged);
    }

    #[test]
    fn set_only_push_defers_to_the_diff_path() {
        let mut ledger = TokenLedger::new();
        ledger.observe(100);

        let (balance, flow) = ledger.apply_push(BalanceUpdate::Set { tokens: 140 }, Some(100));
        assert_eq!(balance, Some(140));
        assert_eq!(flow, TokenFlow::Unchanged);
        assert_eq!(ledger.baseline(), Some(100));

        // The patched user now flows through observe, which records once.
        assert_eq!(ledger.observe(140), TokenFlow::Earned(40));
    }
}
