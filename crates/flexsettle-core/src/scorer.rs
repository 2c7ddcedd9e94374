//! Payout scoring.
//!
//! A site meeting its share earns `target_share * reward_rate`. A site
//! short of its share earns its reduction at the reward rate minus the
//! shortfall at the penalty rate, which can go negative.

/// Per-site share of the event target: `target_kw / site_count`, floored.
///
/// The remainder of the division is dropped, not redistributed.
/// Returns `None` when there are no sites.
pub fn target_share(target_kw: u64, site_count: usize) -> Option<u64> {
    if site_count == 0 {
        return None;
    }
    Some(target_kw / site_count as u64)
}

/// Integer payout for one site.
///
/// Computed in `i128` and saturated into `i64`, so it is monotonically
/// non-decreasing in `reduction_kwh` for fixed other inputs.
pub fn payout(reduction_kwh: u64, target_share: u64, reward_rate: u64, penalty_rate: u64) -> i64 {
    let reduction = i128::from(reduction_kwh);
    let share = i128::from(target_share);
    let reward = i128::from(reward_rate);
    let penalty = i128::from(penalty_rate);

    let value = if reduction >= share {
        share.saturating_mul(reward)
    } else {
        reduction
            .saturating_mul(reward)
            .saturating_sub((share - reduction).saturating_mul(penalty))
    };

    value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
