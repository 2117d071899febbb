//! Random share partitioning.

use rand::seq::SliceRandom;
use rand::Rng;

/// Split `pool` coins into `slots` positive shares summing exactly to `pool`.
///
/// For each of the first `slots - 1` shares, draw uniformly from
/// `[1, remaining - recipients_left]`; the upper bound guarantees every later
/// recipient can still receive at least one coin. The final share takes the
/// remainder. The list is then shuffled uniformly so claim order does not
/// correlate with generation order.
///
/// Every call resamples independently; the claim flow invokes this fresh on
/// each claim with the packet's current remaining pool and slots, and
/// consumes only the first element.
///
/// Preconditions: `slots >= 1` and `pool >= slots`. The claim flow maintains
/// `remaining_amount >= remaining_slots` as an invariant, so both hold there
/// by construction.
pub fn split(pool: i64, slots: u32) -> Vec<i64> {
    debug_assert!(slots >= 1);
    debug_assert!(pool >= i64::from(slots));

    if slots == 1 {
        return vec![pool];
    }

    let mut rng = rand::thread_rng();
    let mut shares = Vec::with_capacity(slots as usize);
    let mut remaining = pool;

    for i in 0..slots - 1 {
        let recipients_left = i64::from(slots - i - 1);
        let max = remaining - recipients_left;
        let amount = rng.gen_range(1..=max);
        shares.push(amount);
        remaining -= amount;
    }
    shares.push(remaining);

    shares.shuffle(&mut rng);
    shares
}
