//! Candidate weekly meeting patterns. The pool is regenerated at the start
//! of every solve attempt so attempts stay decorrelated, and the slot
//! assigner reshuffles it before each section's search.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use types::{Day, Slot, SlotPattern, TUTORIAL_SLOT};

/// Each round contributes one extended and one standard pattern.
pub const POOL_ROUNDS: usize = 500;

pub fn generate_pool(rng: &mut ChaCha8Rng) -> Vec<SlotPattern> {
    let mut pool = Vec::with_capacity(POOL_ROUNDS * 2);
    for _ in 0..POOL_ROUNDS {
        pool.push(extended_pattern());
        pool.push(standard_pattern(rng));
    }
    pool
}

/// The last period of every day except Friday, for subjects that need the
/// longer contact block.
fn extended_pattern() -> SlotPattern {
    let slots = Day::ALL
        .iter()
        .filter(|&&d| d != Day::Fri)
        .map(|&d| Slot::new(d, d.last_period()))
        .collect();
    SlotPattern(slots)
}

/// One uniformly random period per day, below that day's last period and
/// never the tutorial slot. Duplicate patterns across rounds are fine;
/// their plurality feeds the reuse cost in the assigner.
fn standard_pattern(rng: &mut ChaCha8Rng) -> SlotPattern {
    let mut slots = Vec::with_capacity(Day::ALL.len());
    for day in Day::ALL {
        let allowed: Vec<u8> = (0..day.last_period())
            .filter(|&p| Slot::new(day, p) != TUTORIAL_SLOT)
            .collect();
        let period = allowed[rng.gen_range(0..allowed.len())];
        slots.push(Slot::new(day, period));
    }
    SlotPattern(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;

    #[test]
    fn pool_has_a_pattern_pair_per_round() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let pool = generate_pool(&mut rng);
        assert_eq!(pool.len(), POOL_ROUNDS * 2);
    }

    #[test]
    fn extended_patterns_take_final_periods_monday_through_thursday() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let pool = generate_pool(&mut rng);
        let extended = &pool[0];
        assert_eq!(
            extended.slots(),
            &[
                Slot::new(Day::Mon, 5),
                Slot::new(Day::Tue, 6),
                Slot::new(Day::Wed, 5),
                Slot::new(Day::Thu, 5),
            ]
        );
        assert!(extended.is_extended());
    }

    #[test]
    fn standard_patterns_avoid_reserved_and_final_periods() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let pool = generate_pool(&mut rng);
        for pattern in pool.iter().skip(1).step_by(2) {
            assert_eq!(pattern.slots().len(), 5);
            for slot in pattern.slots() {
                assert_ne!(*slot, TUTORIAL_SLOT);
                assert!(slot.period < slot.day.last_period());
            }
            assert!(!pattern.is_extended());
        }
    }
}
