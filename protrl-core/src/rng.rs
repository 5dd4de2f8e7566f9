// Seeds handed to `Env::reset` and the action sampling of the policies are drawn from this rng, so
// a run is reproducible once `set_seed` has been called.

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::cell::RefCell;

thread_local! {
    pub static RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(0));
}

pub fn set_seed(seed: u64) {
    RNG.with_borrow_mut(|rng| *rng = StdRng::seed_from_u64(seed));
}

pub fn next_seed() -> u64 {
    RNG.with_borrow_mut(|rng| rng.random::<u64>())
}
