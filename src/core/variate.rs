use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// One normal draw via Box–Muller. `u` is taken from `(0, 1]` so the
/// logarithm is always defined; the sine companion is discarded.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, stdev: f64) -> f64 {
    let u = 1.0 - rng.r#gen::<f64>();
    let v = rng.r#gen::<f64>();
    let z = (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos();
    z * stdev + mean
}

pub fn seeded_rng(seed: u64) -> Pcg64Mcg {
    Pcg64Mcg::seed_from_u64(seed)
}

pub fn entropy_rng() -> Pcg64Mcg {
    Pcg64Mcg::from_entropy()
}
