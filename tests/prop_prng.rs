use proptest::prelude::*;
use runner_track::Prng;
use runner_track::rng::PRNG_MODULUS;

proptest! {
    // next_double stays in [0, 1) for any valid seed
    #[test]
    fn prng_double_in_unit_interval(seed in 1u32..PRNG_MODULUS) {
        let mut rng = Prng::new(seed).unwrap();
        for _ in 0..10_000 {
            let x = rng.next_double();
            prop_assert!((0.0..1.0).contains(&x), "draw {x}");
        }
    }

    // The state never reaches 0 or the modulus
    #[test]
    fn prng_state_stays_in_range(seed in 1u32..PRNG_MODULUS) {
        let mut rng = Prng::new(seed).unwrap();
        for _ in 0..2_000 {
            let v = rng.next_uint();
            prop_assert!(v > 0 && v < PRNG_MODULUS);
        }
    }

    // Same seed, same stream
    #[test]
    fn prng_is_reproducible(seed in 1u32..PRNG_MODULUS) {
        let mut a = Prng::new(seed).unwrap();
        let mut b = Prng::new(seed).unwrap();
        for _ in 0..100 {
            prop_assert_eq!(a.next_uint(), b.next_uint());
        }
    }

    // Inclusive integer ranges never escape their bounds
    #[test]
    fn prng_int_range_bounded(seed in 1u32..PRNG_MODULUS, min in -50i32..50, span in 0i32..100) {
        let mut rng = Prng::new(seed).unwrap();
        for _ in 0..200 {
            let v = rng.next_int_range(min, min + span);
            prop_assert!(v >= min && v <= min + span);
        }
    }

    // Seeds outside (0, modulus) are rejected
    #[test]
    fn prng_rejects_bad_seeds(seed in prop_oneof![i64::MIN..=0, i64::from(PRNG_MODULUS)..=i64::MAX]) {
        let mut rng = Prng::default();
        prop_assert!(rng.set_seed(seed).is_err());
    }
}
