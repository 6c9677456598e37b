use infusion_core::BuildError;
use infusion_core::builder::CoreBuilder;
use infusion_core::config::RingConfig;
use infusion_traits::TestClock;
use rstest::rstest;

#[rstest]
fn ring_capacity_below_floor_yields_invalid_config() {
    let err = CoreBuilder::new()
        .with_clock(TestClock::new())
        .with_ring(RingConfig { capacity: 1 })
        .with_target_empty_g(0.0)
        .build()
        .expect_err("capacity 1 is below the 8-slot floor");
    assert!(matches!(err, BuildError::InvalidConfig(_)));
}

#[rstest]
fn negative_target_empty_g_yields_invalid_config() {
    let err = CoreBuilder::new()
        .with_clock(TestClock::new())
        .with_target_empty_g(-1.0)
        .build()
        .expect_err("negative target_empty_g must be rejected");
    assert!(matches!(err, BuildError::InvalidConfig(_)));
}

#[rstest]
fn plausible_config_builds_successfully() {
    let core = CoreBuilder::new()
        .with_clock(TestClock::new())
        .with_target_empty_g(5.0)
        .build();
    assert!(core.is_ok());
}

#[rstest]
#[case(BuildError::MissingClock, "missing clock")]
#[case(BuildError::MissingTargetEmpty, "missing target_empty_g")]
#[case(BuildError::InvalidConfig("ring.capacity must be >= 8"), "invalid config: ring.capacity must be >= 8")]
fn build_error_messages_are_operator_readable(#[case] err: BuildError, #[case] expected: &str) {
    assert_eq!(err.to_string(), expected);
}
