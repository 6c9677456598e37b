//! Type-state builder for `Core`.
//!
//! The builder enforces at compile time that `target_empty_g` is provided
//! before `build()` is available. The clock is enforced through the
//! generic parameter itself: `CoreBuilder` defaults to `MonotonicClock` and
//! `with_clock` swaps in any other `Clock` implementation (e.g. `TestClock`
//! in tests), rather than gating it behind an `Option`.

use std::marker::PhantomData;

use infusion_traits::{Clock, MonotonicClock};

use crate::config::{CoreConfig, FilterTuning, FusionTuning, PhysicalConstants, RingConfig, StateMachineTimings};
use crate::core::Core;
use crate::error::BuildError;

pub struct Missing;
pub struct Set;

pub struct CoreBuilder<C, T> {
    clock: C,
    config: CoreConfig,
    _t: PhantomData<T>,
}

impl Default for CoreBuilder<MonotonicClock, Missing> {
    fn default() -> Self {
        Self {
            clock: MonotonicClock::new(),
            config: CoreConfig::default(),
            _t: PhantomData,
        }
    }
}

impl CoreBuilder<MonotonicClock, Missing> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock, T> CoreBuilder<C, T> {
    /// Swap in a different clock implementation, e.g. `TestClock` for
    /// deterministic tests.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> CoreBuilder<C2, T> {
        CoreBuilder { clock, config: self.config, _t: PhantomData }
    }

    pub fn with_physical(mut self, physical: PhysicalConstants) -> Self {
        self.config.physical = physical;
        self
    }

    pub fn with_timings(mut self, timings: StateMachineTimings) -> Self {
        self.config.timings = timings;
        self
    }

    pub fn with_filters(mut self, filters: FilterTuning) -> Self {
        self.config.filters = filters;
        self
    }

    pub fn with_fusion(mut self, fusion: FusionTuning) -> Self {
        self.config.fusion = fusion;
        self
    }

    pub fn with_ring(mut self, ring: RingConfig) -> Self {
        self.config.ring = ring;
        self
    }
}

impl<C: Clock> CoreBuilder<C, Missing> {
    pub fn with_target_empty_g(self, target_empty_g: f32) -> CoreBuilder<C, Set> {
        CoreBuilder {
            clock: self.clock,
            config: CoreConfig { target_empty_g, ..self.config },
            _t: PhantomData,
        }
    }
}

impl<C: Clock> CoreBuilder<C, Set> {
    /// Validate the assembled configuration and build the core.
    pub fn build(self) -> Result<Core<C>, BuildError> {
        self.config.validate().map_err(BuildError::InvalidConfig)?;
        Ok(Core::new(self.clock, self.config))
    }
}
