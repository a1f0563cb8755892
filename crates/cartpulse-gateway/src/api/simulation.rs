use std::time::Duration;

use rand::Rng;

use crate::api::cart::CartAction;
use crate::config::SimulationConfig;

/// Random failures and processing delay for the cart routes.
#[derive(Debug, Clone)]
pub struct Simulation {
    cfg: SimulationConfig,
}

impl Simulation {
    pub fn new(cfg: SimulationConfig) -> Self {
        Self { cfg }
    }

    /// Never fails and never sleeps; used by tests.
    pub fn disabled() -> Self {
        Self::new(SimulationConfig {
            add_error_rate: 0.0,
            remove_error_rate: 0.0,
            max_delay_ms: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.cfg
    }

    pub fn should_fail(&self, action: CartAction) -> bool {
        let rate = match action {
            CartAction::Add => self.cfg.add_error_rate,
            CartAction::Remove => self.cfg.remove_error_rate,
        };
        rate > 0.0 && rand::random::<f64>() < rate
    }

    /// Processing delay in `[0, max_delay_ms)`.
    pub fn delay(&self) -> Duration {
        if self.cfg.max_delay_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..self.cfg.max_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_never_fails_or_waits() {
        let sim = Simulation::disabled();
        for _ in 0..1000 {
            assert!(!sim.should_fail(CartAction::Add));
            assert!(!sim.should_fail(CartAction::Remove));
            assert_eq!(sim.delay(), Duration::ZERO);
        }
    }

    #[test]
    fn certain_failure_always_fails() {
        let sim = Simulation::new(SimulationConfig {
            add_error_rate: 1.0,
            remove_error_rate: 0.0,
            max_delay_ms: 0,
        });
        for _ in 0..1000 {
            assert!(sim.should_fail(CartAction::Add));
            assert!(!sim.should_fail(CartAction::Remove));
        }
    }

    #[test]
    fn delay_stays_below_max() {
        let sim = Simulation::new(SimulationConfig {
            add_error_rate: 0.0,
            remove_error_rate: 0.0,
            max_delay_ms: 5,
        });
        for _ in 0..1000 {
            assert!(sim.delay() < Duration::from_millis(5));
        }
    }
}
