//! Seeded synthetic traffic for driving the counting programs.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use statmap_config::WorkloadConfig;
use statmap_core::programs::{ActionSet, KillArgs, PacketContext};

/// Offsets of generated packets start below this.
const MAX_DATA_OFFSET: u64 = 4096;

pub struct Workload {
    rng: SmallRng,
    config: WorkloadConfig,
    target_signal: i64,
}

impl Workload {
    pub fn new(config: &WorkloadConfig, target_signal: i64, seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            config: config.clone(),
            target_signal,
        }
    }

    /// Seed of processing unit `unit` for a run seeded with `seed`.
    pub fn unit_seed(seed: u64, unit: usize) -> u64 {
        seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(unit as u64)
    }

    pub fn packet(&mut self) -> PacketContext {
        let len = self.rng.random_range(64..=self.config.max_packet_len);
        let data = self.rng.random_range(0..MAX_DATA_OFFSET);
        if self.rng.random_bool(self.config.malformed_ratio) {
            PacketContext::new(data + len, data)
        } else {
            PacketContext::new(data, data + len)
        }
    }

    pub fn action<A: ActionSet>(&mut self) -> u32 {
        if self.rng.random_bool(self.config.out_of_range_ratio) {
            A::MAX_ACTIONS + self.rng.random_range(0..4)
        } else {
            self.rng.random_range(0..A::MAX_ACTIONS)
        }
    }

    pub fn kill_event(&mut self) -> KillArgs {
        let pid = self.rng.random_range(1..=32_768);
        if self.rng.random_bool(self.config.target_signal_ratio) {
            return KillArgs::new(pid, self.target_signal);
        }
        loop {
            let sig = self.rng.random_range(1..=31);
            if sig != self.target_signal {
                return KillArgs::new(pid, sig);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statmap_core::programs::{Xdp, SIGUSR1};

    fn config(malformed: f64, out_of_range: f64, target: f64) -> WorkloadConfig {
        WorkloadConfig {
            malformed_ratio: malformed,
            out_of_range_ratio: out_of_range,
            target_signal_ratio: target,
            ..WorkloadConfig::default()
        }
    }

    #[test]
    fn same_seed_same_traffic() {
        let cfg = WorkloadConfig::default();
        let mut a = Workload::new(&cfg, SIGUSR1, 42);
        let mut b = Workload::new(&cfg, SIGUSR1, 42);
        for _ in 0..100 {
            assert_eq!(a.packet(), b.packet());
            assert_eq!(a.action::<Xdp>(), b.action::<Xdp>());
            assert_eq!(a.kill_event(), b.kill_event());
        }
    }

    #[test]
    fn ratios_at_the_extremes() {
        let mut clean = Workload::new(&config(0.0, 0.0, 0.0), SIGUSR1, 1);
        let mut dirty = Workload::new(&config(1.0, 1.0, 1.0), SIGUSR1, 1);
        for _ in 0..200 {
            assert!(clean.packet().len().is_some());
            assert!(clean.action::<Xdp>() < Xdp::MAX_ACTIONS);
            assert_ne!(clean.kill_event().sig, SIGUSR1);

            assert!(dirty.packet().len().is_none());
            assert!(dirty.action::<Xdp>() >= Xdp::MAX_ACTIONS);
            assert_eq!(dirty.kill_event().sig, SIGUSR1);
        }
    }

    #[test]
    fn packet_lengths_respect_bounds() {
        let cfg = WorkloadConfig {
            max_packet_len: 128,
            malformed_ratio: 0.0,
            ..WorkloadConfig::default()
        };
        let mut workload = Workload::new(&cfg, SIGUSR1, 9);
        for _ in 0..500 {
            let len = workload.packet().len().unwrap();
            assert!((64..=128).contains(&len));
        }
    }

    #[test]
    fn unit_seeds_differ() {
        assert_ne!(Workload::unit_seed(5, 0), Workload::unit_seed(5, 1));
    }
}
