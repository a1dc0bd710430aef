//! End-to-end counting scenarios against pinned tables.

use std::sync::Arc;
use std::thread;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use statmap_core::prelude::*;

const NUM_UNITS: usize = 4;

#[test]
fn classifier_three_packets_on_one_action() {
    let registry = PinRegistry::default();
    let def = MapDef::new("xdp_stats_map", 4, Pinning::ByName);
    let table = registry
        .load_or_create::<PacketRecord>(&def, NUM_UNITS)
        .unwrap();
    let mut classifier = ClassifierCounter::<Xdp>::new(table.claim(0).unwrap());

    for _ in 0..3 {
        assert_eq!(classifier.run(&PacketContext::with_len(64), 1), 1);
    }

    let reader = registry.open::<PacketRecord>("xdp_stats_map").unwrap();
    assert_eq!(reader.snapshot(1).unwrap(), PacketRecord::new(3, 192));
    for key in [0, 2, 3] {
        assert_eq!(reader.snapshot(key).unwrap(), PacketRecord::new(0, 0));
    }
}

#[test]
fn filtered_counter_counts_two_of_seven() {
    let registry = PinRegistry::default();
    let table = registry
        .load_or_create::<CallRecord>(&TRACEPOINT_STATS_MAP, NUM_UNITS)
        .unwrap();
    let trace = Arc::new(TracePipe::default());
    let mut counter = SignalCounter::sigusr1(table.claim(0).unwrap(), Arc::clone(&trace));

    for _ in 0..2 {
        counter.run(&KillArgs::new(100, SIGUSR1));
    }
    for _ in 0..5 {
        counter.run(&KillArgs::new(100, 15));
    }

    let reader = registry
        .open::<CallRecord>(TRACEPOINT_STATS_MAP.name)
        .unwrap();
    assert_eq!(reader.snapshot(0).unwrap().calls, 2);
    assert_eq!(trace.drain().len(), 2);
}

#[test]
fn classifier_one_past_range_leaves_table_untouched() {
    let table = PerUnitTable::<PacketRecord>::create("xdp_stats_map", NUM_UNITS, 4).unwrap();
    let mut classifier = ClassifierCounter::<Xdp>::new(table.claim(0).unwrap());

    assert_eq!(
        classifier.run(&PacketContext::with_len(64), table.max_keys()),
        Xdp::REJECT
    );
    for key in 0..table.max_keys() {
        assert!(table
            .per_unit(key)
            .unwrap()
            .iter()
            .all(|r| *r == PacketRecord::default()));
    }
}

#[test]
fn concurrent_units_sum_exactly() {
    const PER_UNIT: u64 = 10_000;
    let table = PerUnitTable::<PacketRecord>::create("tc_stats_map", NUM_UNITS, Tc::MAX_ACTIONS)
        .unwrap();

    thread::scope(|s| {
        for unit in 0..NUM_UNITS {
            let mut classifier = ClassifierCounter::<Tc>::new(table.claim(unit).unwrap());
            s.spawn(move || {
                for _ in 0..PER_UNIT {
                    classifier.run_default(&PacketContext::with_len(unit as u64 + 1));
                }
            });
        }
        // Reading while units are writing is allowed.
        for _ in 0..100 {
            let seen = table.snapshot(tc_action::TC_ACT_OK).unwrap();
            assert!(seen.rx_packets <= PER_UNIT * NUM_UNITS as u64);
        }
    });

    let per_unit = table.per_unit(tc_action::TC_ACT_OK).unwrap();
    for (unit, rec) in per_unit.iter().enumerate() {
        assert_eq!(*rec, PacketRecord::new(PER_UNIT, PER_UNIT * (unit as u64 + 1)));
    }
    assert_eq!(
        table.snapshot(tc_action::TC_ACT_OK).unwrap(),
        PacketRecord::new(PER_UNIT * NUM_UNITS as u64, PER_UNIT * 10)
    );
}

#[test]
fn random_non_matching_signals_leave_calls_unchanged() {
    let table = PerUnitTable::<CallRecord>::create("tracepoint_stats_map", 1, 8).unwrap();
    let trace = Arc::new(TracePipe::default());
    let mut counter = SignalCounter::sigusr1(table.claim(0).unwrap(), trace);
    let mut rng = SmallRng::seed_from_u64(7);

    let mut processed = 0;
    while processed < 1000 {
        let sig: i64 = rng.random_range(-64..=64);
        if sig == SIGUSR1 {
            continue;
        }
        assert_eq!(
            counter.try_record(&KillArgs::new(1, sig)),
            Ok(EventOutcome::Ignored)
        );
        processed += 1;
    }
    assert_eq!(table.snapshot(0).unwrap().calls, 0);
}

#[test]
fn replaced_program_keeps_counting_into_same_table() {
    let registry = PinRegistry::default();
    let trace = Arc::new(TracePipe::default());

    for _generation in 0..3 {
        let table = registry
            .load_or_create::<CallRecord>(&KPROBE_STATS_MAP, NUM_UNITS)
            .unwrap();
        let mut probe = ProbeCounter::kprobe(table.claim(2).unwrap(), Arc::clone(&trace));
        for _ in 0..10 {
            probe.run();
        }
    }

    let reader = registry.open::<CallRecord>(KPROBE_STATS_MAP.name).unwrap();
    assert_eq!(reader.snapshot(0).unwrap().calls, 30);
    assert_eq!(reader.per_unit(0).unwrap()[2].calls, 30);
}
