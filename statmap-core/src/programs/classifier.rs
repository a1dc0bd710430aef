//! ## statmap-core::programs::classifier
//! **Per-action packet and byte counter**
//!
//! The classifier is a pure observer: it tallies the verdict the pipeline
//! stage is about to return and hands that verdict back unchanged. Only a
//! rejected invocation changes the returned code, to the family's reject
//! sentinel.

use std::marker::PhantomData;

use crate::error::CountError;
use crate::record::PacketRecord;
use crate::table::UnitWriter;

use super::action::ActionSet;

/// Start and end offsets of a packet buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketContext {
    pub data: u64,
    pub data_end: u64,
}

impl PacketContext {
    pub const fn new(data: u64, data_end: u64) -> Self {
        Self { data, data_end }
    }

    /// Well-formed context of `len` bytes starting at offset 0.
    pub const fn with_len(len: u64) -> Self {
        Self::new(0, len)
    }

    /// Packet length, or `None` when the end precedes the start.
    #[inline]
    pub fn len(&self) -> Option<u64> {
        self.data_end.checked_sub(self.data)
    }
}

/// Counts packets per verdict of the action family `A` on one unit.
pub struct ClassifierCounter<A: ActionSet> {
    writer: UnitWriter<PacketRecord>,
    _family: PhantomData<A>,
}

impl<A: ActionSet> ClassifierCounter<A> {
    pub fn new(writer: UnitWriter<PacketRecord>) -> Self {
        Self {
            writer,
            _family: PhantomData,
        }
    }

    pub fn unit(&self) -> usize {
        self.writer.unit()
    }

    /// Counts one packet under `action` and returns `action`.
    #[inline]
    pub fn record_action(&mut self, ctx: &PacketContext, action: u32) -> Result<u32, CountError> {
        let bytes = ctx.len().ok_or(CountError::MalformedInput {
            data: ctx.data,
            data_end: ctx.data_end,
        })?;

        if action >= A::MAX_ACTIONS {
            return Err(CountError::KeyOutOfRange {
                key: action,
                max_keys: A::MAX_ACTIONS,
            });
        }

        let mut rec = self.writer.get_or_fail(action)?;
        rec.rx_packets = rec.rx_packets.wrapping_add(1);
        rec.rx_bytes = rec.rx_bytes.wrapping_add(bytes);

        Ok(action)
    }

    /// Program entry point: `action` on success, `A::REJECT` otherwise.
    #[inline]
    pub fn run(&mut self, ctx: &PacketContext, action: u32) -> u32 {
        self.record_action(ctx, action).unwrap_or(A::REJECT)
    }

    /// [`run`](Self::run) with the family's default verdict.
    #[inline]
    pub fn run_default(&mut self, ctx: &PacketContext) -> u32 {
        self.run(ctx, A::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::action::{tc_action, xdp_action, Tc, Xdp};
    use crate::table::PerUnitTable;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn xdp_counter(max_keys: u32) -> (Arc<PerUnitTable<PacketRecord>>, ClassifierCounter<Xdp>) {
        let table = PerUnitTable::create("xdp_stats_map", 2, max_keys).unwrap();
        let counter = ClassifierCounter::new(table.claim(0).unwrap());
        (table, counter)
    }

    fn all_zero(table: &PerUnitTable<PacketRecord>) -> bool {
        (0..table.max_keys()).all(|k| table.snapshot(k).unwrap() == PacketRecord::default())
    }

    #[test]
    fn counts_packets_and_bytes_under_action() {
        let (table, mut counter) = xdp_counter(4);
        for _ in 0..3 {
            assert_eq!(counter.run(&PacketContext::with_len(64), 1), 1);
        }

        assert_eq!(table.snapshot(1).unwrap(), PacketRecord::new(3, 192));
        for key in [0, 2, 3] {
            assert_eq!(table.snapshot(key).unwrap(), PacketRecord::default());
        }
    }

    #[test]
    fn one_past_table_capacity_is_rejected() {
        let (table, mut counter) = xdp_counter(4);
        assert_eq!(
            counter.run(&PacketContext::with_len(64), 4),
            xdp_action::XDP_ABORTED
        );
        assert!(all_zero(&table));
    }

    #[test]
    fn action_outside_family_is_rejected() {
        let (table, mut counter) = xdp_counter(Xdp::MAX_ACTIONS);
        assert_eq!(
            counter.record_action(&PacketContext::with_len(10), Xdp::MAX_ACTIONS),
            Err(CountError::KeyOutOfRange {
                key: Xdp::MAX_ACTIONS,
                max_keys: Xdp::MAX_ACTIONS
            })
        );
        assert!(all_zero(&table));
    }

    #[test]
    fn default_entry_point_counts_pass() {
        let (table, mut counter) = xdp_counter(Xdp::MAX_ACTIONS);
        assert_eq!(
            counter.run_default(&PacketContext::with_len(1500)),
            xdp_action::XDP_PASS
        );
        assert_eq!(
            table.snapshot(xdp_action::XDP_PASS).unwrap(),
            PacketRecord::new(1, 1500)
        );
    }

    #[test]
    fn tc_rejects_with_shot() {
        let table = PerUnitTable::create("tc_stats_map", 1, Tc::MAX_ACTIONS).unwrap();
        let mut counter = ClassifierCounter::<Tc>::new(table.claim(0).unwrap());

        assert_eq!(
            counter.run(&PacketContext::new(100, 40), tc_action::TC_ACT_OK),
            tc_action::TC_ACT_SHOT
        );
        assert_eq!(
            counter.run(&PacketContext::with_len(40), tc_action::TC_ACT_OK),
            tc_action::TC_ACT_OK
        );
        assert_eq!(
            table.snapshot(tc_action::TC_ACT_OK).unwrap(),
            PacketRecord::new(1, 40)
        );
    }

    #[test]
    fn zero_length_packet_counts_no_bytes() {
        let (table, mut counter) = xdp_counter(4);
        assert_eq!(counter.run(&PacketContext::new(7, 7), 0), 0);
        assert_eq!(table.snapshot(0).unwrap(), PacketRecord::new(1, 0));
    }

    #[test]
    fn torn_down_table_rejects() {
        let (table, mut counter) = xdp_counter(4);
        table.teardown();
        assert!(matches!(
            counter.record_action(&PacketContext::with_len(64), 1),
            Err(CountError::TableUnavailable { .. })
        ));
        assert_eq!(counter.run(&PacketContext::with_len(64), 1), Xdp::REJECT);
        assert!(all_zero(&table));
    }

    proptest! {
        #[test]
        fn underflow_is_rejected_for_any_action(
            data in 1u64..u64::MAX,
            shortfall in 1u64..4096,
            action in 0u32..16,
        ) {
            let (table, mut counter) = xdp_counter(Xdp::MAX_ACTIONS);
            let ctx = PacketContext::new(data, data.saturating_sub(shortfall));
            prop_assert_eq!(
                counter.record_action(&ctx, action),
                Err(CountError::MalformedInput { data: ctx.data, data_end: ctx.data_end })
            );
            prop_assert!(all_zero(&table));
        }

        #[test]
        fn increments_are_linear(
            action in 0u32..Xdp::MAX_ACTIONS,
            lengths in proptest::collection::vec(0u64..65_536, 0..64),
        ) {
            let (table, mut counter) = xdp_counter(Xdp::MAX_ACTIONS);
            for len in &lengths {
                prop_assert_eq!(counter.run(&PacketContext::with_len(*len), action), action);
            }
            prop_assert_eq!(
                table.snapshot(action).unwrap(),
                PacketRecord::new(lengths.len() as u64, lengths.iter().sum())
            );
        }
    }
}
