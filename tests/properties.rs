use proptest::prelude::*;

use regmirror::bits;
use regmirror::field::Field;
use regmirror::layout::Entry;
use regmirror::state::{ReadMode, RegisterFile};
use regmirror::transport::MemTransport;

proptest! {
    // Any value within the declared width round-trips; the first value past
    // the width is rejected and leaves the cache untouched.
    #[test]
    fn set_value_round_trips_within_width(width in 1u8..=16, raw in any::<u64>()) {
        let mut field = Field::new("f", 0).bits(0, width);
        let value = raw & bits::mask(width);

        field.set_value(value).unwrap();
        prop_assert_eq!(field.value(), Some(value));

        prop_assert!(field.set_value(bits::mask(width) + 1).is_err());
        prop_assert_eq!(field.value(), Some(value));
    }

    // Reading a word through the mirror always decodes a field as
    // (raw & bitmask) >> offset, wherever the field sits in the word.
    #[test]
    fn decode_is_mask_then_shift(offset in 0u8..8, width in 1u8..=8, raw in any::<u64>()) {
        prop_assume!(offset + width <= 8);
        let word = raw & 0xFF;

        let entries: Vec<Entry> = vec![Field::new("f", 0x10).bits(offset, width).into()];
        let bus = MemTransport::with_memory([(0x10, word)]);
        let mut mirror = RegisterFile::new(bus, &entries, 8).unwrap();
        mirror.read_state(None, ReadMode::Discrete, true).unwrap();

        prop_assert_eq!(mirror.value("f"), Ok((word >> offset) & bits::mask(width)));
    }

    // Writing a field into a word the device already holds and then syncing
    // again is quiet: the second sync issues no write.
    #[test]
    fn read_modify_write_reaches_fixpoint(
        offset in 0u8..8,
        width in 1u8..=8,
        raw in any::<u64>(),
        device in any::<u64>(),
    ) {
        prop_assume!(offset + width <= 8);
        let value = raw & bits::mask(width);

        let entries: Vec<Entry> = vec![Field::new("f", 0x10).bits(offset, width).into()];
        let bus = MemTransport::with_memory([(0x10, device & 0xFF)]);
        let mut mirror = RegisterFile::new(bus, &entries, 8).unwrap();

        mirror.set_value("f", value).unwrap();
        mirror.write_state(None, true).unwrap();
        mirror.transport_mut().take_log();

        mirror.write_state(None, true).unwrap();
        let writes = mirror
            .transport()
            .log()
            .iter()
            .filter(|op| matches!(op, regmirror::transport::BusOp::Write { .. }))
            .count();
        prop_assert_eq!(writes, 0);
    }
}
