use kdpack_core::buffer::{DecoderBuffer, EncoderBuffer};
use kdpack_core::symbol::{decode_table, encode_table, ProbabilityTable};
use kdpack_core::{
    decode_symbols, encode_symbols, CompressionPolicy, KdTreeDecoder, KdTreeEncoder,
    SymbolCodingMethod, SymbolEncodingOptions, Traversal,
};
use proptest::prelude::*;

fn traversal() -> impl Strategy<Value = Traversal> {
    prop_oneof![
        Just(Traversal::Lifo),
        Just(Traversal::Fifo),
        Just(Traversal::PriorityByCount),
    ]
}

proptest! {
    #[test]
    fn test_symbols_roundtrip(
        values in prop::collection::vec(0..5000u32, 1..300),
        level in 0..=10u8,
    ) {
        let options = SymbolEncodingOptions { method: None, compression_level: level };
        let mut buffer = EncoderBuffer::new();
        encode_symbols(&values, 1, &options, &mut buffer).unwrap();
        let data = buffer.into_vec();

        let decoded = decode_symbols(values.len(), 1, &mut DecoderBuffer::new(&data)).unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn test_forced_schemes_roundtrip(
        groups in prop::collection::vec(prop::array::uniform3(0..70000u32), 1..100),
        raw in any::<bool>(),
    ) {
        let values: Vec<u32> = groups.iter().flatten().copied().collect();
        let method = if raw { SymbolCodingMethod::Raw } else { SymbolCodingMethod::Tagged };
        let options = SymbolEncodingOptions { method: Some(method), ..Default::default() };
        let mut buffer = EncoderBuffer::new();
        encode_symbols(&values, 3, &options, &mut buffer).unwrap();
        let data = buffer.into_vec();
        prop_assert_eq!(data[0], method as u8);

        let decoded = decode_symbols(values.len(), 3, &mut DecoderBuffer::new(&data)).unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn test_wide_symbols_roundtrip(values in prop::collection::vec(any::<u32>(), 1..100)) {
        let mut buffer = EncoderBuffer::new();
        encode_symbols(&values, 1, &SymbolEncodingOptions::default(), &mut buffer).unwrap();
        let data = buffer.into_vec();

        let decoded = decode_symbols(values.len(), 1, &mut DecoderBuffer::new(&data)).unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn test_points_roundtrip(
        raw in prop::collection::vec(prop::array::uniform3(0..1024u32), 0..200),
        level in 0..=10u8,
        traversal in traversal(),
    ) {
        let policy = CompressionPolicy::for_level(level).with_traversal(traversal);
        let encoder = KdTreeEncoder::new(3, policy).unwrap();
        let mut buffer = EncoderBuffer::new();
        encoder.encode_points(&raw, 10, &mut buffer).unwrap();
        let data = buffer.into_vec();

        let decoder = KdTreeDecoder::new(3, policy).unwrap();
        let mut decoded = decoder
            .decode_points_to_vec(&mut DecoderBuffer::new(&data), raw.len() as u32)
            .unwrap();
        let mut expected: Vec<Vec<u32>> = raw.iter().map(|p| p.to_vec()).collect();
        expected.sort();
        decoded.sort();
        prop_assert_eq!(decoded, expected);
    }

    #[test]
    fn test_probabilities_sum_to_precision(
        frequencies in prop::collection::vec(0..100_000u64, 1..300),
        precision_bits in 12..=20u32,
    ) {
        prop_assume!(frequencies.iter().any(|&f| f > 0));
        let table = ProbabilityTable::from_frequencies(&frequencies, precision_bits).unwrap();
        let probs = table.probabilities();

        prop_assert_eq!(probs.iter().map(|&p| p as u64).sum::<u64>(), 1u64 << precision_bits);
        for (&freq, &prob) in frequencies.iter().zip(&probs) {
            if freq > 0 {
                prop_assert!(prob >= 1);
            } else {
                prop_assert_eq!(prob, 0);
            }
        }
    }

    #[test]
    fn test_table_serialization_idempotent(
        frequencies in prop::collection::vec(prop_oneof![Just(0u64), 1..5000u64], 1..400),
    ) {
        prop_assume!(frequencies.iter().any(|&f| f > 0));
        let table = ProbabilityTable::from_frequencies(&frequencies, 16).unwrap();
        let probs = table.probabilities();

        let mut buffer = EncoderBuffer::new();
        encode_table(&probs, &mut buffer).unwrap();
        let data = buffer.into_vec();
        let decoded = decode_table(&mut DecoderBuffer::new(&data)).unwrap();
        prop_assert_eq!(&decoded, &probs);

        let mut again = EncoderBuffer::new();
        encode_table(&decoded, &mut again).unwrap();
        prop_assert_eq!(again.data(), data.as_slice());
    }
}
