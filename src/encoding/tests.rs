use super::*;

#[test]
fn u32_be_round_trips_and_sorts_numerically() {
    let enc = U32BEEncoding;
    let a = enc.serialize(&1).unwrap();
    let b = enc.serialize(&256).unwrap();
    assert!(a < b);
    assert_eq!(enc.deserialize(&a).unwrap(), 1);
    assert_eq!(enc.deserialize(&b).unwrap(), 256);
}

#[test]
fn u32_le_does_not_sort_numerically() {
    let enc = U32LEEncoding;
    let a = enc.serialize(&1).unwrap();
    let b = enc.serialize(&256).unwrap();
    // little-endian: low byte first, so 1 > 256 in byte order
    assert!(a > b);
    assert_eq!(enc.deserialize(&a).unwrap(), 1);
}

#[test]
fn u64_be_round_trips() {
    let enc = U64BEEncoding;
    let bytes = enc.serialize(&u64::MAX).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(enc.deserialize(&bytes).unwrap(), u64::MAX);
}

#[test]
fn string_round_trips() {
    let enc = StringEncoding;
    let bytes = enc.serialize(&"hello".to_string()).unwrap();
    assert_eq!(enc.deserialize(&bytes).unwrap(), "hello");
}

#[test]
fn string_rejects_invalid_utf8() {
    let enc = StringEncoding;
    assert!(enc.deserialize(&[0xFF, 0xFE]).is_err());
}

#[test]
fn buffer_is_identity() {
    let enc = BufferEncoding;
    let bytes = enc.serialize(&vec![1, 2, 3]).unwrap();
    assert_eq!(bytes, vec![1, 2, 3]);
    assert_eq!(enc.deserialize(&bytes).unwrap(), vec![1, 2, 3]);
}

#[test]
fn nullable_buffer_round_trips_both_variants() {
    let enc = NullableBufferEncoding;
    let none_bytes = enc.serialize(&None).unwrap();
    assert_eq!(enc.deserialize(&none_bytes).unwrap(), None);

    let some_bytes = enc.serialize(&Some(vec![9, 9])).unwrap();
    assert_eq!(enc.deserialize(&some_bytes).unwrap(), Some(vec![9, 9]));
}

#[test]
fn nullable_string_round_trips_both_variants() {
    let enc = NullableStringEncoding;
    let none_bytes = enc.serialize(&None).unwrap();
    assert_eq!(enc.deserialize(&none_bytes).unwrap(), None);

    let some_bytes = enc.serialize(&Some("hi".to_string())).unwrap();
    assert_eq!(enc.deserialize(&some_bytes).unwrap(), Some("hi".to_string()));
}

#[test]
fn prefix_encoding_concatenates_and_splits() {
    let enc = PrefixEncoding::new(U32BEEncoding, StringEncoding, 4);
    let bytes = enc.serialize(&(7u32, "leaf".to_string())).unwrap();
    assert_eq!(&bytes[0..4], &U32BEEncoding.serialize(&7).unwrap()[..]);
    let (p, k) = enc.deserialize(&bytes).unwrap();
    assert_eq!(p, 7);
    assert_eq!(k, "leaf");
}

#[test]
fn prefix_encoding_rejects_wrong_prefix_width() {
    // U32LEEncoding also emits 4 bytes, so force a mismatch artificially
    // via key_range on a prefix encoding with an impossible size.
    let enc = PrefixEncoding::new(U32BEEncoding, StringEncoding, 8);
    let result = enc.serialize(&(1u32, "x".to_string()));
    assert!(matches!(
        result,
        Err(EncodingError::PrefixSizeError {
            expected: 8,
            actual: 4
        })
    ));
}

#[test]
fn prefix_encoding_key_range_matches_prefix_bytes() {
    let enc = PrefixEncoding::new(U32BEEncoding, StringEncoding, 4);
    let range = enc.key_range(&7).unwrap();
    let key = enc.serialize(&(7u32, "anything".to_string())).unwrap();
    assert!(range.contains(&key));
    let other_key = enc.serialize(&(8u32, "anything".to_string())).unwrap();
    assert!(!range.contains(&other_key));
}

#[test]
fn prefix_array_encoding_round_trips_components() {
    let enc = PrefixArrayEncoding::new(BufferEncoding, vec![4, 2]);
    let bytes = enc
        .serialize_components(&[vec![0, 0, 0, 1], vec![9, 9]])
        .unwrap();
    let components = enc.deserialize_components(&bytes).unwrap();
    assert_eq!(components, vec![vec![0, 0, 0, 1], vec![9, 9]]);
}

#[test]
fn increment_be_carries_through_high_order_bytes() {
    assert_eq!(increment_be(&[0x00]), Some(vec![0x01]));
    assert_eq!(increment_be(&[0x00, 0xFF]), Some(vec![0x01, 0x00]));
    assert_eq!(increment_be(&[0xFF, 0xFF]), None);
}

#[test]
fn key_range_from_prefix_is_half_open() {
    let range = KeyRange::from_prefix(&[0x01, 0x00]);
    assert!(range.contains(&[0x01, 0x00]));
    assert!(range.contains(&[0x01, 0x00, 0xFF]));
    assert!(!range.contains(&[0x01, 0x01]));
    assert!(!range.contains(&[0x00, 0xFF]));
}

#[test]
fn key_range_from_all_ff_prefix_is_unbounded_above() {
    let range = KeyRange::from_prefix(&[0xFF, 0xFF]);
    assert_eq!(range.lt, None);
    assert!(range.contains(&[0xFF, 0xFF, 0x00]));
    assert!(range.contains(&[0xFF, 0xFF, 0xFF, 0xFF]));
}
