//! Integration tests for Buffer module

use reverser::{Buffer, SessionError};

#[test]
fn test_commit_reverses_written_bytes() {
    let mut buffer = Buffer::allocate(8).unwrap();
    assert_eq!(buffer.append(b"hello"), 5);
    buffer.reverse_commit();

    assert_eq!(buffer.available(), 5);
    assert_eq!(buffer.drain(10), b"olleh");
    assert_eq!(buffer.available(), 0);
}

#[test]
fn test_double_commit_restores_original_order() {
    let mut buffer = Buffer::allocate(8).unwrap();
    buffer.append(b"abc");
    buffer.reverse_commit();
    buffer.reverse_commit();

    assert_eq!(buffer.drain(8), b"abc");
}

#[test]
fn test_commit_rewinds_reader() {
    let mut buffer = Buffer::allocate(8).unwrap();
    buffer.append(b"abcd");
    buffer.reverse_commit();
    assert_eq!(buffer.drain(2), b"dc");

    buffer.reverse_commit();
    assert_eq!(buffer.available(), 4);
    assert_eq!(buffer.drain(8), b"abcd");
}

#[test]
fn test_oversized_append_is_short() {
    let mut buffer = Buffer::allocate(4).unwrap();
    assert_eq!(buffer.append(b"hello"), 4);
    assert_eq!(buffer.remaining(), 0);
    assert_eq!(buffer.append(b"o"), 0);

    buffer.reverse_commit();
    assert_eq!(buffer.drain(16), b"lleh");
}

#[test]
fn test_append_across_calls_until_full() {
    let mut buffer = Buffer::allocate(5).unwrap();
    assert_eq!(buffer.append(b"ab"), 2);
    assert_eq!(buffer.append(b"cd"), 2);
    assert_eq!(buffer.append(b"efg"), 1);
    assert_eq!(buffer.drain(5), b"abcde");
}

#[test]
fn test_drain_empty_is_not_an_error() {
    let mut buffer = Buffer::allocate(4).unwrap();
    assert!(buffer.drain(4).is_empty());

    let mut out = [0u8; 4];
    assert_eq!(buffer.drain_into(&mut out), 0);
}

#[test]
fn test_partial_drain() {
    let mut buffer = Buffer::allocate(8).unwrap();
    buffer.append(b"abcdef");
    buffer.reverse_commit();

    let mut out = [0u8; 4];
    assert_eq!(buffer.drain_into(&mut out), 4);
    assert_eq!(&out, b"fedc");
    assert_eq!(buffer.available(), 2);
    assert_eq!(buffer.drain(4), b"ba");
}

#[test]
fn test_drain_zero_length() {
    let mut buffer = Buffer::allocate(4).unwrap();
    buffer.append(b"ab");
    assert!(buffer.drain(0).is_empty());
    assert_eq!(buffer.available(), 2);
}

#[test]
fn test_out_of_memory() {
    assert!(matches!(
        Buffer::allocate(usize::MAX),
        Err(SessionError::OutOfMemory { .. })
    ));
}
