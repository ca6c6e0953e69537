use std::sync::atomic::{AtomicU64, Ordering};

use super::Rb;

const SIZE: usize = 64;

fn record(ty: u32, body: &[u8]) -> Vec<u8> {
    let size = (8 + body.len()) as u16;
    let mut buf = vec![];
    buf.extend_from_slice(&ty.to_ne_bytes());
    buf.extend_from_slice(&0_u16.to_ne_bytes());
    buf.extend_from_slice(&size.to_ne_bytes());
    buf.extend_from_slice(body);
    buf
}

// Writes `bytes` at the free-running position `pos`, wrapping like the kernel does.
fn put(data: &mut [u8], pos: u64, bytes: &[u8]) {
    for (i, byte) in bytes.iter().enumerate() {
        data[(pos as usize + i) % data.len()] = *byte;
    }
}

fn drain_all(data: &[u8], tail: &AtomicU64, head: &AtomicU64) -> (Option<usize>, Vec<Vec<u8>>) {
    let mut records = vec![];
    let n = Rb::new(data, tail, head).drain(|it| records.push(it.to_vec()));
    (n, records)
}

#[test]
fn test_empty() {
    let data = [0; SIZE];
    let tail = AtomicU64::new(40);
    let head = AtomicU64::new(40);

    let (n, records) = drain_all(&data, &tail, &head);
    assert_eq!(n, None);
    assert!(records.is_empty());
    assert_eq!(tail.load(Ordering::Relaxed), 40);
}

#[test]
fn test_single_record_in_place() {
    let mut data = [0; SIZE];
    let rec = record(9, &[1, 2, 3, 4, 5, 6, 7, 8]);
    put(&mut data, 0, &rec);

    let tail = AtomicU64::new(0);
    let head = AtomicU64::new(rec.len() as _);

    let (n, records) = drain_all(&data, &tail, &head);
    assert_eq!(n, Some(1));
    assert_eq!(records, vec![rec.clone()]);
    assert_eq!(tail.load(Ordering::Relaxed), rec.len() as u64);
}

#[test]
fn test_split_header() {
    let mut data = [0; SIZE];
    let rec = record(9, &[0xaa; 16]);
    // Header starts 3 bytes before the end of the buffer.
    let pos = (SIZE - 3) as u64;
    put(&mut data, pos, &rec);

    let tail = AtomicU64::new(pos);
    let head = AtomicU64::new(pos + rec.len() as u64);

    let (n, records) = drain_all(&data, &tail, &head);
    assert_eq!(n, Some(1));
    assert_eq!(records, vec![rec]);
    assert_eq!(tail.load(Ordering::Relaxed), head.load(Ordering::Relaxed));
}

#[test]
fn test_split_body() {
    let mut data = [0; SIZE];
    let body: Vec<u8> = (0..24).collect();
    let rec = record(9, &body);
    // Header fits, body wraps.
    let pos = (SIZE - 16) as u64;
    put(&mut data, pos, &rec);

    let tail = AtomicU64::new(pos);
    let head = AtomicU64::new(pos + rec.len() as u64);

    let (n, records) = drain_all(&data, &tail, &head);
    assert_eq!(n, Some(1));
    assert_eq!(records, vec![rec]);
}

#[test]
fn test_many_records_after_many_wraps() {
    let mut data = [0; SIZE];
    let recs: Vec<_> = (0..3_u8).map(|i| record(9, &[i; 8])).collect();

    // Positions keep growing past the buffer size, the records stay within capacity.
    let start = (SIZE * 5 + 40) as u64;
    let mut pos = start;
    for rec in &recs {
        put(&mut data, pos, rec);
        pos += rec.len() as u64;
    }
    assert!(pos - start <= SIZE as u64);

    let tail = AtomicU64::new(start);
    let head = AtomicU64::new(pos);

    let (n, records) = drain_all(&data, &tail, &head);
    assert_eq!(n, Some(recs.len()));
    assert_eq!(records, recs);
    assert_eq!(tail.load(Ordering::Relaxed), pos);
}

#[test]
fn test_head_snapshot() {
    let mut data = [0; SIZE];
    let rec = record(9, &[0; 8]);
    put(&mut data, 0, &rec);
    put(&mut data, 16, &rec);

    let tail = AtomicU64::new(0);
    let head = AtomicU64::new(16);

    let mut seen = 0;
    let n = Rb::new(&data, &tail, &head).drain(|_| {
        seen += 1;
        // A producer moving on during the drain is not followed.
        head.store(32, Ordering::Release);
    });
    assert_eq!(n, Some(1));
    assert_eq!(seen, 1);
    assert_eq!(tail.load(Ordering::Relaxed), 16);
}

#[test]
fn test_undersized_record_resyncs() {
    let mut data = [0; SIZE];
    let mut rec = record(9, &[0; 8]);
    rec[6..8].copy_from_slice(&4_u16.to_ne_bytes());
    put(&mut data, 0, &rec);

    let tail = AtomicU64::new(0);
    let head = AtomicU64::new(32);

    let (n, records) = drain_all(&data, &tail, &head);
    assert_eq!(n, Some(0));
    assert!(records.is_empty());
    assert_eq!(tail.load(Ordering::Relaxed), 32);
}

#[test]
fn test_record_past_head_resyncs() {
    let mut data = [0; SIZE];
    let first = record(9, &[1; 8]);
    let second = record(9, &[2; 32]);
    put(&mut data, 0, &first);
    put(&mut data, first.len() as u64, &second);

    let tail = AtomicU64::new(0);
    // The second record is not fully published yet.
    let head = AtomicU64::new((first.len() + 8) as u64);

    let (n, records) = drain_all(&data, &tail, &head);
    assert_eq!(n, Some(1));
    assert_eq!(records, vec![first]);
    assert_eq!(tail.load(Ordering::Relaxed), head.load(Ordering::Relaxed));
}
