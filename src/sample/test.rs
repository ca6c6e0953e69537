use super::*;
use crate::ffi::bindings as b;

fn sampler() -> Sampler {
    // 2^0 data pages.
    let arena = Arena::anonymous(2 * *PAGE_SIZE).unwrap();
    Sampler { arena }
}

fn record(ty: u32, body: &[u8]) -> Vec<u8> {
    let size = (8 + body.len()) as u16;
    let mut buf = vec![];
    buf.extend_from_slice(&ty.to_ne_bytes());
    buf.extend_from_slice(&0_u16.to_ne_bytes());
    buf.extend_from_slice(&size.to_ne_bytes());
    buf.extend_from_slice(body);
    buf
}

fn sample(ips: &[u64]) -> Vec<u8> {
    let mut body = vec![];
    body.extend_from_slice(&(ips.len() as u64).to_ne_bytes());
    for ip in ips {
        body.extend_from_slice(&ip.to_ne_bytes());
    }
    record(b::PERF_RECORD_SAMPLE, &body)
}

struct Names;

impl Symbolize for Names {
    fn resolve(&self, addr: u64) -> Option<String> {
        match addr {
            0x1000 => Some("main".into()),
            0x2000 => Some("libc.so.6+0x2a1ca".into()),
            _ => None,
        }
    }
}

#[test]
fn test_no_samples() {
    let sampler = sampler();
    assert_eq!(sampler.callchains(&Callchain::without_symbols(50)), None);
    assert_eq!(sampler.tail(), 0);
}

#[test]
fn test_raw_addresses() {
    let sampler = sampler();
    sampler.produce(&sample(&[0x1000, 0xffffffff81000010]));
    sampler.produce(&sample(&[0x2000]));

    let out = sampler.callchains(&Callchain::without_symbols(50));
    assert_eq!(
        out.as_deref(),
        Some("0x0000000000001000;0xffffffff81000010|0x0000000000002000|")
    );

    // Everything was consumed.
    assert_eq!(sampler.callchains(&Callchain::without_symbols(50)), None);
}

#[test]
fn test_symbols_with_raw_fallback() {
    let sampler = sampler();
    sampler.produce(&sample(&[0x1000, 0x1234, 0x2000]));

    let callchain = Callchain::new(Box::new(Names), 50);
    assert_eq!(
        sampler.callchains(&callchain).as_deref(),
        Some("main;0x0000000000001234;libc.so.6+0x2a1ca|")
    );
}

#[test]
fn test_wrapped_sample_renders_the_same() {
    let rec = sample(&[0x1000, 0x2000, 0x3000, 0x4000]);

    let straight = sampler();
    straight.produce(&rec);
    let expected = straight.callchains(&Callchain::without_symbols(50));

    // A lost record leaves 20 bytes before the end of the data pages, so the
    // sample header fits but its addresses wrap.
    let wrapped = sampler();
    let filler = record(b::PERF_RECORD_LOST, &vec![0; *PAGE_SIZE - 8 - 20]);
    wrapped.produce(&filler);
    // Consumed before the sample is written, as the kernel never overwrites unread data.
    assert_eq!(wrapped.callchains(&Callchain::without_symbols(50)).as_deref(), Some(""));
    wrapped.produce(&rec);
    let got = wrapped.callchains(&Callchain::without_symbols(50));

    assert!(expected.is_some());
    assert_eq!(got, expected);
    assert_eq!(wrapped.tail(), (filler.len() + rec.len()) as u64);
}

#[test]
fn test_too_deep_sample_is_skipped() {
    let sampler = sampler();
    let deep: Vec<u64> = (0..51).collect();
    sampler.produce(&sample(&deep));
    sampler.produce(&sample(&[0xabc]));

    let out = sampler.callchains(&Callchain::without_symbols(50));
    assert_eq!(out.as_deref(), Some("0x0000000000000abc|"));

    let total = sample(&deep).len() + sample(&[0xabc]).len();
    assert_eq!(sampler.tail(), total as u64);
}

#[test]
fn test_max_depth_is_configurable() {
    let sampler = sampler();
    sampler.produce(&sample(&[1, 2, 3]));

    let out = sampler.callchains(&Callchain::without_symbols(2));
    assert_eq!(out.as_deref(), Some(""));
}

#[test]
fn test_truncated_sample_is_skipped() {
    let sampler = sampler();
    let mut body = vec![];
    body.extend_from_slice(&3_u64.to_ne_bytes());
    body.extend_from_slice(&0x1000_u64.to_ne_bytes());
    sampler.produce(&record(b::PERF_RECORD_SAMPLE, &body));
    sampler.produce(&sample(&[0x2000]));

    let out = sampler.callchains(&Callchain::without_symbols(50));
    assert_eq!(out.as_deref(), Some("0x0000000000002000|"));
}

#[test]
fn test_huge_depth_without_limit_is_skipped() {
    let sampler = sampler();
    let mut body = vec![];
    body.extend_from_slice(&(1_u64 << 61).to_ne_bytes());
    body.extend_from_slice(&0x1000_u64.to_ne_bytes());
    sampler.produce(&record(b::PERF_RECORD_SAMPLE, &body));
    sampler.produce(&sample(&[0x2000]));

    let out = sampler.callchains(&Callchain::without_symbols(u64::MAX));
    assert_eq!(out.as_deref(), Some("0x0000000000002000|"));
}

#[test]
fn test_proc_maps() {
    let maps = "\
55d0c4a00000-55d0c4a28000 r--p 00000000 08:01 1048 /usr/bin/nginx
55d0c4a28000-55d0c4b00000 r-xp 00028000 08:01 1048 /usr/bin/nginx
7f45c0000000-7f45c0021000 rw-p 00000000 00:00 0
7f45c4028000-7f45c41bd000 r-xp 00028000 08:01 2231 /usr/lib/x86_64-linux-gnu/libc.so.6
7ffd1b9f0000-7ffd1b9f2000 r-xp 00000000 00:00 0 [vdso]
";
    let maps = ProcMaps::parse(maps);

    assert_eq!(maps.resolve(0x55d0c4a28010).as_deref(), Some("nginx+0x28010"));
    assert_eq!(maps.resolve(0x7f45c4029000).as_deref(), Some("libc.so.6+0x29000"));
    assert_eq!(maps.resolve(0x7ffd1b9f0004).as_deref(), Some("[vdso]+0x4"));
    // Not executable.
    assert_eq!(maps.resolve(0x55d0c4a00010), None);
    assert_eq!(maps.resolve(0x10), None);
}

#[test]
fn test_proc_maps_backend_self() {
    let symbols = ProcMapsBackend.attach(std::process::id()).unwrap();
    let addr = test_proc_maps_backend_self as usize as u64;
    assert!(symbols.resolve(addr).is_some());
}
