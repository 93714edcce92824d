use criterion::{Criterion, criterion_group, criterion_main};
use regmirror::field::{Access, Field};
use regmirror::layout::{Entry, Layout};
use regmirror::state::{ReadMode, RegisterFile};
use regmirror::transport::MemTransport;

fn gen_entries(address_count: u16) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(address_count as usize * 3);

    // three fields per address: two sub-byte and one flag
    for addr in 0..address_count {
        entries.push(
            Field::new(format!("lo{}", addr), addr)
                .bits(0, 3)
                .access(Access::ReadWrite)
                .into(),
        );
        entries.push(
            Field::new(format!("hi{}", addr), addr)
                .bits(3, 4)
                .access(Access::ReadWrite)
                .into(),
        );
        entries.push(
            Field::new(format!("flag{}", addr), addr)
                .bits(7, 1)
                .access(Access::ReadOnly)
                .into(),
        );
    }

    entries
}

fn gen_transport(address_count: u16) -> MemTransport {
    // Deterministic but non-trivial pattern
    MemTransport::with_memory((0..address_count).map(|a| (a, u64::from(a) * 31 % 256)))
}

fn bench_layout_build(c: &mut Criterion) {
    for &address_count in &[1u16, 16, 64, 256] {
        let entries = gen_entries(address_count);
        c.bench_function(&format!("build_{}_addresses", address_count), |b| {
            b.iter(|| {
                let _ = Layout::build(&entries, 8).unwrap();
            })
        });
    }
}

fn bench_read_state(c: &mut Criterion) {
    for &address_count in &[16u16, 64, 256] {
        let entries = gen_entries(address_count);
        c.bench_function(&format!("read_state_{}_addresses", address_count), |b| {
            let mut mirror =
                RegisterFile::new(gen_transport(address_count), &entries, 8).unwrap();
            b.iter(|| {
                let _ = mirror
                    .read_state(None, ReadMode::Burst, true)
                    .unwrap();
            })
        });
    }
}

criterion_group!(benches, bench_layout_build, bench_read_state);
criterion_main!(benches);
