//! Dispatch throughput per plan kind and buffer layout

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use lan_audio_caster::audio::{apply, ChannelView, ChannelViewMut, DestBuffer, SampleWidth, SourceBuffer};
use lan_audio_caster::channel::parse_spec;

const SOURCES: usize = 8;
const FRAMES: usize = 480;

fn bench_dispatch(c: &mut Criterion) {
    let width = SampleWidth::W16;
    let w = width.bytes();
    let input: Vec<u8> = (0..FRAMES * SOURCES * w).map(|i| i as u8).collect();
    let views = ChannelView::split(&input, SOURCES);

    let plans = [
        ("identity", "01234567"),
        ("permute", "76543210"),
        ("general", "+01,-23,+4d100,5,6,7,d0,-7d3"),
    ];

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Bytes((FRAMES * SOURCES * w) as u64));

    for (name, spec) in plans {
        let plan = parse_spec(spec, SOURCES, 0).expect("bench plan");
        let outs = plan.output_channels();
        let mut output = vec![0u8; FRAMES * outs * w];

        group.bench_with_input(BenchmarkId::new("interleaved", name), &plan, |b, plan| {
            b.iter(|| {
                apply(
                    plan,
                    &SourceBuffer::interleaved(black_box(&input), SOURCES),
                    &mut DestBuffer::interleaved(&mut output, outs),
                    width,
                    FRAMES,
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("planar_to_interleaved", name), &plan, |b, plan| {
            b.iter(|| {
                apply(
                    plan,
                    &SourceBuffer::Planar(black_box(&views)),
                    &mut DestBuffer::interleaved(&mut output, outs),
                    width,
                    FRAMES,
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("planar", name), &plan, |b, plan| {
            b.iter(|| {
                apply(
                    plan,
                    &SourceBuffer::Planar(black_box(&views)),
                    &mut DestBuffer::Planar(ChannelViewMut::split(&mut output, outs)),
                    width,
                    FRAMES,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
