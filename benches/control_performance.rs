//! Control Path Benchmarks
//!
//! Everything a note message or a reconfiguration touches: registry churn,
//! voice retriggering, curve generation and graph rebuilds.
//!
//! Note handling runs once per incoming message, so it must stay far below a
//! single audio buffer (about 1.3 ms at 48 kHz / 64 samples). Curve generation
//! and `apply_config` run only on reconfiguration.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use monosynth::prelude::*;

// ============================================================================
// Constants
// ============================================================================

const HELD_NOTES: [usize; 4] = [1, 8, 32, 128];
const CURVE_SIZES: [usize; 3] = [1024, 8192, 44100];
const PIPELINE_COUNTS: [usize; 3] = [1, 4, 16];

// ============================================================================
// Helper Functions
// ============================================================================

/// One oscillator → filter → shaper → delay chain per pipeline
fn create_config(pipelines: usize) -> GraphConfig {
    (0..pipelines).fold(GraphConfig::silent().with_gain(0.8), |config, i| {
        config.with_pipeline(vec![
            StageDescriptor::oscillator(Waveform::Sawtooth),
            StageDescriptor::filter(FilterType::Lowpass, 400.0 + 100.0 * i as f64),
            StageDescriptor::shaper(CurveSpec::Named(
                NamedCurve::new("distort").with_samples(1024),
            )),
            StageDescriptor::delay(0.05),
        ])
    })
}

// ============================================================================
// Registry
// ============================================================================

fn bench_registry_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry/churn");

    for &held in &HELD_NOTES {
        group.throughput(Throughput::Elements(held as u64));
        group.bench_with_input(BenchmarkId::new("push_remove_front", held), &held, |b, &n| {
            b.iter(|| {
                let mut registry = Registry::with_capacity(n);
                for key in 0..n {
                    registry.push(key, key);
                }
                // Removing from the front renumbers every follower
                for key in 0..n {
                    black_box(registry.remove(&key));
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Voices
// ============================================================================

fn bench_voice_retrigger(c: &mut Criterion) {
    let mut group = c.benchmark_group("voice/retrigger");

    for &held in &HELD_NOTES {
        group.bench_with_input(BenchmarkId::new("note_on_off", held), &held, |b, &n| {
            let mut voices = VoiceController::default();
            for i in 0..n {
                voices.frequency_on(100.0 + i as f64, VoiceParams::default());
            }

            b.iter(|| {
                black_box(voices.frequency_on(black_box(1000.0), VoiceParams::default()));
                black_box(voices.frequency_off(black_box(1000.0)));
            });
        });
    }

    group.finish();
}

fn bench_synth_messages(c: &mut Criterion) {
    c.bench_function("synth/process_note_messages", |b| {
        let transport = VirtualTransport::new().with_input("kbd", "Keyboard");
        let mut synth =
            Synth::new(StageGraph::new(), transport.clone(), SynthOptions::default()).unwrap();
        synth.connect_inputs().unwrap();

        b.iter(|| {
            transport.send("kbd", &[0x90, 60, 100]);
            transport.send("kbd", &[0x90, 64, 100]);
            transport.send("kbd", &[0x80, 64, 0]);
            transport.send("kbd", &[0x80, 60, 0]);
            black_box(synth.process_events());
        });
    });
}

// ============================================================================
// Reconfiguration
// ============================================================================

fn bench_curve_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("curves/distort");
    let params = CurveParams::from([("amount".to_string(), 50.0)]);

    for &size in &CURVE_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &n| {
            b.iter(|| black_box(distort(black_box(&params), n)));
        });
    }

    group.finish();
}

fn bench_apply_config(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/apply_config");

    for &count in &PIPELINE_COUNTS {
        let config = create_config(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &config, |b, config| {
            let mut assembler = PipelineAssembler::new(StageGraph::new()).unwrap();
            b.iter(|| assembler.apply_config(black_box(config)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    control_benches,
    bench_registry_churn,
    bench_voice_retrigger,
    bench_synth_messages,
);

criterion_group!(reconfigure_benches, bench_curve_generation, bench_apply_config,);

criterion_main!(control_benches, reconfigure_benches);
