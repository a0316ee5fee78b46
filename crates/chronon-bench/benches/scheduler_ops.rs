//! Criterion micro-benchmarks for the scheduler priority structure.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chronon_core::{SimulatorId, Time};
use chronon_engine::Scheduler;

fn insert_and_drain(c: &mut Criterion) {
    c.bench_function("scheduler_insert_drain_1k", |b| {
        b.iter(|| {
            let mut scheduler = Scheduler::new(Time::ZERO);
            for i in 0..1000u32 {
                // 17 distinct times so ties and spread both occur.
                let t = Time::new(f64::from(i % 17));
                scheduler.insert(SimulatorId(i), t).unwrap();
            }
            loop {
                let t = scheduler.peek_min_time();
                if t.is_infinity() {
                    break;
                }
                scheduler.advance_to(t);
                black_box(scheduler.extract_imminent());
            }
        })
    });
}

fn supersede_heavy(c: &mut Criterion) {
    c.bench_function("scheduler_supersede_1k", |b| {
        b.iter(|| {
            let mut scheduler = Scheduler::new(Time::ZERO);
            // Every simulator rescheduled eight times; only the final
            // entry may surface.
            for round in 0..8u32 {
                for i in 0..1000u32 {
                    let t = Time::new(f64::from(i % 13 + round));
                    scheduler.insert(SimulatorId(i), t).unwrap();
                }
            }
            loop {
                let t = scheduler.peek_min_time();
                if t.is_infinity() {
                    break;
                }
                scheduler.advance_to(t);
                black_box(scheduler.extract_imminent());
            }
        })
    });
}

criterion_group!(benches, insert_and_drain, supersede_heavy);
criterion_main!(benches);
