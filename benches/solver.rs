use criterion::{Criterion, criterion_group, criterion_main};
use futures::executor::block_on_stream;
use smother::chess::Position;
use smother::search::{Engine, Limits, Options};

fn mate_in_one(c: &mut Criterion) {
    let pos: Position = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1".parse().unwrap();

    c.bench_function("alpha-beta mate in 1", |b| {
        b.iter(|| {
            let mut engine = Engine::new();
            let search = engine.search(&pos, Limits::mate(1));
            block_on_stream(search).count()
        })
    });
}

fn mate_in_two(c: &mut Criterion) {
    let pos: Position = "7k/8/5K2/8/8/8/8/1Q6 w - - 0 1".parse().unwrap();

    c.bench_function("alpha-beta mate in 2", |b| {
        b.iter(|| {
            let mut engine = Engine::new();
            let search = engine.search(&pos, Limits::mate(2));
            block_on_stream(search).count()
        })
    });
}

fn proof_number_mate_in_two(c: &mut Criterion) {
    let options = Options {
        proof_number_search: true,
        ..Options::default()
    };

    let pos: Position = "7k/8/5K2/8/8/8/8/1Q6 w - - 0 1".parse().unwrap();

    c.bench_function("proof-number mate in 2", |b| {
        b.iter(|| {
            let mut engine = Engine::with_options(&options);
            let search = engine.search(&pos, Limits::mate(2));
            block_on_stream(search).count()
        })
    });
}

criterion_group!(solver, mate_in_one, mate_in_two, proof_number_mate_in_two);
criterion_main!(solver);
