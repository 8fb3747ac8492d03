use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lazy_static::lazy_static;
use matchstick::Regex;
use regex::Regex as LibRegex;

const PATTERN: &str = "(a|b)*abb|[0-9]+x?";

lazy_static! {
    static ref INPUT: String = "ababb 42x aabbabb 7 babcabb 100x ".repeat(64);
}

pub fn compile(c: &mut Criterion) {
    c.bench_function("matchstick compile", |b| {
        b.iter(|| {
            let mut regex = Regex::new();
            regex.compile(black_box(PATTERN)).unwrap();
            regex
        })
    });

    c.bench_function("library regex compile", |b| {
        b.iter(|| LibRegex::new(black_box(PATTERN)).unwrap())
    });
}

pub fn find_matches(c: &mut Criterion) {
    let mut regex = Regex::new();
    regex.compile(PATTERN).unwrap();
    c.bench_function("matchstick match", |b| {
        b.iter(|| regex.matches(black_box(&INPUT)).unwrap().len())
    });

    let lib_regex = LibRegex::new(PATTERN).unwrap();
    c.bench_function("library regex match", |b| {
        b.iter(|| lib_regex.find_iter(black_box(&INPUT)).count())
    });
}

criterion_group!(benches, compile, find_matches);
criterion_main!(benches);
