//! # Replicable Demo
//!
//! Walks one replica through every kind of write, for both storage
//! strategies, printing the replica's view after each resync.

use std::fmt;

use replicable::{AssigningSource, ReplacingSource, Source, Storage};

#[derive(Clone, Debug)]
struct Data {
    n: i32,
    s: String,
}

impl Data {
    fn new(n: i32, s: &str) -> Self {
        Self { n, s: s.to_owned() }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.n, self.s)
    }
}

fn demo<S: Storage<Data>>(source: &Source<Data, S>) {
    let mut replica = source.replica();
    println!("  v{} {}", replica.version(), replica.get());

    source.set(Data::new(1, "b"));
    replica.ensure_up_to_date();
    println!("  v{} {}", replica.version(), replica.get());

    source.set_with(|| Data::new(2, "c"));
    replica.ensure_up_to_date();
    println!("  v{} {}", replica.version(), replica.get());

    source.modify(|d| d.n += 1);
    replica.ensure_up_to_date();
    println!("  v{} {}", replica.version(), replica.get());

    let stats = replica.stats();
    println!(
        "  {:?}: {} resyncs, {} fast-path hits",
        source,
        stats.resyncs,
        stats.fast_path_hits
    );
}

fn main() {
    println!("inline, built from a value:");
    demo(&AssigningSource::new(Data::new(0, "a")));

    println!("inline, built from a constructor:");
    demo(&AssigningSource::new_with(|| Data::new(3, "d")));

    println!("boxed, built from a value:");
    let source = ReplacingSource::new(Data::new(0, "a"));
    demo(&source);

    source.replace(Box::new(Data::new(10, "grafted")));
    let replica = source.replica();
    println!("  after replace: v{} {}", replica.version(), replica.get());
}
