use std::time::Instant;

use log_reshape::{Config, Output};

fn main() {
    let output = Output::new(Config::default(), std::io::sink());

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        output
            .log(&format!("[ERROR] iteration={i} default load test error"))
            .expect("write to io::sink");
    }

    let elapsed = start.elapsed();
    println!("default config: reshaped {} lines in {:?} (~{:.0} lines/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
