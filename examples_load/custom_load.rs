use std::sync::Arc;
use std::time::Instant;

use log_reshape::{Config, Flags, Format, Logger, Output};

fn main() {
    // no stack traces, JSON output, upstream logger writing date/time/file
    let config = Config::default()
        .with_format(Format::Json)
        .with_stacktrace(false);
    let output = Arc::new(Output::new(config, std::io::sink()));

    let mut logger = Logger::new(std::io::stderr(), "load: ", Flags::STD | Flags::SHORT_FILE);
    output.attach(&mut logger);

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let level = if i % 2 == 0 { "DEBUG" } else { "WARN" };
        logger
            .println(format!("[{level}] iteration={i} ratio=0.5 custom load test"))
            .expect("write to io::sink");
    }

    let elapsed = start.elapsed();
    println!("custom config: wrote {} lines (half filtered) in {:?} (~{:.0} lines/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
