use std::sync::Arc;

use tracing::{debug, error, info};

use log_reshape::init::init_tracing;
use log_reshape::{Config, Format, Output};

fn main() {
    let config = Config::default()
        .with_format(Format::Json)
        .with_stacktrace(false);
    let output = Arc::new(Output::new(config, std::io::stdout()));
    init_tracing(output).expect("no other global subscriber");

    info!("starting service");
    debug!("filtered out below INFO");

    error!(
        user_id = 42,
        reason = "invalid password",
        "authentication failed"
    );
}
