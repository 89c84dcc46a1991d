use crate::layer::ReshapeLayer;
use crate::output::Output;
use std::sync::Arc;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Options for installing [`ReshapeLayer`] as the global subscriber.
///
/// **Fields**
/// - `include_target`: add the event target as a `target` field.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   installed next to the reshape layer and events are also printed to
///   the console in the usual human format.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub include_target: bool,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            include_target: true,
            enable_stdout: false,
        }
    }
}

/// Install a global `tracing` subscriber that routes every event through
/// `output`.
///
/// **Parameters**
/// - `output`: configured [`Output`] doing filtering and encoding.
/// - `config`: [`LayerConfig`] controlling the layer.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed.
pub fn init_tracing_with_config(
    output: Arc<Output>,
    config: LayerConfig,
) -> Result<(), SetGlobalDefaultError> {
    let layer = ReshapeLayer::new(output).with_target(config.include_target);

    // The two subscriber shapes have different types, so each branch
    // installs its own.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Equivalent to [`init_tracing_with_config`] with
/// [`LayerConfig::default`].
pub fn init_tracing(output: Arc<Output>) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(output, LayerConfig::default())
}
