use prometheus::{Encoder, Registry, TextEncoder};
use std::io::Write;

/// Render a registry in the Prometheus text exposition format.
pub fn render_metrics(registry: &Registry) -> String {
    let mut buffer = Vec::new();
    if write_metrics(registry, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Encode a registry straight into `out`.
pub fn write_metrics<W: Write>(registry: &Registry, out: &mut W) -> anyhow::Result<()> {
    let encoder = TextEncoder::new();
    let families = registry.gather();
    encoder.encode(&families, out)?;
    Ok(())
}
