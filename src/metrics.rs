// src/metrics.rs
use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::ingest::ensure_metrics_described;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder without a listener; scrape with `handle.render()`.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Install the recorder and serve `/metrics` on `addr`. Must run inside the tokio runtime.
    pub fn serve(addr: SocketAddr) -> Result<Self> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(addr)
            .build()
            .context("prometheus: build exporter")?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder)
            .map_err(|_| anyhow!("a global metrics recorder is already installed"))?;
        tokio::spawn(async move {
            if let Err(_e) = exporter.await {
                // ExporterError implements neither Debug nor Display in metrics-exporter-prometheus 0.15.
                tracing::warn!("prometheus exporter stopped");
            }
        });
        ensure_metrics_described();
        tracing::info!(%addr, "prometheus exporter listening");
        Ok(Self { handle })
    }
}
