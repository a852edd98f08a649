// src/metrics.rs
use anyhow::{Context, Result};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::feed::scheduler::SchedulePlan;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the static schedule shape.
    pub fn init(plan: &SchedulePlan) -> Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        for s in &plan.independent {
            gauge!("feed_interval_secs", "source" => s.id.clone()).set(s.interval_secs as f64);
        }
        for g in &plan.groups {
            for s in &g.members {
                gauge!("feed_interval_secs", "source" => s.id.clone())
                    .set(g.interval.as_secs_f64());
            }
            for m in &g.slow {
                gauge!("feed_interval_secs", "source" => m.source.id.clone())
                    .set(m.refresh_every.as_secs_f64());
            }
        }

        Ok(Self { handle })
    }
}
