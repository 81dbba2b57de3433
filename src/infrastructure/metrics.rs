// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Invalid metrics listen address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to install Prometheus recorder: {0}")]
    Install(#[from] BuildError),
}

/// 解析指标监听地址
pub fn parse_listen_address(listen_address: &str) -> Result<SocketAddr, MetricsError> {
    listen_address
        .parse()
        .map_err(|_| MetricsError::InvalidAddress(listen_address.to_string()))
}

/// 安装Prometheus导出器并注册指标说明
///
/// 未调用时所有指标宏都是空操作
pub fn init_metrics(listen_address: &str) -> Result<(), MetricsError> {
    let addr = parse_listen_address(listen_address)?;
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(
        "extractrs_tasks_total",
        "Total number of tasks processed, labelled by outcome"
    );
    describe_counter!(
        "extractrs_credential_acquisitions_total",
        "Number of times each credential was handed to a worker"
    );
    describe_counter!(
        "extractrs_fetch_failures_total",
        "Number of failed page fetches, labelled by engine"
    );
    describe_gauge!("extractrs_workers_active", "Number of running extraction workers");
    describe_histogram!(
        "extractrs_task_duration_seconds",
        "Wall-clock duration of a single task in seconds"
    );

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}
