//! 可观测性：tracing 日志初始化
//!
//! 默认 info，可通过 RUST_LOG 覆盖（如 `RUST_LOG=baton=debug` 可看到每次 Supervisor 决策）。
//! 日志写到 stderr，stdout 留给 CLI 的计划与执行日志输出。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
