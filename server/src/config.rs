// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use clap::Parser;

/// Daemon configuration, taken from flags or the environment (a `.env` file
/// is loaded first when present).
#[derive(Debug, Parser)]
#[command(name = "vigild", version, about = "Vigil incident backend daemon")]
pub struct Config {
    /// Port for the HTTP API listener
    #[arg(long, env = "VIGIL_PORT", default_value_t = 8080)]
    pub port: u16,

    /// PostgreSQL connection string; omit to run on in-memory storage
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Seconds the consumer loops get to drain after cancellation
    #[arg(long, env = "VIGIL_SHUTDOWN_GRACE", default_value_t = 5)]
    pub shutdown_grace_secs: u64,

    /// Seconds the HTTP listener gets to finish in-flight requests
    #[arg(long, env = "VIGIL_HTTP_SHUTDOWN_TIMEOUT", default_value_t = 30)]
    pub http_shutdown_timeout_secs: u64,
}
