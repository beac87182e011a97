// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

#[tokio::main]
async fn main() {
    if let Err(e) = case_server::run().await {
        // Tracing may not be initialised yet when configuration fails.
        eprintln!("case-server: {e}");
        tracing::error!(error = %e, "Case server exited with error");
        std::process::exit(1);
    }
}
