// Copyright 2025 Armada Team.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use armada::cli::display::StatusIcon;
use armada::cli::CliArgs;
use armada::ProvisionError;
use clap::Parser;
use colored::Colorize;
use tracing::Level;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // Logs go to stderr so table output stays clean
    let level = if args.global.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = args.execute().await {
        eprintln!("{} {:#}", StatusIcon::ERROR.red(), err);
        let code = err
            .downcast_ref::<ProvisionError>()
            .map_or(1, ProvisionError::exit_code);
        std::process::exit(code);
    }
}
