//! Build automation for armada
//!
//! Usage: cargo xtask <command>
//!
//! Available commands:
//! - build: Build the project
//! - test: Run unit and/or integration tests
//! - dist: Create distribution packages
//! - demo: Create and tear down a cluster against a throwaway sandbox
//! - reset-state: Remove the local sandbox state
//! - ci: Run CI checks

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use xshell::{cmd, Shell};

const BIN: &str = "armada";
const STATE_FILE: &str = ".armada/sandbox.json";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for armada")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project
    Build {
        /// Build in release mode
        #[arg(long)]
        release: bool,
    },
    /// Run tests
    Test {
        /// Run only integration tests
        #[arg(long, conflicts_with = "unit")]
        integration: bool,
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
    },
    /// Create distribution packages
    Dist {
        /// Target triple (e.g., x86_64-unknown-linux-gnu)
        #[arg(long)]
        target: Option<String>,
    },
    /// Create, inspect and delete a cluster using a temporary sandbox state
    Demo {
        #[arg(long, default_value = "demo")]
        name: String,
    },
    /// Remove the sandbox state kept in the working tree
    ResetState,
    /// Run CI checks (format, clippy, test)
    Ci,
    /// Format code
    Format {
        /// Check formatting without modifying files
        #[arg(long)]
        check: bool,
    },
    /// Run clippy
    Clippy,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    sh.change_dir(project_root()?);

    match cli.command {
        Commands::Build { release } => build(&sh, release),
        Commands::Test { integration, unit } => test(&sh, integration, unit),
        Commands::Dist { target } => dist(&sh, target),
        Commands::Demo { name } => demo(&sh, &name),
        Commands::ResetState => reset_state(&sh),
        Commands::Ci => ci(&sh),
        Commands::Format { check } => format(&sh, check),
        Commands::Clippy => clippy(&sh),
    }
}

fn build(sh: &Shell, release: bool) -> Result<()> {
    println!("🔨 Building {}...", BIN);

    if release {
        cmd!(sh, "cargo build --release").run()?;
        println!("✅ Release build completed: target/release/{}", BIN);
    } else {
        cmd!(sh, "cargo build").run()?;
        println!("✅ Debug build completed: target/debug/{}", BIN);
    }

    Ok(())
}

fn test(sh: &Shell, integration: bool, unit: bool) -> Result<()> {
    println!("🧪 Running tests...");

    if integration {
        cmd!(sh, "cargo test -p armada --test '*'").run()?;
    } else if unit {
        cmd!(sh, "cargo test -p armada --lib").run()?;
    } else {
        cmd!(sh, "cargo test --all").run()?;
    }

    println!("✅ All tests passed");
    Ok(())
}

fn dist(sh: &Shell, target: Option<String>) -> Result<()> {
    println!("📦 Creating distribution package...");

    let root = project_root()?;
    let binary_src = match &target {
        Some(target_triple) => {
            cmd!(sh, "cargo build --release --target {target_triple}").run()?;
            root.join(format!("target/{}/release/{}", target_triple, BIN))
        }
        None => {
            cmd!(sh, "cargo build --release").run()?;
            root.join(format!("target/release/{}", BIN))
        }
    };

    let dist_dir = root.join("dist");
    sh.create_dir(&dist_dir)?;
    sh.copy_file(&binary_src, dist_dir.join(BIN))?;

    let version = env!("CARGO_PKG_VERSION");
    let suffix = target.unwrap_or_else(|| "local".to_string());
    let archive_name = format!("{}-{}-{}.tar.gz", BIN, version, suffix);

    cmd!(sh, "tar -czf {archive_name} -C dist {BIN}")
        .run()
        .context("Failed to create tarball")?;

    println!("✅ Distribution package created: {}", archive_name);
    Ok(())
}

fn demo(sh: &Shell, name: &str) -> Result<()> {
    println!("🚀 Running a cluster round trip for '{}'...", name);

    let state_dir = sh.create_temp_dir()?;
    let state = state_dir.path().join("sandbox.json");
    let state = state.to_string_lossy().to_string();

    cmd!(sh, "cargo run -q -- --state-file {state} cluster create {name} --zone us-east-1b")
        .run()
        .context("cluster create failed")?;
    cmd!(sh, "cargo run -q -- --state-file {state} cluster status {name}").run()?;
    cmd!(sh, "cargo run -q -- --state-file {state} list security-group").run()?;
    cmd!(sh, "cargo run -q -- --state-file {state} cluster delete {name}")
        .run()
        .context("cluster delete failed")?;

    println!("✅ Cluster '{}' created and deleted", name);
    Ok(())
}

fn reset_state(sh: &Shell) -> Result<()> {
    let state = project_root()?.join(STATE_FILE);
    if state.exists() {
        sh.remove_path(&state)?;
        println!("✅ Removed {}", state.display());
    } else {
        println!("Nothing to remove at {}", state.display());
    }
    Ok(())
}

fn ci(sh: &Shell) -> Result<()> {
    println!("🔍 Running CI checks...");

    println!("\n📝 Checking formatting...");
    format(sh, true)?;

    println!("\n🔧 Running clippy...");
    clippy(sh)?;

    println!("\n🧪 Running tests...");
    test(sh, false, false)?;

    println!("\n✅ All CI checks passed!");
    Ok(())
}

fn format(sh: &Shell, check: bool) -> Result<()> {
    if check {
        cmd!(sh, "cargo fmt --all -- --check").run()?;
        println!("✅ Code formatting is correct");
    } else {
        cmd!(sh, "cargo fmt --all").run()?;
        println!("✅ Code formatted");
    }
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    cmd!(
        sh,
        "cargo clippy --all-targets --all-features -- -D warnings"
    )
    .run()?;
    println!("✅ Clippy checks passed");
    Ok(())
}

fn project_root() -> Result<PathBuf> {
    Path::new(&env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(1)
        .map(Path::to_path_buf)
        .context("xtask must live one level below the workspace root")
}
