use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

use crate::step::{finish, Step};

/// Embedded target the engine must build for without `std`.
const TARGET: &str = "thumbv7em-none-eabihf";

pub fn run(strict: bool) -> Result<()> {
    println!();
    println!("{}", "🔍 Checking builds...".cyan().bold());
    println!();

    let start = Instant::now();

    let steps = [
        Step {
            label: "Engine, no_std, no logging",
            args: &["check", "-p", "zx-i2s", "--target", TARGET],
            fatal: true,
        },
        Step {
            label: "Engine, no_std, defmt",
            args: &["check", "-p", "zx-i2s", "--target", TARGET, "--features", "defmt"],
            fatal: true,
        },
        Step {
            label: "Engine, host, tracing",
            args: &["check", "-p", "zx-i2s", "--features", "tracing,std"],
            fatal: true,
        },
        Step {
            label: "Platform, no_std",
            args: &["check", "-p", "platform", "--target", TARGET, "--no-default-features"],
            fatal: true,
        },
        Step {
            label: "Clippy",
            args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
            fatal: strict,
        },
        Step {
            label: "Formatting",
            args: &["fmt", "--all", "--check"],
            fatal: strict,
        },
    ];

    for step in &steps {
        step.run()?;
    }

    finish("All checks", start);
    Ok(())
}
