use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

/// One cargo invocation with a label for the report.
pub struct Step<'a> {
    pub label: &'a str,
    pub args: &'a [&'a str],
    /// A failing non-fatal step is reported and skipped.
    pub fatal: bool,
}

impl Step<'_> {
    /// Run the step, print its outcome and return the captured output.
    pub fn run(&self) -> Result<Option<Output>> {
        println!("{}", format!("  {}...", self.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(self.args)
            .output()
            .with_context(|| format!("Failed to run cargo {}", self.args.join(" ")))?;

        if output.status.success() {
            println!(
                "{}",
                format!("  ✓ {} in {:.2}s", self.label, start.elapsed().as_secs_f64()).green()
            );
            println!();
            return Ok(Some(output));
        }

        if self.fatal {
            eprintln!("{}", format!("  ✗ {} failed", self.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                eprintln!("  {line}");
            }
            anyhow::bail!("{} failed", self.label);
        }

        eprintln!("{}", format!("  ⚠ {} reported problems", self.label).yellow().bold());
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        println!();
        Ok(None)
    }
}

/// Print the closing line for a task.
pub fn finish(what: &str, start: Instant) {
    println!(
        "{}",
        format!("✓ {what} completed in {:.2}s", start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();
}
