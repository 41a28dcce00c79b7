// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes for image and instance listings.

use serde::Serialize;
use std::time::Instant;

use crate::cloud::{ErrorInfo, Image, InstanceSnapshot, ReusePolicy};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => {
                self.emit_event("success", message, false);
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                self.emit_event("error", message, true);
            }
        }
    }

    /// Describe an image and whether it can provision instances.
    pub fn image(&self, image: &Image) {
        match self.mode {
            OutputMode::Normal => {
                let policy = match image.reuse_policy() {
                    ReusePolicy::Restartable => "reusable",
                    ReusePolicy::SingleUse => "single-use",
                };
                match image.error_info() {
                    None => println!(
                        "  ✓ {} ({}, {}) at {}",
                        image.id(),
                        image.name(),
                        policy,
                        image.agent_home().display()
                    ),
                    Some(error) => println!("  ✗ {} ({}): {}", image.id(), image.name(), error),
                }
            }
            OutputMode::Quiet => {
                if let Some(error) = image.error_info() {
                    println!("{}: {}", image.id(), error);
                }
            }
            OutputMode::Json => {
                let agent_home = image.agent_home().display().to_string();
                let event = ImageEvent {
                    event: "image",
                    id: image.id().as_str(),
                    name: image.name().as_str(),
                    agent_home: &agent_home,
                    reuse_policy: image.reuse_policy(),
                    error: image.error_info(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// List instance snapshots, one line each.
    pub fn instances(&self, instances: &[InstanceSnapshot]) {
        match self.mode {
            OutputMode::Normal => {
                if instances.is_empty() {
                    println!("  (no instances)");
                }
                for instance in instances {
                    let agent = instance.agent_name.as_deref().unwrap_or("-");
                    let id = instance.id.as_str();
                    match &instance.error {
                        None => println!("  {:<6} {:<18} {}", id, instance.status, agent),
                        Some(error) => {
                            println!("  {:<6} {:<18} {} ({})", id, instance.status, agent, error)
                        }
                    }
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => {
                for instance in instances {
                    if let Ok(json) = serde_json::to_string(instance) {
                        println!("{json}");
                    }
                }
            }
        }
    }

    fn emit_event(&self, event: &str, message: &str, to_stderr: bool) {
        let event = JsonEvent {
            event,
            message,
            duration_secs: if self.start_time.is_some() {
                Some(self.elapsed_secs())
            } else {
                None
            },
        };
        if let Ok(json) = serde_json::to_string(&event) {
            if to_stderr {
                eprintln!("{json}");
            } else {
                println!("{json}");
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct ImageEvent<'a> {
    event: &'a str,
    id: &'a str,
    name: &'a str,
    agent_home: &'a str,
    reuse_policy: ReusePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorInfo>,
}
