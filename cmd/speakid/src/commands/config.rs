//! Configuration management commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use speakid_voiceprint::Calibrator;

use super::{get_config, print_success, print_warning};
use crate::Cli;

/// Manage CLI configuration.
///
/// Configuration is stored in ~/.speakid/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Write configuration values
    Init {
        /// Enrollment database path
        #[arg(long)]
        db: Option<PathBuf>,
        /// Multiplier applied to the widest intra-speaker distance
        #[arg(long)]
        margin: Option<f32>,
        /// Upper bound for any calibrated threshold
        #[arg(long)]
        cap: Option<f32>,
        /// Threshold used for speakers with a single embedding
        #[arg(long)]
        default_threshold: Option<f32>,
    },
    /// View the current configuration
    View,
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::Init {
                db,
                margin,
                cap,
                default_threshold,
            } => {
                let mut cfg = get_config(cli)?;
                if let Some(db) = db {
                    cfg.store = Some(db.clone());
                }
                if let Some(margin) = margin {
                    cfg.calibration.margin = *margin;
                }
                if let Some(cap) = cap {
                    cfg.calibration.cap = *cap;
                }
                if let Some(default_threshold) = default_threshold {
                    cfg.calibration.default_threshold = *default_threshold;
                }

                let effective = *Calibrator::with_config(cfg.calibration).config();
                if effective != cfg.calibration {
                    print_warning(&format!(
                        "calibration out of range, will run as margin={} cap={} default_threshold={}",
                        effective.margin, effective.cap, effective.default_threshold
                    ));
                }

                cfg.save()?;
                print_success(&format!("Config written to {}", cfg.path().display()));
                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;
                let calibration = Calibrator::with_config(cfg.calibration);
                let c = calibration.config();

                println!("Config file: {}", cfg.path().display());
                println!("Store: {}", cfg.store_path(cli.store.as_deref()).display());
                println!("Calibration:");
                println!("  Margin: {}", c.margin);
                println!("  Cap: {}", c.cap);
                println!("  Default threshold: {}", c.default_threshold);
                Ok(())
            }
        }
    }
}
