// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "photobooth")]
#[command(about = "Timed four-frame photo strips with session recording")]
#[command(version = env!("PHOTOBOOTH_BUILD_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one capture session and export the strip and clip
    Session {
        /// V4L2 device path (default: configured or system camera)
        #[arg(short, long, conflicts_with_all = ["image", "test_pattern"])]
        camera: Option<String>,

        /// Use a still image as the camera
        #[arg(long, conflicts_with = "test_pattern")]
        image: Option<PathBuf>,

        /// Use generated color bars as the camera
        #[arg(long)]
        test_pattern: bool,

        /// Countdown before each capture, in seconds
        #[arg(short, long)]
        delay: Option<String>,

        /// Mirror the captures
        #[arg(short, long)]
        mirror: bool,

        /// Skip recording the session clip
        #[arg(long)]
        no_record: bool,

        /// Strip artwork (default: built-in strip)
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Swap alternate strip N (1-based, from the config) into the main position
        #[arg(long, value_name = "N")]
        strip: Option<usize>,

        /// Output directory (default: ~/Downloads/Photobooth)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a strip from existing image files
    Compose {
        /// Up to four images, in slot order
        #[arg(required = true, num_args = 1..=4)]
        images: Vec<PathBuf>,

        /// Mirror the images
        #[arg(short, long)]
        mirror: bool,

        /// Strip artwork (default: built-in strip)
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Output directory (default: ~/Downloads/Photobooth)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show which recording formats are supported
    Formats,

    /// List available cameras and microphones
    List,

    /// Print the effective configuration
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=photobooth=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Session {
            camera,
            image,
            test_pattern,
            delay,
            mirror,
            no_record,
            template,
            strip,
            output,
        } => cli::run_session(cli::SessionArgs {
            camera,
            image,
            test_pattern,
            delay,
            mirror,
            no_record,
            template,
            strip,
            output,
        }),
        Commands::Compose {
            images,
            mirror,
            template,
            output,
        } => cli::compose_strip(images, mirror, template, output),
        Commands::Formats => cli::list_formats(),
        Commands::List => cli::list_devices(),
        Commands::Config => cli::print_config(),
    }
}
