//! # ghost-finder CLI
//!
//! ## Usage
//! ```bash
//! ghost-finder local ./creatives
//! ghost-finder meta 1234567890
//! ghost-finder match local_creative_hashes.csv platform_creative_hashes_META.csv
//! ```

mod cli;

fn main() {
    if let Err(error) = cli::run() {
        eprintln!("{} {}", console::style("error:").red().bold(), error);
        std::process::exit(1);
    }
}
