use std::path::PathBuf;

use clap::Parser;

use soopup::params::{parse_cutoff, parse_highlight};

/// Live like-count ranking of the comments on a SOOP station post.
#[derive(Debug, Parser)]
#[command(name = "soopup", version, about)]
struct Cli {
    /// Post URL, e.g. https://www.sooplive.co.kr/station/<id>/post/<number>
    url: Option<String>,

    /// Rank cutoff; a separator is drawn below the last rank within it
    #[arg(long, value_parser = parse_cutoff)]
    cutoff: Option<u32>,

    /// Comment number to keep in view
    #[arg(long, value_parser = parse_highlight)]
    highlight: Option<u64>,

    /// Fetch once, print the ranking and exit
    #[arg(long)]
    once: bool,

    /// Config file instead of ~/.config/soopup/config.yaml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let opts = soopup::RunOptions {
        url: cli.url,
        cutoff: cli.cutoff,
        highlight: cli.highlight,
        once: cli.once,
        config_file: cli.config,
    };

    if let Err(err) = soopup::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
