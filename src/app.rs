use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{self, Config};
use crate::fetcher::{CommentSource, SoopCommentSource};
use crate::logging;
use crate::params::ViewParams;
use crate::poller;
use crate::ranking::{CommentId, Ranking};
use crate::soop;
use crate::target::{Resolver, Target};
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub url: Option<String>,
    pub cutoff: Option<u32>,
    pub highlight: Option<CommentId>,
    pub once: bool,
    pub config_file: Option<PathBuf>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let sink = if opts.once {
        Some(logging::Sink::Stderr)
    } else {
        logging::default_log_path().map(logging::Sink::File)
    };
    if let Some(sink) = sink {
        logging::init(sink).context("init logging")?;
    }

    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    tracing::debug!(config = %friendly_path(config::default_path().as_ref()), "config loaded");

    let resolver = Resolver::new(cfg.api.post_host.clone());
    let target = match opts.url.as_deref() {
        Some(raw) => Some(
            resolver
                .resolve(raw)
                .with_context(|| format!("URL format is not valid: {raw}"))?,
        ),
        None => None,
    };

    let source = comment_source(&cfg)?;

    if opts.once {
        let Some(target) = target else {
            bail!("--once needs a post URL");
        };
        return run_once(source.as_ref(), &target, &cfg, opts.cutoff);
    }

    let options = ui::Options {
        source,
        poll: cfg.poll_options(),
        animation: cfg.animation,
        resolver,
        params: ViewParams {
            target,
            cutoff: opts.cutoff,
            highlight: opts.highlight,
        },
    };
    let mut model = ui::Model::new(options);
    model.run()
}

fn comment_source(cfg: &Config) -> Result<Arc<dyn CommentSource>> {
    let client = soop::Client::new(soop::ClientConfig {
        user_agent: cfg.api.user_agent.clone(),
        base_url: Some(cfg.api.base_url.clone()),
        timeout: Some(cfg.api.timeout),
        http_client: None,
    })
    .context("create SOOP client")?;
    Ok(Arc::new(SoopCommentSource::new(Arc::new(client))))
}

fn run_once(
    source: &dyn CommentSource,
    target: &Target,
    cfg: &Config,
    cutoff: Option<u32>,
) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Loading comments of {}", target.post_url()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = poller::run_cycle(source, target, &cfg.poll_options());
    spinner.finish_and_clear();

    let ranking = result.context("Could not load comments. Check the URL or network")?;
    print!("{}", render_table(&ranking, cutoff));
    Ok(())
}

/// Plain-text ranking with a separator below the cutoff rank.
pub fn render_table(ranking: &Ranking, cutoff: Option<u32>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} comments ranked, {} pages",
        ranking.total_count, ranking.last_observed_page_count
    );

    let cutoff_rank = cutoff.and_then(|c| ranking.cutoff_rank(c).map(|r| (c, r)));
    let mut separated = false;
    for (rank, comment) in ranking.iter() {
        if let Some((cutoff, limit)) = cutoff_rank {
            if !separated && rank > limit {
                let _ = writeln!(out, "---- cutoff {cutoff} (rank {limit}) ----");
                separated = true;
            }
        }
        let best = if comment.best_top { " [best]" } else { "" };
        let _ = writeln!(
            out,
            "#{:<4} {:>8}  {} ({}){}",
            rank, comment.like_count, comment.display_name, comment.author_id, best
        );
    }
    out
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/soopup/config.yaml".to_string()
    }
}
