use anyhow::Result;
use clap::Parser;

use git_release::config;
use git_release::release::{release, ReleaseOptions};
use git_release::repo::LogSink;
use git_release::ui;
use git_release::version::Increment;

#[derive(clap::Parser)]
#[command(
    name = "git-release",
    about = "Release a package: bump the version, filter a publish branch, push a tag"
)]
struct Args {
    /// Target version or release type (major, minor, patch, pre*)
    version: Option<String>,

    #[arg(short = 'p', long, help = "Release a patch version")]
    patch: bool,

    #[arg(short = 'm', long, help = "Release a minor version")]
    minor: bool,

    #[arg(short = 'M', long, help = "Release a major version")]
    major: bool,

    #[arg(short = 'P', long, help = "Mark the release as a pre-release")]
    pre: bool,

    #[arg(
        short = 'R',
        long,
        help = "Re-publish the latest version without bumping",
        conflicts_with = "version"
    )]
    rebase: bool,

    #[arg(short = 's', long, help = "Stash uncommitted changes around the release")]
    stash: bool,

    #[arg(
        short = 'x',
        long = "exclude",
        value_name = "GLOB",
        help = "Exclude files matching the pattern from the release"
    )]
    exclude: Vec<String>,

    #[arg(long, help = "Log every destructive step instead of running it")]
    dry_run: bool,

    #[arg(short = 'q', long, help = "Suppress progress output")]
    quiet: bool,

    #[arg(short = 'c', long, help = "Custom configuration file path")]
    config: Option<String>,
}

/// Combine the positional target, the keyword shorthands, and the
/// pre-release flag into a single request string.
fn resolve_target(args: &Args) -> Option<String> {
    let target = if args.patch {
        Some("patch".to_string())
    } else if args.minor {
        Some("minor".to_string())
    } else if args.major {
        Some("major".to_string())
    } else {
        args.version.clone()
    };

    if !args.pre {
        return target;
    }
    match target {
        None => Some("prerelease".to_string()),
        Some(t) if Increment::parse(&t).is_some() && !t.starts_with("pre") => {
            Some(format!("pre{}", t))
        }
        some => some,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let dir = std::env::current_dir()?;

    let config = match config::load_config(&dir, args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Failed to load configuration: {}", e));
            std::process::exit(1);
        }
    };

    let target = resolve_target(&args);
    if target.is_none() && !args.rebase {
        ui::display_error("Please specify a version or release type");
        std::process::exit(1);
    }

    let log = if args.quiet {
        LogSink::null()
    } else {
        LogSink::new(|line| ui::display_status(line))
    };

    let opts = ReleaseOptions {
        target,
        rebase: args.rebase,
        stash: args.stash,
        exclude: args.exclude,
        dry_run: args.dry_run,
        log,
    };

    match release(&dir, &config, opts) {
        Ok(outcome) => {
            if outcome.dry_run {
                ui::display_success(&format!(
                    "Dry run complete: {} would be released",
                    outcome.version
                ));
            } else {
                ui::display_success(&format!("Released {}", outcome.version));
            }
            Ok(())
        }
        Err(err) if err.is_classified() => {
            ui::display_error(&err.to_string());
            std::process::exit(1);
        }
        Err(err) => {
            ui::display_error(&err.to_string());
            std::process::exit(2);
        }
    }
}
