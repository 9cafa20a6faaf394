mod logging;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use coursefeed::build::{build_feeds, collect_posts, visible_posts, Outcome, Visible};
use coursefeed::config::{Config, Settings};
use coursefeed::env::ProcessEnvironment;
use coursefeed::feed::assemble;
use coursefeed::filter::{evaluate, Verdict};
use coursefeed::post::Post;
use coursefeed::status::status;
use coursefeed::tag::all_tags;

/// Publishes RSS feeds for scheduled course materials.
#[derive(Parser)]
#[command(name = "coursefeed", version, about)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the primary feed, the per-tag feeds and the JSON listing.
    Build(BuildArgs),
    /// Print the posts that are currently visible.
    List(ListArgs),
    /// Print the tags of the posts that are currently visible.
    Tags(ProjectArgs),
}

#[derive(clap::Args)]
struct ProjectArgs {
    /// The project directory; `coursefeed.yaml` is searched for here and in
    /// its parents.
    #[arg(short, long, default_value = ".")]
    project: PathBuf,
}

#[derive(clap::Args)]
struct BuildArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Directory the feeds are written to.
    #[arg(short, long, default_value = "_site")]
    output: PathBuf,

    /// Fail unless TERM_START and TERM_END are set.
    #[arg(long)]
    require_window: bool,
}

#[derive(clap::Args)]
struct ListArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Print every post with the reason it is or isn't visible.
    #[arg(short, long)]
    all: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Build(args) => build(args),
        Command::List(args) => list(args),
        Command::Tags(args) => tags(args),
    }
}

fn build(args: BuildArgs) -> Result<()> {
    let mut config = Config::from_directory(&args.project.project)?;
    config.require_window |= args.require_window;

    match build_feeds(&config, &ProcessEnvironment, &args.output)? {
        Outcome::Written { posts, tags } => println!(
            "wrote {} posts and {} tag feeds to {}",
            posts,
            tags,
            args.output.display()
        ),
        Outcome::NoContent => println!("no content directory; nothing written"),
        Outcome::TermEnded => println!("publication window has ended; nothing written"),
    }
    Ok(())
}

fn list(args: ListArgs) -> Result<()> {
    let (config, settings) = load(&args.project.project)?;

    if args.all {
        let posts = collect_posts(&config)?.unwrap_or_default();
        for post in assemble(posts).primary {
            let verdict = match evaluate(&post, settings.now, settings.window.as_ref()) {
                Verdict::Accepted => String::from("visible"),
                Verdict::Rejected(rejection) => rejection.to_string(),
            };
            println!("{}  {}", row(&post, &config, &settings), verdict);
        }
        return Ok(());
    }

    if let Visible::Posts(posts) = visible_posts(&config, &settings)? {
        for post in assemble(posts).primary {
            println!("{}", row(&post, &config, &settings));
        }
    }
    Ok(())
}

fn tags(args: ProjectArgs) -> Result<()> {
    let (config, settings) = load(&args.project)?;
    if let Visible::Posts(posts) = visible_posts(&config, &settings)? {
        for tag in all_tags(&posts) {
            println!("{}", tag);
        }
    }
    Ok(())
}

fn load(project: &Path) -> Result<(Config, Settings)> {
    let config = Config::from_directory(project)?;
    let settings = Settings::resolve(&config, &ProcessEnvironment)?;
    Ok((config, settings))
}

fn row(post: &Post, config: &Config, settings: &Settings) -> String {
    format!(
        "{}  {:<9}  {:<24}  {}",
        post.published
            .with_timezone(&config.utc_offset)
            .format("%Y-%m-%d %H:%M"),
        status(post, settings.now, config.utc_offset).to_string(),
        post.slug,
        post.title
    )
}
