//! Exports the [`build_feeds`] function which stitches together the steps of
//! one run: resolving "now" and the publication window ([`crate::config`]),
//! parsing the posts ([`crate::parser`]), filtering them
//! ([`crate::filter`]), and rendering the feeds ([`crate::feed`]).

use crate::config::{self, Config, Settings};
use crate::env::Environment;
use crate::feed::{self, assemble, write_json, write_rss, FeedConfig};
use crate::filter::accept;
use crate::parser::{self, Parser};
use crate::post::Post;
use crate::tag::feed_tags;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The primary feed's file name, relative to the output directory.
pub const FEED_FILE: &str = "feed.xml";

/// The JSON listing's file name, relative to the output directory.
pub const JSON_FILE: &str = "feed.json";

/// The directory holding per-tag feeds, relative to the output directory.
pub const TAGS_DIRECTORY: &str = "tags";

/// What a run did. Only [`Outcome::Written`] produces files; the other
/// variants are successful runs with nothing to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Written { posts: usize, tags: usize },
    NoContent,
    TermEnded,
}

/// The posts a run would publish.
#[derive(Clone, Debug, PartialEq)]
pub enum Visible {
    /// The accepted posts, in file-name order.
    Posts(Vec<Post>),

    /// The content directory doesn't exist.
    NoContent,

    /// "Now" is past the end of the publication window.
    TermEnded,
}

/// Parses every post in the content directory, without filtering. Returns
/// `None` when the directory doesn't exist.
pub fn collect_posts(config: &Config) -> Result<Option<Vec<Post>>> {
    if !config.content_directory.is_dir() {
        warn!(
            path = %config.content_directory.display(),
            "content directory not found; nothing to do"
        );
        return Ok(None);
    }
    let parser = Parser::new(&config.url_prefix, config.utc_offset);
    Ok(Some(parser.parse_posts(&config.content_directory)?))
}

/// Returns the posts that should currently be visible.
pub fn visible_posts(config: &Config, settings: &Settings) -> Result<Visible> {
    if let Some(window) = &settings.window {
        if window.has_ended(settings.now) {
            info!(
                now = %settings.now.to_rfc3339(),
                end = %window.end.to_rfc3339(),
                "publication window has ended; nothing to do"
            );
            return Ok(Visible::TermEnded);
        }
    }

    let posts = match collect_posts(config)? {
        None => return Ok(Visible::NoContent),
        Some(posts) => posts,
    };
    Ok(Visible::Posts(
        posts
            .into_iter()
            .filter(|post| accept(post, settings.now, settings.window.as_ref()))
            .collect(),
    ))
}

/// Runs the whole pipeline and writes `feed.xml`, `feed.json` and one feed
/// per tag under `output_directory`. Configuration errors are returned;
/// problems with individual posts are logged and the post is left out.
pub fn build_feeds<E: Environment>(
    config: &Config,
    env: &E,
    output_directory: &Path,
) -> Result<Outcome> {
    let settings = Settings::resolve(config, env)?;
    let posts = match visible_posts(config, &settings)? {
        Visible::Posts(posts) => posts,
        Visible::NoContent => return Ok(Outcome::NoContent),
        Visible::TermEnded => return Ok(Outcome::TermEnded),
    };

    let feeds = assemble(posts);
    let now = settings.now;

    std::fs::create_dir_all(output_directory).map_err(|err| Error::CreateDirectory {
        path: output_directory.to_owned(),
        err,
    })?;

    let primary = FeedConfig {
        title: config.title.clone(),
        description: config.description.clone(),
        language: &config.language,
        link: &config.link,
        build_date: now,
    };
    write_rss(
        &primary,
        &feeds.primary,
        create(&output_directory.join(FEED_FILE))?,
    )?;
    write_json(
        &feeds.primary,
        now,
        config.utc_offset,
        create(&output_directory.join(JSON_FILE))?,
    )?;

    // Clear out the old tag feeds so tags that no longer have posts don't
    // leave stale files behind.
    let tags_directory = output_directory.join(TAGS_DIRECTORY);
    rmdir(&tags_directory)?;
    std::fs::create_dir_all(&tags_directory).map_err(|err| Error::CreateDirectory {
        path: tags_directory.clone(),
        err,
    })?;

    let tags = feed_tags(feeds.tags.keys().map(String::as_str));
    for (tag, posts) in tags.iter().zip(feeds.tags.values()) {
        let name = &tag.name;
        let tag_config = FeedConfig {
            title: format!("{}: {}", config.title, name),
            description: format!("{} ({})", config.description, name),
            language: &config.language,
            link: &config.link,
            build_date: now,
        };
        write_rss(&tag_config, posts, create(&tags_directory.join(tag.file_name()))?)?;
    }

    info!(
        posts = feeds.primary.len(),
        tags = tags.len(),
        output = %output_directory.display(),
        "feeds written"
    );
    Ok(Outcome::Written {
        posts: feeds.primary.len(),
        tags: tags.len(),
    })
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|err| Error::CreateFile {
            path: path.to_owned(),
            err,
        })
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for a run. Errors can come from configuration, scanning
/// the content directory, rendering feeds, and writing output files.
#[derive(Debug)]
pub enum Error {
    /// Returned for configuration errors. These are fatal.
    Config(config::Error),

    /// Returned when the content directory can't be read.
    Parse(parser::Error),

    /// Returned for errors rendering a feed.
    Feed(feed::Error),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while creating output directories.
    CreateDirectory { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while creating output files.
    CreateFile { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => write!(f, "configuration error: {}", err),
            Error::Parse(err) => write!(f, "{}", err),
            Error::Feed(err) => write!(f, "writing feed: {}", err),
            Error::Clean { path, err } => {
                write!(f, "cleaning directory '{}': {}", path.display(), err)
            }
            Error::CreateDirectory { path, err } => {
                write!(f, "creating directory '{}': {}", path.display(), err)
            }
            Error::CreateFile { path, err } => {
                write!(f, "creating file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(err) => Some(err),
            Error::Parse(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::CreateDirectory { path: _, err } => Some(err),
            Error::CreateFile { path: _, err } => Some(err),
        }
    }
}

impl From<config::Error> for Error {
    /// Converts [`config::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: config::Error) -> Error {
        Error::Config(err)
    }
}

impl From<parser::Error> for Error {
    /// Converts [`parser::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: parser::Error) -> Error {
        Error::Parse(err)
    }
}

impl From<feed::Error> for Error {
    /// Converts [`feed::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: feed::Error) -> Error {
        Error::Feed(err)
    }
}
