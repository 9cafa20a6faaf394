//! Loads the project file (`coursefeed.yaml`) and resolves the run settings
//! that come from the environment: "now" and the publication window.

use crate::clock;
use crate::date::{normalize, NotADate, RawDate};
use crate::env::Environment;
use crate::filter::Window;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

/// The name of the project file, searched for in the project directory and
/// its ancestors.
pub const PROJECT_FILE: &str = "coursefeed.yaml";

/// The environment variable holding the start of the publication window.
pub const TERM_START_VAR: &str = "TERM_START";

/// The environment variable holding the end of the publication window.
pub const TERM_END_VAR: &str = "TERM_END";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Project {
    title: String,
    link: Url,

    #[serde(default)]
    description: String,

    #[serde(default = "default_language")]
    language: String,

    #[serde(default = "default_content_directory")]
    content_directory: PathBuf,

    #[serde(default = "default_url_prefix")]
    url_prefix: String,

    #[serde(default = "default_utc_offset")]
    utc_offset: String,

    #[serde(default)]
    require_window: bool,
}

fn default_language() -> String {
    "en".to_owned()
}
fn default_content_directory() -> PathBuf {
    PathBuf::from("Content/Materials")
}
fn default_url_prefix() -> String {
    "materials".to_owned()
}
fn default_utc_offset() -> String {
    "+08:00".to_owned()
}

/// The project settings for a run.
#[derive(Clone, Debug)]
pub struct Config {
    /// The channel title of the primary feed.
    pub title: String,

    /// The site's home page. Post URLs are resolved against it.
    pub link: Url,

    pub description: String,
    pub language: String,

    /// The directory holding the `*.md` materials, resolved against the
    /// project file's directory.
    pub content_directory: PathBuf,

    /// Prepended to each file slug to form the post URL.
    pub url_prefix: String,

    /// The author's zone, applied to dates written without an offset.
    pub utc_offset: FixedOffset,

    /// When set, a run without `TERM_START` and `TERM_END` is a
    /// configuration error.
    pub require_window: bool,
}

impl Config {
    /// Finds [`PROJECT_FILE`] in `dir` or the nearest ancestor that has one
    /// and loads it.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        for ancestor in dir.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
        }
        Err(Error::ProjectFileNotFound(dir.to_owned()))
    }

    /// Loads a project file. Relative paths inside it are resolved against
    /// the file's directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        let project: Project =
            serde_yaml::from_str(&contents).map_err(|err| Error::DeserializeYaml {
                path: path.to_owned(),
                err,
            })?;
        let project_root = path.parent().unwrap_or_else(|| Path::new("."));

        Ok(Config {
            utc_offset: project
                .utc_offset
                .parse::<FixedOffset>()
                .map_err(|_| Error::InvalidUtcOffset(project.utc_offset.clone()))?,
            title: project.title,
            link: project.link,
            description: project.description,
            language: project.language,
            content_directory: project_root.join(project.content_directory),
            url_prefix: project.url_prefix,
            require_window: project.require_window,
        })
    }
}

/// The values computed once per run and shared by every file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub now: DateTime<Utc>,
    pub window: Option<Window>,
}

impl Settings {
    /// Resolves "now" (see [`clock::resolve_now`]) and the publication
    /// window from `env`.
    pub fn resolve<E: Environment>(config: &Config, env: &E) -> Result<Settings> {
        let now = clock::resolve_now(env.var(clock::OVERRIDE_VAR).as_deref());
        let window = window(
            env.var(TERM_START_VAR).as_deref(),
            env.var(TERM_END_VAR).as_deref(),
            config.utc_offset,
            config.require_window,
        )?;
        Ok(Settings { now, window })
    }
}

/// Builds the publication window from its two bounds. The bounds use the
/// same grammar and default zone as post dates. Both must be given or both
/// omitted; omitting them is an error when `required` is set.
pub fn window(
    start: Option<&str>,
    end: Option<&str>,
    tz: FixedOffset,
    required: bool,
) -> Result<Option<Window>> {
    let (start, end) = match (start, end) {
        (None, None) if required => return Err(Error::MissingWindow),
        (None, None) => {
            info!("no publication window configured");
            return Ok(None);
        }
        (Some(_), None) => return Err(Error::IncompleteWindow { missing: TERM_END_VAR }),
        (None, Some(_)) => {
            return Err(Error::IncompleteWindow {
                missing: TERM_START_VAR,
            })
        }
        (Some(start), Some(end)) => (start, end),
    };

    let bound = |var: &'static str, raw: &str| {
        normalize(&RawDate::Text(raw.to_owned()), tz)
            .map_err(|err| Error::InvalidWindowBound { var, err })
    };
    let window = Window {
        start: bound(TERM_START_VAR, start)?,
        end: bound(TERM_END_VAR, end)?,
    };

    if window.start > window.end {
        warn!(
            start = %window.start.to_rfc3339(),
            end = %window.end.to_rfc3339(),
            "publication window starts after it ends; no post can be accepted"
        );
    }
    info!(
        start = %window.start.to_rfc3339(),
        end = %window.end.to_rfc3339(),
        "publication window"
    );
    Ok(Some(window))
}

/// Represents the result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a configuration error. These are fatal for a run.
#[derive(Debug)]
pub enum Error {
    /// Returned when no project file exists in the directory or its
    /// ancestors.
    ProjectFileNotFound(PathBuf),

    /// Returned when the project file can't be read.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid.
    DeserializeYaml {
        path: PathBuf,
        err: serde_yaml::Error,
    },

    /// Returned when `utc_offset` isn't an offset like `+08:00`.
    InvalidUtcOffset(String),

    /// Returned when the window is required but neither bound is set.
    MissingWindow,

    /// Returned when only one of the window bounds is set.
    IncompleteWindow { missing: &'static str },

    /// Returned when a window bound isn't a date.
    InvalidWindowBound { var: &'static str, err: NotADate },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ProjectFileNotFound(dir) => write!(
                f,
                "could not find `{}` in `{}` or any parent directory",
                PROJECT_FILE,
                dir.display()
            ),
            Error::Io { path, err } => {
                write!(f, "reading project file `{}`: {}", path.display(), err)
            }
            Error::DeserializeYaml { path, err } => {
                write!(f, "loading project file `{}`: {}", path.display(), err)
            }
            Error::InvalidUtcOffset(offset) => {
                write!(f, "invalid utc_offset `{}`; expected e.g. `+08:00`", offset)
            }
            Error::MissingWindow => write!(
                f,
                "a publication window is required but `{}` and `{}` are unset",
                TERM_START_VAR, TERM_END_VAR
            ),
            Error::IncompleteWindow { missing } => {
                write!(f, "publication window is missing `{}`", missing)
            }
            Error::InvalidWindowBound { var, err } => write!(f, "`{}`: {}", var, err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { err, .. } => Some(err),
            Error::DeserializeYaml { err, .. } => Some(err),
            Error::InvalidWindowBound { err, .. } => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn manila() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn config(require_window: bool) -> Config {
        Config {
            title: "Courses".to_owned(),
            link: Url::parse("https://example.org/").unwrap(),
            description: String::new(),
            language: "en".to_owned(),
            content_directory: PathBuf::from("Content/Materials"),
            url_prefix: "materials".to_owned(),
            utc_offset: manila(),
            require_window,
        }
    }

    #[test]
    fn test_window_bounds_use_author_zone() -> Result<()> {
        let window = window(Some("2025-01-01"), Some("2025-01-31T23:59:59Z"), manila(), true)?;
        assert_eq!(
            Some(Window {
                start: Utc.with_ymd_and_hms(2024, 12, 31, 16, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap(),
            }),
            window
        );
        Ok(())
    }

    #[test]
    fn test_window_absent() -> Result<()> {
        assert_eq!(None, window(None, None, manila(), false)?);
        assert!(matches!(
            window(None, None, manila(), true),
            Err(Error::MissingWindow)
        ));
        Ok(())
    }

    #[test]
    fn test_window_incomplete() {
        assert!(matches!(
            window(Some("2025-01-01"), None, manila(), false),
            Err(Error::IncompleteWindow { missing: TERM_END_VAR })
        ));
        assert!(matches!(
            window(None, Some("2025-01-31"), manila(), true),
            Err(Error::IncompleteWindow {
                missing: TERM_START_VAR
            })
        ));
    }

    #[test]
    fn test_window_invalid_bound() {
        assert!(matches!(
            window(Some("2025-01-01"), Some("end of term"), manila(), false),
            Err(Error::InvalidWindowBound {
                var: TERM_END_VAR,
                ..
            })
        ));
    }

    #[test]
    fn test_settings_resolve() -> Result<()> {
        let env: HashMap<&str, &str> = [
            ("STATIC_GEN_TIME", "2025-01-15T00:00:00Z"),
            ("TERM_START", "2025-01-01"),
            ("TERM_END", "2025-01-31"),
        ]
        .into();
        let settings = Settings::resolve(&config(true), &env)?;
        assert_eq!(Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap(), settings.now);
        assert!(settings.window.is_some());

        let env: HashMap<&str, &str> = [("STATIC_GEN_TIME", "2025-01-15T00:00:00Z")].into();
        assert!(matches!(
            Settings::resolve(&config(true), &env),
            Err(Error::MissingWindow)
        ));
        assert_eq!(None, Settings::resolve(&config(false), &env)?.window);
        Ok(())
    }

    #[test]
    fn test_from_directory_searches_ancestors() -> Result<()> {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join(PROJECT_FILE),
            "title: Ren's Courses\nlink: https://example.org/\nutc_offset: \"-05:00\"\n",
        )
        .unwrap();
        let nested = root.path().join("Content").join("Materials");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::from_directory(&nested)?;
        assert_eq!("Ren's Courses", config.title);
        assert_eq!("en", config.language);
        assert_eq!("materials", config.url_prefix);
        assert_eq!(root.path().join("Content/Materials"), config.content_directory);
        assert_eq!(FixedOffset::west_opt(5 * 3600).unwrap(), config.utc_offset);
        assert!(!config.require_window);
        Ok(())
    }

    #[test]
    fn test_testdata_project() -> Result<()> {
        let config = Config::from_directory(Path::new("./testdata/materials"))?;
        assert_eq!(Path::new("./testdata/materials"), config.content_directory);
        assert_eq!("https://example.org/", config.link.as_str());
        assert_eq!(manila(), config.utc_offset);
        Ok(())
    }

    #[test]
    fn test_from_directory_missing() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::from_directory(root.path()),
            Err(Error::ProjectFileNotFound(_))
        ));
    }

    #[test]
    fn test_from_project_file_rejects_bad_offset() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join(PROJECT_FILE);
        std::fs::write(&path, "title: T\nlink: https://example.org/\nutc_offset: PHT\n").unwrap();
        assert!(matches!(
            Config::from_project_file(&path),
            Err(Error::InvalidUtcOffset(_))
        ));
    }
}
