//! Defines the [`Parser`] type, which reads every `*.md` file in a content
//! directory into a [`Post`]. Each file is handled on its own: a file that
//! can't be read or parsed is logged and left out, and never stops the scan.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use chrono::FixedOffset;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::frontmatter::{self, FrontMatter};
use crate::post::{extract, Extraction, Post};

const MARKDOWN_EXTENSION: &str = "md";

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// `url_prefix` is prepended to each file slug to build the post URL
    /// (i.e., the URL for `lexer.md` is `{url_prefix}/lexer`).
    url_prefix: &'a str,

    /// `tz` is the author's zone, used for dates written without an offset.
    tz: FixedOffset,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(url_prefix: &'a str, tz: FixedOffset) -> Parser<'a> {
        Parser { url_prefix, tz }
    }

    /// Parses a single file into an [`Extraction`]. The slug is the file's
    /// base name without extension.
    pub fn parse_post(&self, path: &Path) -> Result<Extraction> {
        match self._parse_post(path) {
            Ok(extraction) => Ok(extraction),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{}`", path.display()),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(&self, path: &Path) -> Result<Extraction> {
        let slug = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::InvalidFileName(path.to_owned()))?;
        let contents = std::fs::read_to_string(path)?;
        let front_matter = FrontMatter::parse(&contents)?;
        Ok(extract(&front_matter, slug, self.url_prefix, self.tz))
    }

    /// Searches `source_directory` (not recursively) for post files
    /// (extension = `.md`) and returns the [`Post`]s that could be extracted,
    /// in file-name order. Posts are not filtered; drafts and scheduled posts
    /// are included. Only a failure to read the directory itself is an
    /// error.
    ///
    /// Each post file must be structured as follows:
    ///
    /// ```md
    /// ---
    /// title: Lexical Analysis
    /// published: 2025-01-10
    /// tags: [cmsc-124]
    /// ---
    /// # Tokens
    /// ```
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let walker = WalkDir::new(source_directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => return Err(err.into()),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !Self::is_post_file(&entry) {
                continue;
            }

            let path = entry.path();
            match self.parse_post(path) {
                Ok(Extraction::Post(post)) => {
                    debug!(path = %path.display(), slug = %post.slug, "parsed post");
                    posts.push(post);
                }
                Ok(Extraction::Skip(skip)) => {
                    info!(path = %path.display(), "skipping post: {}", skip);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping post");
                }
            }
        }

        Ok(posts)
    }

    fn is_post_file(entry: &walkdir::DirEntry) -> bool {
        entry.file_type().is_file()
            && entry.path().extension().and_then(|ext| ext.to_str()) == Some(MARKDOWN_EXTENSION)
    }
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when the front matter is missing or malformed.
    FrontMatter(frontmatter::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned when a source file name isn't valid UTF-8.
    InvalidFileName(PathBuf),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontMatter(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "{}", err),
            Error::WalkDir(err) => write!(f, "{}", err),
            Error::InvalidFileName(path) => {
                write!(f, "invalid file name: {:?}", path)
            }
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontMatter(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::InvalidFileName(_) => None,
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<frontmatter::Error> for Error {
    /// Converts a [`frontmatter::Error`] into an [`Error`].
    fn from(err: frontmatter::Error) -> Error {
        Error::FrontMatter(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for directory traversal.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::Skip;
    use chrono::{TimeZone, Utc};

    fn manila() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn test_parse_posts() -> Result<()> {
        let parser = Parser::new("materials", manila());
        let posts = parser.parse_posts(Path::new("./testdata/materials/"))?;

        // broken.md, no-date.md, bad-date.md and notes.txt are left out.
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(vec!["draft", "lexer", "parser", "scheduled"], slugs);

        let lexer = &posts[1];
        assert_eq!("Lexical Analysis", lexer.title);
        assert_eq!("materials/lexer", lexer.url);
        assert_eq!(Utc.with_ymd_and_hms(2025, 1, 9, 16, 0, 0).unwrap(), lexer.published);
        assert_eq!(vec!["cmsc-124".to_owned(), "compilers".to_owned()], lexer.tags);
        assert!(posts[0].draft);
        Ok(())
    }

    #[test]
    fn test_parse_post_skips() -> Result<()> {
        let parser = Parser::new("materials", manila());
        assert_eq!(
            Extraction::Skip(Skip::MissingPublishDate),
            parser.parse_post(Path::new("./testdata/materials/no-date.md"))?
        );
        assert!(matches!(
            parser.parse_post(Path::new("./testdata/materials/bad-date.md"))?,
            Extraction::Skip(Skip::MalformedDate(_))
        ));
        Ok(())
    }

    #[test]
    fn test_parse_post_errors_are_annotated() {
        let parser = Parser::new("materials", manila());
        match parser.parse_post(Path::new("./testdata/materials/broken.md")) {
            Err(Error::Annotated(annotation, err)) => {
                assert!(annotation.contains("broken.md"));
                assert!(matches!(*err, Error::FrontMatter(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_directory() {
        let parser = Parser::new("materials", manila());
        assert!(matches!(
            parser.parse_posts(Path::new("./testdata/does-not-exist")),
            Err(Error::WalkDir(_))
        ));
    }
}
