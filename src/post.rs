//! Defines the [`Post`] type and [`extract`], which turns one file's
//! [`FrontMatter`] into a [`Post`] or a [`Skip`] decision.

use crate::date::{normalize, NotADate, RawDate};
use crate::frontmatter::{to_text, FrontMatter};
use chrono::{DateTime, FixedOffset, Utc};
use serde_yaml::Value;
use std::fmt;
use tracing::warn;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_LEAD: &str = "No description.";
pub const DEFAULT_AUTHOR: &str = "Author";

/// The key spelling authors are expected to use for the draft flag.
const DRAFT_KEY: &str = "isDraft";

/// A course material that has been read from disk and normalized.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The file's base name without extension.
    pub slug: String,

    /// `{url_prefix}/{slug}`.
    pub url: String,

    pub title: String,

    /// Empty when the front matter doesn't set one.
    pub subtitle: String,

    /// The abstract shown in feeds.
    pub lead: String,

    /// When the post becomes public, in UTC.
    pub published: DateTime<Utc>,

    pub draft: bool,

    /// Distinct tags in the order they were written.
    pub tags: Vec<String>,

    pub authors: Vec<Author>,

    /// An explicit due date, if any. See [`crate::status`].
    pub deadline: Option<DateTime<Utc>>,

    /// Set when the material has no due date at all.
    pub no_deadline: bool,

    /// A link to a downloadable copy of the material, if any.
    pub download_link: Option<String>,
}

/// Somebody credited on a post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub nickname: Option<String>,
    pub github_user_name: Option<String>,
}

/// The outcome of [`extract`].
#[derive(Clone, Debug, PartialEq)]
pub enum Extraction {
    Post(Post),
    Skip(Skip),
}

/// Why a file was left out before filtering.
#[derive(Clone, Debug, PartialEq)]
pub enum Skip {
    /// The file has no `published` value. Common for unfinished drafts.
    MissingPublishDate,

    /// The `published` value couldn't be normalized.
    MalformedDate(NotADate),
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Skip::MissingPublishDate => write!(f, "no publish date"),
            Skip::MalformedDate(err) => write!(f, "malformed publish date: {}", err),
        }
    }
}

/// Builds a [`Post`] from one file's front matter. Files without a publish
/// date are skipped before any date parsing happens. `tz` is the author's
/// zone, applied to dates written without an offset.
pub fn extract(
    front_matter: &FrontMatter,
    file_slug: &str,
    url_prefix: &str,
    tz: FixedOffset,
) -> Extraction {
    let raw_published = match front_matter.value("published") {
        None | Some(Value::Null) => return Extraction::Skip(Skip::MissingPublishDate),
        Some(value) => RawDate::from(value),
    };
    let published = match normalize(&raw_published, tz) {
        Ok(published) => published,
        Err(err) => return Extraction::Skip(Skip::MalformedDate(err)),
    };

    let deadline = front_matter
        .value("deadline")
        .filter(|v| !v.is_null())
        .and_then(|v| match normalize(&RawDate::from(v), tz) {
            Ok(deadline) => Some(deadline),
            Err(err) => {
                warn!(slug = file_slug, error = %err, "ignoring malformed deadline");
                None
            }
        });

    Extraction::Post(Post {
        slug: file_slug.to_owned(),
        url: format!("{}/{}", url_prefix.trim_end_matches('/'), file_slug),
        title: front_matter
            .text("title")
            .unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
        subtitle: front_matter.text("subtitle").unwrap_or_default(),
        lead: front_matter
            .text("lead")
            .or_else(|| front_matter.text("abstract"))
            .filter(|lead| !lead.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LEAD.to_owned()),
        published,
        draft: draft_flag(front_matter, file_slug),
        tags: tags(front_matter.value("tags")),
        authors: authors(front_matter.value("authors")),
        deadline,
        no_deadline: front_matter
            .value("noDeadline")
            .map_or(false, |v| truthy(v).unwrap_or(false)),
        download_link: front_matter
            .text("downloadLink")
            .map(|link| link.trim().to_owned())
            .filter(|link| !link.is_empty()),
    })
}

// Reads `isDraft` in any casing. Only a true-ish value marks a draft; spelling
// or typing that differs from `isDraft: true` is reported so authors can fix
// it, since other tooling may read the flag strictly.
fn draft_flag(front_matter: &FrontMatter, slug: &str) -> bool {
    let (key, value) = match front_matter.get(DRAFT_KEY) {
        None => return false,
        Some(entry) => entry,
    };

    if key != DRAFT_KEY {
        warn!(slug, key, "draft flag spelled differently from `{}`", DRAFT_KEY);
    }
    if let Value::String(s) = value {
        warn!(slug, value = %s, "draft flag is a string, not a boolean");
    }

    match truthy(value) {
        Some(draft) => draft,
        None => {
            warn!(slug, value = ?value, "unrecognized draft flag; treating as not a draft");
            false
        }
    }
}

// `Some(true)` for the true-ish forms, `Some(false)` for the false-ish ones,
// `None` for anything else.
fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" | "" => Some(false),
            _ => None,
        },
        Value::Null => Some(false),
        Value::Tagged(tagged) => truthy(&tagged.value),
        _ => None,
    }
}

fn tags(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items.iter().filter_map(to_text).collect(),
        Some(single) => to_text(single).into_iter().collect(),
    };

    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = tag.trim().to_owned();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn authors(value: Option<&Value>) -> Vec<Author> {
    let items: &[Value] = match value {
        Some(Value::Sequence(items)) => items,
        Some(single) if !single.is_null() => std::slice::from_ref(single),
        _ => &[],
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Mapping(mapping) => {
                let fields = FrontMatter::from(mapping.clone());
                Some(Author {
                    name: fields
                        .text("name")
                        .unwrap_or_else(|| DEFAULT_AUTHOR.to_owned()),
                    nickname: fields.text("nickname"),
                    github_user_name: fields.text("gitHubUserName"),
                })
            }
            other => to_text(other).map(|name| Author {
                name,
                nickname: None,
                github_user_name: None,
            }),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn manila() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn front_matter(yaml: &str) -> FrontMatter {
        FrontMatter::parse(&format!("---\n{}\n---\n", yaml)).unwrap()
    }

    fn post(yaml: &str) -> Post {
        match extract(&front_matter(yaml), "lexer", "materials", manila()) {
            Extraction::Post(post) => post,
            Extraction::Skip(skip) => panic!("unexpected skip: {}", skip),
        }
    }

    #[test]
    fn test_defaults() {
        let post = post("published: 2025-01-10");
        assert_eq!(
            Post {
                slug: "lexer".to_owned(),
                url: "materials/lexer".to_owned(),
                title: DEFAULT_TITLE.to_owned(),
                subtitle: String::new(),
                lead: DEFAULT_LEAD.to_owned(),
                published: Utc.with_ymd_and_hms(2025, 1, 9, 16, 0, 0).unwrap(),
                draft: false,
                tags: Vec::new(),
                authors: Vec::new(),
                deadline: None,
                no_deadline: false,
                download_link: None,
            },
            post
        );
    }

    #[test]
    fn test_all_fields() {
        let post = post(
            "title: Lexical Analysis\n\
             subtitle: Part 1\n\
             lead: Tokens and lexemes.\n\
             published: 2025-01-10T09:00:00+08:00\n\
             isDraft: false\n\
             tags: [cmsc-124, 2]\n\
             authors:\n  - name: Ren\n    gitHubUserName: ren\n  - Guest\n\
             deadline: 2025-01-20\n\
             downloadLink: https://example.org/files/lexer.pdf",
        );
        assert_eq!("Lexical Analysis", post.title);
        assert_eq!("Part 1", post.subtitle);
        assert_eq!("Tokens and lexemes.", post.lead);
        assert_eq!(Utc.with_ymd_and_hms(2025, 1, 10, 1, 0, 0).unwrap(), post.published);
        assert!(!post.draft);
        assert_eq!(vec!["cmsc-124".to_owned(), "2".to_owned()], post.tags);
        assert_eq!(
            vec![
                Author {
                    name: "Ren".to_owned(),
                    nickname: None,
                    github_user_name: Some("ren".to_owned()),
                },
                Author {
                    name: "Guest".to_owned(),
                    nickname: None,
                    github_user_name: None,
                },
            ],
            post.authors
        );
        assert_eq!(
            Some(Utc.with_ymd_and_hms(2025, 1, 19, 16, 0, 0).unwrap()),
            post.deadline
        );
        assert_eq!(
            Some("https://example.org/files/lexer.pdf".to_owned()),
            post.download_link
        );
    }

    #[test]
    fn test_abstract_fallback() {
        assert_eq!("Short.", post("published: 2025-01-10\nabstract: Short.").lead);
        assert_eq!(DEFAULT_LEAD, post("published: 2025-01-10\nlead: ''").lead);
    }

    #[test]
    fn test_single_tag_is_wrapped() {
        assert_eq!(vec!["algo".to_owned()], post("published: 2025-01-10\ntags: algo").tags);
        assert_eq!(
            vec!["a".to_owned(), "b".to_owned()],
            post("published: 2025-01-10\ntags: [a, b, a]").tags
        );
    }

    #[test]
    fn test_draft_flag() {
        for yaml in [
            "isDraft: true",
            "IsDraft: true",
            "isdraft: 'True'",
            "isDraft: yes",
            "ISDRAFT: \"YES\"",
        ] {
            assert!(post(&format!("published: 2025-01-10\n{}", yaml)).draft, "{}", yaml);
        }
        for yaml in ["isDraft: false", "isDraft: no", "isDraft: maybe", "isDraft: 1", "draft: true"] {
            assert!(!post(&format!("published: 2025-01-10\n{}", yaml)).draft, "{}", yaml);
        }
    }

    #[test]
    fn test_missing_publish_date_is_skipped() {
        for yaml in ["title: Unfinished", "title: Unfinished\npublished:"] {
            assert_eq!(
                Extraction::Skip(Skip::MissingPublishDate),
                extract(&front_matter(yaml), "wip", "materials", manila())
            );
        }
    }

    #[test]
    fn test_malformed_publish_date_is_skipped() {
        match extract(
            &front_matter("published: sometime in March"),
            "wip",
            "materials",
            manila(),
        ) {
            Extraction::Skip(Skip::MalformedDate(err)) => {
                assert_eq!("\"sometime in March\"", err.value)
            }
            other => panic!("unexpected extraction: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_deadline_is_ignored() {
        let post = post("published: 2025-01-10\ndeadline: whenever\nnoDeadline: true");
        assert_eq!(None, post.deadline);
        assert!(post.no_deadline);
    }

    #[test]
    fn test_url_prefix_trailing_slash() {
        match extract(
            &front_matter("published: 2025-01-10"),
            "parser",
            "https://example.org/materials/",
            manila(),
        ) {
            Extraction::Post(post) => {
                assert_eq!("https://example.org/materials/parser", post.url)
            }
            other => panic!("unexpected extraction: {:?}", other),
        }
    }
}
