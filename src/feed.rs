//! Assembles accepted posts into the primary feed and per-tag feeds, and
//! renders them as RSS 2.0 channels and a JSON listing.

use crate::post::Post;
use crate::status::{status, Status};
use crate::tag::{index_posts, TagIndex};
use chrono::{DateTime, FixedOffset, Utc};
use rss::{Category, Channel, Error as RssError, Guid, Item};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use url::Url;

/// The posts of one run, ready for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct Feeds {
    /// Every accepted post, newest first.
    pub primary: Vec<Post>,

    /// The posts for each tag, newest first.
    pub tags: TagIndex,
}

/// Sorts `posts` newest first and groups them by tag. Posts published at the
/// same instant keep their input order.
pub fn assemble(mut posts: Vec<Post>) -> Feeds {
    // `sort_by` is stable, which preserves scan order for ties.
    posts.sort_by(|a, b| b.published.cmp(&a.published));
    let tags = index_posts(&posts);
    Feeds {
        primary: posts,
        tags,
    }
}

/// Bundled configuration for rendering a channel.
pub struct FeedConfig<'a> {
    pub title: String,
    pub description: String,
    pub language: &'a str,

    /// The site's home page. Post URLs are resolved against it.
    pub link: &'a Url,

    /// Rendered as the channel's `lastBuildDate`.
    pub build_date: DateTime<Utc>,
}

/// Creates an RSS channel from some configuration ([`FeedConfig`]) and a list
/// of [`Post`]s and writes the result to a [`std::io::Write`].
pub fn write_rss<W: Write>(config: &FeedConfig, posts: &[Post], w: W) -> Result<()> {
    channel(config, posts)?.write_to(w)?.flush()?;
    Ok(())
}

fn channel(config: &FeedConfig, posts: &[Post]) -> Result<Channel> {
    Ok(Channel {
        title: config.title.clone(),
        link: config.link.to_string(),
        description: config.description.clone(),
        language: Some(config.language.to_owned()),
        last_build_date: Some(config.build_date.to_rfc2822()),
        generator: Some(format!("coursefeed {}", env!("CARGO_PKG_VERSION"))),
        items: posts
            .iter()
            .map(|post| item(config.link, post))
            .collect::<Result<Vec<Item>>>()?,
        ..Default::default()
    })
}

fn item(site: &Url, post: &Post) -> Result<Item> {
    let link = site.join(&post.url)?.to_string();
    let title = match post.subtitle.is_empty() {
        true => post.title.clone(),
        false => format!("{}: {}", post.title, post.subtitle),
    };
    let authors: Vec<&str> = post.authors.iter().map(|a| a.name.as_str()).collect();

    Ok(Item {
        title: Some(title),
        link: Some(link.clone()),
        guid: Some(Guid {
            value: link,
            permalink: true,
        }),
        pub_date: Some(post.published.to_rfc2822()),
        description: Some(post.lead.clone()),
        author: match authors.is_empty() {
            true => None,
            false => Some(authors.join(", ")),
        },
        categories: post
            .tags
            .iter()
            .map(|tag| Category {
                name: tag.clone(),
                domain: None,
            })
            .collect(),
        ..Default::default()
    })
}

/// One entry of the JSON listing.
#[derive(Serialize)]
struct JsonItem<'a> {
    title: &'a str,
    subtitle: &'a str,
    url: &'a str,
    date: String,
    tags: &'a [String],
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_link: Option<&'a str>,
}

/// Writes `posts` as a pretty-printed JSON array of
/// `{title, subtitle, url, date, tags, status}`, plus `download_link` for
/// posts that have one. Statuses are computed at
/// `now` in the author's zone `tz`.
pub fn write_json<W: Write>(
    posts: &[Post],
    now: DateTime<Utc>,
    tz: FixedOffset,
    mut w: W,
) -> Result<()> {
    let items: Vec<JsonItem> = posts
        .iter()
        .map(|post| JsonItem {
            title: &post.title,
            subtitle: &post.subtitle,
            url: &post.url,
            date: post.published.to_rfc3339(),
            tags: &post.tags,
            status: status(post, now, tz),
            download_link: post.download_link.as_deref(),
        })
        .collect();
    serde_json::to_writer_pretty(&mut w, &items)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem rendering a feed. Variants include I/O, RSS, JSON,
/// and URL issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an RSS-related error.
    Rss(RssError),

    /// Returned when the JSON listing can't be serialized.
    Json(serde_json::Error),

    /// Returned when a post URL can't be resolved against the site link.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "{}", err),
            Error::Rss(err) => write!(f, "{}", err),
            Error::Json(err) => write!(f, "{}", err),
            Error::UrlParse(err) => write!(f, "resolving post URL: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Rss(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<RssError> for Error {
    /// Converts [`RssError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: RssError) -> Error {
        Error::Rss(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::Author;
    use chrono::TimeZone;

    fn post(slug: &str, day: u32, tags: &[&str]) -> Post {
        Post {
            slug: slug.to_owned(),
            url: format!("materials/{}", slug),
            title: slug.to_uppercase(),
            subtitle: String::new(),
            lead: format!("About {}.", slug),
            published: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
            draft: false,
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            authors: Vec::new(),
            deadline: None,
            no_deadline: false,
            download_link: None,
        }
    }

    fn slugs(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.slug.as_str()).collect()
    }

    #[test]
    fn test_assemble_sorts_newest_first() {
        let feeds = assemble(vec![
            post("old", 1, &[]),
            post("new", 20, &[]),
            post("mid", 10, &[]),
        ]);
        assert_eq!(vec!["new", "mid", "old"], slugs(&feeds.primary));
        for pair in feeds.primary.windows(2) {
            assert!(pair[0].published >= pair[1].published);
        }
    }

    #[test]
    fn test_assemble_keeps_scan_order_for_ties() {
        let feeds = assemble(vec![
            post("b", 5, &["x"]),
            post("a", 5, &["x"]),
            post("c", 5, &["x"]),
        ]);
        assert_eq!(vec!["b", "a", "c"], slugs(&feeds.primary));
        assert_eq!(vec!["b", "a", "c"], slugs(&feeds.tags["x"]));
    }

    #[test]
    fn test_assemble_tag_feeds() {
        let both = post("both", 3, &["a", "b"]);
        let feeds = assemble(vec![post("only-a", 2, &["a"]), both.clone(), post("none", 1, &[])]);
        assert_eq!(vec!["a", "b"], feeds.tags.keys().collect::<Vec<_>>());
        assert_eq!(vec!["both", "only-a"], slugs(&feeds.tags["a"]));
        assert_eq!(vec![both.clone()], feeds.tags["b"]);
        assert_eq!(Some(&both), feeds.primary.iter().find(|p| p.slug == "both"));
        assert_eq!(feeds.tags["a"][0], feeds.tags["b"][0]);
    }

    #[test]
    fn test_write_rss() -> Result<()> {
        let link = Url::parse("https://example.org/courses/")?;
        let mut first = post("lexer", 10, &["cmsc-124"]);
        first.subtitle = "Part <1>".to_owned();
        first.authors.push(Author {
            name: "Ren".to_owned(),
            nickname: None,
            github_user_name: None,
        });
        let config = FeedConfig {
            title: "Courses & Notes".to_owned(),
            description: "Materials".to_owned(),
            language: "en",
            link: &link,
            build_date: Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap(),
        };

        let mut out = Vec::new();
        write_rss(&config, &[first], &mut out)?;
        let xml = String::from_utf8(out).unwrap();

        assert!(xml.contains("<title>Courses &amp; Notes</title>"), "{}", xml);
        assert!(xml.contains("<title>LEXER: Part &lt;1&gt;</title>"), "{}", xml);
        assert!(
            xml.contains("<link>https://example.org/courses/materials/lexer</link>"),
            "{}",
            xml
        );
        assert!(xml.contains("<pubDate>Fri, 10 Jan 2025 00:00:00 +0000</pubDate>"), "{}", xml);
        assert!(xml.contains("<category>cmsc-124</category>"), "{}", xml);
        assert!(xml.contains("<author>Ren</author>"), "{}", xml);
        assert!(xml.contains("<lastBuildDate>Wed, 15 Jan 2025 00:00:00 +0000</lastBuildDate>"));

        let channel = Channel::read_from(xml.as_bytes())?;
        assert_eq!(1, channel.items().len());
        assert_eq!(Some("About lexer."), channel.items()[0].description());
        Ok(())
    }

    #[test]
    fn test_write_json() -> Result<()> {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let mut out = Vec::new();
        write_json(&[post("lexer", 10, &["a"])], now, tz, &mut out)?;

        let value: serde_json::Value = serde_json::from_slice(&out)?;
        assert_eq!(
            serde_json::json!([{
                "title": "LEXER",
                "subtitle": "",
                "url": "materials/lexer",
                "date": "2025-01-10T00:00:00+00:00",
                "tags": ["a"],
                "status": "future",
            }]),
            value
        );
        Ok(())
    }

    #[test]
    fn test_write_json_download_link() -> Result<()> {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let mut lexer = post("lexer", 10, &[]);
        lexer.download_link = Some("https://example.org/files/lexer.pdf".to_owned());
        let mut out = Vec::new();
        write_json(&[lexer], now, tz, &mut out)?;

        let value: serde_json::Value = serde_json::from_slice(&out)?;
        assert_eq!(
            Some("https://example.org/files/lexer.pdf"),
            value[0]["download_link"].as_str()
        );
        Ok(())
    }
}
