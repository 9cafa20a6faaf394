//! Defines the [`Tag`] type and the [`TagIndex`], which groups accepted
//! [`Post`]s by tag for the per-tag feeds.

use crate::post::Post;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Maps each tag name to its posts. The posts keep the order they had in the
/// slice that was indexed.
pub type TagIndex = BTreeMap<String, Vec<Post>>;

/// A tag as it appears in the output: its name and the slug used for its feed
/// file name.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag as the author wrote it.
    pub name: String,

    /// The slugified name, which can be dropped into a URL. Distinct names
    /// can slugify alike (`CMSC 124` and `cmsc-124`); see [`feed_tags`].
    pub slug: String,
}

impl Tag {
    pub fn new(name: &str) -> Tag {
        let slug = slug::slugify(name);
        Tag {
            name: name.to_owned(),
            slug: if slug.is_empty() {
                String::from("tag")
            } else {
                slug
            },
        }
    }

    /// The file name of the tag's feed, relative to the tags directory.
    pub fn file_name(&self) -> String {
        format!("{}.xml", self.slug)
    }
}

/// Builds a [`Tag`] for each of `names`, in order, such that no two share a
/// slug. A name whose slug is already taken gets the first free `-2`, `-3`,
/// ... suffix, so every distinct tag keeps a feed file of its own.
pub fn feed_tags<'a, I>(names: I) -> Vec<Tag>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let mut tag = Tag::new(name);
            if !taken.insert(tag.slug.clone()) {
                let base = std::mem::take(&mut tag.slug);
                let mut n = 2;
                while !taken.insert(format!("{}-{}", base, n)) {
                    n += 1;
                }
                tag.slug = format!("{}-{}", base, n);
                warn!(
                    tag = name,
                    slug = %tag.slug,
                    "tag slug collides with another tag; feed renamed"
                );
            }
            tag
        })
        .collect()
}

/// Indexes `posts` by tag. A post with several tags lands in each of their
/// lists, and a tag only appears if some post carries it.
pub fn index_posts(posts: &[Post]) -> TagIndex {
    let mut index = TagIndex::new();
    for post in posts {
        for tag in post.tags.iter() {
            index.entry(tag.clone()).or_default().push(post.clone());
        }
    }
    index
}

/// The distinct tags across `posts`, sorted.
pub fn all_tags(posts: &[Post]) -> Vec<String> {
    index_posts(posts).into_keys().collect()
}
