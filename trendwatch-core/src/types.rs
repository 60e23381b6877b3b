use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Engagement counters as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostMetrics {
    pub views: u64,
    pub likes: u64,
    pub favorites: u64,
    pub coins: u64,
    /// Overlay comment (danmaku) count.
    pub danmaku: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Platform-qualified identity, e.g. `bilibili_BV1xx411c7mD`.
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_snippet: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metrics: PostMetrics,
    #[serde(default)]
    pub keyword_matched: String,
    #[serde(default)]
    pub hot_score: f64,
    #[serde(default)]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl PostRecord {
    /// Instant used for the ranking window: publish time, else first sighting.
    pub fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.posted_at.or(self.first_seen)
    }
}

/// All posts observed during one calendar day, keyed by `uid`.
///
/// Iteration follows insertion order, and the JSON form is an object whose
/// keys appear in that same order, so reloading a dataset keeps ranking
/// tie-breaks stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyDataset {
    posts: Vec<PostRecord>,
    index: HashMap<String, usize>,
}

impl DailyDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.index.contains_key(uid)
    }

    pub fn get(&self, uid: &str) -> Option<&PostRecord> {
        self.index.get(uid).map(|&i| &self.posts[i])
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut PostRecord> {
        match self.index.get(uid) {
            Some(&i) => Some(&mut self.posts[i]),
            None => None,
        }
    }

    /// Inserts `post`, or replaces the entry with the same `uid` in place.
    /// Returns `true` when the uid was not present before.
    pub fn upsert(&mut self, post: PostRecord) -> bool {
        match self.index.get(&post.uid) {
            Some(&i) => {
                self.posts[i] = post;
                false
            }
            None => {
                self.index.insert(post.uid.clone(), self.posts.len());
                self.posts.push(post);
                true
            }
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PostRecord> {
        self.posts.iter()
    }
}

impl<'a> IntoIterator for &'a DailyDataset {
    type Item = &'a PostRecord;
    type IntoIter = std::slice::Iter<'a, PostRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.posts.iter()
    }
}

impl FromIterator<PostRecord> for DailyDataset {
    fn from_iter<I: IntoIterator<Item = PostRecord>>(iter: I) -> Self {
        let mut dataset = DailyDataset::new();
        for post in iter {
            dataset.upsert(post);
        }
        dataset
    }
}

impl Serialize for DailyDataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.posts.len()))?;
        for post in &self.posts {
            map.serialize_entry(&post.uid, post)?;
        }
        map.end()
    }
}

/// One dataset entry; anything that is not a post record is kept aside so a
/// single bad entry does not discard the rest of the day.
#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetEntry {
    Post(PostRecord),
    Unreadable(serde::de::IgnoredAny),
}

impl<'de> Deserialize<'de> for DailyDataset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DatasetVisitor;

        impl<'de> Visitor<'de> for DatasetVisitor {
            type Value = DailyDataset;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of post uid to post record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut dataset = DailyDataset::new();
                while let Some((uid, entry)) = access.next_entry::<String, DatasetEntry>()? {
                    match entry {
                        DatasetEntry::Post(mut post) => {
                            // The map key is authoritative for identity.
                            post.uid = uid;
                            dataset.upsert(post);
                        }
                        DatasetEntry::Unreadable(_) => {
                            warn!("Skipping unreadable dataset entry {}", uid);
                        }
                    }
                }
                Ok(dataset)
            }
        }

        deserializer.deserialize_map(DatasetVisitor)
    }
}
