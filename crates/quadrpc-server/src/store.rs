//! Blog persistence.
//!
//! The blog service only talks to a [`BlogStore`]; the store is handed to
//! the service when it is built. [`MemoryBlogStore`] is the bundled
//! implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Blog identifier, rendered as 24 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlogId(u64);

impl BlogId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for BlogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:024x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse blog id '{0}'")]
pub struct ParseBlogIdError(String);

impl FromStr for BlogId {
    type Err = ParseBlogIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 24 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseBlogIdError(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(BlogId)
            .map_err(|_| ParseBlogIdError(s.to_string()))
    }
}

/// Fields a client supplies for a blog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogDraft {
    pub author_id: String,
    pub title: String,
    pub content: String,
}

/// A stored blog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
}

impl Blog {
    pub fn from_draft(id: BlogId, draft: BlogDraft) -> Self {
        Self {
            id: id.to_string(),
            author_id: draft.author_id,
            title: draft.title,
            content: draft.content,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage used by the blog service.
pub trait BlogStore: Send + Sync {
    fn insert(&self, draft: BlogDraft) -> Result<Blog, StoreError>;

    fn get(&self, id: BlogId) -> Result<Option<Blog>, StoreError>;

    /// Replaces the fields of an existing blog. Returns `None` if absent.
    fn update(&self, id: BlogId, draft: BlogDraft) -> Result<Option<Blog>, StoreError>;

    /// Returns whether a blog was removed.
    fn delete(&self, id: BlogId) -> Result<bool, StoreError>;

    /// Every blog, ordered by id.
    fn list(&self) -> Result<Vec<Blog>, StoreError>;
}

/// In-memory [`BlogStore`].
#[derive(Debug, Default)]
pub struct MemoryBlogStore {
    blogs: Mutex<BTreeMap<BlogId, Blog>>,
    next_id: AtomicU64,
}

impl MemoryBlogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blogs(&self) -> MutexGuard<'_, BTreeMap<BlogId, Blog>> {
        self.blogs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlogStore for MemoryBlogStore {
    fn insert(&self, draft: BlogDraft) -> Result<Blog, StoreError> {
        let id = BlogId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let blog = Blog::from_draft(id, draft);
        self.blogs().insert(id, blog.clone());
        Ok(blog)
    }

    fn get(&self, id: BlogId) -> Result<Option<Blog>, StoreError> {
        Ok(self.blogs().get(&id).cloned())
    }

    fn update(&self, id: BlogId, draft: BlogDraft) -> Result<Option<Blog>, StoreError> {
        let mut blogs = self.blogs();
        match blogs.get_mut(&id) {
            Some(blog) => {
                *blog = Blog::from_draft(id, draft);
                Ok(Some(blog.clone()))
            }
            None => Ok(None),
        }
    }

    fn delete(&self, id: BlogId) -> Result<bool, StoreError> {
        Ok(self.blogs().remove(&id).is_some())
    }

    fn list(&self) -> Result<Vec<Blog>, StoreError> {
        Ok(self.blogs().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> BlogDraft {
        BlogDraft {
            author_id: "stephane".to_string(),
            title: title.to_string(),
            content: "content".to_string(),
        }
    }

    #[test]
    fn test_blog_id_round_trips_through_hex() {
        let id = BlogId::new(0x5f3a);
        let text = id.to_string();
        assert_eq!(text, "000000000000000000005f3a");
        assert_eq!(text.parse::<BlogId>(), Ok(id));
    }

    #[test]
    fn test_blog_id_rejects_bad_input() {
        assert!("".parse::<BlogId>().is_err());
        assert!("not-an-id".parse::<BlogId>().is_err());
        assert!("zzzzzzzzzzzzzzzzzzzzzzzz".parse::<BlogId>().is_err());
        // 24 hex digits that do not fit in 64 bits
        assert!("ffffffffffffffffffffffff".parse::<BlogId>().is_err());
    }

    #[test]
    fn test_crud() {
        let store = MemoryBlogStore::new();
        let created = store.insert(draft("first")).unwrap();
        let id: BlogId = created.id.parse().unwrap();

        assert_eq!(store.get(id).unwrap(), Some(created.clone()));

        let updated = store.update(id, draft("second")).unwrap().unwrap();
        assert_eq!(updated.title, "second");
        assert_eq!(updated.id, created.id);

        assert!(store.delete(id).unwrap());
        assert!(!store.delete(id).unwrap());
        assert_eq!(store.get(id).unwrap(), None);
        assert_eq!(store.update(id, draft("third")).unwrap(), None);
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let store = MemoryBlogStore::new();
        store.insert(draft("a")).unwrap();
        store.insert(draft("b")).unwrap();
        let titles: Vec<_> = store.list().unwrap().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }
}
