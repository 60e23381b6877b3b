use crate::error::CoreError;
use crate::types::PostRecord;
use async_trait::async_trait;

/// Result ordering requested from the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchOrder {
    /// Newest first.
    #[default]
    PublishDate,
    TotalRank,
    Click,
    Favorites,
}

impl SearchOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SearchOrder::PublishDate => "pubdate",
            SearchOrder::TotalRank => "totalrank",
            SearchOrder::Click => "click",
            SearchOrder::Favorites => "stow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub order: SearchOrder,
    pub page: u32,
    pub page_size: u32,
    /// Duration bucket filter, 0 = any length.
    pub duration: u32,
    /// Category (partition) filter, 0 = all.
    pub tids: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            order: SearchOrder::PublishDate,
            page: 1,
            page_size: 20,
            duration: 0,
            tids: 0,
        }
    }
}

/// Anything that can turn a keyword into freshly observed posts.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn search(
        &self,
        keyword: &str,
        options: &SearchOptions,
    ) -> Result<Vec<PostRecord>, CoreError>;
}
