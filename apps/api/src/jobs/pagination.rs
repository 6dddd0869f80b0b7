//! Page window arithmetic over a cached job list.

use serde::Deserialize;

use crate::errors::AppError;

pub const DEFAULT_PAGE_SIZE: usize = 4;
pub const MAX_PAGE_SIZE: usize = 50;

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PageRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }
}

/// Returns the items of the requested page and whether more follow.
///
/// `start = (page - 1) * page_size`, `end = start + page_size`; a start past
/// the end yields an empty page.
pub fn paginate<T: Clone>(items: &[T], request: PageRequest) -> (Vec<T>, bool) {
    let start = request.page.saturating_sub(1).saturating_mul(request.page_size);
    let end = start.saturating_add(request.page_size);

    let page = if start >= items.len() {
        Vec::new()
    } else {
        items[start..end.min(items.len())].to_vec()
    };
    (page, end < items.len())
}
