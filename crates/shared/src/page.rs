use serde::Serialize;

/// Pagination parameters accepted on every paginated listing endpoint.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(5).clamp(1, 1000),
        }
    }

    pub fn offset(&self) -> i64 {
        ((self.page - 1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn total_pages(&self, total: i64) -> u32 {
        if total <= 0 {
            return 0;
        }
        ((total as u64 + self.per_page as u64 - 1) / self.per_page as u64) as u32
    }
}

/// The `{page, size, totalPages, ...}` block spec.md requires in every
/// paginated response body. The entity-specific total count key
/// (`totalSubmissions`, `totalObjects`, ...) is merged in by the caller,
/// since its name varies per endpoint.
#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub size: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

impl PageMeta {
    pub fn new(request: &PageRequest, total: i64) -> Self {
        PageMeta {
            page: request.page,
            size: request.per_page,
            total_pages: request.total_pages(total),
        }
    }
}

/// Builds the RFC 5988 `Link` header value with `first/prev/next/last` rels.
/// `base` must already contain any non-pagination query parameters and a
/// trailing `?` or `&`.
pub fn link_header(base: &str, request: &PageRequest, total_pages: u32) -> Option<String> {
    if total_pages == 0 {
        return None;
    }
    let mut links = Vec::new();
    links.push(format!("<{base}page=1&per_page={}>; rel=\"first\"", request.per_page));
    if request.page > 1 {
        links.push(format!(
            "<{base}page={}&per_page={}>; rel=\"prev\"",
            request.page - 1,
            request.per_page
        ));
    }
    if request.page < total_pages {
        links.push(format!(
            "<{base}page={}&per_page={}>; rel=\"next\"",
            request.page + 1,
            request.per_page
        ));
    }
    if request.page <= total_pages {
        links.push(format!(
            "<{base}page={}&per_page={}>; rel=\"last\"",
            total_pages, request.per_page
        ));
    }
    Some(links.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_results_have_no_total_pages_and_no_link() {
        let req = PageRequest::new(Some(1), Some(5));
        assert_eq!(req.total_pages(0), 0);
        assert!(link_header("https://x/submissions?", &req, 0).is_none());
    }

    #[test]
    fn page_past_last_has_no_next_or_last_rel() {
        let req = PageRequest::new(Some(4), Some(5));
        let total_pages = req.total_pages(15); // N=3
        let header = link_header("https://x/submissions?", &req, total_pages).unwrap();
        assert!(header.contains("rel=\"first\""));
        assert!(header.contains("rel=\"prev\""));
        assert!(!header.contains("rel=\"next\""));
        assert!(!header.contains("rel=\"last\""));
    }

    #[test]
    fn offset_and_limit_follow_one_indexed_page() {
        let req = PageRequest::new(Some(3), Some(10));
        assert_eq!(req.offset(), 20);
        assert_eq!(req.limit(), 10);
    }
}
