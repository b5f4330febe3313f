//! Pagination from `Range` headers and `limit`/`offset` parameters.

/// Offset and limit of a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Page {
    /// Parse `start-end`, `start-` or `items=start-end`. Malformed headers
    /// are ignored.
    pub fn from_range_header(header: &str) -> Option<Self> {
        let header = header.trim();
        let bounds = header.strip_prefix("items=").unwrap_or(header);
        let (start, end) = bounds.split_once('-')?;
        let offset = start.trim().parse::<u64>().ok()?;
        let end = end.trim();
        if end.is_empty() {
            return Some(Self {
                offset,
                limit: None,
            });
        }
        let end = end.parse::<u64>().ok()?;
        // end < start, or a span too wide to count, is malformed.
        let limit = end.checked_sub(offset)?.checked_add(1)?;
        Some(Self {
            offset,
            limit: Some(limit),
        })
    }

    /// Resolve the page for a read. Explicit `limit` and `offset` win over
    /// the `Range` header; `max_rows` caps the result.
    pub fn resolve(
        range: Option<&str>,
        limit: Option<&str>,
        offset: Option<&str>,
        max_rows: Option<u64>,
    ) -> Self {
        let mut page = range.and_then(Self::from_range_header).unwrap_or_default();

        if let Some(limit) = limit.and_then(|l| l.trim().parse::<u64>().ok()) {
            page.limit = Some(limit);
        }
        if let Some(offset) = offset.and_then(|o| o.trim().parse::<u64>().ok()) {
            page.offset = offset;
        }
        if let Some(max) = max_rows {
            page.limit = Some(page.limit.map_or(max, |l| l.min(max)));
        }
        page
    }

    /// ` LIMIT n OFFSET m`, omitting absent parts and a zero offset.
    pub fn sql(&self) -> String {
        let mut sql = String::new();
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
        sql
    }

    /// `Content-Range` value for `rows` returned rows.
    ///
    /// `start-end/total`, `*/total` for an empty page, and `*` as the total
    /// when it is unknown.
    pub fn content_range(&self, rows: u64, total: Option<u64>) -> String {
        let total = total.map_or_else(|| "*".to_string(), |t| t.to_string());
        if rows == 0 {
            format!("*/{}", total)
        } else {
            let last = self.offset.saturating_add(rows - 1);
            format!("{}-{}/{}", self.offset, last, total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_header() {
        assert_eq!(
            Page::from_range_header("0-4"),
            Some(Page {
                offset: 0,
                limit: Some(5)
            })
        );
        assert_eq!(
            Page::from_range_header("items=10-19"),
            Some(Page {
                offset: 10,
                limit: Some(10)
            })
        );
        assert_eq!(
            Page::from_range_header("20-"),
            Some(Page {
                offset: 20,
                limit: None
            })
        );
        assert_eq!(Page::from_range_header("9-3"), None);
        assert_eq!(Page::from_range_header("abc"), None);
    }

    #[test]
    fn test_explicit_params_override_range() {
        let page = Page::resolve(Some("0-4"), Some("5"), None, None);
        assert_eq!(page.limit, Some(5));
        assert_eq!(page.sql(), " LIMIT 5");

        let page = Page::resolve(Some("10-19"), None, Some("30"), None);
        assert_eq!(page.sql(), " LIMIT 10 OFFSET 30");
    }

    #[test]
    fn test_max_rows_caps_limit() {
        assert_eq!(Page::resolve(None, Some("500"), None, Some(100)).limit, Some(100));
        assert_eq!(Page::resolve(None, None, None, Some(100)).limit, Some(100));
        assert_eq!(Page::resolve(None, Some("7"), None, Some(100)).limit, Some(7));
    }

    #[test]
    fn test_invalid_params_ignored() {
        assert_eq!(Page::resolve(None, Some("-1"), Some("x"), None), Page::default());
        assert_eq!(Page::default().sql(), "");
    }

    #[test]
    fn test_content_range() {
        let page = Page {
            offset: 10,
            limit: Some(5),
        };
        assert_eq!(page.content_range(5, Some(42)), "10-14/42");
        assert_eq!(page.content_range(0, Some(0)), "*/0");
        assert_eq!(page.content_range(3, None), "10-12/*");
    }

    #[test]
    fn test_full_width_range_is_ignored() {
        assert_eq!(Page::from_range_header("0-18446744073709551615"), None);
        assert_eq!(
            Page::resolve(Some("0-18446744073709551615"), None, None, None),
            Page::default()
        );
        assert_eq!(
            Page::from_range_header("1-18446744073709551615"),
            Some(Page {
                offset: 1,
                limit: Some(u64::MAX)
            })
        );
    }

    #[test]
    fn test_content_range_at_max_offset() {
        let page = Page::resolve(None, None, Some("18446744073709551615"), None);
        assert_eq!(page.offset, u64::MAX);
        assert_eq!(
            page.content_range(3, Some(1)),
            "18446744073709551615-18446744073709551615/1"
        );
    }
}
