//! `Prefer` header directives.

/// Conflict handling for inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// `resolution=merge-duplicates`: upsert.
    MergeDuplicates,
    /// `resolution=ignore-duplicates`: skip conflicting rows.
    IgnoreDuplicates,
}

/// What a write should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnPreference {
    Minimal,
    Representation,
}

/// Parsed `Prefer` header. Unknown directives are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Prefer {
    pub count_exact: bool,
    pub resolution: Option<Resolution>,
    pub returning: Option<ReturnPreference>,
}

impl Prefer {
    pub fn parse(header: &str) -> Self {
        let mut prefer = Self::default();
        prefer.merge(header);
        prefer
    }

    /// Fold one header value (comma-separated directives) into `self`.
    pub fn merge(&mut self, header: &str) {
        for directive in header.split(',').map(str::trim) {
            match directive {
                "count=exact" => self.count_exact = true,
                "resolution=merge-duplicates" => {
                    self.resolution = Some(Resolution::MergeDuplicates)
                }
                "resolution=ignore-duplicates" => {
                    self.resolution = Some(Resolution::IgnoreDuplicates)
                }
                "return=minimal" => self.returning = Some(ReturnPreference::Minimal),
                "return=representation" => {
                    self.returning = Some(ReturnPreference::Representation)
                }
                _ => {}
            }
        }
    }

    pub fn wants_minimal(&self) -> bool {
        self.returning == Some(ReturnPreference::Minimal)
    }

    pub fn wants_representation(&self) -> bool {
        self.returning == Some(ReturnPreference::Representation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multiple_directives() {
        let prefer = Prefer::parse("resolution=merge-duplicates, return=representation,count=exact");
        assert!(prefer.count_exact);
        assert_eq!(prefer.resolution, Some(Resolution::MergeDuplicates));
        assert!(prefer.wants_representation());
        assert!(!prefer.wants_minimal());
    }

    #[test]
    fn test_unknown_directives_ignored() {
        assert_eq!(Prefer::parse("tx=rollback, count=planned"), Prefer::default());
    }
}
