//! Merge rules: which pattern tags may be joined into one phrase.

/// A link between two tags.
///
/// An exact link joins neighbours (`DATE` + `TIME`). A gapped link joins
/// members two apart whose middle member carries a third tag
/// (`WEEKDAY` + `DATE` + `TIME`, linking `WEEKDAY` and `TIME`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRule {
    pub first: String,
    pub second: String,
    pub gapped: bool,
    /// `first` must precede `second`; otherwise either order links.
    pub ordered: bool,
}

impl MergeRule {
    pub fn exact(first: &str, second: &str) -> Self {
        MergeRule { first: first.to_string(), second: second.to_string(), gapped: false, ordered: true }
    }

    pub fn gapped(first: &str, second: &str) -> Self {
        MergeRule { gapped: true, ..Self::exact(first, second) }
    }

    pub fn free(mut self) -> Self {
        self.ordered = false;
        self
    }

    /// True when a member tagged `left` may link to a later member tagged `right`.
    pub fn links(&self, left: &str, right: &str) -> bool {
        (self.first == left && self.second == right) || (!self.ordered && self.first == right && self.second == left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_rules_link_one_way() {
        let rule = MergeRule::exact("DATE", "TIME");
        assert!(rule.links("DATE", "TIME"));
        assert!(!rule.links("TIME", "DATE"));
        assert!(rule.clone().free().links("TIME", "DATE"));
    }
}
