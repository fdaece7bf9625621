use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// One comparison request: the two revisions to compare plus the statistic
/// and benchmark tab selectors understood by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareQuery {
    pub start: String,
    pub end: String,
    pub stat: String,
    pub tab: String,
}

impl CompareQuery {
    pub fn new(
        start: impl Into<String>,
        end: impl Into<String>,
        stat: impl Into<String>,
        tab: impl Into<String>,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            stat: stat.into(),
            tab: tab.into(),
        }
    }

    /// Attach the four query parameters to the dashboard base URL, in the
    /// order the dashboard expects: `start`, `end`, `stat`, `tab`.
    ///
    /// Any query already present on the base is replaced so each key appears
    /// exactly once. Parameter values are taken as-is; encoding is whatever
    /// the url crate requires.
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("start", &self.start)
            .append_pair("end", &self.end)
            .append_pair("stat", &self.stat)
            .append_pair("tab", &self.tab);
        url
    }
}

impl fmt::Display for CompareQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{} (stat {}, tab {})",
            self.start, self.end, self.stat, self.tab
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://perf.rust-lang.org/compare.html").unwrap()
    }

    #[test]
    fn parameters_appear_once_in_fixed_order() {
        let query = CompareQuery::new("aaa111", "bbb222", "instructions:u", "compile");
        let url = query.to_url(&base());

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("start".into(), "aaa111".into()),
                ("end".into(), "bbb222".into()),
                ("stat".into(), "instructions:u".into()),
                ("tab".into(), "compile".into()),
            ]
        );
    }

    #[test]
    fn no_trailing_separator() {
        let query = CompareQuery::new("a", "b", "c", "d");
        let url = query.to_url(&base());
        assert!(!url.as_str().ends_with('&'));
        assert!(url.as_str().ends_with("tab=d"));
    }

    #[test]
    fn existing_base_query_is_replaced() {
        let noisy = Url::parse("http://localhost:2346/compare.html?stale=1").unwrap();
        let query = CompareQuery::new("a", "b", "c", "d");
        let url = query.to_url(&noisy);
        assert_eq!(url.query_pairs().count(), 4);
        assert!(!url.as_str().contains("stale"));
    }

    #[test]
    fn arbitrary_values_survive_encoding() {
        let query = CompareQuery::new("a b&c", "e=f", "wall time", "artifact size");
        let url = query.to_url(&base());
        let decoded: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(decoded[0].1, "a b&c");
        assert_eq!(decoded[1].1, "e=f");
        assert_eq!(decoded[2].1, "wall time");
        assert_eq!(decoded[3].1, "artifact size");
    }

    #[test]
    fn display_names_both_revisions() {
        let query = CompareQuery::new("aaa", "bbb", "cycles:u", "runtime");
        assert_eq!(query.to_string(), "aaa..bbb (stat cycles:u, tab runtime)");
    }
}
