//! Search behind the brand / location comboboxes.
//!
//! Matching is case-insensitive and ignores Serbian Latin diacritics, so
//! "cesar" finds "Česar". Results are capped so a one-letter query never
//! floods the dropdown.

use serde::Serialize;

pub const DEFAULT_RESULT_CAP: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComboOption {
    pub value: String,
    pub label: String,
}

impl ComboOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        ComboOption {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Lowercase and strip Serbian Latin diacritics (đ becomes "dj")
pub fn fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.trim().chars().flat_map(char::to_lowercase) {
        match ch {
            'č' | 'ć' => out.push('c'),
            'š' => out.push('s'),
            'ž' => out.push('z'),
            'đ' => out.push_str("dj"),
            c => out.push(c),
        }
    }
    out
}

/// Options matching `query`, prefix matches first, original order kept
/// within each group, at most `cap` results. An empty query returns the
/// first `cap` options.
pub fn search<'a>(options: &'a [ComboOption], query: &str, cap: usize) -> Vec<&'a ComboOption> {
    let q = fold(query);
    if q.is_empty() {
        return options.iter().take(cap).collect();
    }

    let mut prefix = Vec::new();
    let mut inner = Vec::new();
    for opt in options {
        let label = fold(&opt.label);
        if label.starts_with(&q) {
            prefix.push(opt);
        } else if label.contains(&q) {
            inner.push(opt);
        }
    }
    prefix.into_iter().chain(inner).take(cap).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(labels: &[&str]) -> Vec<ComboOption> {
        labels
            .iter()
            .map(|l| ComboOption::new(l.to_lowercase(), *l))
            .collect()
    }

    #[test]
    fn fold_strips_diacritics() {
        assert_eq!(fold("  Čačak "), "cacak");
        assert_eq!(fold("Đurđevo"), "djurdjevo");
        assert_eq!(fold("ŠABAC"), "sabac");
        assert_eq!(fold("Žabalj"), "zabalj");
    }

    #[test]
    fn prefix_matches_rank_first() {
        let o = opts(&["Adidas", "Mango", "Nike", "Manga Store", "Diadora"]);
        let hits: Vec<&str> = search(&o, "ad", 10).iter().map(|o| o.label.as_str()).collect();
        assert_eq!(hits, vec!["Adidas", "Diadora"]);
        let hits: Vec<&str> = search(&o, "man", 10).iter().map(|o| o.label.as_str()).collect();
        assert_eq!(hits, vec!["Mango", "Manga Store"]);
    }

    #[test]
    fn diacritic_insensitive_both_ways() {
        let o = opts(&["Niš", "Čačak", "Beograd"]);
        assert_eq!(search(&o, "nis", 5)[0].label, "Niš");
        assert_eq!(search(&o, "ČAČ", 5)[0].label, "Čačak");
    }

    #[test]
    fn results_are_capped() {
        let labels: Vec<String> = (0..30).map(|i| format!("Brend {i}")).collect();
        let o: Vec<ComboOption> = labels.iter().map(|l| ComboOption::new(l, l)).collect();
        assert_eq!(search(&o, "brend", DEFAULT_RESULT_CAP).len(), DEFAULT_RESULT_CAP);
        assert_eq!(search(&o, "", 3).len(), 3);
        assert_eq!(search(&o, "brend 2", 50).len(), 11);
        assert!(search(&o, "zzz", 5).is_empty());
    }
}
