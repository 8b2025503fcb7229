//! Adjacent-page context completion.
//!
//! Page-level splitting cuts sentences at page boundaries, so each finalist
//! gets a short excerpt of its previous and next pages appended.

use std::collections::HashMap;

use super::types::{excerpt, Candidate, EnrichedPassage, Passage};

/// Index over a store snapshot keyed by `(file_name, page_num)`.
///
/// When the snapshot holds several passages for the same key, the first one
/// in snapshot order wins.
pub struct PageIndex<'a> {
    files: HashMap<&'a str, HashMap<u32, &'a str>>,
}

impl<'a> PageIndex<'a> {
    pub fn build(snapshot: &'a [Passage]) -> Self {
        let mut files: HashMap<&'a str, HashMap<u32, &'a str>> = HashMap::new();
        for passage in snapshot {
            files
                .entry(passage.metadata.file_name.as_str())
                .or_default()
                .entry(passage.metadata.page_num)
                .or_insert(passage.text.as_str());
        }
        Self { files }
    }

    pub fn get(&self, file_name: &str, page_num: u32) -> Option<&'a str> {
        self.files
            .get(file_name)
            .and_then(|pages| pages.get(&page_num))
            .copied()
    }
}

pub struct ContextCompleter {
    excerpt_chars: usize,
}

impl ContextCompleter {
    pub fn new(excerpt_chars: usize) -> Self {
        Self { excerpt_chars }
    }

    /// Appends neighbouring-page excerpts to every finalist, preserving order.
    ///
    /// `ranked` must already carry reranker scores. Missing neighbours are
    /// skipped silently.
    pub fn complete(&self, ranked: Vec<Candidate>, snapshot: &[Passage]) -> Vec<EnrichedPassage> {
        let index = PageIndex::build(snapshot);

        ranked
            .into_iter()
            .map(|candidate| {
                let Candidate {
                    mut passage,
                    distance,
                    score,
                } = candidate;
                let page_num = passage.metadata.page_num;

                let mut context_pages = Vec::new();
                for neighbour in [page_num.checked_sub(1), page_num.checked_add(1)]
                    .into_iter()
                    .flatten()
                    .filter(|n| *n >= 1)
                {
                    if let Some(text) = index.get(&passage.metadata.file_name, neighbour) {
                        passage.text.push_str(&self.supplement(neighbour, text));
                        context_pages.push(neighbour);
                    }
                }

                EnrichedPassage {
                    passage,
                    distance,
                    score: score.unwrap_or_default(),
                    context_pages,
                }
            })
            .collect()
    }

    fn supplement(&self, page_num: u32, text: &str) -> String {
        format!(
            "\n\n[Supplementary context (page {})]: {}...",
            page_num,
            excerpt(text, self.excerpt_chars)
        )
    }
}

impl Default for ContextCompleter {
    fn default() -> Self {
        Self::new(200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::page;

    fn finalist(file: &str, page_num: u32, text: &str) -> Candidate {
        let mut candidate = Candidate::new(page(file, page_num, text), 0.2);
        candidate.score = Some(8.0);
        candidate
    }

    #[test]
    fn appends_previous_then_next_page() {
        let snapshot = vec![
            page("a.pdf", 1, "first page"),
            page("a.pdf", 2, "second page"),
            page("a.pdf", 3, "third page"),
        ];
        let completed = ContextCompleter::default().complete(vec![finalist("a.pdf", 2, "second page")], &snapshot);

        assert_eq!(
            completed[0].passage.text,
            "second page\n\n[Supplementary context (page 1)]: first page...\
             \n\n[Supplementary context (page 3)]: third page..."
        );
        assert_eq!(completed[0].context_pages, vec![1, 3]);
        assert_eq!(completed[0].score, 8.0);
    }

    #[test]
    fn first_page_never_looks_for_page_zero() {
        let mut zero = page("a.pdf", 0, "bogus");
        zero.id = "a.pdf_page0".to_string();
        let snapshot = vec![zero, page("a.pdf", 1, "one"), page("a.pdf", 2, "two")];

        let completed = ContextCompleter::default().complete(vec![finalist("a.pdf", 1, "one")], &snapshot);
        assert_eq!(completed[0].context_pages, vec![2]);
        assert!(!completed[0].passage.text.contains("bogus"));
    }

    #[test]
    fn last_page_gets_only_previous_excerpt() {
        let long = "p".repeat(500);
        let snapshot = vec![
            page("a.pdf", 1, "one"),
            page("a.pdf", 2, &long),
            page("a.pdf", 3, "three"),
        ];
        let completed = ContextCompleter::default().complete(vec![finalist("a.pdf", 3, "three")], &snapshot);

        let expected = format!(
            "three\n\n[Supplementary context (page 2)]: {}...",
            "p".repeat(200)
        );
        assert_eq!(completed[0].passage.text, expected);
        assert_eq!(completed[0].context_pages, vec![2]);
    }

    #[test]
    fn neighbours_must_share_the_file() {
        let snapshot = vec![page("other.pdf", 1, "elsewhere"), page("a.pdf", 2, "two")];
        let completed = ContextCompleter::default().complete(vec![finalist("a.pdf", 2, "two")], &snapshot);

        assert_eq!(completed[0].passage.text, "two");
        assert!(completed[0].context_pages.is_empty());
    }

    #[test]
    fn first_match_wins_for_duplicate_pages() {
        let mut shadow = page("a.pdf", 1, "later copy");
        shadow.id = "shadow".to_string();
        let snapshot = vec![page("a.pdf", 1, "original"), shadow];

        let completed = ContextCompleter::default().complete(vec![finalist("a.pdf", 2, "two")], &snapshot);
        assert!(completed[0].passage.text.contains("original..."));
        assert!(!completed[0].passage.text.contains("later copy"));
    }

    #[test]
    fn output_order_follows_ranking() {
        let snapshot = vec![page("a.pdf", 5, "five"), page("b.pdf", 1, "b one")];
        let ranked = vec![finalist("b.pdf", 1, "b one"), finalist("a.pdf", 5, "five")];

        let completed = ContextCompleter::default().complete(ranked, &snapshot);
        let ids: Vec<&str> = completed.iter().map(|p| p.passage.id.as_str()).collect();
        assert_eq!(ids, vec!["b.pdf_page1", "a.pdf_page5"]);
    }

    #[test]
    fn page_index_keys_by_file_and_page() {
        let snapshot = vec![page("a.pdf", 1, "x"), page("a.pdf", 1, "y"), page("a.pdf", 2, "z")];
        let index = PageIndex::build(&snapshot);
        assert_eq!(index.get("a.pdf", 1), Some("x"));
        assert_eq!(index.get("a.pdf", 2), Some("z"));
        assert_eq!(index.get("b.pdf", 1), None);
    }
}
