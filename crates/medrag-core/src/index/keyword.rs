//! Lexical BM25 scoring over document text
//!
//! Used when the query cannot be encoded; scores are squashed into [0, 1)
//! so they can stand in for raw similarity during re-ranking.

use std::collections::HashMap;

const K1: f64 = 1.2;
const B: f64 = 0.75;

/// Common English stop words dropped from both documents and queries
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "he", "in",
    "is", "it", "its", "of", "on", "or", "that", "the", "to", "was", "will", "with", "does", "do",
    "did", "can", "could", "should", "would", "what", "where", "when", "why", "how", "who",
    "which", "this", "these", "those", "there", "here", "my", "i", "me", "not", "no",
];

/// Lowercase alphanumeric tokens minus stop words
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Inverted index of term frequencies per record position
#[derive(Default)]
pub struct KeywordIndex {
    postings: HashMap<String, Vec<(usize, u32)>>,
    doc_lengths: Vec<u32>,
    avg_len: f64,
}

impl KeywordIndex {
    pub fn build<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut doc_lengths = Vec::new();

        for (pos, text) in texts.into_iter().enumerate() {
            let tokens = tokenize(text);
            doc_lengths.push(tokens.len() as u32);

            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for (term, count) in tf {
                postings.entry(term).or_default().push((pos, count));
            }
        }

        let total: u64 = doc_lengths.iter().map(|&l| l as u64).sum();
        let avg_len = if doc_lengths.is_empty() {
            0.0
        } else {
            total as f64 / doc_lengths.len() as f64
        };

        Self {
            postings,
            doc_lengths,
            avg_len,
        }
    }

    /// Score every record sharing a term with `query`.
    /// Returns `(position, score)` pairs in unspecified order.
    pub fn score(&self, query: &str) -> Vec<(usize, f32)> {
        let n = self.doc_lengths.len() as f64;
        if n == 0.0 {
            return Vec::new();
        }

        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();

        let mut scores: HashMap<usize, f64> = HashMap::new();
        for term in &terms {
            let Some(list) = self.postings.get(term) else {
                continue;
            };
            let df = list.len() as f64;
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
            for &(pos, tf) in list {
                let tf = tf as f64;
                let len = self.doc_lengths[pos] as f64;
                let norm = if self.avg_len > 0.0 {
                    1.0 - B + B * len / self.avg_len
                } else {
                    1.0
                };
                *scores.entry(pos).or_insert(0.0) += idf * tf * (K1 + 1.0) / (tf + K1 * norm);
            }
        }

        scores
            .into_iter()
            .map(|(pos, s)| (pos, (s / (1.0 + s)) as f32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words() {
        assert_eq!(
            tokenize("What is the dose of Metformin?"),
            vec!["dose".to_string(), "metformin".to_string()]
        );
    }

    #[test]
    fn test_matching_document_scores_higher() {
        let index = KeywordIndex::build(vec![
            "metformin lowers blood glucose in type 2 diabetes",
            "warfarin requires INR monitoring",
            "metformin metformin dosing",
        ]);
        let mut scores = index.score("metformin dosing");
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        assert_eq!(scores[0].0, 2);
        assert!(scores.iter().all(|(pos, s)| *pos != 1 && *s > 0.0 && *s < 1.0));
    }

    #[test]
    fn test_empty_index_and_unknown_terms() {
        assert!(KeywordIndex::default().score("fever").is_empty());
        let index = KeywordIndex::build(vec!["asthma inhaler"]);
        assert!(index.score("zzz").is_empty());
    }
}
