//! In-memory retrieval over one page: overlapping chunks, term-overlap
//! scoring, and extractive answers built from the best sentences.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use crate::page::PageDocument;

pub const NOT_FOUND_ANSWER: &str = "I couldn't find that in the provided content.";
const MAX_ANSWER_SENTENCES: usize = 3;
const MIN_TERM_LEN: usize = 2;

const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by", "can", "did",
    "do", "does", "for", "from", "had", "has", "have", "he", "her", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "me", "my", "of", "on", "or", "page", "please", "she", "so",
    "tell", "that", "the", "their", "them", "there", "these", "they", "this", "those", "to",
    "was", "we", "were", "what", "when", "where", "which", "who", "whom", "why", "will", "with",
    "would", "you", "your",
];

#[derive(Debug, Clone)]
pub struct Chunk {
    pub position: usize,
    pub text: String,
    term_counts: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct PageIndex {
    pub url: String,
    pub title: Option<String>,
    chunks: Vec<Chunk>,
    document_frequency: HashMap<String, usize>,
}

impl PageIndex {
    /// `None` when the document has no text to index.
    pub fn build(document: &PageDocument, chunk_size: usize, chunk_overlap: usize) -> Option<Self> {
        if document.text.trim().is_empty() {
            return None;
        }
        // Headings and list items carry no punctuation; terminate every line
        // so each one stays a separate sentence after chunking.
        let source = document
            .title
            .as_deref()
            .into_iter()
            .chain(document.text.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                if line.ends_with(|c: char| matches!(c, '.' | '!' | '?')) {
                    line.to_string()
                } else {
                    format!("{line}.")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        let chunks: Vec<Chunk> = split_chunks(&source, chunk_size, chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(position, text)| {
                let mut term_counts = HashMap::new();
                for term in terms(&text) {
                    *term_counts.entry(term).or_insert(0) += 1;
                }
                Chunk {
                    position,
                    text,
                    term_counts,
                }
            })
            .collect();

        let mut document_frequency = HashMap::new();
        for chunk in &chunks {
            for term in chunk.term_counts.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        Some(Self {
            url: document.url.clone(),
            title: document.title.clone(),
            chunks,
            document_frequency,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The `k` best-scoring chunks for the given query terms, best first.
    pub fn retrieve(&self, query: &HashSet<String>, k: usize) -> Vec<&Chunk> {
        let mut scored: Vec<(f64, &Chunk)> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let score: f64 = query
                    .iter()
                    .filter_map(|term| {
                        let tf = *chunk.term_counts.get(term)? as f64;
                        Some(tf * self.idf(term))
                    })
                    .sum();
                (score > 0.0).then_some((score, chunk))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.position.cmp(&b.1.position))
        });
        scored.into_iter().take(k).map(|(_, chunk)| chunk).collect()
    }

    fn idf(&self, term: &str) -> f64 {
        let total = self.chunks.len() as f64;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f64;
        ((total + 1.0) / (df + 1.0)).ln() + 1.0
    }

    /// Answers from the page alone. A follow-up that matches nothing is
    /// retried with the previous question's terms folded in.
    pub fn answer(&self, question: &str, previous_question: Option<&str>, k: usize) -> String {
        let mut query = query_terms(question);
        let mut context = self.retrieve(&query, k);

        if context.is_empty() {
            if let Some(previous) = previous_question {
                query.extend(query_terms(previous));
                context = self.retrieve(&query, k);
            }
        }
        if context.is_empty() {
            return NOT_FOUND_ANSWER.to_string();
        }

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut seen = HashSet::new();
        for (rank, chunk) in context.iter().enumerate() {
            for (offset, sentence) in sentences(&chunk.text).into_iter().enumerate() {
                let matched: HashSet<String> = terms(&sentence)
                    .into_iter()
                    .filter(|t| query.contains(t))
                    .collect();
                if matched.is_empty() || !seen.insert(sentence.clone()) {
                    continue;
                }
                candidates.push(Candidate {
                    score: matched.iter().map(|t| self.idf(t)).sum(),
                    rank,
                    offset,
                    sentence,
                });
            }
        }
        if candidates.is_empty() {
            return NOT_FOUND_ANSWER.to_string();
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.reading_order(b))
        });
        candidates.truncate(MAX_ANSWER_SENTENCES);
        candidates.sort_by(Candidate::reading_order);
        candidates
            .into_iter()
            .map(|candidate| candidate.sentence)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

struct Candidate {
    score: f64,
    rank: usize,
    offset: usize,
    sentence: String,
}

impl Candidate {
    fn reading_order(&self, other: &Self) -> Ordering {
        self.rank.cmp(&other.rank).then(self.offset.cmp(&other.offset))
    }
}

pub fn query_terms(text: &str) -> HashSet<String> {
    terms(text).into_iter().collect()
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= MIN_TERM_LEN)
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

/// Splits on whitespace boundaries into chunks of at most `chunk_size`
/// characters, each starting up to `overlap` characters before the
/// previous one ended. A single word longer than `chunk_size` is kept whole.
pub fn split_chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let mut end = start;
        let mut len = 0;
        while end < words.len() {
            let add = words[end].chars().count() + usize::from(end > start);
            if end > start && len + add > chunk_size {
                break;
            }
            len += add;
            end += 1;
        }
        chunks.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }

        let mut next = end;
        let mut carried = 0;
        while next > start + 1 {
            let add = words[next - 1].chars().count() + 1;
            if carried + add > overlap {
                break;
            }
            carried += add;
            next -= 1;
        }
        start = next;
    }
    chunks
}

fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                out.push(sentence.to_string());
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        out.push(tail.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> PageDocument {
        PageDocument {
            url: "https://example.com/tesla".to_string(),
            title: Some("Nikola Tesla".to_string()),
            text: text.to_string(),
        }
    }

    const BIO: &str = "Nikola Tesla was a Serbian-American inventor. \
        He was born on 10 July 1856 in Smiljan. \
        Tesla is best known for the alternating current electricity supply system. \
        He moved to New York City in 1884.";

    #[test]
    fn chunks_respect_size_and_overlap() {
        let text = (0..100).map(|i| format!("w{i:02}")).collect::<Vec<_>>().join(" ");
        let chunks = split_chunks(&text, 40, 8);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
        assert!(chunks[0].starts_with("w00"));
        assert!(chunks.last().expect("last").ends_with("w99"));

        let first: Vec<&str> = chunks[0].split(' ').collect();
        let second: Vec<&str> = chunks[1].split(' ').collect();
        assert_eq!(first[first.len() - 2..], second[..2]);
    }

    #[test]
    fn oversized_word_forms_its_own_chunk() {
        let chunks = split_chunks("tiny enormousword tiny", 5, 0);
        assert_eq!(chunks, vec!["tiny", "enormousword", "tiny"]);
    }

    #[test]
    fn empty_document_is_not_indexed() {
        assert!(PageIndex::build(&doc("   "), 100, 10).is_none());
    }

    #[test]
    fn answers_from_matching_sentences() {
        let index = PageIndex::build(&doc(BIO), 5000, 200).expect("index");
        let answer = index.answer("When was Tesla born?", None, 8);
        assert!(answer.contains("born on 10 July 1856"), "answer: {answer}");
    }

    #[test]
    fn unknown_topic_yields_not_found() {
        let index = PageIndex::build(&doc(BIO), 5000, 200).expect("index");
        assert_eq!(index.answer("quantum chromodynamics?", None, 8), NOT_FOUND_ANSWER);
    }

    #[test]
    fn follow_up_uses_previous_question() {
        let index = PageIndex::build(&doc(BIO), 5000, 200).expect("index");
        assert_eq!(index.answer("And why?", None, 8), NOT_FOUND_ANSWER);
        let answer = index.answer("And why?", Some("Where did he move in 1884?"), 8);
        assert_eq!(answer, "He moved to New York City in 1884.");
    }

    #[test]
    fn retrieval_ranks_denser_chunks_first() {
        let text = "apples are red. bananas are yellow. \
                    bananas bananas bananas grow in bunches.";
        let index = PageIndex::build(&doc(text), 40, 0).expect("index");
        let hits = index.retrieve(&query_terms("bananas"), 8);
        assert!(!hits.is_empty());
        assert!(hits[0].text.contains("bananas bananas"));
    }

    #[test]
    fn sentence_split_keeps_decimals() {
        assert_eq!(
            sentences("Version 2.5 shipped. Next!"),
            vec!["Version 2.5 shipped.", "Next!"]
        );
    }
}
