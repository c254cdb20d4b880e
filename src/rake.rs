//! Rapid Automatic Keyword Extraction over consultation descriptions.
//!
//! Candidate phrases are the runs of words between stop words. Each word is
//! scored `frequency + degree` over all candidates of the text, and a phrase
//! scores the sum of its words.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Most phrases kept from a single text.
pub const MAX_PHRASES_PER_TEXT: usize = 20;

const MIN_PHRASE_CHARS: usize = 3;

pub const STOP_WORDS: &[&str] = &[
    // Indonesian
    "yang", "untuk", "dengan", "dari", "dalam", "pada", "adalah", "ini", "itu", "dan",
    "atau", "akan", "telah", "sudah", "belum", "juga", "karena", "sebagai", "oleh", "tidak",
    "bisa", "dapat", "ada", "kami", "kita", "saya", "anda", "mereka", "kamu", "dia",
    "agar", "supaya", "bagaimana", "apa", "apakah", "siapa", "mana", "kapan", "mengapa",
    "kenapa", "lebih", "sangat", "masih", "hanya", "saja", "serta", "tersebut", "terhadap",
    "tentang", "seperti", "jika", "kalau", "maka", "namun", "tetapi", "tapi", "bahwa",
    "hal", "para", "setiap", "semua", "suatu", "sebuah", "satu", "lain", "lainnya",
    "antara", "hingga", "sampai", "sejak", "pun", "lah", "kah", "nya", "mohon", "terima",
    "kasih", "ingin", "perlu", "harus", "mau", "sedang", "bagi", "demi", "yaitu", "yakni",
    "ialah", "merupakan", "melalui", "secara", "sehingga", "sedangkan", "kemudian", "lalu",
    "setelah", "sebelum", "saat", "ketika", "selama", "tanpa", "kepada", "daripada",
    "begitu", "bahkan", "bapak", "ibu", "sebagaimana", "terkait", "mengenai", "banyak",
    "beberapa", "sendiri", "tiap", "sini", "sana", "situ", "dimana", "berapa", "apabila",
    "walaupun", "meskipun", "misalnya", "membutuhkan", "memerlukan", "diperlukan", "butuh",
    "baik", "yg", "dgn", "utk", "tsb",
    // English
    "the", "and", "for", "with", "from", "that", "this", "these", "those", "are", "was",
    "were", "been", "being", "have", "has", "had", "will", "would", "can", "could",
    "should", "shall", "may", "might", "must", "not", "but", "about", "into", "onto",
    "over", "under", "then", "than", "there", "their", "they", "them", "what", "which",
    "who", "whom", "when", "where", "why", "how", "all", "any", "both", "each", "few",
    "more", "most", "other", "some", "such", "only", "own", "same", "very", "just", "also",
    "our", "ours", "your", "yours", "his", "her", "its", "you", "she", "him", "because",
    "while", "during", "before", "after", "above", "below", "between", "through", "again",
    "further", "once", "here", "does", "did", "doing", "off", "out", "too", "nor", "yet",
    "per",
];

static STOP_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.iter().copied().collect());
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("valid regex"));
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s]").expect("valid regex"));
static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("text has {chars} characters, limit is {limit}")]
    TooLong { chars: usize, limit: usize },
}

/// Words of two characters or fewer always separate phrases.
pub fn is_stop_word(token: &str) -> bool {
    token.chars().count() <= 2 || STOP_SET.contains(token)
}

/// Returns the stop-word-delimited phrases of `text` in reading order.
pub fn candidate_phrases(text: &str) -> Vec<String> {
    let mut phrases = Vec::new();

    for sentence in SENTENCE_BREAK.split(text) {
        if sentence.trim().is_empty() {
            continue;
        }
        let lowered = sentence.to_lowercase();
        let cleaned = NON_WORD.replace_all(&lowered, " ");
        let mut current: Vec<&str> = Vec::new();

        for token in cleaned.split_whitespace() {
            if is_stop_word(token) {
                if !current.is_empty() {
                    phrases.push(current.join(" "));
                    current.clear();
                }
            } else {
                current.push(token);
            }
        }
        if !current.is_empty() {
            phrases.push(current.join(" "));
        }
    }

    phrases
}

fn word_scores(phrases: &[String]) -> HashMap<&str, usize> {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    let mut degree: HashMap<&str, usize> = HashMap::new();

    for phrase in phrases {
        let words: Vec<&str> = phrase.split(' ').collect();
        let co_occurring = words.len() - 1;
        for word in words {
            *frequency.entry(word).or_default() += 1;
            *degree.entry(word).or_default() += co_occurring;
        }
    }

    frequency
        .into_iter()
        .map(|(word, freq)| (word, freq + degree.get(word).copied().unwrap_or(0)))
        .collect()
}

fn is_keyword_shaped(phrase: &str) -> bool {
    phrase.chars().count() >= MIN_PHRASE_CHARS && !NUMERIC.is_match(phrase)
}

/// Ranks the candidate phrases of `text`, best first, at most
/// [`MAX_PHRASES_PER_TEXT`] of them. Repeated phrases are reported once.
pub fn extract_keywords(text: &str) -> Vec<String> {
    rank_phrases(text, true)
}

/// Ranks the candidate phrases of `text`. With `distinct` unset, a phrase
/// repeated in the text keeps one entry per occurrence, and the repeats
/// count against [`MAX_PHRASES_PER_TEXT`].
pub fn rank_phrases(text: &str, distinct: bool) -> Vec<String> {
    let phrases = candidate_phrases(text);
    let scores = word_scores(&phrases);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut ranked: Vec<(&str, usize)> = phrases
        .iter()
        .map(String::as_str)
        .filter(|phrase| !distinct || seen.insert(*phrase))
        .filter(|phrase| is_keyword_shaped(phrase))
        .map(|phrase| {
            let score = phrase
                .split(' ')
                .map(|word| scores.get(word).copied().unwrap_or(0))
                .sum::<usize>();
            (phrase, score)
        })
        .collect();

    // stable: ties keep reading order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .take(MAX_PHRASES_PER_TEXT)
        .map(|(phrase, _)| phrase.to_string())
        .filter(|phrase| phrase.chars().count() >= MIN_PHRASE_CHARS)
        .collect()
}

/// [`rank_phrases`] with an input-size guard; oversized text is treated
/// as malformed and rejected.
pub fn try_extract_keywords(
    text: &str,
    max_chars: usize,
    distinct: bool,
) -> Result<Vec<String>, ExtractError> {
    let chars = text.chars().count();
    if chars > max_chars {
        return Err(ExtractError::TooLong {
            chars,
            limit: max_chars,
        });
    }
    Ok(rank_phrases(text, distinct))
}
