// src/text.rs
//! Text primitives shared by the matchers: normalization, tokenization and a light stemmer.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One user turn. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub raw_text: String,
    pub normalized_text: String,
    pub word_count: usize,
}

impl Utterance {
    pub fn new(raw: &str) -> Self {
        let normalized_text = normalize_text(raw);
        let word_count = tokenize(&normalized_text).len();
        Self {
            raw_text: raw.to_string(),
            normalized_text,
            word_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }
}

/// Normalize text: decode entities, fold quotes, lower-case, drop punctuation, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode (typed input from web clients)
    let decoded = html_escape::decode_html_entities(s);

    // 2) Fold curly quotes so "it’s" and "it's" tokenize alike
    let folded = decoded
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 3) Lower-case, punctuation to spaces
    let lowered: String = folded
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&lowered, " ").trim().to_string()
}

/// Split normalized text into word tokens.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Stem every token of a phrase after normalizing it.
pub fn stem_phrase(phrase: &str) -> Vec<String> {
    let normalized = normalize_text(phrase);
    tokenize(&normalized).into_iter().map(stem).collect()
}

/// Suffix-stripping stemmer good enough to fold plurals and simple verb forms.
/// Stems are match keys, not words: "study" and "studies" both give "studi",
/// "prepare" and "prepared" both give "prepar".
pub fn stem(token: &str) -> String {
    fold_ending(&strip_suffix(token))
}

fn strip_suffix(t: &str) -> String {
    let n = t.chars().count();

    if n > 4 && t.ends_with("ies") {
        return t[..t.len() - 2].to_string();
    }
    if n > 5 && t.ends_with("ing") {
        return undouble(&t[..t.len() - 3]);
    }
    if n > 4 && t.ends_with("ed") && !t.ends_with("eed") {
        return undouble(&t[..t.len() - 2]);
    }
    if n > 4
        && ["sses", "xes", "zes", "ches", "shes", "oes"]
            .iter()
            .any(|suf| t.ends_with(suf))
    {
        return t[..t.len() - 2].to_string();
    }
    if n > 3 && t.ends_with('s') && !t.ends_with("ss") && !t.ends_with("us") && !t.ends_with("is")
    {
        return t[..t.len() - 1].to_string();
    }
    t.to_string()
}

/// Consonant + "y" becomes "i" and a trailing "e" goes, so both sides of a
/// suffix rule land on the same key ("cookie"/"cooki", "bus"/"buse").
fn fold_ending(stem: &str) -> String {
    let mut out = stem.to_string();
    let bytes = out.as_bytes();
    let n = bytes.len();
    if n >= 3 && bytes[n - 1] == b'y' && !is_vowel(bytes[n - 2]) {
        out.truncate(n - 1);
        out.push('i');
    }
    if out.chars().count() > 3 && out.ends_with('e') {
        out.pop();
    }
    out
}

fn is_vowel(b: u8) -> bool {
    matches!(b, b'a' | b'e' | b'i' | b'o' | b'u')
}

/// "runn" -> "run", "stopp" -> "stop"; keeps "fall", "pass".
fn undouble(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n >= 3 {
        let last = bytes[n - 1];
        if last == bytes[n - 2]
            && last.is_ascii_alphabetic()
            && !matches!(last, b'l' | b's' | b'z' | b'a' | b'e' | b'i' | b'o' | b'u')
        {
            return stem[..n - 1].to_string();
        }
    }
    stem.to_string()
}
