//! # Review sentiment
//! Valence-lexicon polarity scoring for place reviews, averaged per category.
//!
//! Each word in the lexicon carries a valence in [-4, 4]. A text's valences are
//! adjusted by the nearby context (boosters, negation, ALL-CAPS emphasis, a
//! contrastive "but") and punctuation emphasis, summed, then squashed into
//! [-1, 1] as the compound score.
//!
//! The lexicon is an ordinary value: build it once (`Lexicon::builtin()` or
//! `Lexicon::from_path`) and hand the analyzer to whoever needs it.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;
use crate::places::PlaceRecord;

/// Compound score at or above this is "positive"; at or below the negation is "negative".
pub const LABEL_THRESHOLD: f64 = 0.05;

const BOOST_INCR: f64 = 0.293;
const BOOST_DECR: f64 = -0.293;
const CAPS_INCR: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAIM_STEP: f64 = 0.292;
const QUESTION_STEP: f64 = 0.18;
const QUESTION_CAP: f64 = 0.96;
/// Squashing constant for the compound score.
const ALPHA: f64 = 15.0;
const MAX_REVIEW_CHARS: usize = 5000;

/* ----------------------------
Lexicon
---------------------------- */

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    words: HashMap<String, f64>,
}

impl Lexicon {
    /// The lexicon compiled into the crate.
    pub fn builtin() -> Result<Self, PipelineError> {
        let raw = include_str!("../sentiment_lexicon.json");
        Self::from_json(raw)
    }

    /// JSON object of `word -> valence`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| PipelineError::Lexicon(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        let map: HashMap<String, f64> =
            serde_json::from_str(raw).map_err(|e| PipelineError::Lexicon(e.to_string()))?;
        Ok(Self::from_map(map))
    }

    pub fn from_map(map: HashMap<String, f64>) -> Self {
        let words = map
            .into_iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(k, v)| (k.trim().to_lowercase(), v.clamp(-4.0, 4.0)))
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn valence(&self, word: &str) -> Option<f64> {
        self.words.get(word).copied()
    }
}

/* ----------------------------
Analyzer
---------------------------- */

#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    lexicon: Lexicon,
}

/// Word as written plus its lower-case lookup key.
struct Token<'a> {
    raw: &'a str,
    key: String,
}

impl SentimentAnalyzer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn builtin() -> Result<Self, PipelineError> {
        Ok(Self::new(Lexicon::builtin()?))
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Lexicon valence for a lower-case word (0 when unknown).
    #[inline]
    fn word_score(&self, w: &str) -> f64 {
        self.lexicon.valence(w).unwrap_or(0.0)
    }

    /// Compound polarity in [-1, 1].
    pub fn score_text(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return 0.0;
        }

        let caps_count = tokens.iter().filter(|t| is_all_caps(t.raw)).count();
        let caps_differential = caps_count > 0 && caps_count < tokens.len();

        let mut valences = Vec::with_capacity(tokens.len());
        for i in 0..tokens.len() {
            let tok = &tokens[i];
            // boosters only modify their neighbours
            if booster(&tok.key).is_some() {
                valences.push(0.0);
                continue;
            }
            let base = self.word_score(&tok.key);
            if base == 0.0 {
                valences.push(0.0);
                continue;
            }

            let mut v = base;
            if caps_differential && is_all_caps(tok.raw) {
                v += CAPS_INCR * base.signum();
            }

            // Look back up to three tokens: boosters decay with distance, each
            // negator flips and dampens.
            for k in 1..=3 {
                if i < k {
                    break;
                }
                let prev = &tokens[i - k];
                if self.lexicon.valence(&prev.key).is_none() {
                    if let Some(mut s) = booster(&prev.key) {
                        if base < 0.0 {
                            s = -s;
                        }
                        if caps_differential && is_all_caps(prev.raw) {
                            s += CAPS_INCR * base.signum();
                        }
                        s *= match k {
                            1 => 1.0,
                            2 => 0.95,
                            _ => 0.9,
                        };
                        v += s;
                    }
                }
                if is_negator(&prev.key) {
                    v *= NEGATION_SCALAR;
                }
            }
            valences.push(v);
        }

        // Contrast: "but" shifts weight onto the clause that follows it.
        if let Some(pivot) = tokens.iter().position(|t| t.key == "but") {
            for (i, v) in valences.iter_mut().enumerate() {
                if i < pivot {
                    *v *= 0.5;
                } else if i > pivot {
                    *v *= 1.5;
                }
            }
        }

        let sum: f64 = valences.iter().sum();
        if sum == 0.0 {
            return 0.0;
        }
        let emphasis = punctuation_emphasis(text);
        let total = if sum > 0.0 { sum + emphasis } else { sum - emphasis };
        compound(total)
    }

    /// Average compound score and label per primary type.
    pub fn score_places(&self, places: &[PlaceRecord]) -> SentimentResult {
        let mut groups: BTreeMap<&str, Vec<&PlaceRecord>> = BTreeMap::new();
        for p in places {
            groups.entry(p.category()).or_default().push(p);
        }

        groups
            .into_iter()
            .map(|(category, members)| {
                let scores: Vec<f64> = members
                    .iter()
                    .flat_map(|p| p.reviews.iter())
                    .filter_map(|r| r.body())
                    .map(normalize_review_text)
                    .filter(|t| !t.is_empty())
                    .map(|t| self.score_text(&t))
                    .collect();

                let score = if scores.is_empty() {
                    0.0
                } else {
                    scores.iter().sum::<f64>() / scores.len() as f64
                };
                debug!(category, reviews = scores.len(), score, "category sentiment");
                (category.to_string(), CategorySentiment::from_score(score))
            })
            .collect()
    }
}

/* ----------------------------
Results
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if score <= -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategorySentiment {
    pub sentiment: SentimentLabel,
    pub sentiment_score: f64,
}

impl CategorySentiment {
    pub fn from_score(score: f64) -> Self {
        Self {
            sentiment: SentimentLabel::from_score(score),
            sentiment_score: score,
        }
    }

    pub fn neutral() -> Self {
        Self::from_score(0.0)
    }
}

pub type SentimentResult = BTreeMap<String, CategorySentiment>;

/* ----------------------------
Text helpers
---------------------------- */

/// Decode entities, drop markup, fold typographic quotes and whitespace.
pub fn normalize_review_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_REVIEW_CHARS {
        out = out.chars().take(MAX_REVIEW_CHARS).collect();
    }
    out
}

/// Whitespace tokens with edge punctuation stripped; single characters are dropped.
fn tokenize(s: &str) -> Vec<Token<'_>> {
    s.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 1)
        .map(|w| Token {
            raw: w,
            key: w.to_lowercase(),
        })
        .collect()
}

fn is_all_caps(w: &str) -> bool {
    w.chars().any(char::is_alphabetic) && !w.chars().any(char::is_lowercase)
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "none"
            | "nothing"
            | "nowhere"
            | "neither"
            | "nor"
            | "nope"
            | "cannot"
            | "without"
            | "rarely"
            | "seldom"
            | "despite"
            | "dont"
            | "isnt"
            | "wasnt"
            | "arent"
            | "werent"
            | "didnt"
            | "doesnt"
            | "wont"
            | "cant"
            | "couldnt"
            | "shouldnt"
            | "wouldnt"
            | "aint"
    ) || tok.ends_with("n't")
}

/// Intensity shift carried by a booster word, if it is one.
fn booster(tok: &str) -> Option<f64> {
    match tok {
        "absolutely" | "amazingly" | "awfully" | "completely" | "considerably"
        | "decidedly" | "deeply" | "enormously" | "entirely" | "especially"
        | "exceptionally" | "extremely" | "fabulously" | "fully" | "greatly" | "highly"
        | "hugely" | "incredibly" | "intensely" | "particularly" | "purely" | "quite"
        | "really" | "remarkably" | "so" | "substantially" | "super" | "thoroughly"
        | "totally" | "tremendously" | "truly" | "unbelievably" | "unusually" | "utterly"
        | "very" | "most" | "more" => Some(BOOST_INCR),
        "almost" | "barely" | "hardly" | "kinda" | "less" | "little" | "marginally"
        | "occasionally" | "partly" | "scarcely" | "slightly" | "somewhat" | "sorta" => {
            Some(BOOST_DECR)
        }
        _ => None,
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclaims = text.matches('!').count().min(4) as f64;
    let questions = text.matches('?').count();
    let q = match questions {
        0 | 1 => 0.0,
        2..=3 => questions as f64 * QUESTION_STEP,
        _ => QUESTION_CAP,
    };
    exclaims * EXCLAIM_STEP + q
}

fn compound(sum: f64) -> f64 {
    (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
}
