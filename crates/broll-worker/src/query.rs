//! Visual query resolution.
//!
//! Turns a scene's context snippet into a short English search query. An
//! ordered rule table is checked first; the table order is a priority, so
//! the first rule whose triggers appear in the snippet wins. Scenes that
//! match nothing fall back to the operator's first keyword.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use broll_footage::{KeywordTranslator, StaticTermTable};
use broll_models::SceneDescriptor;

/// Query used when nothing else produces one.
pub const GENERIC_QUERY: &str = "woman healthy lifestyle";

/// Longest query sent to providers, in characters.
pub const MAX_QUERY_CHARS: usize = 80;

/// Trigger terms mapped to a canned visual query.
///
/// Triggers match snippet words by prefix, so `dorm` covers `dormire`,
/// `dormo` and `dormiva`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRule {
    pub name: String,
    pub triggers: Vec<String>,
    pub query: String,
}

impl QueryRule {
    pub fn new(name: &str, triggers: &[&str], query: &str) -> Self {
        Self {
            name: name.to_string(),
            triggers: triggers.iter().map(|t| t.to_lowercase()).collect(),
            query: query.to_string(),
        }
    }

    fn matches(&self, tokens: &[&str]) -> bool {
        tokens
            .iter()
            .any(|token| self.triggers.iter().any(|t| token.starts_with(t.as_str())))
    }
}

/// Default wellness rule table, highest priority first.
pub fn default_rules() -> Vec<QueryRule> {
    vec![
        QueryRule::new(
            "sleep",
            &["sonn", "dorm", "insonn", "riposo", "notte", "sleep", "insomnia"],
            "woman sleeping peacefully in bed",
        ),
        QueryRule::new(
            "stress",
            &["stress", "ansia", "ansios", "nervos", "tension", "preoccup", "anxiety"],
            "woman relaxing meditation calm",
        ),
        QueryRule::new(
            "hormones",
            &["ormon", "menopaus", "vampat", "estrogen", "hormon"],
            "mature woman wellness",
        ),
        QueryRule::new(
            "movement",
            &[
                "eserciz", "allen", "sport", "cammin", "yoga", "palestra", "moviment",
                "exercis", "workout", "fitness",
            ],
            "woman exercising outdoors",
        ),
        QueryRule::new(
            "hydration",
            &["acqua", "idrat", "water", "hydrat"],
            "woman drinking water",
        ),
        QueryRule::new(
            "skin",
            &["pelle", "rughe", "viso", "crema", "skin"],
            "woman skincare routine",
        ),
        QueryRule::new(
            "energy",
            &["energi", "stanch", "fatica", "vitalit", "energy", "tired"],
            "energetic woman morning",
        ),
        QueryRule::new(
            "nutrition",
            &[
                "cibo", "aliment", "dieta", "mangi", "frutta", "verdur", "nutri", "food", "diet",
            ],
            "healthy food vegetables",
        ),
    ]
}

fn tokens(snippet: &str) -> Vec<String> {
    snippet
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn truncate_query(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.chars().count() <= MAX_QUERY_CHARS {
        return trimmed.to_string();
    }
    trimmed
        .chars()
        .take(MAX_QUERY_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Resolves scene snippets into provider search queries.
pub struct QueryResolver {
    rules: Vec<QueryRule>,
    translator: Option<Arc<dyn KeywordTranslator>>,
    terms: StaticTermTable,
    /// Keyword fallbacks already computed for this resolver
    keyword_cache: Mutex<HashMap<String, String>>,
}

impl QueryResolver {
    pub fn new(
        rules: Vec<QueryRule>,
        translator: Option<Arc<dyn KeywordTranslator>>,
        terms: StaticTermTable,
    ) -> Self {
        Self {
            rules,
            translator,
            terms,
            keyword_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Default rules and term table with an optional online translator.
    pub fn with_defaults(translator: Option<Arc<dyn KeywordTranslator>>) -> Self {
        Self::new(default_rules(), translator, StaticTermTable::default())
    }

    /// First rule, in table order, triggered by the snippet.
    pub fn match_rule(&self, snippet: &str) -> Option<&QueryRule> {
        let owned = tokens(snippet);
        let tokens: Vec<&str> = owned.iter().map(String::as_str).collect();
        self.rules.iter().find(|rule| rule.matches(&tokens))
    }

    /// Query for a snippet and the operator keywords.
    pub async fn resolve_query(&self, snippet: &str, keywords: &[String]) -> String {
        if let Some(rule) = self.match_rule(snippet) {
            debug!(rule = %rule.name, "Query rule matched");
            return truncate_query(&rule.query);
        }

        let keyword = keywords
            .iter()
            .map(|k| k.trim())
            .find(|k| !k.is_empty());
        let query = match keyword {
            Some(keyword) => self.keyword_query(keyword).await,
            None => GENERIC_QUERY.to_string(),
        };
        truncate_query(&query)
    }

    /// Attach a query to an unresolved scene.
    pub async fn resolve(&self, scene: &SceneDescriptor, keywords: &[String]) -> SceneDescriptor {
        let query = self.resolve_query(&scene.context_snippet, keywords).await;
        debug!(scene = scene.index, query = %query, "Resolved scene query");
        scene.with_query(query)
    }

    async fn keyword_query(&self, keyword: &str) -> String {
        let key = keyword.to_lowercase();
        if let Some(cached) = self.keyword_cache.lock().await.get(&key) {
            return cached.clone();
        }

        let translated = match &self.translator {
            Some(translator) => match translator.translate(keyword).await {
                Ok(text) if !text.trim().is_empty() => Some(text),
                Ok(_) => None,
                Err(e) => {
                    warn!(keyword, error = %e, "Keyword translation failed, using term table");
                    None
                }
            },
            None => None,
        };

        let query = translated
            .or_else(|| self.terms.lookup(keyword).map(str::to_string))
            .unwrap_or_else(|| key.clone());

        self.keyword_cache.lock().await.insert(key, query.clone());
        query
    }
}
