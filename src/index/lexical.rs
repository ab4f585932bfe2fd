//! Tantivy full-text index over catalog entries.
//!
//! | Field | Options | Source |
//! |-------|---------|--------|
//! | `id` | `STRING \| STORED` | `CatalogEntry::doc_id` |
//! | `key` | `TEXT` | key plus its split identifier words |
//! | `description` | `TEXT` | entry description |
//!
//! Each keyword contributes an exact term clause, a prefix clause, and for
//! longer words a one-edit fuzzy clause, on both fields. Key matches are
//! boosted over description matches.

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value as _, STORED, STRING, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument, Term};
use tracing::debug;

use crate::catalog::{Catalog, CatalogEntry};
use crate::AssistantError;

/// Heap for the single-threaded writer used during a build.
const WRITER_HEAP_BYTES: usize = 20_000_000;

const KEY_BOOST: f32 = 2.0;
const PREFIX_FACTOR: f32 = 0.5;
const FUZZY_FACTOR: f32 = 0.3;

/// Words shorter than this get no fuzzy clause.
const FUZZY_MIN_LEN: usize = 5;

#[derive(Debug, Clone, Copy)]
struct IndexFields {
    id: Field,
    key: Field,
    description: Field,
}

fn build_schema() -> (Schema, IndexFields) {
    let mut builder = Schema::builder();
    let id = builder.add_text_field("id", STRING | STORED);
    let key = builder.add_text_field("key", TEXT);
    let description = builder.add_text_field("description", TEXT);
    (
        builder.build(),
        IndexFields {
            id,
            key,
            description,
        },
    )
}

/// Split an identifier into lowercase words on punctuation and camelCase
/// boundaries: `editor.fontSize` -> `["editor", "font", "size"]`.
pub fn identifier_words(key: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in key.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Lowercase alphanumeric words of a free-text query.
fn query_words(keywords: &str) -> Vec<String> {
    keywords
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Immutable, fully built full-text index.
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    fields: IndexFields,
    doc_count: usize,
}

impl std::fmt::Debug for LexicalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalIndex")
            .field("doc_count", &self.doc_count)
            .finish_non_exhaustive()
    }
}

impl LexicalIndex {
    /// Build an in-memory index over every entry of the catalog.
    pub fn build(catalog: &Catalog) -> Result<Self, AssistantError> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;

        let entries = catalog
            .settings()
            .cloned()
            .map(CatalogEntry::Setting)
            .chain(catalog.commands().cloned().map(CatalogEntry::Command));

        let mut doc_count = 0;
        for entry in entries {
            let mut doc = TantivyDocument::new();
            doc.add_text(fields.id, entry.doc_id());
            let words = identifier_words(entry.key()).join(" ");
            doc.add_text(fields.key, format!("{} {}", entry.key(), words));
            doc.add_text(fields.description, entry.description());
            writer.add_document(doc)?;
            doc_count += 1;
        }
        writer.commit()?;

        let reader = index.reader()?;
        debug!(doc_count, "lexical index built");
        Ok(Self {
            index,
            reader,
            fields,
            doc_count,
        })
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    fn build_query(&self, words: &[String]) -> BooleanQuery {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for word in words {
            for (field, boost) in [(self.fields.key, KEY_BOOST), (self.fields.description, 1.0)] {
                let term = Term::from_field_text(field, word);
                clauses.push((
                    Occur::Should,
                    Box::new(BoostQuery::new(
                        Box::new(TermQuery::new(term.clone(), IndexRecordOption::WithFreqs)),
                        boost,
                    )),
                ));
                if word.chars().count() >= 2 {
                    clauses.push((
                        Occur::Should,
                        Box::new(BoostQuery::new(
                            Box::new(FuzzyTermQuery::new_prefix(term.clone(), 0, false)),
                            boost * PREFIX_FACTOR,
                        )),
                    ));
                }
                if word.chars().count() >= FUZZY_MIN_LEN {
                    clauses.push((
                        Occur::Should,
                        Box::new(BoostQuery::new(
                            Box::new(FuzzyTermQuery::new(term, 1, true)),
                            boost * FUZZY_FACTOR,
                        )),
                    ));
                }
            }
        }
        BooleanQuery::new(clauses)
    }

    /// Ranked document ids for a free-text query, best first.
    pub fn search(&self, keywords: &str, limit: usize) -> Result<Vec<String>, AssistantError> {
        let words = query_words(keywords);
        if words.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query = self.build_query(&words);
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let mut ids = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc.get_first(self.fields.id).and_then(|v| v.as_str()) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Handle to the underlying tantivy index.
    pub fn index_handle(&self) -> Index {
        self.index.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Command, HasArguments, Setting, ValueType};
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                Setting {
                    key: "workbench.colorTheme".into(),
                    description: "Specifies the color theme used in the workbench.".into(),
                    default_value: json!("Dark Modern"),
                    value_type: ValueType::String,
                    restricted: false,
                },
                Setting {
                    key: "editor.fontSize".into(),
                    description: "Controls the font size in pixels.".into(),
                    default_value: json!(14),
                    value_type: ValueType::Number,
                    restricted: false,
                },
                Setting {
                    key: "editor.minimap.enabled".into(),
                    description: "Controls whether the minimap is shown.".into(),
                    default_value: json!(true),
                    value_type: ValueType::Boolean,
                    restricted: false,
                },
            ],
            vec![Command {
                key: "workbench.action.toggleSidebarVisibility".into(),
                description: "Toggle Primary Side Bar Visibility".into(),
                keybinding: Some("ctrl+b".into()),
                args_schema: None,
                has_arguments: HasArguments::Unknown,
            }],
        )
    }

    #[test]
    fn test_identifier_words() {
        assert_eq!(identifier_words("editor.fontSize"), vec!["editor", "font", "size"]);
        assert_eq!(
            identifier_words("workbench.action.toggleSidebarVisibility"),
            vec!["workbench", "action", "toggle", "sidebar", "visibility"]
        );
        assert_eq!(identifier_words("files.auto_save"), vec!["files", "auto", "save"]);
    }

    #[test]
    fn test_build_counts_documents() {
        let index = LexicalIndex::build(&catalog()).unwrap();
        assert_eq!(index.doc_count(), 4);
    }

    #[test]
    fn test_search_description_words() {
        let index = LexicalIndex::build(&catalog()).unwrap();
        let ids = index.search("color theme", 10).unwrap();
        assert_eq!(ids.first().map(String::as_str), Some("setting:workbench.colorTheme"));
    }

    #[test]
    fn test_search_camel_case_key_words() {
        let index = LexicalIndex::build(&catalog()).unwrap();
        let ids = index.search("font size", 10).unwrap();
        assert_eq!(ids.first().map(String::as_str), Some("setting:editor.fontSize"));
    }

    #[test]
    fn test_search_prefix() {
        let index = LexicalIndex::build(&catalog()).unwrap();
        let ids = index.search("minim", 10).unwrap();
        assert!(ids.contains(&"setting:editor.minimap.enabled".to_string()));
    }

    #[test]
    fn test_search_limit_and_empty_query() {
        let index = LexicalIndex::build(&catalog()).unwrap();
        assert!(index.search("   ", 10).unwrap().is_empty());
        assert!(index.search("editor", 0).unwrap().is_empty());
        assert_eq!(index.search("editor", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_search_no_match_is_empty() {
        let index = LexicalIndex::build(&catalog()).unwrap();
        assert!(index.search("qqqqqq", 10).unwrap().is_empty());
    }
}
