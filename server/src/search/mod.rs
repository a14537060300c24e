//! In-process full-text index mirroring the relational rows.
//!
//! Each entity type gets its own inverted index keyed by [`Searchable::INDEX`].
//! Writes go through [`SearchIndex::index`] and [`SearchIndex::remove`] right
//! after the database commit; [`reindex_all`] rebuilds everything from the
//! database.

mod documents;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use sqlx::SqlitePool;

use crate::db::{
    AddressRepository, CareEventRepository, FollowupPlanRepository, PatientRepository,
    ProcedureBookingRepository, ProcedureRepository, QuestionnaireRepository, UserRepository,
};
use crate::error::DbError;
use crate::pagination::{Page, Pageable};

/// An entity that can be stored in the search index
pub trait Searchable {
    const INDEX: &'static str;

    fn search_id(&self) -> Option<i64>;

    /// `(field name, text)` pairs; a field may appear more than once
    fn search_fields(&self) -> Vec<(&'static str, String)>;
}

#[derive(Debug, Default)]
struct EntityIndex {
    /// token -> document id -> fields the token occurs in
    postings: BTreeMap<String, BTreeMap<i64, BTreeSet<&'static str>>>,
    /// document id -> tokens, so a document can be removed
    documents: HashMap<i64, BTreeSet<String>>,
}

impl EntityIndex {
    fn insert(&mut self, id: i64, fields: Vec<(&'static str, String)>) {
        self.remove(id);

        let mut tokens = BTreeSet::new();
        for (field, text) in fields {
            for token in tokenize(&text) {
                self.postings
                    .entry(token.clone())
                    .or_default()
                    .entry(id)
                    .or_default()
                    .insert(field);
                tokens.insert(token);
            }
        }
        self.documents.insert(id, tokens);
    }

    fn remove(&mut self, id: i64) -> bool {
        let Some(tokens) = self.documents.remove(&id) else {
            return false;
        };
        for token in tokens {
            if let Some(docs) = self.postings.get_mut(&token) {
                docs.remove(&id);
                if docs.is_empty() {
                    self.postings.remove(&token);
                }
            }
        }
        true
    }

    fn matches(&self, term: &Term) -> BTreeSet<i64> {
        let accept = |fields: &BTreeSet<&'static str>| match &term.field {
            Some(wanted) => fields.iter().any(|f| f.eq_ignore_ascii_case(wanted)),
            None => true,
        };

        let mut hits = BTreeSet::new();
        if term.prefix {
            let candidates = self
                .postings
                .range(term.text.clone()..)
                .take_while(|(token, _)| token.starts_with(&term.text));
            for (_, docs) in candidates {
                hits.extend(docs.iter().filter(|&(_, fields)| accept(fields)).map(|(id, _)| *id));
            }
        } else if let Some(docs) = self.postings.get(&term.text) {
            hits.extend(docs.iter().filter(|&(_, fields)| accept(fields)).map(|(id, _)| *id));
        }
        hits
    }

    /// Document ids ranked by number of matching terms, then id
    fn search(&self, query: &Query) -> Vec<i64> {
        if query.terms.is_empty() {
            let mut all: Vec<i64> = self.documents.keys().copied().collect();
            all.sort_unstable();
            return all;
        }

        let mut scores: HashMap<i64, usize> = HashMap::new();
        for term in &query.terms {
            for id in self.matches(term) {
                *scores.entry(id).or_default() += 1;
            }
        }

        let mut ranked: Vec<(i64, usize)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().map(|(id, _)| id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    field: Option<String>,
    text: String,
    prefix: bool,
}

/// Parsed query; no terms means match everything
#[derive(Debug, Default, PartialEq, Eq)]
struct Query {
    terms: Vec<Term>,
}

impl Query {
    fn parse(raw: &str) -> Self {
        let mut terms = Vec::new();
        // a lone `*` among other words has no tokens and drops out
        for word in raw.split_whitespace() {
            let (field, text) = match word.split_once(':') {
                Some((field, text)) if !field.is_empty() => (Some(field.to_string()), text),
                _ => (None, word),
            };
            let prefix = text.ends_with('*');
            for token in tokenize(text) {
                terms.push(Term {
                    field: field.clone(),
                    text: token,
                    prefix,
                });
            }
        }
        Query { terms }
    }
}

/// Lowercase alphanumeric runs
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Thread-safe collection of per-entity indices
#[derive(Debug, Default)]
pub struct SearchIndex {
    indices: RwLock<HashMap<&'static str, EntityIndex>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one document. Entities without an id are ignored.
    pub fn index<T: Searchable>(&self, entity: &T) {
        let Some(id) = entity.search_id() else {
            return;
        };
        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        indices
            .entry(T::INDEX)
            .or_default()
            .insert(id, entity.search_fields());
    }

    pub fn index_all<'a, T: Searchable + 'a>(&self, entities: impl IntoIterator<Item = &'a T>) {
        for entity in entities {
            self.index(entity);
        }
    }

    /// Remove one document; returns whether it was indexed
    pub fn remove<T: Searchable>(&self, id: i64) -> bool {
        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        indices
            .get_mut(T::INDEX)
            .map(|index| index.remove(id))
            .unwrap_or(false)
    }

    pub fn remove_all<T: Searchable>(&self, ids: impl IntoIterator<Item = i64>) {
        for id in ids {
            self.remove::<T>(id);
        }
    }

    /// Swap the whole index for `T` with the given documents
    pub fn replace<T: Searchable>(&self, entities: &[T]) {
        let mut fresh = EntityIndex::default();
        for entity in entities {
            if let Some(id) = entity.search_id() {
                fresh.insert(id, entity.search_fields());
            }
        }
        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        indices.insert(T::INDEX, fresh);
    }

    pub fn document_count<T: Searchable>(&self) -> usize {
        let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
        indices
            .get(T::INDEX)
            .map(|index| index.documents.len())
            .unwrap_or(0)
    }

    /// One page of matching document ids, best match first
    pub fn search<T: Searchable>(&self, query: &str, pageable: &Pageable) -> Page<i64> {
        let query = Query::parse(query);
        let ranked = {
            let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
            indices
                .get(T::INDEX)
                .map(|index| index.search(&query))
                .unwrap_or_default()
        };

        let total = ranked.len() as i64;
        let content = ranked
            .into_iter()
            .skip(pageable.offset() as usize)
            .take(pageable.size as usize)
            .collect();
        Page::new(content, pageable, total)
    }
}

/// Rebuild every index from the database. Returns `(index, documents)` pairs.
pub async fn reindex_all(
    pool: &SqlitePool,
    index: &SearchIndex,
) -> Result<Vec<(&'static str, usize)>, DbError> {
    let mut conn = pool.acquire().await?;
    let mut counts = Vec::new();

    let patients = PatientRepository::new(&mut conn).find_all_unpaged().await?;
    counts.push(replace(index, &patients));
    let addresses = AddressRepository::new(&mut conn).find_all_unpaged().await?;
    counts.push(replace(index, &addresses));
    let procedures = ProcedureRepository::new(&mut conn).find_all_unpaged().await?;
    counts.push(replace(index, &procedures));
    let questionnaires = QuestionnaireRepository::new(&mut conn)
        .find_all_unpaged()
        .await?;
    counts.push(replace(index, &questionnaires));
    let bookings = ProcedureBookingRepository::new(&mut conn)
        .find_all_unpaged()
        .await?;
    counts.push(replace(index, &bookings));
    let plans = FollowupPlanRepository::new(&mut conn)
        .find_all_unpaged()
        .await?;
    counts.push(replace(index, &plans));
    let events = CareEventRepository::new(&mut conn).find_all_unpaged().await?;
    counts.push(replace(index, &events));
    let users = UserRepository::new(&mut conn).find_all_unpaged().await?;
    counts.push(replace(index, &users));

    for (name, count) in &counts {
        tracing::info!("Reindexed {} {} documents", count, name);
    }
    Ok(counts)
}

fn replace<T: Searchable>(index: &SearchIndex, entities: &[T]) -> (&'static str, usize) {
    index.replace(entities);
    (T::INDEX, entities.len())
}
