use crate::error::{CatalogError, Result};
use crate::index::document::{doc_id, from_tantivy_doc, to_tantivy_doc};
use crate::index::schema::ProductSchema;
use crate::index::{IndexHits, ProductIndex};
use crate::query::compiler::QueryCompiler;
use crate::query::model::SearchRequest;
use crate::tokenizer::register_analyzers;
use crate::types::{IndexedProduct, ProductId};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tantivy::collector::{Count, DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

/// Smallest per-thread writer arena tantivy accepts.
const MIN_WRITER_MEMORY: usize = 15_000_000;

/// [`ProductIndex`] backed by an embedded tantivy index, in RAM or on disk.
///
/// Every write commits and reloads the reader, so a successful upsert is visible to
/// the next search.
pub struct TantivyProductIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    schema: ProductSchema,
    compiler: QueryCompiler,
}

impl TantivyProductIndex {
    pub fn create_in_ram(writer_memory: usize) -> Result<Self> {
        let schema = ProductSchema::build();
        let index = Index::create_in_ram(schema.schema().clone());
        Self::from_index(index, schema, writer_memory)
    }

    /// Open the index at `path`, creating it (and the directory) if absent.
    pub fn open_or_create<P: AsRef<Path>>(path: P, writer_memory: usize) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        if path.join("meta.json").exists() {
            let index = Index::open_in_dir(path)?;
            let schema = ProductSchema::from_schema(index.schema())?;
            tracing::info!(path = %path.display(), "opened product index");
            Self::from_index(index, schema, writer_memory)
        } else {
            let schema = ProductSchema::build();
            let index = Index::create_in_dir(path, schema.schema().clone())?;
            tracing::info!(path = %path.display(), "created product index");
            Self::from_index(index, schema, writer_memory)
        }
    }

    fn from_index(index: Index, schema: ProductSchema, writer_memory: usize) -> Result<Self> {
        register_analyzers(&index);
        let writer = index.writer_with_num_threads(1, writer_memory.max(MIN_WRITER_MEMORY))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let compiler = QueryCompiler::new(schema.clone());
        Ok(TantivyProductIndex {
            index,
            reader,
            writer: Mutex::new(writer),
            schema,
            compiler,
        })
    }

    pub fn inner(&self) -> &Index {
        &self.index
    }

    fn writer(&self) -> MutexGuard<'_, IndexWriter> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Commit and reload the reader. A failed commit discards everything staged.
    fn commit(&self, writer: &mut IndexWriter) -> Result<()> {
        if let Err(e) = writer.commit() {
            discard_staged(writer);
            return Err(e.into());
        }
        self.reader.reload()?;
        Ok(())
    }

    fn id_term(&self, id: &str) -> Term {
        Term::from_field_text(self.schema.id, id)
    }
}

impl ProductIndex for TantivyProductIndex {
    fn search(&self, request: &SearchRequest) -> Result<IndexHits> {
        let query = self.compiler.compile(&request.query)?;
        let searcher = self.reader.searcher();
        let num_docs = searcher.num_docs() as usize;
        let offset = request.offset();

        if request.size == 0 || offset >= num_docs {
            let total = searcher.search(&*query, &Count)?;
            return Ok(IndexHits {
                ids: Vec::new(),
                total: total as u64,
            });
        }

        let limit = request.size.min(num_docs);
        let (total, top) = searcher.search(
            &*query,
            &(Count, TopDocs::with_limit(limit).and_offset(offset)),
        )?;

        let mut ids = Vec::with_capacity(top.len());
        for (_score, address) in top {
            let doc: TantivyDocument = searcher.doc(address)?;
            match doc_id(&self.schema, &doc) {
                Some(id) => ids.push(id),
                None => {
                    return Err(CatalogError::IndexUnavailable(
                        "indexed document has no id".to_string(),
                    ))
                }
            }
        }

        tracing::debug!(
            total = total,
            returned = ids.len(),
            page = request.page,
            "index search"
        );
        Ok(IndexHits {
            ids,
            total: total as u64,
        })
    }

    fn upsert(&self, product: &IndexedProduct) -> Result<()> {
        let doc = to_tantivy_doc(&self.schema, product)?;
        let mut writer = self.writer();
        writer.delete_term(self.id_term(&product.id));
        if let Err(e) = writer.add_document(doc) {
            discard_staged(&mut writer);
            return Err(e.into());
        }
        self.commit(&mut writer)
    }

    /// Stages every convertible record and commits once.
    fn upsert_many(&self, products: &[IndexedProduct]) -> Vec<Result<()>> {
        let mut results: Vec<Result<()>> = Vec::with_capacity(products.len());
        let mut staged: Vec<usize> = Vec::new();
        let mut writer = self.writer();

        for (i, product) in products.iter().enumerate() {
            let doc = match to_tantivy_doc(&self.schema, product) {
                Ok(doc) => doc,
                Err(e) => {
                    results.push(Err(e));
                    continue;
                }
            };
            writer.delete_term(self.id_term(&product.id));
            if let Err(e) = writer.add_document(doc) {
                // Rolling back drops the whole batch, including records staged earlier.
                discard_staged(&mut writer);
                let err = CatalogError::from(e);
                for &j in &staged {
                    results[j] = Err(err.clone());
                }
                results.extend(products[i..].iter().map(|_| Err(err.clone())));
                return results;
            }
            staged.push(i);
            results.push(Ok(()));
        }

        if staged.is_empty() {
            return results;
        }
        if let Err(e) = self.commit(&mut writer) {
            for &j in &staged {
                results[j] = Err(e.clone());
            }
        }
        tracing::debug!(batch = products.len(), staged = staged.len(), "index batch upsert");
        results
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut writer = self.writer();
        writer.delete_term(self.id_term(id));
        self.commit(&mut writer)
    }

    fn delete_many(&self, ids: &[ProductId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut writer = self.writer();
        for id in ids {
            writer.delete_term(self.id_term(id));
        }
        self.commit(&mut writer)
    }

    fn get(&self, id: &str) -> Result<Option<IndexedProduct>> {
        let searcher = self.reader.searcher();
        let query = TermQuery::new(self.id_term(id), IndexRecordOption::Basic);
        let top = searcher.search(&query, &TopDocs::with_limit(1))?;
        match top.first() {
            Some((_, address)) => {
                let doc: TantivyDocument = searcher.doc(*address)?;
                from_tantivy_doc(&self.schema, &doc)
            }
            None => Ok(None),
        }
    }

    fn ids(&self) -> Result<Vec<ProductId>> {
        let searcher = self.reader.searcher();
        let addresses = searcher.search(&AllQuery, &DocSetCollector)?;
        let mut ids = Vec::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc_id(&self.schema, &doc) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn count(&self) -> Result<u64> {
        Ok(self.reader.searcher().num_docs())
    }
}

/// Drop staged operations so a later commit cannot publish half a write.
fn discard_staged(writer: &mut IndexWriter) {
    if let Err(e) = writer.rollback() {
        tracing::error!(error = %e, "index writer rollback failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::model::{SearchField, SearchQuery};
    use crate::types::Product;

    fn indexed(id: &str, name: &str) -> IndexedProduct {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "price": 10.0,
        }))
        .unwrap();
        IndexedProduct::project(&product, "Bags")
    }

    fn index() -> TantivyProductIndex {
        TantivyProductIndex::create_in_ram(20_000_000).unwrap()
    }

    fn exact_name(value: &str) -> SearchRequest {
        SearchRequest {
            query: SearchQuery::Term {
                field: SearchField::NameExact,
                value: value.to_string(),
                boost: 1.0,
            },
            page: 0,
            size: 10,
        }
    }

    #[test]
    fn batch_upsert_isolates_bad_records() {
        let idx = index();
        let results = idx.upsert_many(&[
            indexed("a", "Canvas Tote"),
            indexed("", "No Id"),
            indexed("b", "Wool Scarf"),
        ]);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(CatalogError::InvalidArgument(_))));
        assert!(results[2].is_ok());
        assert_eq!(idx.count().unwrap(), 2);
    }

    #[test]
    fn batch_upsert_replaces_existing_ids() {
        let idx = index();
        idx.upsert(&indexed("a", "Canvas Tote")).unwrap();
        let results = idx.upsert_many(&[indexed("a", "Leather Tote"), indexed("a", "Suede Tote")]);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(idx.count().unwrap(), 1);
        assert_eq!(idx.get("a").unwrap().unwrap().name, "Suede Tote");
    }

    #[test]
    fn rejected_record_leaves_indexed_copy_in_place() {
        let idx = index();
        idx.upsert(&indexed("a", "Canvas Tote")).unwrap();
        assert!(idx.upsert(&indexed("", "Canvas Tote")).is_err());
        idx.upsert(&indexed("b", "Wool Scarf")).unwrap();
        assert_eq!(idx.get("a").unwrap().unwrap().name, "Canvas Tote");
        assert_eq!(idx.count().unwrap(), 2);
    }

    #[test]
    fn ids_and_batch_delete() {
        let idx = index();
        idx.upsert_many(&[
            indexed("a", "Canvas Tote"),
            indexed("b", "Wool Scarf"),
            indexed("c", "Silk Tie"),
        ]);
        let mut ids = idx.ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);

        idx.delete_many(&["a".to_string(), "c".to_string(), "zz".to_string()])
            .unwrap();
        assert_eq!(idx.ids().unwrap(), vec!["b"]);
    }

    #[test]
    fn exact_name_matches_final_sigma() {
        let idx = index();
        idx.upsert(&indexed("g", "ΚΑΦΕΣ")).unwrap();
        let hits = idx
            .search(&exact_name(&crate::tokenizer::normalize_exact("ΚΑΦΕΣ")))
            .unwrap();
        assert_eq!(hits.ids, vec!["g"]);
    }
}
