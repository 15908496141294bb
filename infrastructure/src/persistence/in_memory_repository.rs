// ./infrastructure/src/persistence/in_memory_repository.rs
use application::{ApplicationError, DocumentRepository};
use async_trait::async_trait;
use domain::{Document, DocumentId, SearchRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

/// Map plus first-insertion order, kept together under one lock.
#[derive(Debug, Default)]
struct DocumentTable {
    documents: HashMap<DocumentId, Document>,
    order: Vec<DocumentId>,
}

impl DocumentTable {
    fn upsert(&mut self, id: DocumentId, document: Document) -> bool {
        let replaced = self.documents.insert(id.clone(), document).is_some();
        if !replaced {
            self.order.push(id);
        }
        replaced
    }

    fn iter(&self) -> impl Iterator<Item = &Document> {
        self.order.iter().filter_map(|id| self.documents.get(id))
    }
}

/// In-memory document store. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentRepository {
    table: Arc<RwLock<DocumentTable>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    #[instrument(skip(self, document))]
    async fn save(&self, mut document: Document) -> Result<Document, ApplicationError> {
        let id = document.ensure_id();
        // Held across the whole read-modify-write
        let mut table = self.table.write().await;
        let replaced = table.upsert(id.clone(), document.clone());
        debug!(doc_id = %id, replaced, "Saved document to in-memory store");
        Ok(document)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError> {
        debug!(doc_id = %id, "Getting document from in-memory store");
        let table = self.table.read().await;
        Ok(table.documents.get(id).cloned())
    }

    #[instrument(skip(self, request))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>, ApplicationError> {
        let table = self.table.read().await;
        let hits: Vec<Document> = table
            .iter()
            .filter(|document| {
                let matched = request.matches(document);
                trace!(doc_id = %document.id(), matched, "Evaluated document");
                matched
            })
            .cloned()
            .collect();
        debug!(
            scanned = table.order.len(),
            hits = hits.len(),
            "In-memory search finished."
        );
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, ApplicationError> {
        Ok(self.table.read().await.documents.len())
    }
}
