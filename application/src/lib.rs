use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Author, Document, DocumentId, DomainError, SearchRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use sysinfo::{MemoryRefreshKind, Pid, System};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

// --- Application Errors ---
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
    #[error("Domain validation error: {0}")]
    DomainError(#[from] DomainError), // Propagate domain errors cleanly
}

// --- Infrastructure Interfaces (Traits) ---

/// The document store: owns saved documents and answers lookups and scans.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Inserts or overwrites a document, assigning an id first if it has none.
    /// Returns the stored document.
    async fn save(&self, document: Document) -> Result<Document, ApplicationError>;
    /// Exact-key lookup.
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError>;
    /// Full scan returning every document the request matches, in insertion order.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>, ApplicationError>;
    /// Number of stored documents.
    async fn count(&self) -> Result<usize, ApplicationError>;
}

// --- Request/Response Models (Data Transfer Objects - DTOs) ---

/// Request to save a document. Missing id and timestamp are filled in.
#[derive(Deserialize, Debug, Clone)]
pub struct SaveDocumentRequest {
    /// Existing id to overwrite, or none to get a fresh one.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub author: Author,
    /// Creation time; defaults to now.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl SaveDocumentRequest {
    pub fn into_document(self) -> Document {
        let document = Document::new(
            self.title,
            self.content,
            self.author,
            self.created.unwrap_or_else(Utc::now),
        );
        match self.id {
            Some(id) => document.with_id(id),
            None => document,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct SearchResponse {
    /// Matching documents in store order.
    pub hits: Vec<Document>,
    /// Number of matching documents.
    pub nb_hits: usize,
    /// Time taken by the search operation in milliseconds.
    pub processing_time_ms: u128,
}

#[derive(Serialize, Debug)]
pub struct MemoryStats {
    total_bytes: u64,
    used_bytes: u64,
    available_bytes: u64,
    process_used_bytes: u64, // Memory used by this process
}

#[derive(Serialize, Debug)]
pub struct EngineStats {
    pub total_documents: usize,
}

#[derive(Serialize, Debug)]
pub struct SystemInfo {
    os_name: String,
    os_version: String,
}

/// Response for the /stats endpoint.
#[derive(Serialize, Debug)]
pub struct StatsResponse {
    system_info: SystemInfo,
    memory: MemoryStats,
    pub engine: EngineStats,
}

// --- Application Services (Use Cases) ---

/// Service for saving, fetching and searching documents.
pub struct DocumentService {
    repo: Arc<dyn DocumentRepository>,
}

impl DocumentService {
    pub fn new(repo: Arc<dyn DocumentRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, request), fields(has_id = request.id.is_some()))]
    pub async fn save_document(
        &self,
        request: SaveDocumentRequest,
    ) -> Result<Document, ApplicationError> {
        info!("Attempting to save document");
        let document = request.into_document();

        let saved = self.repo.save(document).await.map_err(|e| {
            error!("Failed to save document to repository: {}", e);
            e
        })?;
        info!(doc_id = %saved.id(), "Document saved successfully");
        Ok(saved)
    }

    #[instrument(skip(self, id), fields(doc_id = %id))]
    pub async fn find_document(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError> {
        debug!("Looking up document");
        self.repo.find_by_id(id).await
    }

    /// Like [`find_document`](Self::find_document) but absence is an error.
    #[instrument(skip(self, id), fields(doc_id = %id))]
    pub async fn get_document(&self, id: &DocumentId) -> Result<Document, ApplicationError> {
        self.repo.find_by_id(id).await?.ok_or_else(|| {
            warn!("Document not found");
            ApplicationError::NotFound(id.to_string())
        })
    }

    #[instrument(skip(self, request), fields(unfiltered = request.is_unfiltered()))]
    pub async fn search_documents(
        &self,
        request: SearchRequest,
    ) -> Result<SearchResponse, ApplicationError> {
        info!("Attempting to search documents");
        let start_time = Instant::now();

        match self.repo.search(&request).await {
            Ok(hits) => {
                let processing_time_ms = start_time.elapsed().as_millis();
                info!(
                    nb_hits = hits.len(),
                    time_ms = processing_time_ms,
                    "Search successful"
                );
                Ok(SearchResponse {
                    nb_hits: hits.len(),
                    hits,
                    processing_time_ms,
                })
            }
            Err(e) => {
                error!(
                    time_ms = start_time.elapsed().as_millis(),
                    "Search failed: {}", e
                );
                Err(e)
            }
        }
    }
}

pub struct StatsService {
    repo: Arc<dyn DocumentRepository>,
}

impl StatsService {
    pub fn new(repo: Arc<dyn DocumentRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<StatsResponse, ApplicationError> {
        info!("Gathering engine and system statistics");

        let total_documents = self.repo.count().await.map_err(|e| {
            error!("Failed to get document count for stats: {}", e);
            ApplicationError::InfrastructureError("Failed to retrieve document count".to_string())
        })?;
        let engine = EngineStats { total_documents };
        debug!("Engine stats gathered: {:?}", engine);

        // sysinfo refreshes are blocking
        let (system_info, memory) = tokio::task::spawn_blocking(|| {
            let mut sys = System::new_all();
            sys.refresh_memory_specifics(MemoryRefreshKind::everything());

            let current_pid = Pid::from(std::process::id() as usize);
            let process_memory = sys.process(current_pid).map_or(0, |p| p.memory());

            let memory = MemoryStats {
                total_bytes: sys.total_memory(),
                used_bytes: sys.used_memory(),
                available_bytes: sys.available_memory(),
                process_used_bytes: process_memory,
            };
            let system_info = SystemInfo {
                os_name: System::name().unwrap_or_else(|| "Unknown OS".to_string()),
                os_version: System::os_version().unwrap_or_else(|| "Unknown Version".to_string()),
            };
            (system_info, memory)
        })
        .await
        .map_err(|e| {
            ApplicationError::InfrastructureError(format!(
                "System stat gathering task failed: {}",
                e // JoinError
            ))
        })?;
        debug!("System stats gathered: {:?}, {:?}", system_info, memory);

        Ok(StatsResponse {
            system_info,
            memory,
            engine,
        })
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Vec-backed repository; enough to drive the services.
    #[derive(Default)]
    struct VecRepository {
        documents: Mutex<Vec<Document>>,
        fail: bool,
    }

    #[async_trait]
    impl DocumentRepository for VecRepository {
        async fn save(&self, mut document: Document) -> Result<Document, ApplicationError> {
            if self.fail {
                return Err(ApplicationError::InfrastructureError("down".to_string()));
            }
            let id = document.ensure_id();
            let mut documents = self.documents.lock().await;
            documents.retain(|d| d.id() != id.as_str());
            documents.push(document.clone());
            Ok(document)
        }

        async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError> {
            let documents = self.documents.lock().await;
            Ok(documents.iter().find(|d| d.id() == id.as_str()).cloned())
        }

        async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>, ApplicationError> {
            if self.fail {
                return Err(ApplicationError::InfrastructureError("down".to_string()));
            }
            let documents = self.documents.lock().await;
            Ok(documents
                .iter()
                .filter(|d| request.matches(d))
                .cloned()
                .collect())
        }

        async fn count(&self) -> Result<usize, ApplicationError> {
            Ok(self.documents.lock().await.len())
        }
    }

    fn request(title: &str) -> SaveDocumentRequest {
        SaveDocumentRequest {
            id: None,
            title: title.to_string(),
            content: "content".to_string(),
            author: Author::new("a1", "Ada"),
            created: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn save_request_defaults_created_to_now() {
        let before = Utc::now();
        let req: SaveDocumentRequest = serde_json::from_value(json!({
            "title": "t",
            "content": "c",
            "author": { "id": "a1", "name": "Ada" }
        }))
        .unwrap();
        let doc = req.into_document();
        assert!(doc.created() >= before);
        assert_eq!(doc.id(), "");
    }

    #[tokio::test]
    async fn save_document_assigns_id() {
        let service = DocumentService::new(Arc::new(VecRepository::default()));
        let saved = service.save_document(request("Report1")).await.unwrap();
        assert!(!saved.id().is_empty());

        let id: DocumentId = saved.id().parse().unwrap();
        let found = service.find_document(&id).await.unwrap();
        assert_eq!(found, Some(saved));
    }

    #[tokio::test]
    async fn save_document_propagates_repository_errors() {
        let repo = VecRepository {
            fail: true,
            ..Default::default()
        };
        let service = DocumentService::new(Arc::new(repo));
        let result = service.save_document(request("Report1")).await;
        assert!(matches!(result, Err(ApplicationError::InfrastructureError(_))));
    }

    #[tokio::test]
    async fn get_document_reports_missing_ids() {
        let service = DocumentService::new(Arc::new(VecRepository::default()));
        let id: DocumentId = "nope".parse().unwrap();
        assert!(service.find_document(&id).await.unwrap().is_none());
        assert!(matches!(
            service.get_document(&id).await,
            Err(ApplicationError::NotFound(missing)) if missing == "nope"
        ));
    }

    #[tokio::test]
    async fn search_documents_counts_hits() {
        let service = DocumentService::new(Arc::new(VecRepository::default()));
        service.save_document(request("Report1")).await.unwrap();
        service.save_document(request("Memo")).await.unwrap();

        let response = service
            .search_documents(SearchRequest::default().with_title_prefixes(["Rep"]))
            .await
            .unwrap();
        assert_eq!(response.nb_hits, 1);
        assert_eq!(response.hits[0].title(), "Report1");
    }

    #[tokio::test]
    async fn stats_report_document_count() {
        let repo = Arc::new(VecRepository::default());
        let documents = DocumentService::new(repo.clone());
        documents.save_document(request("Report1")).await.unwrap();

        let stats = StatsService::new(repo).get_stats().await.unwrap();
        assert_eq!(stats.engine.total_documents, 1);
    }
}
