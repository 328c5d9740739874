use crate::store::DocumentIndex;
use crate::SessionStatus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// The document currently answering questions. Name and index travel
/// together so a reader can never pair one document's name with another's
/// index.
#[derive(Debug)]
pub struct ActiveDocument {
    index: DocumentIndex,
}

impl ActiveDocument {
    pub fn new(index: DocumentIndex) -> Self {
        Self { index }
    }

    pub fn file_name(&self) -> &str {
        self.index.file_name()
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }
}

/// Process-wide holder of the active document. Empty until the first
/// successful upload; every later upload swaps the whole value.
#[derive(Debug, Default)]
pub struct SessionState {
    current: RwLock<Option<Arc<ActiveDocument>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Option<Arc<ActiveDocument>> {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, document: ActiveDocument) {
        let incoming = Arc::new(document);
        let previous = {
            let mut current = self.current.write().await;
            current.replace(incoming.clone())
        };

        info!(
            file_name = %incoming.file_name(),
            chunk_count = incoming.index().len(),
            replaced = previous.as_ref().map(|doc| doc.file_name()).unwrap_or("<none>"),
            "active document replaced"
        );
    }

    pub async fn status(&self) -> SessionStatus {
        match self.snapshot().await {
            Some(document) => SessionStatus {
                file_name: Some(document.file_name().to_string()),
                has_pdf: true,
            },
            None => SessionStatus {
                file_name: None,
                has_pdf: false,
            },
        }
    }
}
