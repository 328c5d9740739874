use pdf_qa_core::QaService;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state handed to every handler.
pub struct AppState {
    pub service: Arc<QaService>,
    pub uploads_dir: PathBuf,
    pub frontend_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: QaService, uploads_dir: impl Into<PathBuf>, frontend_dir: impl Into<PathBuf>) -> Self {
        Self {
            service: Arc::new(service),
            uploads_dir: uploads_dir.into(),
            frontend_dir: frontend_dir.into(),
            max_upload_bytes: crate::config::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
