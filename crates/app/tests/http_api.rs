use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_qa_core::{
    AnswerSynthesizer, CharacterNgramEmbedder, ChunkingConfig, GenerationError, IngestPipeline,
    LlmProvider, Message, QaService,
};
use pdf_qa_server::build_router;
use pdf_qa_server::state::AppState;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;

const INDEX_MARKER: &str = "<title>PDF Q&A test page</title>";

/// Answers with the excerpts the prompt carried, so the response shows which
/// document was searched.
struct EchoContextProvider;

#[async_trait]
impl LlmProvider for EchoContextProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let prompt = messages
            .into_iter()
            .map(|message| message.content)
            .collect::<String>();
        Ok(prompt
            .split_once("Excerpts:\n")
            .map(|(_, context)| context.to_string())
            .unwrap_or_default())
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    uploads: TempDir,
    _frontend: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    fn uploads_dir(&self) -> PathBuf {
        self.uploads.path().to_path_buf()
    }

    async fn status(&self) -> Value {
        self.client
            .get(format!("{}/api/status", self.base))
            .send()
            .await
            .expect("status response")
            .json()
            .await
            .expect("status json")
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> (StatusCode, Value) {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let response = self
            .client
            .post(format!("{}/api/upload", self.base))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .expect("upload response");
        let status = response.status();
        (status, response.json().await.expect("upload json"))
    }

    async fn ask(&self, question: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}/api/ask", self.base))
            .json(&serde_json::json!({ "question": question }))
            .send()
            .await
            .expect("ask response");
        let status = response.status();
        (status, response.json().await.expect("ask json"))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn spawn_server() -> TestServer {
    spawn_server_with(|state| state).await
}

async fn spawn_server_with(configure: impl FnOnce(AppState) -> AppState) -> TestServer {
    let uploads = tempfile::tempdir().expect("uploads dir");
    let frontend = tempfile::tempdir().expect("frontend dir");
    std::fs::write(
        frontend.path().join("index.html"),
        format!("<!doctype html><html><head>{INDEX_MARKER}</head><body></body></html>"),
    )
    .expect("write index.html");

    let pipeline = IngestPipeline::new(
        ChunkingConfig::default(),
        Arc::new(CharacterNgramEmbedder::default()),
    )
    .expect("pipeline");
    let service = QaService::new(pipeline, AnswerSynthesizer::new(Arc::new(EchoContextProvider)));
    let state = configure(AppState::new(service, uploads.path(), frontend.path()));
    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    TestServer {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        uploads,
        _frontend: frontend,
        handle,
    }
}

fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

#[tokio::test]
async fn status_starts_empty() {
    let server = spawn_server().await;

    let status = server.status().await;
    assert_eq!(status["has_pdf"], Value::Bool(false));
    assert_eq!(status["file_name"], Value::Null);
}

#[tokio::test]
async fn health_and_front_end_are_served() {
    let server = spawn_server().await;

    let health: Value = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert_eq!(health["status"], "ok");

    let index = server
        .client
        .get(format!("{}/", server.base))
        .send()
        .await
        .expect("index response");
    assert!(index.status().is_success());
    assert!(index.text().await.expect("index body").contains(INDEX_MARKER));
}

#[tokio::test]
async fn ask_before_upload_is_rejected() {
    let server = spawn_server().await;

    let (status, body) = server.ask("What is the torque?").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No PDF uploaded yet. Please upload a PDF first.");
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let server = spawn_server().await;

    let (status, body) = server.ask("   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Question is required");

    let response = server
        .client
        .post(format!("{}/api/ask", server.base))
        .body("{}")
        .send()
        .await
        .expect("ask response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_pdf_upload_is_rejected_without_touching_state() {
    let server = spawn_server().await;

    let (status, body) = server.upload("notes.txt", b"plain text".to_vec()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only PDF files are allowed");
    assert_eq!(server.status().await["has_pdf"], Value::Bool(false));
}

#[tokio::test]
async fn upload_without_file_part_is_rejected() {
    let server = spawn_server().await;

    let response = server
        .client
        .post(format!("{}/api/upload", server.base))
        .multipart(Form::new().text("comment", "no file here"))
        .send()
        .await
        .expect("upload response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("upload json");
    assert_eq!(body["error"], "No file part in the request");
}

#[tokio::test]
async fn upload_then_ask_answers_from_the_document() {
    let server = spawn_server().await;

    let (status, body) = server
        .upload(
            "Safety Manual (v2).pdf",
            pdf_bytes(&["Torque the flange bolts to forty newton metres."]),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "upload body: {body}");
    assert_eq!(body["file_name"], "Safety_Manual_v2.pdf");
    assert_eq!(body["message"], "PDF uploaded and indexed successfully");
    assert!(server.uploads_dir().join("Safety_Manual_v2.pdf").is_file());

    let status = server.status().await;
    assert_eq!(status["has_pdf"], Value::Bool(true));
    assert_eq!(status["file_name"], "Safety_Manual_v2.pdf");

    let (status, body) = server.ask("What torque for the flange bolts?").await;
    assert_eq!(status, StatusCode::OK, "ask body: {body}");
    assert_eq!(body["file_name"], "Safety_Manual_v2.pdf");
    assert!(body["answer"]
        .as_str()
        .expect("answer string")
        .contains("forty newton metres"));
}

#[tokio::test]
async fn ask_body_is_read_as_json_regardless_of_content_type() {
    let server = spawn_server().await;
    let (status, _) = server
        .upload("manual.pdf", pdf_bytes(&["Replace the air filter every five hundred hours."]))
        .await;
    assert_eq!(status, StatusCode::OK);

    let response = server
        .client
        .post(format!("{}/api/ask", server.base))
        .header("content-type", "text/plain")
        .body(r#"{"question":"How often is the air filter replaced?"}"#)
        .send()
        .await
        .expect("ask response");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("ask json");
    assert_eq!(body["file_name"], "manual.pdf");
}

#[tokio::test]
async fn corrupt_pdf_fails_and_keeps_the_previous_document() {
    let server = spawn_server().await;
    let (status, _) = server
        .upload("good.pdf", pdf_bytes(&["Invoices are payable within thirty days."]))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.upload("broken.pdf", b"not really a pdf".to_vec()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .starts_with("Failed to process PDF: "));

    let status = server.status().await;
    assert_eq!(status["file_name"], "good.pdf");
}

#[tokio::test]
async fn second_upload_replaces_the_first() {
    let server = spawn_server().await;
    let (first, _) = server
        .upload("zebras.pdf", pdf_bytes(&["Zebras graze on the northern savanna."]))
        .await;
    let (second, _) = server
        .upload("invoices.pdf", pdf_bytes(&["Invoices are payable within thirty days."]))
        .await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);

    let (status, body) = server.ask("Where do zebras graze?").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_name"], "invoices.pdf");
    let answer = body["answer"].as_str().expect("answer string");
    assert!(answer.contains("Invoices"));
    assert!(!answer.contains("Zebras"));
}

#[tokio::test]
async fn file_part_without_a_name_is_rejected() {
    let server = spawn_server().await;

    let (status, body) = server.upload("", pdf_bytes(&["Some text."])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file selected");
    assert_eq!(server.status().await["has_pdf"], Value::Bool(false));
}

#[tokio::test]
async fn oversized_upload_is_rejected_as_json() {
    let server = spawn_server_with(|state| state.with_max_upload_bytes(1024)).await;

    let (status, body) = server.upload("big.pdf", vec![b'%'; 8 * 1024]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "Uploaded file is too large");
    assert_eq!(server.status().await["has_pdf"], Value::Bool(false));
}

#[tokio::test]
async fn pdf_without_text_can_still_be_asked() {
    let server = spawn_server().await;

    let (status, body) = server.upload("blank.pdf", pdf_bytes(&[" "])).await;
    assert_eq!(status, StatusCode::OK, "upload body: {body}");
    assert_eq!(body["chunk_count"], 0);
    assert_eq!(body["page_count"], 1);

    let (status, body) = server.ask("What does it say?").await;
    assert_eq!(status, StatusCode::OK, "ask body: {body}");
    assert_eq!(body["file_name"], "blank.pdf");
    assert_eq!(body["answer"], "");
}

#[tokio::test]
async fn oversized_question_body_is_rejected_as_json() {
    let server = spawn_server().await;

    // Just past axum's default two mebibyte body limit.
    let question = "a".repeat(2 * 1024 * 1024 + 4096);
    let (status, body) = server.ask(&question).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "Request body is too large");
}
