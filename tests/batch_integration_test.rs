use async_trait::async_trait;
use httpmock::prelude::*;
use image::{Rgba, RgbaImage};
use pod_bulk::app;
use pod_bulk::core::batch::{BatchSettings, BulkEngine};
use pod_bulk::core::poller::PollPolicy;
use pod_bulk::core::render::TRANSPARENT;
use pod_bulk::domain::model::{FitMode, ItemStatus, ProductStatus};
use pod_bulk::domain::ports::ObjectStore;
use pod_bulk::{BucketClient, BulkError, ListingRules, LocalStorage, PodApiClient};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> String {
    let path = dir.join(name);
    RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]))
        .save(&path)
        .unwrap();
    path.to_string_lossy().to_string()
}

fn template_json() -> serde_json::Value {
    serde_json::json!({
        "id": "tpl_poster",
        "name": "Poster",
        "variants": [{
            "id": "v_square",
            "name": "Square",
            "placeholders": [
                {"name": "front", "width": 40, "height": 40},
                {"name": "label"}
            ]
        }]
    })
}

fn settings(images: Vec<String>, attempts: u32) -> BatchSettings {
    BatchSettings {
        template_id: "tpl_poster".to_string(),
        images,
        fit_mode: FitMode::Cover,
        background: TRANSPARENT,
        concurrent_uploads: 3,
        poll: PollPolicy {
            attempts,
            interval: Duration::from_millis(5),
        },
        dry_run: false,
        rules: ListingRules {
            title_template: "{name} Poster".to_string(),
            price: Some(1500),
            ..ListingRules::default()
        },
    }
}

fn engine(
    server: &MockServer,
    output: &TempDir,
    settings: BatchSettings,
) -> BulkEngine<PodApiClient, BucketClient, LocalStorage> {
    let api = PodApiClient::new(&server.base_url(), "pod-key", None).unwrap();
    let store = BucketClient::new(&server.base_url(), "prints", "service-key").unwrap();
    let storage = LocalStorage::new(output.path().to_string_lossy().to_string());
    BulkEngine::new(api, store, storage, settings)
}

#[tokio::test]
async fn test_bulk_run_creates_products_and_isolates_bad_images() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let good = write_png(input.path(), "sunny_day.png", 80, 40);
    let bad = input.path().join("broken.png");
    std::fs::write(&bad, b"definitely not a png").unwrap();

    let server = MockServer::start();
    let template_mock = server.mock(|when, then| {
        when.method(GET).path("/templates/tpl_poster");
        then.status(200).json_body(template_json());
    });
    let upload_mock = server.mock(|when, then| {
        when.method(POST).path_contains("/storage/v1/object/prints/");
        then.status(200).json_body(serde_json::json!({"Key": "ok"}));
    });
    let create_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/products/from-template")
            .json_body_partial(r#"{"template_id":"tpl_poster","title":"Sunny Day Poster"}"#);
        then.status(201)
            .json_body(serde_json::json!({"id": "prod_1", "status": "pending"}));
    });
    let status_mock = server.mock(|when, then| {
        when.method(GET).path("/products/prod_1");
        then.status(200)
            .json_body(serde_json::json!({"id": "prod_1", "status": "completed"}));
    });

    let images = vec![good.clone(), bad.to_string_lossy().to_string()];
    let run = engine(&server, &output, settings(images, 5))
        .run()
        .await
        .unwrap();

    template_mock.assert();
    // Fitted 40x40 rendition plus the untouched original for the label slot.
    upload_mock.assert_hits(2);
    create_mock.assert();
    status_mock.assert();

    let items = &run.report.items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].status, ItemStatus::Completed);
    assert_eq!(items[0].product_id.as_deref(), Some("prod_1"));
    assert_eq!(items[0].product_status, Some(ProductStatus::Completed));
    assert_eq!(items[0].poll_attempts, 1);
    assert_eq!(items[1].status, ItemStatus::Failed);
    assert!(items[1].error.is_some());

    assert_eq!(run.report_files.len(), 2);
    for file in &run.report_files {
        assert!(output.path().join(file).exists());
    }
    let json = std::fs::read_to_string(output.path().join(&run.report_files[0])).unwrap();
    assert!(json.contains("\"prod_1\""));
}

#[tokio::test]
async fn test_failed_creation_does_not_abort_batch() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let alpha = write_png(input.path(), "alpha.png", 60, 60);
    let beta = write_png(input.path(), "beta.png", 60, 90);

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/templates/tpl_poster");
        then.status(200).json_body(template_json());
    });
    server.mock(|when, then| {
        when.method(POST).path_contains("/storage/v1/object/prints/");
        then.status(200);
    });
    let rejected = server.mock(|when, then| {
        when.method(POST)
            .path("/products/from-template")
            .json_body_partial(r#"{"title":"Alpha Poster"}"#);
        then.status(422).body("title already used");
    });
    let accepted = server.mock(|when, then| {
        when.method(POST)
            .path("/products/from-template")
            .json_body_partial(r#"{"title":"Beta Poster"}"#);
        then.status(201)
            .json_body(serde_json::json!({"id": "prod_b", "status": "completed"}));
    });

    let run = engine(&server, &output, settings(vec![alpha, beta], 5))
        .run()
        .await
        .unwrap();

    rejected.assert();
    accepted.assert();

    let items = &run.report.items;
    assert_eq!(items[0].status, ItemStatus::Failed);
    assert!(items[0].error.as_deref().unwrap().contains("422"));
    // Already terminal on creation, so no polling.
    assert_eq!(items[1].status, ItemStatus::Completed);
    assert_eq!(items[1].poll_attempts, 0);
}

#[tokio::test]
async fn test_polling_times_out_after_fixed_attempts() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let image = write_png(input.path(), "slow.png", 40, 40);

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/templates/tpl_poster");
        then.status(200).json_body(template_json());
    });
    server.mock(|when, then| {
        when.method(POST).path_contains("/storage/v1/object/prints/");
        then.status(200);
    });
    server.mock(|when, then| {
        when.method(POST).path("/products/from-template");
        then.status(201)
            .json_body(serde_json::json!({"id": "prod_slow", "status": "pending"}));
    });
    let status_mock = server.mock(|when, then| {
        when.method(GET).path("/products/prod_slow");
        then.status(200)
            .json_body(serde_json::json!({"id": "prod_slow", "status": "processing"}));
    });

    let run = engine(&server, &output, settings(vec![image], 3))
        .run()
        .await
        .unwrap();

    status_mock.assert_hits(3);
    let item = &run.report.items[0];
    assert_eq!(item.status, ItemStatus::Timeout);
    assert_eq!(item.poll_attempts, 3);
    assert_eq!(item.product_status, Some(ProductStatus::Processing));
    assert_eq!(run.report.summary().timeout, 1);
}

#[tokio::test]
async fn test_failed_upload_marks_item_failed() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let image = write_png(input.path(), "cloud.png", 40, 40);

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/templates/tpl_poster");
        then.status(200).json_body(template_json());
    });
    server.mock(|when, then| {
        when.method(POST).path_contains("/storage/v1/object/prints/");
        then.status(403).body("bucket policy denies insert");
    });
    let create_mock = server.mock(|when, then| {
        when.method(POST).path("/products/from-template");
        then.status(201);
    });

    let run = engine(&server, &output, settings(vec![image], 3))
        .run()
        .await
        .unwrap();

    create_mock.assert_hits(0);
    let item = &run.report.items[0];
    assert_eq!(item.status, ItemStatus::Failed);
    assert!(item.error.as_deref().unwrap().starts_with("upload failed"));
}

#[tokio::test]
async fn test_missing_template_is_fatal() {
    let output = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/templates/tpl_poster");
        then.status(404).body("not found");
    });

    let err = engine(&server, &output, settings(vec!["a.png".to_string()], 3))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, BulkError::ApiStatus { status: 404, .. }));
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unknown_variant_is_fatal() {
    let output = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/templates/tpl_poster");
        then.status(200).json_body(template_json());
    });

    let mut settings = settings(vec!["a.png".to_string()], 3);
    settings.rules.variant_ids = vec!["v_round".to_string()];
    let err = engine(&server, &output, settings).run().await.unwrap_err();
    assert!(matches!(err, BulkError::ValidationError { .. }));
}

#[tokio::test]
async fn test_dry_run_fails_missing_inputs() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let present = write_png(input.path(), "present.png", 40, 40);
    let missing = input.path().join("gone.png").to_string_lossy().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/templates/tpl_poster");
        then.status(200).json_body(template_json());
    });
    let upload_mock = server.mock(|when, then| {
        when.method(POST).path_contains("/storage/v1/object/");
        then.status(200);
    });

    let mut settings = settings(vec![present, missing], 3);
    settings.dry_run = true;
    let run = engine(&server, &output, settings).run().await.unwrap();

    upload_mock.assert_hits(0);
    let items = &run.report.items;
    assert_eq!(items[0].status, ItemStatus::Planned);
    assert_eq!(items[1].status, ItemStatus::Failed);
    assert!(items[1].error.as_deref().unwrap().starts_with("cannot read image"));
    assert_eq!(app::run_exit_code(&run), 4);
}

#[tokio::test]
async fn test_unwritable_report_keeps_created_products() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let image = write_png(input.path(), "kept.png", 40, 40);
    // The output directory path is taken by a plain file.
    let blocked = output.path().join("reports");
    std::fs::write(&blocked, b"in the way").unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/templates/tpl_poster");
        then.status(200).json_body(template_json());
    });
    server.mock(|when, then| {
        when.method(POST).path_contains("/storage/v1/object/prints/");
        then.status(200);
    });
    let create_mock = server.mock(|when, then| {
        when.method(POST).path("/products/from-template");
        then.status(201)
            .json_body(serde_json::json!({"id": "prod_kept", "status": "completed"}));
    });

    let api = PodApiClient::new(&server.base_url(), "pod-key", None).unwrap();
    let store = BucketClient::new(&server.base_url(), "prints", "service-key").unwrap();
    let storage = LocalStorage::new(blocked.to_string_lossy().to_string());
    let run = BulkEngine::new(api, store, storage, settings(vec![image], 3))
        .run()
        .await
        .unwrap();

    create_mock.assert();
    assert_eq!(run.report.items[0].status, ItemStatus::Completed);
    assert_eq!(run.report.items[0].product_id.as_deref(), Some("prod_kept"));
    assert!(run.report_files.is_empty());
    assert!(matches!(run.report_error, Some(BulkError::IoError(_))));
    assert_eq!(app::run_exit_code(&run), 3);
}

/// Keeps every uploaded object in memory.
#[derive(Default, Clone)]
struct MemoryStore {
    objects: Arc<Mutex<Vec<(String, Vec<u8>, String)>>>,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> pod_bulk::Result<String> {
        self.objects
            .lock()
            .unwrap()
            .push((path.to_string(), data, content_type.to_string()));
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.test/{}", path)
    }
}

#[tokio::test]
async fn test_original_fit_uploads_source_untouched() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let image = write_png(input.path(), "wide_shot.png", 90, 30);
    let source_bytes = std::fs::read(&image).unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/templates/tpl_poster");
        then.status(200).json_body(template_json());
    });
    let create_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/products/from-template")
            .body_contains("/001-wide-shot.png");
        then.status(201)
            .json_body(serde_json::json!({"id": "prod_o", "status": "completed"}));
    });

    let mut settings = settings(vec![image], 3);
    settings.fit_mode = FitMode::Original;
    let store = MemoryStore::default();
    let api = PodApiClient::new(&server.base_url(), "pod-key", None).unwrap();
    let storage = LocalStorage::new(output.path().to_string_lossy().to_string());
    let run = BulkEngine::new(api, store.clone(), storage, settings)
        .run()
        .await
        .unwrap();

    create_mock.assert();
    assert_eq!(run.report.items[0].status, ItemStatus::Completed);

    // The sized front slot and the unsized label share one untouched upload.
    let objects = store.objects.lock().unwrap();
    assert_eq!(objects.len(), 1);
    let (path, bytes, content_type) = &objects[0];
    assert!(path.ends_with("/001-wide-shot.png"));
    assert_eq!(content_type, "image/png");
    assert_eq!(bytes, &source_bytes);
    let uploaded = image::load_from_memory(bytes).unwrap();
    assert_eq!((uploaded.width(), uploaded.height()), (90, 30));
}

/// Slow uploads that record the most seen in flight at once.
#[derive(Default, Clone)]
struct CountingStore {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn upload(
        &self,
        path: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> pod_bulk::Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.test/{}", path)
    }
}

#[tokio::test]
async fn test_many_images_stay_within_concurrency() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let images: Vec<String> = (0..6)
        .map(|i| write_png(input.path(), &format!("print_{}.png", i), 50, 70))
        .collect();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/templates/tpl_poster");
        then.status(200).json_body(template_json());
    });
    let create_mock = server.mock(|when, then| {
        when.method(POST).path("/products/from-template");
        then.status(201)
            .json_body(serde_json::json!({"id": "prod_n", "status": "completed"}));
    });

    let mut settings = settings(images, 3);
    settings.concurrent_uploads = 2;
    let store = CountingStore::default();
    let api = PodApiClient::new(&server.base_url(), "pod-key", None).unwrap();
    let storage = LocalStorage::new(output.path().to_string_lossy().to_string());
    let run = BulkEngine::new(api, store.clone(), storage, settings)
        .run()
        .await
        .unwrap();

    create_mock.assert_hits(6);
    assert_eq!(run.report.summary().completed, 6);
    // A fitted rendition and the original per image.
    assert_eq!(store.total.load(Ordering::SeqCst), 12);
    assert!(store.peak.load(Ordering::SeqCst) <= 2);
}
