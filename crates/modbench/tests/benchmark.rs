use std::time::Duration;

use modbench::bench::Benchmark;
use modbench::providers::rekognition::RekognitionProvider;
use modbench::providers::vision::{VisionAuth, VisionProvider};
use modbench::DetectError;
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAKE_JPEG: &[u8] = b"\xff\xd8\xff\xe0 not really a jpeg";

fn rekognition_for(server: &MockServer) -> RekognitionProvider {
    let conf = aws_sdk_rekognition::Config::builder()
        .behavior_version(aws_sdk_rekognition::config::BehaviorVersion::latest())
        .region(aws_sdk_rekognition::config::Region::new("us-east-1"))
        .credentials_provider(aws_sdk_rekognition::config::Credentials::new(
            "akid", "secret", None, None, "test",
        ))
        .retry_config(aws_sdk_rekognition::config::retry::RetryConfig::disabled())
        .endpoint_url(server.uri())
        .build();
    RekognitionProvider::from_conf(conf)
}

fn vision_for(server: &MockServer) -> VisionProvider {
    VisionProvider::new(
        VisionAuth::StaticToken("test_token".to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_host(server.uri())
}

async fn mount_image(server: &MockServer, image_path: &str) {
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_JPEG))
        .mount(server)
        .await;
}

async fn mount_moderation(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-amz-json-1.1")
                .set_body_string(r#"{"ModerationLabels":[],"ModerationModelVersion":"7.0"}"#),
        )
        .mount(server)
        .await;
}

async fn mount_safe_search(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/images:annotate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [{
                "safeSearchAnnotation": {
                    "adult": "VERY_UNLIKELY",
                    "spoof": "VERY_UNLIKELY",
                    "medical": "VERY_UNLIKELY",
                    "violence": "UNLIKELY",
                    "racy": "UNLIKELY"
                }
            }]
        })))
        .mount(server)
        .await;
}

fn assert_report_line(line: &str, label: &str) {
    assert!(
        line.starts_with(&format!("{label} -> ")),
        "unexpected line: {line}"
    );
    let seconds = line
        .strip_prefix(&format!("{label} -> "))
        .and_then(|rest| rest.strip_suffix(" seconds"))
        .unwrap_or_else(|| panic!("unexpected line: {line}"));
    let seconds: f64 = seconds.parse().expect("seconds should parse as a float");
    assert!(seconds >= 0.0);
}

#[tokio::test]
async fn run_prints_one_line_per_benchmark() {
    let images = MockServer::start().await;
    let rekognition_server = MockServer::start().await;
    let vision_server = MockServer::start().await;

    mount_image(&images, "/images/picnic.jpg").await;
    mount_image(&images, "/images/swimwear.jpg").await;
    mount_moderation(&rekognition_server).await;
    mount_safe_search(&vision_server).await;

    let benchmark = Benchmark::new(
        rekognition_for(&rekognition_server),
        vision_for(&vision_server),
        Client::new(),
    );

    let urls = vec![
        format!("{}/images/picnic.jpg", images.uri()),
        format!("{}/images/swimwear.jpg", images.uri()),
    ];

    let mut out = Vec::new();
    benchmark.run(&urls, &mut out).await.unwrap();

    let report = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 6);

    assert_report_line(lines[0], "AWS / picnic");
    assert_report_line(lines[1], "AWS / swimwear");
    assert_report_line(lines[2], "GCP(url) / picnic");
    assert_report_line(lines[3], "GCP(url) / swimwear");
    assert_report_line(lines[4], "GCP(download) / picnic");
    assert_report_line(lines[5], "GCP(download) / swimwear");
}

#[tokio::test]
async fn run_still_reports_when_detection_fails() {
    let images = MockServer::start().await;
    let rekognition_server = MockServer::start().await;
    let vision_server = MockServer::start().await;

    mount_image(&images, "/images/picnic.jpg").await;
    // Both services fall over; the report must come out regardless.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&rekognition_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&vision_server)
        .await;

    let benchmark = Benchmark::new(
        rekognition_for(&rekognition_server),
        vision_for(&vision_server),
        Client::new(),
    );

    let urls = vec![format!("{}/images/picnic.jpg", images.uri())];
    let mut out = Vec::new();
    benchmark.run(&urls, &mut out).await.unwrap();

    let report = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_report_line(lines[0], "AWS / picnic");
    assert_report_line(lines[1], "GCP(url) / picnic");
    assert_report_line(lines[2], "GCP(download) / picnic");
}

#[tokio::test]
async fn safe_search_by_reference_never_fetches_locally() {
    let images = MockServer::start().await;
    let vision_server = MockServer::start().await;
    let rekognition_server = MockServer::start().await;

    // Any local fetch against the image host is a contract violation.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_JPEG))
        .expect(0)
        .mount(&images)
        .await;
    mount_safe_search(&vision_server).await;

    let benchmark = Benchmark::new(
        rekognition_for(&rekognition_server),
        vision_for(&vision_server),
        Client::new(),
    );

    let url = format!("{}/images/picnic.jpg", images.uri());
    benchmark.safe_search_by_reference(&url).await.unwrap();
}

#[tokio::test]
async fn safe_search_by_upload_skips_detection_when_fetch_fails() {
    let images = MockServer::start().await;
    let vision_server = MockServer::start().await;
    let rekognition_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&images)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&vision_server)
        .await;

    let benchmark = Benchmark::new(
        rekognition_for(&rekognition_server),
        vision_for(&vision_server),
        Client::new(),
    );

    let url = format!("{}/images/picnic.jpg", images.uri());
    let err = benchmark.safe_search_by_upload(&url).await.unwrap_err();
    assert!(matches!(err, DetectError::Download(_)));
}

#[tokio::test]
async fn batch_safe_search_fails_fast_on_download_error() {
    let images = MockServer::start().await;
    let vision_server = MockServer::start().await;
    let rekognition_server = MockServer::start().await;

    mount_image(&images, "/images/first.jpg").await;
    Mock::given(method("GET"))
        .and(path("/images/second.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&images)
        .await;
    // The URL after the failing one must never be requested.
    Mock::given(method("GET"))
        .and(path("/images/third.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_JPEG))
        .expect(0)
        .mount(&images)
        .await;
    // No batch call goes out when a download failed.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&vision_server)
        .await;

    let benchmark = Benchmark::new(
        rekognition_for(&rekognition_server),
        vision_for(&vision_server),
        Client::new(),
    );

    let urls = vec![
        format!("{}/images/first.jpg", images.uri()),
        format!("{}/images/second.jpg", images.uri()),
        format!("{}/images/third.jpg", images.uri()),
    ];

    let err = benchmark.batch_safe_search(&urls).await.unwrap_err();
    assert!(matches!(err, DetectError::Download(_)));
}
