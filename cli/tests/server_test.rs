#[path = "../../ctdiag/tests/common/mod.rs"]
mod common;

use std::{path::Path, sync::Arc, thread, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD};
use cli::{
    CliError,
    handlers::{handle_serve, load_models},
    server::{ErrorBody, ServerConfig, build_rocket},
};
use ctdiag::{ModelId, ModelResolver, Network, Result};
use image::ImageFormat;
use ndarray::ArrayViewD;
use rocket::{
    http::{ContentType, Status},
    local::blocking::Client,
};
use serde_json::{Value, json};

fn client_with(
    resolver: Arc<ModelResolver>,
    timeout: Duration,
) -> Client {
    let config = ServerConfig {
        models_dir: resolver.models_dir().to_path_buf(),
        timeout,
        ..ServerConfig::default()
    };
    Client::tracked(build_rocket(&config, resolver)).expect("valid rocket")
}

fn client(models_dir: &Path) -> Client {
    client_with(
        Arc::new(ModelResolver::new(models_dir)),
        Duration::from_secs(60),
    )
}

fn png_payload() -> String {
    STANDARD.encode(common::encode(
        &common::ct_slice(256, 256),
        ImageFormat::Png,
    ))
}

fn post_json(
    client: &Client,
    uri: &str,
    body: String,
) -> (Status, Value) {
    let response = client
        .post(uri.to_string())
        .header(ContentType::JSON)
        .body(body)
        .dispatch();
    let status = response.status();
    let value = response.into_json::<Value>().expect("json body");
    (status, value)
}

fn assert_error(
    value: Value,
    kind: &str,
) {
    let body: ErrorBody = serde_json::from_value(value).expect("error body");
    assert_eq!(body.error, kind);
    assert!(!body.message.is_empty());
}

#[test]
fn test_kidney_route_returns_diagnosis() {
    let models_dir = tempfile::tempdir().unwrap();
    common::write_model(models_dir.path(), ModelId::Kidney);
    let client = client(models_dir.path());
    let body = json!({ "image": png_payload() }).to_string();

    let (status, first) = post_json(&client, "/kidney", body.clone());
    assert_eq!(status, Status::Ok);
    let diagnosis = first["diagnosis"].as_str().unwrap();
    assert!(ModelId::Kidney.labels().contains(&diagnosis));
    let confidence = first["confidence"].as_f64().unwrap();
    assert!(confidence > 0.0 && confidence <= 1.0);

    let (status, second) = post_json(&client, "/predict/kidney_diagnose", body);
    assert_eq!(status, Status::Ok);
    assert_eq!(first, second);
}

#[test]
fn test_chest_route_uses_chest_labels() {
    let models_dir = tempfile::tempdir().unwrap();
    common::write_model(models_dir.path(), ModelId::Chest);
    let client = client(models_dir.path());

    let (status, value) = post_json(
        &client,
        "/chest",
        json!({ "image": png_payload() }).to_string(),
    );
    assert_eq!(status, Status::Ok);
    let diagnosis = value["diagnosis"].as_str().unwrap();
    assert!(ModelId::Chest.labels().contains(&diagnosis));
}

#[test]
fn test_invalid_base64_is_bad_request() {
    let models_dir = tempfile::tempdir().unwrap();
    let client = client(models_dir.path());
    let (status, value) = post_json(
        &client,
        "/kidney",
        json!({ "image": "%%% not base64 %%%" }).to_string(),
    );
    assert_eq!(status, Status::BadRequest);
    assert_error(value, "invalid_base64");
}

#[test]
fn test_undecodable_image_is_bad_request() {
    let models_dir = tempfile::tempdir().unwrap();
    let client = client(models_dir.path());
    let (status, value) = post_json(
        &client,
        "/chest",
        json!({ "image": STANDARD.encode(b"definitely not an image") })
            .to_string(),
    );
    assert_eq!(status, Status::BadRequest);
    assert_error(value, "unsupported_image");
}

#[test]
fn test_unknown_model_is_not_found() {
    let models_dir = tempfile::tempdir().unwrap();
    let client = client(models_dir.path());
    let (status, value) = post_json(
        &client,
        "/predict/lung",
        json!({ "image": png_payload() }).to_string(),
    );
    assert_eq!(status, Status::NotFound);
    assert_error(value, "unknown_model");
}

#[test]
fn test_missing_weights_are_service_unavailable() {
    let models_dir = tempfile::tempdir().unwrap();
    let client = client(models_dir.path());
    let (status, value) = post_json(
        &client,
        "/kidney",
        json!({ "image": png_payload() }).to_string(),
    );
    assert_eq!(status, Status::ServiceUnavailable);
    assert_error(value, "model_load");
}

#[test]
fn test_malformed_bodies_keep_error_shape() {
    let models_dir = tempfile::tempdir().unwrap();
    let client = client(models_dir.path());

    let (status, value) =
        post_json(&client, "/kidney", "{\"image\":".to_string());
    assert_eq!(status, Status::BadRequest);
    assert_error(value, "bad_request");

    let (status, value) =
        post_json(&client, "/kidney", json!({ "picture": "" }).to_string());
    assert_eq!(status, Status::UnprocessableEntity);
    assert_error(value, "unprocessable_entity");

    let response = client.get("/lungs").dispatch();
    assert_eq!(response.status(), Status::NotFound);
    assert_error(response.into_json::<Value>().unwrap(), "not_found");
}

#[test]
fn test_models_route_reports_loaded_models() {
    let models_dir = tempfile::tempdir().unwrap();
    common::write_model(models_dir.path(), ModelId::Kidney);
    let client = client(models_dir.path());

    let models: Value = client.get("/models").dispatch().into_json().unwrap();
    assert_eq!(models[0]["name"], "kidney");
    assert_eq!(models[0]["loaded"], false);
    assert_eq!(models[1]["name"], "chest");
    assert_eq!(models[1]["labels"].as_array().unwrap().len(), 4);

    let (status, _) = post_json(
        &client,
        "/kidney",
        json!({ "image": png_payload() }).to_string(),
    );
    assert_eq!(status, Status::Ok);

    let models: Value = client.get("/models").dispatch().into_json().unwrap();
    assert_eq!(models[0]["loaded"], true);
    assert_eq!(models[1]["loaded"], false);
}

struct SlowNetwork;

impl Network for SlowNetwork {
    fn name(&self) -> &str {
        "slow"
    }

    fn input_shape(&self) -> &[usize] {
        &[1, 150, 150, 3]
    }

    fn num_outputs(&self) -> usize {
        4
    }

    fn forward(
        &self,
        _input: ArrayViewD<'_, f32>,
    ) -> Result<Box<[f32]>> {
        thread::sleep(Duration::from_millis(500));
        Ok(vec![0.25; 4].into())
    }
}

#[test]
fn test_slow_prediction_times_out() {
    let models_dir = tempfile::tempdir().unwrap();
    let resolver = Arc::new(ModelResolver::new(models_dir.path()));
    resolver.register(ModelId::Kidney, Arc::new(SlowNetwork)).unwrap();
    let client = client_with(resolver, Duration::from_millis(50));

    let (status, value) = post_json(
        &client,
        "/kidney",
        json!({ "image": png_payload() }).to_string(),
    );
    assert_eq!(status, Status::GatewayTimeout);
    assert_error(value, "timeout");
}

#[test]
fn test_oversized_body_is_rejected() {
    let models_dir = tempfile::tempdir().unwrap();
    let resolver = Arc::new(ModelResolver::new(models_dir.path()));
    let config = ServerConfig {
        models_dir: models_dir.path().to_path_buf(),
        body_limit_mib: 1,
        ..ServerConfig::default()
    };
    let client =
        Client::tracked(build_rocket(&config, resolver)).expect("valid rocket");

    let image = "A".repeat(2 << 20);
    let (status, value) =
        post_json(&client, "/kidney", json!({ "image": image }).to_string());
    assert_eq!(status, Status::PayloadTooLarge);
    assert_error(value, "payload_too_large");
}

#[test]
fn test_eager_start_fails_on_missing_weights() {
    let models_dir = tempfile::tempdir().unwrap();
    common::write_model(models_dir.path(), ModelId::Kidney);

    let resolver = ModelResolver::new(models_dir.path());
    let error = load_models(&resolver, &ModelId::ALL).unwrap_err();
    assert!(matches!(
        error,
        ctdiag::Error::ModelLoad {
            model: ModelId::Chest,
            ..
        }
    ));
    assert!(resolver.is_loaded(ModelId::Kidney));

    let error = handle_serve(ServerConfig {
        models_dir: models_dir.path().to_path_buf(),
        eager: true,
        ..ServerConfig::default()
    })
    .unwrap_err();
    assert!(matches!(
        error,
        CliError::Diagnosis(ctdiag::Error::ModelLoad {
            model: ModelId::Chest,
            ..
        })
    ));
}
