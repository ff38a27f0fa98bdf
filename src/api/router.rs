//! Router assembly and the server loop.

use super::{
    AppState,
    handlers::{self, config, registry, upload},
};
use crate::{
    config::ServerConfig,
    errors::{Error, Result},
    store::AnyStore,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

/// Builds the full application router.
///
/// Upload routes get the configured body limit; `/uploads/**` serves the
/// upload root verbatim.
pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.uploads_dir);

    let upload_routes = Router::new()
        .route("/upload", post(upload::upload_model))
        .route("/upload-shop", post(upload::upload_shop))
        .route("/upload-product", post(upload::upload_product))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    Router::new()
        .merge(upload_routes)
        .route("/model-info", get(registry::model_info))
        .route("/shop-model", get(registry::shop_model))
        .route("/models", get(registry::models))
        .route("/products", get(registry::products))
        .route("/save-layout", post(registry::save_layout))
        .route("/save-config", post(config::save_config))
        .route("/get-config", get(config::get_config))
        .route("/health", get(handlers::health))
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Binds the configured address and serves until Ctrl-C.
///
/// # Errors
/// Returns `Error::Server` when the address cannot be bound, or an I/O error
/// from the server loop.
pub async fn serve(config: ServerConfig, store: AnyStore) -> Result<()> {
    let addr = config.bind_addr();
    let app = router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server {
            message: format!("Failed to bind {addr}: {e}"),
        })?;
    info!("Server is running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        models::{MeshActionConfig, ModelEntry, ModelInfo, Vec3Triple},
        test_utils::*,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(app: &Router, uri: &str, payload: &Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_multipart(app: &Router, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let (content_type, body) = multipart_body(parts);
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_upload_without_bin_is_rejected_and_creates_nothing() {
        let (dir, app) = setup_test_app();
        let (status, body) = post_multipart(
            &app,
            "/upload",
            &[
                Part::text("name", "chair"),
                Part::file("gltf", "chair.gltf", b"{}"),
                Part::file("textures", "wood_baseColor.png", b"png"),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Both GLTF and BIN files are required");
        assert!(!dir.path().join("uploads").join("chair").exists());
    }

    #[tokio::test]
    async fn test_chair_upload_then_model_info() {
        let (dir, app) = setup_test_app();
        let (status, body) = post_multipart(
            &app,
            "/upload",
            &[
                Part::text("name", "chair"),
                Part::file("gltf", "chair.gltf", b"{\"asset\":{}}"),
                Part::file("bin", "chair.bin", b"\x00\x01"),
                Part::file("textures", "wood_baseColor.png", b"png"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Files uploaded successfully",
                "gltfFile": "chair.gltf",
                "binFile": "chair.bin",
                "textureFiles": ["wood_baseColor.png"]
            })
        );

        let (status, info) = get_json(&app, "/model-info?name=chair").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            info,
            json!({
                "gltfFile": "chair.gltf",
                "binFile": "chair.bin",
                "textures": ["wood_baseColor.png"]
            })
        );
        assert!(
            dir.path()
                .join("uploads/chair/textures/wood_baseColor.png")
                .exists()
        );
    }

    #[tokio::test]
    async fn test_texture_order_survives_round_trip() {
        let (_dir, app) = setup_test_app();
        let (status, _) = post_multipart(
            &app,
            "/upload",
            &[
                Part::file("gltf", "m.gltf", b"{}"),
                Part::file("bin", "m.bin", b"0"),
                Part::file("textures", "z_normal.png", b"1"),
                Part::file("textures", "a_baseColor.png", b"2"),
                Part::file("textures", "m_metallicRoughness.png", b"3"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, info) = get_json(&app, "/model-info").await;
        let info: ModelInfo = serde_json::from_value(info).unwrap();
        assert_eq!(
            info.textures,
            vec!["z_normal.png", "a_baseColor.png", "m_metallicRoughness.png"]
        );
    }

    #[tokio::test]
    async fn test_model_info_missing_is_not_found() {
        let (_dir, app) = setup_test_app();
        let (status, body) = get_json(&app, "/model-info").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Some model files are missing");

        let (status, _) = get_json(&app, "/shop-model").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_json(&app, "/model-info?name=..%2Fetc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_shop_upload_and_static_serving() {
        let (_dir, app) = setup_test_app();
        let (status, body) = post_multipart(
            &app,
            "/upload-shop",
            &[
                Part::file("shop", "store.gltf", b"{\"scene\":0}"),
                Part::file("shop", "store.bin", b"bytes"),
                Part::file("shopTextures", "floor_baseColor.jpg", b"jpg"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gltfFile"], "store.gltf");
        assert_eq!(body["binFile"], "store.bin");

        let (status, info) = get_json(&app, "/shop-model").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(info["textures"], json!(["floor_baseColor.jpg"]));

        let request = Request::get("/uploads/shop/store.gltf")
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"{\"scene\":0}");

        let request = Request::get("/uploads/shop/textures/floor_baseColor.jpg")
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"jpg");
    }

    #[tokio::test]
    async fn test_models_lists_every_upload() {
        let (_dir, app) = setup_test_app();
        let (status, listed) = get_json(&app, "/models").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, json!([]));

        post_multipart(
            &app,
            "/upload-shop",
            &[
                Part::file("shop", "store.gltf", b"{}"),
                Part::file("shop", "store.bin", b"bytes"),
            ],
        )
        .await;
        post_multipart(
            &app,
            "/upload",
            &[
                Part::text("name", "chair"),
                Part::file("gltf", "chair.gltf", b"{}"),
                Part::file("bin", "chair.bin", b"bin"),
                Part::file("textures", "wood_baseColor.png", b"png"),
            ],
        )
        .await;

        let (status, listed) = get_json(&app, "/models").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            listed,
            json!([
                {
                    "name": "chair",
                    "gltfFile": "chair.gltf",
                    "binFile": "chair.bin",
                    "textures": ["wood_baseColor.png"]
                },
                {
                    "name": "shop",
                    "gltfFile": "store.gltf",
                    "binFile": "store.bin",
                    "textures": []
                }
            ])
        );
    }

    #[tokio::test]
    async fn test_product_upload_registers_product() {
        let (_dir, app) = setup_test_app();
        let (status, body) = post_multipart(
            &app,
            "/upload-product",
            &[
                Part::text("productName", "chair"),
                Part::file("product", "chair.gltf", b"{}"),
                Part::file("productBin", "chair.bin", b"0"),
                Part::file("productTextures", "wood_baseColor.png", b"png"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Product uploaded successfully");
        assert_eq!(
            body["product"],
            json!({
                "name": "chair",
                "gltfFile": "chair.gltf",
                "binFile": "chair.bin",
                "textureFiles": ["wood_baseColor.png"],
                "position": {"x": 0.0, "y": 0.0, "z": 0.0},
                "scale": {"x": 1.0, "y": 1.0, "z": 1.0}
            })
        );

        let (status, products) = get_json(&app, "/products").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(products, json!([body["product"]]));
    }

    #[tokio::test]
    async fn test_product_upload_rejects_reserved_and_unsafe_names() {
        let (dir, app) = setup_test_app();
        for name in ["shop", "../escape", ""] {
            let (status, _) = post_multipart(
                &app,
                "/upload-product",
                &[
                    Part::text("productName", name),
                    Part::file("product", "p.gltf", b"{}"),
                    Part::file("productBin", "p.bin", b"0"),
                ],
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "name {name:?}");
        }
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_texture_limit_is_enforced() {
        let (_dir, app) = setup_test_app();
        let names: Vec<String> = (0..11).map(|i| format!("t{i}.png")).collect();
        let mut parts = vec![
            Part::file("gltf", "m.gltf", b"{}"),
            Part::file("bin", "m.bin", b"0"),
        ];
        parts.extend(names.iter().map(|n| Part::file("textures", n, b"x")));

        let (status, body) = post_multipart(&app, "/upload", &parts).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("at most 10"));
    }

    #[tokio::test]
    async fn test_save_layout_round_trip() {
        let (_dir, app) = setup_test_app();
        let layout = vec![
            test_entry("sofa", Vec3Triple::new(1.0, 0.0, 2.0)),
            ModelEntry {
                table_number: Some(4),
                scale: Vec3Triple::splat(0.5),
                ..test_entry("chair", Vec3Triple::new(-1.0, 0.0, 0.5))
            },
        ];
        let (status, body) =
            post_json(&app, "/save-layout", &serde_json::to_value(&layout).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);

        let (status, products) = get_json(&app, "/products").await;
        assert_eq!(status, StatusCode::OK);
        let products: Vec<ModelEntry> = serde_json::from_value(products).unwrap();
        assert_eq!(products, layout);
    }

    #[tokio::test]
    async fn test_save_layout_rejects_bad_body() {
        let (_dir, app) = setup_test_app();
        let (status, body) = post_json(&app, "/save-layout", &json!({"not": "a list"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let (_dir, app) = setup_test_app();
        let (status, empty) = get_json(&app, "/get-config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(empty, json!({}));

        let payload = json!({
            "Chair_Seat": {"hover": "highlight", "click": "Add to cart"},
            "MeshNotInScene": {"click": "Show details"}
        });
        let (status, body) = post_json(&app, "/save-config", &payload).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);

        let (_, stored) = get_json(&app, "/get-config").await;
        assert_eq!(stored, payload);
        let typed: MeshActionConfig = serde_json::from_value(stored).unwrap();
        assert_eq!(typed.len(), 2);
    }

    #[tokio::test]
    async fn test_save_config_rejects_empty_or_non_mapping() {
        let (_dir, app) = setup_test_app();
        let (status, body) = post_json(&app, "/save-config", &json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid configuration data");

        let (status, _) = post_json(&app, "/save-config", &json!(["Chair_Seat"])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_and_cors() {
        let (_dir, app) = setup_test_app();
        let request = Request::get("/health")
            .header(header::ORIGIN, "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }

    #[tokio::test]
    async fn test_sqlite_backend_serves_same_api() {
        let store = setup_sqlite_store().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let app = router(AppState::new(
            AnyStore::Sqlite(store),
            ServerConfig::rooted_at(dir.path()),
        ));

        let (status, _) = post_json(&app, "/save-config", &json!({"Door": {"click": "Open"}})).await;
        assert_eq!(status, StatusCode::OK);
        let (_, stored) = get_json(&app, "/get-config").await;
        assert_eq!(stored, json!({"Door": {"click": "Open"}}));
    }
}
