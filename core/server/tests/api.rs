//! Admin API routes over an in-memory store and fake storage backends.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use projectdrive_common::{
    Error, ExportLink, FolderRef, ProjectCode, Provider, Result, SecretString,
};
use projectdrive_projects::{
    MemoryProjectStore, Project, ProjectStore, ProvisioningService, StorageRecord,
};
use projectdrive_server::{router, AppState, JwtAdminVerifier};
use projectdrive_storage::{
    ManualClock, ProjectStorage, ProjectTree, RevokeTarget, StorageRegistry, EXPORT_FOLDER,
};

const SECRET: &str = "route-test-secret";

/// Storage backend that keeps links in memory and counts calls.
struct FakeStorage {
    provider: Provider,
    links: Mutex<HashMap<String, ExportLink>>,
    link_creates: Mutex<usize>,
    revokes: Mutex<usize>,
}

impl FakeStorage {
    fn new(provider: Provider) -> Self {
        Self {
            provider,
            links: Mutex::new(HashMap::new()),
            link_creates: Mutex::new(0),
            revokes: Mutex::new(0),
        }
    }
}

#[async_trait]
impl ProjectStorage for FakeStorage {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn create_project_tree(&self, code: &ProjectCode) -> Result<ProjectTree> {
        Ok(match self.provider {
            Provider::Dropbox => ProjectTree {
                root: FolderRef::new(format!("/{}", code)),
                export: FolderRef::new(format!("/{}/{}", code, EXPORT_FOLDER)),
            },
            Provider::Gdrive => ProjectTree {
                root: FolderRef::new(format!("root-{}", code)),
                export: FolderRef::new(format!("export-{}", code)),
            },
        })
    }

    async fn get_or_create_export_link(&self, folder: &FolderRef) -> Result<ExportLink> {
        let mut links = self.links.lock().unwrap();
        if let Some(link) = links.get(folder.as_str()) {
            return Ok(link.clone());
        }
        let n = {
            let mut creates = self.link_creates.lock().unwrap();
            *creates += 1;
            *creates
        };
        let link = match self.provider {
            Provider::Dropbox => ExportLink {
                url: format!("https://www.dropbox.com/scl/fo/{}/export?dl=0", n),
                id: Some(format!("id:link{}", n)),
            },
            Provider::Gdrive => ExportLink {
                url: format!("https://drive.google.com/drive/folders/{}", folder),
                id: None,
            },
        };
        links.insert(folder.to_string(), link.clone());
        Ok(link)
    }

    async fn revoke_export_link(&self, target: &RevokeTarget) -> Result<()> {
        self.links.lock().unwrap().remove(target.folder.as_str());
        *self.revokes.lock().unwrap() += 1;
        Ok(())
    }
}

struct TestApp {
    app: Router,
    store: Arc<MemoryProjectStore>,
    dropbox: Arc<FakeStorage>,
    gdrive: Arc<FakeStorage>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryProjectStore::new());
    let dropbox = Arc::new(FakeStorage::new(Provider::Dropbox));
    let gdrive = Arc::new(FakeStorage::new(Provider::Gdrive));

    let mut registry = StorageRegistry::new();
    registry.register(dropbox.clone()).unwrap();
    registry.register(gdrive.clone()).unwrap();

    let service = ProvisioningService::new(
        store.clone(),
        Arc::new(registry),
        Arc::new(ManualClock::new(Utc::now())),
    );
    let state = AppState::new(
        Arc::new(service),
        Arc::new(JwtAdminVerifier::new(&SecretString::from(SECRET.to_string()))),
    );

    TestApp {
        app: router(state),
        store,
        dropbox,
        gdrive,
    }
}

fn admin_token() -> String {
    sign(json!({
        "sub": "uid-1",
        "email": "ana@studio.example",
        "admin": true,
        "exp": Utc::now().timestamp() + 600
    }))
}

fn sign(claims: Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn boda_ana() -> Value {
    json!({ "eventName": "Boda Ana", "eventDate": "2025-06-15" })
}

#[tokio::test]
async fn test_create_requires_admin_token() {
    let t = test_app();

    let (status, body) =
        send(&t.app, Method::POST, "/admin/projects", None, Some(boda_ana())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("Authorization"));

    let not_admin = sign(json!({ "sub": "uid-2", "exp": Utc::now().timestamp() + 600 }));
    let (status, _) = send(
        &t.app,
        Method::POST,
        "/admin/projects",
        Some(&not_admin),
        Some(boda_ana()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/admin/projects",
        Some("garbage"),
        Some(boda_ana()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_defaults_to_gdrive() {
    let t = test_app();
    let token = admin_token();

    let (status, body) =
        send(&t.app, Method::POST, "/admin/projects", Some(&token), Some(boda_ana())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["projectCode"], "VX001_boda-ana_2025-06-15");
    assert_eq!(body["storage"]["provider"], "gdrive");
    assert_eq!(body["storage"]["rootId"], "root-VX001_boda-ana_2025-06-15");
    assert_eq!(body["audit"][1]["action"], "gdrive_tree_created");
    assert_eq!(body["audit"][0]["by"], "ana@studio.example");
}

#[tokio::test]
async fn test_create_dropbox_project_scenario() {
    let t = test_app();
    let token = admin_token();

    let mut request = boda_ana();
    request["provider"] = json!("dropbox");
    let (status, body) =
        send(&t.app, Method::POST, "/admin/projects", Some(&token), Some(request)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["storage"]["provider"], "dropbox");
    assert_eq!(body["storage"]["rootPath"], "/VX001_boda-ana_2025-06-15");
    let audit = body["audit"].as_array().unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0]["action"], "create");
    assert_eq!(audit[1]["action"], "dropbox_tree_created");
}

#[tokio::test]
async fn test_legacy_dropbox_route() {
    let t = test_app();
    let token = admin_token();

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/admin/projects/dropbox",
        Some(&token),
        Some(boda_ana()),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["storage"]["provider"], "dropbox");
}

#[tokio::test]
async fn test_invalid_date_is_bad_request() {
    let t = test_app();
    let token = admin_token();

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/admin/projects",
        Some(&token),
        Some(json!({ "eventName": "Boda Ana", "eventDate": "mañana" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));
}

#[tokio::test]
async fn test_malformed_body_uses_error_contract() {
    let t = test_app();
    let token = admin_token();

    let mut request = boda_ana();
    request["provider"] = json!("onedrive");
    let (status, body) =
        send(&t.app, Method::POST, "/admin/projects", Some(&token), Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("onedrive"));

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/admin/projects/dropbox",
        Some(&token),
        Some(json!({ "eventName": "Boda Ana" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("eventDate"));

    let code = ProjectCode::new("VX001_boda-ana_2025-06-15").unwrap();
    assert!(!t.store.exists(&code).await.unwrap());
}

#[tokio::test]
async fn test_get_project() {
    let t = test_app();
    let token = admin_token();
    send(&t.app, Method::POST, "/admin/projects", Some(&token), Some(boda_ana())).await;

    let (status, body) = send(
        &t.app,
        Method::GET,
        "/admin/projects/VX001_boda-ana_2025-06-15",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eventName"], "Boda Ana");

    let (status, _) = send(
        &t.app,
        Method::GET,
        "/admin/projects/VX404_nobody_2025-01-01",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gdrive_link_lifecycle() {
    let t = test_app();
    let token = admin_token();
    send(&t.app, Method::POST, "/admin/projects", Some(&token), Some(boda_ana())).await;
    let uri = "/admin/projects/VX001_boda-ana_2025-06-15/link";

    let (status, first) = send(&t.app, Method::POST, uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        first["exportLink"],
        "https://drive.google.com/drive/folders/export-VX001_boda-ana_2025-06-15"
    );
    assert!(first.get("exportLinkId").is_none());

    let (_, second) = send(&t.app, Method::POST, uri, Some(&token), None).await;
    assert_eq!(first["exportLink"], second["exportLink"]);
    assert_eq!(*t.gdrive.link_creates.lock().unwrap(), 1);

    let (status, revoked) = send(&t.app, Method::DELETE, uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(revoked["storage"].get("exportLink").is_none());
    assert_eq!(revoked["audit"].as_array().unwrap().len(), 5);

    let (status, body) = send(&t.app, Method::DELETE, uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no active export link"));
    assert_eq!(*t.gdrive.revokes.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_dropbox_link_lifecycle() {
    let t = test_app();
    let token = admin_token();
    send(
        &t.app,
        Method::POST,
        "/admin/projects/dropbox",
        Some(&token),
        Some(boda_ana()),
    )
    .await;
    let uri = "/admin/projects/VX001_boda-ana_2025-06-15/link/dropbox";

    let (status, link) = send(&t.app, Method::POST, uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(link["provider"], "dropbox");
    assert_eq!(link["exportLinkId"], "id:link1");

    let code = ProjectCode::new("VX001_boda-ana_2025-06-15").unwrap();
    let stored = t.store.get(&code).await.unwrap();
    assert_eq!(
        stored.storage.export_link().and_then(|l| l.id).as_deref(),
        Some("id:link1")
    );

    let (status, _) = send(&t.app, Method::DELETE, uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(*t.dropbox.revokes.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_link_route_for_other_provider_is_rejected() {
    let t = test_app();
    let token = admin_token();
    send(&t.app, Method::POST, "/admin/projects", Some(&token), Some(boda_ana())).await;

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/admin/projects/VX001_boda-ana_2025-06-15/link/dropbox",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(*t.dropbox.link_creates.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_link_for_missing_project_is_not_found() {
    let t = test_app();
    let token = admin_token();

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/admin/projects/VX404_nobody_2025-01-01/link",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_link_without_export_reference_is_bad_request() {
    let t = test_app();
    let token = admin_token();
    let code = ProjectCode::new("VX001_legacy_2024-01-01").unwrap();
    t.store
        .create(&Project {
            project_code: code,
            event_name: "Legacy".to_string(),
            event_date: "2024-01-01".to_string(),
            storage: StorageRecord::Gdrive {
                root_id: "root-legacy".to_string(),
                export_id: None,
                export_link: None,
            },
            audit: Vec::new(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/admin/projects/VX001_legacy_2024-01-01/link",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("missing export folder reference"));
}

#[tokio::test]
async fn test_health_lists_available_providers() {
    let t = test_app();
    let (status, body) = send(&t.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["providers"], json!(["dropbox", "gdrive"]));
}

#[tokio::test]
async fn test_provider_failure_is_server_error() {
    struct Broken;

    #[async_trait]
    impl ProjectStorage for Broken {
        fn provider(&self) -> Provider {
            Provider::Dropbox
        }
        async fn create_project_tree(&self, _code: &ProjectCode) -> Result<ProjectTree> {
            Err(Error::Provider {
                provider: Provider::Dropbox,
                status: 400,
                message: r#"{"error_summary": "path/malformed_path/"}"#.to_string(),
            })
        }
        async fn get_or_create_export_link(&self, _folder: &FolderRef) -> Result<ExportLink> {
            unreachable!()
        }
        async fn revoke_export_link(&self, _target: &RevokeTarget) -> Result<()> {
            unreachable!()
        }
    }

    let store = Arc::new(MemoryProjectStore::new());
    let mut registry = StorageRegistry::new();
    registry.register(Arc::new(Broken)).unwrap();
    let service = ProvisioningService::new(
        store.clone(),
        Arc::new(registry),
        Arc::new(ManualClock::new(Utc::now())),
    );
    let app = router(AppState::new(
        Arc::new(service),
        Arc::new(JwtAdminVerifier::new(&SecretString::from(SECRET.to_string()))),
    ));

    let (status, body) = send(
        &app,
        Method::POST,
        "/admin/projects/dropbox",
        Some(&admin_token()),
        Some(boda_ana()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("path/malformed_path/"));
    let code = ProjectCode::new("VX001_boda-ana_2025-06-15").unwrap();
    assert!(!store.exists(&code).await.unwrap());
}
