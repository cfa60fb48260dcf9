//! ---
//! brew_section: "15-testing-qa-runbook"
//! brew_subsection: "integration-tests"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "End-to-end checks of the shell API over HTTP."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use brewops_access::{MenuDescriptor, Navigator, RouteTable, RouteTarget, SessionStore};
use brewops_api::{spawn_api_server, ApiServer, ApiState};
use brewops_common::AccessConfig;
use parking_lot::Mutex;
use prometheus::Registry;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

#[derive(Default)]
struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, location: &str) {
        self.visits.lock().push(location.to_owned());
    }
}

struct Harness {
    server: ApiServer,
    base: String,
    client: Client,
    navigator: Arc<RecordingNavigator>,
}

fn start(access: AccessConfig, session: SessionStore) -> Harness {
    let menu = MenuDescriptor::brewery_default();
    let routes = RouteTable::from_menu(&menu)
        .with_overrides([("/reportes", RouteTarget::open().in_module("Reportes"))]);
    let navigator = Arc::new(RecordingNavigator::default());
    let state = ApiState::with_navigator(
        &access,
        session,
        menu,
        routes,
        Arc::new(Registry::new()),
        navigator.clone(),
    )
    .unwrap();
    let server = spawn_api_server(Arc::new(state), "127.0.0.1:0".parse().unwrap()).unwrap();
    let base = format!("http://{}", server.addr());
    Harness {
        server,
        base,
        client: Client::new(),
        navigator,
    }
}

fn login_body(role: &str) -> Value {
    json!({
        "token": "tok-42",
        "user": {
            "id": "u-42",
            "nombre": "Lucía",
            "email": "lucia@cerveceria.invalid",
            "rol": role,
            "empresa": "Cervecería del Valle",
            "permisos": [
                {"nombre": "inventario:read", "modulo": "Inventario"}
            ]
        }
    })
}

#[tokio::test]
async fn access_endpoint_reports_each_outcome() {
    let h = start(AccessConfig::default(), SessionStore::new());

    let resp = h
        .client
        .get(format!("{}/api/access", h.base))
        .query(&[("path", "/comercial/pedidos")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["decision"], "unauthenticated");
    assert_eq!(body["redirect"], "/login?redirect=%2Fcomercial%2Fpedidos");

    let resp = h
        .client
        .put(format!("{}/api/session", h.base))
        .json(&login_body("Operador"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let view: Value = resp.json().await.unwrap();
    assert_eq!(view["authenticated"], true);
    assert!(view.get("token").is_none());

    let resp = h
        .client
        .get(format!("{}/api/access", h.base))
        .query(&[("path", "/inventario/materias-primas")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = h
        .client
        .get(format!("{}/api/access", h.base))
        .query(&[("path", "/reportes/mensual")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["decision"], "denied");
    assert_eq!(
        body["notice"],
        "No tienes permisos para acceder a esta sección."
    );

    assert_eq!(
        *h.navigator.visits.lock(),
        vec!["/login?redirect=%2Fcomercial%2Fpedidos".to_string()]
    );

    let metrics = h
        .client
        .get(format!("{}/metrics", h.base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("brewops_access_decisions_total{outcome=\"denied\"} 1"));
    assert!(metrics.contains("brewops_access_decisions_total{outcome=\"allowed\"} 1"));

    h.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn navigation_includes_roles_only_for_elevated_actor() {
    let h = start(AccessConfig::default(), SessionStore::new());

    for (role, expect_roles) in [("Operador", false), ("SuperAdmin", true)] {
        h.client
            .put(format!("{}/api/session", h.base))
            .json(&login_body(role))
            .send()
            .await
            .unwrap()
            .error_for_status()
            .unwrap();
        let nav: Value = h
            .client
            .get(format!("{}/api/navigation", h.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let titles: Vec<&str> = nav["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|node| node["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles.contains(&"Roles"), expect_roles, "role {role}");
        assert!(titles.contains(&"Producción"));
        assert_eq!(nav["organization"]["name"], "Cervecería del Valle");
        assert_eq!(nav["user"]["name"], "Lucía");
    }

    h.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn logout_persists_and_redirects_the_open_view() {
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("state/session.json");
    let access = AccessConfig {
        session_file: Some(session_file.clone()),
        ..AccessConfig::default()
    };
    let h = start(access, SessionStore::new());

    h.client
        .put(format!("{}/api/session", h.base))
        .json(&login_body("Operador"))
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap();
    assert!(SessionStore::restore(&session_file).unwrap().is_authenticated());

    let resp = h
        .client
        .get(format!("{}/api/access", h.base))
        .query(&[("path", "/inventario/productos")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = h
        .client
        .delete(format!("{}/api/session", h.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(!SessionStore::restore(&session_file).unwrap().is_authenticated());

    let mut visits = Vec::new();
    for _ in 0..50 {
        visits = h.navigator.visits.lock().clone();
        if !visits.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(visits, vec!["/login?redirect=%2Finventario%2Fproductos".to_string()]);

    let session: Value = h
        .client
        .get(format!("{}/api/session", h.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session, json!({"authenticated": false}));

    h.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn routes_and_health_are_exposed() {
    let h = start(AccessConfig::default(), SessionStore::new());

    let routes: Value = h
        .client
        .get(format!("{}/api/routes", h.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(routes["/reportes"]["required_module"], "Reportes");

    let health: Value = h
        .client
        .get(format!("{}/healthz", h.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["authenticated"], false);

    let resp = h
        .client
        .put(format!("{}/api/session", h.base))
        .json(&json!({"token": " ", "user": {"id": "x", "name": "x", "email": "x"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    h.server.shutdown().await.unwrap();
}
