use std::env;

use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use doc_compliance::auth::jwt::JwtService;
use doc_compliance::config::AppConfig;
use doc_compliance::db::{self, PgPool};
use doc_compliance::lifecycle::DocumentEngine;
use doc_compliance::models::NewFolder;
use doc_compliance::policy::MandatoryGuard;
use doc_compliance::routes;
use doc_compliance::state::AppState;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

/// A company with an administrator and one employee, both holding tokens.
#[allow(dead_code)]
pub struct Tenant {
    pub company_id: Uuid,
    pub admin_id: Uuid,
    pub admin_token: String,
    pub employee_id: Uuid,
    pub employee_token: String,
    pub folder_id: Uuid,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_guard(MandatoryGuard::Strict).await
    }

    pub async fn with_guard(guard: MandatoryGuard) -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url,
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
            mandatory_guard: guard,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let jwt = JwtService::from_config(&config)?;
        let engine = DocumentEngine::with_table_audit(config.mandatory_guard);
        let state = AppState::new(pool, config, jwt, engine);
        let router = routes::create_router(state.clone());

        Ok(Self { state, router })
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(truncate_all).await
    }

    pub fn token(&self, user_id: Uuid, company_id: Uuid, role: &str) -> Result<String> {
        self.state.jwt.generate_token(user_id, company_id, role)
    }

    pub async fn insert_folder(&self, company_id: Uuid, name: &str) -> Result<Uuid> {
        let folder = NewFolder {
            id: Uuid::new_v4(),
            company_id,
            name: name.to_string(),
        };
        self.with_conn(move |conn| {
            diesel::insert_into(doc_compliance::schema::folders::table)
                .values(&folder)
                .execute(conn)
                .context("failed to insert folder")?;
            Ok(folder.id)
        })
        .await
    }

    pub async fn tenant(&self) -> Result<Tenant> {
        let company_id = Uuid::new_v4();
        let admin_id = Uuid::new_v4();
        let employee_id = Uuid::new_v4();
        let folder_id = self.insert_folder(company_id, "Identity").await?;
        Ok(Tenant {
            company_id,
            admin_id,
            admin_token: self.token(admin_id, company_id, "hr_admin")?,
            employee_id,
            employee_token: self.token(employee_id, company_id, "employee")?,
            folder_id,
        })
    }

    /// Creates a document type through the API and returns its JSON.
    #[allow(dead_code)]
    pub async fn create_type(&self, token: &str, body: Value) -> Result<Value> {
        let response = self.post_json("/api/document-types", &body, Some(token)).await?;
        let (status, body) = read_json(response).await?;
        anyhow::ensure!(
            status == StatusCode::CREATED,
            "document type creation failed with {status}: {body}"
        );
        Ok(body["document_type"].clone())
    }

    /// Uploads a document through the API and returns status and body.
    #[allow(dead_code)]
    pub async fn upload(
        &self,
        token: &str,
        employee_id: Uuid,
        type_id: &str,
        file_name: &str,
        extra: Value,
    ) -> Result<(StatusCode, Value)> {
        let mut body = json!({
            "employee_id": employee_id,
            "document_type_id": type_id,
            "file": {
                "file_name": file_name,
                "file_path": format!("employees/{employee_id}/{file_name}"),
                "file_size_bytes": 1024,
            },
        });
        merge(&mut body, extra);
        let response = self.post_json("/api/documents", &body, Some(token)).await?;
        read_json(response).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send_empty(Method::GET, path, token).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send_empty(Method::DELETE, path, token).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn send_empty(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

/// Status plus parsed JSON body; an empty body reads as `null`.
pub async fn read_json(response: hyper::Response<Body>) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let bytes = body_to_vec(response.into_body()).await?;
    if bytes.is_empty() {
        return Ok((status, Value::Null));
    }
    let value = serde_json::from_slice(&bytes)
        .with_context(|| format!("response body is not JSON: {}", String::from_utf8_lossy(&bytes)))?;
    Ok((status, value))
}

fn merge(target: &mut Value, extra: Value) {
    if let (Some(target), Value::Object(extra)) = (target.as_object_mut(), extra) {
        for (key, value) in extra {
            target.insert(key, value);
        }
    }
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        db::run_migrations(&mut conn)?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE document_audit_events, employee_document_field_values, employee_documents, document_fields, document_types, folders RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
