mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, read_json, TestApp};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
struct FolderTypes {
    folder_id: Uuid,
    document_types: Vec<FolderType>,
}

#[derive(Deserialize)]
struct FolderType {
    document_type: TypeInfo,
    file_count: i64,
}

#[derive(Deserialize)]
struct TypeInfo {
    code: String,
}

#[derive(Deserialize)]
struct FolderDocuments {
    documents: Vec<DocSummary>,
}

#[derive(Deserialize)]
struct DocSummary {
    id: Uuid,
    employee_id: Uuid,
    is_not_applicable: bool,
}

#[tokio::test]
async fn folder_projections_count_and_filter() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let tenant = app.tenant().await?;
    let other_employee = Uuid::new_v4();

    let certificates = app
        .create_type(
            &tenant.admin_token,
            json!({
                "code": "CERT",
                "name": "Certificates",
                "folder_id": tenant.folder_id,
                "allow_multiple": true,
                "allow_not_applicable": true
            }),
        )
        .await?;
    let cert_id = certificates["id"].as_str().unwrap_or_default().to_string();
    app.create_type(
        &tenant.admin_token,
        json!({ "code": "ID", "name": "Identity card", "folder_id": tenant.folder_id }),
    )
    .await?;

    for (employee, name) in [
        (tenant.employee_id, "cert-1.pdf"),
        (tenant.employee_id, "cert-2.pdf"),
        (other_employee, "cert-3.pdf"),
    ] {
        let (status, _) = app
            .upload(&tenant.admin_token, employee, &cert_id, name, json!({}))
            .await?;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = app
        .upload(
            &tenant.admin_token,
            other_employee,
            &cert_id,
            "none.pdf",
            json!({ "is_not_applicable": true, "not_applicable_reason": "No certifications" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let response = app
        .get(
            &format!("/api/folders/{}/document-types", tenant.folder_id),
            Some(&tenant.admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let (_, body) = read_json(response).await?;
    let summary: FolderTypes = serde_json::from_value(body)?;
    assert_eq!(summary.folder_id, tenant.folder_id);
    let counts: Vec<(String, i64)> = summary
        .document_types
        .into_iter()
        .map(|t| (t.document_type.code, t.file_count))
        .collect();
    assert_eq!(
        counts,
        vec![("CERT".to_string(), 3), ("ID".to_string(), 0)]
    );

    let response = app
        .get(
            &format!(
                "/api/folders/{}/documents?employee_id={}",
                tenant.folder_id, other_employee
            ),
            Some(&tenant.admin_token),
        )
        .await?;
    let (_, body) = read_json(response).await?;
    let listed: FolderDocuments = serde_json::from_value(body)?;
    assert_eq!(listed.documents.len(), 2);
    assert!(listed.documents.iter().all(|d| d.employee_id == other_employee));

    let response = app
        .get(
            &format!(
                "/api/folders/{}/documents?not_applicable=true",
                tenant.folder_id
            ),
            Some(&tenant.admin_token),
        )
        .await?;
    let (_, body) = read_json(response).await?;
    let listed: FolderDocuments = serde_json::from_value(body)?;
    assert_eq!(listed.documents.len(), 1);
    assert!(listed.documents[0].is_not_applicable);

    let deactivate = format!("/api/documents/{}", listed.documents[0].id);
    let response = app
        .patch_json(&deactivate, &json!({ "is_active": false }), Some(&tenant.admin_token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .get(
            &format!("/api/folders/{}/documents", tenant.folder_id),
            Some(&tenant.admin_token),
        )
        .await?;
    let (_, body) = read_json(response).await?;
    let listed: FolderDocuments = serde_json::from_value(body)?;
    assert_eq!(listed.documents.len(), 3);

    let response = app
        .get(
            &format!("/api/folders/{}/documents?include_inactive=true", tenant.folder_id),
            Some(&tenant.admin_token),
        )
        .await?;
    let (_, body) = read_json(response).await?;
    let listed: FolderDocuments = serde_json::from_value(body)?;
    assert_eq!(listed.documents.len(), 4);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn folder_projections_are_tenant_scoped() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let tenant = app.tenant().await?;
    let outsider = app.tenant().await?;

    let response = app
        .get(
            &format!("/api/folders/{}/document-types", tenant.folder_id),
            Some(&outsider.admin_token),
        )
        .await?;
    let (status, body) = read_json(response).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "folder_not_found");

    let response = app
        .get(
            &format!("/api/folders/{}/documents", tenant.folder_id),
            Some(&tenant.employee_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}
