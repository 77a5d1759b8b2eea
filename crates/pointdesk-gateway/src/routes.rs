use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use pointdesk_core::{
    Client, ClientForm, Contract, ContractForm, DeleteCheck, DeleteTarget, Desk, EmployeeForm,
    EntityId, EntityKind, Point, PointForm, Procuration, ProcurationForm, Stored,
};
use pointdesk_platform::{
    ContractDefaults, ContractSearchQuery, EmployeeView, ListResponse, LoginRequest,
    LoginResponse, SearchQuery, SummaryReportResponse,
};
use tracing::info;

use crate::auth::{AdminUser, AuthUser, TokenSigner};
use crate::error::{ApiError, internal_error};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub desk: Desk,
    pub tokens: TokenSigner,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/login", post(login))
        .route("/me", get(me))
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/contracts", get(list_contracts).post(create_contract))
        .route("/contracts/defaults", get(contract_defaults))
        .route(
            "/contracts/{id}",
            get(get_contract).put(update_contract).delete(delete_contract),
        )
        .route("/contracts/{id}/pdf", get(contract_pdf))
        .route("/points", get(pick_points))
        .route("/employees", get(pick_employees))
        .route("/references/{entity}/{id}", get(references))
        .route(
            "/admin/employees",
            get(list_employees).post(create_employee),
        )
        .route(
            "/admin/employees/{id}",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/admin/points", get(list_points).post(create_point))
        .route(
            "/admin/points/{id}",
            get(get_point).put(update_point).delete(delete_point),
        )
        .route(
            "/admin/procurations",
            get(list_procurations).post(create_procuration),
        )
        .route(
            "/admin/procurations/{id}",
            get(get_procuration)
                .put(update_procuration)
                .delete(delete_procuration),
        )
        .route("/admin/reports/summary", get(summary_report))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let principal = state
        .desk
        .authenticate(&payload.login, &payload.password)
        .await?;
    let employee = state.desk.employee(principal.employee_id).await?;
    let (token, expires_at) = state.tokens.issue(&principal).map_err(internal_error)?;
    info!("{} signed in as {}", principal.login, principal.role);

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_at,
        employee: EmployeeView::from(&employee),
    }))
}

async fn me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<EmployeeView>> {
    let employee = state.desk.employee(user.employee_id).await?;
    Ok(Json(EmployeeView::from(&employee)))
}

async fn references(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((entity, id)): Path<(EntityKind, EntityId)>,
) -> ApiResult<Json<DeleteCheck>> {
    let check = state.desk.can_delete(DeleteTarget::new(entity, id)).await?;
    Ok(Json(check))
}

async fn list_clients(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ListResponse<Stored<Client>>>> {
    let clients = state.desk.clients(query.q.as_deref()).await?;
    Ok(Json(clients.into()))
}

async fn get_client(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<Stored<Client>>> {
    Ok(Json(state.desk.client(id).await?))
}

async fn create_client(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(form): Json<ClientForm>,
) -> ApiResult<(StatusCode, Json<Stored<Client>>)> {
    let client = state.desk.save_client(None, form).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

async fn update_client(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<EntityId>,
    Json(form): Json<ClientForm>,
) -> ApiResult<Json<Stored<Client>>> {
    Ok(Json(state.desk.save_client(Some(id), form).await?))
}

async fn delete_client(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    state.desk.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_contracts(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ContractSearchQuery>,
) -> ApiResult<Json<ListResponse<Stored<Contract>>>> {
    let contracts = state.desk.contracts(query.client.as_deref()).await?;
    Ok(Json(contracts.into()))
}

async fn contract_defaults(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ContractDefaults>> {
    let form = state.desk.blank_contract(&user).await?;
    let employee = match form.employee_id {
        Some(id) => Some(EmployeeView::from(&state.desk.employee(id).await?)),
        None => None,
    };
    Ok(Json(ContractDefaults { form, employee }))
}

async fn get_contract(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<Stored<Contract>>> {
    Ok(Json(state.desk.contract(id).await?))
}

async fn create_contract(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(form): Json<ContractForm>,
) -> ApiResult<(StatusCode, Json<Stored<Contract>>)> {
    let contract = state.desk.save_contract(None, form).await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

async fn update_contract(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<EntityId>,
    Json(form): Json<ContractForm>,
) -> ApiResult<Json<Stored<Contract>>> {
    Ok(Json(state.desk.save_contract(Some(id), form).await?))
}

async fn delete_contract(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    state.desk.delete_contract(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn contract_pdf(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<EntityId>,
) -> ApiResult<impl IntoResponse> {
    let (file_name, bytes) = state.desk.contract_pdf(id).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    Ok((headers, bytes))
}

async fn pick_points(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<ListResponse<Stored<Point>>>> {
    Ok(Json(state.desk.points(None).await?.into()))
}

async fn pick_employees(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<ListResponse<EmployeeView>>> {
    employee_list(&state.desk, None).await
}

async fn employee_list(
    desk: &Desk,
    filter: Option<&str>,
) -> ApiResult<Json<ListResponse<EmployeeView>>> {
    let employees = desk.employees(filter).await?;
    let views: Vec<EmployeeView> = employees.iter().map(EmployeeView::from).collect();
    Ok(Json(views.into()))
}

async fn list_employees(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ListResponse<EmployeeView>>> {
    employee_list(&state.desk, query.q.as_deref()).await
}

async fn get_employee(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<EmployeeView>> {
    Ok(Json(EmployeeView::from(&state.desk.employee(id).await?)))
}

async fn create_employee(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(form): Json<EmployeeForm>,
) -> ApiResult<(StatusCode, Json<EmployeeView>)> {
    let employee = state.desk.save_employee(None, form).await?;
    Ok((StatusCode::CREATED, Json(EmployeeView::from(&employee))))
}

async fn update_employee(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<EntityId>,
    Json(form): Json<EmployeeForm>,
) -> ApiResult<Json<EmployeeView>> {
    let employee = state.desk.save_employee(Some(id), form).await?;
    Ok(Json(EmployeeView::from(&employee)))
}

async fn delete_employee(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    state.desk.delete_employee(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_points(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ListResponse<Stored<Point>>>> {
    Ok(Json(state.desk.points(query.q.as_deref()).await?.into()))
}

async fn get_point(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<Stored<Point>>> {
    Ok(Json(state.desk.point(id).await?))
}

async fn create_point(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(form): Json<PointForm>,
) -> ApiResult<(StatusCode, Json<Stored<Point>>)> {
    let point = state.desk.save_point(None, form).await?;
    Ok((StatusCode::CREATED, Json(point)))
}

async fn update_point(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<EntityId>,
    Json(form): Json<PointForm>,
) -> ApiResult<Json<Stored<Point>>> {
    Ok(Json(state.desk.save_point(Some(id), form).await?))
}

async fn delete_point(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    state.desk.delete_point(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_procurations(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ListResponse<Stored<Procuration>>>> {
    Ok(Json(state.desk.procurations(query.q.as_deref()).await?.into()))
}

async fn get_procuration(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<Stored<Procuration>>> {
    Ok(Json(state.desk.procuration(id).await?))
}

async fn create_procuration(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(form): Json<ProcurationForm>,
) -> ApiResult<(StatusCode, Json<Stored<Procuration>>)> {
    let procuration = state.desk.save_procuration(None, form).await?;
    Ok((StatusCode::CREATED, Json(procuration)))
}

async fn update_procuration(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<EntityId>,
    Json(form): Json<ProcurationForm>,
) -> ApiResult<Json<Stored<Procuration>>> {
    Ok(Json(state.desk.save_procuration(Some(id), form).await?))
}

async fn delete_procuration(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    state.desk.delete_procuration(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn summary_report(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<SummaryReportResponse>> {
    let rows = state.desk.summary_report().await?;
    Ok(Json(SummaryReportResponse {
        generated_at: Utc::now(),
        rows,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use pointdesk_core::NoopNotifier;
    use pointdesk_core::auth::{ADMIN_LOGIN, DEFAULT_ADMIN_PASSWORD};
    use pointdesk_store::InMemoryStore;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    const SECRET: &str = "router-test-secret-router-test-secret";

    async fn app() -> Router {
        let desk = Desk::new(Arc::new(InMemoryStore::new()), Arc::new(NoopNotifier));
        desk.ensure_admin(DEFAULT_ADMIN_PASSWORD).await.unwrap();
        build_router(AppState {
            desk,
            tokens: TokenSigner::new(SECRET, 60),
        })
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn sign_in(app: &Router, login: &str, password: &str) -> String {
        let (status, body) = call(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "login": login, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_user(app: &Router, admin: &str) {
        let (status, _) = call(
            app,
            "POST",
            "/admin/employees",
            Some(admin),
            Some(json!({
                "full_name": "Джон Доу",
                "login": "jdoe",
                "password": "secret1",
                "confirm_password": "secret1",
                "role": "USER",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn healthz_is_open() {
        let app = app().await;
        let (status, _) = call(&app, "GET", "/healthz", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = app().await;
        let (status, body) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "login": ADMIN_LOGIN, "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Неверный логин или пароль");
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let app = app().await;
        let (status, _) = call(&app, "GET", "/clients", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(&app, "GET", "/clients", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn user_role_cannot_reach_admin_routes() {
        let app = app().await;
        let admin = sign_in(&app, ADMIN_LOGIN, DEFAULT_ADMIN_PASSWORD).await;
        create_user(&app, &admin).await;
        let user = sign_in(&app, "jdoe", "secret1").await;

        let (status, body) = call(&app, "GET", "/me", Some(&user), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "USER");
        assert!(body.get("password_hash").is_none());

        let (status, _) = call(&app, "GET", "/admin/reports/summary", Some(&user), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&app, "GET", "/admin/points", Some(&user), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&app, "GET", "/clients", Some(&user), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn deleted_employee_token_stops_working() {
        let app = app().await;
        let admin = sign_in(&app, ADMIN_LOGIN, DEFAULT_ADMIN_PASSWORD).await;
        create_user(&app, &admin).await;
        let user = sign_in(&app, "jdoe", "secret1").await;

        let uri = "/admin/employees?q=%D0%B4%D0%BE%D1%83";
        let (_, list) = call(&app, "GET", uri, Some(&admin), None).await;
        assert_eq!(list["total"], 1);
        let id = list["items"][0]["id"].as_i64().unwrap();
        let (status, _) = call(
            &app,
            "DELETE",
            &format!("/admin/employees/{id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, "GET", "/me", Some(&user), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_client_reports_field_errors() {
        let app = app().await;
        let admin = sign_in(&app, ADMIN_LOGIN, DEFAULT_ADMIN_PASSWORD).await;
        let (status, body) = call(
            &app,
            "POST",
            "/clients",
            Some(&admin),
            Some(json!({ "full_name": "", "phone": "abc" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"]["full_name"], "Обязательное поле");
        assert_eq!(body["fields"]["phone"], "Неверный формат телефона");
    }

    #[tokio::test]
    async fn contract_lifecycle_over_http() {
        let app = app().await;
        let admin = sign_in(&app, ADMIN_LOGIN, DEFAULT_ADMIN_PASSWORD).await;

        let (status, point) = call(
            &app,
            "POST",
            "/admin/points",
            Some(&admin),
            Some(json!({ "name": "Branch A", "address": "ул. Ленина, 1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, client) = call(
            &app,
            "POST",
            "/clients",
            Some(&admin),
            Some(json!({ "full_name": "Анна Смирнова", "phone": "+79991234567" })),
        )
        .await;

        let (status, mut defaults) =
            call(&app, "GET", "/contracts/defaults", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(defaults["employee"]["login"], ADMIN_LOGIN);
        assert_eq!(defaults["form"]["status"], "Активен");

        let mut form = defaults["form"].take();
        form["client_id"] = client["id"].clone();
        form["point_id"] = point["id"].clone();
        form["amount"] = json!("1500.00");
        let (status, contract) = call(&app, "POST", "/contracts", Some(&admin), Some(form)).await;
        assert_eq!(status, StatusCode::CREATED, "{contract}");
        let contract_id = contract["id"].as_i64().unwrap();

        let (status, report) =
            call(&app, "GET", "/admin/reports/summary", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["rows"][0]["name"], "Branch A");
        assert_eq!(report["rows"][0]["active_count"], 1);
        assert_eq!(report["rows"][0]["inactive_count"], 0);

        let point_id = point["id"].as_i64().unwrap();
        let (_, check) = call(
            &app,
            "GET",
            &format!("/references/point/{point_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(check["blocking_references"], 1);

        let (status, body) = call(
            &app,
            "DELETE",
            &format!("/admin/points/{point_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().starts_with("Ошибка удаления"));

        let (status, _) = call(
            &app,
            "DELETE",
            &format!("/contracts/{contract_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(
            &app,
            "DELETE",
            &format!("/admin/points/{point_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn contract_pdf_is_served_as_attachment() {
        let app = app().await;
        let admin = sign_in(&app, ADMIN_LOGIN, DEFAULT_ADMIN_PASSWORD).await;
        let (_, point) = call(
            &app,
            "POST",
            "/admin/points",
            Some(&admin),
            Some(json!({ "name": "Branch B", "address": "пр. Мира, 3" })),
        )
        .await;
        let (_, client) = call(
            &app,
            "POST",
            "/clients",
            Some(&admin),
            Some(json!({ "full_name": "Олег Орлов", "phone": "+79990000000" })),
        )
        .await;
        let (_, mut defaults) = call(&app, "GET", "/contracts/defaults", Some(&admin), None).await;
        let mut form = defaults["form"].take();
        form["client_id"] = client["id"].clone();
        form["point_id"] = point["id"].clone();
        form["amount"] = json!("250");
        let (_, contract) = call(&app, "POST", "/contracts", Some(&admin), Some(form)).await;
        let id = contract["id"].as_i64().unwrap();

        let request = Request::builder()
            .uri(format!("/contracts/{id}/pdf"))
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename=\"contract_{id}.pdf\"")
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"%PDF-1.4"));
    }

    #[tokio::test]
    async fn missing_contract_is_not_found() {
        let app = app().await;
        let admin = sign_in(&app, ADMIN_LOGIN, DEFAULT_ADMIN_PASSWORD).await;
        let (status, _) = call(&app, "GET", "/contracts/999", Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
