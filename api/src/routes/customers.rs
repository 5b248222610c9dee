use actix_web::{
    http::{
        header::{ContentDisposition, DispositionParam, DispositionType},
        StatusCode,
    },
    web, HttpResponse,
};
use chrono::NaiveDate;
use common::{
    models::{DateFilter, ListQuery, SortOrder},
    validation::CustomerForm,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{parse_param, success};
use crate::{auth::AuthenticatedUser, error::ApiError, state::AppState};

/// Query string of the customer list: `q` searches names, `p` phones.
#[derive(Debug, Deserialize)]
struct ListParams {
    q: Option<String>,
    p: Option<String>,
    sort: Option<String>,
    page: Option<u32>,
    filter: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct StatusToggle {
    value: bool,
}

#[actix_web::get("/customers")]
async fn list_customers(
    params: web::Query<ListParams>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let params = params.into_inner();
    let filter: DateFilter = parse_param("filter", params.filter.as_deref())?;
    let sort: SortOrder = parse_param("sort", params.sort.as_deref())?;

    let query = ListQuery {
        search: params.q.unwrap_or_default(),
        phone: params.p.unwrap_or_default(),
        sort,
        page: params.page.unwrap_or(1),
        page_size: app_state.page_size,
        window: filter.window(app_state.today(), params.start, params.end),
    };
    let page = app_state.service.list(query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[actix_web::post("/customers")]
async fn create_customer(
    form: web::Json<CustomerForm>,
    user: AuthenticatedUser,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let record = app_state
        .service
        .create(form.into_inner(), Some(user.display_name()))
        .await?;
    Ok(success(StatusCode::CREATED, record))
}

#[actix_web::get("/customers/{id}")]
async fn get_customer(
    path: web::Path<Uuid>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let record = app_state.service.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[actix_web::put("/customers/{id}")]
async fn update_customer(
    path: web::Path<Uuid>,
    form: web::Json<CustomerForm>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let record = app_state
        .service
        .update(path.into_inner(), form.into_inner())
        .await?;
    Ok(success(StatusCode::OK, record))
}

#[actix_web::delete("/customers/{id}")]
async fn delete_customer(
    path: web::Path<Uuid>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    app_state.service.delete(path.into_inner()).await?;
    Ok(success(StatusCode::OK, Value::Null))
}

#[actix_web::get("/customers/{id}/form")]
async fn edit_form(
    path: web::Path<Uuid>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let form = app_state.service.edit_form(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(form))
}

#[actix_web::get("/customers/{id}/duplicate")]
async fn duplicate_template(
    path: web::Path<Uuid>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let form = app_state
        .service
        .duplicate_template(path.into_inner(), app_state.today())
        .await?;
    Ok(HttpResponse::Ok().json(form))
}

#[actix_web::post("/customers/{id}/trial")]
async fn toggle_trial(
    path: web::Path<Uuid>,
    body: web::Json<StatusToggle>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    app_state.service.toggle_trial(id, body.value).await?;
    Ok(success(StatusCode::OK, serde_json::json!({ "id": id, "is_trialed": body.value })))
}

#[actix_web::post("/customers/{id}/delivery")]
async fn toggle_delivery(
    path: web::Path<Uuid>,
    body: web::Json<StatusToggle>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    app_state.service.toggle_delivery(id, body.value).await?;
    Ok(success(StatusCode::OK, serde_json::json!({ "id": id, "is_delivered": body.value })))
}

#[actix_web::get("/customers/{id}/bill")]
async fn download_bill(
    path: web::Path<Uuid>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let record = app_state.service.get(path.into_inner()).await?;
    let document = bill::layout(&record, &app_state.bill, app_state.local_now());
    let bytes = bill::render_pdf(&document)?;
    info!("Generated bill {} for customer {}", document.file_name, record.id);

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(document.file_name)],
        })
        .body(bytes))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_customers)
        .service(create_customer)
        .service(get_customer)
        .service(update_customer)
        .service(delete_customer)
        .service(edit_form)
        .service(duplicate_template)
        .service(toggle_trial)
        .service(toggle_delivery)
        .service(download_bill);
}
