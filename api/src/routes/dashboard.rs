use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use common::models::{InboxKind, Milestone, StatisticsRange, StatusFilter};
use serde::Deserialize;

use super::parse_param;
use crate::{error::ApiError, state::AppState};

const DEFAULT_RECENT: u32 = 5;

#[derive(Debug, Deserialize)]
struct RecentParams {
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DueParams {
    filter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InboxParams {
    kind: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatisticsParams {
    range: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

#[actix_web::get("/dashboard/stats")]
async fn stats(app_state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let stats = app_state.service.dashboard_stats(app_state.today()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[actix_web::get("/dashboard/recent")]
async fn recent(
    params: web::Query<RecentParams>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let customers = app_state
        .service
        .recent(params.limit.unwrap_or(DEFAULT_RECENT))
        .await?;
    Ok(HttpResponse::Ok().json(customers))
}

async fn due(
    milestone: Milestone,
    params: DueParams,
    app_state: &AppState,
) -> Result<HttpResponse, ApiError> {
    let status: StatusFilter = parse_param("filter", params.filter.as_deref())?;
    let customers = app_state
        .service
        .due(milestone, app_state.today(), status)
        .await?;
    Ok(HttpResponse::Ok().json(customers))
}

#[actix_web::get("/dashboard/trials")]
async fn trials(
    params: web::Query<DueParams>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    due(Milestone::Trial, params.into_inner(), &app_state).await
}

#[actix_web::get("/dashboard/deliveries")]
async fn deliveries(
    params: web::Query<DueParams>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    due(Milestone::Delivery, params.into_inner(), &app_state).await
}

#[actix_web::get("/dashboard/inbox")]
async fn inbox(
    params: web::Query<InboxParams>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let kind: InboxKind = parse_param("kind", params.kind.as_deref())?;
    let status: StatusFilter = parse_param("status", params.status.as_deref())?;
    let items = app_state
        .service
        .inbox(app_state.today(), kind, status)
        .await?;
    Ok(HttpResponse::Ok().json(items))
}

#[actix_web::get("/dashboard/statistics")]
async fn statistics(
    params: web::Query<StatisticsParams>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let range: StatisticsRange = parse_param("range", params.range.as_deref())?;
    let statistics = app_state
        .service
        .statistics(range, params.start, params.end, app_state.today())
        .await?;
    Ok(HttpResponse::Ok().json(statistics))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(stats)
        .service(recent)
        .service(trials)
        .service(deliveries)
        .service(inbox)
        .service(statistics);
}
