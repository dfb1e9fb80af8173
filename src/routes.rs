use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::analysis::analyze_subject;
use crate::analytics::{
    average_by_subject, overall_summary, subjects_present, ChartData, OverallSummary, SubjectAverage,
};
use crate::config::FormPolicy;
use crate::error::Result;
use crate::feedback::{FeedbackForm, Subject};
use crate::gemini::LanguageModel;
use crate::pages::{self, DashboardView, Notice};
use crate::storage::FeedbackStore;

/// Shared handles for every request, built once in `main`.
pub struct AppState {
    pub store: Arc<dyn FeedbackStore>,
    pub model: Option<Arc<dyn LanguageModel>>,
    pub form_policy: FormPolicy,
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    subject: Option<String>,
}

#[derive(Serialize)]
struct DashboardStats {
    summary: OverallSummary,
    averages: Vec<SubjectAverage>,
    chart: ChartData,
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().insert_header(ContentType::html()).body(body)
}

async fn submit_form() -> HttpResponse {
    html(pages::render_submit_page(&FeedbackForm::initial(), None))
}

async fn submit_feedback(
    state: web::Data<AppState>,
    form: web::Form<FeedbackForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();

    let feedback = match form.validate(&state.form_policy) {
        Ok(feedback) => feedback,
        Err(err) => {
            info!("Rejected submission: {}", err);
            return Ok(HttpResponse::BadRequest()
                .insert_header(ContentType::html())
                .body(pages::render_submit_page(&form, Some(&Notice::Error(err.0)))));
        }
    };

    let record = state.store.insert(feedback).await?;
    info!(id = record.id, subject = %record.subject, rating = record.rating.value(), "Feedback submitted");

    let notice = Notice::Success("Feedback submitted ✅".to_string());
    Ok(html(pages::render_submit_page(&FeedbackForm::initial(), Some(&notice))))
}

async fn dashboard(
    state: web::Data<AppState>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse> {
    let records = state.store.fetch_all().await?;
    let subjects = subjects_present(&records);

    let requested = query
        .subject
        .as_deref()
        .and_then(|name| name.parse::<Subject>().ok());
    let selected = requested.or_else(|| subjects.first().copied());

    let analysis = match selected {
        Some(subject) if !records.is_empty() => {
            Some(analyze_subject(state.model.as_deref(), subject, &records).await?)
        }
        _ => None,
    };

    let view = DashboardView {
        summary: overall_summary(&records),
        averages: average_by_subject(&records),
        subjects,
        records,
        analysis,
    };

    Ok(html(pages::render_dashboard(&view)))
}

async fn list_feedback(state: web::Data<AppState>) -> Result<HttpResponse> {
    let records = state.store.fetch_all().await?;
    Ok(HttpResponse::Ok().json(records))
}

async fn get_averages(state: web::Data<AppState>) -> Result<HttpResponse> {
    let records = state.store.fetch_all().await?;
    let averages = average_by_subject(&records);

    Ok(HttpResponse::Ok().json(DashboardStats {
        summary: overall_summary(&records),
        chart: ChartData::from_averages(&averages),
        averages,
    }))
}

// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Student Feedback Analyzer is running!")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(submit_form))
        .route("/submit", web::get().to(submit_form))
        .route("/submit", web::post().to(submit_feedback))
        .route("/dashboard", web::get().to(dashboard))
        .route("/api/feedback", web::get().to(list_feedback))
        .route("/api/averages", web::get().to(get_averages))
        .route("/health", web::get().to(health_check));
}

