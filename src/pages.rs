//! Server-rendered HTML for the two pages (submit form, dashboard) and errors.

use actix_web::http::StatusCode;

use crate::analysis::{AiAnalysis, SubjectAnalysis};
use crate::analytics::{OverallSummary, SubjectAverage};
use crate::feedback::{FeedbackForm, FeedbackRecord, Rating, Subject};

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; max-width: 960px; margin: 30px auto; padding: 20px; color: #222; }
    nav { margin-bottom: 20px; }
    nav a { margin-right: 15px; text-decoration: none; color: #007bff; font-weight: bold; }
    nav a.active { color: #0056b3; border-bottom: 2px solid #0056b3; }
    .container { background: #f5f5f5; padding: 25px; border-radius: 10px; }
    .form-group { margin: 15px 0; }
    label { display: block; margin-bottom: 5px; font-weight: bold; }
    input, select, textarea { width: 100%; padding: 10px; border: 1px solid #ddd; border-radius: 4px; box-sizing: border-box; }
    button { background: #007bff; color: white; padding: 12px 24px; border: none; border-radius: 4px; cursor: pointer; }
    button:hover { background: #0056b3; }
    .notice { margin: 15px 0; padding: 15px; border-radius: 5px; }
    .success { background: #d4edda; color: #155724; border: 1px solid #c3e6cb; }
    .error { background: #f8d7da; color: #721c24; border: 1px solid #f5c6cb; }
    .info { background: #d1ecf1; color: #0c5460; border: 1px solid #bee5eb; }
    .stats { display: grid; grid-template-columns: 1fr 1fr; gap: 15px; margin: 20px 0; }
    .stat { background: white; padding: 15px; border-radius: 8px; border-left: 4px solid #007bff; }
    .stat p { font-size: 24px; margin: 0; color: #007bff; }
    .feedback-table { width: 100%; border-collapse: collapse; margin: 15px 0; background: white; }
    .feedback-table th, .feedback-table td { padding: 10px; text-align: left; border-bottom: 1px solid #ddd; }
    .feedback-table th { background: #f8f9fa; }
    .bar-row { display: flex; align-items: center; margin: 6px 0; }
    .bar-label { width: 160px; }
    .bar { background: #28a745; color: white; padding: 4px 8px; border-radius: 3px; white-space: nowrap; }
    .word-cloud { background: white; padding: 15px; border-radius: 5px; line-height: 1.6; }
    .word-cloud span { margin: 0 6px; color: #6f42c1; display: inline-block; }
    .summary { background: white; padding: 15px; border-radius: 5px; white-space: pre-wrap; }
"#;

pub enum Notice {
    Success(String),
    Error(String),
}

/// Everything the dashboard shows for one page view.
pub struct DashboardView {
    pub records: Vec<FeedbackRecord>,
    pub summary: OverallSummary,
    pub averages: Vec<SubjectAverage>,
    pub subjects: Vec<Subject>,
    pub analysis: Option<SubjectAnalysis>,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, active: &str, body: &str) -> String {
    let link = |href: &str, name: &str| {
        let class = if name == active { " class=\"active\"" } else { "" };
        format!("<a href=\"{}\"{}>{}</a>", href, class, name)
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title} - Student Feedback Analyzer</title>
    <style>{style}</style>
</head>
<body>
    <h1>📚 Student Feedback Analyzer</h1>
    <nav>{submit}{dashboard}</nav>
    <div class="container">
{body}
    </div>
</body>
</html>
"#,
        title = escape_html(title),
        style = STYLE,
        submit = link("/submit", "Submit Feedback"),
        dashboard = link("/dashboard", "Dashboard"),
        body = body,
    )
}

pub fn render_submit_page(form: &FeedbackForm, notice: Option<&Notice>) -> String {
    let mut body = String::from("        <h2>Submit Feedback</h2>\n");

    match notice {
        Some(Notice::Success(message)) => {
            body.push_str(&format!("        <div class=\"notice success\">{}</div>\n", escape_html(message)));
        }
        Some(Notice::Error(message)) => {
            body.push_str(&format!("        <div class=\"notice error\">{}</div>\n", escape_html(message)));
        }
        None => {}
    }

    let options: String = Subject::ALL
        .iter()
        .map(|subject| {
            let selected = if subject.as_str().eq_ignore_ascii_case(form.subject.trim()) {
                " selected"
            } else {
                ""
            };
            format!("<option value=\"{0}\"{1}>{0}</option>", subject.as_str(), selected)
        })
        .collect();

    body.push_str(&format!(
        r#"        <form method="post" action="/submit">
            <div class="form-group">
                <label for="student_name">Student name</label>
                <input type="text" id="student_name" name="student_name" value="{name}">
            </div>
            <div class="form-group">
                <label for="subject">Subject</label>
                <select id="subject" name="subject">{options}</select>
            </div>
            <div class="form-group">
                <label for="rating">Rating (1=poor, 5=excellent)</label>
                <input type="number" id="rating" name="rating" min="{min}" max="{max}" step="1" value="{rating}">
            </div>
            <div class="form-group">
                <label for="comments">Comments</label>
                <textarea id="comments" name="comments" rows="5">{comments}</textarea>
            </div>
            <button type="submit">Submit</button>
        </form>
"#,
        name = escape_html(&form.student_name),
        options = options,
        min = Rating::MIN,
        max = Rating::MAX,
        rating = escape_html(&form.rating),
        comments = escape_html(&form.comments),
    ));

    layout("Submit Feedback", "Submit Feedback", &body)
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let mut body = String::from("        <h2>Feedback Dashboard</h2>\n");

    if view.records.is_empty() {
        body.push_str("        <div class=\"notice info\">No feedback yet. Submit some to see the dashboard.</div>\n");
        return layout("Dashboard", "Dashboard", &body);
    }

    render_summary(&mut body, &view.summary);
    render_records(&mut body, &view.records);
    render_averages(&mut body, &view.averages);
    render_subject_picker(&mut body, &view.subjects, view.analysis.as_ref().map(|a| a.subject));
    if let Some(analysis) = &view.analysis {
        render_analysis(&mut body, analysis);
    }

    layout("Dashboard", "Dashboard", &body)
}

fn render_summary(body: &mut String, summary: &OverallSummary) {
    let average = summary
        .average_rating
        .map(|avg| format!("{:.2}", avg))
        .unwrap_or_else(|| "-".to_string());

    body.push_str(&format!(
        r#"        <div class="stats">
            <div class="stat"><h4>Total Feedback</h4><p>{}</p></div>
            <div class="stat"><h4>Average Rating</h4><p>{}</p></div>
        </div>
"#,
        summary.total_responses, average
    ));
}

fn render_records(body: &mut String, records: &[FeedbackRecord]) {
    body.push_str("        <h3>All feedback</h3>\n        <table class=\"feedback-table\">\n");
    body.push_str("            <thead><tr><th>ID</th><th>Student</th><th>Subject</th><th>Rating</th><th>Comments</th><th>Submitted</th></tr></thead>\n            <tbody>\n");
    for record in records {
        let submitted = record
            .submitted_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        body.push_str(&format!(
            "                <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            record.id,
            escape_html(&record.student_name),
            record.subject,
            record.rating,
            escape_html(&record.comments),
            submitted
        ));
    }
    body.push_str("            </tbody>\n        </table>\n");
}

fn render_averages(body: &mut String, averages: &[SubjectAverage]) {
    body.push_str("        <h3>Average Rating per Subject</h3>\n");
    for average in averages {
        let width = average.average_rating / f64::from(Rating::MAX) * 100.0;
        body.push_str(&format!(
            "        <div class=\"bar-row\"><span class=\"bar-label\">{}</span><div class=\"bar\" style=\"width: {:.1}%\">{:.2} ({} responses)</div></div>\n",
            average.subject, width, average.average_rating, average.responses
        ));
    }
}

fn render_subject_picker(body: &mut String, subjects: &[Subject], selected: Option<Subject>) {
    body.push_str("        <h3>Subject-wise Analysis</h3>\n        <form method=\"get\" action=\"/dashboard\">\n");
    body.push_str("            <label for=\"subject\">Choose a subject to analyze</label>\n            <select id=\"subject\" name=\"subject\">");
    for subject in subjects {
        let mark = if Some(*subject) == selected { " selected" } else { "" };
        body.push_str(&format!("<option value=\"{0}\"{1}>{0}</option>", subject, mark));
    }
    body.push_str("</select>\n            <button type=\"submit\">Analyze</button>\n        </form>\n");
}

fn render_analysis(body: &mut String, analysis: &SubjectAnalysis) {
    body.push_str(&format!("        <h3>📘 {}</h3>\n", analysis.subject));

    body.push_str("        <h4>Word Cloud</h4>\n");
    if analysis.word_cloud.is_empty() {
        body.push_str("        <p>No comments to generate word cloud.</p>\n");
    } else {
        body.push_str("        <div class=\"word-cloud\">");
        for word in &analysis.word_cloud {
            let size = 12.0 + word.weight * 36.0;
            body.push_str(&format!(
                "<span style=\"font-size: {:.0}px\" title=\"{}\">{}</span>",
                size,
                word.count,
                escape_html(&word.word)
            ));
        }
        body.push_str("</div>\n");
    }

    body.push_str("        <h4>Sentiment Analysis (AI)</h4>\n");
    match &analysis.ai {
        AiAnalysis::NoComments => {
            body.push_str("        <p>No comments to analyze.</p>\n        <h4>AI Summary</h4>\n        <p>No comments to summarize.</p>\n");
        }
        AiAnalysis::Unavailable => {
            body.push_str("        <div class=\"notice info\">AI analysis is unavailable: set GEMINI_API_KEY to enable it.</div>\n");
        }
        AiAnalysis::Complete { labels, counts, summary } => {
            body.push_str(&format!(
                "        <p class=\"sentiment-counts\">Positive: {} | Negative: {} | Neutral: {}</p>\n",
                counts.positive, counts.negative, counts.neutral
            ));
            body.push_str("        <table class=\"feedback-table\">\n            <thead><tr><th>#</th><th>Comment</th><th>Sentiment</th></tr></thead>\n            <tbody>\n");
            for label in labels {
                let comment = analysis
                    .comments
                    .get(label.id - 1)
                    .map(String::as_str)
                    .unwrap_or_default();
                body.push_str(&format!(
                    "                <tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    label.id,
                    escape_html(comment),
                    label.sentiment
                ));
            }
            body.push_str("            </tbody>\n        </table>\n");

            body.push_str(&format!(
                "        <h4>AI Summary</h4>\n        <div class=\"summary\">{}</div>\n",
                escape_html(summary)
            ));
        }
    }
}

pub fn render_error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "        <h2>Something went wrong</h2>\n        <div class=\"notice error\"><strong>{}</strong><p>{}</p></div>\n",
        status,
        escape_html(message)
    );
    layout("Error", "", &body)
}
