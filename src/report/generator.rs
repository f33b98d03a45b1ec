//! HTML report generation.
//!
//! This module renders one self-contained HTML document from the report
//! data: inline style, inline script, inline SVG and the embedded JSON.
//! Everything on the page is derived from [`ReportData`], so identical
//! data renders to identical bytes.

use super::charts::{histogram_svg, scatter_svg};
use super::embed::{data_element, ComparisonRow, GradeDetail, ReportData, ReportInput};
use crate::analysis::stats::format_bound;
use crate::analysis::{
    AgreementMetrics, AggregateView, Breakdown, ComparisonAccuracy, CriterionSummary,
    Distribution, ReferenceAgreement, UsageSummary,
};
use crate::error::RenderError;
use crate::models::ScoreScale;

/// Title used when none is configured.
pub const DEFAULT_TITLE: &str = "Edexia Grading Report";

/// Default submission excerpt length, in characters.
pub const DEFAULT_EXCERPT_CHARS: usize = 280;

/// Placeholder for absent values.
const NONE: &str = "–";

/// Presentation options.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub title: String,
    /// Excerpt length in characters.
    pub excerpt_chars: usize,
    /// Whether submission text appears in the report at all.
    pub include_text: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            include_text: true,
        }
    }
}

impl ReportOptions {
    fn excerpt_limit(&self) -> Option<usize> {
        self.include_text.then_some(self.excerpt_chars)
    }
}

/// Render the complete report.
///
/// Fails with [`RenderError::NoSubmissions`] when the dataset is empty; the
/// caller may fall back to [`render_minimal`].
pub fn synthesize(input: &ReportInput, options: &ReportOptions) -> Result<String, RenderError> {
    if input.dataset.submissions.is_empty() {
        return Err(RenderError::NoSubmissions);
    }

    let data = ReportData::from_input(input, &options.title, options.excerpt_limit());
    let mut body = String::new();

    body.push_str(&generate_header_section(&data));
    body.push_str(&generate_warnings_section(&data));
    body.push_str(&generate_overview_section(&data));
    for view in &data.aggregates.views {
        body.push_str(&generate_grading_set_section(&data, view));
    }
    body.push_str(&generate_pairwise_section(&data));
    body.push_str(&generate_submissions_section(&data));
    body.push_str(&generate_orphans_section(&data));
    body.push_str(&generate_footer());

    render_document(&data, &body)
}

/// Render the valid placeholder document used when there is nothing to report.
pub fn render_minimal(input: &ReportInput, options: &ReportOptions) -> Result<String, RenderError> {
    let data = ReportData::from_input(input, &options.title, None);
    let mut body = String::new();

    body.push_str(&generate_header_section(&data));
    body.push_str("<section class=\"empty\">\n<p>No submissions found</p>\n</section>\n");
    body.push_str(&generate_warnings_section(&data));
    body.push_str(&generate_footer());

    render_document(&data, &body)
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_document(data: &ReportData, body: &str) -> Result<String, RenderError> {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&data.title)));
    html.push_str("<style>\n");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<main>\n");
    html.push_str(body);
    html.push_str("</main>\n");
    html.push_str(&data_element(data)?);
    html.push_str("<script>\n");
    html.push_str(SCRIPT);
    html.push_str("</script>\n</body>\n</html>\n");

    Ok(html)
}

/// Generate the header with dataset identity and run time.
fn generate_header_section(data: &ReportData) -> String {
    let mut section = String::new();

    section.push_str("<header>\n");
    section.push_str(&format!("<h1>{}</h1>\n", escape_html(&data.title)));
    section.push_str("<dl class=\"meta\">\n");
    push_meta(&mut section, "Dataset", &data.dataset.file);
    push_meta(&mut section, "Task", &data.dataset.task_id);
    if let Some(ref description) = data.dataset.description {
        push_meta(&mut section, "Description", description);
    }
    push_meta(
        &mut section,
        "Submissions",
        &format!(
            "{} ({} with reference grades)",
            data.dataset.submissions, data.dataset.with_reference
        ),
    );
    if let Some(ref scale) = data.dataset.scale {
        push_meta(&mut section, "Reference scale", &scale.to_string());
    }
    push_meta(
        &mut section,
        "Grading files",
        &data.grading_sets.len().to_string(),
    );
    section.push_str(&format!(
        "<dt>Generated</dt><dd><time datetime=\"{}\">{}</time></dd>\n",
        data.generated_at.to_rfc3339(),
        data.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str("</dl>\n</header>\n");

    section
}

fn push_meta(section: &mut String, term: &str, value: &str) {
    section.push_str(&format!(
        "<dt>{}</dt><dd>{}</dd>\n",
        escape_html(term),
        escape_html(value)
    ));
}

/// Generate the warnings list.
fn generate_warnings_section(data: &ReportData) -> String {
    if data.warnings.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("<section class=\"warnings\">\n<h2>Warnings</h2>\n<ul>\n");
    for warning in &data.warnings {
        section.push_str(&format!("<li>{}</li>\n", escape_html(warning)));
    }
    section.push_str("</ul>\n</section>\n");

    section
}

/// Generate the one-row-per-grading-set summary table.
fn generate_overview_section(data: &ReportData) -> String {
    let mut section = String::new();

    section.push_str("<section>\n<h2>Overview</h2>\n");
    section.push_str("<table class=\"overview\">\n<thead><tr>");
    for heading in [
        "Algorithm", "File", "Scale", "Graded", "Ungraded", "Mean", "Median", "Std dev", "MAE",
        "QWK",
    ] {
        section.push_str(&format!("<th>{}</th>", heading));
    }
    section.push_str("</tr></thead>\n<tbody>\n");

    for (set, view) in data.grading_sets.iter().zip(&data.aggregates.views) {
        let summary = view.distribution.summary();
        let metrics = view.reference.metrics();
        section.push_str("<tr>");
        section.push_str(&format!(
            "<td><a href=\"#set-{}\">{}</a></td>",
            set.index,
            escape_html(&set.algorithm.to_string())
        ));
        section.push_str(&format!("<td>{}</td>", escape_html(&set.file)));
        section.push_str(&format!("<td>{}</td>", escape_html(&set.scale.to_string())));
        section.push_str(&format!("<td class=\"num\">{}</td>", view.graded));
        section.push_str(&format!("<td class=\"num\">{}</td>", view.ungraded));
        section.push_str(&num_cell(summary.map(|s| s.mean)));
        section.push_str(&num_cell(summary.map(|s| s.median)));
        section.push_str(&num_cell(summary.map(|s| s.std_dev)));
        section.push_str(&num_cell(metrics.map(|m| m.mean_absolute_error)));
        section.push_str(&num_cell(metrics.and_then(|m| m.quadratic_weighted_kappa)));
        section.push_str("</tr>\n");
    }

    section.push_str("</tbody>\n</table>\n</section>\n");
    section
}

/// Generate the detail section for one grading set.
fn generate_grading_set_section(data: &ReportData, view: &AggregateView) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "<section class=\"grading-set\" id=\"set-{}\">\n",
        view.grading_set
    ));
    section.push_str(&format!("<h2>{}</h2>\n", escape_html(&view.label)));

    if let Some(set) = data.grading_sets.get(view.grading_set) {
        if let Some(ref description) = set.description {
            section.push_str(&format!("<p>{}</p>\n", escape_html(description)));
        }
        if let Some(ref task) = set.task_id {
            if task != &data.dataset.task_id {
                section.push_str(&format!(
                    "<p class=\"note\">Graded task {} differs from dataset task {}.</p>\n",
                    escape_html(task),
                    escape_html(&data.dataset.task_id)
                ));
            }
        }
    }

    section.push_str("<h3>Score distribution</h3>\n");
    match view.distribution {
        Distribution::NoData => {
            section.push_str("<p class=\"no-data\">No graded submissions.</p>\n");
        }
        Distribution::Summary(ref summary) => {
            section.push_str("<table class=\"stats\">\n<tbody>\n");
            push_row(&mut section, "Graded", &view.graded.to_string());
            push_row(&mut section, "Ungraded", &view.ungraded.to_string());
            push_row(&mut section, "Minimum", &score_text(summary.min, &view.scale));
            push_row(&mut section, "Maximum", &score_text(summary.max, &view.scale));
            push_row(&mut section, "Mean", &metric(Some(summary.mean)));
            push_row(&mut section, "Median", &metric(Some(summary.median)));
            push_row(&mut section, "Std dev", &metric(Some(summary.std_dev)));
            if let Some(peak) = view.mean_peak_probability {
                push_row(&mut section, "Mean peak probability", &percent(peak));
            }
            section.push_str("</tbody>\n</table>\n");
            section.push_str(&histogram_svg(
                &view.histogram,
                &format!("Score histogram for {}", view.label),
            ));
        }
    }

    section.push_str("<h3>Agreement with reference grades</h3>\n");
    match view.reference {
        ReferenceAgreement::NoData => {
            section.push_str("<p class=\"no-data\">No reference grades for graded submissions.</p>\n");
        }
        ReferenceAgreement::NotComparable { ref reason } => {
            section.push_str(&format!(
                "<p class=\"note\">Not comparable: {}.</p>\n",
                escape_html(reason)
            ));
        }
        ReferenceAgreement::Measured(ref metrics) => {
            section.push_str(&agreement_table(metrics));
            let points: Vec<(f64, f64)> = data
                .submissions
                .iter()
                .filter_map(|row| {
                    Some((
                        row.reference_score?,
                        (*row.scores.get(view.grading_set)?)?,
                    ))
                })
                .collect();
            section.push_str(&scatter_svg(
                &points,
                &view.scale,
                &format!("Reference versus {}", view.label),
            ));
        }
    }

    section.push_str(&breakdown_table("By prompt", &view.by_prompt));
    section.push_str(&breakdown_table("By cohort", &view.by_cohort));
    section.push_str(&criteria_table(&view.criteria));

    if let Some(ref comparisons) = view.comparisons {
        section.push_str(&comparisons_table(comparisons));
    }
    if let Some(set) = data.grading_sets.get(view.grading_set) {
        section.push_str(&comparison_rows_table(&set.comparison_rows));
    }
    if let Some(ref usage) = view.usage {
        section.push_str(&usage_table(usage));
    }

    section.push_str("</section>\n");
    section
}

fn agreement_table(metrics: &AgreementMetrics) -> String {
    let mut table = String::new();

    table.push_str("<table class=\"stats\">\n<tbody>\n");
    push_row(&mut table, "Pairs", &metrics.pairs.to_string());
    push_row(&mut table, "Mean absolute error", &metric(Some(metrics.mean_absolute_error)));
    push_row(
        &mut table,
        "Root mean squared error",
        &metric(Some(metrics.root_mean_squared_error)),
    );
    push_row(&mut table, "Exact agreement", &percent(metrics.exact_agreement));
    push_row(
        &mut table,
        &format!("Adjacent agreement (±{})", format_bound(metrics.adjacent_tolerance)),
        &percent(metrics.adjacent_agreement),
    );
    push_row(&mut table, "Pearson r", &metric(metrics.pearson));
    push_row(&mut table, "Spearman ρ", &metric(metrics.spearman));
    push_row(
        &mut table,
        "Quadratic weighted kappa",
        &metric(metrics.quadratic_weighted_kappa),
    );
    table.push_str("</tbody>\n</table>\n");

    table
}

fn breakdown_table(title: &str, rows: &[Breakdown]) -> String {
    // A single group repeats the overall figures.
    if rows.len() < 2 {
        return String::new();
    }

    let mut table = String::new();
    table.push_str(&format!("<h3>{}</h3>\n", escape_html(title)));
    table.push_str("<table class=\"breakdown\">\n<thead><tr><th>Group</th><th>Submissions</th><th>Graded</th><th>Mean</th><th>MAE</th></tr></thead>\n<tbody>\n");
    for row in rows {
        table.push_str(&format!(
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>{}{}</tr>\n",
            escape_html(&row.key),
            row.submissions,
            row.graded,
            num_cell(row.mean_score),
            num_cell(row.mean_absolute_error)
        ));
    }
    table.push_str("</tbody>\n</table>\n");

    table
}

fn criteria_table(criteria: &[CriterionSummary]) -> String {
    if criteria.is_empty() {
        return String::new();
    }

    let mut table = String::new();
    table.push_str("<h3>Criteria</h3>\n");
    table.push_str("<table class=\"breakdown\">\n<thead><tr><th>Criterion</th><th>Graded</th><th>Mean</th><th>Min</th><th>Max</th></tr></thead>\n<tbody>\n");
    for criterion in criteria {
        table.push_str(&format!(
            "<tr><td>{}</td><td class=\"num\">{}</td>{}{}{}</tr>\n",
            escape_html(&criterion.name),
            criterion.count,
            num_cell(Some(criterion.mean)),
            num_cell(Some(criterion.min)),
            num_cell(Some(criterion.max))
        ));
    }
    table.push_str("</tbody>\n</table>\n");

    table
}

fn comparisons_table(accuracy: &ComparisonAccuracy) -> String {
    let mut table = String::new();

    table.push_str("<h3>Pairwise comparisons</h3>\n<table class=\"stats\">\n<tbody>\n");
    push_row(&mut table, "Comparisons", &accuracy.total.to_string());
    push_row(&mut table, "Scored against reference", &accuracy.scored.to_string());
    push_row(&mut table, "Correct", &accuracy.correct.to_string());
    push_row(
        &mut table,
        "Accuracy",
        &accuracy.accuracy.map(percent).unwrap_or_else(|| NONE.to_string()),
    );
    push_row(&mut table, "Reference ties", &accuracy.reference_ties.to_string());
    push_row(&mut table, "External anchors", &accuracy.external.to_string());
    push_row(&mut table, "Missing reference", &accuracy.unreferenced.to_string());
    push_row(&mut table, "Mean confidence", &metric(accuracy.mean_confidence));
    table.push_str("</tbody>\n</table>\n");

    table
}

fn comparison_rows_table(rows: &[ComparisonRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = String::new();
    table.push_str(&format!(
        "<details class=\"comparisons\">\n<summary>All comparisons ({})</summary>\n",
        rows.len()
    ));
    table.push_str("<table>\n<thead><tr><th>ID</th><th>A</th><th>B</th><th>Winner</th><th>Confidence</th><th>Justification</th></tr></thead>\n<tbody>\n");
    for row in rows {
        table.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>{}<td>{}</td></tr>\n",
            escape_html(&row.id),
            escape_html(&row.submission_a),
            escape_html(&row.submission_b),
            escape_html(&row.winner),
            num_cell(row.confidence),
            escape_html(row.justification.as_deref().unwrap_or(NONE))
        ));
    }
    table.push_str("</tbody>\n</table>\n</details>\n");

    table
}

fn usage_table(usage: &UsageSummary) -> String {
    let mut table = String::new();

    table.push_str("<h3>LLM usage</h3>\n<table class=\"stats\">\n<tbody>\n");
    push_row(&mut table, "Calls", &usage.calls.to_string());
    push_row(&mut table, "Input tokens", &usage.input_tokens.to_string());
    push_row(&mut table, "Output tokens", &usage.output_tokens.to_string());
    push_row(
        &mut table,
        "Mean latency",
        &usage
            .mean_latency_ms
            .map(|ms| format!("{:.0} ms", ms))
            .unwrap_or_else(|| NONE.to_string()),
    );
    if !usage.models.is_empty() {
        push_row(&mut table, "Models", &usage.models.join(", "));
    }
    table.push_str("</tbody>\n</table>\n");

    table
}

/// Generate the agreement matrix between grading sets.
fn generate_pairwise_section(data: &ReportData) -> String {
    if data.aggregates.pairwise.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("<section>\n<h2>Agreement between grading files</h2>\n");
    section.push_str("<table class=\"pairwise\">\n<thead><tr><th>First</th><th>Second</th><th>Shared</th><th>MAE</th><th>Exact</th><th>Adjacent</th><th>Pearson r</th><th>Spearman ρ</th><th>QWK</th></tr></thead>\n<tbody>\n");

    for pair in &data.aggregates.pairwise {
        section.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td class=\"num\">{}</td>",
            escape_html(&pair.left_label),
            escape_html(&pair.right_label),
            pair.shared
        ));
        match pair.agreement {
            Some(ref m) => {
                section.push_str(&num_cell(Some(m.mean_absolute_error)));
                section.push_str(&format!("<td class=\"num\">{}</td>", percent(m.exact_agreement)));
                section.push_str(&format!(
                    "<td class=\"num\">{}</td>",
                    percent(m.adjacent_agreement)
                ));
                section.push_str(&num_cell(m.pearson));
                section.push_str(&num_cell(m.spearman));
                section.push_str(&num_cell(m.quadratic_weighted_kappa));
            }
            None => {
                section.push_str("<td colspan=\"6\" class=\"no-data\">No shared submissions</td>");
            }
        }
        section.push_str("</tr>\n");
    }

    section.push_str("</tbody>\n</table>\n</section>\n");
    section
}

/// Generate the filterable, sortable submission table.
fn generate_submissions_section(data: &ReportData) -> String {
    let mut section = String::new();
    let with_text = data.submissions.iter().any(|r| r.excerpt.is_some());
    let with_notes = data
        .submissions
        .iter()
        .any(|r| r.grades.iter().any(Option::is_some));

    section.push_str("<section>\n<h2>Submissions</h2>\n");
    section.push_str("<input type=\"search\" id=\"submission-filter\" placeholder=\"Filter submissions\" aria-label=\"Filter submissions\">\n");
    section.push_str("<table id=\"submissions\" class=\"sortable\">\n<thead><tr>");
    section.push_str("<th data-sort=\"text\">ID</th><th data-sort=\"text\">Student</th><th data-sort=\"text\">Prompt</th><th data-sort=\"text\">Cohort</th><th data-sort=\"num\">Reference</th>");
    for set in &data.grading_sets {
        section.push_str(&format!(
            "<th data-sort=\"num\">{}</th>",
            escape_html(&set.algorithm.to_string())
        ));
    }
    if with_notes {
        section.push_str("<th>Grader notes</th>");
    }
    if with_text {
        section.push_str("<th>Excerpt</th>");
    }
    section.push_str("</tr></thead>\n<tbody>\n");

    let reference_scale = data.dataset.scale.as_ref();
    for row in &data.submissions {
        section.push_str("<tr>");
        section.push_str(&format!("<td>{}</td>", escape_html(&row.id)));
        section.push_str(&format!("<td>{}</td>", escape_html(&row.submitter)));
        section.push_str(&format!(
            "<td>{}</td>",
            escape_html(row.prompt.as_deref().unwrap_or(NONE))
        ));
        section.push_str(&format!(
            "<td>{}</td>",
            escape_html(row.cohort.as_deref().unwrap_or(NONE))
        ));
        section.push_str(&score_cell(row.reference_score, reference_scale));
        for (score, set) in row.scores.iter().zip(&data.grading_sets) {
            section.push_str(&score_cell(*score, Some(&set.scale)));
        }
        if with_notes {
            section.push_str("<td class=\"notes\">");
            for (detail, set) in row.grades.iter().zip(&data.grading_sets) {
                if let Some(detail) = detail {
                    section.push_str(&grade_notes(&set.algorithm.to_string(), detail));
                }
            }
            section.push_str("</td>");
        }
        if with_text {
            section.push_str(&format!(
                "<td class=\"excerpt\">{}</td>",
                escape_html(row.excerpt.as_deref().unwrap_or(""))
            ));
        }
        section.push_str("</tr>\n");
    }

    section.push_str("</tbody>\n</table>\n</section>\n");
    section
}

/// Collapsible notes one grader left on one submission.
fn grade_notes(grader: &str, detail: &GradeDetail) -> String {
    let mut notes = String::new();

    notes.push_str(&format!("<details><summary>{}</summary>", escape_html(grader)));
    if let Some(ref label) = detail.label {
        notes.push_str(&format!("<p>Grade: {}</p>", escape_html(label)));
    }
    if !detail.criteria.is_empty() {
        notes.push_str("<ul>");
        for (name, value) in &detail.criteria {
            notes.push_str(&format!(
                "<li>{}: {}</li>",
                escape_html(name),
                format_bound(*value)
            ));
        }
        notes.push_str("</ul>");
    }
    if let Some(ref explanation) = detail.explanation {
        notes.push_str(&format!("<p>{}</p>", escape_html(explanation)));
    }
    if let Some(graded_at) = detail.graded_at {
        notes.push_str(&format!(
            "<p class=\"note\">Graded {}</p>",
            graded_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    notes.push_str("</details>");

    notes
}

/// Generate the list of grades that matched no submission.
fn generate_orphans_section(data: &ReportData) -> String {
    if data.orphans.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("<section class=\"orphans\">\n<h2>Grades without a submission</h2>\n");
    section.push_str("<table>\n<thead><tr><th>Grading file</th><th>Submission ID</th><th>Record</th></tr></thead>\n<tbody>\n");
    for orphan in &data.orphans {
        section.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td class=\"num\">{}</td></tr>\n",
            escape_html(&orphan.label),
            escape_html(&orphan.submission_id),
            orphan.record
        ));
    }
    section.push_str("</tbody>\n</table>\n</section>\n");

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "<footer>Report generated by edexia-report v{}</footer>\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn push_row(table: &mut String, label: &str, value: &str) {
    table.push_str(&format!(
        "<tr><th>{}</th><td>{}</td></tr>\n",
        escape_html(label),
        escape_html(value)
    ));
}

fn metric(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| NONE.to_string())
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn num_cell(value: Option<f64>) -> String {
    format!("<td class=\"num\">{}</td>", metric(value))
}

/// Score as shown to readers: the label on categorical scales.
fn score_text(score: f64, scale: &ScoreScale) -> String {
    match scale.label_for(score) {
        Some(label) => label.to_string(),
        None => format_bound(score),
    }
}

fn score_cell(score: Option<f64>, scale: Option<&ScoreScale>) -> String {
    match score {
        Some(value) => {
            let text = match scale {
                Some(scale) => score_text(value, scale),
                None => format_bound(value),
            };
            format!(
                "<td class=\"num\" data-value=\"{}\">{}</td>",
                value,
                escape_html(&text)
            )
        }
        None => format!("<td class=\"num ungraded\" data-value=\"\">{}</td>", NONE),
    }
}

const STYLE: &str = r#"body { font-family: system-ui, -apple-system, "Segoe UI", sans-serif; margin: 0; color: #1f2933; background: #f7f8fa; }
main { max-width: 1100px; margin: 0 auto; padding: 24px; }
header h1 { margin-bottom: 8px; }
dl.meta { display: grid; grid-template-columns: max-content 1fr; gap: 4px 16px; }
dl.meta dt { font-weight: 600; }
dl.meta dd { margin: 0; }
section { background: #fff; border: 1px solid #e4e7eb; border-radius: 6px; padding: 16px 20px; margin: 20px 0; }
table { border-collapse: collapse; width: 100%; margin: 8px 0 16px; }
th, td { border-bottom: 1px solid #e4e7eb; padding: 6px 8px; text-align: left; vertical-align: top; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
table.stats { width: auto; }
table.stats th { font-weight: 500; color: #52606d; }
td.ungraded { color: #9aa5b1; }
td.excerpt { max-width: 360px; font-size: 0.9em; color: #3e4c59; }
td.notes { max-width: 320px; font-size: 0.9em; }
td.notes ul { margin: 4px 0; padding-left: 18px; }
details.comparisons { margin: 8px 0 16px; }
th[data-sort] { cursor: pointer; user-select: none; }
th[data-sort].asc::after { content: " ▲"; }
th[data-sort].desc::after { content: " ▼"; }
#submission-filter { width: 100%; max-width: 360px; padding: 6px 8px; margin-bottom: 8px; }
.warnings { border-color: #f0b429; background: #fffbea; }
.note, .no-data { color: #52606d; font-style: italic; }
svg.chart { width: 100%; max-width: 480px; height: auto; display: block; margin: 8px 0; }
svg .bar { fill: #3e7cb1; }
svg .axis, svg .frame { stroke: #9aa5b1; fill: none; }
svg .diagonal { stroke: #e12d39; stroke-dasharray: 4 3; }
svg .point { fill: #3e7cb1; fill-opacity: 0.55; }
svg .tick, svg .axis-label { font-size: 10px; fill: #52606d; }
footer { color: #7b8794; font-size: 0.85em; margin: 24px 0; }
"#;

const SCRIPT: &str = r#"(function () {
  var table = document.getElementById("submissions");
  if (!table) { return; }
  var body = table.tBodies[0];
  var filter = document.getElementById("submission-filter");
  if (filter) {
    filter.addEventListener("input", function () {
      var needle = filter.value.toLowerCase();
      Array.prototype.forEach.call(body.rows, function (row) {
        row.style.display = row.textContent.toLowerCase().indexOf(needle) === -1 ? "none" : "";
      });
    });
  }
  Array.prototype.forEach.call(table.tHead.rows[0].cells, function (th, index) {
    var kind = th.getAttribute("data-sort");
    if (!kind) { return; }
    th.addEventListener("click", function () {
      var ascending = !th.classList.contains("asc");
      Array.prototype.forEach.call(table.tHead.rows[0].cells, function (other) {
        other.classList.remove("asc", "desc");
      });
      th.classList.add(ascending ? "asc" : "desc");
      var rows = Array.prototype.slice.call(body.rows);
      rows.sort(function (a, b) {
        var x = a.cells[index], y = b.cells[index];
        var result;
        if (kind === "num") {
          var p = parseFloat(x.getAttribute("data-value")), q = parseFloat(y.getAttribute("data-value"));
          if (isNaN(p) && isNaN(q)) { result = 0; }
          else if (isNaN(p)) { return 1; }
          else if (isNaN(q)) { return -1; }
          else { result = p - q; }
        } else {
          result = x.textContent.localeCompare(y.textContent);
        }
        return ascending ? result : -result;
      });
      rows.forEach(function (row) { body.appendChild(row); });
    });
  });
})();
"#;
