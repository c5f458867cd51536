use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Datelike, Local, NaiveDate};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    FinancialEvent, ProjectionSummary, Scenario, SimulationParams, YearlyData, project_scenario,
    summarize,
};
use crate::export::{format_amount, render_report, to_csv_string};

const MAX_DURATION_YEARS: u32 = 100;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
    Report,
}

/// Flat request body; every parameter is optional and overlays the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    start_year: Option<i32>,
    initial_capital: Option<f64>,
    monthly_contribution: Option<f64>,
    adjust_contribution_for_inflation: Option<bool>,
    annual_return_rate: Option<f64>,
    is_tax_enabled: Option<bool>,
    tax_rate: Option<f64>,
    tax_adjusted_for_inflation: Option<bool>,
    duration_years: Option<u32>,
    inflation_rate: Option<f64>,
    target_monthly_income: Option<f64>,

    events: Vec<FinancialEvent>,
}

/// Scenario file as written by `--save-scenario`. `params` may be omitted to
/// keep the command-line values.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScenarioFile {
    params: Option<SimulationParams>,
    events: Vec<FinancialEvent>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "capital",
    about = "Deterministic portfolio projection (contributions, inflation, tax, loans and leverage)"
)]
struct Cli {
    #[arg(long, help = "Calendar year of year 0; defaults to the current year")]
    start_year: Option<i32>,
    #[arg(long, default_value_t = 0.0)]
    initial_capital: f64,
    #[arg(long, default_value_t = 1000.0)]
    monthly_contribution: f64,
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        help = "Grow the monthly contribution with inflation"
    )]
    adjust_contribution_for_inflation: bool,
    #[arg(
        long,
        default_value_t = 10.0,
        allow_negative_numbers = true,
        help = "Blended annual return in percent"
    )]
    annual_return_rate: f64,
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    tax_enabled: bool,
    #[arg(long, default_value_t = 26.0, help = "Capital gains tax in percent")]
    tax_rate: f64,
    #[arg(
        long,
        default_value_t = false,
        action = ArgAction::Set,
        help = "Only tax growth above inflation"
    )]
    tax_adjusted_for_inflation: bool,
    #[arg(long, default_value_t = 50)]
    duration_years: u32,
    #[arg(long, default_value_t = 3.0, help = "Annual inflation in percent")]
    inflation_rate: f64,
    #[arg(long, default_value_t = 2000.0)]
    target_monthly_income: f64,
    #[arg(
        long,
        help = "Scenario JSON with `params` and/or `events`; file params override the parameter flags"
    )]
    scenario: Option<PathBuf>,
    #[arg(long, help = "Write the resolved scenario as JSON")]
    save_scenario: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    #[arg(long, help = "Write output to a file instead of stdout")]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    years: Vec<YearlyData>,
    summary: Option<ProjectionSummary>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_params(cli: &Cli) -> Result<SimulationParams, String> {
    if !cli.initial_capital.is_finite() || cli.initial_capital < 0.0 {
        return Err("--initial-capital must be >= 0".to_string());
    }

    if !cli.monthly_contribution.is_finite() || cli.monthly_contribution < 0.0 {
        return Err("--monthly-contribution must be >= 0".to_string());
    }

    if !cli.annual_return_rate.is_finite() || cli.annual_return_rate <= -100.0 {
        return Err("--annual-return-rate must be > -100".to_string());
    }

    if !(0.0..=100.0).contains(&cli.tax_rate) {
        return Err("--tax-rate must be between 0 and 100".to_string());
    }

    if !(1..=MAX_DURATION_YEARS).contains(&cli.duration_years) {
        return Err(format!(
            "--duration-years must be between 1 and {MAX_DURATION_YEARS}"
        ));
    }

    if !cli.inflation_rate.is_finite() || cli.inflation_rate < 0.0 {
        return Err("--inflation-rate must be >= 0".to_string());
    }

    if !cli.target_monthly_income.is_finite() || cli.target_monthly_income < 0.0 {
        return Err("--target-monthly-income must be >= 0".to_string());
    }

    Ok(SimulationParams {
        start_year: cli.start_year.unwrap_or_else(|| Local::now().year()),
        initial_capital: cli.initial_capital,
        monthly_contribution: cli.monthly_contribution,
        adjust_contribution_for_inflation: cli.adjust_contribution_for_inflation,
        annual_return_rate: cli.annual_return_rate,
        is_tax_enabled: cli.tax_enabled,
        tax_rate: cli.tax_rate,
        tax_adjusted_for_inflation: cli.tax_adjusted_for_inflation,
        duration_years: cli.duration_years,
        inflation_rate: cli.inflation_rate,
        target_monthly_income: cli.target_monthly_income,
    })
}

fn apply_params(cli: &mut Cli, params: &SimulationParams) {
    cli.start_year = Some(params.start_year);
    cli.initial_capital = params.initial_capital;
    cli.monthly_contribution = params.monthly_contribution;
    cli.adjust_contribution_for_inflation = params.adjust_contribution_for_inflation;
    cli.annual_return_rate = params.annual_return_rate;
    cli.tax_enabled = params.is_tax_enabled;
    cli.tax_rate = params.tax_rate;
    cli.tax_adjusted_for_inflation = params.tax_adjusted_for_inflation;
    cli.duration_years = params.duration_years;
    cli.inflation_rate = params.inflation_rate;
    cli.target_monthly_income = params.target_monthly_income;
}

fn default_cli_for_api() -> Cli {
    Cli {
        start_year: None,
        initial_capital: 0.0,
        monthly_contribution: 1000.0,
        adjust_contribution_for_inflation: true,
        annual_return_rate: 10.0,
        tax_enabled: false,
        tax_rate: 26.0,
        tax_adjusted_for_inflation: false,
        duration_years: 50,
        inflation_rate: 3.0,
        target_monthly_income: 2000.0,
        scenario: None,
        save_scenario: None,
        format: OutputFormat::Json,
        output: None,
    }
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<Scenario, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<Scenario, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.start_year {
        cli.start_year = Some(v);
    }
    if let Some(v) = payload.initial_capital {
        cli.initial_capital = v;
    }
    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = v;
    }
    if let Some(v) = payload.adjust_contribution_for_inflation {
        cli.adjust_contribution_for_inflation = v;
    }
    if let Some(v) = payload.annual_return_rate {
        cli.annual_return_rate = v;
    }
    if let Some(v) = payload.is_tax_enabled {
        cli.tax_enabled = v;
    }
    if let Some(v) = payload.tax_rate {
        cli.tax_rate = v;
    }
    if let Some(v) = payload.tax_adjusted_for_inflation {
        cli.tax_adjusted_for_inflation = v;
    }
    if let Some(v) = payload.duration_years {
        cli.duration_years = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.target_monthly_income {
        cli.target_monthly_income = v;
    }

    Ok(Scenario {
        params: build_params(&cli)?,
        events: payload.events,
    })
}

fn resolve_scenario(cli: &Cli) -> Result<Scenario, String> {
    let Some(path) = &cli.scenario else {
        return Ok(Scenario {
            params: build_params(cli)?,
            events: Vec::new(),
        });
    };

    let file = load_scenario_file(path)?;
    let mut resolved = cli.clone();
    if let Some(params) = &file.params {
        info!(path = %path.display(), "parameter flags overridden by scenario file params");
        apply_params(&mut resolved, params);
    }
    Ok(Scenario {
        params: build_params(&resolved)?,
        events: file.events,
    })
}

fn load_scenario_file(path: &Path) -> Result<ScenarioFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read scenario {}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid scenario {}: {e}", path.display()))
}

fn save_scenario(path: &Path, scenario: &Scenario) -> Result<(), String> {
    let json = serde_json::to_string_pretty(scenario)
        .map_err(|e| format!("Failed to serialize scenario: {e}"))?;
    fs::write(path, format!("{json}\n"))
        .map_err(|e| format!("Failed to write scenario {}: {e}", path.display()))
}

fn build_project_response(scenario: &Scenario) -> Result<ProjectResponse, String> {
    let years = project_scenario(scenario).map_err(|e| e.to_string())?;
    let summary = summarize(&scenario.params, &years);
    Ok(ProjectResponse { years, summary })
}

fn render_output(
    format: OutputFormat,
    scenario: &Scenario,
    generated_on: NaiveDate,
) -> Result<String, String> {
    let response = build_project_response(scenario)?;
    match format {
        OutputFormat::Table => Ok(render_table(&response)),
        OutputFormat::Json => serde_json::to_string_pretty(&response)
            .map(|json| format!("{json}\n"))
            .map_err(|e| format!("Failed to serialize projection: {e}")),
        OutputFormat::Csv => to_csv_string(&response.years).map_err(|e| e.to_string()),
        OutputFormat::Report => Ok(render_report(scenario, &response.years, generated_on)),
    }
}

fn render_table(response: &ProjectResponse) -> String {
    let mut out = format!(
        "{:>4}  {:>6}  {:>16}  {:>16}  {:>14}  {:>14}  {:>12}  {:>16}\n",
        "Year", "Label", "Portfolio", "Invested", "Withdrawn", "Profit", "Tax", "Real value"
    );
    for row in &response.years {
        out.push_str(&format!(
            "{:>4}  {:>6}  {:>16}  {:>16}  {:>14}  {:>14}  {:>12}  {:>16}\n",
            row.year,
            row.label,
            format_amount(row.portfolio_value),
            format_amount(row.total_invested),
            format_amount(row.total_withdrawn),
            format_amount(row.yearly_profit),
            format_amount(row.yearly_tax),
            format_amount(row.inflation_adjusted_value),
        ));
    }

    if let Some(goal) = response
        .summary
        .as_ref()
        .and_then(|summary| summary.income_goal.as_ref())
    {
        out.push('\n');
        match &goal.reached {
            Some(reached) => out.push_str(&format!(
                "Target income of {}/month reached in {} ({}/month)\n",
                format_amount(goal.target_monthly_income),
                reached.label,
                format_amount(reached.monthly_income)
            )),
            None => out.push_str(&format!(
                "Target income of {}/month not reached; best {}/month ({:.0}%)\n",
                format_amount(goal.target_monthly_income),
                format_amount(goal.max_monthly_income),
                goal.progress_percent
            )),
        }
    }
    out
}

/// Runs the command-line projection using the process arguments.
pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let scenario = resolve_scenario(&cli)?;

    if let Some(path) = &cli.save_scenario {
        save_scenario(path, &scenario)?;
        info!(path = %path.display(), "scenario saved");
    }

    let rendered = render_output(cli.format, &scenario, Local::now().date_naive())?;
    match &cli.output {
        Some(path) => {
            fs::write(path, rendered)
                .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
            info!(path = %path.display(), format = ?cli.format, "projection written");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/export/csv", post(export_csv_handler))
        .route("/api/export/report", post(export_report_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection HTTP API listening");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let scenario = match api_request_from_payload(payload) {
        Ok(scenario) => scenario,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    debug!(
        years = scenario.params.duration_years,
        events = scenario.events.len(),
        "projection requested"
    );

    match build_project_response(&scenario) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn export_csv_handler(Json(payload): Json<ProjectPayload>) -> Response {
    let rendered = api_request_from_payload(payload)
        .and_then(|scenario| render_output(OutputFormat::Csv, &scenario, Local::now().date_naive()));
    match rendered {
        Ok(body) => attachment_response("text/csv; charset=utf-8", "csv", body),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn export_report_handler(Json(payload): Json<ProjectPayload>) -> Response {
    let today = Local::now().date_naive();
    let rendered = api_request_from_payload(payload)
        .and_then(|scenario| render_output(OutputFormat::Report, &scenario, today));
    match rendered {
        Ok(body) => attachment_response("text/plain; charset=utf-8", "txt", body),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn attachment_response(content_type: &'static str, extension: &str, body: String) -> Response {
    let filename = format!(
        "attachment; filename=\"capital_projection_{}.{extension}\"",
        Local::now().date_naive().format("%Y-%m-%d")
    );
    let disposition = match filename.parse::<header::HeaderValue>() {
        Ok(value) => value,
        Err(_) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Invalid filename"),
    };

    let mut response = with_cache_control(([(header::CONTENT_TYPE, content_type)], body));
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);
    response
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    warn!(status = status.as_u16(), error = msg, "request rejected");
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
