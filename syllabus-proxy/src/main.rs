mod cache;
mod cli;
mod source;

use std::{env, io, process, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use syllabus_parser::{
    build_events, extract_assignments, important_dates, parse_syllabus, render, Assignment,
    CalendarEvent, Config, ContextMode, CourseInfo, Error, SyllabusEvent, Warning,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use cache::Cache;
use cli::{Args, Convert};

const CALENDAR_PATH: &str = "/calendar";
const ASSIGNMENTS_PATH: &str = "/assignments";

struct AppState {
    cache: Arc<Cache<String, String>>,
    client: reqwest::Client,
    timezone: String,
    year: Option<i32>,
    semester_start: Option<NaiveDate>,
    course: CourseInfo,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    setup_logging();

    let args = cli::parse(env::args().skip(1).collect());

    if let Some(convert) = &args.convert {
        if let Err(err) = convert_file(&args, convert).await {
            eprintln!("{err}");
            process::exit(1);
        }
        return Ok(());
    }

    let state = Arc::new(AppState {
        cache: Cache::new(cache::Settings {
            enabled: args.enable_cache,
            ttl: args.cache_ttl,
        }),
        client: reqwest::Client::new(),
        timezone: args.timezone,
        year: args.year,
        semester_start: args.semester_start,
        course: args.course,
    });

    let router = Router::new()
        .route(
            CALENDAR_PATH,
            get(handle_remote_calendar).post(handle_calendar),
        )
        .route(ASSIGNMENTS_PATH, post(handle_assignments))
        .with_state(state);

    let listener = TcpListener::bind(args.address).await?;
    tracing::info!("Listening at http://{}", args.address);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

fn setup_logging() {
    let filter = EnvFilter::try_from_env("LOG")
        .unwrap_or_else(|_| EnvFilter::new("syllabus_proxy=info,syllabus_parser=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutting down");
    }
}

/// Extraction failures surface as `InvalidData`, write failures as they are.
async fn convert_file(args: &Args, convert: &Convert) -> io::Result<()> {
    let invalid = |err: Error| io::Error::new(io::ErrorKind::InvalidData, err);

    let text = source::read_file(&convert.input).await.map_err(invalid)?;
    let config = config(Local::now().date_naive(), args.year, args.semester_start, ContextMode::default());

    let extraction = parse_syllabus(&text, &config).map_err(invalid)?;
    let course = (args.course != CourseInfo::default()).then_some(&args.course);
    let events =
        build_events(&extraction.events, course, &args.timezone, &config).map_err(invalid)?;

    tokio::fs::write(&convert.output, render(&events)).await?;

    tracing::info!(
        events = events.len(),
        skipped = extraction.warnings.len(),
        "Wrote {}",
        convert.output.display()
    );
    Ok(())
}

fn config(
    today: NaiveDate,
    year: Option<i32>,
    semester_start: Option<NaiveDate>,
    mode: ContextMode,
) -> Config {
    let mut config = Config::for_date(today).with_mode(mode);
    if let Some(year) = year {
        config = config.with_year(year);
    }
    if let Some(start) = semester_start {
        config = config.with_semester_start(start);
    }
    config
}

#[derive(Deserialize)]
struct CalendarQuery {
    url: Option<String>,
    title: Option<String>,
    instructor: Option<String>,
    timezone: Option<String>,
    year: Option<i32>,
    semester_start: Option<NaiveDate>,
    #[serde(default)]
    mode: ContextMode,
    #[serde(default)]
    json: bool,
}

impl CalendarQuery {
    fn config(&self, state: &AppState) -> Config {
        config(
            Local::now().date_naive(),
            self.year.or(state.year),
            self.semester_start.or(state.semester_start),
            self.mode,
        )
    }

    /// `None` when neither a title nor an instructor is known.
    fn course(&self, state: &AppState) -> Option<CourseInfo> {
        let course = CourseInfo {
            title: self.title.clone().or_else(|| state.course.title.clone()),
            instructor: self
                .instructor
                .clone()
                .or_else(|| state.course.instructor.clone()),
        };
        (course != CourseInfo::default()).then_some(course)
    }
}

#[derive(Serialize)]
struct CalendarResponse {
    events: Vec<CalendarEvent>,
    warnings: Vec<Warning>,
}

#[derive(Serialize)]
struct DeadlinesResponse {
    assignments: Vec<Assignment>,
    important_dates: Vec<SyllabusEvent>,
}

impl DeadlinesResponse {
    fn new(text: &str, config: &Config) -> Self {
        Self {
            assignments: extract_assignments(text, config),
            important_dates: important_dates(text, config)
                .map(|extraction| extraction.events)
                .unwrap_or_default(),
        }
    }
}

async fn handle_calendar(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok());

    let text = match source::Format::from_content_type("request body", content_type) {
        Ok(format) => format.to_text(body),
        Err(err) => return error_response(&err, StatusCode::BAD_REQUEST),
    };

    calendar_response(&state, &query, &text)
}

async fn handle_remote_calendar(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Response {
    let Some(url) = query.url.clone() else {
        return (StatusCode::BAD_REQUEST, "Missing `url` query parameter").into_response();
    };

    match fetch_source(&state, url).await {
        Ok(text) => calendar_response(&state, &query, &text),
        Err(err) => error_response(&err, StatusCode::BAD_GATEWAY),
    }
}

async fn handle_assignments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
    body: String,
) -> Json<DeadlinesResponse> {
    Json(DeadlinesResponse::new(&body, &query.config(&state)))
}

async fn fetch_source(state: &AppState, url: String) -> Result<Arc<String>, Error> {
    if let Some(text) = state.cache.get(&url).await {
        tracing::debug!(%url, "serving cached source");
        return Ok(text);
    }

    let text = source::fetch(&state.client, &url).await?;
    Ok(Arc::clone(&state.cache).insert(url, text).await)
}

fn calendar_response(state: &AppState, query: &CalendarQuery, text: &str) -> Response {
    let config = query.config(state);
    let course = query.course(state);
    let timezone = query.timezone.as_deref().unwrap_or(&state.timezone);

    let result = parse_syllabus(text, &config).and_then(|extraction| {
        build_events(&extraction.events, course.as_ref(), timezone, &config)
            .map(|events| (events, extraction.warnings))
    });

    let (events, warnings) = match result {
        Ok(built) => built,
        Err(err) => return error_response(&err, StatusCode::BAD_GATEWAY),
    };

    if query.json {
        return Json(CalendarResponse { events, warnings }).into_response();
    }

    ([(CONTENT_TYPE, "text/calendar")], render(&events)).into_response()
}

/// `source_status` is used for failures to read the syllabus itself.
fn error_response(err: &Error, source_status: StatusCode) -> Response {
    let status = match err {
        Error::EmptyExtractionResult | Error::UnresolvableDate { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::InvalidTimezone(_) => StatusCode::BAD_REQUEST,
        Error::SourceReadFailure { .. } => source_status,
    };

    tracing::warn!(%status, "{err}");
    (status, err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        let status = |err: Error, source_status| error_response(&err, source_status).status();

        assert_eq!(
            status(Error::EmptyExtractionResult, StatusCode::BAD_GATEWAY),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(Error::InvalidTimezone("Nowhere".into()), StatusCode::BAD_GATEWAY),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(Error::source_read("https://example.org", "timeout"), StatusCode::BAD_GATEWAY),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(Error::source_read("request body", "pdf"), StatusCode::BAD_REQUEST),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn query_overrides_defaults() {
        let state = AppState {
            cache: Cache::new(cache::Settings {
                enabled: false,
                ttl: tokio::time::Duration::ZERO,
            }),
            client: reqwest::Client::new(),
            timezone: "UTC".to_string(),
            year: Some(2024),
            semester_start: None,
            course: CourseInfo {
                title: Some("CS 101".to_string()),
                instructor: Some("Dr. Rivera".to_string()),
            },
        };

        let query = CalendarQuery {
            url: None,
            title: Some("CS 102".to_string()),
            instructor: None,
            timezone: None,
            year: None,
            semester_start: NaiveDate::from_ymd_opt(2024, 1, 8),
            mode: ContextMode::KeywordWindow,
            json: false,
        };

        let config = query.config(&state);
        assert_eq!(config.default_year, 2024);
        assert_eq!(config.semester_base(), NaiveDate::from_ymd_opt(2024, 1, 8));
        assert_eq!(config.mode, ContextMode::KeywordWindow);

        let course = query.course(&state).unwrap();
        assert_eq!(course.title.as_deref(), Some("CS 102"));
        assert_eq!(course.instructor.as_deref(), Some("Dr. Rivera"));
    }

    #[test]
    fn deadlines_include_academic_calendar() {
        let text = "Lab 1: Setup, due date 9/10

Academic Calendar
Oct 8: Midterm Project due
";
        let config = Config::for_date(NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());

        let deadlines = DeadlinesResponse::new(text, &config);

        assert_eq!(deadlines.assignments.len(), 1);
        assert_eq!(deadlines.assignments[0].name, "Lab 1");
        assert_eq!(deadlines.assignments[0].days_until_due, 9);

        assert_eq!(deadlines.important_dates.len(), 1);
        assert_eq!(deadlines.important_dates[0].description, "Midterm Project");

        let empty = DeadlinesResponse::new("Welcome to the course.", &config);
        assert!(empty.assignments.is_empty());
        assert!(empty.important_dates.is_empty());
    }

    #[tokio::test]
    async fn write_failures_are_reported_as_io_errors() {
        let dir = env::temp_dir().join(format!("syllabus-proxy-convert-{}", process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let input = dir.join("syllabus.txt");
        tokio::fs::write(&input, "Jan 15, 2024 - Syllabus Overview").await.unwrap();

        let convert_to = |output: std::path::PathBuf| {
            cli::parse(vec![
                "--input".to_string(),
                input.display().to_string(),
                "--output".to_string(),
                output.display().to_string(),
            ])
        };

        let args = convert_to(dir.join("missing").join("out.ics"));
        let err = convert_file(&args, args.convert.as_ref().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let output = dir.join("out.ics");
        let args = convert_to(output.clone());
        convert_file(&args, args.convert.as_ref().unwrap()).await.unwrap();
        let calendar = tokio::fs::read_to_string(&output).await.unwrap();
        assert!(calendar.starts_with("BEGIN:VCALENDAR"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
