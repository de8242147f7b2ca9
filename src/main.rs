use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum_prometheus::PrometheusMetricLayer;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use transfer_desk::auth::{Credentials, SessionStore};
use transfer_desk::config::AppConfig;
use transfer_desk::error::AppError;
use transfer_desk::router::{transfer_router, AppState};
use transfer_desk::telemetry;
use transfer_desk::transfers::allocation::{
    AllocationEngine, AllocationOptions, AllocationOutcome,
};
use transfer_desk::transfers::application::{validate_preferences, TransferApplication};
use transfer_desk::transfers::district::District;
use transfer_desk::transfers::lists::DraftPlacement;
use transfer_desk::transfers::roster::{EmployeeRecord, Pen, RosterCsvImporter};
use transfer_desk::transfers::vacancy::VacancySlot;
use transfer_desk::transfers::{InMemoryRoundStore, TransferService};

#[derive(Parser, Debug)]
#[command(
    name = "Transfer Desk",
    about = "Run the district transfer management service or an offline draft allocation",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run the draft auto-fill offline from CSV inputs
    Allocate(AllocateArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct AllocateArgs {
    /// Cadre roster CSV (same columns as the import sheet)
    #[arg(long)]
    roster: PathBuf,
    /// Applications CSV: PEN followed by up to 8 preferred districts,
    /// then an optional Yes in a Special Priority column
    #[arg(long)]
    applications: PathBuf,
    /// Vacancy CSV: District, Total Strength, Reported (omit for none)
    #[arg(long)]
    vacancies: Option<PathBuf>,
    /// Attempt against transfers when preferences are exhausted
    #[arg(long)]
    against: bool,
    /// Evaluation date for seniority (defaults to today)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
    /// Print the full placement list grouped by destination
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Allocate(args) => run_allocate(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));

    let service = TransferService::new(Arc::new(InMemoryRoundStore::new()));
    let sessions = Arc::new(SessionStore::new(
        Credentials {
            username: config.auth.admin_user.clone(),
            password: config.auth.admin_password.clone(),
        },
        config.auth.session_ttl_hours,
    ));

    let state = AppState {
        service,
        sessions,
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };
    let app = transfer_router(state, prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "transfer desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_allocate(args: AllocateArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let import = RosterCsvImporter::from_path(&args.roster)
        .map_err(transfer_desk::transfers::service::ServiceError::from)?;
    let roster: BTreeMap<Pen, EmployeeRecord> = import
        .records
        .iter()
        .map(|record| (record.pen.clone(), record.clone()))
        .collect();

    let applications = read_applications(&args.applications, today)?;
    let vacancies = match &args.vacancies {
        Some(path) => read_vacancies(path)?,
        None => BTreeMap::new(),
    };

    let outcome = AllocationEngine::new(
        &roster,
        &applications,
        &vacancies,
        &BTreeMap::new(),
        today,
        AllocationOptions {
            enable_against: args.against,
        },
    )
    .run()
    .map_err(transfer_desk::transfers::service::ServiceError::from)?;

    render_allocation(&outcome, &roster, today, args.list);
    Ok(())
}

/// One row per applicant: PEN, then up to eight preferred districts, then an
/// optional Yes marking special priority. Unknown district cells are ignored.
fn read_applications(
    path: &PathBuf,
    today: NaiveDate,
) -> Result<BTreeMap<Pen, TransferApplication>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(csv_to_app)?;

    let mut applications = BTreeMap::new();
    for row in reader.records() {
        let row = row.map_err(csv_to_app)?;
        let Some(pen) = row.get(0).map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        let mut preferences = Vec::new();
        let mut special_priority = false;
        for cell in row.iter().skip(1) {
            let cell = cell.trim();
            if let Ok(district) = cell.parse::<District>() {
                if !preferences.contains(&district) {
                    preferences.push(district);
                }
            } else if cell.eq_ignore_ascii_case("yes") {
                special_priority = true;
            }
        }
        validate_preferences(&preferences)
            .map_err(transfer_desk::transfers::service::ServiceError::from)?;
        let pen = Pen::new(pen);
        applications.insert(
            pen.clone(),
            TransferApplication {
                pen,
                applied_on: today,
                receipt_numbers: String::new(),
                preferences,
                special_priority,
                special_priority_reason: None,
                locked: false,
            },
        );
    }
    Ok(applications)
}

fn read_vacancies(path: &PathBuf) -> Result<BTreeMap<District, VacancySlot>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(csv_to_app)?;

    let mut vacancies = BTreeMap::new();
    for row in reader.records() {
        let row = row.map_err(csv_to_app)?;
        let Some(Ok(district)) = row.get(0).map(|cell| cell.trim().parse::<District>()) else {
            continue;
        };
        let total_strength = row
            .get(1)
            .and_then(|cell| cell.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let reported = row
            .get(2)
            .and_then(|cell| cell.trim().parse::<u32>().ok())
            .unwrap_or(0);
        vacancies.insert(
            district,
            VacancySlot {
                total_strength,
                reported,
            },
        );
    }
    Ok(vacancies)
}

fn csv_to_app(err: csv::Error) -> AppError {
    AppError::from(err)
}

fn render_allocation(
    outcome: &AllocationOutcome,
    roster: &BTreeMap<Pen, EmployeeRecord>,
    today: NaiveDate,
    list: bool,
) {
    println!("Draft allocation (evaluated {today})");
    let tally = outcome.tally;
    println!(
        "- placed: {} (special {}, weightage {}, normal {})",
        tally.total, tally.special, tally.weightage, tally.normal
    );
    println!(
        "- cascade fills: {}, against transfers: {}",
        tally.cascade, tally.against
    );

    if outcome.unplaced.is_empty() {
        println!("- unplaced: none");
    } else {
        println!("- unplaced: {}", outcome.unplaced.len());
        for pen in &outcome.unplaced {
            match roster.get(pen) {
                Some(record) => println!("  - {} ({})", pen, record.name),
                None => println!("  - {pen}"),
            }
        }
    }

    if list {
        for district in District::ALL {
            let placed: Vec<&DraftPlacement> = outcome
                .placements
                .iter()
                .filter(|placement| placement.to_district == district)
                .collect();
            if placed.is_empty() {
                continue;
            }
            println!("\n{district}");
            for placement in placed {
                let (name, from) = roster
                    .get(&placement.pen)
                    .map(|record| (record.name.as_str(), record.district.name()))
                    .unwrap_or(("?", "?"));
                let remarks = placement.reason.remarks();
                if remarks.is_empty() {
                    println!("- {} | {} | from {}", placement.pen, name, from);
                } else {
                    println!("- {} | {} | from {} | {}", placement.pen, name, from, remarks);
                }
            }
        }
    }
}
