//! Portal CLI - Command-line interface for the Luna intranet portal
//!
//! Commands:
//! - dashboard: Mock clinical dashboard for one participant
//! - participants: Study overview and participant roster
//! - metrics: Glycemic metrics for a recorded glucose trace
//! - order: Beverage order workflow
//! - nda: NDA request workflow
//! - follow: Act on an approve/deny link
//! - doctor: Diagnose configuration and storage

use chrono::{DateTime, FixedOffset, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use luna_portal::approvals::{
    ApprovalAction, ApprovalDesk, DecisionOutcome, JsonFileStore, KeyValueStore, LinkSettings,
    NdaSigner, OrderLine,
};
use luna_portal::clinical::generators::DEFAULT_PARTICIPANT_COUNT;
use luna_portal::clinical::{
    ClinicalProcessor, GlucosePoint, LookbackWindow, MetricsCalculator, MetricsSummary,
    ParticipantStatus, TargetReport,
};
use luna_portal::config;
use luna_portal::signature::{HttpSignatureClient, NdaRecipient};
use luna_portal::{PortalConfig, PortalError, PORTAL_VERSION, PRODUCER_NAME};

const DEFAULT_DATA_DIR: &str = ".luna-portal";

/// Portal - Luna intranet workflows and clinical dashboard data
#[derive(Parser)]
#[command(name = "portal")]
#[command(author = "Luna Health")]
#[command(version = PORTAL_VERSION)]
#[command(about = "Beverage orders, NDA requests and clinical dashboard data", long_about = None)]
struct Cli {
    /// Directory holding the local record store
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Pretty-print JSON output even when stdout is not a terminal
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mock clinical dashboard for one participant
    Dashboard {
        /// Participant id (e.g., P004)
        #[arg(short, long, default_value = "P001")]
        participant: String,

        /// Lookback window: 24h, 7d or 14d
        #[arg(short, long, default_value = "24h")]
        window: String,

        /// Reference instant (RFC 3339); defaults to now at the site offset
        #[arg(long)]
        at: Option<String>,

        /// Seed; defaults to one derived from the participant id
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Study overview and participant roster
    Participants {
        /// Roster size
        #[arg(long, default_value_t = DEFAULT_PARTICIPANT_COUNT)]
        count: usize,

        /// Case-insensitive participant id filter
        #[arg(long, default_value = "")]
        search: String,

        /// Status filter: active, paused or flagged
        #[arg(long)]
        status: Option<String>,

        /// Reference instant (RFC 3339)
        #[arg(long)]
        at: Option<String>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Glycemic metrics for a recorded glucose trace
    Metrics {
        /// JSON array of {timestamp, glucose} readings (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Beverage order workflow
    #[command(subcommand)]
    Order(OrderCommand),

    /// NDA request workflow
    #[command(subcommand)]
    Nda(NdaCommand),

    /// Act on an approve/deny link as if it had been clicked
    Follow {
        link: String,
    },

    /// Diagnose configuration and storage
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum OrderCommand {
    /// Submit an order for approval
    Submit {
        /// Name of the person ordering
        #[arg(long = "by")]
        submitted_by: String,

        /// Item as category:brand:flavor[:quantity], repeatable
        #[arg(long = "item", required = true)]
        items: Vec<String>,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Approve a pending order
    Approve { id: String },
    /// Deny a pending order
    Deny { id: String },
    /// Record that the vendor email went out
    Sent { id: String },
    /// List orders, newest first
    History,
    /// Remove all orders
    Clear,
}

#[derive(Subcommand)]
enum NdaCommand {
    /// Submit an NDA request for approval
    Submit(NdaForm),
    /// Approve a pending request and send the NDA
    Approve { id: String },
    /// Deny a pending request
    Deny { id: String },
    /// Send an approved or failed request again
    Retry { id: String },
    /// Record that the signed NDA came back
    Signed { id: String },
    /// List requests, newest first
    History,
    /// Remove all requests
    Clear,
}

#[derive(Args)]
struct NdaForm {
    #[arg(long)]
    company: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address_line1: Option<String>,
    #[arg(long)]
    address_line2: Option<String>,
    #[arg(long)]
    address_line3: Option<String>,
}

impl From<NdaForm> for NdaRecipient {
    fn from(form: NdaForm) -> Self {
        NdaRecipient {
            company_name: form.company,
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
            title: form.title,
            phone: form.phone,
            address_line1: form.address_line1,
            address_line2: form.address_line2,
            address_line3: form.address_line3,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PortalCliError> {
    let out = Output {
        pretty: cli.pretty || atty::is(atty::Stream::Stdout),
    };

    // clinical commands only read the site offset
    match cli.command {
        Commands::Dashboard {
            participant,
            window,
            at,
            seed,
        } => cmd_dashboard(&out, &participant, &window, at.as_deref(), seed),
        Commands::Participants {
            count,
            search,
            status,
            at,
            seed,
        } => cmd_participants(&out, count, &search, status.as_deref(), at.as_deref(), seed),
        Commands::Metrics { input } => cmd_metrics(&out, &input),
        Commands::Order(command) => cmd_order(&out, &PortalConfig::from_env()?, &cli.data_dir, command),
        Commands::Nda(command) => cmd_nda(&out, &PortalConfig::from_env()?, &cli.data_dir, command),
        Commands::Follow { link } => {
            let mut desk = open_desk(&PortalConfig::from_env()?, &cli.data_dir)?;
            let outcome = desk.follow(&link)?;
            report_outcome(&out, outcome)
        }
        Commands::Doctor { json } => cmd_doctor(&PortalConfig::from_env()?, &cli.data_dir, json),
    }
}

fn reference_time(at: Option<&str>) -> Result<DateTime<FixedOffset>, PortalCliError> {
    match at {
        Some(value) => DateTime::parse_from_rfc3339(value).map_err(|e| {
            PortalCliError::Usage(format!("Invalid --at value {value:?}: {e}"))
        }),
        None => Ok(Utc::now().with_timezone(&config::site_offset_from_env()?)),
    }
}

fn cmd_dashboard(
    out: &Output,
    participant: &str,
    window: &str,
    at: Option<&str>,
    seed: Option<u64>,
) -> Result<(), PortalCliError> {
    let window = LookbackWindow::parse(window)
        .ok_or_else(|| PortalCliError::Usage(format!("Unknown window {window:?}; use 24h, 7d or 14d")))?;
    let reference = reference_time(at)?;

    let mut processor = match seed {
        Some(seed) => ClinicalProcessor::with_seed(seed),
        None => ClinicalProcessor::for_participant(participant),
    };
    let dashboard = processor.participant_dashboard(participant, reference, window);
    out.emit(&dashboard)
}

fn cmd_participants(
    out: &Output,
    count: usize,
    search: &str,
    status: Option<&str>,
    at: Option<&str>,
    seed: Option<u64>,
) -> Result<(), PortalCliError> {
    let status = status
        .map(|s| {
            ParticipantStatus::parse(s)
                .ok_or_else(|| PortalCliError::Usage(format!("Unknown status {s:?}; use active, paused or flagged")))
        })
        .transpose()?;
    let reference = reference_time(at)?;

    let mut processor = match seed {
        Some(seed) => ClinicalProcessor::with_seed(seed),
        None => ClinicalProcessor::new(),
    };
    let overview = processor.study_overview(reference, count, search, status);
    out.emit(&overview)
}

#[derive(Serialize)]
struct MetricsReport {
    readings: usize,
    metrics: MetricsSummary,
    targets: TargetReport,
}

fn cmd_metrics(out: &Output, input: &Path) -> Result<(), PortalCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let trace: Vec<GlucosePoint> = serde_json::from_str(&input_data)?;
    MetricsCalculator::validate_trace(&trace)?;
    let metrics = MetricsCalculator::calculate(&trace);
    out.emit(&MetricsReport {
        readings: trace.len(),
        metrics,
        targets: MetricsCalculator::evaluate_targets(&metrics),
    })
}

type PortalDesk = ApprovalDesk<JsonFileStore, HttpSignatureClient>;

fn open_desk(config: &PortalConfig, data_dir: &Path) -> Result<PortalDesk, PortalCliError> {
    let store = JsonFileStore::open(data_dir)?;
    let links = LinkSettings::from_config(config);

    match config.signature_settings() {
        Ok(settings) => {
            let client = HttpSignatureClient::new(&settings)?;
            Ok(ApprovalDesk::new(store, links, NdaSigner::new(client, settings.template())))
        }
        Err(PortalError::MissingConfig(missing)) => Ok(ApprovalDesk::without_signer(store, links, missing)),
        Err(e) => Err(e.into()),
    }
}

/// Parse `category:brand:flavor[:quantity]`
fn parse_item(item: &str) -> Result<OrderLine, PortalCliError> {
    let mut parts = item.splitn(3, ':');
    let (Some(category), Some(brand_id), Some(rest)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(PortalCliError::Usage(format!(
            "Invalid item {item:?}; expected category:brand:flavor[:quantity]"
        )));
    };

    let (flavor, quantity) = match rest.rsplit_once(':') {
        Some((flavor, qty)) => match qty.trim().parse::<u32>() {
            Ok(quantity) => (flavor, quantity),
            Err(_) => (rest, 1),
        },
        None => (rest, 1),
    };

    Ok(OrderLine {
        category: category.trim().to_string(),
        brand_id: brand_id.trim().to_string(),
        flavor: flavor.trim().to_string(),
        quantity,
    })
}

fn cmd_order(out: &Output, config: &PortalConfig, data_dir: &Path, command: OrderCommand) -> Result<(), PortalCliError> {
    let mut desk = open_desk(config, data_dir)?;

    match command {
        OrderCommand::Submit {
            submitted_by,
            items,
            notes,
        } => {
            let lines = items
                .iter()
                .map(|item| parse_item(item))
                .collect::<Result<Vec<_>, _>>()?;
            out.emit(&desk.submit_order(&submitted_by, &lines, notes)?)
        }
        OrderCommand::Approve { id } => report_outcome(out, desk.decide_order(&id, ApprovalAction::Approve)?),
        OrderCommand::Deny { id } => report_outcome(out, desk.decide_order(&id, ApprovalAction::Deny)?),
        OrderCommand::Sent { id } => out.emit(&desk.mark_order_sent(&id)?),
        OrderCommand::History => out.emit(&desk.order_history()?),
        OrderCommand::Clear => {
            desk.clear_orders()?;
            out.emit(&serde_json::json!({ "cleared": "beverage_orders" }))
        }
    }
}

fn cmd_nda(out: &Output, config: &PortalConfig, data_dir: &Path, command: NdaCommand) -> Result<(), PortalCliError> {
    let mut desk = open_desk(config, data_dir)?;

    match command {
        NdaCommand::Submit(form) => out.emit(&desk.submit_nda(form.into())?),
        NdaCommand::Approve { id } => report_outcome(out, desk.decide_nda(&id, ApprovalAction::Approve)?),
        NdaCommand::Deny { id } => report_outcome(out, desk.decide_nda(&id, ApprovalAction::Deny)?),
        NdaCommand::Retry { id } => report_outcome(out, desk.retry_nda(&id)?),
        NdaCommand::Signed { id } => out.emit(&desk.mark_nda_signed(&id)?),
        NdaCommand::History => out.emit(&desk.nda_history()?),
        NdaCommand::Clear => {
            desk.clear_ndas()?;
            out.emit(&serde_json::json!({ "cleared": "nda_requests" }))
        }
    }
}

/// Print the outcome; a failed dispatch still prints but exits non-zero
fn report_outcome(out: &Output, outcome: DecisionOutcome) -> Result<(), PortalCliError> {
    out.emit(&outcome)?;
    match outcome {
        DecisionOutcome::DispatchFailed { message } => Err(PortalCliError::DispatchFailed(message)),
        _ => Ok(()),
    }
}

fn cmd_doctor(config: &PortalConfig, data_dir: &Path, json: bool) -> Result<(), PortalCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "portal_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Portal version {}", PORTAL_VERSION),
    });

    // Signature credentials
    match config.signature_settings() {
        Ok(settings) => checks.push(DoctorCheck {
            name: "signature".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Sending template {} via {} (test_mode={})",
                settings.template_id, settings.api_base, settings.test_mode
            ),
        }),
        Err(e) => checks.push(DoctorCheck {
            name: "signature".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let password_check = if config.site_password.is_some() {
        DoctorCheck {
            name: "site_password".to_string(),
            status: CheckStatus::Ok,
            message: "Site password is set".to_string(),
        }
    } else {
        DoctorCheck {
            name: "site_password".to_string(),
            status: CheckStatus::Warning,
            message: "SITE_PASSWORD is not set; the intranet login gate is open".to_string(),
        }
    };
    checks.push(password_check);

    // Record store
    let store_check = match JsonFileStore::open(data_dir).and_then(check_store_writable) {
        Ok(()) => DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Ok,
            message: format!("Record store at {} is writable", data_dir.display()),
        },
        Err(e) => DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    };
    checks.push(store_check);

    checks.push(DoctorCheck {
        name: "links".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "Approval links point at {}; approver {}; vendor {}",
            config.origin, config.approver_email, config.vendor_email
        ),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PORTAL_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Portal Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PortalCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_store_writable(mut store: JsonFileStore) -> Result<(), PortalError> {
    const CHECK_KEY: &str = "doctor_check";
    store.set(CHECK_KEY, "[]")?;
    store.remove(CHECK_KEY)
}

struct Output {
    pretty: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T) -> Result<(), PortalCliError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{json}");
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum PortalCliError {
    Io(io::Error),
    Portal(PortalError),
    Json(serde_json::Error),
    Usage(String),
    DispatchFailed(String),
    DoctorFailed,
}

impl From<io::Error> for PortalCliError {
    fn from(e: io::Error) -> Self {
        PortalCliError::Io(e)
    }
}

impl From<PortalError> for PortalCliError {
    fn from(e: PortalError) -> Self {
        PortalCliError::Portal(e)
    }
}

impl From<serde_json::Error> for PortalCliError {
    fn from(e: serde_json::Error) -> Self {
        PortalCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: Option<&str>) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
        }
    }
}

impl From<PortalCliError> for CliError {
    fn from(e: PortalCliError) -> Self {
        match e {
            PortalCliError::Io(e) => CliError::new("IO_ERROR", e.to_string(), Some("Check file paths and permissions")),
            PortalCliError::Json(e) => CliError::new("JSON_ERROR", e.to_string(), Some("Check JSON syntax")),
            PortalCliError::Usage(msg) => CliError::new("USAGE_ERROR", msg, Some("Run with --help for usage")),
            PortalCliError::DispatchFailed(msg) => CliError::new(
                "DISPATCH_FAILED",
                msg,
                Some("The approval was kept; fix the cause and run 'portal nda retry <id>'"),
            ),
            PortalCliError::DoctorFailed => CliError::new(
                "DOCTOR_FAILED",
                "One or more health checks failed".to_string(),
                Some("Review the doctor report for details"),
            ),
            PortalCliError::Portal(e) => {
                let message = e.to_string();
                match e {
                    PortalError::MissingField(_) => CliError::new("MISSING_FIELD", message, Some("Fill in every required field")),
                    PortalError::InvalidField { .. } => CliError::new("INVALID_FIELD", message, None),
                    PortalError::MissingConfig(_) => {
                        CliError::new("MISSING_CONFIG", message, Some("Set the listed environment variables"))
                    }
                    PortalError::InvalidConfig(_) => CliError::new("INVALID_CONFIG", message, None),
                    PortalError::Provider { .. } => CliError::new("PROVIDER_ERROR", message, None),
                    PortalError::NotFound(_) => {
                        CliError::new("NOT_FOUND", message, Some("Check the id with the history command"))
                    }
                    PortalError::InvalidTransition { .. } => CliError::new("INVALID_TRANSITION", message, None),
                    PortalError::InvalidLink(_) => CliError::new(
                        "INVALID_LINK",
                        message,
                        Some("Expected <origin>/<beverage|nda>-approve?id=<id>&action=approve|deny"),
                    ),
                    PortalError::Store(_) => CliError::new("STORE_ERROR", message, Some("Check --data-dir")),
                    PortalError::JsonError(_) => CliError::new("JSON_ERROR", message, Some("Check JSON syntax")),
                    PortalError::Http(_) => CliError::new("HTTP_ERROR", message, Some("Check network access to the signature provider")),
                }
            }
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
