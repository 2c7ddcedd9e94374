//! FlexSettle CLI - drive the settlement engine against a journal file.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use flexsettle_canonical::{ActorId, EventId, MethodTag, SiteId};
use flexsettle_engine::{NewEvent, ProofSubmission};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod error;
mod output;

use commands::{event, journal, proof, settlement, status};
use context::GlobalArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "flexsettle")]
#[command(about = "Demand-response event, proof and settlement CLI")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an event
    CreateEvent {
        /// Event identifier
        #[arg(long)]
        event_id: EventId,
        /// Window start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// Window end (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
        /// Aggregate reduction target in kW
        #[arg(long)]
        target_kw: u64,
        /// Reward per kWh
        #[arg(long)]
        reward_rate: u64,
        /// Penalty per kWh of shortfall
        #[arg(long)]
        penalty_rate: u64,
    },
    /// Close an active event
    CloseEvent {
        /// Event identifier
        event_id: EventId,
    },
    /// Submit a site's proof for an active event
    SubmitProof {
        /// Event identifier
        #[arg(long)]
        event_id: EventId,
        /// Reporting site
        #[arg(long)]
        site_id: SiteId,
        /// Counterfactual consumption in kWh
        #[arg(long)]
        baseline_kwh: u64,
        /// Metered consumption in kWh
        #[arg(long)]
        actual_kwh: u64,
        /// Baseline method tag
        #[arg(long, default_value = "simple")]
        method: MethodTag,
        /// Pointer to the raw meter data
        #[arg(long)]
        uri: String,
        /// Raw evidence as a JSON object
        #[arg(long)]
        raw_payload: Option<String>,
        /// Expected proof hash; rejected if it does not match
        #[arg(long)]
        proof_hash: Option<String>,
        /// Submitting actor (the only actor allowed to claim)
        #[arg(long)]
        actor: ActorId,
    },
    /// Settle a closed event
    Settle {
        /// Event identifier
        event_id: EventId,
        /// Site to settle (repeatable; default: every site with a proof)
        #[arg(long = "site")]
        sites: Vec<SiteId>,
    },
    /// Claim a settled payout
    Claim {
        /// Event identifier
        event_id: EventId,
        /// Settled site
        site_id: SiteId,
        /// Claiming actor
        #[arg(long)]
        actor: ActorId,
    },
    /// Show an event
    Event {
        /// Event identifier
        event_id: EventId,
    },
    /// List an event's settlements
    Settlements {
        /// Event identifier
        event_id: EventId,
    },
    /// Show a stored proof
    Proof {
        /// Event identifier
        event_id: EventId,
        /// Site
        site_id: SiteId,
    },
    /// Re-verify a stored proof's hash
    Audit {
        /// Event identifier
        event_id: EventId,
        /// Site
        site_id: SiteId,
    },
    /// Show an event's progress summary
    Summary {
        /// Event identifier
        event_id: EventId,
    },
    /// Refresh submitted ledger transactions
    Reconcile {
        /// Limit the pass to one event
        event_id: Option<EventId>,
    },
    /// List ledger actions that have no local commit
    Orphans,
    /// List commit records in the journal
    Journal {
        /// Stop after N commits (default: unlimited)
        #[arg(long)]
        max_commits: Option<u64>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FLEXSETTLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let global = &cli.global;
    match cli.command {
        Commands::CreateEvent {
            event_id,
            start,
            end,
            target_kw,
            reward_rate,
            penalty_rate,
        } => event::create(
            global,
            NewEvent {
                event_id,
                start_time: start,
                end_time: end,
                target_kw,
                reward_rate,
                penalty_rate,
            },
        ),
        Commands::CloseEvent { event_id } => event::close(global, &event_id),
        Commands::SubmitProof {
            event_id,
            site_id,
            baseline_kwh,
            actual_kwh,
            method,
            uri,
            raw_payload,
            proof_hash,
            actor,
        } => {
            let raw_payload = raw_payload
                .map(|text| serde_json::from_str(&text))
                .transpose()?;
            proof::submit(
                global,
                ProofSubmission {
                    event_id,
                    site_id,
                    baseline_kwh,
                    actual_kwh,
                    baseline_method: method,
                    uri,
                    raw_payload,
                    proof_hash,
                    submitter: actor,
                },
            )
        }
        Commands::Settle { event_id, sites } => settlement::settle(global, &event_id, &sites),
        Commands::Claim {
            event_id,
            site_id,
            actor,
        } => settlement::claim(global, &event_id, &site_id, &actor),
        Commands::Event { event_id } => event::show(global, &event_id),
        Commands::Settlements { event_id } => settlement::list(global, &event_id),
        Commands::Proof { event_id, site_id } => proof::show(global, &event_id, &site_id),
        Commands::Audit { event_id, site_id } => proof::audit(global, &event_id, &site_id),
        Commands::Summary { event_id } => status::summary(global, &event_id),
        Commands::Reconcile { event_id } => status::reconcile(global, event_id),
        Commands::Orphans => status::orphans(global),
        Commands::Journal { max_commits } => journal::run(global, max_commits),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let json = cli.global.json;
    if let Err(e) = run(cli) {
        output::print_error(&e, json);
        std::process::exit(1);
    }
}
