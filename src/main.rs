// Pipeline CRM - command line entry point
// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pipeline_crm::{
    export, format, logging, ContactEdit, ContactField, ContactPatch, ContactQuery, ContactStatus,
    CrmApp, CrmConfig, DealStage, EntityId, RecordingNotifier, SortDirection, SortSpec,
};
use pipeline_crm::timeline::month_label;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Parser)]
#[command(name = "crm", version)]
#[command(about = "Pipeline CRM - contacts, deal pipeline, timeline and leaderboard")]
struct Cli {
    /// JSON config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print view models as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Headline metrics and hunter of the month
    Dashboard,
    /// Filtered, sorted contacts table
    Contacts {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<ContactStatus>,
        #[arg(long)]
        rep: Option<String>,
        #[arg(long, default_value = "name")]
        sort: ContactField,
        #[arg(long)]
        desc: bool,
        /// Also write the rows to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Kanban columns with totals
    Pipeline,
    /// Active deals on the month calendar
    Timeline,
    /// Ranked sales reps
    Leaderboard,
    /// Change a contact's status and add tags
    EditContact {
        id: EntityId,
        #[arg(long)]
        status: Option<ContactStatus>,
        /// Tag to add (repeatable)
        #[arg(long)]
        tag: Vec<String>,
    },
    /// Move a deal to another stage
    MoveDeal { id: EntityId, stage: DealStage },
    /// Start a deal's timeline bar at another month
    Reschedule { id: EntityId, month: u8 },
    /// Interactive terminal UI (default)
    Ui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CrmConfig::load(cli.config.as_deref())?;
    let runtime = Runtime::new().context("Failed to start tokio runtime")?;

    match cli.command.unwrap_or(Command::Ui) {
        Command::Ui => run_ui_mode(&runtime, &config),
        command => {
            logging::init(&config.log_filter)?;
            let app = CrmApp::from_config(&config)?;
            runtime.block_on(run_command(&app, command, cli.json))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_command(app: &CrmApp, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Dashboard => {
            let page = app.dashboard().await;
            if json {
                return print_json(&page);
            }
            let m = &page.metrics;
            println!("📊 Dashboard");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("  Leads contacted:  {}", m.leads_contacted);
            println!("  Meetings booked:  {}", m.meetings_booked);
            println!("  Deals closed:     {}", m.deals_closed);
            println!("  Conversion rate:  {}", format::percent(m.conversion_rate));
            if let Some(hunter) = &page.hunter_of_month {
                println!("\n🏆 Hunter of the month: {} ({})", hunter.name, format::currency(hunter.revenue));
            }
        }

        Command::Contacts {
            search,
            status,
            rep,
            sort,
            desc,
            csv,
        } => {
            let query = ContactQuery {
                search,
                status,
                assigned_rep: rep,
            };
            let direction = if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            let page = app.contacts_page(query, SortSpec { field: sort, direction }).await;

            if let Some(path) = csv {
                let written = export::write_contacts_file(&page.rows, &path)?;
                eprintln!("✓ Wrote {} contacts to {:?}", written, path);
            }
            if json {
                return print_json(&page);
            }

            println!("👥 Contacts ({} of {})", page.rows.len(), page.total);
            println!(
                "{:<4} {:<18} {:<24} {:<18} {:<12} {:<14}",
                "ID", "Name", "Email", "Company", "Status", "Rep"
            );
            for c in &page.rows {
                println!(
                    "{:<4} {:<18} {:<24} {:<18} {:<12} {:<14}",
                    c.id,
                    c.name,
                    c.email,
                    c.company,
                    c.status.label(),
                    c.assigned_rep
                );
            }
        }

        Command::Pipeline => {
            let page = app.pipeline().await;
            if json {
                return print_json(&page);
            }
            let s = &page.summary;
            println!("🧭 Pipeline");
            println!(
                "  {} deals worth {}, {} closed worth {}",
                s.total_deals,
                format::currency(s.total_value),
                s.closed_deals,
                format::currency(s.closed_value)
            );
            for column in &page.columns {
                println!(
                    "\n{} ({}, {})",
                    column.title,
                    column.deals.len(),
                    format::currency(column.total_value)
                );
                for deal in &column.deals {
                    println!("  #{:<3} {:<24} {:>10}  {}", deal.id, deal.name, format::currency(deal.value), deal.assigned_rep);
                }
            }
        }

        Command::Timeline => {
            let page = app.timeline().await;
            if json {
                return print_json(&page);
            }
            let s = &page.summary;
            println!("📅 Timeline");
            println!(
                "  {} active deals, {} in play, avg {} months, avg {}",
                s.active_deals,
                format::currency(s.active_value),
                s.average_duration_months,
                format::percent(s.average_probability)
            );
            for row in &page.rows {
                let (start, width) = row.bar.cells(24);
                println!(
                    "  #{:<3} {:<24} |{}{}{}| {}",
                    row.deal.id,
                    row.deal.name,
                    " ".repeat(usize::from(start)),
                    "█".repeat(usize::from(width)),
                    " ".repeat(24usize.saturating_sub(usize::from(start + width))),
                    row.label
                );
            }
        }

        Command::Leaderboard => {
            let page = app.leaderboard().await;
            if json {
                return print_json(&page);
            }
            println!("🏆 Leaderboard");
            for entry in &page.entries {
                let marker = match &page.hunter_of_month {
                    Some(h) if h.id == entry.rep.id => " 🎯",
                    _ => "",
                };
                println!(
                    "  {}. {:<18} closed {:>3}  meetings {:>3}  leads {:>4}  {:>12}  score {}{}",
                    entry.rank,
                    entry.rep.name,
                    entry.rep.deals_closed,
                    entry.rep.meetings_booked,
                    entry.rep.leads_contacted,
                    format::currency(entry.rep.revenue),
                    entry.score,
                    marker
                );
            }
            let t = &page.totals;
            println!(
                "\n  Team: {} leads, {} meetings, {} closed, {}",
                t.leads_contacted,
                t.meetings_booked,
                t.deals_closed,
                format::currency(t.revenue)
            );
        }

        Command::EditContact { id, status, tag } => {
            let notifier = Arc::new(RecordingNotifier::new());
            let coordinator = app.contact_coordinator(notifier.clone()).await;

            let patch = match coordinator.get(id) {
                Some(current) => {
                    let mut edit = ContactEdit::start(&current);
                    if let Some(status) = status {
                        edit.status = status;
                    }
                    for label in tag {
                        edit.input = label;
                        edit.add_input();
                    }
                    edit.patch()
                }
                None => ContactPatch {
                    status,
                    ..Default::default()
                },
            };

            match coordinator.edit(id, patch).await {
                Ok(contact) if json => print_json(&contact)?,
                Ok(contact) => println!(
                    "✓ {} ({}: {}, tags: {})",
                    notifier.last().map(|n| n.message).unwrap_or_default(),
                    contact.name,
                    contact.status.label(),
                    contact.tags.iter().collect::<Vec<_>>().join(", ")
                ),
                Err(failure) => anyhow::bail!("{}: {}", failure.notice, failure.source),
            }
        }

        Command::MoveDeal { id, stage } => {
            let notifier = Arc::new(RecordingNotifier::new());
            let coordinator = app.deal_coordinator(notifier.clone()).await;

            match coordinator.move_to_stage(id, stage).await {
                Ok(Some(deal)) if json => print_json(&deal)?,
                Ok(Some(_)) => println!("✓ {}", notifier.last().map(|n| n.message).unwrap_or_default()),
                Ok(None) => println!("• Deal {} is already in {}", id, stage.title()),
                Err(failure) => anyhow::bail!("{}: {}", failure.notice, failure.source),
            }
        }

        Command::Reschedule { id, month } => {
            let notifier = Arc::new(RecordingNotifier::new());
            let coordinator = app.deal_coordinator(notifier.clone()).await;

            match coordinator.reschedule(id, month).await {
                Ok(deal) if json => print_json(&deal)?,
                Ok(deal) => println!(
                    "✓ {} ({} - {})",
                    notifier.last().map(|n| n.message).unwrap_or_default(),
                    month_label(deal.start_month),
                    month_label(deal.end_month)
                ),
                Err(failure) => anyhow::bail!("{}: {}", failure.notice, failure.source),
            }
        }

        Command::Ui => anyhow::bail!("the terminal UI cannot run as a batch command"),
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(runtime: &Runtime, config: &CrmConfig) -> Result<()> {
    println!("🖥️  Loading Pipeline CRM...\n");

    let app = CrmApp::from_config(config)?;
    let mut state = runtime.block_on(ui::App::load(app));

    ui::run_ui(&mut state, runtime)?;

    println!("\n✅ UI closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_runtime: &Runtime, _config: &CrmConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin crm-server --features server");
    std::process::exit(1);
}
