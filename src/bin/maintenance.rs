use std::env;

use anyhow::{Context, Result};
use uuid::Uuid;

use doc_compliance::{audit, config::AppConfig, db};

const USAGE: &str = "Usage: maintenance migrate | maintenance audit-trail <company_id> <document_id>";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).compact().init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("migrate") => migrate()?,
        Some("audit-trail") => {
            let company_id = parse_id(args.next(), "company_id")?;
            let document_id = parse_id(args.next(), "document_id")?;
            audit_trail(company_id, document_id)?;
        }
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn parse_id(raw: Option<String>, name: &str) -> Result<Uuid> {
    let raw = raw.with_context(|| format!("missing {name}\n{USAGE}"))?;
    raw.parse()
        .with_context(|| format!("{name} must be a UUID, got `{raw}`"))
}

fn connect() -> Result<db::PgPool> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded configuration"
    );
    db::init_pool_with_size(&config.database_url, 1)
}

fn migrate() -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;
    let applied = db::run_migrations(&mut conn)?;
    println!("Applied {applied} migration(s).");
    Ok(())
}

/// Prints the audit events of one document, including deleted ones.
fn audit_trail(company_id: Uuid, document_id: Uuid) -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let events = audit::events_for_document(&mut conn, company_id, document_id)
        .context("failed to load audit events")?;
    if events.is_empty() {
        println!("No audit events for document {document_id}.");
        return Ok(());
    }

    for event in events {
        println!(
            "{}  {:<20} actor={} on_behalf_of={} {}",
            event.created_at,
            event.event_type,
            event.actor_id,
            event
                .on_behalf_of
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            event.details
        );
    }
    Ok(())
}
