use clap::Subcommand;
use repcue_core::SessionLog;

#[derive(Subcommand)]
pub enum LogAction {
    /// Most recent completed sessions
    List {
        /// Maximum number of sessions
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Totals across all sessions
    Stats,
}

pub fn run(action: LogAction) -> Result<(), Box<dyn std::error::Error>> {
    let log = SessionLog::open()?;

    match action {
        LogAction::List { limit, json } => {
            let records = log.list(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("no sessions recorded");
            }
            for record in records {
                let rpe = record.rpe.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
                let pain = record
                    .pain_score
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{}  {:<16} {:>6.0}s  rpe {:>2}  pain {:>2}  {}",
                    record.completed_at.format("%Y-%m-%d %H:%M"),
                    record.project_id,
                    record.duration_sec,
                    rpe,
                    pain,
                    record.pain_location.as_deref().unwrap_or(""),
                );
            }
        }
        LogAction::Stats => {
            let stats = log.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
