//! # Seed Data Generator
//!
//! Populates a development database with partners and monthly commissions.
//!
//! ## Usage
//! ```bash
//! # Two financial years of data (24 months, default)
//! cargo run -p comtrack-db --bin seed
//!
//! # Longer history
//! cargo run -p comtrack-db --bin seed -- --months 36
//!
//! # Specify database path
//! cargo run -p comtrack-db --bin seed -- --db ./data/comtrack.db
//! ```
//!
//! ## Generated Data
//! - 4 entity types (Motor, Health, Life, Travel)
//! - 3 partners per type
//! - One transaction per partner per month, ending with the current month
//!
//! Amounts vary deterministically by partner and month so every dashboard
//! comparison has something to show.

use anyhow::Context;
use chrono::{Local, Months};
use std::env;

use comtrack_core::period::first_of_month;
use comtrack_core::{Money, NewEntity, NewEntityType};
use comtrack_db::{Database, DbConfig};

/// Entity types and their partners.
const PARTNERS: &[(&str, &[&str])] = &[
    ("Motor", &["Bajaj Allianz", "ICICI Lombard", "Tata AIG"]),
    ("Health", &["Star Health", "Niva Bupa", "Care Health"]),
    ("Life", &["LIC", "HDFC Life", "SBI Life"]),
    ("Travel", &["Reliance General", "Digit", "Acko"]),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut months: u32 = 24;
    let mut db_path = String::from("./comtrack_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--months" | "-m" => {
                if i + 1 < args.len() {
                    months = args[i + 1]
                        .parse()
                        .with_context(|| format!("invalid --months value '{}'", args[i + 1]))?;
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("ComTrack Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -m, --months <N>   Months of history to generate (default: 24)");
                println!("  -d, --db <PATH>    Database file path (default: ./comtrack_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 ComTrack Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Months:   {}", months);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {}", db_path))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.transactions().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} transactions", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let latest = first_of_month(Local::now().date_naive());
    let start = std::time::Instant::now();
    let mut generated = 0usize;

    for (type_idx, (type_name, partners)) in PARTNERS.iter().enumerate() {
        let entity_type = db
            .entity_types()
            .create(&NewEntityType {
                name: type_name.to_string(),
            })
            .await?;

        for (partner_idx, partner_name) in partners.iter().enumerate() {
            let entity = db
                .entities()
                .create(&NewEntity {
                    name: partner_name.to_string(),
                    type_id: entity_type.id.clone(),
                })
                .await?;

            for offset in 0..months {
                let month = latest
                    .checked_sub_months(Months::new(offset))
                    .context("month out of range")?;
                let amount = seed_amount(type_idx * 3 + partner_idx, offset);

                db.transactions().create(&entity.id, month, amount).await?;
                generated += 1;
            }
        }

        println!("  Seeded {} partners for {}", partners.len(), type_name);
    }

    println!();
    println!("✓ Generated {} transactions in {:?}", generated, start.elapsed());

    let stats = db.analytics().transaction_stats().await?;
    println!("  Total commissions: ₹{}", stats.total_amount);
    println!("  Average per transaction: ₹{}", stats.average_amount);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Commission for a partner `months_ago` months back.
///
/// Base of ₹5,000 to ₹29,000 per partner, drifting downward with age so the
/// current period usually beats the previous one, plus a small monthly wobble.
fn seed_amount(partner: usize, months_ago: u32) -> Money {
    let partner = partner as i64;
    let months_ago = i64::from(months_ago);

    let base = 500_000 + (partner * 217_300) % 2_400_000;
    let decay = base * months_ago.min(48) / 96;
    let wobble = ((partner * 31 + months_ago * 17) % 23) * 1_250;

    Money::from_paise(base - decay + wobble)
}
