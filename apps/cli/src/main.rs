#![deny(warnings)]

//! Headless CLI for driving a Pocketpet session: create or resume the
//! save, apply actions, run ticks, and print a status summary.

use anyhow::Result;
use catalog::{CatalogProvider, HttpSource, OfflineSource, RemoteSource};
use persistence::{default_save_dir, SaveStore};
use pet_core::{FoodId, GameConfig, SpeciesId, HAPPINESS_MAX, HEALTH_MAX, SATIATION_MAX};
use pet_econ::wellbeing_score;
use pet_engine::{Session, TickEvent, TickReport};
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Args {
    create: Option<String>,
    name: Option<String>,
    feed: Vec<String>,
    play: u32,
    ticks: u32,
    watch: u32,
    buy: Vec<(String, u32)>,
    yes: bool,
    evolve: bool,
    delete: bool,
    offline: bool,
    save_dir: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--create" => args.create = it.next(),
            "--name" => args.name = it.next(),
            "--feed" => {
                if let Some(id) = it.next() {
                    args.feed.push(id);
                }
            }
            "--play" => args.play += 1,
            "--ticks" => args.ticks = it.next().and_then(|s| s.parse().ok()).unwrap_or(0),
            "--watch" => args.watch = it.next().and_then(|s| s.parse().ok()).unwrap_or(0),
            "--buy" => {
                if let Some(entry) = it.next() {
                    let (id, qty) = match entry.split_once('=') {
                        Some((id, qty)) => (id.to_string(), qty.parse().unwrap_or(1)),
                        None => (entry, 1),
                    };
                    args.buy.push((id, qty));
                }
            }
            "--yes" => args.yes = true,
            "--evolve" => args.evolve = true,
            "--delete" => args.delete = true,
            "--offline" => args.offline = true,
            "--save-dir" => args.save_dir = it.next(),
            _ => {}
        }
    }
    args
}

fn print_report(report: &TickReport) {
    let sign = |n: i64| {
        if n >= 0 {
            format!("+{n}")
        } else {
            n.to_string()
        }
    };
    let mut line = format!(
        "Tick | money {} | health {} | satiation {} | happiness {}",
        sign(report.money_delta()),
        sign(report.health_delta() as i64),
        sign(report.satiation_delta() as i64),
        sign(report.happiness_delta() as i64),
    );
    for event in &report.events {
        let tag = match event {
            TickEvent::Neglected => "neglected!".to_string(),
            TickEvent::Recovered => "recovering".to_string(),
            TickEvent::StreakReset => "streak lost".to_string(),
            TickEvent::RewardPaid { amount } => format!("reward ${amount}"),
        };
        line.push_str(&format!(" | {tag}"));
    }
    println!("{line}");
}

fn print_status(session: &Session) {
    let Some(pet) = session.pet() else {
        println!("No pet yet. Start one with --create <species> (see the species list below).");
        let names = session.species_names();
        let preview: Vec<&str> = names.iter().take(8).map(String::as_str).collect();
        println!("Species ({} available): {} ...", names.len(), preview.join(", "));
        return;
    };

    let score = wellbeing_score(pet.health, pet.satiation, pet.happiness);
    let shiny = if pet.shiny { " ★" } else { "" };
    println!(
        "{}{} ({}) | health {}/{} | satiation {}/{} | happiness {}/{} | wellbeing {}",
        pet.name,
        shiny,
        pet.species.0,
        pet.health,
        HEALTH_MAX,
        pet.satiation,
        SATIATION_MAX,
        pet.happiness,
        HAPPINESS_MAX,
        score
    );
    println!(
        "money ${} | stage {} | full-health streak {}/{}{}",
        pet.money,
        pet.evolution_stage,
        pet.full_health_streak,
        session.config().evolution_threshold,
        if pet.final_stage { " | final stage" } else { "" }
    );

    let inventory: Vec<String> = session
        .foods()
        .iter()
        .map(|f| format!("{} x{}", f.label, pet.stock(&f.id)))
        .collect();
    println!("inventory: {}", inventory.join(", "));

    let shop: Vec<String> = session
        .foods()
        .iter()
        .map(|f| {
            format!(
                "{} ${} (+{} sat, +{} hap)",
                f.label, f.price, f.satiation_delta, f.happiness_delta
            )
        })
        .collect();
    println!("shop: {}", shop.join(" | "));
}

fn run_purchases(session: &mut Session, buys: &[(String, u32)], auto_confirm: bool) {
    for (id, qty) in buys {
        let food = FoodId(id.clone());
        for _ in 0..*qty {
            if let Err(e) = session.add_to_cart(&food) {
                warn!(error = %e, "skipping cart entry");
                break;
            }
        }
    }
    if session.cart().is_empty() {
        return;
    }
    match session.begin_checkout() {
        Ok(pending) => {
            println!("Cart total: ${}", pending.total());
            if auto_confirm {
                if let Err(e) = session.confirm_purchase(pending) {
                    warn!(error = %e, "purchase failed");
                }
            } else {
                info!("purchase not confirmed; pass --yes to commit");
            }
        }
        Err(e) => {
            warn!(error = %e, "checkout rejected");
        }
    }
}

fn watch_ticks(session: &mut Session, count: u32) -> Result<()> {
    let mut seen = 0u32;
    while seen < count {
        if let Some(report) = session.poll_timer(Instant::now())? {
            print_report(&report);
            seen += 1;
        }
        std::thread::sleep(Duration::from_millis(250));
    }
    Ok(())
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    let config = GameConfig::default();
    let store = SaveStore::new(
        args.save_dir
            .clone()
            .unwrap_or_else(|| default_save_dir().to_string()),
    );
    let source: Box<dyn RemoteSource> = if args.offline {
        Box::new(OfflineSource)
    } else {
        Box::new(HttpSource::new())
    };
    let provider = CatalogProvider::new(source, store.clone());
    let mut session = Session::open(config, store, provider)?;

    if args.delete {
        session.delete_save()?;
        println!("Save deleted.");
        return Ok(());
    }

    if let Some(species) = &args.create {
        match session.create_pet(args.name.as_deref(), SpeciesId(species.clone())) {
            Ok(pet) => println!("Welcome, {}!", pet.name),
            Err(e) => warn!(error = %e, "could not create a pet"),
        }
    }

    for id in &args.feed {
        if let Err(e) = session.feed(&FoodId(id.clone())) {
            warn!(error = %e, food = %id, "feeding rejected");
        }
    }
    for _ in 0..args.play {
        if let Err(e) = session.play() {
            warn!(error = %e, "play rejected");
        }
    }

    run_purchases(&mut session, &args.buy, args.yes);

    for _ in 0..args.ticks {
        match session.advance_time() {
            Ok(report) => print_report(&report),
            Err(e) => {
                warn!(error = %e, "tick rejected");
                break;
            }
        }
    }

    if args.evolve {
        match session.evolve() {
            Ok(true) => println!("Evolved!"),
            Ok(false) => println!("Not ready to evolve yet."),
            Err(e) => warn!(error = %e, "evolve rejected"),
        }
    }

    if args.watch > 0 && session.pet().is_some() {
        info!(ticks = args.watch, "watching automatic ticks");
        watch_ticks(&mut session, args.watch)?;
    }

    print_status(&session);
    Ok(())
}
