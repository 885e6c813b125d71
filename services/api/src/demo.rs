use crate::infra::{build_marketplace, load_store, Marketplace};
use chrono::{DateTime, Utc};
use clap::Args;
use expalink::config::AppConfig;
use expalink::error::AppError;
use expalink::marketplace::{
    CreditPack, Professional, ProfessionalId, SearchQuery, Session, UnlockOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_SEED_CSV: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../crates/expalink/fixtures/professionals_madrid.csv"
);

/// Puerta del Sol, the demo searcher's location.
const MADRID_CENTRE: (f64, f64) = (40.4168, -3.7038);

#[derive(Args, Debug)]
pub(crate) struct SearchArgs {
    /// Profession tag to search for (e.g. Plumber)
    #[arg(long)]
    pub(crate) profession: String,
    /// Only professionals speaking this language
    #[arg(long)]
    pub(crate) language: Option<String>,
    /// City to match when no coordinates are supplied
    #[arg(long)]
    pub(crate) city: Option<String>,
    /// Searcher latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true, requires = "lng")]
    pub(crate) lat: Option<f64>,
    /// Searcher longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub(crate) lng: Option<f64>,
    /// Directory CSV export to search (defaults to the bundled Madrid fixture)
    #[arg(long)]
    pub(crate) seed_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Directory CSV export to seed (defaults to the bundled Madrid fixture)
    #[arg(long)]
    pub(crate) seed_csv: Option<PathBuf>,
    /// Profession searched for in the demo
    #[arg(long, default_value = "Plumber")]
    pub(crate) profession: String,
}

struct SeededMarketplace {
    service: Arc<Marketplace>,
    path: PathBuf,
    count: usize,
}

fn seeded_marketplace(
    seed_csv: Option<PathBuf>,
    now: DateTime<Utc>,
) -> Result<SeededMarketplace, AppError> {
    let config = AppConfig::load()?;
    let path = seed_csv.unwrap_or_else(|| PathBuf::from(DEFAULT_SEED_CSV));
    let store = load_store(Some(path.as_path()), now)?;
    let count = store.professional_count();
    Ok(SeededMarketplace {
        service: build_marketplace(&config, store),
        path,
        count,
    })
}

pub(crate) fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let SearchArgs {
        profession,
        language,
        city,
        lat,
        lng,
        seed_csv,
    } = args;

    let now = Utc::now();
    let SeededMarketplace {
        service,
        path,
        count,
    } = seeded_marketplace(seed_csv, now)?;

    let mut query = SearchQuery::for_profession(profession);
    if let Some(language) = language {
        query = query.speaking(language);
    }
    if let Some(city) = city {
        query = query.in_city(city);
    }
    if let (Some(lat), Some(lng)) = (lat, lng) {
        query = query.near(lat, lng);
    }

    println!(
        "Loaded {} professionals from {}",
        count,
        path.display()
    );
    let results = service.search(&query)?;
    render_shortlist(&query, &results);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        seed_csv,
        profession,
    } = args;

    let now = Utc::now();
    let SeededMarketplace {
        service,
        path,
        count,
    } = seeded_marketplace(seed_csv, now)?;

    println!("ExpaLink marketplace demo");
    println!("- Seeded {} professionals from {}", count, path.display());

    let query = SearchQuery::for_profession(profession).near(MADRID_CENTRE.0, MADRID_CENTRE.1);
    let results = service.search(&query)?;
    render_shortlist(&query, &results);

    let Some(top) = results.first() else {
        println!("\nNo professional to unlock, demo ends here");
        return Ok(());
    };

    let consumer = Session::consumer("demo-consumer", "newcomer@expats.example");
    println!("\nCredits");
    match service.purchase(&consumer, CreditPack::Single) {
        Ok(checkout) => println!("- Checkout for a single credit: {}", checkout.url),
        Err(err) => {
            println!("  Checkout unavailable: {}", err);
            return Ok(());
        }
    }
    let balance = service.fulfil_purchase(&consumer.consumer_id, CreditPack::Single, now)?;
    println!("- Payment confirmed, balance is now {} credit(s)", balance);

    println!("\nUnlocking {} ({})", top.name, top.id.0);
    for attempt in 1..=2 {
        match service.unlock(&consumer, &top.id, now) {
            Ok(outcome) => println!("- Attempt {}: {}", attempt, describe_unlock(&outcome)),
            Err(err) => println!("- Attempt {}: refused ({})", attempt, err),
        }
    }

    if let Some(second) = results.get(1) {
        match service.unlock(&consumer, &second.id, now) {
            Ok(outcome) => println!("- {}: {}", second.name, describe_unlock(&outcome)),
            Err(err) => println!("- {}: refused ({})", second.name, err),
        }
    }

    render_contact(&service, &consumer, &top.id, now);

    match service.can_review(&consumer, &top.id, now) {
        Ok(eligibility) if eligibility.eligible => println!("- Review: open now"),
        Ok(eligibility) => println!(
            "- Review: opens in {} day(s), once the job has had time to happen",
            eligibility.remaining_days
        ),
        Err(err) => println!("- Review: unavailable ({})", err),
    }

    Ok(())
}

fn render_shortlist(query: &SearchQuery, results: &[Professional]) {
    let origin = match query.origin {
        Some(point) => format!("near {:.4}, {:.4}", point.latitude, point.longitude),
        None => match &query.city {
            Some(city) => format!("in {}", city),
            None => "anywhere".to_string(),
        },
    };
    println!("\nShortlist for '{}' {}", query.profession, origin);
    if results.is_empty() {
        println!("  No professionals matched");
        return;
    }
    for (rank, pro) in results.iter().enumerate() {
        let distance = pro
            .distance_km
            .map(|km| format!("{:.1} km", km))
            .unwrap_or_else(|| "distance unknown".to_string());
        let featured = if pro.is_featured { " | featured" } else { "" };
        println!(
            "  {}. {} | {} | {:.1} stars ({} reviews) | {}{}",
            rank + 1,
            pro.name,
            pro.cities.join(", "),
            pro.rating,
            pro.review_count,
            distance,
            featured
        );
    }
}

fn describe_unlock(outcome: &UnlockOutcome) -> String {
    match outcome {
        UnlockOutcome::Unlocked {
            remaining_credits: Some(remaining),
            ..
        } => format!("unlocked, {} credit(s) left", remaining),
        UnlockOutcome::Unlocked {
            remaining_credits: None,
            ..
        } => "unlocked with premium access".to_string(),
        UnlockOutcome::AlreadyUnlocked { .. } => "already unlocked, nothing charged".to_string(),
        UnlockOutcome::OwnProfile => "own profile".to_string(),
    }
}

fn render_contact(
    service: &Marketplace,
    consumer: &Session,
    id: &ProfessionalId,
    now: DateTime<Utc>,
) {
    match service.view_professional(Some(consumer), id, now) {
        Ok(view) => match view.contact {
            Some(contact) => println!(
                "- Contact revealed: phone {} | email {}",
                contact.phone.as_deref().unwrap_or("-"),
                contact.email.as_deref().unwrap_or("-")
            ),
            None => println!("- Contact still locked"),
        },
        Err(err) => println!("- Profile unavailable: {}", err),
    }
}
