use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use donorhub::models::{
    donor_display_name, personnel_display_name, Distribution, Donation, Donor, GiftType,
    MonthlyStat, Payment, Personnel, Schedule, SummaryStats,
};
use donorhub::{
    reports, stats, BackendKind, Collection, Config, DemoBackend, FormSession, HttpBackend,
    RemoteStore, Section, SubmitError,
};

#[derive(Parser)]
#[command(name = "donorhub", about = "Terminal dashboard for the DonorHub REST backend")]
struct Cli {
    /// Use the built-in sample data instead of the network.
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one dashboard section.
    Show {
        /// dashboard, donors, donations, personnel, schedules, payments,
        /// gifts, reports or analytics.
        section: Section,
        /// Keep re-rendering on the configured refresh interval.
        #[arg(long)]
        watch: bool,
    },
    /// Print the headline totals.
    Summary,
    /// Export a collection as CSV.
    Export {
        /// donations or donors.
        what: String,
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<std::path::PathBuf>,
    },
    /// Record a new donation.
    AddDonation {
        #[arg(long)]
        donor_id: i64,
        #[arg(long)]
        amount: String,
        /// YYYY-MM-DD.
        #[arg(long)]
        date: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "donorhub=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if cli.demo {
        std::env::set_var("DONORHUB_DEMO_MODE", "true");
    }
    let config = Config::from_env().context("loading configuration")?;

    let backend = if config.demo_mode {
        tracing::info!("demo mode: serving fixed sample data, no network calls");
        BackendKind::Demo(DemoBackend::new())
    } else {
        BackendKind::Http(HttpBackend::new(&config).context("building HTTP backend")?)
    };
    let store = RemoteStore::new(backend, &config);

    match cli.command {
        Command::Show { section, watch } => show(&store, &config, section, watch).await?,
        Command::Summary => summary(&store).await?,
        Command::Export { what, out } => export(&store, &what, out).await?,
        Command::AddDonation {
            donor_id,
            amount,
            date,
            category,
            source,
        } => add_donation(&store, donor_id, &amount, &date, &category, source.as_deref()).await?,
    }

    Ok(())
}

async fn show(
    store: &RemoteStore<BackendKind>,
    config: &Config,
    section: Section,
    watch: bool,
) -> anyhow::Result<()> {
    render(store, section).await?;

    if !watch {
        return Ok(());
    }
    if config.auto_refresh_secs == 0 {
        anyhow::bail!("--watch needs DONORHUB_REFRESH_SECS > 0");
    }

    let mut tick =
        tokio::time::interval(std::time::Duration::from_secs(config.auto_refresh_secs));
    tick.tick().await; // first interval tick fires immediately
    loop {
        tokio::select! {
            _ = tick.tick() => {
                // A partial refresh still updated the healthy collections.
                if let Err(e) = store.refresh_cached().await {
                    tracing::warn!("refresh incomplete: {}", e);
                    eprintln!("refresh incomplete: {} (stale data shown where needed)", e);
                }
                render(store, section).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("signal received, leaving watch mode");
                return Ok(());
            }
        }
    }
}

async fn render(store: &RemoteStore<BackendKind>, section: Section) -> anyhow::Result<()> {
    // Warm everything the section needs before rendering. One collection
    // failing must not take the whole view down.
    for collection in section.collections() {
        if let Err(e) = store.load(*collection).await {
            eprintln!("could not load {}: {}; showing what is cached", collection, e);
        }
    }

    match section {
        Section::Dashboard => render_dashboard(store)?,
        Section::Donors => render_donors(store).await?,
        Section::Donations => render_donations(store).await?,
        Section::Personnel => render_personnel(store).await?,
        Section::Schedules => render_schedules(store).await?,
        Section::Payments => render_payments(store).await?,
        Section::Gifts => render_gifts(store).await?,
        Section::Reports => render_reports(store).await?,
        Section::Analytics => render_analytics(store).await?,
    }
    Ok(())
}

async fn summary(store: &RemoteStore<BackendKind>) -> anyhow::Result<()> {
    let donors: Vec<Donor> = store.load_all().await?;
    let donations: Vec<Donation> = store.load_all().await?;
    let personnel: Vec<Personnel> = store.load_all().await?;
    let s = stats::summarize(&donors, &donations, &personnel);
    println!("Donors:       {}", s.donor_count);
    println!("Donations:    {}", s.donation_count);
    println!("Total raised: {}", currency(s.total_amount));
    println!(
        "Team:         {} staff, {} volunteers",
        s.employee_count, s.volunteer_count
    );
    Ok(())
}

fn render_dashboard(store: &RemoteStore<BackendKind>) -> anyhow::Result<()> {
    println!("== Dashboard Overview ==");

    match store
        .get_cached_all::<SummaryStats>()
        .and_then(|v| v.into_iter().next())
    {
        Some(s) => println!(
            "Donors {}  |  Donations {}  |  Raised {}  |  Team {} staff / {} volunteers",
            s.total_donors,
            s.total_donations,
            currency(s.total_amount),
            s.total_employees,
            s.total_volunteers
        ),
        None => println!("(summary unavailable)"),
    }

    let monthly = store.get_cached_all::<MonthlyStat>().unwrap_or_default();
    if !monthly.is_empty() {
        println!("\nRevenue trend:");
        let max = monthly
            .iter()
            .map(|m| m.total_amount)
            .max()
            .unwrap_or_default();
        for m in &monthly {
            let percent = stats::bar_height_percent(m.total_amount, max);
            let bar = "#".repeat((percent / 2.5).round() as usize);
            println!(
                "  {}  {:<40}  {} ({} gifts)",
                m.month,
                bar,
                currency(m.total_amount),
                m.donation_count
            );
        }
    }

    let donations = store.get_cached_all::<Donation>().unwrap_or_default();
    if !donations.is_empty() {
        println!("\nBy category:");
        for slice in stats::by_category(&donations) {
            println!("  {:<20} {}", slice.name, currency(slice.amount));
        }
    }
    Ok(())
}

async fn render_donors(store: &RemoteStore<BackendKind>) -> anyhow::Result<()> {
    let donors: Vec<Donor> = store.load_all().await?;
    println!("== Donors ({}) ==", donors.len());
    for d in &donors {
        println!(
            "  #{:<4} {:<28} {:<14} {:<10} {}",
            d.id,
            d.display_name(),
            d.demographic_segment.as_deref().unwrap_or("-"),
            d.level().as_str(),
            d.total_donations
                .map(currency)
                .unwrap_or_else(|| "-".into()),
        );
    }
    Ok(())
}

async fn render_donations(store: &RemoteStore<BackendKind>) -> anyhow::Result<()> {
    let donations: Vec<Donation> = store.load_all().await?;
    let donors: Vec<Donor> = store.load_all().await?;
    println!("== Donations ({}) ==", donations.len());
    for d in stats::recent_donations(&donations, 50) {
        println!(
            "  #{:<4} {:<28} {:>12}  {}  {}",
            d.id,
            donor_display_name(&donors, d.donor_id),
            d.amount.map(currency).unwrap_or_else(|| "-".into()),
            d.date
                .map(|day| day.to_string())
                .unwrap_or_else(|| "-".into()),
            d.category.as_deref().unwrap_or("Other"),
        );
    }
    Ok(())
}

async fn render_personnel(store: &RemoteStore<BackendKind>) -> anyhow::Result<()> {
    let personnel: Vec<Personnel> = store.load_all().await?;
    println!("== Team ({}) ==", personnel.len());
    for p in &personnel {
        let kind = match (p.is_employee, p.is_volunteer) {
            (true, true) => "staff+volunteer",
            (true, false) => "staff",
            (false, true) => "volunteer",
            (false, false) => "-",
        };
        println!(
            "  #{:<4} {:<24} {:<20} {:<16} {}",
            p.id,
            p.display_name(),
            p.role.as_deref().unwrap_or("-"),
            kind,
            p.access_level.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn render_schedules(store: &RemoteStore<BackendKind>) -> anyhow::Result<()> {
    let schedules: Vec<Schedule> = store.load_all().await?;
    let personnel: Vec<Personnel> = store.load_all().await?;
    println!("== Schedules ({}) ==", schedules.len());
    for s in &schedules {
        println!(
            "  {}  {:<24} {}-{}  {:<10} {}",
            s.date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            personnel_display_name(&personnel, s.personnel_id),
            s.start_time.as_deref().unwrap_or("?"),
            s.end_time.as_deref().unwrap_or("?"),
            s.schedule_type.as_deref().unwrap_or("-"),
            s.availability_status.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn render_payments(store: &RemoteStore<BackendKind>) -> anyhow::Result<()> {
    let payments: Vec<Payment> = store.load_all().await?;
    let personnel: Vec<Personnel> = store.load_all().await?;
    println!("== Payments ({}) ==", payments.len());
    for p in &payments {
        println!(
            "  {}  {:<24} {:>10}  {:<10} {}",
            p.date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            personnel_display_name(&personnel, p.personnel_id),
            p.amount.map(currency).unwrap_or_else(|| "-".into()),
            p.payment_type.as_deref().unwrap_or("-"),
            if p.is_employee_pay { "payroll" } else { "" },
        );
    }
    Ok(())
}

async fn render_gifts(store: &RemoteStore<BackendKind>) -> anyhow::Result<()> {
    let gift_types: Vec<GiftType> = store.load_all().await?;
    let distributions: Vec<Distribution> = store.load_all().await?;
    println!("== Gift Types ({}) ==", gift_types.len());
    for g in &gift_types {
        println!(
            "  #{:<4} {:<24} {:<14} {}",
            g.id,
            g.name.as_deref().unwrap_or("-"),
            g.category.as_deref().unwrap_or("-"),
            g.value.map(currency).unwrap_or_else(|| "-".into()),
        );
    }
    println!("== Distributions ({}) ==", distributions.len());
    for d in &distributions {
        let gift = d
            .gift_type_id
            .and_then(|id| gift_types.iter().find(|g| g.id == id))
            .and_then(|g| g.name.clone())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {}  {:<24} x{:<5} {}",
            d.date
                .map(|day| day.to_string())
                .unwrap_or_else(|| "-".into()),
            gift,
            d.quantity.unwrap_or(0),
            if d.is_free { "free" } else { "charged" },
        );
    }
    Ok(())
}

async fn render_reports(store: &RemoteStore<BackendKind>) -> anyhow::Result<()> {
    let donations: Vec<Donation> = store.load_all().await?;
    let donors: Vec<Donor> = store.load_all().await?;
    println!("== Reports & Insights ==");
    println!("Years with data: {:?}", reports::available_years(&donations));
    println!(
        "Average donation: {}",
        currency(stats::average_donation(&donations))
    );

    println!("\nTop donors:");
    for d in stats::top_n(&donors, 5, |d| d.total_donations.unwrap_or_default()) {
        println!(
            "  {:<28} {}",
            d.display_name(),
            d.total_donations
                .map(currency)
                .unwrap_or_else(|| "-".into())
        );
    }

    let growth = stats::monthly_growth(&stats::monthly_series(&donations));
    if !growth.is_empty() {
        println!("\nMonth-over-month growth:");
        for (month, percent) in growth {
            println!("  {}  {:+.1}%", month, percent);
        }
    }
    Ok(())
}

async fn render_analytics(store: &RemoteStore<BackendKind>) -> anyhow::Result<()> {
    let donors: Vec<Donor> = store.load_all().await?;
    let donations: Vec<Donation> = store.load_all().await?;
    println!("== Analytics ==");

    println!("Donor segments:");
    for (segment, count) in stats::donor_type_distribution(&donors) {
        println!("  {:<16} {}", segment, count);
    }

    let slices = stats::by_category(&donations);
    let max = slices.first().map(|s| s.amount).unwrap_or_default();
    println!("\nCategory share:");
    for slice in &slices {
        let percent = stats::bar_height_percent(slice.amount, max);
        let bar = "#".repeat((percent / 2.5).round() as usize);
        println!(
            "  {:<20} {:<40} {}",
            slice.name,
            bar,
            currency(slice.amount)
        );
    }
    Ok(())
}

async fn export(
    store: &RemoteStore<BackendKind>,
    what: &str,
    out: Option<std::path::PathBuf>,
) -> anyhow::Result<()> {
    let csv = match what {
        "donations" => {
            let donations: Vec<Donation> = store.load_all().await?;
            let donors: Vec<Donor> = store.load_all().await?;
            reports::donations_csv(&donations, &donors)
        }
        "donors" => {
            let donors: Vec<Donor> = store.load_all().await?;
            reports::donors_csv(&donors)
        }
        other => anyhow::bail!("cannot export '{}': expected donations or donors", other),
    };

    match out {
        Some(path) => {
            std::fs::write(&path, &csv).with_context(|| format!("writing {}", path.display()))?;
            println!("wrote {} bytes to {}", csv.len(), path.display());
        }
        None => print!("{}", csv),
    }
    Ok(())
}

async fn add_donation(
    store: &RemoteStore<BackendKind>,
    donor_id: i64,
    amount: &str,
    date: &str,
    category: &str,
    source: Option<&str>,
) -> anyhow::Result<()> {
    let mut form = FormSession::create(Collection::Donations);
    form.set("donor_id", donor_id.to_string());
    form.set("amount", amount);
    form.set("donation_date", date);
    form.set("category", category);
    if let Some(source) = source {
        form.set("source", source);
    }

    match form.submit(store).await {
        Ok(created) => {
            println!("created donation: {}", created);
            let donations: Vec<Donation> = store.load_all().await?;
            println!("{} donations on record", donations.len());
            Ok(())
        }
        Err(SubmitError::Validation(errors)) => {
            for (field, err) in errors {
                eprintln!("  {}: {}", field, err);
            }
            anyhow::bail!("donation not saved: invalid input")
        }
        Err(SubmitError::Remote(err)) => anyhow::bail!("donation not saved: {}", err),
        Err(SubmitError::ReadOnly) => unreachable!("create sessions are writable"),
    }
}

fn currency(amount: Decimal) -> String {
    let negative = amount < Decimal::ZERO;
    let rounded = amount.round_dp(2).abs();
    let text = format!("{:.2}", rounded);
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(currency(Decimal::from(0)), "$0.00");
        assert_eq!(currency(Decimal::from(1234)), "$1,234.00");
        assert_eq!(currency(Decimal::new(123456789, 2)), "$1,234,567.89");
        assert_eq!(currency(Decimal::from(-5000)), "-$5,000.00");
    }
}
