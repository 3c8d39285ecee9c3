//! StealthFlow CLI
//!
//! Command-line interface for StealthFlow stealth payments on Starknet.

mod config;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stealthflow_core::traits::AnnouncementWriter;
use stealthflow_core::types::{AnnouncementRecord, DiscoveredFund, MetaAddress, Point, U256};
use stealthflow_core::encode_announce_calldata;
use stealthflow_crypto::view_tag::ViewTagStats;
use stealthflow_crypto::{compute_view_tag, point_mul};
use stealthflow_registry::FileRegistry;
use stealthflow_scanner::{ProgressCallback, Scanner};
use stealthflow_stealth::{DiscoveryContext, KeyFile, StealthPaymentBuilder, StealthWallet};

use crate::config::CliConfig;

/// StealthFlow - Private payments with secp256k1 stealth addresses
#[derive(Parser)]
#[command(name = "stealthflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Registry file (overrides STEALTHFLOW_REGISTRY)
    #[arg(short, long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate new recipient keys
    Keygen {
        /// Output file for keys (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or validate a meta-address
    Meta {
        /// Path to keys file
        #[arg(short, long, conflicts_with = "parse")]
        keys: Option<PathBuf>,
        /// Meta-address string to validate
        #[arg(long)]
        parse: Option<String>,
    },

    /// Create a stealth payment and publish its announcement
    Send {
        /// Recipient's meta-address
        recipient: String,
        /// Amount in tokens (e.g. 1.5); omitted amounts are not announced
        #[arg(short, long)]
        amount: Option<String>,
        /// Print the payment without writing to the registry
        #[arg(long)]
        dry_run: bool,
    },

    /// Scan the registry once for payments
    Scan {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// First block to scan
        #[arg(long, default_value = "0")]
        from_block: u64,
        /// Stop after the first batch with a payment
        #[arg(long)]
        first: bool,
    },

    /// Poll the registry for new payments until Ctrl-C
    Watch {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// First block to scan
        #[arg(long, default_value = "0")]
        from_block: u64,
    },

    /// Reconstruct stealth key material from announcement fields
    Derive {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// Ephemeral public key as `x,y`
        #[arg(short, long)]
        ephemeral: String,
        /// Announced view tag (computed when omitted)
        #[arg(long)]
        view_tag: Option<u8>,
        /// Ciphertext words, comma separated
        #[arg(long)]
        ciphertext: Option<String>,
    },

    /// Convert between token amounts and base units
    Units {
        #[command(subcommand)]
        action: UnitsAction,
    },

    /// Benchmark view tag filtering
    Bench {
        /// Number of announcements to generate
        #[arg(short = 'n', long, default_value = "10000")]
        count: usize,
    },
}

#[derive(Subcommand)]
enum UnitsAction {
    /// Base units to a display amount
    Format {
        /// Amount in base units
        wei: String,
        /// Print full precision
        #[arg(long)]
        exact: bool,
    },
    /// Display amount to base units
    Parse {
        /// Decimal amount
        amount: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "stealthflow=debug,info"
    } else {
        "stealthflow=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = CliConfig::from_env()?;
    if let Some(path) = cli.registry {
        config.registry = path;
    }

    match cli.command {
        Commands::Keygen { output } => cmd_keygen(output.as_deref()),
        Commands::Meta { keys, parse } => cmd_meta(keys.as_deref(), parse.as_deref()),
        Commands::Send {
            recipient,
            amount,
            dry_run,
        } => cmd_send(&config, &recipient, amount.as_deref(), dry_run).await,
        Commands::Scan { keys, from_block, first } => cmd_scan(&config, &keys, from_block, first).await,
        Commands::Watch { keys, from_block } => cmd_watch(&config, &keys, from_block).await,
        Commands::Derive {
            keys,
            ephemeral,
            view_tag,
            ciphertext,
        } => cmd_derive(&config, &keys, &ephemeral, view_tag, ciphertext.as_deref()),
        Commands::Units { action } => cmd_units(&config, action),
        Commands::Bench { count } => cmd_bench(&config, count),
    }
}

fn load_wallet(path: &Path) -> Result<StealthWallet> {
    let file = KeyFile::load(path).with_context(|| format!("Failed to read keys file {}", path.display()))?;
    StealthWallet::from_key_file(&file).context("Invalid keys file")
}

fn parse_words(text: &str) -> Result<Vec<U256>> {
    text.split(',')
        .filter(|w| !w.trim().is_empty())
        .map(|w| w.parse::<U256>().with_context(|| format!("Invalid word {:?}", w)))
        .collect()
}

fn print_fund(config: &CliConfig, fund: &DiscoveredFund) {
    let amount = match fund.claimable_amount() {
        Some(amount) => config.units.format(&amount),
        None => "unknown".dimmed().to_string(),
    };
    println!("   {} {}", "Account:".green(), fund.stealth_address);
    println!("      {} {}", "Amount:".dimmed(), amount);
    println!("      {} {}", "Tx:".dimmed(), fund.record_id);
}

/// Generate new recipient keys
fn cmd_keygen(output: Option<&Path>) -> Result<()> {
    println!("{}", "🔑 Generating StealthFlow keys...".cyan().bold());

    let wallet = StealthWallet::generate()?;
    let file = wallet.to_key_file();

    if let Some(path) = output {
        file.save(path).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} {}", "✅ Keys saved to:".green(), path.display());
    } else {
        println!("\n{}", "Keys (JSON):".yellow().bold());
        println!("{}", serde_json::to_string_pretty(&file)?);
    }

    println!("\n{}", "Meta-address:".yellow().bold());
    println!("{}", wallet.meta_address());

    println!("\n{}", "⚠️  IMPORTANT: Keep your private keys safe!".red().bold());
    println!("   view_private_key reveals your payments, spend_private_key controls them.");

    Ok(())
}

/// Show or validate a meta-address
fn cmd_meta(keys: Option<&Path>, parse: Option<&str>) -> Result<()> {
    let meta = match (keys, parse) {
        (Some(path), _) => *load_wallet(path)?.meta_address(),
        (None, Some(text)) => text.parse::<MetaAddress>().context("Invalid meta-address")?,
        (None, None) => bail!("pass --keys or --parse"),
    };

    println!("{}", "✅ Meta-address:".green().bold());
    println!("   {}", meta);
    println!("   {} {:#x}, {:#x}", "View key:".dimmed(), meta.view_pub.x(), meta.view_pub.y());
    println!("   {} {:#x}, {:#x}", "Spend key:".dimmed(), meta.spend_pub.x(), meta.spend_pub.y());

    Ok(())
}

/// Create a stealth payment
async fn cmd_send(config: &CliConfig, recipient: &str, amount: Option<&str>, dry_run: bool) -> Result<()> {
    println!("{} {}", "💸 Creating stealth payment to:".cyan().bold(), recipient);

    let meta: MetaAddress = recipient.parse().context("Invalid meta-address")?;

    let mut builder = StealthPaymentBuilder::new()
        .recipient(meta)
        .token(config.token)
        .deployment(config.deployment);
    if let Some(text) = amount {
        builder = builder.amount(config.units.parse(text).context("Invalid amount")?);
    }
    let payment = builder.build().context("Failed to create stealth payment")?;

    println!("\n{}", "✅ Stealth payment created:".green().bold());
    println!("   {} {}", "Account:".yellow(), payment.stealth_address);
    println!("   {} {}", "View tag:".dimmed(), payment.announcement.view_tag);
    if let Some(amount) = payment.amount {
        println!("   {} {}", "Amount:".dimmed(), config.units.format(&amount));
    }

    println!("\n{}", "📋 Announce calldata:".yellow().bold());
    let calldata: Vec<String> = encode_announce_calldata(&payment.announcement)
        .iter()
        .map(U256::to_hex)
        .collect();
    println!("{}", serde_json::to_string_pretty(&calldata)?);

    if dry_run {
        println!("\n{}", "ℹ️  Dry run: announcement not published.".cyan());
        return Ok(());
    }

    let registry = FileRegistry::new(&config.registry)
        .await
        .context("Failed to open registry file")?;
    let id = registry.announce(payment.announcement, U256::ZERO).await?;
    println!("\n{} {}", "📣 Announced at".green(), id);

    println!("\n{}", "ℹ️  Next step:".cyan());
    println!("   Transfer the funds to the account above");

    Ok(())
}

/// Scan for payments
async fn cmd_scan(config: &CliConfig, keys: &Path, from_block: u64, first: bool) -> Result<()> {
    println!("{}", "🔎 Scanning for payments...".cyan().bold());

    let wallet = load_wallet(keys)?;
    let registry = FileRegistry::new(&config.registry)
        .await
        .context("Failed to load registry file")?;
    println!("   Loaded {} announcements from {}", registry.len(), config.registry.display());

    if registry.is_empty() {
        println!("\n{}", "⚠️  Registry is empty. No announcements to scan.".yellow());
        return Ok(());
    }

    let mut scanner_config = config.scanner_config().start_block(from_block);
    if first {
        scanner_config = scanner_config.stop_on_first();
    }
    let scanner = Scanner::from_wallet(&wallet, scanner_config)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} blocks ({eta})")?
            .progress_chars("#>-"),
    );
    let bar = pb.clone();
    let callback: ProgressCallback = Box::new(move |progress| {
        bar.set_length(progress.total);
        bar.set_position(progress.scanned);
    });

    let funds = scanner
        .catch_up_with_progress(&registry, None, Some(&callback))
        .await
        .context("Scan failed")?;
    pb.finish_and_clear();

    let summary = scanner.summary();
    println!(
        "   Scanned {} announcements, {:.2}% filtered by view tag",
        summary.total_scanned, summary.filter_efficiency
    );
    if summary.errors > 0 {
        println!(
            "   {}",
            format!("⚠️  {} matching announcement(s) could not be processed", summary.errors).yellow()
        );
    }

    if funds.is_empty() {
        println!("\n{}", "No payments found.".yellow());
    } else {
        println!("\n{} {} payment(s) found:", "✅".green(), funds.len());
        for fund in &funds {
            print_fund(config, fund);
        }
    }

    Ok(())
}

/// Watch for new payments
async fn cmd_watch(config: &CliConfig, keys: &Path, from_block: u64) -> Result<()> {
    let wallet = load_wallet(keys)?;
    let registry = FileRegistry::follow(&config.registry)
        .await
        .context("Failed to open registry file")?;
    let scanner = Scanner::from_wallet(&wallet, config.scanner_config().start_block(from_block))?;

    println!("{} {}", "👀 Watching".cyan().bold(), config.registry.display());
    println!("   Polling every {:?}. Press Ctrl+C to stop.\n", config.poll_interval);

    let (stop_tx, stop_rx) = watch::channel(false);
    let (fund_tx, mut fund_rx) = mpsc::channel(64);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(true);
        }
    });

    let printer = async {
        while let Some(fund) = fund_rx.recv().await {
            println!(
                "{} {}",
                chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
                "💰 Payment received".green().bold()
            );
            print_fund(config, &fund);
        }
    };

    let (summary, _) = tokio::join!(scanner.run(&registry, None, stop_rx, fund_tx), printer);

    println!(
        "\n{} {} payment(s), {} announcements scanned",
        "Stopped.".cyan(),
        summary.discoveries,
        summary.total_scanned
    );
    Ok(())
}

/// Reconstruct stealth keys for one announcement
fn cmd_derive(
    config: &CliConfig,
    keys: &Path,
    ephemeral: &str,
    view_tag: Option<u8>,
    ciphertext: Option<&str>,
) -> Result<()> {
    let wallet = load_wallet(keys)?;

    let coords = parse_words(ephemeral)?;
    let [x, y] = coords.as_slice() else {
        bail!("ephemeral key must be `x,y`");
    };
    let ephemeral = Point::from_coordinates(*x, *y).context("Ephemeral key is not on the curve")?;
    let ciphertext = ciphertext.map(parse_words).transpose()?.unwrap_or_default();

    let view_tag = match view_tag {
        Some(tag) => tag,
        None => compute_view_tag(point_mul(wallet.keys().view_private(), &ephemeral)?.x()),
    };

    let Some(found) = wallet.try_discover(&ephemeral, view_tag, &ciphertext)? else {
        println!("{}", "View tag does not match: not a payment to these keys.".yellow());
        return Ok(());
    };

    let account = config.deployment.derive_address(&found.stealth_pub)?;

    println!("{}", "✅ Stealth key material:".green().bold());
    println!("   {} {}", "Account:".yellow(), account);
    println!("   {} {:#x}, {:#x}", "Public key:".dimmed(), found.stealth_pub.x(), found.stealth_pub.y());
    match found.amount.known() {
        Some(amount) => println!("   {} {}", "Amount:".dimmed(), config.units.format(&amount)),
        None => println!("   {} {}", "Amount:".dimmed(), "not announced".dimmed()),
    }
    println!("   {} {}", "Private key:".red(), found.stealth_priv.to_hex());

    println!("\n{}", "⚠️  The private key controls the account. Do not share it.".red().bold());

    Ok(())
}

/// Convert token amounts
fn cmd_units(config: &CliConfig, action: UnitsAction) -> Result<()> {
    match action {
        UnitsAction::Format { wei, exact } => {
            let wei: U256 = wei.parse().context("Invalid base unit amount")?;
            if exact {
                println!("{}", config.units.format_exact(&wei));
            } else {
                println!("{}", config.units.format(&wei));
            }
        }
        UnitsAction::Parse { amount } => {
            println!("{}", config.units.parse(&amount).context("Invalid amount")?);
        }
    }
    Ok(())
}

/// Run benchmarks
fn cmd_bench(config: &CliConfig, count: usize) -> Result<()> {
    println!("{} {} announcements", "📊 Benchmarking with".cyan().bold(), count);

    // Generate keys
    println!("\n{}", "1. Generating keys...".dimmed());
    let start = Instant::now();
    let wallet = StealthWallet::generate()?;
    let other = StealthWallet::generate()?;
    println!("   ✓ Key generation: {:?}", start.elapsed());

    // Create announcements
    println!("\n{}", "2. Creating announcements...".dimmed());
    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut records = Vec::with_capacity(count);
    let mut expected = 0;
    for i in 0..count {
        // One in a hundred is ours
        let recipient = if i % 100 == 0 {
            expected += 1;
            wallet.meta_address()
        } else {
            other.meta_address()
        };
        let payment = StealthPaymentBuilder::new()
            .recipient(*recipient)
            .amount(U256::from_u64(i as u64 + 1))
            .build()?;
        records.push(AnnouncementRecord::from_payload(
            payment.announcement,
            U256::ZERO,
            i as u64,
            format!("{:#x}", i),
        ));
        pb.inc(1);
    }
    pb.finish();
    println!("   ✓ Created {} announcements: {:?}", count, start.elapsed());

    // Scan
    println!("\n{}", "3. Scanning...".dimmed());
    let ctx = DiscoveryContext {
        deployment: config.deployment,
        token: config.token,
    };
    let start = Instant::now();
    let (funds, stats) = wallet.scan(&records, &ctx);
    let scan_time = start.elapsed();

    let mut tags = ViewTagStats::new();
    for record in &records {
        tags.add(record.view_tag);
    }

    // View tag collisions on other payments also surface as funds
    let ours = funds.iter().filter(|f| f.block_number() % 100 == 0).count();

    println!("   ✓ Scanned {} announcements: {:?}", count, scan_time);
    println!("   ✓ {} view tag matches, {} payments", stats.matches, ours);
    println!("\n{}", "📈 Results:".green().bold());
    println!("   Scan rate: {:.0} announcements/sec", count as f64 / scan_time.as_secs_f64());
    println!("   Time per announcement: {:.2}µs", scan_time.as_micros() as f64 / count.max(1) as f64);
    println!("   Filter efficiency: {:.2}%", stats.filter_efficiency());
    println!("   View tag χ²: {:.1} (uniform ≈ 255)", tags.chi_squared());
    if let Some((tag, hits)) = tags.most_common() {
        println!("   Most common tag: {:#04x} ({} hits, expected {:.1})", tag, hits, tags.expected_uniform_count());
    }

    if ours == expected {
        println!("   {} All expected payments found!", "✅".green());
    } else {
        println!("   {} Expected {}, found {}", "❌".red(), expected, ours);
    }

    Ok(())
}
