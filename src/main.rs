use clap::Parser;
use stregsystem_pos::config::cli::{Command, LogFormat};
use stregsystem_pos::utils::error::ErrorSeverity;
use stregsystem_pos::utils::{logger, validation::Validate};
use stregsystem_pos::{
    AppConfig, Cart, CliConfig, ConfigProvider, Result, SaleSession, SessionState, StregError,
    StregsystemApi, StregsystemClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.validate().and_then(|_| cli.resolve()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(exit_code(&e));
        }
    };

    // 初始化日誌
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose, config.log_level.as_deref()),
        LogFormat::Json => logger::init_json_logger(cli.verbose, config.log_level.as_deref()),
    }

    tracing::info!("Starting stregsystem-pos");
    tracing::debug!("Resolved config: {:?}", config);

    if let Err(e) = run(&cli.command, &config).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(exit_code(&e));
    }

    Ok(())
}

fn exit_code(e: &StregError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 4,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

async fn run(command: &Command, config: &AppConfig) -> Result<()> {
    let client = StregsystemClient::from_config(config);

    match command {
        Command::Check => {
            if client.check_access().await {
                println!("✅ Stregsystem is reachable at {}", config.base_url());
                Ok(())
            } else {
                Err(StregError::Unavailable)
            }
        }
        Command::Profile { username } => {
            let profile = client.fetch_profile(username).await?;
            println!(
                "👤 {} ({}) id={} active={} balance={:.2}",
                profile.name, profile.username, profile.id, profile.active, profile.balance
            );
            Ok(())
        }
        Command::Balance { username } => {
            let member_id = client.resolve_member_id(username).await?;
            let balance = client.fetch_balance(member_id).await?;
            println!("💰 {}: {:.2}", username, balance);
            Ok(())
        }
        Command::Products => {
            let session = start_session(client, config).await?;
            let catalog = session.catalog().ok_or(StregError::NotReady {
                state: session.state(),
            })?;
            println!("📦 Room {}: {} products", config.default_room(), catalog.len());
            for (id, product) in catalog.iter() {
                println!("{:>6}  {:>8.2}  {}", id, product.price, product.name);
            }
            Ok(())
        }
        Command::Buy { username, items } => {
            let wanted = Cart::parse_buy_string(&items.join(" "))?;
            let mut session = start_session(client, config).await?;
            session.subscribe(|event| tracing::debug!("Session event: {:?}", event));

            for (product_id, quantity) in wanted.lines() {
                session.set_quantity(product_id, i64::from(quantity))?;
            }

            let member = session.select_member(username).await?;
            tracing::info!("Buying for {} (balance {:.2})", member.name, member.balance);
            println!(
                "🛒 {} → {:.2}",
                session.cart().buy_string(),
                session.cart_total()
            );

            let result = session.submit_sale().await?;
            println!("✅ Bought {} for {:.2}", result.order.items, result.cost);
            if result.is_ballmer_peaking {
                println!("🍺 Ballmer peak!");
            }

            match session.refresh_balance().await {
                Ok(balance) => println!("💰 New balance: {:.2}", balance),
                Err(e) => tracing::warn!("Could not refresh balance: {}", e),
            }
            Ok(())
        }
    }
}

async fn start_session(
    client: StregsystemClient,
    config: &AppConfig,
) -> Result<SaleSession<StregsystemClient>> {
    let mut session = SaleSession::new(client, config.default_room());
    if session.start().await? == SessionState::Unavailable {
        return Err(StregError::Unavailable);
    }
    Ok(session)
}
