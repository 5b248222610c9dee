use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use api::{
    auth::{create_token, AuthenticationMiddleware},
    config::Config,
    routes,
    security::{configure_cors, RateLimiter},
    state::AppState,
};
use clap::{Parser, Subcommand};
use common::{
    db,
    service::CustomerService,
    store::{AnyStore, MemoryStore, PgStore},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tailor-api", about = "Customer records for a tailoring shop")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Keep records in memory instead of Postgres
        #[arg(long)]
        memory: bool,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Print a bearer token signed with JWT_SECRET
    Token {
        #[arg(long)]
        sub: String,
        #[arg(long)]
        email: Option<String>,
        /// Lifetime in seconds
        #[arg(long, default_value_t = 86400)]
        expires_in: u64,
    },
}

async fn connect(config: &Config) -> anyhow::Result<sqlx::PgPool> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set unless --memory is given")?;
    let pool = db::establish_connection(url, config.database_max_connections).await?;
    Ok(pool)
}

async fn serve(config: Config, memory: bool) -> anyhow::Result<()> {
    let store = if memory {
        warn!("Using the in-memory store, records are lost on restart");
        AnyStore::Memory(MemoryStore::new())
    } else {
        let pool = connect(&config).await?;
        db::run_migrations(&pool).await?;
        AnyStore::Postgres(PgStore::new(pool))
    };

    let app_state = web::Data::new(AppState {
        service: CustomerService::new(store),
        bill: config.bill.clone(),
        utc_offset: config.utc_offset,
        page_size: config.page_size,
    });
    let rate_limiter = RateLimiter::new(config.rate_limit);
    let address = config.server_address();

    info!("Starting server on {}", address);
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(AuthenticationMiddleware::new(config.jwt_secret.clone()))
            .wrap(rate_limiter.clone())
            .wrap(configure_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .configure(routes::configure)
    })
    .bind(&address)?
    .run()
    .await?;

    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve { memory } => serve(config, memory).await,
        Command::Migrate => {
            let pool = connect(&config).await?;
            db::run_migrations(&pool).await?;
            Ok(())
        }
        Command::Token {
            sub,
            email,
            expires_in,
        } => {
            let token = create_token(&sub, email.as_deref(), &config.jwt_secret, expires_in)
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            println!("{}", token);
            Ok(())
        }
    }
}
