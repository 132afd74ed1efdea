use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use camp_client::card::UserCard;
use camp_client::signup::{Route, SignUpFlow, SignUpForm, redirect_for};
use camp_client::store::TOKEN_KEY;
use camp_client::{AppContext, ClientConfig, NotificationsScreen, ScreenState};

#[derive(Parser)]
#[command(name = "camp")]
#[command(about = "Camping companion client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a session token
    Login { token: String },
    /// Forget the saved session token
    Logout,
    /// Show notifications and follow live pushes until Ctrl-C
    Notifications,
    /// Show a user's card
    User { id: String },
    /// Create an account and verify its email
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camp=debug,camp_client=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let ctx = AppContext::new(&config);

    match cli.command {
        Commands::Login { token } => {
            ctx.store
                .set(TOKEN_KEY, &token)
                .context("Failed to save token")?;
            match ctx.sessions.decode(&token) {
                Ok(user_id) => println!("Logged in as user {user_id}"),
                Err(e) => warn!("Saved token does not decode: {}", e),
            }
        }
        Commands::Logout => {
            ctx.store
                .remove(TOKEN_KEY)
                .context("Failed to remove token")?;
            println!("Logged out");
        }
        Commands::Notifications => notifications(&ctx).await?,
        Commands::User { id } => {
            let user = ctx.api.fetch_user(&id).await?;
            println!("{}", UserCard::from(&user));
        }
        Commands::Signup {
            name,
            email,
            password,
            confirm_password,
        } => {
            let form = SignUpForm {
                name,
                email,
                password,
                confirm_password,
            };
            let mut flow = SignUpFlow::new(ctx.api.clone());
            match flow.submit(&form).await {
                Ok(Route::Interests { user_id }) => {
                    println!("Registration successful. Pick your interests (user {user_id}).");
                }
                Ok(Route::SignIn) => println!("Please sign in."),
                Err(e) => {
                    eprintln!("{e}");
                    if redirect_for(&e) == Some(Route::SignIn) {
                        println!("Please sign in.");
                    }
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

async fn notifications(ctx: &AppContext) -> Result<()> {
    let mut screen = NotificationsScreen::mount(ctx).await;

    match screen.state() {
        ScreenState::Error(message) => {
            eprintln!("{message}");
            std::process::exit(1);
        }
        ScreenState::Loading | ScreenState::Ready(_) => {}
    }

    if let Some(view) = screen.view() {
        print!("{view}");
    }

    if !screen.channel_joined().await {
        warn!("Realtime channel unavailable, showing stored notifications only");
        screen.unmount().await;
        return Ok(());
    }
    info!("Listening for notifications, Ctrl-C to quit");

    loop {
        tokio::select! {
            pushed = screen.next_push() => {
                if pushed.is_none() {
                    warn!("Realtime channel closed");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        if let Some(line) = screen.view().and_then(|v| v.live.last().cloned()) {
            let marker = if ctx.notifications.take() { "*" } else { " " };
            println!("{marker} {line}");
        }
    }

    screen.unmount().await;
    Ok(())
}
