//! Command-line interface for the Tawseel delivery client.
//!
//! Provides subcommands for working against the delivery API:
//! - `login` / `logout` / `whoami` - Session management
//! - `dashboard` - Role-aware overview with counts and recent orders
//! - `orders preparing|sent|to-receive|mine|board` - The order boards
//! - `orders create <type>` - Order intake, one subcommand per service type
//! - `orders assign|receive|deliver|device-received|set-status` - Lifecycle moves
//! - `orders pay|sign|photo|download-image` - Delivery records
//! - `users list|create|update|delete` - Account administration

mod auth;
mod dashboard;
mod orders;
mod output;
mod users;

use crate::api::{ApiClient, ApiError};
use crate::config::Settings;
use crate::models::{OrderSource, OrderStatus, Role, ServiceType, User};
use crate::session::{Session, SessionStore};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "tawseel")]
#[command(author, version, about = "Terminal client for the Tawseel delivery service", long_about = None)]
pub struct Cli {
    /// API URL to connect to (overrides the config file)
    #[arg(long, env = "TAWSEEL_API_URL")]
    pub api_url: Option<String>,

    /// Path to configuration file (default: ~/.tawseel/config.toml)
    #[arg(short, long, env = "TAWSEEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session token
    Login(LoginArgs),

    /// Forget the stored session
    Logout,

    /// Show who is signed in and which server is configured
    Whoami,

    /// Role-aware overview: order counts and recent orders
    Dashboard {
        /// Refresh the view on an interval until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Order management commands
    #[command(subcommand)]
    Orders(OrdersCommands),

    /// User administration commands (admin only)
    #[command(subcommand)]
    Users(UsersCommands),
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Username to sign in with
    pub username: String,

    /// Password (prompted for when not given)
    #[arg(long, env = "TAWSEEL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Order subcommands
#[derive(Subcommand, Debug)]
pub enum OrdersCommands {
    /// Create a new order
    #[command(subcommand)]
    Create(CreateCommands),

    /// Orders still being prepared, waiting for a courier
    Preparing {
        /// Refresh the view on an interval until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Orders that left preparation, with optional filters
    Sent {
        /// Match against customer name, phone or address
        #[arg(short, long)]
        search: Option<String>,

        /// Only this service type
        #[arg(long)]
        service_type: Option<ServiceType>,

        /// Only this status
        #[arg(long)]
        status: Option<OrderStatus>,

        /// Only orders assigned to this courier (user ID)
        #[arg(long)]
        courier: Option<i64>,

        /// Refresh the view on an interval until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Repair pickups currently out with couriers
    ToReceive {
        /// Refresh the view on an interval until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Your own deliveries: new assignments and runs underway (courier)
    Mine {
        /// Refresh the view on an interval until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Full order board with totals and filters (admin only)
    Board {
        /// Match against customer name, phone or address
        #[arg(short, long)]
        search: Option<String>,

        /// Only this service type
        #[arg(long)]
        service_type: Option<ServiceType>,

        /// Only this status
        #[arg(long)]
        status: Option<OrderStatus>,

        /// Only orders assigned to this courier (user ID)
        #[arg(long)]
        courier: Option<i64>,

        /// Refresh the view on an interval until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Show one order in full
    Show {
        /// Order ID
        id: i64,
    },

    /// List courier accounts and their IDs
    Couriers,

    /// Assign a courier to a preparing order
    Assign {
        /// Order ID
        id: i64,

        /// Courier user ID (see `orders couriers`)
        courier_id: i64,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Accept an assigned order and start the delivery (courier)
    Receive {
        /// Order ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Mark a delivery handed over to the customer (courier)
    Deliver {
        /// Order ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Mark a repair pickup collected from the customer (courier)
    DeviceReceived {
        /// Order ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Set an order to any status directly (staff override)
    SetStatus {
        /// Order ID
        id: i64,

        /// One of: preparing, assigned, in_delivery, delivered, device_received, cancelled
        status: OrderStatus,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Record an amount collected from the customer (courier)
    Pay {
        /// Order ID
        id: i64,

        /// Amount in IQD
        #[arg(value_parser = parse_amount)]
        amount: f64,
    },

    /// Attach the customer's signature from an image file (courier)
    Sign {
        /// Order ID
        id: i64,

        /// Path to the signature image
        file: PathBuf,
    },

    /// Attach a photo of the goods or device (courier)
    Photo {
        /// Order ID
        id: i64,

        /// Path to the image file
        file: PathBuf,

        /// Category stored with the image
        #[arg(long, default_value = "device_condition")]
        image_type: String,
    },

    /// Download an uploaded image to a local file
    DownloadImage {
        /// Order ID
        id: i64,

        /// Image ID as listed by `orders show`
        image_id: i64,

        /// Output path (default: order-<id>-image-<image-id>.<ext>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Order creation subcommands, one per service type
#[derive(Subcommand, Debug)]
pub enum CreateCommands {
    /// Deliver a sold product to the customer
    Sale {
        #[command(flatten)]
        common: CreateCommonArgs,

        /// Product name
        #[arg(long)]
        product: String,

        /// Price in IQD
        #[arg(long, value_parser = parse_amount)]
        price: f64,

        /// Product barcode
        #[arg(long)]
        barcode: Option<String>,

        /// How the order came in: phone, whatsapp or social_media
        #[arg(long)]
        source: Option<OrderSource>,

        /// Agreed delivery time, e.g. 2026-03-01T14:30
        #[arg(long, value_parser = parse_delivery_time)]
        delivery_time: Option<String>,
    },

    /// Return a repaired device to the customer
    SendAfterRepair {
        #[command(flatten)]
        common: CreateCommonArgs,

        /// Device name
        #[arg(long)]
        device: String,

        /// Summary of the repair that was done
        #[arg(long)]
        repair_report: String,

        /// Repair cost in IQD
        #[arg(long, value_parser = parse_amount)]
        repair_cost: f64,

        /// Workshop order number
        #[arg(long)]
        repair_order_number: Option<String>,

        /// Accessories going back with the device
        #[arg(long)]
        accessories: Option<String>,

        /// Agreed delivery time, e.g. 2026-03-01T14:30
        #[arg(long, value_parser = parse_delivery_time)]
        delivery_time: Option<String>,
    },

    /// Pick up a broken device from the customer
    ReceiveForRepair {
        #[command(flatten)]
        common: CreateCommonArgs,

        /// Device name
        #[arg(long)]
        device: String,

        /// Condition as reported by the customer
        #[arg(long)]
        condition: String,

        /// Initial fault report
        #[arg(long)]
        initial_report: String,

        /// Workshop order number
        #[arg(long)]
        repair_order_number: Option<String>,
    },
}

/// Fields shared by every order type
#[derive(Args, Debug)]
pub struct CreateCommonArgs {
    /// Customer name
    #[arg(long)]
    pub customer: String,

    /// Customer phone number
    #[arg(long)]
    pub phone: String,

    /// Delivery or pickup address
    #[arg(long)]
    pub address: String,

    /// Assign this courier (user ID) right away
    #[arg(long)]
    pub assign: Option<i64>,
}

/// User administration subcommands
#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// List all accounts
    List,

    /// Create an account
    Create {
        /// Username for sign-in
        username: String,

        /// Initial password
        #[arg(long)]
        password: String,

        /// Display name
        #[arg(long)]
        full_name: String,

        /// Account role: admin, employee or courier
        #[arg(long)]
        role: Role,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,
    },

    /// Update an account; omitted fields keep their current values
    Update {
        /// User ID
        id: i64,

        /// New username
        #[arg(long)]
        username: Option<String>,

        /// New password (omit to keep the current one)
        #[arg(long)]
        password: Option<String>,

        /// New display name
        #[arg(long)]
        full_name: Option<String>,

        /// New role: admin, employee or courier
        #[arg(long)]
        role: Option<Role>,

        /// New phone number
        #[arg(long)]
        phone: Option<String>,
    },

    /// Deactivate an account; its history stays on past orders
    Delete {
        /// User ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

// ============================================================================
// Command Dispatch
// ============================================================================

/// Everything a signed-in command needs: the resolved settings, the stored
/// session and a client that sends its token.
pub(crate) struct Ctx {
    pub settings: Settings,
    pub session: Session,
    pub client: ApiClient,
}

impl Ctx {
    pub fn user(&self) -> &User {
        &self.session.user
    }

    pub fn role(&self) -> Role {
        self.session.user.role
    }
}

/// Run a CLI command
pub async fn run_command(cli: Cli, settings: Settings) -> Result<()> {
    let store = SessionStore::new(settings.session_file.clone());

    match cli.command {
        Commands::Login(args) => auth::cmd_login(&settings, &store, &args).await,
        Commands::Logout => auth::cmd_logout(&store),
        Commands::Whoami => auth::cmd_whoami(&settings, &store),
        command => {
            let session = store.require()?;
            let client = ApiClient::new(&settings.api_url, Some(&session.token), settings.timeout)?;
            let ctx = Ctx {
                settings,
                session,
                client,
            };

            let result = match &command {
                Commands::Dashboard { watch } => dashboard::cmd_dashboard(&ctx, *watch).await,
                Commands::Orders(orders_command) => orders::run(&ctx, orders_command).await,
                Commands::Users(users_command) => users::run(&ctx, users_command).await,
                _ => unreachable!("session commands return above"),
            };

            // A dead token only produces 401s; drop it so the next run says
            // to sign in instead of failing the same way again.
            if let Err(err) = &result {
                if session_expired(err) {
                    let _ = store.clear();
                }
            }
            result
        }
    }
}

/// Whether `err` is the API rejecting our stored token.
fn session_expired(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)))
}

/// Clear the screen and redraw via `render` on a fixed interval until
/// Ctrl-C. Render errors are printed and the loop keeps going, except an
/// expired session, which ends the watch.
async fn watch_loop<F, Fut>(every: Duration, render: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                print!("\x1b[2J\x1b[1;1H");
                let _ = std::io::stdout().flush();
                if let Err(err) = render().await {
                    if session_expired(&err) {
                        return Err(err);
                    }
                    eprintln!("refresh failed: {:#}", err);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        }
    }
}

/// Accept delivery times in the `YYYY-MM-DDTHH:MM` form the API stores.
fn parse_delivery_time(raw: &str) -> Result<String, String> {
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .map(|_| raw.to_string())
        .map_err(|_| format!("invalid delivery time '{raw}' (expected e.g. 2026-03-01T14:30)"))
}

fn parse_amount(raw: &str) -> Result<f64, String> {
    let amount: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if amount > 0.0 && amount.is_finite() {
        Ok(amount)
    } else {
        Err("amount must be greater than zero".to_string())
    }
}
