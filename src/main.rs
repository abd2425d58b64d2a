use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use order_dispatch::client::OrderClient;
use order_dispatch::config::{PoolConfig, ServerConfig, DEFAULT_MAX_FRAME_LEN};
use order_dispatch::protocol::Response;
use order_dispatch::server::OrderServer;
use order_dispatch::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "order-dispatch")]
#[command(version)]
#[command(about = "A concurrent order-dispatch server with a bounded worker pool")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the order-dispatch server
    Server(ServerArgs),

    /// Show the dishes the server accepts
    Menu {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Order management commands
    Order {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: OrderCommands,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Address to bind (IPv4 or IPv6)
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value = "8888")]
    port: u16,

    /// Number of workers preparing orders in parallel
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Multiplier for simulated preparation times (0.1 = ten times faster, at most 1000)
    #[arg(long, default_value = "1.0")]
    time_scale: f64,

    /// Longest accepted request line, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_LEN)]
    max_frame_len: usize,
}

impl ServerArgs {
    fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Client Arguments (shared by menu and order commands)
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Server address
    #[arg(long, short = 'a', default_value = "127.0.0.1:8888")]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Order Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum OrderCommands {
    /// Submit a new order
    Submit {
        /// The dish to prepare (see `menu`)
        kind: String,

        /// How many to prepare
        #[arg(default_value = "1", allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Get status of a specific order
    Status {
        /// The order ID (e.g. P001)
        id: String,
    },
    /// List orders still being prepared
    Pending,
    /// Wait until every pending order is ready
    Await,
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig {
        listen_addr: args.listen_addr(),
        max_frame_len: args.max_frame_len,
        pool: PoolConfig::default()
            .with_workers(args.workers)
            .with_time_scale(args.time_scale),
    };

    tracing::info!(
        listen_addr = %config.listen_addr,
        workers = config.pool.workers,
        time_scale = config.pool.time_scale,
        "Starting order-dispatch server"
    );

    let server = OrderServer::bind(&config).await?;
    let signal = install_shutdown_handler();
    let drained = server.run_until(signal).await;

    tracing::info!(drained, "Server stopped");
    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_with_error(response: &Response) -> ! {
    if let Response::Error(body) = response {
        eprintln!("Error: {}", body.message.as_deref().unwrap_or(&body.error));
        if let Some(menu) = &body.menu {
            eprintln!("Available dishes: {}", menu.join(", "));
        }
    } else {
        eprintln!("Error: unexpected response {:?}", response);
    }
    std::process::exit(1);
}

async fn handle_menu(
    client: &mut OrderClient,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let menu = client.get_menu().await?;
    match output_format {
        OutputFormat::Json => print_json(&menu)?,
        OutputFormat::Table => {
            println!("Menu");
            println!("{}", "=".repeat(20));
            for (i, dish) in menu.iter().enumerate() {
                println!("{:>2}. {}", i + 1, dish);
            }
        }
    }
    Ok(())
}

async fn handle_order_submit(
    client: &mut OrderClient,
    kind: String,
    quantity: i64,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client.submit_order(&kind, quantity).await?;
    match (&response, output_format) {
        (Response::Submitted(_), OutputFormat::Json) => print_json(&response)?,
        (Response::Submitted(submitted), OutputFormat::Table) => {
            println!("Order submitted successfully!");
            println!("Order ID: {}", submitted.id);
        }
        _ => exit_with_error(&response),
    }
    Ok(())
}

async fn handle_order_status(
    client: &mut OrderClient,
    id: String,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client.query_order(&id).await?;
    if response.is_error() {
        exit_with_error(&response);
    }

    match output_format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => match &response {
            Response::Pending(pending) => {
                println!("Order ID:     {}", pending.id);
                println!("Status:       {}", pending.status.to_string().to_uppercase());
            }
            Response::Ready(ready) => {
                println!("Order ID:     {}", ready.id);
                println!("Status:       {}", ready.status.to_string().to_uppercase());
                println!("Dish:         {} x{}", ready.kind, ready.quantity);
                println!("Prepared By:  {}", ready.worker);
                println!("Duration:     {:.2}s", ready.duration);
                println!("Submitted At: {}", ready.submitted_at);
                println!("Completed At: {}", ready.completed_at);
            }
            other => exit_with_error(other),
        },
    }
    Ok(())
}

async fn handle_order_pending(
    client: &mut OrderClient,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let list = client.list_pending().await?;
    match output_format {
        OutputFormat::Json => print_json(&list)?,
        OutputFormat::Table => {
            if list.pending.is_empty() {
                println!("No pending orders.");
            } else {
                println!("{:<10} STATUS", "ORDER ID");
                println!("{}", "-".repeat(20));
                for id in &list.pending {
                    println!("{:<10} PENDING", id);
                }
                println!();
                println!("{} order(s) in progress", list.count);
            }
        }
    }
    Ok(())
}

async fn handle_order_await(
    client: &mut OrderClient,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    let drained = client.await_all().await?;
    match output_format {
        OutputFormat::Json => print_json(&drained)?,
        OutputFormat::Table => {
            println!("{}", drained.message);
            println!("Waited {:.1}s", started.elapsed().as_secs_f64());
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
        Commands::Menu { client } => {
            let mut order_client = OrderClient::connect(client.addr.as_str()).await?;
            handle_menu(&mut order_client, &client.output).await?;
        }
        Commands::Order { client, command } => {
            let mut order_client = OrderClient::connect(client.addr.as_str()).await?;

            match command {
                OrderCommands::Submit { kind, quantity } => {
                    handle_order_submit(&mut order_client, kind, quantity, &client.output).await?;
                }
                OrderCommands::Status { id } => {
                    handle_order_status(&mut order_client, id, &client.output).await?;
                }
                OrderCommands::Pending => {
                    handle_order_pending(&mut order_client, &client.output).await?;
                }
                OrderCommands::Await => {
                    handle_order_await(&mut order_client, &client.output).await?;
                }
            }
        }
    }

    Ok(())
}
