use clap::{Parser, Subcommand};

/// webhook-relay — multi-tenant signed webhook ingress and retrying delivery.
#[derive(Parser)]
#[command(name = "webhook-relay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the ingress server and delivery worker (default if no subcommand given)
    Serve {
        /// Port to bind (defaults to the PORT env var, else 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run pending database migrations and exit
    Migrate,

    /// Ensure the configured blob bucket is reachable, then exit
    BootstrapBucket,

    /// Create a tenant, issue an API key, and upsert a target — for local
    /// development
    Seed {
        #[arg(long, default_value = "dev-tenant")]
        name: String,
        #[arg(long)]
        target_url: String,
        #[arg(long)]
        signing_secret: Option<String>,
    },
}
