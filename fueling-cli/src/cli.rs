use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Track aircraft fueling requests")]
pub struct Cli {
    /// Data directory holding the request store (must exist)
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Which side to act as: client (requester) or company (operator)
    #[clap(long, global = true)]
    pub view: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List requests (own requests for client, all for company)
    List {
        /// Filter by status (pending, confirmed, completed, cancelled)
        #[clap(long)]
        status: Option<String>,
    },

    /// Show details for a specific request
    Show {
        /// Request ID (UUID or unique prefix)
        id: String,
    },

    /// Submit a new fueling request (client view)
    Submit {
        /// Stand number
        #[clap(long)]
        stand: Option<String>,

        /// Airline
        #[clap(long)]
        airline: Option<String>,

        /// Flight number
        #[clap(long)]
        flight: Option<String>,

        /// Name of the representative on site
        #[clap(long)]
        representative: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// Open the chat of a request and print its messages
    Chat {
        /// Request ID (UUID or unique prefix)
        id: String,
    },

    /// Send a chat message on a request
    Say {
        /// Request ID (UUID or unique prefix)
        id: String,

        /// Message text
        text: String,
    },

    /// Confirm a pending request (company view)
    Confirm {
        /// Request ID (UUID or unique prefix)
        id: String,
    },

    /// Mark a request as completed (company view)
    Complete {
        /// Request ID (UUID or unique prefix)
        id: String,
    },

    /// Cancel a request (company view)
    Cancel {
        /// Request ID (UUID or unique prefix)
        id: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Remove all completed requests (company view)
    ClearCompleted {
        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Export all requests (company view)
    Export {
        /// Output format (json, markdown)
        #[clap(long, short = 'f', default_value = "json")]
        format: String,

        /// Output file path; prints to stdout when omitted
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print this device's requester id and the data directory
    Whoami,
}
