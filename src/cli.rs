use agro_advisor_common::{Lang, RecordKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agro-advisor")]
#[command(about = "Leaf disease diagnosis and fertilizer advice from the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging (same as --log-level debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log filter, e.g. warn, info, agro_advisor=debug
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Display language for this run (en/bn)
    #[arg(long, global = true)]
    pub lang: Option<Lang>,
}

impl Cli {
    pub fn log_filter(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Create an account
    Register,

    /// Sign out and forget the session
    Logout,

    /// Show the signed-in user's profile
    Profile,

    /// Diagnose a leaf photo
    Leaf {
        /// Image file
        #[arg(short, long, conflicts_with_all = ["library", "camera"])]
        file: Option<PathBuf>,

        /// Choose from a photo folder
        #[arg(short, long, conflicts_with = "camera")]
        library: Option<PathBuf>,

        /// Take the newest photo from a capture folder
        #[arg(short, long)]
        camera: Option<PathBuf>,

        /// Continue with a soil test using this result
        #[arg(long)]
        with_soil: bool,
    },

    /// Fertilizer recommendation from soil readings
    Soil,

    /// List saved results
    Saved {
        /// Only one kind (image/soil/soil-image)
        #[arg(short, long)]
        kind: Option<RecordKind>,
    },

    /// Search saved results by disease, crop, fertilizer or treatment
    Search {
        /// Search text; empty lists everything
        #[arg(default_value = "")]
        query: String,
    },

    /// Show one saved result
    Details {
        /// Record ID
        #[arg(required = true)]
        id: String,

        /// Also ask for an explanation
        #[arg(short, long)]
        explain: bool,
    },

    /// Delete a saved result
    Delete {
        /// Record ID
        #[arg(required = true)]
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show or set the display language
    Language {
        /// en or bn; omitted shows the current one
        lang: Option<Lang>,
    },

    /// Show/edit settings
    Config {
        /// Show settings
        #[arg(long)]
        show: bool,

        /// Backend API base URL
        #[arg(long)]
        set_backend_url: Option<String>,

        /// Base URL for saved leaf images
        #[arg(long)]
        set_image_base_url: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        set_timeout: Option<u64>,
    },
}
