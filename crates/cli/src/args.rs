//! Command-line surface for `harbor`.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "harbor", version, about = "Offline-caching proxy", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which rule, strategy and namespace a URL routes to
    Route {
        url: String,
        #[arg(long, default_value = "GET")]
        method: String,
    },
    /// Fetch a URL through the cache and write the body to stdout
    Fetch {
        url: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// Request header as `name: value`; repeatable
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
    },
    /// Pre-cache static and external assets into the current namespaces
    Install,
    /// Install, then delete every namespace that is not current
    Activate,
    /// List namespaces with entry counts
    Namespaces,
    /// Delete a namespace and its entries
    Delete { namespace: String },
}

/// Split a `name: value` header argument.
pub fn parse_header(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
