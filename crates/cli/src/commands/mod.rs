//! Subcommand implementations.

pub mod checkout;
pub mod remote_cart;

use std::path::{Path, PathBuf};

use bookcart_checkout::auth::{Navigator, Route};
use bookcart_checkout::cart::CartError;
use bookcart_checkout::remote::RemoteError;
use bookcart_checkout::CheckoutError;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// An input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An input file is not valid JSON for what it should hold.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// No API token is configured.
    #[error("Not signed in. Set BOOKCART_API_TOKEN to the token issued at login.")]
    NotSignedIn,

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("{0}")]
    Checkout(#[from] CheckoutError),

    #[error("Shop API error: {0}")]
    Remote(#[from] RemoteError),

    /// The deferred navigation task did not finish.
    #[error("Navigation task failed: {0}")]
    Navigation(#[from] tokio::task::JoinError),
}

/// Navigator for a terminal: there is nowhere to go, so it logs the route.
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(route = route.path(), "Navigate");
    }
}

/// Read and parse a JSON file.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CommandError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CommandError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CommandError::Json {
        path: path.to_path_buf(),
        source,
    })
}
