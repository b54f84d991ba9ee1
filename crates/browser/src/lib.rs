//! Browser driver - headless Chrome over the DevTools protocol
//!
//! Implements the `BrowserLauncher` / `BrowserSession` / `BrowserPage`
//! traits from `careerscan-common` with chromiumoxide.
//!
//! - one browser process per `launch`
//! - tabs opened on demand and closed explicitly
//! - optional blocking of images, stylesheets, fonts and media

pub mod chrome;

pub use chrome::{ChromeLauncher, ChromePage, ChromeSession};
