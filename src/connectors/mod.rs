//! Vendor connectors.

pub mod bing_ads;
pub mod google_ads;
