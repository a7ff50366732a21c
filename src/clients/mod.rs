pub mod discovery_client;
pub mod sales_client;

pub use discovery_client::DiscoveryClient;
pub use sales_client::SalesClient;
