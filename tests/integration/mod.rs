//! Integration test modules

mod config_loading;
mod pipeline;
mod provider_gateway;
mod provider_http;
mod test_utils;
