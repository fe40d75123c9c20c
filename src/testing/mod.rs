//! Integration tests exercising the proxy, data nodes and client together
//! over real TCP connections.

mod e2e_tests;
mod utils;
