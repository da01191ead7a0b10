pub mod http;
pub mod in_memory;
pub mod security_properties;
pub mod tls;
