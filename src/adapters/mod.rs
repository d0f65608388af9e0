/// Adapters - concrete implementations of the port traits
///
/// These modules implement the port traits for specific services.
pub mod services;
