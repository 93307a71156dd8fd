pub mod dependency;
pub mod driver;
pub mod maven2_resolver;
pub mod resolver;
