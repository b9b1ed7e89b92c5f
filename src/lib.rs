pub mod adapters;
pub mod app;
pub mod domain;

#[cfg(test)]
pub mod test_support;
