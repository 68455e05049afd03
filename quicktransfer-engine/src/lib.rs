pub mod dispatcher;
pub mod logger;
pub mod monitor;
pub mod probe;
pub mod traits;
pub mod widget;

#[cfg(test)]
mod test_support;
