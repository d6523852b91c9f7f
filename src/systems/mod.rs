mod bees;
mod bookkeeping;
mod flora;
mod weather;

pub use bees::BeeSystem;
pub use bookkeeping::BookkeepingSystem;
pub use flora::FloraSystem;
pub use weather::WeatherSystem;
