pub mod locations;
pub mod scrape;
