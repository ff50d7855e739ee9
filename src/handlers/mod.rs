pub mod docs;
pub mod history;
pub mod middleware;
pub mod news;
pub mod stocks;
