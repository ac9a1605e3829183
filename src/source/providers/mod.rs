pub mod page;
pub mod rss;
