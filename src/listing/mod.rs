pub mod pager;
pub mod query;

pub use pager::{ListingPager, PageLoad};
pub use query::{fetch_page, items, pages, CategoryFilter, ContentPage, ContentQuery};
