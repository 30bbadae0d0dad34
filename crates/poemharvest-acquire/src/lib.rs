pub mod harvest;
pub mod normalize;
pub mod output;
pub mod wiki;

pub use harvest::{harvest, HarvestStats, PageError};
pub use wiki::{PageHandle, PageSource, WikiClient, WikiError};
