pub mod company;
pub mod progress;
pub mod review;

pub use company::Company;
pub use progress::{Progress, ProgressSnapshot, ScrapePhase};
pub use review::Review;
