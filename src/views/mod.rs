pub mod dashboard;
pub mod detail;
pub mod filter;
pub mod listing;

pub use dashboard::DashboardView;
pub use detail::DetailView;
pub use filter::CatalogFilter;
pub use listing::ListingView;
