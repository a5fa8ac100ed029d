pub mod competitors;
pub mod opportunities;

pub use competitors::analyze_competitors;
pub use opportunities::expand_opportunities;
