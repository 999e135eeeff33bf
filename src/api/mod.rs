pub mod extract;
pub mod results;

pub use extract::JsonBody;
pub use results::{advanced_results, populate_all, ListEnvelope, Populate, ResultEnvelope};
