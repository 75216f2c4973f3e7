// src/linkedin/mod.rs
pub mod decision_makers;
pub mod filter;
pub mod geo;
pub mod job_search;
pub mod recency;
pub mod types;

pub use decision_makers::{
    DecisionMakerRecord, DecisionMakerRequest, DecisionMakerSearchClient, RequestStatus,
};
pub use filter::{filter_by_recency, filter_records, Admission, LocationPolicy, LocationRule};
pub use geo::{GeoTable, Region};
pub use job_search::JobSearchClient;
pub use recency::{parse_recency, RecencyParser};
pub use types::{
    DatePosted, JobRecord, ParseReport, SearchCriteria, SearchOutcome, SearchStatus, SortOrder,
};
