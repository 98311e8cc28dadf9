//! Evidence aggregators (spec §4.7): clinical trials, patent landscape,
//! EXIM/supply signal, literature synthesis, and general web intelligence.
//! Every aggregator here routes through `cache::ContentAddressedCache` and
//! returns a structured empty/default result on collaborator failure rather
//! than propagating an error.

pub mod clinical_trials;
pub mod exim;
pub mod literature;
pub mod patents;
pub mod web_intel;
