pub mod connectors;
pub mod deployer;
pub mod generator;
pub mod normalizer;
pub mod notify;
pub mod orchestrator;
pub mod runner;
pub mod scrape;
pub mod sources;
pub mod store;
pub mod traits;

pub use deployer::Deployer;
pub use generator::SiteGenerator;
pub use normalizer::Normalizer;
pub use notify::UpdateHub;
pub use orchestrator::{Orchestrator, PipelineOutput};
pub use runner::JobRunner;
pub use scrape::ScrapeStage;
pub use sources::Source;
pub use store::JobStore;
pub use traits::{Connector, Inference, ProgressSink};
