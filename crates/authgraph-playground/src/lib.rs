pub mod backend;
pub mod coverage;
pub mod development;
pub mod error;
pub mod requests;
pub mod scenario;
pub mod tuple;

pub use backend::{BackendError, PlaygroundBackend};
pub use coverage::{CoverageReport, EntityCoverage, scenario_coverage};
pub use development::{Development, GraphResult};
pub use error::PlaygroundError;
pub use scenario::{Assertion, Scenario, ScenarioError};
pub use tuple::{ObjectRef, RelationshipTuple, SubjectRef, TupleParseError};
