pub mod aggregate;
pub mod annotate;
pub mod candidates;
pub mod handlers;
pub mod offsets;
pub mod snowstorm;
pub mod stopwords;
pub mod text;

pub use aggregate::{Match, aggregate};
pub use annotate::{AnnotateRequest, Annotation, Annotator};
pub use candidates::{Candidate, CandidateGenerator, DEFAULT_MAX_CANDIDATES};
pub use handlers::{AppState, router};
pub use offsets::{Offset, find_offsets};
pub use snowstorm::{LookupError, LookupHit, SnowstormClient, Terminology};
pub use stopwords::Stopwords;
pub use text::{Token, normalize, tokenize};
