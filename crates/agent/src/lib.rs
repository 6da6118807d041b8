//! The chat pipeline: the heart of Parley.
//!
//! Every user message goes through the same steps:
//!
//! 1. **Filter** low-information input before it costs anything
//! 2. **Enrich** follow-ups with the previous turn's domain keywords
//! 3. **Classify** the question as app, technical, or persona
//! 4. **Retrieve** documents, stories, diagrams, and recent history concurrently
//! 5. **Compose** the prompt behind the mode's assistant profile
//! 6. **Generate** and record the turn
//!
//! A context source that fails is logged and left out; only session store
//! failures abort a turn.

pub mod enrichment;
pub mod gibberish;
pub mod image;
pub mod keywords;
pub mod mode;
pub mod pipeline;
pub mod profile;
pub mod prompt;
pub mod retrieval;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use enrichment::{EnrichedQuery, enrich};
pub use gibberish::{GibberishFilter, Lexicon, NoiseKind, WordListLexicon};
pub use image::{ImageCatalog, ImageEntry, ImageReranker, ImageSearchResult, KeywordMemory};
pub use keywords::{KeywordMatches, KeywordSet, extract_keywords};
pub use mode::{Mode, ModeClassifier};
pub use pipeline::{ChatPipeline, TurnOutcome, TurnStatus};
pub use profile::{profile_for, render_profile, with_profile};
pub use prompt::compose;
pub use retrieval::{ContextBundle, ContextRetriever, RetrievalRequest};
