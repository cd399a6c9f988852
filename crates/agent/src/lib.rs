//! Agent runtime: turns natural-language requests into operation calls.
//!
//! A turn runs one constrained loop:
//! 1. the model sees the transcript, opened by the operation catalog (`prompt`)
//! 2. its reply is either plain text or a `run:`/`args:` directive (`directive`)
//! 3. the argument block is repaired and parsed strictly (`sanitize`)
//! 4. the dispatcher runs the operation and the model summarizes the raw output
//!
//! The model never executes anything itself; it only names an operation from the
//! catalog and supplies arguments.

pub mod directive;
pub mod llm;
pub mod prompt;
pub mod runtime;
pub mod sanitize;
pub mod session;

pub use directive::{parse_reply, DirectiveError, InvocationDirective, Reply};
pub use llm::{ChatMessage, ChatRequest, LlmClient, LlmError, OpenRouterClient, Role};
pub use runtime::{AgentRuntime, TurnError, TurnOutcome};
pub use sanitize::{parse_arguments, sanitize, ArgumentError};
pub use session::{Session, Transcript};
