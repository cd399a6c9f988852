//! Salesforce backend for the operation dispatcher: OAuth session handling, REST and
//! Tooling API calls, and one handler per catalog route.

mod args;
pub mod handlers;
pub mod metadata;
pub mod org;
pub mod session;

pub use org::{Api, SalesforceOrg};
pub use session::{ConnectError, OrgSession};
