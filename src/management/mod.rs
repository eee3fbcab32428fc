mod auth;
mod collector;
mod credentials;
mod history;
pub mod stats;

pub use auth::Authenticator;
pub use auth::Browser;
pub use auth::CredentialProvider;
pub use auth::SystemBrowser;
pub use collector::HistoryCollector;
pub use collector::PollOutcome;
pub use credentials::CredentialStore;
pub use history::HISTORY_COLUMNS;
pub use history::HistoryStore;
pub use history::ObservationSink;
