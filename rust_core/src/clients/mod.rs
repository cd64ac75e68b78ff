pub mod api_football;
pub mod gemini;
pub mod sheets;
pub mod sofascore;
pub mod tavily;

// Re-export commonly used types
pub use api_football::{ApiFootballClient, FixtureProvider};
pub use gemini::{CompletionClient, GeminiClient, PromptPart};
pub use sheets::GoogleSheetsStore;
pub use sofascore::{SofascoreClient, TeamContextLookup};
pub use tavily::{TavilyClient, WebSearch};
