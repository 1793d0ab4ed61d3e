pub mod app;
pub mod cache;
pub mod config;
pub mod exception;
pub mod logger;
pub mod param;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod server;
pub mod session;
pub mod templates;

pub use app::App;
pub use cache::{CacheKeyMode, ResponseCache};
pub use config::Config;
pub use exception::Exception;
pub use param::HttpRequestMethod;
pub use registry::{Endpoint, EndpointRegistry, Router};
pub use request::RequestLine;
pub use resolver::ResponseSource;
pub use server::{Server, StopHandle};
pub use session::{Session, SessionConfig, SessionOutcome, Transport};
