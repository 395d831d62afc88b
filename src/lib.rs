//! tooltrace: a traced function-calling loop over hosted chat-completion APIs.
//!
//! A [`DispatchLoop`](dispatch::DispatchLoop) sends a conversation and the
//! declarations of a [`ToolRegistry`](tools::ToolRegistry) to a
//! [`ChatCompletionsClient`](provider::ChatCompletionsClient), runs the tools
//! the model asks for, and repeats until the model answers. A
//! [`Tracer`](telemetry::Tracer) records spans around every remote call and
//! tool invocation.
//!
//! # Quick Start
//!
//! ```no_run
//! use tooltrace::prelude::*;
//! use tooltrace::tools::builtin::weather_registry;
//!
//! # async fn example() -> tooltrace::error::Result<()> {
//! let config = TooltraceConfig::load(None)?;
//! let tracer = Tracer::builder()
//!     .with_simple_exporter(ConsoleSpanExporter::stdout())
//!     .build();
//! let client = InstrumentedClient::new(
//!     AzureInferenceClient::from_credentials(&config.credentials()?),
//!     tracer.clone(),
//! );
//!
//! let outcome = DispatchLoop::new(client, weather_registry(), tracer.clone())
//!     .run_prompt("You are a helpful assistant.", "What is the weather in Seattle?")
//!     .await?;
//! println!("{}", outcome.text);
//! tracer.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod telemetry;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
