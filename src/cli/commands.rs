//! Subcommand handlers.

use tracing::{info, warn};

use super::{ChatArgs, Cli, Commands, GlobalArgs, WeatherArgs, DEFAULT_SYSTEM_PROMPT};
use crate::config::{InferenceCredentials, TooltraceConfig};
use crate::dispatch::{DispatchLoop, DispatchPolicy};
use crate::error::Result;
use crate::provider::{
    AzureInferenceClient, ChatCompletionsClient, CompletionRequest, InstrumentedClient,
};
use crate::telemetry::{AzureMonitorExporter, BatchConfig, ConsoleSpanExporter, Tracer};
use crate::tools::builtin::weather_registry;
use crate::types::{Conversation, GenerationSettings};

const ROLE_NAME: &str = "tooltrace";

/// Resolve configuration, build the tracer and run the chosen subcommand.
///
/// Credentials are checked before any span or request is created. The tracer
/// is shut down (flushing pending spans) whether or not the command fails.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = TooltraceConfig::load(cli.global.config.as_deref())?;
    if cli.global.record_content {
        config.record_content = Some(true);
    }
    let credentials = config.credentials()?;

    let remote = matches!(cli.command, Commands::Weather(_));
    let tracer = build_tracer(&config, &cli.global, remote);

    let result = match cli.command {
        Commands::Chat(args) => chat(args, &credentials, &tracer).await,
        Commands::Weather(args) => weather(args, &config, &credentials, &tracer).await,
    };

    tracer.shutdown().await;
    result
}

/// Console exporter always; Azure Monitor too when `remote` and a
/// connection string is configured.
pub fn build_tracer(config: &TooltraceConfig, global: &GlobalArgs, remote: bool) -> Tracer {
    let mut builder = Tracer::builder()
        .with_name(ROLE_NAME)
        .with_record_content(config.record_content())
        .with_simple_exporter(ConsoleSpanExporter::stdout());

    if let Some(connection_string) = config.connection_string().filter(|_| remote) {
        match AzureMonitorExporter::from_connection_string(connection_string, ROLE_NAME) {
            Ok(exporter) => {
                info!(endpoint = %exporter.track_url(), "exporting spans to Azure Monitor");
                builder = builder.with_batch_exporter(exporter, BatchConfig::default());
            }
            Err(e) => warn!(error = %e, "ignoring invalid telemetry connection string"),
        }
    }

    let tracer = builder.build();
    if global.no_trace {
        tracer.uninstrument();
    }
    tracer
}

fn client(credentials: &InferenceCredentials, tracer: &Tracer) -> InstrumentedClient<AzureInferenceClient> {
    InstrumentedClient::new(AzureInferenceClient::from_credentials(credentials), tracer.clone())
}

async fn chat(args: ChatArgs, credentials: &InferenceCredentials, tracer: &Tracer) -> Result<()> {
    let client = client(credentials, tracer);
    let request = CompletionRequest {
        messages: Conversation::with_prompt(args.system, args.prompt).into_messages(),
        tools: Vec::new(),
        settings: GenerationSettings {
            model: credentials.model.clone(),
            max_tokens: Some(args.max_tokens),
            ..Default::default()
        },
    };

    let result = tracer
        .in_span_result("get_chat_response", |span| async move {
            let model = request
                .settings
                .model
                .as_deref()
                .or_else(|| client.default_model())
                .unwrap_or("default");
            span.set_attribute("model", model);
            client.complete(&request).await
        })
        .await?;

    println!("{}", result.text());
    Ok(())
}

async fn weather(
    args: WeatherArgs,
    config: &TooltraceConfig,
    credentials: &InferenceCredentials,
    tracer: &Tracer,
) -> Result<()> {
    let mut policy = DispatchPolicy::from_config(config);
    if let Some(max_rounds) = args.max_rounds {
        policy.max_rounds = max_rounds;
    }

    let dispatch = DispatchLoop::new(client(credentials, tracer), weather_registry(), tracer.clone())
        .with_policy(policy);
    let outcome = dispatch.run_prompt(DEFAULT_SYSTEM_PROMPT, args.prompt).await?;

    for invocation in &outcome.invocations {
        println!(
            "Calling function `{}` with arguments {}",
            invocation.tool_name, invocation.arguments
        );
        println!("Function response = {}", invocation.content);
    }
    if !outcome.is_complete() {
        warn!(rounds = outcome.rounds, "stopped at the round limit before a final answer");
    }
    println!("Model response = {}", outcome.text);
    Ok(())
}
