use std::io::{self, Write};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::Level;
use twin_agent::{AgentFactory, TurnOrchestrator};
use twin_core::config::{AppConfig, LoadOptions};

use crate::commands::CommandResult;

pub fn run(message: &str) -> CommandResult {
    if message.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_input", "message must not be empty", 1);
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let agent = match AgentFactory::new(&config).build() {
        Ok(agent) => agent,
        Err(error) => {
            return CommandResult::failure("ask", "agent_bootstrap", error.to_string(), 4);
        }
    };
    let orchestrator = TurnOrchestrator::new(Arc::new(agent));

    let responses = match orchestrator.run_turn(message, &[]) {
        Ok(responses) => responses,
        Err(error) => return CommandResult::failure("ask", "invalid_input", error.to_string(), 1),
    };

    let answer = runtime.block_on(stream_answer(responses, &mut io::stdout()));
    CommandResult::success("ask", answer)
}

/// Writes only the newly added suffix of each accumulated response.
pub async fn stream_answer<S, W>(responses: S, sink: &mut W) -> String
where
    S: Stream<Item = String>,
    W: Write,
{
    futures::pin_mut!(responses);
    let mut answer = String::new();

    while let Some(response) = responses.next().await {
        let delta = response.strip_prefix(answer.as_str()).unwrap_or(response.as_str());
        let _ = sink.write_all(delta.as_bytes());
        let _ = sink.flush();
        answer = response;
    }
    let _ = sink.write_all(b"\n");

    answer
}

fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::stream_answer;

    #[tokio::test]
    async fn only_new_suffixes_are_written() {
        let responses = stream::iter(vec![
            "I".to_string(),
            "I build".to_string(),
            "I build compilers.".to_string(),
        ]);
        let mut sink = Vec::new();

        let answer = stream_answer(responses, &mut sink).await;

        assert_eq!(answer, "I build compilers.");
        assert_eq!(String::from_utf8(sink).expect("utf8"), "I build compilers.\n");
    }
}
