use std::sync::Arc;

use sfmcp_agent::{AgentRuntime, OpenRouterClient};
use sfmcp_core::Dispatcher;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use crate::commands::{init_logging, load_config, open_org, CommandResult};

const GREETING: &str =
    "Salesforce assistant ready. Ask about your org or request a change; /exit or /quit ends the session.";
const PROMPT: &str = "> ";
const EXIT_COMMANDS: [&str; 2] = ["/exit", "/quit"];

pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };
    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    let result = runtime.block_on(async {
        let (org, connect_error) = open_org(&config).await;
        let mut stdout = tokio::io::stdout();
        if let Some(error) = connect_error {
            let notice = format!("Salesforce connection failed: {error}\n");
            stdout.write_all(notice.as_bytes()).await?;
        }

        let llm = Arc::new(OpenRouterClient::from_config(&config.llm));
        let agent = AgentRuntime::new(llm, Dispatcher::new(org))
            .with_temperature(config.llm.temperature);
        let stdin = BufReader::new(tokio::io::stdin());
        run_session(&agent, stdin, stdout).await
    });

    match result {
        Ok(turns) => CommandResult::success("chat", format!("session ended after {turns} turns")),
        Err(error) => {
            CommandResult::failure("chat", "io", format!("chat session aborted: {error}"), 1)
        }
    }
}

/// Reads requests line by line until EOF or an exit command. Each non-empty line is one
/// turn; failures are printed and the session keeps going. Returns the number of turns.
pub async fn run_session<R, W>(
    agent: &AgentRuntime,
    input: R,
    mut output: W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = agent.start_session();
    let mut lines = input.lines();
    let mut turns = 0;

    info!(
        event_name = "cli.chat.session_started",
        session_id = %session.id,
        "chat session started"
    );
    output.write_all(format!("{GREETING}\n").as_bytes()).await?;

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&request) {
            break;
        }

        let outcome = agent.handle_turn(&mut session, request).await;
        turns += 1;
        output.write_all(format!("{}\n", outcome.render()).as_bytes()).await?;
    }

    output.write_all(b"\n").await?;
    output.flush().await?;
    info!(
        event_name = "cli.chat.session_ended",
        session_id = %session.id,
        turns,
        exchanged_messages = session.transcript.conversation().len(),
        "chat session ended"
    );
    Ok(turns)
}
