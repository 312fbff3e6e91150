use desk_server::{Config, EngineState, init_logger_with_file, print_banner};
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, working directory, logging)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    std::fs::create_dir_all(config.log_dir())?;
    init_logger_with_file(
        std::env::var("LOG_LEVEL").ok().as_deref(),
        None,
        Some(&config.log_dir()),
    );

    print_banner();
    tracing::info!(
        environment = %config.environment,
        work_dir = %config.work_dir,
        "Desk server starting..."
    );

    // 2. Initialize the engine
    let state = EngineState::initialize(&config)?;
    tracing::info!(
        epoch = %state.manager.epoch(),
        sequence = state.manager.get_current_sequence()?,
        active_stays = state.manager.get_active_stays()?.len(),
        "Engine ready"
    );

    // 3. Log the outbound event stream
    let mut events = state.manager.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(
                    sequence = event.sequence,
                    event_type = %event.event_type,
                    subject_id = %event.subject_id,
                    operator = %event.operator_name,
                    "Event committed"
                ),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event log fell behind the stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // 4. Run until interrupted
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping");

    Ok(())
}
