use account_service::{
    configuration::get_configuration,
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("account-service".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber)?;
    tracing::info!("Starting the application...");

    let configuration = get_configuration()?;
    let application = Application::build(configuration).await?;
    tracing::info!(port = application.port(), "Listening");
    application.run_until_stopped().await?;

    Ok(())
}
