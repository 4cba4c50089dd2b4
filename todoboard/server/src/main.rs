#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let config = todoboard_server::config::Config::from_env()?;
    todoboard_server::web::start_web_server(config).await
}
